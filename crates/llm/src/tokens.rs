//! Token accounting.
//!
//! Every budget decision (history selection and request assembly) goes
//! through one [`TokenEstimator`], so the sum checked before sending is the
//! same sum that selection was based on.

use std::sync::Arc;

use tiktoken_rs::CoreBPE;
use tracing::{debug, warn};

/// Estimates how many tokens a model will consume for a piece of text.
///
/// Implementations must be deterministic: the same text always yields the
/// same count.
pub trait TokenEstimator: Send + Sync {
    fn estimate(&self, text: &str) -> usize;
}

/// BPE tokenizer matching the OpenAI model families.
pub struct TiktokenEstimator {
    bpe: CoreBPE,
}

impl TiktokenEstimator {
    /// Tokenizer for `model`, falling back to `o200k_base` (gpt-4o family)
    /// for model names tiktoken does not know.
    pub fn for_model(model: &str) -> Result<Self, String> {
        let bpe = match tiktoken_rs::get_bpe_from_model(model) {
            Ok(bpe) => bpe,
            Err(_) => {
                debug!(model, "Unknown model for tokenizer, using o200k_base");
                tiktoken_rs::o200k_base().map_err(|e| e.to_string())?
            }
        };
        Ok(Self { bpe })
    }
}

impl TokenEstimator for TiktokenEstimator {
    fn estimate(&self, text: &str) -> usize {
        self.bpe.encode_with_special_tokens(text).len()
    }
}

/// Approximate token count using character count / 4, rounded up.
#[derive(Debug, Default, Clone, Copy)]
pub struct HeuristicEstimator;

impl TokenEstimator for HeuristicEstimator {
    fn estimate(&self, text: &str) -> usize {
        text.chars().count().div_ceil(4)
    }
}

/// The estimator used for a run: tiktoken when it loads, else the heuristic.
pub fn default_estimator(model: &str) -> Arc<dyn TokenEstimator> {
    match TiktokenEstimator::for_model(model) {
        Ok(estimator) => Arc::new(estimator),
        Err(e) => {
            warn!(error = %e, "Tokenizer unavailable, falling back to chars/4 estimate");
            Arc::new(HeuristicEstimator)
        }
    }
}
