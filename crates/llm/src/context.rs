//! Request assembly: system prompt, budgeted history, current input.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use tracing::debug;

use crate::history::{HistorySource, HistoryStore};
use crate::provider::Message;
use crate::status::StatusObserver;

/// Which prior messages accompany the current input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextPolicy {
    AssistantOnly,
    UserOnly,
    Combined,
    /// Latest user and assistant entries, regardless of budget.
    LatestPair,
}

impl ContextPolicy {
    pub const ALL: [ContextPolicy; 4] = [
        ContextPolicy::AssistantOnly,
        ContextPolicy::UserOnly,
        ContextPolicy::Combined,
        ContextPolicy::LatestPair,
    ];

    /// Budgeted history source, or `None` for [`ContextPolicy::LatestPair`].
    pub fn source(self) -> Option<HistorySource> {
        match self {
            Self::AssistantOnly => Some(HistorySource::Assistant),
            Self::UserOnly => Some(HistorySource::User),
            Self::Combined => Some(HistorySource::Combined),
            Self::LatestPair => None,
        }
    }

    /// Whether selections under this policy can include prior inputs.
    pub fn reads_user_history(self) -> bool {
        !matches!(self, Self::AssistantOnly)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::AssistantOnly => "assistant-only",
            Self::UserOnly => "user-only",
            Self::Combined => "combined",
            Self::LatestPair => "latest-pair",
        }
    }

    fn describe(self) -> &'static str {
        match self {
            Self::AssistantOnly => "assistant",
            Self::UserOnly => "user",
            Self::Combined => "combined user and assistant",
            Self::LatestPair => "latest conversation pair",
        }
    }
}

impl fmt::Display for ContextPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ContextPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|p| p.as_str() == s.trim().to_ascii_lowercase())
            .ok_or_else(|| {
                format!(
                    "unknown context policy '{s}' (expected one of: assistant-only, user-only, combined, latest-pair)"
                )
            })
    }
}

/// Builds the ordered message list for one request.
pub struct RequestBuilder {
    observer: Arc<dyn StatusObserver>,
}

impl RequestBuilder {
    pub fn new(observer: Arc<dyn StatusObserver>) -> Self {
        Self { observer }
    }

    /// `[system, history..., user(current_input)]`.
    ///
    /// For budgeted policies history gets whatever `max_tokens` leaves after
    /// the system prompt and current input, estimated with the history's
    /// own estimator. No history is attached when nothing is left.
    pub fn build(
        &self,
        system_prompt: &str,
        history: &HistoryStore,
        policy: ContextPolicy,
        current_input: &str,
        max_tokens: usize,
    ) -> Vec<Message> {
        self.observer.notify(
            &format!(
                "Starting processing request with {} context...",
                policy.describe()
            ),
            false,
        );

        let mut messages = vec![Message::system(system_prompt)];

        match policy.source() {
            Some(source) => {
                let estimator = history.estimator();
                let system_tokens = estimator.estimate(system_prompt) as i64;
                let current_tokens = estimator.estimate(current_input) as i64;
                let remaining = max_tokens as i64 - system_tokens - current_tokens;
                debug!(
                    policy = %policy,
                    system_tokens,
                    current_tokens,
                    remaining,
                    "Context budget"
                );

                if remaining > 0 {
                    let selection = history.limited(source, remaining);
                    self.observer.notify(
                        &format!(
                            "Added {} context messages using {} tokens.",
                            selection.messages.len(),
                            selection.tokens
                        ),
                        false,
                    );
                    messages.extend(selection.messages);
                }
            }
            None => {
                let pair = history.latest_pair();
                self.observer.notify(
                    &format!("Added {} context messages from the latest pair.", pair.len()),
                    false,
                );
                messages.extend(pair);
            }
        }

        messages.push(Message::user(current_input));
        self.observer.notify(
            &format!("Built context with {} messages.", messages.len()),
            false,
        );
        messages
    }
}
