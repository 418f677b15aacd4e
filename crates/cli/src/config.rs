use std::path::PathBuf;

use docrelay_core::Config;
use docrelay_llm::ContextPolicy;

use crate::archive::ChunkArchive;
use crate::cli::{Mode, RunArgs};

/// Everything one run needs, after layering flags over env/file config.
#[derive(Debug, Clone)]
pub struct RunSettings {
    pub mode: Mode,
    pub config: Config,
    pub input: PathBuf,
    pub output: PathBuf,
    pub prompt_path: PathBuf,
    pub max_words: usize,
    pub policy: ContextPolicy,
    /// Record each chunk in user history too.
    pub echo_inputs: bool,
    pub keep_chunks: Option<PathBuf>,
}

impl RunSettings {
    /// Priority: command-line flag > environment > config file > mode default.
    pub fn resolve(mode: Mode, args: RunArgs, mut config: Config) -> Self {
        if let Some(url) = args.base_url {
            config.llm.base_url = url;
        }
        if let Some(key) = args.api_key {
            config.llm.api_key = Some(key);
        }
        if let Some(model) = args.model {
            config.llm.model = model;
        }
        if let Some(retries) = args.max_retries {
            config.retry.max_retries = retries;
        }
        if let Some(tokens) = args.context_tokens {
            config.pipeline.context_tokens = tokens;
        }

        let max_words = args
            .max_words
            .or(config.pipeline.max_words)
            .unwrap_or_else(|| mode.default_max_words());
        config.pipeline.max_words = Some(max_words);

        let policy = args.policy.unwrap_or_else(|| mode.default_policy());
        let echo_inputs = mode == Mode::Translate || policy.reads_user_history();

        Self {
            mode,
            config,
            input: args.input,
            output: args.output,
            prompt_path: args
                .prompt_path
                .unwrap_or_else(|| PathBuf::from(mode.default_prompt_file())),
            max_words,
            policy,
            echo_inputs,
            keep_chunks: args
                .keep_chunks
                .map(|dir| dir.unwrap_or_else(ChunkArchive::default_dir)),
        }
    }
}
