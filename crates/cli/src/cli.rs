use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use docrelay_llm::ContextPolicy;

/// Run long documents through a chat-completion model chunk by chunk.
///
/// The document is split into word-bounded segments; each one is sent
/// together with a token-budgeted slice of the earlier conversation, and
/// the responses are written to the output file in order.
#[derive(Parser, Debug)]
#[command(name = "docrelay", version, about)]
pub struct CliArgs {
    /// Path to config file (default: ~/.config/docrelay/config.toml)
    #[arg(long, global = true, env = "DOCRELAY_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Clean up / rewrite a document, using earlier responses as context
    Process(RunArgs),
    /// Translate a document, using earlier source chunks and translations as context
    Translate(RunArgs),
    /// Print the resolved configuration (secrets redacted)
    ShowConfig,
}

#[derive(Args, Debug, Clone, Default)]
pub struct RunArgs {
    /// Input document, or a directory containing ocr_output.md
    #[arg(long)]
    pub input: PathBuf,

    /// Output file (truncated)
    #[arg(long)]
    pub output: PathBuf,

    /// System prompt file (default: prompts.md / prompts_translate.md)
    #[arg(long)]
    pub prompt_path: Option<PathBuf>,

    /// Completion endpoint base URL
    #[arg(long)]
    pub base_url: Option<String>,

    /// API key (overrides env var and config file)
    #[arg(long)]
    pub api_key: Option<String>,

    /// Model name
    #[arg(long)]
    pub model: Option<String>,

    /// Word ceiling per chunk
    #[arg(long)]
    pub max_words: Option<usize>,

    /// Token budget per request (system prompt + context + chunk)
    #[arg(long)]
    pub context_tokens: Option<usize>,

    /// Context selection: assistant-only, user-only, combined, latest-pair
    #[arg(long)]
    pub policy: Option<ContextPolicy>,

    /// Retries per chunk after the first attempt
    #[arg(long)]
    pub max_retries: Option<u32>,

    /// Also save each raw response as DIR/chunk_NNNN.md (default DIR: a new temp dir)
    #[arg(long, value_name = "DIR", num_args = 0..=1)]
    pub keep_chunks: Option<Option<PathBuf>>,
}

/// What a run does with the document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Process,
    Translate,
}

impl Mode {
    pub fn default_max_words(self) -> usize {
        match self {
            Mode::Process => 4000,
            Mode::Translate => 2000,
        }
    }

    pub fn default_policy(self) -> ContextPolicy {
        match self {
            Mode::Process => ContextPolicy::AssistantOnly,
            Mode::Translate => ContextPolicy::Combined,
        }
    }

    pub fn default_prompt_file(self) -> &'static str {
        match self {
            Mode::Process => "prompts.md",
            Mode::Translate => "prompts_translate.md",
        }
    }

    /// Progressive verb for status lines.
    pub fn verb(self) -> &'static str {
        match self {
            Mode::Process => "Processing",
            Mode::Translate => "Translating",
        }
    }

    pub fn past_tense(self) -> &'static str {
        match self {
            Mode::Process => "processed",
            Mode::Translate => "translated",
        }
    }
}
