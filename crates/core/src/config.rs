use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::ConfigError;

/// Env var selecting the active profile.
pub const PROFILE_ENV: &str = "DOCRELAY_PROFILE";

/// Load .env file (silently ignores if missing).
pub fn load_dotenv() {
    dotenvy::dotenv().ok();
}

/// Looks up `{PROFILE}_{KEY}` first, then `{KEY}`. Empty values count as unset.
fn profiled_lookup<F>(lookup: &F, profile: &str, key: &str) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    if !profile.is_empty() {
        let prefixed = format!("{}_{}", profile, key);
        if let Some(v) = lookup(&prefixed).filter(|s| !s.is_empty()) {
            return Some(v);
        }
    }
    lookup(key).filter(|s| !s.is_empty())
}

fn parse_value<T: FromStr>(key: &str, value: String) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::InvalidEnv {
            key: key.to_string(),
            value,
        })
}

// ── Top-level config ──────────────────────────────────────────

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Active profile name (empty = default).
    #[serde(skip)]
    pub profile: String,
    pub llm: LlmConfig,
    pub retry: RetryConfig,
    pub pipeline: PipelineConfig,
}

impl Config {
    /// Return the default config file path: ~/.config/docrelay/config.toml
    pub fn default_path() -> Result<PathBuf, ConfigError> {
        let dir = dirs::config_dir().ok_or(ConfigError::NoConfigDir)?;
        Ok(dir.join("docrelay").join("config.toml"))
    }

    /// Load config from the given TOML file, or the default path.
    /// A missing file yields the built-in defaults.
    pub fn load_file(path: Option<&Path>) -> Result<Self, ConfigError> {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => match Self::default_path() {
                Ok(p) => p,
                Err(_) => return Ok(Self::default()),
            },
        };

        if !path.exists() {
            debug!(?path, "Config file not found, using defaults");
            return Ok(Self::default());
        }

        debug!(?path, "Loading config");
        let content = std::fs::read_to_string(&path).map_err(|source| ConfigError::Io {
            path: path.clone(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| ConfigError::Parse { path, source })
    }

    /// File, then process environment on top of it.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = Self::load_file(path)?;
        config.apply_env_with(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Overlay environment values using `lookup` as the source.
    ///
    /// The profile is read from `DOCRELAY_PROFILE`. When set (e.g. `PROD`),
    /// every key is first looked up as `{PROFILE}_{KEY}`, falling back to `{KEY}`.
    pub fn apply_env_with<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        self.profile = lookup(PROFILE_ENV).unwrap_or_default().to_uppercase();
        let p = self.profile.clone();
        let get = |key: &str| profiled_lookup(&lookup, &p, key);

        if let Some(v) = get("DOCRELAY_BASE_URL") {
            self.llm.base_url = v;
        }
        if let Some(v) = get("DOCRELAY_API_KEY").or_else(|| get("OPENAI_API_KEY")) {
            self.llm.api_key = Some(v);
        }
        if let Some(v) = get("DOCRELAY_MODEL") {
            self.llm.model = v;
        }
        if let Some(v) = get("DOCRELAY_COMPLETION_PATH") {
            self.llm.completion_path = v;
        }
        if let Some(v) = get("DOCRELAY_MAX_OUTPUT_TOKENS") {
            self.llm.max_output_tokens = parse_value("DOCRELAY_MAX_OUTPUT_TOKENS", v)?;
        }
        if let Some(v) = get("DOCRELAY_TEMPERATURE") {
            self.llm.temperature = parse_value("DOCRELAY_TEMPERATURE", v)?;
        }
        if let Some(v) = get("DOCRELAY_TOP_P") {
            self.llm.top_p = Some(parse_value("DOCRELAY_TOP_P", v)?);
        }

        if let Some(v) = get("DOCRELAY_MAX_RETRIES") {
            self.retry.max_retries = parse_value("DOCRELAY_MAX_RETRIES", v)?;
        }
        if let Some(v) = get("DOCRELAY_INITIAL_DELAY_MS") {
            self.retry.initial_delay_ms = parse_value("DOCRELAY_INITIAL_DELAY_MS", v)?;
        }
        if let Some(v) = get("DOCRELAY_MAX_DELAY_MS") {
            self.retry.max_delay_ms = parse_value("DOCRELAY_MAX_DELAY_MS", v)?;
        }

        if let Some(v) = get("DOCRELAY_MAX_WORDS") {
            self.pipeline.max_words = Some(parse_value("DOCRELAY_MAX_WORDS", v)?);
        }
        if let Some(v) = get("DOCRELAY_CONTEXT_TOKENS") {
            self.pipeline.context_tokens = parse_value("DOCRELAY_CONTEXT_TOKENS", v)?;
        }
        if let Some(v) = get("DOCRELAY_WRITE_RETRIES") {
            self.pipeline.write_retries = parse_value("DOCRELAY_WRITE_RETRIES", v)?;
        }

        Ok(())
    }

    pub fn profile_label(&self) -> &str {
        if self.profile.is_empty() { "default" } else { &self.profile }
    }

    /// Print a redacted summary for startup logs.
    pub fn log_summary(&self) {
        tracing::info!("Config loaded (profile: {}):", self.profile_label());
        tracing::info!(
            "  llm:       base_url={}, model={}, api_key={}",
            self.llm.base_url,
            self.llm.model,
            if self.llm.api_key.is_some() { "set" } else { "(none)" }
        );
        tracing::info!(
            "  retry:     max_retries={}, initial_delay_ms={}, max_delay_ms={}",
            self.retry.max_retries,
            self.retry.initial_delay_ms,
            self.retry.max_delay_ms
        );
        tracing::info!(
            "  pipeline:  context_tokens={}, write_retries={}",
            self.pipeline.context_tokens,
            self.pipeline.write_retries
        );
    }

    /// Return a redacted view safe for printing (no secrets).
    pub fn redacted_summary(&self) -> serde_json::Value {
        serde_json::json!({
            "profile": self.profile_label(),
            "llm": {
                "base_url": self.llm.base_url,
                "completion_path": self.llm.completion_path,
                "model": self.llm.model,
                "max_output_tokens": self.llm.max_output_tokens,
                "temperature": self.llm.temperature,
                "top_p": self.llm.top_p,
                "configured": self.llm.is_configured(),
            },
            "retry": {
                "max_retries": self.retry.max_retries,
                "initial_delay_ms": self.retry.initial_delay_ms,
                "max_delay_ms": self.retry.max_delay_ms,
            },
            "pipeline": {
                "max_words": self.pipeline.max_words,
                "context_tokens": self.pipeline.context_tokens,
                "write_retries": self.pipeline.write_retries,
            },
        })
    }
}

// ── LLM endpoint ──────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Scheme + host (+ optional port) of the completion endpoint.
    pub base_url: String,
    /// Path appended to `base_url` for every request.
    pub completion_path: String,
    pub api_key: Option<String>,
    pub model: String,
    /// Ceiling on tokens the model may generate per request.
    pub max_output_tokens: u32,
    pub temperature: f32,
    /// Nucleus sampling; omitted from the payload when unset.
    pub top_p: Option<f32>,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com".to_string(),
            completion_path: "/v1/chat/completions".to_string(),
            api_key: None,
            model: "gpt-4o-mini".to_string(),
            max_output_tokens: 8192,
            temperature: 0.2,
            top_p: None,
        }
    }
}

impl LlmConfig {
    pub fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    /// Full URL requests are posted to.
    pub fn endpoint(&self) -> String {
        let base = self.base_url.trim_end_matches('/');
        if self.completion_path.starts_with('/') {
            format!("{}{}", base, self.completion_path)
        } else {
            format!("{}/{}", base, self.completion_path)
        }
    }
}

// ── Retry ─────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Retries after the first attempt; total attempts = max_retries + 1.
    pub max_retries: u32,
    pub initial_delay_ms: u64,
    /// Upper bound on a single backoff sleep; 0 disables the cap.
    pub max_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 5,
            initial_delay_ms: 1000,
            max_delay_ms: 60_000,
        }
    }
}

// ── Pipeline ──────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Word ceiling per chunk; `None` means the mode's default.
    pub max_words: Option<usize>,
    /// Token budget per request (system + history + current input).
    pub context_tokens: usize,
    /// Attempts per chunk archive write.
    pub write_retries: u32,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_words: None,
            context_tokens: 20_000,
            write_retries: 3,
        }
    }
}
