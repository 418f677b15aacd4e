pub mod config;
pub mod error;

pub use config::{Config, LlmConfig, PipelineConfig, RetryConfig};
pub use error::*;
