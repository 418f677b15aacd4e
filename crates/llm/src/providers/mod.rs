#[cfg(any(test, feature = "test-utils"))]
pub mod mock;
pub mod openai;

use std::sync::Arc;

use docrelay_core::config::LlmConfig;

use crate::provider::{LlmError, LlmProvider};

/// Create the completion provider described by config.
pub fn create_provider(llm_config: &LlmConfig) -> Result<Arc<dyn LlmProvider>, LlmError> {
    let api_key = llm_config
        .api_key
        .as_ref()
        .ok_or_else(|| LlmError::NotConfigured("OPENAI_API_KEY not set".into()))?;

    let provider = openai::OpenAiProvider::new(
        api_key.clone(),
        llm_config.endpoint(),
        openai::CompletionSettings::from_config(llm_config),
    )?;
    Ok(Arc::new(provider))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_api_key_is_not_configured() {
        let config = LlmConfig::default();
        assert!(matches!(
            create_provider(&config),
            Err(LlmError::NotConfigured(_))
        ));
    }

    #[test]
    fn builds_provider_for_configured_host() {
        let config = LlmConfig {
            api_key: Some("sk-test".into()),
            base_url: "https://llm.example.com:8443".into(),
            ..LlmConfig::default()
        };
        let provider = create_provider(&config).unwrap();
        assert_eq!(provider.host(), "llm.example.com");
    }
}
