//! Provider selection from configuration.

use std::sync::Arc;

use contentcrew_config::AppConfig;
use contentcrew_core::error::ProviderError;
use contentcrew_core::provider::Provider;

use crate::anthropic::AnthropicProvider;
use crate::gemini::GeminiProvider;

/// Build the configured provider.
///
/// Fails with `NotConfigured` when the provider is unknown or its API key is
/// missing, so a run never starts against a backend that cannot answer.
pub fn build_from_config(config: &AppConfig) -> Result<Arc<dyn Provider>, ProviderError> {
    let api_key = config.provider_api_key().ok_or_else(|| {
        ProviderError::NotConfigured(format!("no API key for provider '{}'", config.provider))
    })?;

    let provider: Arc<dyn Provider> = match config.provider.as_str() {
        "gemini" => {
            let mut p = GeminiProvider::new(api_key);
            if let Some(url) = &config.gemini.api_url {
                p = p.with_base_url(url);
            }
            Arc::new(p)
        }
        "anthropic" => {
            let mut p = AnthropicProvider::new(api_key);
            if let Some(url) = &config.anthropic.api_url {
                p = p.with_base_url(url);
            }
            Arc::new(p)
        }
        other => {
            return Err(ProviderError::NotConfigured(format!(
                "unknown provider '{other}'"
            )));
        }
    };

    tracing::info!(provider = provider.name(), model = %config.model, "Provider ready");
    Ok(provider)
}
