pub mod doctor;
pub mod plot;
pub mod run;
pub mod web;

use std::sync::Arc;

use contentcrew_config::AppConfig;
use contentcrew_core::provider::Provider;

/// Load config, insist on credentials and build the provider. A missing
/// credential ends the process with exit code 1.
pub fn setup() -> Result<(AppConfig, Arc<dyn Provider>), Box<dyn std::error::Error>> {
    let config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;

    if let Err(e) = config.require_credentials() {
        eprintln!("❌ {e}");
        std::process::exit(1);
    }

    let provider = contentcrew_providers::router::build_from_config(&config)?;
    tracing::debug!(provider = provider.name(), output = %config.output_dir.display(), "Provider ready");

    println!("🔧 Model: {} ({})", config.model, config.provider);
    if let Some(key) = config.provider_api_key() {
        println!("🔑 {} API Key: {}", provider.name(), mask(key));
    }
    if let Some(key) = &config.search.api_key {
        println!("🔑 Serper API Key: {}", mask(key));
    }

    Ok((config, provider))
}

/// `...` plus the last four characters.
pub fn mask(secret: &str) -> String {
    let tail: String = secret
        .chars()
        .rev()
        .take(4)
        .collect::<Vec<_>>()
        .into_iter()
        .rev()
        .collect();
    format!("...{tail}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mask_keeps_last_four() {
        assert_eq!(mask("AIzaSyD-abcd1234"), "...1234");
        assert_eq!(mask("xy"), "...xy");
        assert_eq!(mask(""), "...");
    }
}
