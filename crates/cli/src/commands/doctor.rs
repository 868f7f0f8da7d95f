//! `contentcrew doctor`: Diagnose configuration and credentials.

use contentcrew_config::AppConfig;

use super::mask;

pub async fn run(init: bool) -> Result<(), Box<dyn std::error::Error>> {
    println!("🩺 ContentCrew Doctor — System Diagnostics");
    println!("==========================================\n");

    let mut issues = 0;

    let config_dir = AppConfig::config_dir();
    let config_path = config_dir.join("config.toml");
    if config_path.exists() {
        println!("  ✅ Config file: {}", config_path.display());
    } else if init {
        std::fs::create_dir_all(&config_dir)?;
        std::fs::write(&config_path, AppConfig::default_toml())?;
        println!("  ✅ Created config file: {}", config_path.display());
    } else {
        println!("  ⚠️  No config file, using defaults (create one with `contentcrew doctor --init`)");
    }

    let config = match AppConfig::load() {
        Ok(config) => {
            println!("  ✅ Config valid (provider: {}, model: {})", config.provider, config.model);
            config
        }
        Err(e) => {
            println!("  ❌ Config invalid: {e}");
            println!("\n  ⚠️  Fix the config file and re-run doctor.");
            return Ok(());
        }
    };

    match config.provider_api_key() {
        Some(key) => println!("  ✅ {} API key: {}", config.provider, mask(key)),
        None => {
            println!("  ❌ No {} API key", config.provider);
            issues += 1;
        }
    }

    match &config.search.api_key {
        Some(key) => println!("  ✅ Serper API key: {}", mask(key)),
        None => {
            println!("  ❌ SERPER_API_KEY not set");
            issues += 1;
        }
    }

    if let Err(e) = config.require_credentials() {
        println!("     {e}");
    }

    match std::fs::create_dir_all(&config.output_dir) {
        Ok(()) => println!("  ✅ Output directory: {}", config.output_dir.display()),
        Err(e) => {
            println!("  ❌ Output directory {} not writable: {e}", config.output_dir.display());
            issues += 1;
        }
    }

    println!(
        "  ✅ Dashboard address: http://{}:{}",
        config.dashboard.host, config.dashboard.port
    );

    println!();
    if issues == 0 {
        println!("  🎉 All checks passed!");
    } else {
        println!("  ⚠️  {issues} issue(s) found. See above for details.");
    }

    Ok(())
}
