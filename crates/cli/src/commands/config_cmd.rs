//! `chatwire config`: Configuration management commands.

use std::path::Path;

use chatwire_config::{AppConfig, ConfigError};

pub async fn validate(
    path: &Path,
    loaded: Result<AppConfig, ConfigError>,
) -> Result<(), Box<dyn std::error::Error>> {
    println!("🔍 Validating configuration at {}...", path.display());

    match loaded {
        Ok(config) => {
            println!("   ✅ Config parsed successfully");
            if !path.exists() {
                println!("   ⚠️  File not found, defaults in effect");
            }

            println!();
            println!("   Log level:   {}", config.logging.level);
            println!("   Log format:  {:?}", config.logging.format);
            println!("   Schemas:     {}", config.citations.schemas.join(" → "));
            println!(
                "   On schema error: {}",
                if config.replay.fail_on_citation_error {
                    "stop"
                } else {
                    "warn and continue"
                }
            );
        }
        Err(e) => {
            println!("   ❌ Config error: {e}");
            return Err(e.into());
        }
    }

    Ok(())
}

pub async fn show(config: &AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    let toml_str = toml::to_string_pretty(config)?;
    println!("{toml_str}");
    Ok(())
}

pub async fn path(path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", path.display());
    Ok(())
}

pub async fn init() -> Result<(), Box<dyn std::error::Error>> {
    print!("{}", AppConfig::default_toml());
    Ok(())
}
