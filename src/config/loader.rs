/// Configuration loading from TOML file
use std::path::Path;
use crate::error::{Result, SyncError};
use crate::types::{check_window_length, Config, MAX_WINDOW_SECS};

pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config> {
    let content = std::fs::read_to_string(path)?;

    parse_config(&content)
}

/// Load the config file if it exists, otherwise fall back to defaults
pub fn load_config_or_default<P: AsRef<Path>>(path: P) -> Result<Config> {
    if path.as_ref().exists() {
        load_config(path)
    } else {
        let config = Config::default();
        validate_config(&config)?;
        Ok(config)
    }
}

pub fn parse_config(content: &str) -> Result<Config> {
    let config: Config = toml::from_str(content)
        .map_err(|e| SyncError::Config(format!("Failed to parse config: {}", e)))?;

    // Validate config
    validate_config(&config)?;

    Ok(config)
}

fn validate_config(config: &Config) -> Result<()> {
    // Validate server endpoint
    if !config.base_url.starts_with("http://") && !config.base_url.starts_with("https://") {
        return Err(SyncError::Config(format!("Invalid base_url: {}", config.base_url)));
    }

    if config.channel_count == 0 {
        return Err(SyncError::Config("channel_count must be > 0".to_string()));
    }

    // Validate realtime cadence
    check_window_length(config.window_length_secs)
        .map_err(|_| SyncError::Config(format!(
            "window_length_secs must be between 1 and {}",
            MAX_WINDOW_SECS
        )))?;

    if config.tick_interval_ms == 0 || config.retry_delay_ms == 0 {
        return Err(SyncError::Config(
            "tick_interval_ms and retry_delay_ms must be > 0".to_string()
        ));
    }

    if config.value_display_lines == 0 {
        return Err(SyncError::Config("value_display_lines must be > 0".to_string()));
    }

    config.tz()?;

    Ok(())
}
