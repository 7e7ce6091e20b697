// crates/config/src/loader.rs

use std::path::Path;

use livecap_core::{LivecapError, LivecapResult};
use tracing::info;

use crate::LivecapConfig;

pub struct ConfigLoader;

impl ConfigLoader {
    pub fn load_from_file(path: &Path) -> LivecapResult<LivecapConfig> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| LivecapError::Config(format!("Failed to read config: {}", e)))?;

        let config: LivecapConfig = toml::from_str(&content)
            .map_err(|e| LivecapError::Config(format!("Failed to parse config: {}", e)))?;

        Ok(config)
    }

    pub fn save_to_file(path: &Path, config: &LivecapConfig) -> LivecapResult<()> {
        let content = toml::to_string_pretty(config)
            .map_err(|e| LivecapError::Config(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(path, content)
            .map_err(|e| LivecapError::Config(format!("Failed to write config: {}", e)))?;

        Ok(())
    }

    /// Defaults, optionally overlaid with a config file, then with
    /// `LIVECAP_*` environment overrides.
    pub fn load(path: Option<&Path>) -> LivecapResult<LivecapConfig> {
        let mut config = match path {
            Some(path) if path.exists() => {
                info!("Loading configuration from {}", path.display());
                Self::load_from_file(path)?
            }
            Some(path) => {
                info!(
                    "Config file {} not found, using defaults",
                    path.display()
                );
                LivecapConfig::default()
            }
            None => LivecapConfig::default(),
        };

        Self::apply_env_overrides(&mut config)?;
        Ok(config)
    }

    fn apply_env_overrides(config: &mut LivecapConfig) -> LivecapResult<()> {
        if let Ok(level) = std::env::var("LIVECAP_LOG_LEVEL") {
            config.app.log_level = level;
        }
        if let Ok(port) = std::env::var("LIVECAP_API_PORT") {
            config.api.port = port
                .parse()
                .map_err(|_| LivecapError::Config("Invalid API port".to_string()))?;
        }
        if let Ok(language) = std::env::var("LIVECAP_LANGUAGE") {
            config.captions.default_language = language;
        }
        if let Ok(endpoint) = std::env::var("LIVECAP_TRANSCRIBE_ENDPOINT") {
            config.transcriber.endpoint = endpoint;
        }

        Ok(())
    }
}
