// crates/config/src/lib.rs

use livecap_captions::CaptionConfig;
use livecap_core::LivecapResult;
use livecap_fanout::FanoutConfig;
use livecap_observability::ObservabilityConfig;
use livecap_sentiment::SentimentConfig;
use livecap_transcribe::TranscriberConfig;
use serde::{Deserialize, Serialize};

pub mod loader;
pub mod validator;

pub use loader::ConfigLoader;
pub use validator::ConfigValidator;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default = "AppConfig::default_log_level")]
    pub log_level: String,
}

impl AppConfig {
    fn default_log_level() -> String {
        "info".to_string()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            log_level: Self::default_log_level(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "ApiConfig::default_host")]
    pub host: String,
    #[serde(default = "ApiConfig::default_port")]
    pub port: u16,
    #[serde(default = "ApiConfig::default_cors_enabled")]
    pub cors_enabled: bool,
}

impl ApiConfig {
    fn default_host() -> String {
        "0.0.0.0".to_string()
    }

    fn default_port() -> u16 {
        3000
    }

    fn default_cors_enabled() -> bool {
        true
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: Self::default_host(),
            port: Self::default_port(),
            cors_enabled: Self::default_cors_enabled(),
        }
    }
}

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LivecapConfig {
    #[serde(default)]
    pub app: AppConfig,
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub captions: CaptionConfig,
    #[serde(default)]
    pub transcriber: TranscriberConfig,
    #[serde(default)]
    pub sentiment: SentimentConfig,
    #[serde(default)]
    pub fanout: FanoutConfig,
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

impl LivecapConfig {
    pub fn validate(&self) -> LivecapResult<()> {
        ConfigValidator::validate(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_carry_the_documented_constants() {
        let config = LivecapConfig::default();
        assert_eq!(config.captions.default_language, "en");
        assert_eq!(config.captions.buffer_threshold_bytes, 144_000);
        assert_eq!(config.sentiment.max_points, 200);
        assert_eq!(config.api.port, 3000);
        assert!(config.validate().is_ok());
    }
}
