// crates/config/src/validator.rs

use livecap_core::{LivecapError, LivecapResult};

use crate::LivecapConfig;

pub struct ConfigValidator;

impl ConfigValidator {
    pub fn validate(config: &LivecapConfig) -> LivecapResult<()> {
        if config.api.port == 0 {
            return Err(LivecapError::Config(
                "API port must be non-zero".to_string(),
            ));
        }
        if config.api.host.trim().is_empty() {
            return Err(LivecapError::Config(
                "API host must not be empty".to_string(),
            ));
        }
        if config.fanout.room_capacity == 0 {
            return Err(LivecapError::Config(
                "Fan-out room capacity must be positive".to_string(),
            ));
        }

        config.captions.validate()?;
        config.transcriber.validate()?;
        config.sentiment.validate()?;

        Ok(())
    }
}
