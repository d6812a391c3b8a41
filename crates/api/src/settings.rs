//! Server settings

use crate::rate_limit::RateLimitConfig;
use behavior::BehaviorConfig;
use notifier::EmailConfig;
use serde::{Deserialize, Serialize};

/// Service configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Socket address the server binds
    pub bind_addr: String,
    /// Analyzer thresholds and model path applied to new sessions
    pub behavior: BehaviorConfig,
    /// SMTP configuration; report email is disabled when unset
    pub email: Option<EmailConfig>,
    /// Recipient for completed-session reports
    pub report_recipient: Option<String>,
    /// Request rate limiting
    pub rate_limit: RateLimitConfig,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:8080".to_string(),
            behavior: BehaviorConfig::default(),
            email: None,
            report_recipient: None,
            rate_limit: RateLimitConfig::default(),
        }
    }
}

impl Settings {
    /// Load settings from an optional `proctor.toml` next to the binary,
    /// overridden by `PROCTOR_`-prefixed environment variables
    /// (e.g. `PROCTOR_BIND_ADDR`, `PROCTOR_EMAIL__HOST`).
    pub fn load() -> Result<Self, config::ConfigError> {
        config::Config::builder()
            .add_source(config::File::with_name("proctor").required(false))
            .add_source(config::Environment::with_prefix("PROCTOR").separator("__"))
            .build()?
            .try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.bind_addr, "0.0.0.0:8080");
        assert!(settings.email.is_none());
        assert_eq!(settings.behavior.gaze_away_threshold, 0.03);
    }
}
