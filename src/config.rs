//! Application-level configuration loading.

use std::{env, fs, io::ErrorKind, path::PathBuf};

use serde::Deserialize;
use tracing::{info, warn};

/// Default location on disk where the server looks for the JSON configuration.
const DEFAULT_CONFIG_PATH: &str = "config/app.json";
/// Environment variable that overrides [`DEFAULT_CONFIG_PATH`].
const CONFIG_PATH_ENV: &str = "QUIZDASH_BACK_CONFIG_PATH";

/// PIN lengths outside this range are clamped back into it.
const MIN_PIN_LENGTH: u32 = 4;
const MAX_PIN_LENGTH: u32 = 6;

#[derive(Debug, Clone)]
/// Immutable runtime configuration shared across the application.
pub struct AppConfig {
    /// Number of digits in generated session PINs.
    pub pin_length: u32,
    /// Bound on PIN allocation attempts before giving up.
    pub pin_max_attempts: u32,
    /// Seconds a question stays live when the quiz does not override it.
    pub default_time_limit_secs: u32,
    /// Capacity of each session's SSE broadcast channel.
    pub sse_capacity: usize,
    /// Seconds between reaper sweeps.
    pub reaper_interval_secs: u64,
    /// Seconds of inactivity after which a session is reclaimed.
    pub session_idle_ttl_secs: u64,
}

impl AppConfig {
    /// Load the application configuration from disk, falling back to the
    /// built-in defaults.
    pub fn load() -> Self {
        let path = resolve_config_path();
        match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str::<RawConfig>(&contents) {
                Ok(raw) => {
                    let app_config: Self = raw.into();
                    info!(path = %path.display(), "loaded configuration from file");
                    app_config
                }
                Err(err) => {
                    warn!(
                        path = %path.display(),
                        error = %err,
                        "failed to parse config; falling back to defaults"
                    );
                    Self::default()
                }
            },
            Err(err) if err.kind() == ErrorKind::NotFound => {
                info!(
                    path = %path.display(),
                    "config file not found; using built-in defaults"
                );
                Self::default()
            }
            Err(err) => {
                warn!(
                    path = %path.display(),
                    error = %err,
                    "failed to read config; falling back to defaults"
                );
                Self::default()
            }
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            pin_length: 6,
            pin_max_attempts: 10,
            default_time_limit_secs: 15,
            sse_capacity: 64,
            reaper_interval_secs: 60,
            session_idle_ttl_secs: 3_600,
        }
    }
}

#[derive(Debug, Deserialize)]
/// JSON representation of the configuration file located at [`DEFAULT_CONFIG_PATH`].
struct RawConfig {
    pin_length: Option<u32>,
    pin_max_attempts: Option<u32>,
    default_time_limit_secs: Option<u32>,
    sse_capacity: Option<usize>,
    reaper_interval_secs: Option<u64>,
    session_idle_ttl_secs: Option<u64>,
}

impl From<RawConfig> for AppConfig {
    fn from(value: RawConfig) -> Self {
        let defaults = AppConfig::default();
        let pin_length = value
            .pin_length
            .unwrap_or(defaults.pin_length)
            .clamp(MIN_PIN_LENGTH, MAX_PIN_LENGTH);

        Self {
            pin_length,
            pin_max_attempts: value.pin_max_attempts.unwrap_or(defaults.pin_max_attempts),
            default_time_limit_secs: value
                .default_time_limit_secs
                .unwrap_or(defaults.default_time_limit_secs),
            sse_capacity: value.sse_capacity.unwrap_or(defaults.sse_capacity),
            reaper_interval_secs: value
                .reaper_interval_secs
                .unwrap_or(defaults.reaper_interval_secs),
            session_idle_ttl_secs: value
                .session_idle_ttl_secs
                .unwrap_or(defaults.session_idle_ttl_secs),
        }
    }
}

/// Resolve the configuration path taking the environment override into account.
fn resolve_config_path() -> PathBuf {
    env::var_os(CONFIG_PATH_ENV)
        .map(PathBuf::from)
        .filter(|path| !path.as_os_str().is_empty())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pin_length_is_clamped_into_the_supported_range() {
        let raw = RawConfig {
            pin_length: Some(12),
            pin_max_attempts: None,
            default_time_limit_secs: None,
            sse_capacity: None,
            reaper_interval_secs: None,
            session_idle_ttl_secs: None,
        };
        let config: AppConfig = raw.into();
        assert_eq!(config.pin_length, 6);

        let raw = RawConfig {
            pin_length: Some(2),
            pin_max_attempts: None,
            default_time_limit_secs: None,
            sse_capacity: None,
            reaper_interval_secs: None,
            session_idle_ttl_secs: None,
        };
        let config: AppConfig = raw.into();
        assert_eq!(config.pin_length, 4);
    }
}
