//! Server configuration parsed from environment variables.

use std::time::Duration;

use crate::registry::sandbox::SandboxLimits;

pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_GENERATOR_TIMEOUT_SECS: u64 = 60;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid GENERATOR_URL '{url}': expected an http(s) URL")]
    InvalidGeneratorUrl { url: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratorConfig {
    pub url: String,
    pub timeout: Duration,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub port: u16,
    /// `None` disables `generate:prompt`.
    pub generator: Option<GeneratorConfig>,
    pub sandbox: SandboxLimits,
}

impl AppConfig {
    /// Build typed config from environment variables.
    ///
    /// Optional:
    /// - `PORT`: default 3000
    /// - `GENERATOR_URL`: descriptor generator endpoint; generation is off when absent
    /// - `GENERATOR_TIMEOUT_SECS`: default 60
    /// - `SANDBOX_MAX_OPERATIONS`: default 100000
    /// - `SANDBOX_MAX_CALL_LEVELS`: default 32
    /// - `SANDBOX_MAX_STRING_SIZE`: default 65536
    ///
    /// Unparseable numbers fall back to their defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        let port = env_parse("PORT", DEFAULT_PORT);

        let generator = match std::env::var("GENERATOR_URL") {
            Ok(raw) if !raw.trim().is_empty() => {
                let url = raw.trim().trim_end_matches('/').to_string();
                if !(url.starts_with("http://") || url.starts_with("https://")) {
                    return Err(ConfigError::InvalidGeneratorUrl { url });
                }
                let timeout = Duration::from_secs(env_parse("GENERATOR_TIMEOUT_SECS", DEFAULT_GENERATOR_TIMEOUT_SECS));
                Some(GeneratorConfig { url, timeout })
            }
            _ => None,
        };

        let defaults = SandboxLimits::default();
        let sandbox = SandboxLimits {
            max_operations: env_parse("SANDBOX_MAX_OPERATIONS", defaults.max_operations),
            max_call_levels: env_parse("SANDBOX_MAX_CALL_LEVELS", defaults.max_call_levels),
            max_string_size: env_parse("SANDBOX_MAX_STRING_SIZE", defaults.max_string_size),
        };

        Ok(Self { port, generator, sandbox })
    }
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.trim().parse::<T>().ok())
        .unwrap_or(default)
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
