use std::path::PathBuf;

use crate::app_config::{AppConfig, Environment};
use crate::weights::{load_scoring_weights, ScoringWeights};
use crate::ConfigError;

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if values are invalid or the weights file cannot be
/// loaded.
pub fn load_app_config() -> Result<AppConfig, ConfigError> {
    dotenvy::dotenv().ok();
    load_app_config_from_env()
}

/// Load application configuration from environment variables already in the process.
///
/// Unlike [`load_app_config`], this does NOT load `.env` files; useful for testing
/// or when the caller manages env setup.
///
/// # Errors
///
/// Returns `ConfigError` if values are invalid or the weights file cannot be
/// loaded.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Build application configuration using the provided env-var lookup function.
///
/// Decoupled from the process environment so it can be tested with a plain
/// `HashMap` lookup.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    let parse_u32 = |var: &str, default: &str| -> Result<u32, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<u32>().map_err(|e| ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: e.to_string(),
        })
    };

    let parse_u64 = |var: &str, default: &str| -> Result<u64, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<u64>().map_err(|e| ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: e.to_string(),
        })
    };

    let parse_usize = |var: &str, default: &str| -> Result<usize, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<usize>()
            .map_err(|e| ConfigError::InvalidEnvVar {
                var: var.to_string(),
                reason: e.to_string(),
            })
    };

    let non_zero = |var: &str, value: u64| -> Result<u64, ConfigError> {
        if value == 0 {
            return Err(ConfigError::InvalidEnvVar {
                var: var.to_string(),
                reason: "must be greater than zero".to_string(),
            });
        }
        Ok(value)
    };

    let env = parse_environment(&or_default("DEALSCOUT_ENV", "development"))?;
    let log_level = or_default("DEALSCOUT_LOG_LEVEL", "info");

    let request_timeout_secs = non_zero(
        "DEALSCOUT_REQUEST_TIMEOUT_SECS",
        parse_u64("DEALSCOUT_REQUEST_TIMEOUT_SECS", "15")?,
    )?;
    let user_agent = or_default("DEALSCOUT_USER_AGENT", "dealscout/0.1 (deal-evaluation)");

    let max_retries = parse_u32("DEALSCOUT_MAX_RETRIES", "1")?;
    if max_retries > 1 {
        return Err(ConfigError::InvalidEnvVar {
            var: "DEALSCOUT_MAX_RETRIES".to_string(),
            reason: format!("transient fetches are retried at most once, got {max_retries}"),
        });
    }
    let retry_backoff_base_ms = parse_u64("DEALSCOUT_RETRY_BACKOFF_BASE_MS", "500")?;

    let adapter_timeout_secs = non_zero(
        "DEALSCOUT_ADAPTER_TIMEOUT_SECS",
        parse_u64("DEALSCOUT_ADAPTER_TIMEOUT_SECS", "10")?,
    )?;
    let max_alternatives = parse_usize("DEALSCOUT_MAX_ALTERNATIVES", "5")?;
    let fan_out_limit = parse_usize("DEALSCOUT_FAN_OUT_LIMIT", "6")?.max(1);

    let weights_path = lookup("DEALSCOUT_WEIGHTS_PATH")
        .ok()
        .filter(|p| !p.trim().is_empty())
        .map(PathBuf::from);
    let weights = match &weights_path {
        Some(path) => load_scoring_weights(path)?,
        None => ScoringWeights::default(),
    };

    Ok(AppConfig {
        env,
        log_level,
        request_timeout_secs,
        user_agent,
        max_retries,
        retry_backoff_base_ms,
        adapter_timeout_secs,
        max_alternatives,
        fan_out_limit,
        weights_path,
        weights,
    })
}

/// Parse a string into an `Environment` variant.
fn parse_environment(s: &str) -> Result<Environment, ConfigError> {
    match s {
        "development" => Ok(Environment::Development),
        "production" => Ok(Environment::Production),
        "test" => Ok(Environment::Test),
        other => Err(ConfigError::InvalidEnvVar {
            var: "DEALSCOUT_ENV".to_string(),
            reason: format!("expected development, test, or production, got \"{other}\""),
        }),
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
