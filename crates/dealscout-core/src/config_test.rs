use std::collections::HashMap;
use std::env::VarError;

use super::*;

fn lookup_from_map<'a>(
    map: &'a HashMap<&'a str, &'a str>,
) -> impl Fn(&str) -> Result<String, VarError> + 'a {
    move |key| {
        map.get(key)
            .map(|v| (*v).to_string())
            .ok_or(VarError::NotPresent)
    }
}

#[test]
fn parse_environment_known_values() {
    assert_eq!(
        parse_environment("development").unwrap(),
        Environment::Development
    );
    assert_eq!(parse_environment("test").unwrap(), Environment::Test);
    assert_eq!(
        parse_environment("production").unwrap(),
        Environment::Production
    );
}

#[test]
fn parse_environment_unknown_fails() {
    let err = parse_environment("staging").unwrap_err();
    assert!(matches!(err, ConfigError::InvalidEnvVar { ref var, .. } if var == "DEALSCOUT_ENV"));
}

#[test]
fn empty_environment_yields_defaults() {
    let map: HashMap<&str, &str> = HashMap::new();
    let config = build_app_config(lookup_from_map(&map)).unwrap();
    assert_eq!(config.env, Environment::Development);
    assert_eq!(config.log_level, "info");
    assert_eq!(config.request_timeout_secs, 15);
    assert_eq!(config.max_retries, 1);
    assert_eq!(config.adapter_timeout_secs, 10);
    assert_eq!(config.max_alternatives, 5);
    assert_eq!(config.fan_out_limit, 6);
    assert!(config.weights_path.is_none());
    assert_eq!(config.weights, ScoringWeights::default());
}

#[test]
fn overrides_are_applied() {
    let mut map = HashMap::new();
    map.insert("DEALSCOUT_ENV", "production");
    map.insert("DEALSCOUT_LOG_LEVEL", "debug");
    map.insert("DEALSCOUT_ADAPTER_TIMEOUT_SECS", "3");
    map.insert("DEALSCOUT_MAX_ALTERNATIVES", "2");
    map.insert("DEALSCOUT_USER_AGENT", "custom-agent/1.0");
    map.insert("DEALSCOUT_MAX_RETRIES", "0");
    let config = build_app_config(lookup_from_map(&map)).unwrap();
    assert_eq!(config.env, Environment::Production);
    assert_eq!(config.log_level, "debug");
    assert_eq!(config.adapter_timeout_secs, 3);
    assert_eq!(config.max_alternatives, 2);
    assert_eq!(config.user_agent, "custom-agent/1.0");
    assert_eq!(config.max_retries, 0);
}

#[test]
fn non_numeric_timeout_is_rejected() {
    let mut map = HashMap::new();
    map.insert("DEALSCOUT_REQUEST_TIMEOUT_SECS", "soon");
    let result = build_app_config(lookup_from_map(&map));
    assert!(
        matches!(
            result,
            Err(ConfigError::InvalidEnvVar { ref var, .. }) if var == "DEALSCOUT_REQUEST_TIMEOUT_SECS"
        ),
        "expected InvalidEnvVar, got: {result:?}"
    );
}

#[test]
fn zero_adapter_timeout_is_rejected() {
    let mut map = HashMap::new();
    map.insert("DEALSCOUT_ADAPTER_TIMEOUT_SECS", "0");
    let result = build_app_config(lookup_from_map(&map));
    assert!(matches!(
        result,
        Err(ConfigError::InvalidEnvVar { ref var, .. }) if var == "DEALSCOUT_ADAPTER_TIMEOUT_SECS"
    ));
}

#[test]
fn more_than_one_retry_is_rejected() {
    let mut map = HashMap::new();
    map.insert("DEALSCOUT_MAX_RETRIES", "3");
    let result = build_app_config(lookup_from_map(&map));
    assert!(matches!(
        result,
        Err(ConfigError::InvalidEnvVar { ref var, .. }) if var == "DEALSCOUT_MAX_RETRIES"
    ));
}

#[test]
fn zero_fan_out_limit_is_raised_to_one() {
    let mut map = HashMap::new();
    map.insert("DEALSCOUT_FAN_OUT_LIMIT", "0");
    let config = build_app_config(lookup_from_map(&map)).unwrap();
    assert_eq!(config.fan_out_limit, 1);
}

#[test]
fn weights_file_is_loaded_when_configured() {
    let path = std::env::temp_dir().join(format!(
        "dealscout-weights-{}-{}.yaml",
        std::process::id(),
        line!()
    ));
    std::fs::write(&path, "good_deal_threshold: 75\n").unwrap();
    let path_str = path.display().to_string();

    let mut map = HashMap::new();
    map.insert("DEALSCOUT_WEIGHTS_PATH", path_str.as_str());
    let config = build_app_config(lookup_from_map(&map)).unwrap();
    std::fs::remove_file(&path).ok();

    assert_eq!(config.weights.good_deal_threshold, 75);
    assert_eq!(config.weights_path.as_deref(), Some(path.as_path()));
}

#[test]
fn missing_weights_file_fails() {
    let mut map = HashMap::new();
    map.insert("DEALSCOUT_WEIGHTS_PATH", "/nonexistent/dealscout-weights.yaml");
    let result = build_app_config(lookup_from_map(&map));
    assert!(matches!(result, Err(ConfigError::WeightsFileIo { .. })));
}

#[test]
fn debug_output_lists_timeouts() {
    let config = AppConfig::default();
    let debug = format!("{config:?}");
    assert!(debug.contains("adapter_timeout_secs"));
    assert!(debug.contains("user_agent"));
}
