use std::path::PathBuf;
use std::time::Duration;

use crate::weights::ScoringWeights;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    Development,
    Test,
    Production,
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Test => write!(f, "test"),
            Environment::Production => write!(f, "production"),
        }
    }
}

#[derive(Clone)]
pub struct AppConfig {
    pub env: Environment,
    pub log_level: String,
    pub request_timeout_secs: u64,
    pub user_agent: String,
    /// Retries after the first failed fetch. Capped at 1.
    pub max_retries: u32,
    pub retry_backoff_base_ms: u64,
    /// Budget for one adapter call, primary extraction or alternative search.
    pub adapter_timeout_secs: u64,
    pub max_alternatives: usize,
    pub fan_out_limit: usize,
    pub weights_path: Option<PathBuf>,
    pub weights: ScoringWeights,
}

impl AppConfig {
    #[must_use]
    pub fn adapter_timeout(&self) -> Duration {
        Duration::from_secs(self.adapter_timeout_secs)
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            env: Environment::Development,
            log_level: "info".to_string(),
            request_timeout_secs: 15,
            user_agent: "dealscout/0.1 (deal-evaluation)".to_string(),
            max_retries: 1,
            retry_backoff_base_ms: 500,
            adapter_timeout_secs: 10,
            max_alternatives: 5,
            fan_out_limit: 6,
            weights_path: None,
            weights: ScoringWeights::default(),
        }
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("env", &self.env)
            .field("log_level", &self.log_level)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("user_agent", &self.user_agent)
            .field("max_retries", &self.max_retries)
            .field("retry_backoff_base_ms", &self.retry_backoff_base_ms)
            .field("adapter_timeout_secs", &self.adapter_timeout_secs)
            .field("max_alternatives", &self.max_alternatives)
            .field("fan_out_limit", &self.fan_out_limit)
            .field("weights_path", &self.weights_path)
            .finish_non_exhaustive()
    }
}
