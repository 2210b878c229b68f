//! Shared data model and configuration for dealscout.
//!
//! Every other crate in the workspace speaks in these types: the
//! [`ProductRecord`] produced by extraction, the [`AlternativeCandidate`]s
//! ranked by the alternatives search, and the [`DealVerdict`] rendered by the
//! analyzer.

mod app_config;
mod config;
pub mod product;
pub mod verdict;
pub mod weights;

use thiserror::Error;

pub use app_config::{AppConfig, Environment};
pub use config::{load_app_config, load_app_config_from_env};
pub use product::{
    AlternativeCandidate, Availability, ExtractionMethod, ProductLookup, ProductRecord, Rating,
    Retailer,
};
pub use verdict::{DealReport, DealVerdict};
pub use weights::{load_scoring_weights, ScoringWeights, SignalWeights};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },

    #[error("failed to read weights file {path}: {source}")]
    WeightsFileIo {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse weights file: {0}")]
    WeightsFileParse(#[from] serde_yaml::Error),

    #[error("config validation error: {0}")]
    Validation(String),
}
