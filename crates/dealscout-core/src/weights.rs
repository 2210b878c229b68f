//! Tunable scoring weights.
//!
//! The defaults below are starting points, not contracts. A deployment can
//! override any of them from a YAML file pointed to by
//! `DEALSCOUT_WEIGHTS_PATH`; omitted keys keep their defaults.
//!
//! ```yaml
//! analysis_with_price:
//!   price: 0.6
//!   rating: 0.2
//!   availability: 0.1
//!   reputation: 0.1
//! reputation:
//!   ebay: 0.7
//! good_deal_threshold: 65
//! ```

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::product::Retailer;
use crate::ConfigError;

/// Relative weight of each deal signal. Weights need not sum to one;
/// consumers renormalize over the signals that are active for a given
/// comparison.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SignalWeights {
    pub price: f64,
    pub rating: f64,
    pub availability: f64,
    pub reputation: f64,
}

impl Default for SignalWeights {
    fn default() -> Self {
        Self {
            price: 0.5,
            rating: 0.2,
            availability: 0.15,
            reputation: 0.15,
        }
    }
}

impl SignalWeights {
    fn validate(&self, name: &str) -> Result<(), ConfigError> {
        let all = [self.price, self.rating, self.availability, self.reputation];
        if all.iter().any(|w| !w.is_finite() || *w < 0.0) {
            return Err(ConfigError::Validation(format!(
                "{name}: weights must be finite and non-negative"
            )));
        }
        if self.rating + self.availability + self.reputation <= 0.0 {
            return Err(ConfigError::Validation(format!(
                "{name}: at least one non-price weight must be positive"
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringWeights {
    /// Weights for ranking an alternative against the primary record.
    pub comparison: SignalWeights,
    /// Analyzer weights when the primary and at least one alternative carry
    /// a trustworthy price.
    pub analysis_with_price: SignalWeights,
    /// Analyzer weights when price is absent or unreliable. The `price`
    /// field is ignored.
    pub analysis_without_price: SignalWeights,
    /// Per-retailer reputation overrides in `[0, 1]`.
    pub reputation: BTreeMap<Retailer, f64>,
    /// Points an alternative must beat the primary's baseline by to count as
    /// a better deal.
    pub better_deal_margin: f64,
    /// Minimum holistic score for `is_good_deal`.
    pub good_deal_threshold: u8,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            comparison: SignalWeights {
                price: 0.40,
                rating: 0.25,
                availability: 0.20,
                reputation: 0.15,
            },
            analysis_with_price: SignalWeights::default(),
            analysis_without_price: SignalWeights {
                price: 0.0,
                rating: 0.45,
                availability: 0.30,
                reputation: 0.25,
            },
            reputation: BTreeMap::new(),
            better_deal_margin: 5.0,
            good_deal_threshold: 60,
        }
    }
}

impl ScoringWeights {
    /// Reputation for `retailer`, preferring a configured override.
    #[must_use]
    pub fn reputation_of(&self, retailer: Retailer) -> f64 {
        self.reputation
            .get(&retailer)
            .copied()
            .unwrap_or_else(|| retailer.default_reputation())
    }

    /// Checks weight ranges.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Validation`] for negative or non-finite
    /// weights, all-zero non-price weight sets, reputations outside
    /// `[0, 1]`, or a threshold above 100.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.comparison.validate("comparison")?;
        self.analysis_with_price.validate("analysis_with_price")?;
        self.analysis_without_price
            .validate("analysis_without_price")?;

        for (retailer, value) in &self.reputation {
            if !(0.0..=1.0).contains(value) {
                return Err(ConfigError::Validation(format!(
                    "reputation for {retailer} must be within [0, 1], got {value}"
                )));
            }
        }
        if !self.better_deal_margin.is_finite() || self.better_deal_margin < 0.0 {
            return Err(ConfigError::Validation(
                "better_deal_margin must be a non-negative number".to_string(),
            ));
        }
        if self.good_deal_threshold > 100 {
            return Err(ConfigError::Validation(format!(
                "good_deal_threshold must be at most 100, got {}",
                self.good_deal_threshold
            )));
        }
        Ok(())
    }
}

/// Load and validate scoring weights from a YAML file.
///
/// # Errors
///
/// Returns `ConfigError` if the file cannot be read, parsed, or fails validation.
pub fn load_scoring_weights(path: &Path) -> Result<ScoringWeights, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::WeightsFileIo {
        path: path.display().to_string(),
        source: e,
    })?;
    parse_scoring_weights(&content)
}

fn parse_scoring_weights(content: &str) -> Result<ScoringWeights, ConfigError> {
    let weights: ScoringWeights = serde_yaml::from_str(content)?;
    weights.validate()?;
    Ok(weights)
}
