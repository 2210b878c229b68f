use serde::{Deserialize, Serialize};

use crate::product::{AlternativeCandidate, ProductLookup};

/// Holistic answer to "is this a good deal".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DealVerdict {
    pub is_good_deal: bool,
    /// Weighted summary in `0..=100`.
    pub holistic_score: u8,
    /// How much the verdict can be trusted, in `0.0..=1.0`.
    pub confidence: f64,
    /// Short label such as `"Good deal"` or `"Solid pick"`.
    pub verdict: String,
    /// Justifications, most impactful first.
    pub reasons: Vec<String>,
}

/// Everything produced by one end-to-end evaluation of a product URL.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DealReport {
    pub product: ProductLookup,
    pub alternatives: Vec<AlternativeCandidate>,
    /// `None` only when the product lookup itself failed.
    pub verdict: Option<DealVerdict>,
    /// Set when a caller cancellation cut the run short; the report then
    /// holds the best partial result collected before cancellation.
    pub cancelled: bool,
}
