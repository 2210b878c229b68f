//! Product records as seen by one retailer.
//!
//! A [`ProductRecord`] is immutable once the extraction pipeline hands it
//! out. The [`ProductLookup`] wrapper carries the explicit success/error
//! discriminant; an error lookup holds nothing but the URL and a message.

use chrono::{DateTime, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Retailers with a first-class source adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Retailer {
    Amazon,
    Walmart,
    Target,
    BestBuy,
    Ebay,
    Costco,
}

impl Retailer {
    pub const ALL: [Retailer; 6] = [
        Retailer::Amazon,
        Retailer::Walmart,
        Retailer::Target,
        Retailer::BestBuy,
        Retailer::Ebay,
        Retailer::Costco,
    ];

    /// Default trust factor in `[0, 1]` used when ranking offers.
    ///
    /// Marketplace-heavy retailers score lower because third-party listings
    /// vary in condition and fulfilment.
    #[must_use]
    pub fn default_reputation(self) -> f64 {
        match self {
            Retailer::BestBuy | Retailer::Costco => 0.9,
            Retailer::Amazon | Retailer::Target => 0.85,
            Retailer::Walmart => 0.8,
            Retailer::Ebay => 0.6,
        }
    }

    /// Stable snake_case key, matching the serde representation.
    #[must_use]
    pub fn key(self) -> &'static str {
        match self {
            Retailer::Amazon => "amazon",
            Retailer::Walmart => "walmart",
            Retailer::Target => "target",
            Retailer::BestBuy => "best_buy",
            Retailer::Ebay => "ebay",
            Retailer::Costco => "costco",
        }
    }
}

impl std::fmt::Display for Retailer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Retailer::Amazon => "Amazon",
            Retailer::Walmart => "Walmart",
            Retailer::Target => "Target",
            Retailer::BestBuy => "Best Buy",
            Retailer::Ebay => "eBay",
            Retailer::Costco => "Costco",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Availability {
    InStock,
    OutOfStock,
    Unknown,
}

impl std::fmt::Display for Availability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Availability::InStock => write!(f, "in stock"),
            Availability::OutOfStock => write!(f, "out of stock"),
            Availability::Unknown => write!(f, "availability unknown"),
        }
    }
}

/// Customer rating, either a star score or the explicit "No ratings" state.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Rating {
    /// Star score normalized to `0.0..=5.0`.
    Stars(f64),
    NoRatings,
}

impl Rating {
    /// Builds a star rating, clamping to `0.0..=5.0`. Non-finite input is
    /// treated as no rating.
    #[must_use]
    pub fn stars(value: f64) -> Self {
        if value.is_finite() {
            Rating::Stars(value.clamp(0.0, 5.0))
        } else {
            Rating::NoRatings
        }
    }

    #[must_use]
    pub fn as_stars(self) -> Option<f64> {
        match self {
            Rating::Stars(v) => Some(v),
            Rating::NoRatings => None,
        }
    }
}

/// Which extraction tier produced a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionMethod {
    Structured,
    Heuristic,
    Synthetic,
}

impl ExtractionMethod {
    #[must_use]
    pub fn confidence(self) -> f64 {
        match self {
            ExtractionMethod::Structured => 1.0,
            ExtractionMethod::Heuristic => 0.5,
            ExtractionMethod::Synthetic => 0.1,
        }
    }
}

impl std::fmt::Display for ExtractionMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExtractionMethod::Structured => write!(f, "structured"),
            ExtractionMethod::Heuristic => write!(f, "heuristic"),
            ExtractionMethod::Synthetic => write!(f, "synthetic"),
        }
    }
}

/// One retailer's view of one product.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductRecord {
    pub url: String,
    pub source: Retailer,
    pub title: String,
    /// Price in USD. `None` when the listing has no trustworthy price;
    /// `price_text` then says why.
    pub price: Option<Decimal>,
    /// Display string for the price, always present.
    pub price_text: String,
    pub rating: Option<Rating>,
    pub availability: Availability,
    /// Retailer-native identifier (ASIN, SKU, item number).
    pub item_id: Option<String>,
    pub extraction_method: ExtractionMethod,
    pub confidence: f64,
    /// When the record was produced; the only field expected to change
    /// between two extractions of an unchanged page.
    pub fetched_at: DateTime<Utc>,
}

impl ProductRecord {
    /// Price as `f64` for scoring.
    #[must_use]
    pub fn price_f64(&self) -> Option<f64> {
        self.price.and_then(|p| p.to_f64())
    }

    #[must_use]
    pub fn stars(&self) -> Option<f64> {
        self.rating.and_then(Rating::as_stars)
    }

    /// `true` unless the record was synthesized from the URL alone.
    #[must_use]
    pub fn has_usable_data(&self) -> bool {
        self.extraction_method != ExtractionMethod::Synthetic
    }

    /// Copy of the record with the time-varying metadata removed, for
    /// comparing two extractions of the same page.
    #[must_use]
    pub fn without_timestamp(&self) -> ProductRecord {
        ProductRecord {
            fetched_at: DateTime::<Utc>::default(),
            ..self.clone()
        }
    }
}

/// Outcome of a product lookup with an explicit status discriminant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ProductLookup {
    Success(ProductRecord),
    Error { url: String, message: String },
}

impl ProductLookup {
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, ProductLookup::Success(_))
    }

    #[must_use]
    pub fn record(&self) -> Option<&ProductRecord> {
        match self {
            ProductLookup::Success(record) => Some(record),
            ProductLookup::Error { .. } => None,
        }
    }

    #[must_use]
    pub fn into_record(self) -> Option<ProductRecord> {
        match self {
            ProductLookup::Success(record) => Some(record),
            ProductLookup::Error { .. } => None,
        }
    }
}

/// A comparable product at another retailer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlternativeCandidate {
    #[serde(flatten)]
    pub record: ProductRecord,
    pub is_better_deal: bool,
    pub reason: String,
    /// Ranking key only; not part of the serialized output.
    #[serde(skip)]
    pub comparison_score: f64,
}
