//! Holistic deal verdicts.
//!
//! The analyzer picks one of three weight branches, scores each active
//! signal in `[0, 1]`, renormalizes the branch weights over the active
//! signals, and reports the weighted sum on a 0-100 scale. It never fails:
//! missing inputs shift the branch or neutralize a signal instead.

use std::cmp::Ordering;

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

use dealscout_core::{
    AlternativeCandidate, Availability, DealVerdict, ProductRecord, Rating, ScoringWeights,
};
use dealscout_scraper::format_usd;

/// Primary records below this confidence are not trusted for price.
const MIN_PRICE_CONFIDENCE: f64 = 0.5;
/// Confidence ceiling when there is nothing to compare against.
const LONE_RECORD_CONFIDENCE: f64 = 0.5;
const NO_RATINGS_SCORE: f64 = 0.4;

const PRICE_UNAVAILABLE_NOTE: &str =
    "Price unavailable, so this verdict rests on rating, availability and retailer reputation";
const LONE_PRICE_UNAVAILABLE_NOTE: &str =
    "Price unavailable, so this verdict rests on rating and availability";
const NO_ALTERNATIVES_NOTE: &str =
    "No comparable alternatives were found; verdict based on rating and availability only";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Branch {
    PricePresent,
    PriceAbsent,
    NoAlternatives,
}

#[derive(Debug)]
struct ScoredSignal {
    weight: f64,
    score: f64,
    sentence: String,
}

impl ScoredSignal {
    fn impact(&self) -> f64 {
        self.weight * (self.score - 0.5).abs()
    }
}

pub struct DealAnalyzer {
    weights: ScoringWeights,
}

impl DealAnalyzer {
    #[must_use]
    pub fn new(weights: ScoringWeights) -> Self {
        Self { weights }
    }

    /// Renders a verdict for `primary` given the alternatives found for it.
    #[must_use]
    pub fn analyze(
        &self,
        primary: &ProductRecord,
        alternatives: &[AlternativeCandidate],
    ) -> DealVerdict {
        let branch = branch_for(primary, alternatives);
        let mut signals = self.signals(branch, primary, alternatives);

        let total_weight: f64 = signals.iter().map(|s| s.weight).sum();
        let weighted = if total_weight > 0.0 {
            signals
                .iter()
                .map(|s| s.weight / total_weight * s.score)
                .sum::<f64>()
        } else {
            0.5
        };
        let holistic_score = to_percent(weighted);

        // Stable sort: equal impacts keep price, rating, availability,
        // reputation order.
        signals.sort_by(|a, b| b.impact().partial_cmp(&a.impact()).unwrap_or(Ordering::Equal));
        let mut reasons: Vec<String> = signals.into_iter().map(|s| s.sentence).collect();
        if branch == Branch::NoAlternatives {
            reasons.push(NO_ALTERNATIVES_NOTE.to_string());
            if !price_is_trusted(primary) {
                reasons.push(LONE_PRICE_UNAVAILABLE_NOTE.to_string());
            }
        } else if branch == Branch::PriceAbsent {
            reasons.push(PRICE_UNAVAILABLE_NOTE.to_string());
        }

        let verdict = DealVerdict {
            is_good_deal: holistic_score >= self.weights.good_deal_threshold,
            holistic_score,
            confidence: confidence(primary, alternatives),
            verdict: label(branch, holistic_score).to_string(),
            reasons,
        };
        tracing::debug!(
            retailer = %primary.source,
            branch = ?branch,
            holistic_score,
            alternatives = alternatives.len(),
            "deal scored"
        );
        verdict
    }

    fn signals(
        &self,
        branch: Branch,
        primary: &ProductRecord,
        alternatives: &[AlternativeCandidate],
    ) -> Vec<ScoredSignal> {
        let weights = match branch {
            Branch::PricePresent => self.weights.analysis_with_price,
            Branch::PriceAbsent | Branch::NoAlternatives => self.weights.analysis_without_price,
        };
        let mut signals = Vec::with_capacity(4);

        if branch == Branch::PricePresent {
            if let Some(signal) = price_signal(primary, alternatives, weights.price) {
                signals.push(signal);
            }
        }

        let avg_alt_stars = average(alternatives.iter().filter_map(|a| a.record.stars()));
        let (score, sentence) = rating_signal(primary.rating, avg_alt_stars);
        signals.push(ScoredSignal {
            weight: weights.rating,
            score,
            sentence,
        });

        let (score, sentence) = availability_signal(primary.availability);
        signals.push(ScoredSignal {
            weight: weights.availability,
            score,
            sentence,
        });

        if branch != Branch::NoAlternatives {
            let reputation = self.weights.reputation_of(primary.source);
            signals.push(ScoredSignal {
                weight: weights.reputation,
                score: reputation,
                sentence: format!("Sold by {} (reputation {reputation:.2})", primary.source),
            });
        }

        signals
    }
}

fn branch_for(primary: &ProductRecord, alternatives: &[AlternativeCandidate]) -> Branch {
    if alternatives.is_empty() {
        Branch::NoAlternatives
    } else if price_is_trusted(primary) && alternatives.iter().any(|a| a.record.price.is_some()) {
        Branch::PricePresent
    } else {
        Branch::PriceAbsent
    }
}

fn price_is_trusted(primary: &ProductRecord) -> bool {
    primary.price.is_some() && primary.confidence >= MIN_PRICE_CONFIDENCE
}

fn price_signal(
    primary: &ProductRecord,
    alternatives: &[AlternativeCandidate],
    weight: f64,
) -> Option<ScoredSignal> {
    let price = primary.price?;
    let prices: Vec<Decimal> = alternatives.iter().filter_map(|a| a.record.price).collect();
    if prices.is_empty() {
        return None;
    }
    let total: Decimal = prices.iter().sum();
    let average = (total / Decimal::from(prices.len())).round_dp(2);

    let avg = average.to_f64()?;
    let ours = price.to_f64()?;
    let score = if avg > 0.0 {
        (0.5 + (avg - ours) / avg).clamp(0.0, 1.0)
    } else {
        0.5
    };
    Some(ScoredSignal {
        weight,
        score,
        sentence: format!(
            "Price {} vs. average {} among alternatives",
            format_usd(price),
            format_usd(average)
        ),
    })
}

fn rating_signal(rating: Option<Rating>, avg_alt_stars: Option<f64>) -> (f64, String) {
    match (rating, avg_alt_stars) {
        (Some(Rating::Stars(stars)), Some(avg)) => (
            (stars / 5.0 + (stars - avg) / 5.0).clamp(0.0, 1.0),
            format!("Rating {stars:.1} vs. average {avg:.1} among alternatives"),
        ),
        (Some(Rating::Stars(stars)), None) => (
            (stars / 5.0).clamp(0.0, 1.0),
            format!("Rating {stars:.1} out of 5"),
        ),
        (Some(Rating::NoRatings), _) => (NO_RATINGS_SCORE, "No customer ratings yet".to_string()),
        (None, _) => (0.5, "Rating not available".to_string()),
    }
}

fn availability_signal(availability: Availability) -> (f64, String) {
    match availability {
        Availability::InStock => (1.0, "In stock".to_string()),
        Availability::Unknown => (0.5, "Availability unknown".to_string()),
        Availability::OutOfStock => (0.0, "Out of stock".to_string()),
    }
}

/// Share of alternatives backed by real page data, capped by the primary's
/// own confidence.
#[allow(clippy::cast_precision_loss)]
fn confidence(primary: &ProductRecord, alternatives: &[AlternativeCandidate]) -> f64 {
    if alternatives.is_empty() {
        return primary.confidence.min(LONE_RECORD_CONFIDENCE);
    }
    let usable = alternatives
        .iter()
        .filter(|a| a.record.has_usable_data())
        .count();
    primary
        .confidence
        .min(usable as f64 / alternatives.len() as f64)
}

#[allow(clippy::cast_precision_loss)]
fn average(values: impl Iterator<Item = f64>) -> Option<f64> {
    let (sum, count) = values.fold((0.0, 0usize), |(sum, count), v| (sum + v, count + 1));
    (count > 0).then(|| sum / count as f64)
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn to_percent(weighted: f64) -> u8 {
    (weighted * 100.0).round().clamp(0.0, 100.0) as u8
}

fn label(branch: Branch, score: u8) -> &'static str {
    match (branch, score) {
        (Branch::PricePresent, 80..) => "Great deal",
        (Branch::PricePresent, 60..) => "Good deal",
        (Branch::PricePresent, 40..) => "Fair deal",
        (Branch::PricePresent, _) => "Overpriced",
        (_, 80..) => "Strong pick",
        (_, 60..) => "Solid pick",
        (_, 40..) => "Mixed signals",
        (_, _) => "Weak pick",
    }
}
