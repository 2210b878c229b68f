//! Scores one alternative against the primary record.
//!
//! Each signal lands in `[0, 1]` with `0.5` meaning "no better, no worse".
//! The primary scored against itself is the baseline an alternative has to
//! beat by `better_deal_margin` points.

use dealscout_core::{Availability, ProductRecord, ScoringWeights};
use dealscout_scraper::format_usd;

/// Weighted differences smaller than this are not worth naming.
const NOTABLE_DIFFERENCE: f64 = 0.01;

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Comparison {
    /// Weighted score in `0..=100`.
    pub score: f64,
    pub baseline: f64,
    pub is_better_deal: bool,
    pub reason: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Signal {
    Price,
    Rating,
    Availability,
    Reputation,
}

pub(crate) fn compare(
    primary: &ProductRecord,
    candidate: &ProductRecord,
    weights: &ScoringWeights,
) -> Comparison {
    let prices = primary.price_f64().zip(candidate.price_f64());
    let primary_reputation = weights.reputation_of(primary.source);

    let mut signals = vec![
        (
            Signal::Rating,
            weights.comparison.rating,
            rating_signal(primary, candidate),
            0.5,
        ),
        (
            Signal::Availability,
            weights.comparison.availability,
            availability_signal(primary.availability, candidate.availability),
            0.5,
        ),
        (
            Signal::Reputation,
            weights.comparison.reputation,
            weights.reputation_of(candidate.source),
            primary_reputation,
        ),
    ];
    if let Some((primary_price, candidate_price)) = prices {
        signals.insert(
            0,
            (
                Signal::Price,
                weights.comparison.price,
                price_signal(primary_price, candidate_price),
                0.5,
            ),
        );
    }

    let total_weight: f64 = signals.iter().map(|(_, w, _, _)| w).sum();
    if total_weight <= 0.0 {
        return Comparison {
            score: 50.0,
            baseline: 50.0,
            is_better_deal: false,
            reason: "comparable offer".to_string(),
        };
    }

    let score = 100.0
        * signals
            .iter()
            .map(|(_, w, s, _)| w / total_weight * s)
            .sum::<f64>();
    let baseline = 100.0
        * signals
            .iter()
            .map(|(_, w, _, b)| w / total_weight * b)
            .sum::<f64>();

    let mut dominant: Option<(Signal, f64)> = None;
    for (signal, weight, value, base) in &signals {
        let delta = weight / total_weight * (value - base);
        let strongest = dominant.is_none_or(|(_, best)| delta.abs() > best.abs());
        if delta.abs() >= NOTABLE_DIFFERENCE && strongest {
            dominant = Some((*signal, delta));
        }
    }

    let reason = match dominant {
        Some((signal, delta)) => describe(signal, delta > 0.0, primary, candidate),
        None => "comparable offer".to_string(),
    };

    Comparison {
        score,
        baseline,
        is_better_deal: score > baseline + weights.better_deal_margin,
        reason,
    }
}

/// `0.5` plus half the relative saving.
fn price_signal(primary: f64, candidate: f64) -> f64 {
    if primary <= 0.0 {
        return 0.5;
    }
    let saving = (primary - candidate) / primary;
    (0.5 + saving / 2.0).clamp(0.0, 1.0)
}

/// `0.5` plus half the star delta on a 5-star scale; neutral when either
/// side lacks a star score.
fn rating_signal(primary: &ProductRecord, candidate: &ProductRecord) -> f64 {
    match (primary.stars(), candidate.stars()) {
        (Some(p), Some(c)) => (0.5 + (c - p) / 5.0 / 2.0).clamp(0.0, 1.0),
        _ => 0.5,
    }
}

fn availability_signal(primary: Availability, candidate: Availability) -> f64 {
    match (primary, candidate) {
        (p, Availability::InStock) if p != Availability::InStock => 1.0,
        (Availability::InStock, c) if c != Availability::InStock => 0.0,
        _ => 0.5,
    }
}

fn describe(
    signal: Signal,
    favorable: bool,
    primary: &ProductRecord,
    candidate: &ProductRecord,
) -> String {
    match signal {
        Signal::Price => {
            let (Some(theirs), Some(ours)) = (candidate.price, primary.price) else {
                return "comparable offer".to_string();
            };
            let direction = if favorable { "lower" } else { "higher" };
            format!("{direction} price ({} vs. {})", format_usd(theirs), format_usd(ours))
        }
        Signal::Rating => {
            let (Some(theirs), Some(ours)) = (candidate.stars(), primary.stars()) else {
                return "comparable offer".to_string();
            };
            let direction = if favorable { "higher" } else { "lower" };
            format!("{direction} rating ({theirs:.1} vs. {ours:.1})")
        }
        Signal::Availability => format!("{} vs. {}", candidate.availability, primary.availability),
        Signal::Reputation if favorable => "more reputable retailer".to_string(),
        Signal::Reputation => "less reputable retailer".to_string(),
    }
}
