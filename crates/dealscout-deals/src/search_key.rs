//! Search keys: the handful of salient title tokens used to query other
//! retailers and to judge whether a search hit is the same product.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;

static BRACKETED_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\([^)]*\)|\[[^\]]*\]|\{[^}]*\}").expect("valid regex"));
static STOREFRONT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"\b(?:amazon\.com|amazon|walmart\.com|walmart|target\.com|",
        r"best\s+buy|bestbuy\.com|bestbuy|ebay\.com|ebay|costco\.com|costco)\b",
    ))
    .expect("valid regex")
});

const STOP_WORDS: &[&str] = &[
    "a", "an", "and", "the", "or", "of", "for", "with", "in", "on", "to", "by", "at", "from",
    "new", "brand", "latest", "model", "edition", "version", "pack", "count", "ct", "set", "pc",
    "pcs", "piece", "free", "shipping", "sale", "deal", "genuine", "authentic", "official", "w",
];

/// Lowercases `title`, drops bracketed asides, storefront names, and filler,
/// and keeps the first `max_tokens` distinct salient tokens in order.
#[must_use]
pub fn search_key(title: &str, max_tokens: usize) -> Vec<String> {
    let mut seen = HashSet::new();
    tokenize(title)
        .into_iter()
        .filter(|token| seen.insert(token.clone()))
        .take(max_tokens)
        .collect()
}

/// Share of `key` tokens that also appear in `candidate_title`, in `[0, 1]`.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn relevance(key: &[String], candidate_title: &str) -> f64 {
    if key.is_empty() {
        return 0.0;
    }
    let candidate: HashSet<String> = tokenize(candidate_title).into_iter().collect();
    let shared = key.iter().filter(|token| candidate.contains(*token)).count();
    shared as f64 / key.len() as f64
}

fn tokenize(text: &str) -> Vec<String> {
    let lowered = text.to_lowercase();
    let without_asides = BRACKETED_RE.replace_all(&lowered, " ");
    let without_stores = STOREFRONT_RE.replace_all(&without_asides, " ");

    without_stores
        .split(|c: char| !(c.is_alphanumeric() || c == '-'))
        .map(|raw| raw.replace('-', ""))
        .filter(|token| {
            let salient_length =
                token.chars().count() >= 2 || token.chars().all(|c| c.is_ascii_digit());
            !token.is_empty() && salient_length && !STOP_WORDS.contains(&token.as_str())
        })
        .collect()
}
