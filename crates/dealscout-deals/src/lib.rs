pub mod alternatives;
pub mod analyzer;
mod comparison;
pub mod provider;
pub mod search_key;

pub use alternatives::{AlternativesFinder, AlternativesOptions};
pub use analyzer::DealAnalyzer;
pub use provider::PriceProvider;
pub use search_key::{relevance, search_key};
