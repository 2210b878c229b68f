pub mod adapters;
pub mod error;
pub mod fetch;
pub(crate) mod parse;
pub mod pipeline;
pub(crate) mod rate_limit;
pub mod registry;
pub(crate) mod synthetic;

pub use adapters::SourceAdapter;
pub use error::ExtractionError;
pub use fetch::{with_budget, CachingFetcher, Fetcher, HttpFetcher, StaticFetcher, StaticReply};
pub use parse::{format_usd, parse_price_text, ParsedFields, SearchHit};
pub use pipeline::{Extraction, ExtractionPipeline, TierAttempt, TierOutcome};
pub use registry::AdapterRegistry;
