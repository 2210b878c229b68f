use thiserror::Error;

/// Failures raised by the fetch collaborator and the source adapters.
///
/// The variants fall into three classes that drive the extraction pipeline:
/// transient fetch failures (see [`ExtractionError::is_transient`]),
/// structural failures where content arrived but the expected fields did
/// not, and caller errors ([`ExtractionError::UnsupportedUrl`]).
#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("timed out after {timeout_ms}ms fetching {url}")]
    Timeout { url: String, timeout_ms: u128 },

    #[error("rate limited by {domain} (retry after {retry_after_secs}s)")]
    RateLimited {
        domain: String,
        retry_after_secs: u64,
    },

    #[error("page not found: {url}")]
    NotFound { url: String },

    #[error("unexpected HTTP status {status} from {url}")]
    UnexpectedStatus { status: u16, url: String },

    #[error("bot challenge served instead of content at {url}")]
    BotChallenge { url: String },

    #[error("structural parse failure for {url}: {reason}")]
    StructuralParse { url: String, reason: String },

    #[error("unsupported URL \"{url}\": {reason}")]
    UnsupportedUrl { url: String, reason: String },

    #[error("fetch cancelled for {url}")]
    Cancelled { url: String },
}

impl ExtractionError {
    /// Network-level conditions worth one more attempt: connection failures,
    /// timeouts, 429s, and 5xx responses.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            ExtractionError::Http(_)
            | ExtractionError::Timeout { .. }
            | ExtractionError::RateLimited { .. } => true,
            ExtractionError::UnexpectedStatus { status, .. } => *status >= 500,
            _ => false,
        }
    }

    /// Whether the pipeline may degrade to the next extraction tier.
    ///
    /// Everything except an unsupported URL is recoverable: a page that
    /// cannot be fetched or parsed still leaves the URL itself to work with.
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, ExtractionError::UnsupportedUrl { .. })
    }

    pub(crate) fn structural(url: &str, reason: impl Into<String>) -> Self {
        ExtractionError::StructuralParse {
            url: url.to_owned(),
            reason: reason.into(),
        }
    }

    pub(crate) fn unsupported(url: &str, reason: impl Into<String>) -> Self {
        ExtractionError::UnsupportedUrl {
            url: url.to_owned(),
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn server_errors_are_transient_client_errors_are_not() {
        let server = ExtractionError::UnexpectedStatus {
            status: 503,
            url: "https://www.target.com/p/x".to_string(),
        };
        let forbidden = ExtractionError::UnexpectedStatus {
            status: 403,
            url: "https://www.target.com/p/x".to_string(),
        };
        assert!(server.is_transient());
        assert!(!forbidden.is_transient());
        assert!(forbidden.is_recoverable());
    }

    #[test]
    fn structural_and_timeout_classification() {
        let parse = ExtractionError::structural("https://www.ebay.com/itm/1", "no title");
        assert!(!parse.is_transient());
        assert!(parse.is_recoverable());

        let timeout = ExtractionError::Timeout {
            url: "https://www.ebay.com/itm/1".to_string(),
            timeout_ms: 10,
        };
        assert!(timeout.is_transient());
        assert!(timeout.is_recoverable());
    }

    #[test]
    fn unsupported_url_is_fatal() {
        let err = ExtractionError::unsupported("https://example.org/item", "unknown retailer");
        assert!(!err.is_recoverable());
        assert!(!err.is_transient());
        assert!(err.to_string().contains("example.org"));
    }
}
