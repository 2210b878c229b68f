//! Maps product URLs to the adapter that understands them.

use reqwest::Url;

use dealscout_core::Retailer;

use crate::adapters::{
    AmazonAdapter, BestBuyAdapter, CostcoAdapter, EbayAdapter, SourceAdapter, TargetAdapter,
    WalmartAdapter,
};
use crate::error::ExtractionError;

/// Host prefixes that serve the same storefront as the bare domain.
const HOST_ALIASES: [&str; 3] = ["www.", "m.", "smile."];

/// The fixed set of supported retailers, one adapter each.
pub struct AdapterRegistry {
    adapters: Vec<Box<dyn SourceAdapter>>,
}

impl Default for AdapterRegistry {
    fn default() -> Self {
        let adapters: Vec<Box<dyn SourceAdapter>> = vec![
            Box::new(AmazonAdapter),
            Box::new(WalmartAdapter),
            Box::new(TargetAdapter),
            Box::new(BestBuyAdapter),
            Box::new(EbayAdapter),
            Box::new(CostcoAdapter),
        ];
        Self::new(adapters)
    }
}

impl AdapterRegistry {
    #[must_use]
    pub fn new(adapters: Vec<Box<dyn SourceAdapter>>) -> Self {
        Self { adapters }
    }

    /// Resolves the retailer for `raw_url`.
    ///
    /// # Errors
    ///
    /// Returns [`ExtractionError::UnsupportedUrl`] when the URL does not
    /// parse, is not http(s), or belongs to no registered retailer.
    pub fn classify(&self, raw_url: &str) -> Result<(Retailer, Url), ExtractionError> {
        let url = Url::parse(raw_url.trim())
            .map_err(|e| ExtractionError::unsupported(raw_url, format!("malformed URL: {e}")))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ExtractionError::unsupported(
                raw_url,
                format!("unsupported scheme \"{}\"", url.scheme()),
            ));
        }
        let host = url
            .host_str()
            .map(str::to_ascii_lowercase)
            .ok_or_else(|| ExtractionError::unsupported(raw_url, "URL has no host"))?;
        let host = HOST_ALIASES
            .iter()
            .find_map(|prefix| host.strip_prefix(prefix))
            .unwrap_or(host.as_str())
            .to_string();

        self.adapters
            .iter()
            .find(|adapter| {
                adapter
                    .domains()
                    .iter()
                    .any(|domain| host == *domain || host.ends_with(&format!(".{domain}")))
            })
            .map(|adapter| (adapter.retailer(), url.clone()))
            .ok_or_else(|| {
                ExtractionError::unsupported(raw_url, format!("no adapter for host \"{host}\""))
            })
    }

    /// The adapter for `retailer`, if registered.
    #[must_use]
    pub fn adapter(&self, retailer: Retailer) -> Option<&dyn SourceAdapter> {
        self.adapters
            .iter()
            .find(|adapter| adapter.retailer() == retailer)
            .map(|adapter| &**adapter)
    }

    /// Every registered adapter except the one for `origin`, in
    /// registration order.
    pub fn alternatives_for(&self, origin: Retailer) -> impl Iterator<Item = &dyn SourceAdapter> {
        self.adapters
            .iter()
            .map(|adapter| &**adapter)
            .filter(move |adapter| adapter.retailer() != origin)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_known_hosts_and_aliases() {
        let registry = AdapterRegistry::default();
        let cases = [
            ("https://www.amazon.com/dp/B09B8V1LZ3", Retailer::Amazon),
            ("https://smile.amazon.com/dp/B09B8V1LZ3", Retailer::Amazon),
            ("https://m.bestbuy.com/site/x/6505727.p", Retailer::BestBuy),
            ("http://target.com/p/x/-/A-1", Retailer::Target),
            ("https://www.ebay.com/itm/285012345678", Retailer::Ebay),
            ("https://www.costco.com/x.product.1.html", Retailer::Costco),
            ("https://WWW.WALMART.COM/ip/1", Retailer::Walmart),
        ];
        for (url, expected) in cases {
            let (retailer, _) = registry.classify(url).unwrap();
            assert_eq!(retailer, expected, "{url}");
        }
    }

    #[test]
    fn rejects_unsupported_urls() {
        let registry = AdapterRegistry::default();
        for url in [
            "not a url",
            "ftp://www.amazon.com/dp/B09B8V1LZ3",
            "https://www.example.com/item",
            "https://notamazon.com/dp/B09B8V1LZ3",
        ] {
            let err = registry.classify(url).unwrap_err();
            assert!(matches!(err, ExtractionError::UnsupportedUrl { .. }), "{url}");
        }
    }

    #[test]
    fn alternatives_exclude_origin() {
        let registry = AdapterRegistry::default();
        let others: Vec<_> = registry
            .alternatives_for(Retailer::Target)
            .map(|a| a.retailer())
            .collect();
        assert_eq!(others.len(), 5);
        assert!(!others.contains(&Retailer::Target));
    }
}
