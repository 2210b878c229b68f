//! Retailer-specific markup selectors expressed as capture patterns.

use regex::Regex;

use dealscout_core::Rating;

use super::{
    availability_from_text, clean_text, format_usd, parse_amount, parse_price_text, ParsedFields,
};

/// Capture patterns for the product fields a retailer renders in its page
/// markup. Each pattern's first capture group holds the field's raw text.
pub(crate) struct MarkupPatterns {
    title: Regex,
    price: Regex,
    rating: Option<Regex>,
    availability: Option<Regex>,
}

impl MarkupPatterns {
    /// Compiles the patterns. Intended for `LazyLock` statics holding
    /// literal patterns, so an invalid pattern is a programming error.
    pub(crate) fn new(
        title: &str,
        price: &str,
        rating: Option<&str>,
        availability: Option<&str>,
    ) -> Self {
        Self {
            title: Regex::new(title).expect("valid title regex"),
            price: Regex::new(price).expect("valid price regex"),
            rating: rating.map(|p| Regex::new(p).expect("valid rating regex")),
            availability: availability.map(|p| Regex::new(p).expect("valid availability regex")),
        }
    }

    pub(crate) fn extract(&self, html: &str) -> ParsedFields {
        let capture = |re: &Regex| {
            re.captures(html)
                .and_then(|c| c.get(1))
                .map(|m| clean_text(m.as_str()))
                .filter(|s| !s.is_empty())
        };

        let title = capture(&self.title);
        let price = capture(&self.price)
            .and_then(|raw| parse_price_text(&raw).or_else(|| parse_amount(&raw)));
        let rating = self
            .rating
            .as_ref()
            .and_then(capture)
            .and_then(|raw| raw.split_whitespace().next()?.parse::<f64>().ok())
            .map(Rating::stars);
        let availability = self
            .availability
            .as_ref()
            .and_then(capture)
            .and_then(|raw| availability_from_text(&raw));

        ParsedFields {
            title,
            price,
            price_text: price.map(format_usd),
            rating,
            availability,
            item_id: None,
            url: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use rust_decimal::Decimal;

    use dealscout_core::Availability;

    use super::*;

    #[test]
    fn extracts_each_captured_field() {
        let patterns = MarkupPatterns::new(
            r#"(?is)<h1 class="title">(.*?)</h1>"#,
            r#"(?is)<span class="price">(.*?)</span>"#,
            Some(r#"(?is)<span class="stars">(.*?)</span>"#),
            Some(r#"(?is)<div class="stock">(.*?)</div>"#),
        );
        let html = r#"<h1 class="title"> Air Fryer &amp; Grill </h1>
            <span class="price">$1,049.00</span>
            <span class="stars">4.7 stars</span>
            <div class="stock">Out of stock</div>"#;
        let fields = patterns.extract(html);
        assert_eq!(fields.title.as_deref(), Some("Air Fryer & Grill"));
        assert_eq!(fields.price, Decimal::from_str("1049.00").ok());
        assert_eq!(fields.price_text.as_deref(), Some("$1049.00"));
        assert_eq!(fields.rating, Some(Rating::Stars(4.7)));
        assert_eq!(fields.availability, Some(Availability::OutOfStock));
    }

    #[test]
    fn missing_markup_yields_empty_fields() {
        let patterns =
            MarkupPatterns::new(r"(?is)<h1>(.*?)</h1>", r"(?is)<b>(.*?)</b>", None, None);
        assert_eq!(patterns.extract("<p>nothing</p>"), ParsedFields::default());
    }
}
