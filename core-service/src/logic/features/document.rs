//! Static Document - read-only parsed DOM
//!
//! Thin query layer over `scraper::Html` shaped around what the static
//! signals ask: element counts, presence, attribute filters, title and text.

use scraper::{ElementRef, Html, Selector};

/// Parsed page plus its raw markup
pub struct StaticDocument {
    html: Html,
    source: String,
}

impl StaticDocument {
    pub fn parse(source: &str) -> Self {
        Self {
            html: Html::parse_document(source),
            source: source.to_string(),
        }
    }

    /// Raw markup as received
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Elements matching a CSS selector; an invalid selector matches nothing
    pub fn select<'a>(&'a self, css: &str) -> Vec<ElementRef<'a>> {
        match Selector::parse(css) {
            Ok(selector) => self.html.select(&selector).collect(),
            Err(_) => {
                log::warn!("Invalid selector {:?}", css);
                Vec::new()
            }
        }
    }

    pub fn count(&self, css: &str) -> usize {
        self.select(css).len()
    }

    pub fn exists(&self, css: &str) -> bool {
        self.count(css) > 0
    }

    /// Attribute values of every `tag[attr]`
    pub fn attr_values(&self, tag: &str, attr: &str) -> Vec<String> {
        self.select(&format!("{}[{}]", tag, attr))
            .into_iter()
            .filter_map(|el| el.value().attr(attr).map(str::to_string))
            .collect()
    }

    /// Text of the first `<title>`, if the document has one
    pub fn title(&self) -> Option<String> {
        self.select("title")
            .first()
            .map(|title| title.text().collect::<String>())
    }

    /// Character count of all text nodes
    pub fn text_len(&self) -> usize {
        self.html
            .root_element()
            .text()
            .map(|t| t.chars().count())
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_queries() {
        let doc = StaticDocument::parse(
            "<html><head><title>Sign in</title></head><body><a href='/x'>A</a><a>B</a></body></html>",
        );
        assert_eq!(doc.count("a"), 2);
        assert_eq!(doc.count("a[href]"), 1);
        assert_eq!(doc.attr_values("a", "href"), vec!["/x".to_string()]);
        assert_eq!(doc.title().as_deref(), Some("Sign in"));
        assert_eq!(doc.text_len(), "Sign inAB".len());
    }

    #[test]
    fn test_invalid_selector_matches_nothing() {
        let doc = StaticDocument::parse("<p>x</p>");
        assert_eq!(doc.count("p[[["), 0);
    }

    #[test]
    fn test_missing_title() {
        let doc = StaticDocument::parse("<p>no head</p>");
        assert!(doc.title().is_none());
    }
}
