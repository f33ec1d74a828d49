//! Static DOM Signals
//!
//! Deterministic, cheap and always available: computed from the parsed
//! document (plus the page URL for the same-site heuristics).

use once_cell::sync::Lazy;
use regex::Regex;

use super::document::StaticDocument;
use super::layout::SignalFamily;
use super::lexical::{self, LEXICAL_SIGNALS};
use super::signals::{flag, SignalResult, SignalSet};

static MAIL_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"mail\(\)|mailto:").expect("mail pattern"));

// ============================================================================
// PAGE CONTEXT
// ============================================================================

/// The URL a document was loaded from, as the same-site checks need it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageContext {
    pub url: String,
    pub host: String,
}

impl PageContext {
    pub fn new(url: &str) -> Self {
        Self {
            url: url.to_string(),
            host: lexical::host(url),
        }
    }

    /// Reference points at this page or host, or is a bare single-dot name
    fn is_same_site(&self, reference: &str) -> bool {
        (!self.url.is_empty() && reference.contains(&self.url))
            || (!self.host.is_empty() && reference.contains(&self.host))
            || reference.matches('.').count() == 1
    }

    fn references_page(&self, reference: &str) -> bool {
        (!self.url.is_empty() && reference.contains(&self.url))
            || (!self.host.is_empty() && reference.contains(&self.host))
    }
}

// ============================================================================
// TABLE-DRIVEN SIGNALS
// ============================================================================

/// Presence checks: (signal, selector)
const PRESENCE: &[(&str, &str)] = &[
    ("has_title", "title"),
    ("has_submit", "input[type=submit]"),
    ("has_link", "link"),
    ("has_h1", "h1"),
    ("has_h2", "h2"),
    ("has_h3", "h3"),
    ("has_footer", "footer"),
    ("has_text_area", "textarea"),
    ("has_iframe", "iframe"),
    ("has_text_input", "input[type=text]"),
    ("has_nav", "nav"),
];

/// Element counts: (signal, selector)
const COUNTS: &[(&str, &str)] = &[
    ("number_of_inputs", "input"),
    ("number_of_buttons", "button"),
    ("number_of_images", "img"),
    ("number_of_option", "option"),
    ("number_of_list", "li"),
    ("number_of_href", "a[href]"),
    ("number_of_paragraph", "p"),
    ("number_of_script", "script"),
    ("number_of_clickable_button", "button[type=button]"),
    ("number_of_a", "a"),
    ("number_of_div", "div"),
    ("number_of_forms", "form"),
    ("number_of_meta", "meta"),
    ("number_of_sources", "source"),
    ("number_of_span", "span"),
    ("number_of_table", "table"),
];

// ============================================================================
// INDIVIDUAL SIGNALS
// ============================================================================

pub fn has_email_input(doc: &StaticDocument) -> SignalResult {
    let found = doc.exists("input[type=email]")
        || doc.select("input").iter().any(|input| {
            ["id", "name"].iter().any(|attr| {
                input
                    .value()
                    .attr(attr)
                    .is_some_and(|v| v.to_lowercase().contains("email"))
            })
        });
    Ok(flag(found))
}

pub fn length_of_title(doc: &StaticDocument) -> SignalResult {
    Ok(doc.title().map(|t| t.chars().count()).unwrap_or(0) as f32)
}

pub fn length_of_text(doc: &StaticDocument) -> SignalResult {
    Ok(doc.text_len() as f32)
}

/// Same-site share of embedded media ≥ 50%
pub fn request_url(doc: &StaticDocument, page: &PageContext) -> SignalResult {
    let sources: Vec<String> = ["img", "audio", "embed", "iframe"]
        .iter()
        .flat_map(|tag| doc.attr_values(tag, "src"))
        .collect();
    Ok(flag(same_site_share(&sources, page).is_some_and(|share| share >= 50.0)))
}

/// Share of unsafe anchors < 50%
pub fn anchor_url(doc: &StaticDocument, page: &PageContext) -> SignalResult {
    let hrefs = doc.attr_values("a", "href");
    let unsafe_count = hrefs
        .iter()
        .filter(|href| {
            let lower = href.to_lowercase();
            href.contains('#')
                || lower.contains("javascript")
                || lower.contains("mailto")
                || !page.references_page(href)
        })
        .count();

    let percentage = if hrefs.is_empty() {
        100.0
    } else {
        unsafe_count as f32 / hrefs.len() as f32 * 100.0
    };
    Ok(flag(percentage < 50.0))
}

/// Any same-site `link[href]` in a document with a head
pub fn favicon(doc: &StaticDocument, page: &PageContext) -> SignalResult {
    if !doc.exists("head") {
        return Ok(0.0);
    }
    let found = doc
        .attr_values("link", "href")
        .iter()
        .any(|href| page.is_same_site(href));
    Ok(flag(found))
}

/// Same-site share of `link[href]` and `script[src]` ≥ 50%
pub fn links_in_script_tags(doc: &StaticDocument, page: &PageContext) -> SignalResult {
    let mut references = doc.attr_values("link", "href");
    references.extend(doc.attr_values("script", "src"));
    Ok(flag(same_site_share(&references, page).is_some_and(|share| share >= 50.0)))
}

/// Decided by the first form that declares an action
pub fn server_form_handler(doc: &StaticDocument, page: &PageContext) -> SignalResult {
    let actions = doc.attr_values("form", "action");
    let Some(action) = actions.first() else {
        return Ok(1.0);
    };

    if action.is_empty() || action == "about:blank" || !page.references_page(action) {
        Ok(0.0)
    } else {
        Ok(1.0)
    }
}

/// 0 when the markup submits to mail
pub fn info_email(doc: &StaticDocument) -> SignalResult {
    Ok(flag(!MAIL_PATTERN.is_match(doc.source())))
}

fn same_site_share(references: &[String], page: &PageContext) -> Option<f32> {
    if references.is_empty() {
        return None;
    }
    let same_site = references.iter().filter(|r| page.is_same_site(r)).count();
    Some(same_site as f32 / references.len() as f32 * 100.0)
}

// ============================================================================
// EXTRACTION
// ============================================================================

/// Every static signal: DOM structure, link heuristics and URL lexical
pub fn extract(doc: &StaticDocument, page: &PageContext) -> SignalSet {
    let mut set = SignalSet::new(SignalFamily::Static);

    for &(name, selector) in PRESENCE {
        set.insert(name, Ok(flag(doc.exists(selector))));
    }
    for &(name, selector) in COUNTS {
        set.insert(name, Ok(doc.count(selector) as f32));
    }

    set.insert("has_email_input", has_email_input(doc));
    set.insert("length_of_title", length_of_title(doc));
    set.insert("length_of_text", length_of_text(doc));

    set.insert("request_url", request_url(doc, page));
    set.insert("anchor_url", anchor_url(doc, page));
    set.insert("favicon", favicon(doc, page));
    set.insert("links_in_script_tags", links_in_script_tags(doc, page));
    set.insert("server_form_handler", server_form_handler(doc, page));
    set.insert("info_email", info_email(doc));

    for &(name, signal) in LEXICAL_SIGNALS {
        set.insert(name, signal(&page.url));
    }

    set
}

// ============================================================================
// TESTS
// ============================================================================
