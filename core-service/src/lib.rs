//! PhishGuard core: decides whether a URL hosts a phishing page.
//!
//! Renders the page, extracts static, dynamic and reputation signals,
//! assembles them into a versioned feature vector, classifies it and
//! caches the verdict per URL.

pub mod constants;
pub mod logic;
