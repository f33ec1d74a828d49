//! URL Lexical Signals
//!
//! Computed from the raw URL string only: no rendering, no network.
//! The authority ("netloc") is taken verbatim from the string, so userinfo
//! and explicit ports are kept, exactly as typed.

use std::net::IpAddr;
use once_cell::sync::Lazy;
use regex::Regex;
use url::{Host, Url};

use super::signals::{flag, SignalResult};

/// Known URL shortener providers
pub const SHORTENERS: &[&str] = &[
    "bit.ly", "goo.gl", "shorte.st", "go2l.ink", "x.co", "ow.ly", "t.co", "tinyurl", "tr.im", "is.gd",
];

static SHORTENER_PATTERN: Lazy<Regex> = Lazy::new(|| {
    let alternatives: Vec<String> = SHORTENERS.iter().map(|s| regex::escape(s)).collect();
    Regex::new(&format!("({})", alternatives.join("|"))).expect("shortener pattern")
});

// ============================================================================
// URL LENGTH
// ============================================================================

/// Length class of a URL
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UrlLength {
    /// < 54 characters
    Short,
    /// 54 - 75 characters
    Medium,
    /// > 75 characters
    Long,
}

impl UrlLength {
    pub fn classify(url: &str) -> Self {
        match url.chars().count() {
            0..=53 => UrlLength::Short,
            54..=75 => UrlLength::Medium,
            _ => UrlLength::Long,
        }
    }
}

// ============================================================================
// HELPERS
// ============================================================================

/// Raw authority component: everything between `://` and the path
pub fn netloc(url: &str) -> &str {
    let Some(start) = url.find("://") else {
        return "";
    };
    let rest = &url[start + 3..];
    let end = rest.find(|c| matches!(c, '/' | '?' | '#')).unwrap_or(rest.len());
    &rest[..end]
}

/// Host without userinfo or port, lowercased when the URL parses
pub fn host(url: &str) -> String {
    Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(str::to_string))
        .unwrap_or_else(|| {
            let authority = netloc(url);
            let without_user = authority.rsplit('@').next().unwrap_or(authority);
            without_user.split(':').next().unwrap_or_default().to_string()
        })
}

// ============================================================================
// SIGNALS
// ============================================================================

/// Host is an IP literal (or the whole string is one)
pub fn using_ip(url: &str) -> SignalResult {
    if url.trim().parse::<IpAddr>().is_ok() {
        return Ok(1.0);
    }
    let is_ip = Url::parse(url)
        .ok()
        .and_then(|u| u.host().map(|h| matches!(h, Host::Ipv4(_) | Host::Ipv6(_))))
        .unwrap_or(false);
    Ok(flag(is_ip))
}

/// Short and medium score 0, long scores 1
pub fn long_url(url: &str) -> SignalResult {
    Ok(flag(UrlLength::classify(url) == UrlLength::Long))
}

pub fn short_url(url: &str) -> SignalResult {
    Ok(flag(SHORTENER_PATTERN.is_match(url)))
}

pub fn symbol(url: &str) -> SignalResult {
    Ok(flag(url.contains('@')))
}

/// A `//` after the scheme separator means an embedded redirect
pub fn redirecting(url: &str) -> SignalResult {
    Ok(flag(url.rfind("//").is_some_and(|pos| pos > 6)))
}

pub fn prefix_suffix(url: &str) -> SignalResult {
    Ok(flag(netloc(url).contains('-')))
}

/// More than two dots anywhere in the URL
pub fn sub_domains(url: &str) -> SignalResult {
    Ok(flag(url.matches('.').count() > 2))
}

/// 0 when the authority carries an explicit port
pub fn non_std_port(url: &str) -> SignalResult {
    Ok(flag(!netloc(url).contains(':')))
}

/// 0 when "https" is part of the host name itself
pub fn https_domain_url(url: &str) -> SignalResult {
    Ok(flag(!netloc(url).contains("https")))
}

/// Every lexical signal, in layout order
pub const LEXICAL_SIGNALS: &[(&str, fn(&str) -> SignalResult)] = &[
    ("using_ip", using_ip),
    ("long_url", long_url),
    ("short_url", short_url),
    ("symbol", symbol),
    ("redirecting", redirecting),
    ("prefix_suffix", prefix_suffix),
    ("sub_domains", sub_domains),
    ("non_std_port", non_std_port),
    ("https_domain_url", https_domain_url),
];

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn url_of_len(len: usize) -> String {
        let prefix = "http://a.co/";
        format!("{}{}", prefix, "x".repeat(len - prefix.len()))
    }

    #[test]
    fn test_long_url_boundaries() {
        assert_eq!(long_url(&url_of_len(53)), Ok(0.0));
        assert_eq!(long_url(&url_of_len(54)), Ok(0.0));
        assert_eq!(long_url(&url_of_len(75)), Ok(0.0));
        assert_eq!(long_url(&url_of_len(76)), Ok(1.0));
        assert_eq!(UrlLength::classify(&url_of_len(60)), UrlLength::Medium);
    }

    #[test]
    fn test_short_url() {
        assert_eq!(short_url("https://tinyurl.com/abc"), Ok(1.0));
        assert_eq!(short_url("https://bit.ly/x"), Ok(1.0));
        assert_eq!(short_url("https://example.org/page"), Ok(0.0));
    }

    #[test]
    fn test_sub_domains_boundaries() {
        assert_eq!(sub_domains("http://a.b.com"), Ok(0.0));
        assert_eq!(sub_domains("http://a.b.c.com"), Ok(1.0));
    }

    #[test]
    fn test_using_ip() {
        assert_eq!(using_ip("http://192.168.1.10/login"), Ok(1.0));
        assert_eq!(using_ip("http://[::1]:8080/"), Ok(1.0));
        assert_eq!(using_ip("10.0.0.1"), Ok(1.0));
        assert_eq!(using_ip("https://example.com"), Ok(0.0));
    }

    #[test]
    fn test_symbol_and_redirecting() {
        assert_eq!(symbol("http://user@host.com"), Ok(1.0));
        assert_eq!(redirecting("https://example.com"), Ok(0.0));
        assert_eq!(redirecting("http://a.com//http://b.com"), Ok(1.0));
    }

    #[test]
    fn test_authority_signals() {
        assert_eq!(netloc("https://my-bank.com:8443/x?y"), "my-bank.com:8443");
        assert_eq!(netloc("no scheme here"), "");
        assert_eq!(prefix_suffix("https://my-bank.com/a-b"), Ok(1.0));
        assert_eq!(prefix_suffix("https://bank.com/a-b"), Ok(0.0));
        assert_eq!(non_std_port("https://bank.com:8443/"), Ok(0.0));
        assert_eq!(non_std_port("https://bank.com/"), Ok(1.0));
        assert_eq!(https_domain_url("http://https-bank.com/"), Ok(0.0));
        assert_eq!(https_domain_url("https://bank.com/"), Ok(1.0));
    }

    #[test]
    fn test_host() {
        assert_eq!(host("https://User@Example.COM:81/x"), "example.com");
        assert_eq!(host("not a url"), "");
    }
}
