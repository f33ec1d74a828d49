//! Reputation Resolver
//!
//! Maps lookup results onto the reputation signals. Lookups that several
//! signals share (registration, raw page) are performed once per URL.

use std::net::IpAddr;
use std::sync::Arc;

use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;

use super::lookups::Lookups;
use super::types::{months_between, FetchedPage, Registration, ReputationError};
use crate::logic::features::layout::SignalFamily;
use crate::logic::features::lexical;
use crate::logic::features::signals::{flag, SignalError, SignalResult, SignalSet};

/// Rank below which a site counts as popular
const RANK_THRESHOLD: u64 = 100_000;

static STATUS_BAR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"<script>.+onmouseover.+</script>").expect("status bar pattern"));
static RIGHT_CLICK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"event.button ?== ?2").expect("right click pattern"));
static POPUP: Lazy<Regex> = Lazy::new(|| Regex::new(r"alert\(").expect("popup pattern"));
static IFRAME: Lazy<Regex> = Lazy::new(|| Regex::new(r"<iframe|<frameBorder>").expect("iframe pattern"));
static ANCHOR: Lazy<Regex> = Lazy::new(|| Regex::new(r"<a href=").expect("anchor pattern"));

static REPORTED_HOST: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"at\.ua|usa\.cc|hol\.es|ow\.ly").expect("reported host pattern"));
static REPORTED_IP: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"146\.112\.61\.108|192\.185\.217\.116|216\.58\.192\.225|10\.10\.10\.10")
        .expect("reported ip pattern")
});

/// Page-body checks: (signal, pattern)
static BODY_PATTERNS: Lazy<[(&'static str, &'static Regex); 4]> = Lazy::new(|| {
    [
        ("status_bar_cust", &*STATUS_BAR),
        ("disable_right_click", &*RIGHT_CLICK),
        ("using_popup_window", &*POPUP),
        ("iframe_redirection", &*IFRAME),
    ]
});

/// Public suffix plus one label (`shop.example.co.uk` -> `example.co.uk`).
/// IP literals and hosts that are themselves a suffix are returned unchanged.
pub fn registrable_domain(host: &str) -> String {
    let host = host.trim_end_matches('.');
    if host.parse::<IpAddr>().is_ok() {
        return host.to_string();
    }
    psl::domain_str(host).unwrap_or(host).to_string()
}

#[derive(Clone)]
pub struct ReputationResolver {
    lookups: Arc<dyn Lookups>,
}

impl ReputationResolver {
    pub fn new(lookups: Arc<dyn Lookups>) -> Self {
        Self { lookups }
    }

    /// Every reputation signal for `url`, dated today
    pub fn resolve(&self, url: &str) -> SignalSet {
        self.resolve_at(url, chrono::Local::now().date_naive())
    }

    pub fn resolve_at(&self, url: &str, today: NaiveDate) -> SignalSet {
        let mut set = SignalSet::new(SignalFamily::Reputation);

        let host = lexical::host(url);
        if host.is_empty() {
            let err = SignalError::InvalidUrl(url.to_string());
            for &name in SIGNALS {
                set.insert(name, Err(err.clone()));
            }
            return set;
        }
        let domain = registrable_domain(&host);

        let lookups = &*self.lookups;
        let fetched = std::thread::scope(|scope| {
            let registration = scope.spawn(|| lookups.registration(&domain));
            let page = scope.spawn(|| lookups.fetch_page(url));
            let traffic = scope.spawn(|| lookups.traffic_rank(url));
            let rank = scope.spawn(|| lookups.page_rank(&domain));
            let indexed = scope.spawn(|| lookups.index_presence(url));
            let addresses = scope.spawn(|| lookups.resolve_host(&host));

            Fetched {
                registration: join_lookup(registration),
                page: join_lookup(page),
                traffic: join_lookup(traffic),
                rank: join_lookup(rank),
                indexed: join_lookup(indexed),
                addresses: join_lookup(addresses),
            }
        });
        log::debug!(
            "Reputation lookups for {}: registration {}, page {}",
            domain,
            if fetched.registration.is_ok() { "ok" } else { "failed" },
            if fetched.page.is_ok() { "ok" } else { "failed" }
        );

        let Fetched {
            registration,
            page,
            traffic,
            rank,
            indexed,
            addresses,
        } = fetched;

        set.insert("domain_reg_len", domain_reg_len(&registration));
        let age = age_of_domain(&registration, today);
        set.insert("dns_recording", age.clone());
        set.insert("age_of_domain", age);
        set.insert("abnormal_url", abnormal_url(&page, &registration));
        set.insert("website_forwarding", website_forwarding(&page));

        for &(name, pattern) in BODY_PATTERNS.iter() {
            set.insert(name, body_matches(&page, pattern));
        }
        set.insert("links_pointing_to_page", links_pointing_to_page(&page));

        set.insert(
            "website_traffic",
            traffic
                .map(|rank| flag(rank.is_some_and(|r| r < RANK_THRESHOLD)))
                .map_err(SignalError::from),
        );
        set.insert(
            "page_rank",
            rank.map(|rank| flag(rank.is_some_and(|r| r > 0 && r < RANK_THRESHOLD)))
                .map_err(SignalError::from),
        );
        set.insert("google_index", indexed.map(flag).map_err(SignalError::from));
        set.insert("stats_report", stats_report(url, addresses));

        set
    }
}

/// Every lookup result for one URL
struct Fetched {
    registration: Result<Registration, ReputationError>,
    page: Result<FetchedPage, ReputationError>,
    traffic: Result<Option<u64>, ReputationError>,
    rank: Result<Option<u64>, ReputationError>,
    indexed: Result<bool, ReputationError>,
    addresses: Result<Vec<IpAddr>, ReputationError>,
}

/// A panicking lookup takes the whole resolution down with it
fn join_lookup<T>(handle: std::thread::ScopedJoinHandle<'_, T>) -> T {
    handle.join().unwrap_or_else(|payload| std::panic::resume_unwind(payload))
}

/// 0 when the URL or its resolved address is on the reported list
fn stats_report(url: &str, addresses: Result<Vec<IpAddr>, ReputationError>) -> SignalResult {
    if REPORTED_HOST.is_match(url) {
        return Ok(0.0);
    }
    let reported = addresses?.iter().any(|ip| REPORTED_IP.is_match(&ip.to_string()));
    Ok(flag(!reported))
}

/// Names produced by the resolver
const SIGNALS: &[&str] = &[
    "domain_reg_len",
    "abnormal_url",
    "website_forwarding",
    "status_bar_cust",
    "disable_right_click",
    "using_popup_window",
    "iframe_redirection",
    "age_of_domain",
    "dns_recording",
    "website_traffic",
    "page_rank",
    "google_index",
    "links_pointing_to_page",
    "stats_report",
];

// ============================================================================
// SIGNALS
// ============================================================================

type Lookup<'a, T> = &'a Result<T, ReputationError>;

/// Registered for at least a year
fn domain_reg_len(registration: Lookup<'_, Registration>) -> SignalResult {
    let registration = registration.as_ref().map_err(|e| SignalError::from(e.clone()))?;
    match (registration.created, registration.expires) {
        (Some(created), Some(expires)) => Ok(flag(months_between(created, expires) >= 12)),
        _ => Ok(0.0),
    }
}

/// Created at least six months ago
fn age_of_domain(registration: Lookup<'_, Registration>, today: NaiveDate) -> SignalResult {
    let registration = registration.as_ref().map_err(|e| SignalError::from(e.clone()))?;
    Ok(registration
        .created
        .map(|created| flag(months_between(created, today) >= 6))
        .unwrap_or(0.0))
}

/// Page body identical to the registration record; absent values compare as empty
fn abnormal_url(page: Lookup<'_, FetchedPage>, registration: Lookup<'_, Registration>) -> SignalResult {
    let body = page.as_ref().map(|p| p.body.as_str()).unwrap_or("");
    let raw = registration.as_ref().map(|r| r.raw.as_str()).unwrap_or("");
    Ok(flag(body == raw))
}

fn website_forwarding(page: Lookup<'_, FetchedPage>) -> SignalResult {
    let page = page.as_ref().map_err(|e| SignalError::from(e.clone()))?;
    Ok(flag(page.hops <= 1))
}

fn body_matches(page: Lookup<'_, FetchedPage>, pattern: &Regex) -> SignalResult {
    let page = page.as_ref().map_err(|e| SignalError::from(e.clone()))?;
    Ok(flag(pattern.is_match(&page.body)))
}

/// 1 when the page links to nothing at all
fn links_pointing_to_page(page: Lookup<'_, FetchedPage>) -> SignalResult {
    let page = page.as_ref().map_err(|e| SignalError::from(e.clone()))?;
    Ok(flag(!ANCHOR.is_match(&page.body)))
}

// ============================================================================
// TESTS
// ============================================================================
