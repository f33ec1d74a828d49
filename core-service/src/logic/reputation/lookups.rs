//! Reputation Lookups - third-party network queries
//!
//! Every method is one blocking lookup bounded by its own timeout. The
//! `Lookups` trait exists so the resolver can be tested without network.

use std::net::{IpAddr, ToSocketAddrs};
use std::sync::mpsc;
use std::time::Duration;

use chrono::{DateTime, NaiveDate};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use url::Url;

use super::types::{FetchedPage, Registration, ReputationError};
use crate::constants::USER_AGENT;
use crate::logic::config::ReputationConfig;

static TRAFFIC_RANK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"<REACH[^>]*\bRANK="(\d+)""#).expect("traffic rank pattern"));

static GLOBAL_RANK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"Global Rank: ([0-9]+)").expect("global rank pattern"));

const NO_RESULTS_MARKER: &str = "did not match any documents";

// ============================================================================
// TRAIT
// ============================================================================

pub trait Lookups: Send + Sync {
    /// Registration record of a registrable domain
    fn registration(&self, domain: &str) -> Result<Registration, ReputationError>;

    /// Raw page with redirect hops counted
    fn fetch_page(&self, url: &str) -> Result<FetchedPage, ReputationError>;

    /// Global traffic rank, `None` when the site is unranked
    fn traffic_rank(&self, url: &str) -> Result<Option<u64>, ReputationError>;

    /// Page rank service position, `None` when absent
    fn page_rank(&self, domain: &str) -> Result<Option<u64>, ReputationError>;

    /// Whether a search engine returns anything for the URL
    fn index_presence(&self, url: &str) -> Result<bool, ReputationError>;

    /// Addresses the host resolves to
    fn resolve_host(&self, host: &str) -> Result<Vec<IpAddr>, ReputationError>;
}

// ============================================================================
// HTTP IMPLEMENTATION
// ============================================================================

/// Lookups over plain HTTP(S) and the system resolver
pub struct HttpLookups {
    /// Follows redirects; RDAP bootstrap and the rank services answer 3xx
    agent: ureq::Agent,
    /// Never follows redirects, so `fetch_page` can count hops
    page_agent: ureq::Agent,
    config: ReputationConfig,
}

impl HttpLookups {
    pub fn new(config: ReputationConfig) -> Self {
        let agent = ureq::AgentBuilder::new()
            .user_agent(USER_AGENT)
            .timeout(config.lookup_timeout)
            .redirects(config.max_redirects)
            .build();

        let page_agent = ureq::AgentBuilder::new()
            .user_agent(USER_AGENT)
            .timeout(config.lookup_timeout)
            .redirects(0)
            .build();

        Self {
            agent,
            page_agent,
            config,
        }
    }

    fn read_body(lookup: &'static str, response: ureq::Response) -> Result<String, ReputationError> {
        response.into_string().map_err(|e| {
            if e.kind() == std::io::ErrorKind::TimedOut {
                ReputationError::Timeout { lookup }
            } else {
                ReputationError::Network(e.to_string())
            }
        })
    }
}

/// Transport errors that are really timeouts get their own variant
fn classify(lookup: &'static str, err: ureq::Error) -> ReputationError {
    if let ureq::Error::Transport(transport) = &err {
        if transport.to_string().contains("timed out") {
            return ReputationError::Timeout { lookup };
        }
    }
    err.into()
}

impl Lookups for HttpLookups {
    fn registration(&self, domain: &str) -> Result<Registration, ReputationError> {
        let url = self.config.rdap_endpoint.replace("{}", domain);
        let response = match self.agent.get(&url).set("Accept", "application/rdap+json").call() {
            // registries answer unknown domains with 404
            Err(ureq::Error::Status(404, _)) => return Err(ReputationError::NotFound(domain.to_string())),
            other => other.map_err(|e| classify("registration", e))?,
        };

        let body = Self::read_body("registration", response)?;
        parse_rdap(&body)
    }

    fn fetch_page(&self, url: &str) -> Result<FetchedPage, ReputationError> {
        let mut current = url.to_string();
        let mut hops = 0u32;

        loop {
            // error pages still have a body worth scanning
            let response = match self.page_agent.get(&current).call() {
                Err(ureq::Error::Status(_, response)) => response,
                other => other.map_err(|e| classify("page fetch", e))?,
            };

            if !(300..400).contains(&response.status()) {
                let body = Self::read_body("page fetch", response)?;
                return Ok(FetchedPage {
                    final_url: current,
                    body,
                    hops,
                });
            }

            let Some(next) = next_location(&current, response.header("Location")) else {
                return Err(ReputationError::Parse(format!(
                    "redirect from {} without usable Location",
                    current
                )));
            };

            hops += 1;
            if hops > self.config.max_redirects {
                return Err(ReputationError::Network(format!(
                    "more than {} redirects",
                    self.config.max_redirects
                )));
            }
            current = next;
        }
    }

    fn traffic_rank(&self, url: &str) -> Result<Option<u64>, ReputationError> {
        let response = self
            .agent
            .get(&self.config.traffic_endpoint)
            .query("cli", "10")
            .query("dat", "s")
            .query("url", url)
            .call()
            .map_err(|e| classify("traffic rank", e))?;

        let body = Self::read_body("traffic rank", response)?;
        Ok(parse_traffic_rank(&body))
    }

    fn page_rank(&self, domain: &str) -> Result<Option<u64>, ReputationError> {
        let response = self
            .agent
            .post(&self.config.page_rank_endpoint)
            .send_form(&[("name", domain)])
            .map_err(|e| classify("page rank", e))?;

        let body = Self::read_body("page rank", response)?;
        Ok(parse_page_rank(&body))
    }

    fn index_presence(&self, url: &str) -> Result<bool, ReputationError> {
        let response = self
            .agent
            .get(&self.config.search_endpoint)
            .query("q", url)
            .query("num", "5")
            .call()
            .map_err(|e| classify("index presence", e))?;

        let body = Self::read_body("index presence", response)?;
        Ok(!body.trim().is_empty() && !body.contains(NO_RESULTS_MARKER))
    }

    fn resolve_host(&self, host: &str) -> Result<Vec<IpAddr>, ReputationError> {
        let target = format!("{}:80", host);
        run_with_timeout("dns", self.config.lookup_timeout, move || {
            target
                .to_socket_addrs()
                .map(|addrs| addrs.map(|a| a.ip()).collect())
                .map_err(|e| ReputationError::Network(e.to_string()))
        })
    }
}

// ============================================================================
// HELPERS
// ============================================================================

/// Run a blocking call on a helper thread and stop waiting after `timeout`.
/// The thread is detached if it overruns; its result is dropped.
pub fn run_with_timeout<T, F>(lookup: &'static str, timeout: Duration, f: F) -> Result<T, ReputationError>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, ReputationError> + Send + 'static,
{
    let (tx, rx) = mpsc::channel();
    std::thread::spawn(move || {
        let _ = tx.send(f());
    });

    match rx.recv_timeout(timeout) {
        Ok(result) => result,
        Err(mpsc::RecvTimeoutError::Timeout) => Err(ReputationError::Timeout { lookup }),
        Err(mpsc::RecvTimeoutError::Disconnected) => {
            Err(ReputationError::Network(format!("{} worker exited", lookup)))
        }
    }
}

fn next_location(current: &str, location: Option<&str>) -> Option<String> {
    let location = location?.trim();
    if location.is_empty() {
        return None;
    }
    Url::parse(current)
        .ok()?
        .join(location)
        .ok()
        .map(|u| u.to_string())
}

#[derive(Deserialize)]
struct RdapDomain {
    #[serde(default)]
    events: Vec<RdapEvent>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RdapEvent {
    #[serde(default)]
    event_action: String,
    #[serde(default)]
    event_date: String,
}

/// Creation and expiration dates out of an RDAP domain object; when an
/// event repeats, the first one wins
pub fn parse_rdap(body: &str) -> Result<Registration, ReputationError> {
    let domain: RdapDomain =
        serde_json::from_str(body).map_err(|e| ReputationError::Parse(e.to_string()))?;

    let event_date = |action: &str| {
        domain
            .events
            .iter()
            .find(|e| e.event_action.eq_ignore_ascii_case(action))
            .and_then(|e| parse_date(&e.event_date))
    };

    Ok(Registration {
        created: event_date("registration"),
        expires: event_date("expiration"),
        raw: body.to_string(),
    })
}

fn parse_date(value: &str) -> Option<NaiveDate> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.date_naive())
        .ok()
        .or_else(|| value.get(..10).and_then(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d").ok()))
}

pub fn parse_traffic_rank(body: &str) -> Option<u64> {
    TRAFFIC_RANK
        .captures(body)
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

pub fn parse_page_rank(body: &str) -> Option<u64> {
    GLOBAL_RANK
        .captures(body)
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_rdap() {
        let body = r#"{
            "objectClassName": "domain",
            "ldhName": "EXAMPLE.COM",
            "events": [
                {"eventAction": "registration", "eventDate": "1995-08-14T04:00:00Z"},
                {"eventAction": "expiration", "eventDate": "2026-08-13T04:00:00Z"},
                {"eventAction": "last changed", "eventDate": "2025-08-14T07:01:38Z"}
            ]
        }"#;
        let registration = parse_rdap(body).unwrap();
        assert_eq!(registration.created, NaiveDate::from_ymd_opt(1995, 8, 14));
        assert_eq!(registration.expires, NaiveDate::from_ymd_opt(2026, 8, 13));
        assert_eq!(registration.raw, body);
    }

    #[test]
    fn test_parse_rdap_without_events() {
        let registration = parse_rdap(r#"{"ldhName": "x.org"}"#).unwrap();
        assert!(registration.created.is_none());
        assert!(parse_rdap("<html>").is_err());
    }

    #[test]
    fn test_parse_date_formats() {
        assert_eq!(parse_date("2020-02-03"), NaiveDate::from_ymd_opt(2020, 2, 3));
        assert_eq!(parse_date("2020-02-03T10:00:00+02:00"), NaiveDate::from_ymd_opt(2020, 2, 3));
        assert_eq!(parse_date("soon"), None);
    }

    #[test]
    fn test_parse_ranks() {
        let xml = r#"<ALEXA><SD><POPULARITY URL="x.com/" TEXT="1200"/><REACH RANK="1187"/></SD></ALEXA>"#;
        assert_eq!(parse_traffic_rank(xml), Some(1187));
        assert_eq!(parse_traffic_rank("<ALEXA></ALEXA>"), None);
        assert_eq!(parse_page_rank("<b>Global Rank: 5321</b>"), Some(5321));
        assert_eq!(parse_page_rank("nothing"), None);
    }

    #[test]
    fn test_next_location() {
        assert_eq!(
            next_location("https://a.example/x/y", Some("/login")),
            Some("https://a.example/login".to_string())
        );
        assert_eq!(next_location("https://a.example/", None), None);
        assert_eq!(next_location("https://a.example/", Some("  ")), None);
    }

    // ---- network paths against a local server ----------------------------

    use crate::logic::test_server::{html, redirect, response, serve};

    const RDAP_BODY: &str = r#"{"events": [
        {"eventAction": "registration", "eventDate": "2001-03-09T00:00:00Z"},
        {"eventAction": "expiration", "eventDate": "2030-03-09T00:00:00Z"}
    ]}"#;

    fn lookups_for(base: &str) -> HttpLookups {
        HttpLookups::new(ReputationConfig {
            lookup_timeout: Duration::from_secs(5),
            rdap_endpoint: format!("{}/domain/{{}}", base),
            traffic_endpoint: format!("{}/data", base),
            search_endpoint: format!("{}/search", base),
            ..ReputationConfig::default()
        })
    }

    #[test]
    fn test_registration_follows_bootstrap_redirect() {
        let base = serve(|base| {
            vec![
                ("/domain/example.com", redirect(&format!("{}/registry/domain/example.com", base))),
                (
                    "/registry/domain/example.com",
                    response(200, "OK", &[("Content-Type", "application/rdap+json")], RDAP_BODY),
                ),
            ]
        });

        let registration = lookups_for(&base).registration("example.com").unwrap();
        assert_eq!(registration.created, NaiveDate::from_ymd_opt(2001, 3, 9));
        assert_eq!(registration.expires, NaiveDate::from_ymd_opt(2030, 3, 9));
    }

    #[test]
    fn test_registration_unknown_domain() {
        let base = serve(|_| vec![]);
        assert_eq!(
            lookups_for(&base).registration("nobody.test"),
            Err(ReputationError::NotFound("nobody.test".to_string()))
        );
    }

    #[test]
    fn test_fetch_page_counts_hops() {
        let base = serve(|base| {
            vec![
                ("/start", redirect(&format!("{}/middle", base))),
                ("/middle", redirect("/end")),
                ("/one", redirect("/end")),
                ("/end", html(200, "OK", "<a href=/home>home</a>")),
            ]
        });
        let lookups = lookups_for(&base);

        let page = lookups.fetch_page(&format!("{}/start", base)).unwrap();
        assert_eq!(page.hops, 2);
        assert_eq!(page.final_url, format!("{}/end", base));
        assert_eq!(page.body, "<a href=/home>home</a>");

        let page = lookups.fetch_page(&format!("{}/one", base)).unwrap();
        assert_eq!(page.hops, 1);

        let page = lookups.fetch_page(&format!("{}/end", base)).unwrap();
        assert_eq!(page.hops, 0);
    }

    #[test]
    fn test_fetch_page_keeps_error_body() {
        let base = serve(|_| vec![("/blocked", html(403, "Forbidden", "<iframe src=x></iframe>"))]);

        let page = lookups_for(&base).fetch_page(&format!("{}/blocked", base)).unwrap();
        assert_eq!(page.hops, 0);
        assert!(page.body.contains("<iframe"));
    }

    #[test]
    fn test_fetch_page_redirect_limit() {
        let base = serve(|_| vec![("/a", redirect("/b")), ("/b", redirect("/c")), ("/c", html(200, "OK", "x"))]);
        let lookups = HttpLookups::new(ReputationConfig {
            max_redirects: 1,
            ..ReputationConfig::default()
        });

        assert!(matches!(
            lookups.fetch_page(&format!("{}/a", base)),
            Err(ReputationError::Network(_))
        ));
    }

    #[test]
    fn test_rank_and_index_endpoints() {
        let base = serve(|_| {
            vec![
                ("/data", html(200, "OK", r#"<ALEXA><SD><REACH RANK="4321"/></SD></ALEXA>"#)),
                ("/search", html(200, "OK", "Your search - x - did not match any documents.")),
            ]
        });
        let lookups = lookups_for(&base);

        assert_eq!(lookups.traffic_rank("https://x.test/"), Ok(Some(4321)));
        assert_eq!(lookups.index_presence("https://x.test/"), Ok(false));
    }

    #[test]
    fn test_run_with_timeout() {
        let fast = run_with_timeout("fast", Duration::from_secs(1), || Ok(5));
        assert_eq!(fast, Ok(5));

        let slow = run_with_timeout("slow", Duration::from_millis(20), || {
            std::thread::sleep(Duration::from_millis(500));
            Ok(1)
        });
        assert_eq!(slow, Err(ReputationError::Timeout { lookup: "slow" }));
    }
}
