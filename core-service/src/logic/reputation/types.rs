//! Reputation types: lookup results and errors

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

// ============================================================================
// ERRORS
// ============================================================================

/// Why one lookup failed
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ReputationError {
    #[error("{lookup} lookup timed out")]
    Timeout { lookup: &'static str },
    #[error("network error: {0}")]
    Network(String),
    #[error("HTTP {status} from {url}")]
    Status { status: u16, url: String },
    #[error("parse error: {0}")]
    Parse(String),
    #[error("no record for {0}")]
    NotFound(String),
}

impl From<ureq::Error> for ReputationError {
    fn from(err: ureq::Error) -> Self {
        match err {
            ureq::Error::Status(status, response) => ReputationError::Status {
                status,
                url: response.get_url().to_string(),
            },
            ureq::Error::Transport(transport) => ReputationError::Network(transport.to_string()),
        }
    }
}

// ============================================================================
// LOOKUP RESULTS
// ============================================================================

/// Domain registration record
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Registration {
    pub created: Option<NaiveDate>,
    pub expires: Option<NaiveDate>,
    /// Record as returned by the registry, verbatim
    pub raw: String,
}

/// Page fetched with redirects followed by hand
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FetchedPage {
    pub final_url: String,
    pub body: String,
    /// Redirect responses seen before the final one
    pub hops: u32,
}

/// Whole months between two dates, ignoring days
pub fn months_between(from: NaiveDate, to: NaiveDate) -> i32 {
    use chrono::Datelike;
    (to.year() - from.year()) * 12 + (to.month() as i32 - from.month() as i32)
}
