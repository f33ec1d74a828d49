//! Signals - named, independently computed values
//!
//! Every signal function returns `Result<f32, SignalError>`. Nothing here
//! substitutes defaults: a failed signal is kept as an `Err` in its set and
//! the assembler applies the slot's declared default.

use std::collections::HashMap;

use super::layout::SignalFamily;
use crate::logic::render::RenderError;
use crate::logic::reputation::ReputationError;

// ============================================================================
// ERRORS
// ============================================================================

/// Why one signal could not be computed
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SignalError {
    #[error("render query failed: {0}")]
    Render(String),
    #[error("lookup failed: {0}")]
    Lookup(String),
    #[error("invalid url: {0}")]
    InvalidUrl(String),
    #[error("no data: {0}")]
    Unavailable(&'static str),
}

impl From<RenderError> for SignalError {
    fn from(err: RenderError) -> Self {
        SignalError::Render(err.to_string())
    }
}

impl From<ReputationError> for SignalError {
    fn from(err: ReputationError) -> Self {
        SignalError::Lookup(err.to_string())
    }
}

pub type SignalResult = Result<f32, SignalError>;

/// 1.0 / 0.0
pub fn flag(value: bool) -> f32 {
    if value { 1.0 } else { 0.0 }
}

// ============================================================================
// COMPOSITE SIGNALS
// ============================================================================

/// A small group of related counts, flattened in a fixed sub-order
pub trait SignalRecord {
    /// Slot names, in flattening order
    const FIELDS: &'static [&'static str];

    /// Values, same order and length as `FIELDS`
    fn values(&self) -> Vec<f32>;
}

// ============================================================================
// SIGNAL SET
// ============================================================================

/// Results of one family for one evaluation
#[derive(Debug, Clone)]
pub struct SignalSet {
    family: SignalFamily,
    values: HashMap<&'static str, SignalResult>,
}

impl SignalSet {
    pub fn new(family: SignalFamily) -> Self {
        Self {
            family,
            values: HashMap::new(),
        }
    }

    pub fn family(&self) -> SignalFamily {
        self.family
    }

    pub fn insert(&mut self, name: &'static str, result: SignalResult) {
        if let Err(err) = &result {
            log::debug!("{} signal {} failed: {}", self.family.as_str(), name, err);
        }
        self.values.insert(name, result);
    }

    /// Flatten a composite signal; a failed record fails every field
    pub fn insert_record<R: SignalRecord>(&mut self, record: Result<R, SignalError>) {
        match record {
            Ok(record) => {
                for (&name, value) in R::FIELDS.iter().zip(record.values()) {
                    self.insert(name, Ok(value));
                }
            }
            Err(err) => {
                for &name in R::FIELDS {
                    self.insert(name, Err(err.clone()));
                }
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<&SignalResult> {
        self.values.get(name)
    }

    /// Successful value, if any
    pub fn value(&self, name: &str) -> Option<f32> {
        self.values.get(name).and_then(|r| r.as_ref().ok()).copied()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Names of failed signals
    pub fn failures(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.values
            .iter()
            .filter(|(_, r)| r.is_err())
            .map(|(name, _)| *name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Pair {
        a: u32,
        b: u32,
    }

    impl SignalRecord for Pair {
        const FIELDS: &'static [&'static str] = &["pair_a", "pair_b"];

        fn values(&self) -> Vec<f32> {
            vec![self.a as f32, self.b as f32]
        }
    }

    #[test]
    fn test_record_flattening() {
        let mut set = SignalSet::new(SignalFamily::Dynamic);
        set.insert_record(Ok(Pair { a: 3, b: 4 }));
        assert_eq!(set.value("pair_a"), Some(3.0));
        assert_eq!(set.value("pair_b"), Some(4.0));
    }

    #[test]
    fn test_failed_record_fails_every_field() {
        let mut set = SignalSet::new(SignalFamily::Dynamic);
        set.insert_record::<Pair>(Err(SignalError::Unavailable("no forms")));
        assert_eq!(set.len(), 2);
        assert_eq!(set.failures().count(), 2);
        assert!(set.value("pair_a").is_none());
    }

    #[test]
    fn test_render_error_conversion() {
        let err: SignalError = RenderError::Unsupported("hidden_elements").into();
        assert!(matches!(err, SignalError::Render(_)));
    }
}
