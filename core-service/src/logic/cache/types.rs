//! Cache Types
//!
//! Data structures only. The transition rules live in `store.rs`.

use serde::{Deserialize, Serialize};

// ============================================================================
// EVALUATION RESULT
// ============================================================================

/// Final answer of one evaluation. Immutable once created.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EvaluationResult {
    pub is_phishing: bool,
    /// Posterior probability of the predicted class (0.0 - 1.0)
    pub confidence: f32,
}

impl EvaluationResult {
    pub fn new(is_phishing: bool, confidence: f32) -> Self {
        Self {
            is_phishing,
            confidence: confidence.clamp(0.0, 1.0),
        }
    }

    /// Unsafe-by-default answer used for pending and failed evaluations
    pub const fn conservative() -> Self {
        Self {
            is_phishing: true,
            confidence: 1.0,
        }
    }
}

// ============================================================================
// CACHE ENTRY
// ============================================================================

/// Lifecycle state of a cached URL
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CacheStatus {
    /// Reserved, evaluation in flight
    Pending,
    /// Scored by the classifier
    Ready,
    /// Evaluation failed, conservative default stored
    Error,
}

impl CacheStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CacheStatus::Pending => "pending",
            CacheStatus::Ready => "ready",
            CacheStatus::Error => "error",
        }
    }
}

impl std::fmt::Display for CacheStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One cache slot.
///
/// `result` is only meaningful for `Ready` and `Error`; a `Pending` entry
/// carries the conservative default so readers never see an "unknown".
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub status: CacheStatus,
    pub result: EvaluationResult,
}

impl CacheEntry {
    pub fn pending() -> Self {
        Self {
            status: CacheStatus::Pending,
            result: EvaluationResult::conservative(),
        }
    }

    pub fn ready(result: EvaluationResult) -> Self {
        Self {
            status: CacheStatus::Ready,
            result,
        }
    }

    pub fn failed() -> Self {
        Self {
            status: CacheStatus::Error,
            result: EvaluationResult::conservative(),
        }
    }

    pub fn is_pending(&self) -> bool {
        self.status == CacheStatus::Pending
    }
}

// ============================================================================
// ERRORS
// ============================================================================

/// Rejected cache transition
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CacheError {
    /// `resolve`/`fail` on a key nobody reserved
    #[error("url was never reserved: {0}")]
    NotReserved(String),
    /// `resolve`/`fail` on a key that already left Pending
    #[error("url already resolved as {status}: {url}")]
    AlreadyResolved { url: String, status: CacheStatus },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conservative_default() {
        let result = EvaluationResult::conservative();
        assert!(result.is_phishing);
        assert_eq!(result.confidence, 1.0);
    }

    #[test]
    fn test_confidence_is_clamped() {
        assert_eq!(EvaluationResult::new(false, 1.7).confidence, 1.0);
        assert_eq!(EvaluationResult::new(false, -0.2).confidence, 0.0);
    }

    #[test]
    fn test_pending_entry_carries_conservative_result() {
        let entry = CacheEntry::pending();
        assert!(entry.is_pending());
        assert_eq!(entry.result, EvaluationResult::conservative());
        assert_eq!(CacheEntry::failed().result, EvaluationResult::conservative());
    }
}
