//! Cache Module - Request-Coalescing Result Cache
//!
//! Keyed by the exact URL string. The first caller to `reserve` a key owns
//! its evaluation; everybody else observes whatever state exists.
//!
//! Entries are permanent for the lifetime of the process and a Pending entry
//! never blocks readers.

pub mod types;
pub mod store;

pub use types::{CacheEntry, CacheStatus, EvaluationResult, CacheError};
pub use store::ResultCache;
