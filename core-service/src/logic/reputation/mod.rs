//! Reputation Module - host and domain reputation signals
//!
//! Network lookups (registration, traffic and page rank, search index,
//! DNS) behind the `Lookups` trait, resolved into reputation signals.

pub mod types;
pub mod lookups;
pub mod resolver;

pub use types::{FetchedPage, Registration, ReputationError};
pub use lookups::{HttpLookups, Lookups};
pub use resolver::ReputationResolver;
