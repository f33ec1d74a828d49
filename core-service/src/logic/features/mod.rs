//! Features Module - Feature Extraction Engine
//!
//! Signals are computed independently per family (static, dynamic,
//! reputation) and assembled into a versioned, fixed-length vector.
//! Add or change signals here without touching the evaluator.

pub mod layout;
pub mod vector;
pub mod signals;
pub mod document;
pub mod lexical;
pub mod static_dom;
pub mod dynamic;
pub mod assembler;


// Re-export common types
pub use layout::{FeatureSchema, FeatureSpec, LayoutInfo, LayoutMismatchError, SignalFamily, FULL_SCHEMA, TOP20_SCHEMA};
pub use vector::FeatureVector;
pub use signals::{SignalError, SignalRecord, SignalResult, SignalSet};
pub use document::StaticDocument;
pub use static_dom::PageContext;
pub use dynamic::{PasswordFields, SuspiciousScripts};
pub use assembler::Assembler;
