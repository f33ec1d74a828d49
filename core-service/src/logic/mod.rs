//! Logic Module - Evaluation Engines
//!
//! ## Layout
//! - `cache/` - per-URL result cache and request coalescing
//! - `render/` - renderer boundary and the HTTP fallback renderer
//! - `features/` - schemas, signal extraction, vector assembly
//! - `reputation/` - third-party URL reputation lookups
//! - `model/` - classifier boundary (ONNX)
//! - `evaluator` - orchestration of one evaluation
//! - `dataset/` - offline training data collection

pub mod cache;
pub mod config;
pub mod dataset;
pub mod evaluator;
pub mod features;
pub mod model;
pub mod render;
pub mod reputation;

#[cfg(test)]
pub(crate) mod test_server;
