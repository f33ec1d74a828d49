//! Model Module - ML Inference Engine
//!
//! The evaluator only sees the `Classifier` trait, so the model runtime
//! can be swapped without touching feature extraction.

pub mod inference;

// Re-export common types
pub use inference::{Classifier, ClassifierError, ModelMetadata, OnnxClassifier, Prediction};
