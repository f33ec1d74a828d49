//! Feature Vector - Core data structure for ML input
//!
//! **Versioned feature vector with layout validation**
//!
//! A vector always has exactly one value per slot of its schema. It is only
//! ever built by the assembler, never from whatever signals happened to
//! succeed.

use serde::{Deserialize, Serialize};
use super::layout::{FeatureSchema, LayoutInfo, LayoutMismatchError};

// ============================================================================
// VERSIONED FEATURE VECTOR
// ============================================================================

/// Versioned Feature Vector with layout metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector {
    /// Schema name ("full", "top20")
    pub schema: String,
    /// Feature layout version
    pub version: u8,
    /// CRC32 hash of the feature layout (for mismatch detection)
    pub layout_hash: u32,
    /// Feature values in schema order
    pub values: Vec<f32>,
}

impl FeatureVector {
    /// Vector holding every slot's default value
    pub fn defaults(schema: &FeatureSchema) -> Self {
        Self {
            schema: schema.name.to_string(),
            version: schema.version,
            layout_hash: schema.layout_hash(),
            values: schema.features.iter().map(|f| f.default).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Get feature by index
    pub fn get(&self, index: usize) -> Option<f32> {
        self.values.get(index).copied()
    }

    /// Get feature by name
    pub fn get_by_name(&self, name: &str) -> Option<f32> {
        FeatureSchema::by_name(&self.schema)
            .and_then(|schema| schema.index_of(name))
            .and_then(|i| self.get(i))
    }

    /// Set feature by index; out-of-range indexes are ignored
    pub(crate) fn set(&mut self, index: usize, value: f32) {
        if let Some(slot) = self.values.get_mut(index) {
            *slot = value;
        }
    }

    /// Layout this vector claims to follow
    pub fn layout(&self) -> LayoutInfo {
        LayoutInfo {
            schema: self.schema.clone(),
            version: self.version,
            hash: self.layout_hash,
            feature_count: self.values.len(),
            feature_names: Vec::new(),
        }
    }

    /// Validate that this vector is compatible with `schema`
    pub fn validate(&self, schema: &FeatureSchema) -> Result<(), LayoutMismatchError> {
        schema.validate(&self.layout())
    }
}

// ============================================================================
// TESTS
// ============================================================================
