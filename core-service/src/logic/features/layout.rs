//! Feature Layout - Centralized Feature Definition
//!
//! **CRITICAL: This file controls the feature schemas**
//!
//! ## Rules (NEVER break these):
//! 1. Add feature → increment the schema version
//! 2. Change order → increment the schema version
//! 3. Remove feature → increment the schema version
//!
//! Every schema must match, slot for slot, the column order the classifier
//! was trained on. A model trained on a different layout is rejected at load
//! time through the layout hash.

use crc32fast::Hasher;
use serde::{Deserialize, Serialize};

// ============================================================================
// FEATURE SPEC
// ============================================================================

/// Where a signal comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SignalFamily {
    /// Parsed document or raw URL string, no script, no network
    Static,
    /// Live render session (listeners, computed style, navigation)
    Dynamic,
    /// Third-party network lookups
    Reputation,
}

impl SignalFamily {
    pub fn as_str(&self) -> &'static str {
        match self {
            SignalFamily::Static => "static",
            SignalFamily::Dynamic => "dynamic",
            SignalFamily::Reputation => "reputation",
        }
    }
}

/// One slot of a feature vector
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeatureSpec {
    pub name: &'static str,
    pub family: SignalFamily,
    /// Value used when the signal failed or was never produced
    pub default: f32,
}

const fn feat(name: &'static str, family: SignalFamily, default: f32) -> FeatureSpec {
    FeatureSpec { name, family, default }
}

use SignalFamily::{Dynamic, Reputation, Static};

// ============================================================================
// FULL LAYOUT (Authoritative source)
// ============================================================================

/// Feature count of the full schema
/// IMPORTANT: Must match FULL_LAYOUT.len()!
pub const FULL_FEATURE_COUNT: usize = 73;

/// Full schema, exact training order
pub const FULL_LAYOUT: &[FeatureSpec] = &[
    // === Static DOM structure (0-29) ===
    feat("has_title", Static, 0.0),
    feat("has_submit", Static, 0.0),
    feat("has_link", Static, 0.0),
    feat("has_email_input", Static, 0.0),
    feat("number_of_inputs", Static, 0.0),
    feat("number_of_buttons", Static, 0.0),
    feat("number_of_images", Static, 0.0),
    feat("number_of_option", Static, 0.0),
    feat("number_of_list", Static, 0.0),
    feat("number_of_href", Static, 0.0),
    feat("number_of_paragraph", Static, 0.0),
    feat("number_of_script", Static, 0.0),
    feat("length_of_title", Static, 0.0),
    feat("has_h1", Static, 0.0),
    feat("has_h2", Static, 0.0),
    feat("has_h3", Static, 0.0),
    feat("length_of_text", Static, 0.0),
    feat("number_of_clickable_button", Static, 0.0),
    feat("number_of_a", Static, 0.0),
    feat("number_of_div", Static, 0.0),
    feat("has_footer", Static, 0.0),
    feat("number_of_forms", Static, 0.0),
    feat("has_text_area", Static, 0.0),
    feat("has_iframe", Static, 0.0),
    feat("has_text_input", Static, 0.0),
    feat("number_of_meta", Static, 0.0),
    feat("has_nav", Static, 0.0),
    feat("number_of_sources", Static, 0.0),
    feat("number_of_span", Static, 0.0),
    feat("number_of_table", Static, 0.0),

    // === Static link / form heuristics (30-35) ===
    feat("request_url", Static, 0.0),
    feat("anchor_url", Static, 0.0),
    feat("favicon", Static, 0.0),
    feat("links_in_script_tags", Static, 0.0),
    feat("server_form_handler", Static, 0.0),
    feat("info_email", Static, 0.0),

    // === Dynamic behavior (36-42) ===
    feat("has_mouse_tracking", Dynamic, 0.0),
    feat("has_keyboard_monitoring", Dynamic, 0.0),
    feat("has_popups", Dynamic, 0.0),
    feat("number_of_hidden_element", Dynamic, 0.0),
    feat("page_redirect", Dynamic, 0.0),
    feat("form_redirect_behavior", Dynamic, 0.0),
    feat("check_external_form_action", Dynamic, 0.0),

    // === Password fields record (43-46) ===
    feat("password_type_count", Dynamic, 0.0),
    feat("password_name_id_count", Dynamic, 0.0),
    feat("hidden_password_count", Dynamic, 0.0),
    feat("form_with_password", Dynamic, 0.0),

    // === Suspicious script record (47-49) ===
    feat("clipboard_monitoring", Dynamic, 0.0),
    feat("form_data_collection", Dynamic, 0.0),
    feat("cookie_manipulation", Dynamic, 0.0),

    // === URL lexical + host reputation (50-72) ===
    feat("using_ip", Static, 0.0),
    feat("long_url", Static, 0.0),
    feat("short_url", Static, 0.0),
    feat("symbol", Static, 0.0),
    feat("redirecting", Static, 0.0),
    feat("prefix_suffix", Static, 1.0),
    feat("sub_domains", Static, 0.0),
    feat("domain_reg_len", Reputation, 0.0),
    feat("non_std_port", Static, 0.0),
    feat("https_domain_url", Static, 0.0),
    feat("abnormal_url", Reputation, 0.0),
    feat("website_forwarding", Reputation, 0.0),
    feat("status_bar_cust", Reputation, 0.0),
    feat("disable_right_click", Reputation, 0.0),
    feat("using_popup_window", Reputation, 0.0),
    feat("iframe_redirection", Reputation, 0.0),
    feat("age_of_domain", Reputation, 0.0),
    feat("dns_recording", Reputation, 0.0),
    feat("website_traffic", Reputation, 0.0),
    feat("page_rank", Reputation, 0.0),
    feat("google_index", Reputation, 1.0),
    feat("links_pointing_to_page", Reputation, 0.0),
    feat("stats_report", Reputation, 1.0),
];

// ============================================================================
// TOP-20 LAYOUT
// ============================================================================

/// Feature count of the reduced schema
pub const TOP20_FEATURE_COUNT: usize = 20;

/// Reduced schema from feature selection, exact training order
pub const TOP20_LAYOUT: &[FeatureSpec] = &[
    feat("number_of_href", Static, 0.0),
    feat("number_of_list", Static, 0.0),
    feat("length_of_text", Static, 0.0),
    feat("number_of_a", Static, 0.0),
    feat("has_link", Static, 0.0),
    feat("number_of_hidden_element", Dynamic, 0.0),
    feat("number_of_div", Static, 0.0),
    feat("number_of_forms", Static, 0.0),
    feat("number_of_images", Static, 0.0),
    feat("number_of_script", Static, 0.0),
    feat("number_of_meta", Static, 0.0),
    feat("length_of_title", Static, 0.0),
    feat("number_of_paragraph", Static, 0.0),
    feat("number_of_span", Static, 0.0),
    feat("prefix_suffix", Static, 1.0),
    feat("website_forwarding", Reputation, 0.0),
    feat("sub_domains", Static, 0.0),
    feat("long_url", Static, 0.0),
    feat("short_url", Static, 0.0),
    feat("links_pointing_to_page", Reputation, 0.0),
];

// ============================================================================
// SCHEMA
// ============================================================================

/// A named, versioned layout
#[derive(Debug, PartialEq)]
pub struct FeatureSchema {
    pub name: &'static str,
    /// MUST be incremented when the layout changes
    pub version: u8,
    pub features: &'static [FeatureSpec],
}

pub static FULL_SCHEMA: FeatureSchema = FeatureSchema {
    name: "full",
    version: 1,
    features: FULL_LAYOUT,
};

pub static TOP20_SCHEMA: FeatureSchema = FeatureSchema {
    name: "top20",
    version: 1,
    features: TOP20_LAYOUT,
};

/// All schemas known to this build
pub static SCHEMAS: &[&FeatureSchema] = &[&FULL_SCHEMA, &TOP20_SCHEMA];

impl FeatureSchema {
    /// Look a schema up by its configured name
    pub fn by_name(name: &str) -> Option<&'static FeatureSchema> {
        SCHEMAS.iter().copied().find(|s| s.name.eq_ignore_ascii_case(name))
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    /// Compute CRC32 hash of the layout (name, version and every feature name in order)
    pub fn layout_hash(&self) -> u32 {
        let mut hasher = Hasher::new();

        hasher.update(self.name.as_bytes());
        hasher.update(&[0, self.version]);

        for spec in self.features {
            hasher.update(spec.name.as_bytes());
            hasher.update(&[0]); // Separator
        }

        hasher.finalize()
    }

    /// Get feature index by name (O(n) but features are few)
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.features.iter().position(|f| f.name == name)
    }

    /// Get feature name by index
    pub fn name_at(&self, index: usize) -> Option<&'static str> {
        self.features.get(index).map(|f| f.name)
    }

    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.features.iter().map(|f| f.name)
    }

    /// Validate that an artifact's recorded layout matches this schema
    pub fn validate(&self, incoming: &LayoutInfo) -> Result<(), LayoutMismatchError> {
        let current = LayoutInfo::of(self);

        if incoming.schema != current.schema
            || incoming.version != current.version
            || incoming.hash != current.hash
            || incoming.feature_count != current.feature_count
        {
            return Err(LayoutMismatchError {
                expected: current,
                actual: incoming.clone(),
            });
        }

        Ok(())
    }
}

// ============================================================================
// LAYOUT INFO
// ============================================================================

/// Complete layout information for serialization/logging
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayoutInfo {
    pub schema: String,
    pub version: u8,
    pub hash: u32,
    pub feature_count: usize,
    #[serde(default)]
    pub feature_names: Vec<String>,
}

impl LayoutInfo {
    pub fn of(schema: &FeatureSchema) -> Self {
        Self {
            schema: schema.name.to_string(),
            version: schema.version,
            hash: schema.layout_hash(),
            feature_count: schema.len(),
            feature_names: schema.names().map(str::to_string).collect(),
        }
    }
}

// ============================================================================
// LAYOUT VALIDATION
// ============================================================================

/// Error when feature layout doesn't match expected
#[derive(Debug, Clone, PartialEq)]
pub struct LayoutMismatchError {
    pub expected: LayoutInfo,
    pub actual: LayoutInfo,
}

impl std::fmt::Display for LayoutMismatchError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Feature layout mismatch: expected {} v{} ({} features, hash: {:08x}), got {} v{} ({} features, hash: {:08x})",
            self.expected.schema,
            self.expected.version,
            self.expected.feature_count,
            self.expected.hash,
            self.actual.schema,
            self.actual.version,
            self.actual.feature_count,
            self.actual.hash
        )
    }
}

impl std::error::Error for LayoutMismatchError {}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_feature_count() {
        assert_eq!(FULL_LAYOUT.len(), FULL_FEATURE_COUNT);
        assert_eq!(TOP20_LAYOUT.len(), TOP20_FEATURE_COUNT);
    }

    #[test]
    fn test_names_are_unique() {
        for schema in SCHEMAS {
            let unique: HashSet<_> = schema.names().collect();
            assert_eq!(unique.len(), schema.len(), "duplicate in {}", schema.name);
        }
    }

    #[test]
    fn test_top20_is_subset_of_full_with_same_defaults() {
        for spec in TOP20_LAYOUT {
            let full = FULL_LAYOUT.iter().find(|f| f.name == spec.name).unwrap();
            assert_eq!(full, spec);
        }
    }

    #[test]
    fn test_reputation_defaults() {
        let idx = |n| FULL_SCHEMA.index_of(n).unwrap();
        assert_eq!(FULL_LAYOUT[idx("google_index")].default, 1.0);
        assert_eq!(FULL_LAYOUT[idx("stats_report")].default, 1.0);
        assert_eq!(FULL_LAYOUT[idx("page_rank")].default, 0.0);
    }

    #[test]
    fn test_layout_hash_consistency() {
        assert_eq!(FULL_SCHEMA.layout_hash(), FULL_SCHEMA.layout_hash());
        assert_ne!(FULL_SCHEMA.layout_hash(), TOP20_SCHEMA.layout_hash());
        assert_ne!(FULL_SCHEMA.layout_hash(), 0);
    }

    #[test]
    fn test_feature_index() {
        assert_eq!(FULL_SCHEMA.index_of("has_title"), Some(0));
        assert_eq!(FULL_SCHEMA.index_of("password_type_count"), Some(43));
        assert_eq!(FULL_SCHEMA.index_of("using_ip"), Some(50));
        assert_eq!(FULL_SCHEMA.index_of("stats_report"), Some(72));
        assert_eq!(FULL_SCHEMA.index_of("nonexistent"), None);
        assert_eq!(TOP20_SCHEMA.name_at(19), Some("links_pointing_to_page"));
    }

    #[test]
    fn test_by_name() {
        assert_eq!(FeatureSchema::by_name("FULL"), Some(&FULL_SCHEMA));
        assert_eq!(FeatureSchema::by_name("top20"), Some(&TOP20_SCHEMA));
        assert!(FeatureSchema::by_name("v2").is_none());
    }

    #[test]
    fn test_validate_layout() {
        let info = LayoutInfo::of(&FULL_SCHEMA);
        assert!(FULL_SCHEMA.validate(&info).is_ok());
        assert!(TOP20_SCHEMA.validate(&info).is_err());

        let mut bumped = info.clone();
        bumped.version += 1;
        let err = FULL_SCHEMA.validate(&bumped).unwrap_err();
        assert_eq!(err.actual.version, 2);
        assert!(err.to_string().contains("mismatch"));
    }
}
