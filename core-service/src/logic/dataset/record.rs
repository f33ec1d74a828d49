use serde::{Deserialize, Serialize};

use crate::logic::features::FeatureVector;

/// Label of a phishing sample
pub const LABEL_PHISHING: u8 = 1;
/// Label of a legitimate sample
pub const LABEL_LEGITIMATE: u8 = 0;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct DatasetRecord {
    /// Unix seconds
    pub timestamp: i64,
    pub url: String,
    /// 1 = phishing, 0 = legitimate
    pub label: u8,

    // Feature contract
    pub schema: String,
    pub feature_version: u8,
    pub layout_hash: u32,
    pub features: Vec<f32>,
}

impl DatasetRecord {
    pub fn new(url: &str, label: u8, vector: FeatureVector) -> Self {
        Self {
            timestamp: chrono::Utc::now().timestamp(),
            url: url.to_string(),
            label,
            schema: vector.schema,
            feature_version: vector.version,
            layout_hash: vector.layout_hash,
            features: vector.values,
        }
    }
}
