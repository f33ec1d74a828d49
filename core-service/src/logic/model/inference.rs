//! Inference Engine - ONNX Runtime Integration
//!
//! Loads a scikit-learn classifier exported to ONNX (zipmap disabled, so
//! output 0 is the label tensor and output 1 the probability tensor) and
//! scores one feature vector per call.

use std::path::{Path, PathBuf};

use ndarray::Array2;
use ort::session::{builder::GraphOptimizationLevel, Session};
use ort::value::Value;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::logic::features::{FeatureSchema, FeatureVector, LayoutInfo, LayoutMismatchError};

// ============================================================================
// DATA STRUCTURES
// ============================================================================

/// Label the model assigns to phishing pages
pub const PHISHING_LABEL: i64 = 1;

/// One scored vector
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub label: i64,
    /// [legitimate, phishing]
    pub probabilities: [f32; 2],
}

impl Prediction {
    pub fn is_phishing(&self) -> bool {
        self.label == PHISHING_LABEL
    }

    /// Probability of the predicted class
    pub fn confidence(&self) -> f32 {
        if self.is_phishing() {
            self.probabilities[1]
        } else {
            self.probabilities[0]
        }
    }
}

/// Sidecar written next to the model at export time
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelMetadata {
    /// Layout the model was trained on
    pub layout: LayoutInfo,
    #[serde(default)]
    pub model_type: String,
    #[serde(default)]
    pub trained_at: Option<chrono::DateTime<chrono::Utc>>,
}

impl ModelMetadata {
    /// `Model/model.onnx` -> `Model/model.json`
    pub fn sidecar_path(model_path: &Path) -> PathBuf {
        model_path.with_extension("json")
    }

    pub fn load(path: &Path) -> Result<Self, ClassifierError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ClassifierError::Metadata(format!("{}: {}", path.display(), e)))?;
        serde_json::from_str(&content)
            .map_err(|e| ClassifierError::Metadata(format!("{}: {}", path.display(), e)))
    }
}

// ============================================================================
// ERROR HANDLING
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum ClassifierError {
    #[error("model not found: {0}")]
    ModelNotFound(PathBuf),
    #[error("failed to load model: {0}")]
    Load(String),
    #[error("model metadata unreadable: {0}")]
    Metadata(String),
    /// Fatal: the model was trained on a different feature layout
    #[error(transparent)]
    SchemaMismatch(#[from] LayoutMismatchError),
    #[error("inference failed: {0}")]
    Inference(String),
}

// ============================================================================
// CLASSIFIER TRAIT
// ============================================================================

/// Scores assembled vectors. Implementations must tolerate concurrent calls.
pub trait Classifier: Send + Sync {
    /// Schema the classifier expects its input in
    fn schema(&self) -> &'static FeatureSchema;

    fn predict(&self, vector: &FeatureVector) -> Result<Prediction, ClassifierError>;
}

// ============================================================================
// ONNX IMPLEMENTATION
// ============================================================================

pub struct OnnxClassifier {
    /// Runs are serialised; the session needs exclusive access
    session: Mutex<Session>,
    schema: &'static FeatureSchema,
    metadata: ModelMetadata,
    label_output: String,
    probability_output: String,
}

impl OnnxClassifier {
    /// Load the model and verify its sidecar against `schema`
    pub fn load(model_path: &Path, schema: &'static FeatureSchema) -> Result<Self, ClassifierError> {
        log::info!("Loading ONNX model from: {}", model_path.display());

        if !model_path.exists() {
            return Err(ClassifierError::ModelNotFound(model_path.to_path_buf()));
        }

        let metadata = ModelMetadata::load(&ModelMetadata::sidecar_path(model_path))?;
        schema.validate(&metadata.layout)?;

        let session = Session::builder()
            .map_err(|e| ClassifierError::Load(format!("Failed to create session builder: {}", e)))?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .map_err(|e| ClassifierError::Load(format!("Failed to set optimization: {}", e)))?
            .commit_from_file(model_path)
            .map_err(|e| ClassifierError::Load(format!("Failed to load model: {}", e)))?;

        let output_names: Vec<String> = session.outputs.iter().map(|o| o.name.clone()).collect();
        let (label_output, probability_output) = match output_names.as_slice() {
            [label, probabilities, ..] => (label.clone(), probabilities.clone()),
            _ => {
                return Err(ClassifierError::Load(format!(
                    "expected label and probability outputs, model has {:?}",
                    output_names
                )))
            }
        };

        log::info!(
            "ONNX model loaded ({} v{}, {} features, hash {:08x})",
            schema.name,
            schema.version,
            schema.len(),
            schema.layout_hash()
        );

        Ok(Self {
            session: Mutex::new(session),
            schema,
            metadata,
            label_output,
            probability_output,
        })
    }

    pub fn metadata(&self) -> &ModelMetadata {
        &self.metadata
    }
}

impl Classifier for OnnxClassifier {
    fn schema(&self) -> &'static FeatureSchema {
        self.schema
    }

    fn predict(&self, vector: &FeatureVector) -> Result<Prediction, ClassifierError> {
        vector.validate(self.schema)?;

        let input_array = Array2::<f32>::from_shape_vec((1, vector.len()), vector.values.clone())
            .map_err(|e| ClassifierError::Inference(format!("Array error: {}", e)))?;
        let input_tensor = Value::from_array(input_array)
            .map_err(|e| ClassifierError::Inference(format!("Tensor error: {}", e)))?;

        let mut session = self.session.lock();
        let outputs = session
            .run(ort::inputs![input_tensor])
            .map_err(|e| ClassifierError::Inference(e.to_string()))?;

        let label = outputs
            .get(&self.label_output)
            .ok_or_else(|| ClassifierError::Inference("No label output".to_string()))?
            .try_extract_tensor::<i64>()
            .map_err(|e| ClassifierError::Inference(format!("Label extract error: {}", e)))?
            .1
            .first()
            .copied()
            .ok_or_else(|| ClassifierError::Inference("Empty label output".to_string()))?;

        let probabilities = outputs
            .get(&self.probability_output)
            .ok_or_else(|| ClassifierError::Inference("No probability output".to_string()))?
            .try_extract_tensor::<f32>()
            .map_err(|e| ClassifierError::Inference(format!("Probability extract error: {}", e)))?
            .1;

        let probabilities = match probabilities {
            [legitimate, phishing, ..] => [*legitimate, *phishing],
            _ => {
                return Err(ClassifierError::Inference(format!(
                    "expected 2 class probabilities, got {}",
                    probabilities.len()
                )))
            }
        };

        Ok(Prediction { label, probabilities })
    }
}

// ============================================================================
// TESTS
// ============================================================================
