//! Configuration module

use std::env;

use phishguard_core::constants;

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Server port
    pub port: u16,

    /// ONNX model file; its `.json` sidecar must sit next to it
    pub model_path: String,

    /// Feature schema the model was trained on (`full` or `top20`)
    pub schema: String,

    /// Environment (development, production)
    pub environment: String,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        Self {
            port: env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(5000),

            model_path: constants::get_model_path(),

            schema: constants::get_schema_name(),

            environment: env::var("ENVIRONMENT")
                .unwrap_or_else(|_| "development".to_string()),
        }
    }

    /// Check if running in production
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }
}
