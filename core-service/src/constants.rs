//! Central Configuration Constants
//!
//! Single source of truth for all configuration defaults.
//! Every value can be overridden through the environment; the `get_*`
//! helpers below read the variable and fall back to the constant.

use std::time::Duration;

/// Default page render timeout (seconds)
pub const DEFAULT_RENDER_TIMEOUT_SECS: u64 = 10;

/// How long the redirect check waits for the page to settle (seconds)
pub const DEFAULT_LOAD_WAIT_SECS: u64 = 2;

/// Default timeout for a single reputation lookup (seconds)
pub const DEFAULT_LOOKUP_TIMEOUT_SECS: u64 = 5;

/// Maximum redirect hops followed when fetching the raw page
pub const DEFAULT_MAX_REDIRECTS: u32 = 10;

/// Default ONNX model location
pub const DEFAULT_MODEL_PATH: &str = "Model/model.onnx";

/// Default feature schema name
pub const DEFAULT_SCHEMA: &str = "full";

/// RDAP (registration directory) endpoint, `{}` is replaced by the domain
pub const DEFAULT_RDAP_ENDPOINT: &str = "https://rdap.org/domain/{}";

/// Traffic rank endpoint (queried with `cli`, `dat` and `url` parameters)
pub const DEFAULT_TRAFFIC_ENDPOINT: &str = "http://data.alexa.com/data";

/// Page rank endpoint (form POST with `name`)
pub const DEFAULT_PAGE_RANK_ENDPOINT: &str = "https://www.checkpagerank.net/index.php";

/// Search endpoint used for the index-presence check (queried with `q`)
pub const DEFAULT_SEARCH_ENDPOINT: &str = "https://www.google.com/search";

/// Browser-like user agent for all outbound requests
pub const USER_AGENT: &str =
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

// ============================================
// Helper functions to read from env with fallback
// ============================================

fn env_secs(key: &str, default: u64) -> Duration {
    let secs = std::env::var(key)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default);
    Duration::from_secs(secs)
}

fn env_string(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Get render timeout from environment or use default
pub fn get_render_timeout() -> Duration {
    env_secs("PHISHGUARD_RENDER_TIMEOUT", DEFAULT_RENDER_TIMEOUT_SECS)
}

/// Get page settle wait from environment or use default
pub fn get_load_wait() -> Duration {
    env_secs("PHISHGUARD_LOAD_WAIT", DEFAULT_LOAD_WAIT_SECS)
}

/// Get reputation lookup timeout from environment or use default
pub fn get_lookup_timeout() -> Duration {
    env_secs("PHISHGUARD_LOOKUP_TIMEOUT", DEFAULT_LOOKUP_TIMEOUT_SECS)
}

/// Get maximum redirect hops from environment or use default
pub fn get_max_redirects() -> u32 {
    std::env::var("PHISHGUARD_MAX_REDIRECTS")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(DEFAULT_MAX_REDIRECTS)
}

/// Get model path from environment or use default
pub fn get_model_path() -> String {
    env_string("PHISHGUARD_MODEL_PATH", DEFAULT_MODEL_PATH)
}

/// Get feature schema name from environment or use default
pub fn get_schema_name() -> String {
    env_string("PHISHGUARD_SCHEMA", DEFAULT_SCHEMA)
}

/// Get RDAP endpoint template from environment or use default
pub fn get_rdap_endpoint() -> String {
    env_string("PHISHGUARD_RDAP_ENDPOINT", DEFAULT_RDAP_ENDPOINT)
}

/// Get traffic rank endpoint from environment or use default
pub fn get_traffic_endpoint() -> String {
    env_string("PHISHGUARD_TRAFFIC_ENDPOINT", DEFAULT_TRAFFIC_ENDPOINT)
}

/// Get page rank endpoint from environment or use default
pub fn get_page_rank_endpoint() -> String {
    env_string("PHISHGUARD_PAGE_RANK_ENDPOINT", DEFAULT_PAGE_RANK_ENDPOINT)
}

/// Get search endpoint from environment or use default
pub fn get_search_endpoint() -> String {
    env_string("PHISHGUARD_SEARCH_ENDPOINT", DEFAULT_SEARCH_ENDPOINT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_without_env() {
        std::env::remove_var("PHISHGUARD_MAX_REDIRECTS");
        assert_eq!(get_max_redirects(), DEFAULT_MAX_REDIRECTS);
        assert!(DEFAULT_RDAP_ENDPOINT.contains("{}"));
    }

    #[test]
    fn test_env_secs_fallback_on_garbage() {
        std::env::set_var("PHISHGUARD_TEST_GARBAGE_SECS", "not-a-number");
        assert_eq!(env_secs("PHISHGUARD_TEST_GARBAGE_SECS", 7), Duration::from_secs(7));
    }
}
