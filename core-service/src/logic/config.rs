//! Runtime configuration for the evaluation pipeline
//!
//! Built from `constants` (environment with fallback) at startup, then
//! passed by value. Nothing here is global mutable state.

use std::time::Duration;

use crate::constants;

/// Endpoints and budgets for the reputation lookups
#[derive(Debug, Clone, PartialEq)]
pub struct ReputationConfig {
    /// Applies to each lookup individually
    pub lookup_timeout: Duration,
    pub max_redirects: u32,
    /// `{}` is replaced by the registrable domain
    pub rdap_endpoint: String,
    pub traffic_endpoint: String,
    pub page_rank_endpoint: String,
    pub search_endpoint: String,
}

impl ReputationConfig {
    pub fn from_env() -> Self {
        Self {
            lookup_timeout: constants::get_lookup_timeout(),
            max_redirects: constants::get_max_redirects(),
            rdap_endpoint: constants::get_rdap_endpoint(),
            traffic_endpoint: constants::get_traffic_endpoint(),
            page_rank_endpoint: constants::get_page_rank_endpoint(),
            search_endpoint: constants::get_search_endpoint(),
        }
    }
}

impl Default for ReputationConfig {
    fn default() -> Self {
        Self {
            lookup_timeout: Duration::from_secs(constants::DEFAULT_LOOKUP_TIMEOUT_SECS),
            max_redirects: constants::DEFAULT_MAX_REDIRECTS,
            rdap_endpoint: constants::DEFAULT_RDAP_ENDPOINT.to_string(),
            traffic_endpoint: constants::DEFAULT_TRAFFIC_ENDPOINT.to_string(),
            page_rank_endpoint: constants::DEFAULT_PAGE_RANK_ENDPOINT.to_string(),
            search_endpoint: constants::DEFAULT_SEARCH_ENDPOINT.to_string(),
        }
    }
}

/// Budgets for one evaluation
#[derive(Debug, Clone, PartialEq)]
pub struct EvaluatorConfig {
    /// Upper bound on loading the page in the renderer
    pub render_timeout: Duration,
    /// How long the redirect check waits for load-complete
    pub load_wait: Duration,
    pub reputation: ReputationConfig,
}

impl EvaluatorConfig {
    pub fn from_env() -> Self {
        Self {
            render_timeout: constants::get_render_timeout(),
            load_wait: constants::get_load_wait(),
            reputation: ReputationConfig::from_env(),
        }
    }
}

impl Default for EvaluatorConfig {
    fn default() -> Self {
        Self {
            render_timeout: Duration::from_secs(constants::DEFAULT_RENDER_TIMEOUT_SECS),
            load_wait: Duration::from_secs(constants::DEFAULT_LOAD_WAIT_SECS),
            reputation: ReputationConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = EvaluatorConfig::default();
        assert_eq!(config.render_timeout, Duration::from_secs(10));
        assert_eq!(config.reputation.lookup_timeout, Duration::from_secs(5));
        assert!(config.reputation.rdap_endpoint.contains("{}"));
    }

    #[test]
    fn test_from_env_override() {
        std::env::set_var("PHISHGUARD_LOAD_WAIT", "7");
        assert_eq!(EvaluatorConfig::from_env().load_wait, Duration::from_secs(7));
        std::env::remove_var("PHISHGUARD_LOAD_WAIT");
    }
}
