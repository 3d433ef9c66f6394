//! API configuration
//!
//! Loaded from an optional `warranty.toml` (or `.yaml`/`.json`) in the
//! working directory, then from `API_*` environment variables. Nested
//! settings use `__` as separator, e.g. `API_WORKFLOW__MILEAGE_CAP=120000`.

use serde::Deserialize;

use core_kernel::UserId;
use domain_warranty::{Role, WarrantyCoverage, WorkflowConfig};
use infra_db::DatabaseConfig;

/// Claim store backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    Memory,
    Postgres,
}

/// An approver registered in the in-process directory at startup
#[derive(Debug, Clone, Deserialize)]
pub struct ApproverSeed {
    pub user_id: UserId,
    pub role: Role,
}

/// API configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Server host
    pub host: String,
    /// Server port
    pub port: u16,
    /// JWT secret for authentication
    pub jwt_secret: String,
    /// JWT expiration in seconds
    pub jwt_expiration_secs: u64,
    pub store: StoreBackend,
    /// Used when `store` is `postgres`
    pub database: DatabaseConfig,
    /// Log level
    pub log_level: String,
    /// Emit logs as JSON lines
    pub log_json: bool,
    pub workflow: WorkflowConfig,
    pub approvers: Vec<ApproverSeed>,
    pub coverage: Vec<WarrantyCoverage>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            jwt_secret: "change-me-in-production".to_string(),
            jwt_expiration_secs: 3600,
            store: StoreBackend::Memory,
            database: DatabaseConfig::default(),
            log_level: "info".to_string(),
            log_json: false,
            workflow: WorkflowConfig::default(),
            approvers: Vec::new(),
            coverage: Vec::new(),
        }
    }
}

impl ApiConfig {
    /// Loads configuration from the optional file and the environment
    pub fn load() -> Result<Self, config::ConfigError> {
        config::Config::builder()
            .add_source(config::File::with_name("warranty").required(false))
            .add_source(
                config::Environment::with_prefix("API")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()?
            .try_deserialize()
    }

    /// Returns the server address
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_use_memory_store() {
        let config = ApiConfig::default();
        assert_eq!(config.store, StoreBackend::Memory);
        assert_eq!(config.server_addr(), "0.0.0.0:8080");
        assert_eq!(config.workflow, WorkflowConfig::default());
    }

    #[test]
    fn test_partial_source_keeps_defaults() {
        let config: ApiConfig = config::Config::builder()
            .set_override("port", 9090)
            .unwrap()
            .set_override("store", "postgres")
            .unwrap()
            .set_override("workflow.mileage_cap", 150_000)
            .unwrap()
            .set_override("database.url", "postgres://db/warranty")
            .unwrap()
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();

        assert_eq!(config.port, 9090);
        assert_eq!(config.store, StoreBackend::Postgres);
        assert_eq!(config.workflow.mileage_cap, 150_000);
        assert_eq!(config.workflow.tiers, WorkflowConfig::default().tiers);
        assert_eq!(config.jwt_expiration_secs, 3600);
        assert_eq!(config.database.url, "postgres://db/warranty");
        assert_eq!(config.database.max_connections, 10);
    }
}
