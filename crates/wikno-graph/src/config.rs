//! Configuration for the graph service.
//!
//! Loaded from the optional `wikno-graph.toml` and `WIKNO_GRAPH__`
//! environment variables (see `wikno_core::config`).

use serde::Deserialize;

use wikno_core::config::LogConfig;
use wikno_core::error::Result;
use wikno_core::health::HealthConfig;
use wikno_core::WiknoError;
use wikno_db::DbConfig;
use wikno_rpc::ServerConfig;

#[derive(Debug, Deserialize)]
pub struct GraphConfig {
    #[serde(default = "default_server")]
    pub server: ServerConfig,

    #[serde(default)]
    pub store: StoreBackend,

    #[serde(default)]
    pub neo4j: DbConfig,

    pub identity: IdentityLinkConfig,

    /// The only principal allowed to call CreateUser.
    #[serde(default = "default_service_account_email")]
    pub service_account_email: String,

    #[serde(default)]
    pub health: HealthConfig,

    #[serde(default)]
    pub log: LogConfig,
}

#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    #[default]
    Neo4j,
    Memory,
}

/// Outbound link to the identity service, used for every token check.
#[derive(Debug, Clone, Deserialize)]
pub struct IdentityLinkConfig {
    pub url: String,

    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_server() -> ServerConfig {
    ServerConfig::new("0.0.0.0:50052")
}

fn default_service_account_email() -> String {
    "identity-service@wikno.internal".to_string()
}

fn default_timeout_ms() -> u64 {
    3000
}

impl GraphConfig {
    pub fn new(identity_url: impl Into<String>) -> Self {
        Self {
            server: default_server(),
            store: StoreBackend::default(),
            neo4j: DbConfig::default(),
            identity: IdentityLinkConfig {
                url: identity_url.into(),
                timeout_ms: default_timeout_ms(),
            },
            service_account_email: default_service_account_email(),
            health: HealthConfig::default(),
            log: LogConfig::default(),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.identity.url.trim().is_empty() {
            return Err(WiknoError::invalid("identity.url must be set"));
        }
        if self.identity.timeout_ms == 0 {
            return Err(WiknoError::invalid("identity.timeout_ms must be positive"));
        }
        if self.service_account_email.trim().is_empty() {
            return Err(WiknoError::invalid("service_account_email must be set"));
        }
        self.health.validate()
    }
}
