//! Configuration for the identity service.
//!
//! Loaded from the optional `wikno-identity.toml` and `WIKNO_IDENTITY__`
//! environment variables (see `wikno_core::config`).

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

use wikno_core::config::LogConfig;
use wikno_core::error::Result;
use wikno_core::health::HealthConfig;
use wikno_core::WiknoError;
use wikno_db::DbConfig;
use wikno_rpc::ServerConfig;

use crate::validate;

#[derive(Debug, Deserialize)]
pub struct IdentityConfig {
    #[serde(default = "default_server")]
    pub server: ServerConfig,

    #[serde(default)]
    pub store: StoreBackend,

    #[serde(default)]
    pub neo4j: DbConfig,

    pub token: TokenConfig,

    pub service_account: ServiceAccountConfig,

    #[serde(default)]
    pub graph: GraphLinkConfig,

    #[serde(default)]
    pub health: HealthConfig,

    #[serde(default)]
    pub log: LogConfig,
}

/// Which credential store backs the service.
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    #[default]
    Neo4j,
    Memory,
}

#[derive(Debug, Deserialize)]
pub struct TokenConfig {
    /// HS256 signing secret.
    pub secret: SecretString,

    /// Token lifetime from issuance.
    #[serde(default = "default_ttl_secs")]
    pub ttl_secs: u64,

    #[serde(default = "default_bcrypt_cost")]
    pub bcrypt_cost: u32,
}

#[derive(Debug, Deserialize)]
pub struct ServiceAccountConfig {
    #[serde(default = "default_service_email")]
    pub email: String,

    pub password: SecretString,

    /// Re-mint the cached service token this long before it expires.
    #[serde(default = "default_refresh_margin_secs")]
    pub refresh_margin_secs: u64,
}

/// Outbound link to the graph service, used to provision tenants.
#[derive(Debug, Clone, Deserialize)]
pub struct GraphLinkConfig {
    /// Base URL of the graph service. Provisioning is off when unset.
    #[serde(default)]
    pub url: Option<String>,

    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

const MIN_BCRYPT_COST: u32 = 4;
const MAX_BCRYPT_COST: u32 = 31;

fn default_server() -> ServerConfig {
    ServerConfig::new("0.0.0.0:50051")
}

fn default_ttl_secs() -> u64 {
    24 * 60 * 60
}

fn default_bcrypt_cost() -> u32 {
    bcrypt::DEFAULT_COST
}

fn default_service_email() -> String {
    "identity-service@wikno.internal".to_string()
}

fn default_refresh_margin_secs() -> u64 {
    60
}

fn default_timeout_ms() -> u64 {
    3000
}

impl Default for GraphLinkConfig {
    fn default() -> Self {
        Self {
            url: None,
            timeout_ms: default_timeout_ms(),
        }
    }
}

impl IdentityConfig {
    /// A config with defaults everywhere except the two required secrets.
    pub fn new(token_secret: impl Into<String>, service_password: impl Into<String>) -> Self {
        Self {
            server: default_server(),
            store: StoreBackend::default(),
            neo4j: DbConfig::default(),
            token: TokenConfig {
                secret: SecretString::from(token_secret.into()),
                ttl_secs: default_ttl_secs(),
                bcrypt_cost: default_bcrypt_cost(),
            },
            service_account: ServiceAccountConfig {
                email: default_service_email(),
                password: SecretString::from(service_password.into()),
                refresh_margin_secs: default_refresh_margin_secs(),
            },
            graph: GraphLinkConfig::default(),
            health: HealthConfig::default(),
            log: LogConfig::default(),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.token.secret.expose_secret().is_empty() {
            return Err(WiknoError::invalid("token.secret must be set"));
        }
        if self.token.ttl_secs == 0 {
            return Err(WiknoError::invalid("token.ttl_secs must be positive"));
        }
        if !(MIN_BCRYPT_COST..=MAX_BCRYPT_COST).contains(&self.token.bcrypt_cost) {
            return Err(WiknoError::invalid(format!(
                "token.bcrypt_cost must be within {MIN_BCRYPT_COST}..={MAX_BCRYPT_COST}"
            )));
        }
        if self.service_account.refresh_margin_secs >= self.token.ttl_secs {
            return Err(WiknoError::invalid(
                "service_account.refresh_margin_secs must be lower than token.ttl_secs",
            ));
        }
        validate::email(&self.service_account.email)
            .map_err(|e| e.context("service_account.email"))?;
        validate::password(self.service_account.password.expose_secret())
            .map_err(|e| e.context("service_account.password"))?;
        self.health.validate()
    }
}
