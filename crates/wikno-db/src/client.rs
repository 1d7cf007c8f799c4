//! Neo4j connection management and shared database client.

use async_trait::async_trait;
use neo4rs::{query, ConfigBuilder, Graph, Query, Row};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

use wikno_core::error::Result;
use wikno_core::health::HealthCheck;
use wikno_core::{ResultExt, WiknoError};

use crate::error::translate_error;
use crate::unit::Neo4jUnit;

/// Configuration for connecting to Neo4j.
#[derive(Debug, Deserialize)]
pub struct DbConfig {
    #[serde(default = "default_uri")]
    pub uri: String,

    #[serde(default = "default_user")]
    pub user: String,

    #[serde(default = "default_password")]
    pub password: SecretString,

    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    #[serde(default = "default_fetch_size")]
    pub fetch_size: usize,
}

fn default_uri() -> String {
    "bolt://localhost:7687".to_string()
}

fn default_user() -> String {
    "neo4j".to_string()
}

fn default_password() -> SecretString {
    SecretString::from("wikno-dev")
}

fn default_max_connections() -> u32 {
    16
}

fn default_fetch_size() -> usize {
    256
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            uri: default_uri(),
            user: default_user(),
            password: default_password(),
            max_connections: default_max_connections(),
            fetch_size: default_fetch_size(),
        }
    }
}

/// Thread-safe Neo4j client with connection pooling.
///
/// Callers wait for a pooled connection when all `max_connections` are busy.
/// Clone is cheap (inner Arc).
#[derive(Clone)]
pub struct Neo4jClient {
    graph: Graph,
}

impl Neo4jClient {
    /// Connect to Neo4j with the given configuration.
    pub async fn connect(config: &DbConfig) -> Result<Self> {
        let neo_config = ConfigBuilder::default()
            .uri(&config.uri)
            .user(&config.user)
            .password(config.password.expose_secret())
            .max_connections(config.max_connections as usize)
            .fetch_size(config.fetch_size)
            .build()
            .map_err(|e| WiknoError::invalid(format!("neo4j config: {e}")))?;

        let graph = Graph::connect(neo_config)
            .await
            .map_err(translate_error)
            .context("connect to neo4j")?;

        let client = Self { graph };
        client.ping().await.context("connect to neo4j")?;

        tracing::info!(uri = %config.uri, "Connected to Neo4j");
        Ok(client)
    }

    /// Execute a write-only query (CREATE, MERGE, DELETE, SET).
    pub async fn run(&self, query: Query) -> Result<()> {
        self.graph.run(query).await.map_err(translate_error)
    }

    /// Execute a read query and collect all rows.
    pub async fn query_rows(&self, query: Query) -> Result<Vec<Row>> {
        let mut stream = self.graph.execute(query).await.map_err(translate_error)?;
        let mut rows = Vec::new();
        while let Some(row) = stream.next().await.map_err(translate_error)? {
            rows.push(row);
        }
        Ok(rows)
    }

    /// Execute a read query and return the first row, if any.
    pub async fn query_one(&self, query: Query) -> Result<Option<Row>> {
        let mut stream = self.graph.execute(query).await.map_err(translate_error)?;
        stream.next().await.map_err(translate_error)
    }

    /// Begin a transactional unit. Dropping the unit without committing
    /// rolls it back.
    pub async fn begin(&self) -> Result<Neo4jUnit> {
        let txn = self.graph.start_txn().await.map_err(translate_error)?;
        Ok(Neo4jUnit::new(txn))
    }

    /// Install constraints and indexes. Every statement must be idempotent
    /// (`IF NOT EXISTS`).
    pub async fn ensure_schema(&self, statements: &[&str]) -> Result<()> {
        for stmt in statements {
            self.run(query(stmt))
                .await
                .with_context(|| format!("schema statement `{stmt}`"))?;
        }
        tracing::info!(statements = statements.len(), "Neo4j schema ensured");
        Ok(())
    }

    /// Round-trip a trivial query.
    pub async fn ping(&self) -> Result<()> {
        self.query_one(query("RETURN 1 AS ok")).await.map(|_| ())
    }
}

/// Health probe for the Neo4j pool.
pub struct Neo4jHealthCheck {
    client: Neo4jClient,
}

impl Neo4jHealthCheck {
    pub fn new(client: Neo4jClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl HealthCheck for Neo4jHealthCheck {
    fn name(&self) -> &str {
        "neo4j"
    }

    async fn check(&self) -> Result<()> {
        self.client.ping().await
    }
}

/// Read a required string column.
pub fn get_string(row: &Row, key: &str) -> Result<String> {
    row.get::<String>(key)
        .map_err(|e| WiknoError::internal(format!("column `{key}`: {e}")))
}

/// Read an optional string column. Null and missing are both `None`.
pub fn get_opt_string(row: &Row, key: &str) -> Option<String> {
    row.get::<Option<String>>(key).ok().flatten()
}

/// Read a required integer column.
pub fn get_i64(row: &Row, key: &str) -> Result<i64> {
    row.get::<i64>(key)
        .map_err(|e| WiknoError::internal(format!("column `{key}`: {e}")))
}
