//! Neo4j-backed credential store. Principals are `(:Principal)` nodes.

use async_trait::async_trait;
use chrono::Utc;
use neo4rs::{query, Row};

use wikno_core::error::Result;
use wikno_core::{PrincipalId, ResultExt, WiknoError};
use wikno_db::client::get_string;
use wikno_db::Neo4jClient;

use super::{CredentialRecord, CredentialStore};

/// Constraints installed at startup.
pub const SCHEMA: &[&str] = &[
    "CREATE CONSTRAINT principal_id IF NOT EXISTS FOR (p:Principal) REQUIRE p.id IS UNIQUE",
    "CREATE CONSTRAINT principal_email IF NOT EXISTS FOR (p:Principal) REQUIRE p.email IS UNIQUE",
];

pub struct Neo4jCredentialStore {
    client: Neo4jClient,
}

impl Neo4jCredentialStore {
    pub fn new(client: Neo4jClient) -> Self {
        Self { client }
    }
}

fn record_from_row(row: &Row) -> Result<CredentialRecord> {
    let id = get_string(row, "id")?
        .parse::<PrincipalId>()
        .map_err(|e| WiknoError::internal(format!("stored principal id: {e}")))?;
    Ok(CredentialRecord {
        id,
        email: get_string(row, "email")?,
        password_hash: get_string(row, "password_hash")?,
    })
}

#[async_trait]
impl CredentialStore for Neo4jCredentialStore {
    async fn create(&self, record: &CredentialRecord) -> Result<()> {
        let q = query(
            "CREATE (p:Principal {
               id: $id, email: $email, password_hash: $password_hash, created_at: $now
             })",
        )
        .param("id", record.id.to_string())
        .param("email", record.email.clone())
        .param("password_hash", record.password_hash.clone())
        .param("now", Utc::now().to_rfc3339());

        self.client
            .run(q)
            .await
            .with_context(|| format!("create principal {}", record.email))?;
        tracing::debug!(principal_id = %record.id, "Principal stored");
        Ok(())
    }

    async fn find_by_email(&self, email: &str) -> Result<CredentialRecord> {
        let q = query(
            "MATCH (p:Principal {email: $email})
             RETURN p.id AS id, p.email AS email, p.password_hash AS password_hash",
        )
        .param("email", email);

        match self.client.query_one(q).await.context("find principal by email")? {
            Some(row) => record_from_row(&row),
            None => Err(WiknoError::not_found(format!("no principal with email {email}"))),
        }
    }

    async fn find_by_id(&self, id: PrincipalId) -> Result<CredentialRecord> {
        let q = query(
            "MATCH (p:Principal {id: $id})
             RETURN p.id AS id, p.email AS email, p.password_hash AS password_hash",
        )
        .param("id", id.to_string());

        match self.client.query_one(q).await.context("find principal by id")? {
            Some(row) => record_from_row(&row),
            None => Err(WiknoError::not_found(format!("no principal {id}"))),
        }
    }
}
