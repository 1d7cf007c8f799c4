//! Credential store: principal records with a unique email.

use async_trait::async_trait;

use wikno_core::error::Result;
use wikno_core::{Principal, PrincipalId};

pub mod memory;
pub mod neo4j;

pub use memory::MemoryCredentialStore;
pub use neo4j::Neo4jCredentialStore;

/// A persisted principal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CredentialRecord {
    pub id: PrincipalId,
    pub email: String,
    pub password_hash: String,
}

impl CredentialRecord {
    pub fn principal(&self) -> Principal {
        Principal {
            id: self.id,
            email: self.email.clone(),
        }
    }
}

#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Insert a new principal. `Conflict` if the email (or id) is taken.
    async fn create(&self, record: &CredentialRecord) -> Result<()>;

    /// `NotFound` if no principal has this email.
    async fn find_by_email(&self, email: &str) -> Result<CredentialRecord>;

    /// `NotFound` if no principal has this id.
    async fn find_by_id(&self, id: PrincipalId) -> Result<CredentialRecord>;
}
