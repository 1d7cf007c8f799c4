//! In-process credential store.

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::RwLock;

use wikno_core::error::Result;
use wikno_core::{PrincipalId, WiknoError};

use super::{CredentialRecord, CredentialStore};

#[derive(Default)]
struct Tables {
    by_id: HashMap<PrincipalId, CredentialRecord>,
    email_index: HashMap<String, PrincipalId>,
}

#[derive(Default)]
pub struct MemoryCredentialStore {
    tables: RwLock<Tables>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delete a principal. Returns whether it existed.
    pub fn remove(&self, id: PrincipalId) -> bool {
        let mut tables = self.tables.write();
        match tables.by_id.remove(&id) {
            Some(record) => {
                tables.email_index.remove(&record.email);
                true
            }
            None => false,
        }
    }
}

#[async_trait]
impl CredentialStore for MemoryCredentialStore {
    async fn create(&self, record: &CredentialRecord) -> Result<()> {
        let mut tables = self.tables.write();
        if tables.email_index.contains_key(&record.email) {
            return Err(WiknoError::conflict(format!(
                "email {} already registered",
                record.email
            )));
        }
        if tables.by_id.contains_key(&record.id) {
            return Err(WiknoError::conflict(format!("principal {} exists", record.id)));
        }
        tables.email_index.insert(record.email.clone(), record.id);
        tables.by_id.insert(record.id, record.clone());
        Ok(())
    }

    async fn find_by_email(&self, email: &str) -> Result<CredentialRecord> {
        let tables = self.tables.read();
        tables
            .email_index
            .get(email)
            .and_then(|id| tables.by_id.get(id))
            .cloned()
            .ok_or_else(|| WiknoError::not_found(format!("no principal with email {email}")))
    }

    async fn find_by_id(&self, id: PrincipalId) -> Result<CredentialRecord> {
        self.tables
            .read()
            .by_id
            .get(&id)
            .cloned()
            .ok_or_else(|| WiknoError::not_found(format!("no principal {id}")))
    }
}
