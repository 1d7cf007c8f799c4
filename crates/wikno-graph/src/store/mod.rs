//! Catalog persistence: tenants, shared nodes and overlays.
//!
//! Writes that must be atomic (node creation plus overlay insertion) go
//! through a [`CatalogUnit`]. Dropping a unit without committing discards it.

use std::collections::HashMap;

use async_trait::async_trait;

use wikno_core::error::Result;
use wikno_core::{NodeId, NodeKind, TenantId, ValueType};

use crate::model::{CatalogNode, Overlay};

pub mod memory;
pub mod neo4j;

pub use memory::MemoryCatalogStore;
pub use neo4j::Neo4jCatalogStore;

#[async_trait]
pub trait CatalogStore: Send + Sync {
    /// Open an atomic unit of work.
    async fn begin(&self) -> Result<Box<dyn CatalogUnit>>;

    /// Create the tenant's user record. `Conflict` if it exists.
    async fn create_user(&self, tenant_id: TenantId) -> Result<()>;

    async fn user_exists(&self, tenant_id: TenantId) -> Result<bool>;

    async fn get_node(&self, kind: NodeKind, id: NodeId) -> Result<Option<CatalogNode>>;

    /// All of one tenant's overlays of one kind, ordered by node id.
    async fn overlays_for_tenant(&self, tenant_id: TenantId, kind: NodeKind) -> Result<Vec<Overlay>>;

    /// Value types of the given property type nodes. Unknown ids are absent.
    async fn value_types(&self, ids: &[NodeId]) -> Result<HashMap<NodeId, ValueType>>;

    /// Rewrite an overlay's name and definition. Returns whether one matched.
    async fn update_overlay(
        &self,
        kind: NodeKind,
        tenant_id: TenantId,
        node_id: NodeId,
        name: &str,
        definition: &str,
    ) -> Result<bool>;

    /// Every tenant's overlays of one kind whose name matches exactly.
    async fn find_overlays_by_name(&self, kind: NodeKind, name: &str) -> Result<Vec<Overlay>>;
}

#[async_trait]
pub trait CatalogUnit: Send {
    async fn get_node(&mut self, kind: NodeKind, id: NodeId) -> Result<Option<CatalogNode>>;

    async fn create_node(&mut self, node: &CatalogNode) -> Result<()>;

    /// `Conflict` if the tenant already overlays the node, `NotFound` if the
    /// tenant has no user record.
    async fn insert_overlay(&mut self, kind: NodeKind, overlay: &Overlay) -> Result<()>;

    async fn commit(self: Box<Self>) -> Result<()>;

    async fn rollback(self: Box<Self>) -> Result<()>;
}
