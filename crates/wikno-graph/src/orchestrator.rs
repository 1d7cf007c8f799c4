//! Link-or-create: attach a tenant overlay to an existing catalog node, or
//! create the node and the overlay together.
//!
//! One orchestrator serves all three kinds; [`NodeSpec`] carries what
//! differs between them. The unit is committed only on the success path.
//! Every early return drops it, which rolls it back.

use std::sync::Arc;

use wikno_core::error::Result;
use wikno_core::{NodeId, NodeKind, ResultExt, TenantId, ValueType, WiknoError};

use crate::model::{CatalogNode, Overlay};
use crate::store::CatalogStore;

/// The kind of node a create request targets, with its kind-specific data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeSpec {
    Entity,
    ConnectionType,
    PropertyType { value_type: ValueType },
}

impl NodeSpec {
    pub fn kind(&self) -> NodeKind {
        match self {
            Self::Entity => NodeKind::Entity,
            Self::ConnectionType => NodeKind::ConnectionType,
            Self::PropertyType { .. } => NodeKind::PropertyType,
        }
    }

    fn instantiate(&self, id: NodeId) -> CatalogNode {
        match *self {
            Self::Entity => CatalogNode::Entity { id },
            Self::ConnectionType => CatalogNode::ConnectionType { id },
            Self::PropertyType { value_type } => CatalogNode::PropertyType { id, value_type },
        }
    }

    /// Invariants an existing node must satisfy before it can be linked.
    fn check(&self, existing: &CatalogNode) -> Result<()> {
        match (self, existing.value_type()) {
            (Self::PropertyType { value_type }, Some(stored)) if *value_type != stored => {
                Err(WiknoError::invalid(format!(
                    "property type {} has value_type {stored}, not {value_type}",
                    existing.id()
                )))
            }
            _ => Ok(()),
        }
    }
}

pub struct TransactionOrchestrator {
    store: Arc<dyn CatalogStore>,
}

impl TransactionOrchestrator {
    pub fn new(store: Arc<dyn CatalogStore>) -> Self {
        Self { store }
    }

    /// Returns the committed overlay and the node it is attached to.
    pub async fn link_or_create(
        &self,
        tenant_id: TenantId,
        spec: &NodeSpec,
        node_id: Option<NodeId>,
        name: &str,
        definition: &str,
    ) -> Result<(Overlay, CatalogNode)> {
        let kind = spec.kind();
        let mut unit = self.store.begin().await?;

        let node = match node_id {
            Some(id) => {
                let existing = unit.get_node(kind, id).await?.ok_or_else(|| {
                    WiknoError::not_found(format!("{kind} {id} must already exist when an id is given"))
                })?;
                spec.check(&existing)?;
                existing
            }
            None => {
                let node = spec.instantiate(NodeId::new());
                unit.create_node(&node).await?;
                node
            }
        };

        let overlay = Overlay {
            tenant_id,
            node_id: node.id(),
            name: name.to_owned(),
            definition: definition.to_owned(),
        };
        unit.insert_overlay(kind, &overlay).await?;
        unit.commit()
            .await
            .with_context(|| format!("link {kind} {} for tenant {tenant_id}", node.id()))?;

        tracing::info!(
            kind = %kind,
            tenant_id = %tenant_id,
            node_id = %node.id(),
            created = node_id.is_none(),
            "Overlay committed"
        );
        Ok((overlay, node))
    }
}
