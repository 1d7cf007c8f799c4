//! In-process catalog store.
//!
//! Units stage their writes privately and apply them at commit under one
//! write lock, re-checking every constraint there. Of two units racing to
//! overlay the same `(tenant, node)`, exactly one commits.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;

use wikno_core::error::Result;
use wikno_core::{NodeId, NodeKind, TenantId, ValueType, WiknoError};

use super::{CatalogStore, CatalogUnit};
use crate::model::{CatalogNode, Overlay};

type OverlayKey = (NodeKind, TenantId, NodeId);

#[derive(Default)]
struct Tables {
    users: HashSet<TenantId>,
    nodes: HashMap<NodeId, CatalogNode>,
    overlays: BTreeMap<OverlayKey, Overlay>,
}

impl Tables {
    fn node(&self, kind: NodeKind, id: NodeId) -> Option<CatalogNode> {
        self.nodes.get(&id).filter(|n| n.kind() == kind).cloned()
    }

    fn check_overlay(&self, kind: NodeKind, overlay: &Overlay) -> Result<()> {
        if !self.users.contains(&overlay.tenant_id) {
            return Err(WiknoError::not_found(format!(
                "tenant {} has no graph user record",
                overlay.tenant_id
            )));
        }
        if self
            .overlays
            .contains_key(&(kind, overlay.tenant_id, overlay.node_id))
        {
            return Err(overlay_conflict(kind, overlay));
        }
        Ok(())
    }
}

fn overlay_conflict(kind: NodeKind, overlay: &Overlay) -> WiknoError {
    WiknoError::conflict(format!(
        "tenant {} already overlays {kind} {}",
        overlay.tenant_id, overlay.node_id
    ))
}

#[derive(Default, Clone)]
pub struct MemoryCatalogStore {
    tables: Arc<RwLock<Tables>>,
}

impl MemoryCatalogStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total overlay rows across all tenants and kinds.
    pub fn overlay_count(&self) -> usize {
        self.tables.read().overlays.len()
    }

    pub fn node_count(&self) -> usize {
        self.tables.read().nodes.len()
    }
}

#[async_trait]
impl CatalogStore for MemoryCatalogStore {
    async fn begin(&self) -> Result<Box<dyn CatalogUnit>> {
        Ok(Box::new(MemoryUnit {
            tables: self.tables.clone(),
            nodes: Vec::new(),
            overlays: Vec::new(),
        }))
    }

    async fn create_user(&self, tenant_id: TenantId) -> Result<()> {
        if self.tables.write().users.insert(tenant_id) {
            Ok(())
        } else {
            Err(WiknoError::conflict(format!("graph user {tenant_id} exists")))
        }
    }

    async fn user_exists(&self, tenant_id: TenantId) -> Result<bool> {
        Ok(self.tables.read().users.contains(&tenant_id))
    }

    async fn get_node(&self, kind: NodeKind, id: NodeId) -> Result<Option<CatalogNode>> {
        Ok(self.tables.read().node(kind, id))
    }

    async fn overlays_for_tenant(&self, tenant_id: TenantId, kind: NodeKind) -> Result<Vec<Overlay>> {
        let tables = self.tables.read();
        let mut rows: Vec<Overlay> = tables
            .overlays
            .iter()
            .filter(|((k, t, _), _)| *k == kind && *t == tenant_id)
            .map(|(_, o)| o.clone())
            .collect();
        rows.sort_by_key(|o| o.node_id);
        Ok(rows)
    }

    async fn value_types(&self, ids: &[NodeId]) -> Result<HashMap<NodeId, ValueType>> {
        let tables = self.tables.read();
        Ok(ids
            .iter()
            .filter_map(|id| {
                tables
                    .nodes
                    .get(id)
                    .and_then(|n| n.value_type())
                    .map(|vt| (*id, vt))
            })
            .collect())
    }

    async fn update_overlay(
        &self,
        kind: NodeKind,
        tenant_id: TenantId,
        node_id: NodeId,
        name: &str,
        definition: &str,
    ) -> Result<bool> {
        let mut tables = self.tables.write();
        match tables.overlays.get_mut(&(kind, tenant_id, node_id)) {
            Some(overlay) => {
                overlay.name = name.to_owned();
                overlay.definition = definition.to_owned();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn find_overlays_by_name(&self, kind: NodeKind, name: &str) -> Result<Vec<Overlay>> {
        Ok(self
            .tables
            .read()
            .overlays
            .iter()
            .filter(|((k, _, _), o)| *k == kind && o.name == name)
            .map(|(_, o)| o.clone())
            .collect())
    }
}

struct MemoryUnit {
    tables: Arc<RwLock<Tables>>,
    nodes: Vec<CatalogNode>,
    overlays: Vec<(NodeKind, Overlay)>,
}

#[async_trait]
impl CatalogUnit for MemoryUnit {
    async fn get_node(&mut self, kind: NodeKind, id: NodeId) -> Result<Option<CatalogNode>> {
        if let Some(node) = self.nodes.iter().find(|n| n.id() == id && n.kind() == kind) {
            return Ok(Some(node.clone()));
        }
        Ok(self.tables.read().node(kind, id))
    }

    async fn create_node(&mut self, node: &CatalogNode) -> Result<()> {
        let exists = self.nodes.iter().any(|n| n.id() == node.id())
            || self.tables.read().nodes.contains_key(&node.id());
        if exists {
            return Err(WiknoError::conflict(format!("node {} exists", node.id())));
        }
        self.nodes.push(node.clone());
        Ok(())
    }

    async fn insert_overlay(&mut self, kind: NodeKind, overlay: &Overlay) -> Result<()> {
        let staged = self
            .overlays
            .iter()
            .any(|(k, o)| *k == kind && o.tenant_id == overlay.tenant_id && o.node_id == overlay.node_id);
        if staged {
            return Err(overlay_conflict(kind, overlay));
        }
        self.tables.read().check_overlay(kind, overlay)?;
        self.overlays.push((kind, overlay.clone()));
        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<()> {
        let MemoryUnit {
            tables,
            nodes,
            overlays,
        } = *self;
        let mut tables = tables.write();

        for node in &nodes {
            if tables.nodes.contains_key(&node.id()) {
                return Err(WiknoError::conflict(format!("node {} exists", node.id())));
            }
        }
        for (kind, overlay) in &overlays {
            tables.check_overlay(*kind, overlay)?;
            let node_known = tables.node(*kind, overlay.node_id).is_some()
                || nodes.iter().any(|n| n.id() == overlay.node_id && n.kind() == *kind);
            if !node_known {
                return Err(WiknoError::not_found(format!("{kind} {} not found", overlay.node_id)));
            }
        }

        for node in nodes {
            tables.nodes.insert(node.id(), node);
        }
        for (kind, overlay) in overlays {
            tables
                .overlays
                .insert((kind, overlay.tenant_id, overlay.node_id), overlay);
        }
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<()> {
        Ok(())
    }
}
