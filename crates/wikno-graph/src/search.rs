//! Global exact-name search across every tenant's overlays.
//!
//! Results hold at most one overlay per catalog node. When several tenants
//! overlay the same node under the searched name, the row with the lowest
//! tenant id wins. Results are ordered by node id.

use std::collections::btree_map::Entry;
use std::collections::BTreeMap;
use std::sync::Arc;

use wikno_core::error::Result;
use wikno_core::{NodeId, NodeKind, ResultExt};

use crate::model::{validate_name, Overlay};
use crate::store::CatalogStore;

pub struct SearchAccessor {
    store: Arc<dyn CatalogStore>,
}

impl SearchAccessor {
    pub fn new(store: Arc<dyn CatalogStore>) -> Self {
        Self { store }
    }

    pub async fn find(&self, kind: NodeKind, name: &str) -> Result<Vec<Overlay>> {
        validate_name(name)?;
        let rows = self
            .store
            .find_overlays_by_name(kind, name)
            .await
            .with_context(|| format!("find {kind} named {name:?}"))?;
        Ok(dedup_by_node(rows))
    }
}

fn dedup_by_node(rows: Vec<Overlay>) -> Vec<Overlay> {
    let mut by_node: BTreeMap<NodeId, Overlay> = BTreeMap::new();
    for row in rows {
        match by_node.entry(row.node_id) {
            Entry::Vacant(slot) => {
                slot.insert(row);
            }
            Entry::Occupied(mut slot) => {
                if row.tenant_id < slot.get().tenant_id {
                    slot.insert(row);
                }
            }
        }
    }
    by_node.into_values().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;
    use wikno_core::TenantId;

    fn row(tenant: u128, node: u128, name: &str) -> Overlay {
        Overlay {
            tenant_id: TenantId(Uuid::from_u128(tenant)),
            node_id: NodeId(Uuid::from_u128(node)),
            name: name.into(),
            definition: format!("def by {tenant}"),
        }
    }

    #[test]
    fn test_lowest_tenant_wins_per_node() {
        let out = dedup_by_node(vec![row(9, 1, "Dog"), row(3, 1, "Dog"), row(5, 1, "Dog")]);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].tenant_id, TenantId(Uuid::from_u128(3)));
    }

    #[test]
    fn test_distinct_nodes_all_returned_in_node_order() {
        let out = dedup_by_node(vec![row(1, 7, "Dog"), row(1, 2, "Dog"), row(2, 5, "Dog")]);
        let nodes: Vec<u128> = out.iter().map(|o| o.node_id.0.as_u128()).collect();
        assert_eq!(nodes, vec![2, 5, 7]);
    }

    #[tokio::test]
    async fn test_empty_name_is_rejected() {
        let accessor = SearchAccessor::new(Arc::new(crate::store::MemoryCatalogStore::new()));
        let err = accessor.find(NodeKind::Entity, "").await.unwrap_err();
        assert_eq!(err.kind(), wikno_core::ErrorKind::InvalidRequest);
    }
}
