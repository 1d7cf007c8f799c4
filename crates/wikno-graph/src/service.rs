//! Graph operations on behalf of an authorized tenant.

use std::collections::HashMap;
use std::sync::Arc;

use wikno_core::error::Result;
use wikno_core::{NodeId, NodeKind, ResultExt, TenantId, ValueType, WiknoError};

use crate::model::{
    parse_optional_id, validate_definition, validate_name, CatalogNode, ConnectionTypeOverlay,
    EntityOverlay, NodeRequest, Overlay, PropertyTypeOverlay, PropertyTypeRequest, UpdateRequest, UserData,
};
use crate::orchestrator::{NodeSpec, TransactionOrchestrator};
use crate::search::SearchAccessor;
use crate::store::CatalogStore;

pub struct GraphService {
    store: Arc<dyn CatalogStore>,
    orchestrator: TransactionOrchestrator,
    search: SearchAccessor,
}

impl GraphService {
    pub fn new(store: Arc<dyn CatalogStore>) -> Self {
        Self {
            orchestrator: TransactionOrchestrator::new(store.clone()),
            search: SearchAccessor::new(store.clone()),
            store,
        }
    }

    pub fn store(&self) -> &Arc<dyn CatalogStore> {
        &self.store
    }

    // ── Users ─────────────────────────────────────────────────────

    pub async fn create_user(&self, tenant_id: TenantId) -> Result<()> {
        self.store.create_user(tenant_id).await?;
        tracing::info!(tenant_id = %tenant_id, "Graph user created");
        Ok(())
    }

    pub async fn get_user_data(&self, tenant_id: TenantId) -> Result<UserData> {
        if !self.store.user_exists(tenant_id).await? {
            return Err(WiknoError::not_found(format!("graph user {tenant_id} not found")));
        }

        let entities = self.store.overlays_for_tenant(tenant_id, NodeKind::Entity).await?;
        let connection_types = self
            .store
            .overlays_for_tenant(tenant_id, NodeKind::ConnectionType)
            .await?;
        let property_types = self
            .store
            .overlays_for_tenant(tenant_id, NodeKind::PropertyType)
            .await?;

        Ok(UserData {
            id: tenant_id,
            entities: entities.into_iter().map(Into::into).collect(),
            connection_types: connection_types.into_iter().map(Into::into).collect(),
            property_types: self
                .enrich(property_types)
                .await
                .context("load user data")?,
        })
    }

    // ── Link-or-create ────────────────────────────────────────────

    pub async fn create_entity(&self, tenant_id: TenantId, req: &NodeRequest) -> Result<EntityOverlay> {
        let (overlay, _) = self.link(tenant_id, NodeSpec::Entity, req).await?;
        Ok(overlay.into())
    }

    pub async fn create_connection_type(
        &self,
        tenant_id: TenantId,
        req: &NodeRequest,
    ) -> Result<ConnectionTypeOverlay> {
        let (overlay, _) = self.link(tenant_id, NodeSpec::ConnectionType, req).await?;
        Ok(overlay.into())
    }

    pub async fn create_property_type(
        &self,
        tenant_id: TenantId,
        req: &PropertyTypeRequest,
    ) -> Result<PropertyTypeOverlay> {
        let value_type: ValueType = req.value_type.parse()?;
        let node = NodeRequest {
            id: req.id.clone(),
            name: req.name.clone(),
            definition: req.definition.clone(),
        };
        let (overlay, created) = self
            .link(tenant_id, NodeSpec::PropertyType { value_type }, &node)
            .await?;
        let value_type = created.value_type().ok_or_else(|| {
            WiknoError::internal(format!("property type {} has no value_type", created.id()))
        })?;
        Ok(PropertyTypeOverlay::new(overlay, value_type))
    }

    async fn link(
        &self,
        tenant_id: TenantId,
        spec: NodeSpec,
        req: &NodeRequest,
    ) -> Result<(Overlay, CatalogNode)> {
        validate_name(&req.name)?;
        validate_definition(&req.definition)?;
        let node_id = parse_optional_id(&req.id)?;
        self.orchestrator
            .link_or_create(tenant_id, &spec, node_id, &req.name, &req.definition)
            .await
    }

    // ── Updates ───────────────────────────────────────────────────

    /// Rewrite the tenant's overlay of one node. The node itself, including
    /// a property type's value type, never changes.
    pub async fn update_overlay(
        &self,
        kind: NodeKind,
        tenant_id: TenantId,
        node_id: NodeId,
        req: &UpdateRequest,
    ) -> Result<()> {
        validate_name(&req.name)?;
        validate_definition(&req.definition)?;

        let updated = self
            .store
            .update_overlay(kind, tenant_id, node_id, &req.name, &req.definition)
            .await?;
        if !updated {
            return Err(WiknoError::not_found(format!(
                "tenant {tenant_id} has no {kind} overlay for {node_id}"
            )));
        }
        tracing::debug!(kind = %kind, tenant_id = %tenant_id, node_id = %node_id, "Overlay updated");
        Ok(())
    }

    // ── Search ────────────────────────────────────────────────────

    pub async fn find_entities(&self, name: &str) -> Result<Vec<EntityOverlay>> {
        let rows = self.search.find(NodeKind::Entity, name).await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    pub async fn find_connection_types(&self, name: &str) -> Result<Vec<ConnectionTypeOverlay>> {
        let rows = self.search.find(NodeKind::ConnectionType, name).await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    pub async fn find_property_types(&self, name: &str) -> Result<Vec<PropertyTypeOverlay>> {
        let rows = self.search.find(NodeKind::PropertyType, name).await?;
        self.enrich(rows).await.context("find property types")
    }

    /// Attach each property type node's value type. A node without one is a
    /// broken catalog, reported as `Internal`.
    async fn enrich(&self, overlays: Vec<Overlay>) -> Result<Vec<PropertyTypeOverlay>> {
        let ids: Vec<NodeId> = overlays.iter().map(|o| o.node_id).collect();
        let value_types: HashMap<NodeId, ValueType> = self.store.value_types(&ids).await?;

        overlays
            .into_iter()
            .map(|o| match value_types.get(&o.node_id) {
                Some(vt) => Ok(PropertyTypeOverlay::new(o, *vt)),
                None => Err(WiknoError::internal(format!(
                    "property type {} has no value_type",
                    o.node_id
                ))),
            })
            .collect()
    }
}
