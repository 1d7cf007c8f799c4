//! Neo4j-backed catalog store.
//!
//! Graph shape:
//! `(:Tenant)-[:CLAIMS]->(:EntityOverlay)-[:OVERLAYS]->(:Entity)`, and the
//! same for connection types and property types. Overlay uniqueness is a
//! constraint on `overlay_key = "<tenant_id>:<node_id>"`.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use neo4rs::{query, Row};

use wikno_core::error::Result;
use wikno_core::{NodeId, NodeKind, ResultExt, TenantId, ValueType, WiknoError};
use wikno_db::client::{get_i64, get_opt_string, get_string};
use wikno_db::{Neo4jClient, Neo4jUnit};

use super::{CatalogStore, CatalogUnit};
use crate::model::{overlay_key, CatalogNode, Overlay};

/// Constraints and indexes installed at startup.
pub const SCHEMA: &[&str] = &[
    "CREATE CONSTRAINT tenant_id IF NOT EXISTS FOR (t:Tenant) REQUIRE t.id IS UNIQUE",
    "CREATE CONSTRAINT entity_id IF NOT EXISTS FOR (n:Entity) REQUIRE n.id IS UNIQUE",
    "CREATE CONSTRAINT connection_type_id IF NOT EXISTS FOR (n:ConnectionType) REQUIRE n.id IS UNIQUE",
    "CREATE CONSTRAINT property_type_id IF NOT EXISTS FOR (n:PropertyType) REQUIRE n.id IS UNIQUE",
    "CREATE CONSTRAINT entity_overlay_key IF NOT EXISTS FOR (o:EntityOverlay) REQUIRE o.overlay_key IS UNIQUE",
    "CREATE CONSTRAINT connection_type_overlay_key IF NOT EXISTS FOR (o:ConnectionTypeOverlay) REQUIRE o.overlay_key IS UNIQUE",
    "CREATE CONSTRAINT property_type_overlay_key IF NOT EXISTS FOR (o:PropertyTypeOverlay) REQUIRE o.overlay_key IS UNIQUE",
    "CREATE INDEX entity_overlay_name IF NOT EXISTS FOR (o:EntityOverlay) ON (o.name)",
    "CREATE INDEX connection_type_overlay_name IF NOT EXISTS FOR (o:ConnectionTypeOverlay) ON (o.name)",
    "CREATE INDEX property_type_overlay_name IF NOT EXISTS FOR (o:PropertyTypeOverlay) ON (o.name)",
];

#[derive(Clone)]
pub struct Neo4jCatalogStore {
    client: Neo4jClient,
}

impl Neo4jCatalogStore {
    pub fn new(client: Neo4jClient) -> Self {
        Self { client }
    }
}

// ── Row decoding ─────────────────────────────────────────────────

fn parse_id<T: std::str::FromStr<Err = WiknoError>>(row: &Row, key: &str) -> Result<T> {
    get_string(row, key)?
        .parse::<T>()
        .map_err(|e| WiknoError::internal(format!("stored `{key}`: {e}")))
}

fn overlay_from_row(row: &Row) -> Result<Overlay> {
    Ok(Overlay {
        tenant_id: parse_id(row, "tenant_id")?,
        node_id: parse_id(row, "node_id")?,
        name: get_string(row, "name")?,
        definition: get_string(row, "definition")?,
    })
}

fn node_from_row(kind: NodeKind, row: &Row) -> Result<CatalogNode> {
    let id: NodeId = parse_id(row, "id")?;
    Ok(match kind {
        NodeKind::Entity => CatalogNode::Entity { id },
        NodeKind::ConnectionType => CatalogNode::ConnectionType { id },
        NodeKind::PropertyType => {
            let raw = get_opt_string(row, "value_type").ok_or_else(|| {
                WiknoError::internal(format!("property type {id} has no value_type"))
            })?;
            let value_type = raw
                .parse::<ValueType>()
                .map_err(|e| WiknoError::internal(format!("property type {id}: {e}")))?;
            CatalogNode::PropertyType { id, value_type }
        }
    })
}

fn get_node_query(kind: NodeKind, id: NodeId) -> neo4rs::Query {
    let cypher = format!(
        "MATCH (n:{label} {{id: $id}})
         RETURN n.id AS id, n.value_type AS value_type",
        label = kind.label()
    );
    query(&cypher).param("id", id.to_string())
}

// ── Store ────────────────────────────────────────────────────────

#[async_trait]
impl CatalogStore for Neo4jCatalogStore {
    async fn begin(&self) -> Result<Box<dyn CatalogUnit>> {
        let unit = self.client.begin().await.context("begin catalog unit")?;
        Ok(Box::new(Neo4jCatalogUnit { unit }))
    }

    async fn create_user(&self, tenant_id: TenantId) -> Result<()> {
        let q = query("CREATE (t:Tenant {id: $id, created_at: $now})")
            .param("id", tenant_id.to_string())
            .param("now", Utc::now().to_rfc3339());
        self.client
            .run(q)
            .await
            .with_context(|| format!("create graph user {tenant_id}"))
    }

    async fn user_exists(&self, tenant_id: TenantId) -> Result<bool> {
        let q = query("MATCH (t:Tenant {id: $id}) RETURN t.id AS id")
            .param("id", tenant_id.to_string());
        Ok(self.client.query_one(q).await.context("load graph user")?.is_some())
    }

    async fn get_node(&self, kind: NodeKind, id: NodeId) -> Result<Option<CatalogNode>> {
        match self.client.query_one(get_node_query(kind, id)).await? {
            Some(row) => node_from_row(kind, &row).map(Some),
            None => Ok(None),
        }
    }

    async fn overlays_for_tenant(&self, tenant_id: TenantId, kind: NodeKind) -> Result<Vec<Overlay>> {
        let cypher = format!(
            "MATCH (t:Tenant {{id: $tenant_id}})-[:CLAIMS]->(o:{overlay})-[:OVERLAYS]->(n:{label})
             RETURN t.id AS tenant_id, n.id AS node_id, o.name AS name, o.definition AS definition
             ORDER BY n.id",
            overlay = kind.overlay_label(),
            label = kind.label()
        );
        let q = query(&cypher).param("tenant_id", tenant_id.to_string());

        self.client
            .query_rows(q)
            .await
            .with_context(|| format!("load {kind} overlays"))?
            .iter()
            .map(overlay_from_row)
            .collect()
    }

    async fn value_types(&self, ids: &[NodeId]) -> Result<HashMap<NodeId, ValueType>> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }
        let q = query(
            "MATCH (n:PropertyType) WHERE n.id IN $ids
             RETURN n.id AS id, n.value_type AS value_type",
        )
        .param("ids", ids.iter().map(|id| id.to_string()).collect::<Vec<_>>());

        let rows = self.client.query_rows(q).await.context("load value types")?;
        let mut out = HashMap::with_capacity(rows.len());
        for row in &rows {
            if let CatalogNode::PropertyType { id, value_type } =
                node_from_row(NodeKind::PropertyType, row)?
            {
                out.insert(id, value_type);
            }
        }
        Ok(out)
    }

    async fn update_overlay(
        &self,
        kind: NodeKind,
        tenant_id: TenantId,
        node_id: NodeId,
        name: &str,
        definition: &str,
    ) -> Result<bool> {
        let cypher = format!(
            "OPTIONAL MATCH (o:{overlay} {{overlay_key: $key}})
             SET o.name = $name, o.definition = $definition, o.updated_at = $now
             RETURN count(o) AS updated",
            overlay = kind.overlay_label()
        );
        let q = query(&cypher)
            .param("key", overlay_key(tenant_id, node_id))
            .param("name", name)
            .param("definition", definition)
            .param("now", Utc::now().to_rfc3339());

        let row = self
            .client
            .query_one(q)
            .await
            .with_context(|| format!("update {kind} overlay"))?;
        Ok(match row {
            Some(row) => get_i64(&row, "updated")? > 0,
            None => false,
        })
    }

    async fn find_overlays_by_name(&self, kind: NodeKind, name: &str) -> Result<Vec<Overlay>> {
        let cypher = format!(
            "MATCH (t:Tenant)-[:CLAIMS]->(o:{overlay} {{name: $name}})-[:OVERLAYS]->(n:{label})
             RETURN t.id AS tenant_id, n.id AS node_id, o.name AS name, o.definition AS definition",
            overlay = kind.overlay_label(),
            label = kind.label()
        );
        let q = query(&cypher).param("name", name);

        self.client
            .query_rows(q)
            .await
            .with_context(|| format!("search {kind} overlays"))?
            .iter()
            .map(overlay_from_row)
            .collect()
    }
}

// ── Unit ─────────────────────────────────────────────────────────

struct Neo4jCatalogUnit {
    unit: Neo4jUnit,
}

#[async_trait]
impl CatalogUnit for Neo4jCatalogUnit {
    async fn get_node(&mut self, kind: NodeKind, id: NodeId) -> Result<Option<CatalogNode>> {
        match self.unit.query_one(get_node_query(kind, id)).await? {
            Some(row) => node_from_row(kind, &row).map(Some),
            None => Ok(None),
        }
    }

    async fn create_node(&mut self, node: &CatalogNode) -> Result<()> {
        let cypher = format!(
            "CREATE (n:{label} {{id: $id, value_type: $value_type, created_at: $now}})",
            label = node.kind().label()
        );
        // A null property is not stored, so entities and connection types
        // carry no value_type.
        let value_type: Option<String> = node.value_type().map(|vt| vt.as_str().to_owned());
        let q = query(&cypher)
            .param("id", node.id().to_string())
            .param("value_type", value_type)
            .param("now", Utc::now().to_rfc3339());

        self.unit
            .run(q)
            .await
            .with_context(|| format!("create {} {}", node.kind(), node.id()))?;
        tracing::debug!(kind = %node.kind(), node_id = %node.id(), "Catalog node staged");
        Ok(())
    }

    async fn insert_overlay(&mut self, kind: NodeKind, overlay: &Overlay) -> Result<()> {
        let cypher = format!(
            "MATCH (t:Tenant {{id: $tenant_id}})
             MATCH (n:{label} {{id: $node_id}})
             CREATE (t)-[:CLAIMS]->(o:{overlay_label} {{
               overlay_key: $key, tenant_id: $tenant_id, node_id: $node_id,
               name: $name, definition: $definition, created_at: $now
             }})-[:OVERLAYS]->(n)
             RETURN o.overlay_key AS key",
            label = kind.label(),
            overlay_label = kind.overlay_label()
        );
        let q = query(&cypher)
            .param("tenant_id", overlay.tenant_id.to_string())
            .param("node_id", overlay.node_id.to_string())
            .param("key", overlay.key())
            .param("name", overlay.name.clone())
            .param("definition", overlay.definition.clone())
            .param("now", Utc::now().to_rfc3339());

        let created = self
            .unit
            .query_one(q)
            .await
            .with_context(|| format!("insert {kind} overlay"))?;
        if created.is_none() {
            return Err(WiknoError::not_found(format!(
                "tenant {} has no graph user record",
                overlay.tenant_id
            )));
        }
        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<()> {
        self.unit.commit().await.context("commit catalog unit")
    }

    async fn rollback(self: Box<Self>) -> Result<()> {
        self.unit.rollback().await.context("roll back catalog unit")
    }
}
