//! Catalog nodes, tenant overlays and the request/response shapes around them.
//!
//! Catalog nodes are anonymous and shared by every tenant. All naming lives
//! in overlays, keyed by `(tenant_id, node_id)`.

use serde::{Deserialize, Serialize};

use wikno_core::error::Result;
use wikno_core::{NodeId, NodeKind, TenantId, ValueType, WiknoError};

pub const MAX_NAME_LEN: usize = 255;
pub const MAX_DEFINITION_LEN: usize = 4096;

// ── Catalog ───────────────────────────────────────────────────────

/// A shared, tenant-agnostic catalog node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CatalogNode {
    Entity { id: NodeId },
    ConnectionType { id: NodeId },
    PropertyType { id: NodeId, value_type: ValueType },
}

impl CatalogNode {
    pub fn id(&self) -> NodeId {
        match self {
            Self::Entity { id } | Self::ConnectionType { id } | Self::PropertyType { id, .. } => *id,
        }
    }

    pub fn kind(&self) -> NodeKind {
        match self {
            Self::Entity { .. } => NodeKind::Entity,
            Self::ConnectionType { .. } => NodeKind::ConnectionType,
            Self::PropertyType { .. } => NodeKind::PropertyType,
        }
    }

    pub fn value_type(&self) -> Option<ValueType> {
        match self {
            Self::PropertyType { value_type, .. } => Some(*value_type),
            _ => None,
        }
    }
}

/// A tenant's name and definition for one catalog node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Overlay {
    pub tenant_id: TenantId,
    pub node_id: NodeId,
    pub name: String,
    pub definition: String,
}

impl Overlay {
    /// Storage key enforcing one overlay per tenant per node.
    pub fn key(&self) -> String {
        overlay_key(self.tenant_id, self.node_id)
    }
}

pub fn overlay_key(tenant_id: TenantId, node_id: NodeId) -> String {
    format!("{tenant_id}:{node_id}")
}

// ── Responses ─────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EntityOverlay {
    pub tenant_id: TenantId,
    pub entity_id: NodeId,
    pub name: String,
    pub definition: String,
}

impl From<Overlay> for EntityOverlay {
    fn from(o: Overlay) -> Self {
        Self {
            tenant_id: o.tenant_id,
            entity_id: o.node_id,
            name: o.name,
            definition: o.definition,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ConnectionTypeOverlay {
    pub tenant_id: TenantId,
    pub connection_type_id: NodeId,
    pub name: String,
    pub definition: String,
}

impl From<Overlay> for ConnectionTypeOverlay {
    fn from(o: Overlay) -> Self {
        Self {
            tenant_id: o.tenant_id,
            connection_type_id: o.node_id,
            name: o.name,
            definition: o.definition,
        }
    }
}

/// Property type overlay enriched with the node's value type, which the
/// overlay itself does not carry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PropertyTypeOverlay {
    pub tenant_id: TenantId,
    pub property_type_id: NodeId,
    pub name: String,
    pub definition: String,
    pub value_type: ValueType,
}

impl PropertyTypeOverlay {
    pub fn new(o: Overlay, value_type: ValueType) -> Self {
        Self {
            tenant_id: o.tenant_id,
            property_type_id: o.node_id,
            name: o.name,
            definition: o.definition,
            value_type,
        }
    }
}

/// Everything one tenant has overlaid.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UserData {
    pub id: TenantId,
    pub entities: Vec<EntityOverlay>,
    pub connection_types: Vec<ConnectionTypeOverlay>,
    pub property_types: Vec<PropertyTypeOverlay>,
}

// ── Requests ──────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateUserRequest {
    pub tenant_id: String,
}

/// Create request for entities and connection types. An empty `id` means
/// "create a new node".
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NodeRequest {
    #[serde(default)]
    pub id: String,
    pub name: String,
    pub definition: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PropertyTypeRequest {
    #[serde(default)]
    pub id: String,
    pub name: String,
    pub definition: String,
    pub value_type: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateRequest {
    pub name: String,
    pub definition: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FindQuery {
    pub name: String,
}

// ── Validation ────────────────────────────────────────────────────

pub fn validate_name(name: &str) -> Result<()> {
    if name.trim().is_empty() {
        return Err(WiknoError::invalid("name is required"));
    }
    if name.chars().count() > MAX_NAME_LEN {
        return Err(WiknoError::invalid(format!(
            "name must be at most {MAX_NAME_LEN} characters"
        )));
    }
    Ok(())
}

pub fn validate_definition(definition: &str) -> Result<()> {
    if definition.trim().is_empty() {
        return Err(WiknoError::invalid("definition is required"));
    }
    if definition.chars().count() > MAX_DEFINITION_LEN {
        return Err(WiknoError::invalid(format!(
            "definition must be at most {MAX_DEFINITION_LEN} characters"
        )));
    }
    Ok(())
}

/// Empty means absent; anything else must be a UUID.
pub fn parse_optional_id(raw: &str) -> Result<Option<NodeId>> {
    if raw.trim().is_empty() {
        Ok(None)
    } else {
        raw.parse().map(Some)
    }
}
