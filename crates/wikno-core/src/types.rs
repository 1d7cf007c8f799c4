//! Core domain types shared by the identity and graph services.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::WiknoError;

// ── Identifiers ───────────────────────────────────────────────────

macro_rules! uuid_newtype {
    ($(#[$meta:meta])* $name:ident, $what:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
        #[serde(transparent)]
        pub struct $name(pub Uuid);

        impl $name {
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                self.0.fmt(f)
            }
        }

        impl FromStr for $name {
            type Err = WiknoError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Uuid::parse_str(s.trim())
                    .map(Self)
                    .map_err(|_| WiknoError::invalid(format!("{} must be a UUID, got {s:?}", $what)))
            }
        }
    };
}

uuid_newtype!(
    /// Identifier of an authenticated principal (human or service account).
    PrincipalId,
    "principal id"
);

uuid_newtype!(
    /// Identifier of a graph tenant. A tenant id is the principal id of the
    /// human who registered it.
    TenantId,
    "tenant id"
);

uuid_newtype!(
    /// Identifier of a shared catalog node.
    NodeId,
    "node id"
);

impl From<PrincipalId> for TenantId {
    fn from(id: PrincipalId) -> Self {
        Self(id.0)
    }
}

// ── Principal ─────────────────────────────────────────────────────

/// The verified identity attached to a request after token verification.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Principal {
    pub id: PrincipalId,
    pub email: String,
}

impl Principal {
    /// The tenant this principal acts as in the graph service.
    pub fn tenant_id(&self) -> TenantId {
        self.id.into()
    }
}

// ── Catalog ───────────────────────────────────────────────────────

/// The three kinds of shared catalog node.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    Entity,
    ConnectionType,
    PropertyType,
}

impl NodeKind {
    pub const ALL: [NodeKind; 3] = [Self::Entity, Self::ConnectionType, Self::PropertyType];

    /// Neo4j label of the catalog node.
    pub fn label(self) -> &'static str {
        match self {
            Self::Entity => "Entity",
            Self::ConnectionType => "ConnectionType",
            Self::PropertyType => "PropertyType",
        }
    }

    /// Neo4j label of this kind's overlay records.
    pub fn overlay_label(self) -> &'static str {
        match self {
            Self::Entity => "EntityOverlay",
            Self::ConnectionType => "ConnectionTypeOverlay",
            Self::PropertyType => "PropertyTypeOverlay",
        }
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Value type tag carried by a property type node. Fixed at creation.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ValueType {
    String,
    Int,
    Float,
    Boolean,
}

impl ValueType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Int => "int",
            Self::Float => "float",
            Self::Boolean => "boolean",
        }
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ValueType {
    type Err = WiknoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "string" => Ok(Self::String),
            "int" => Ok(Self::Int),
            "float" => Ok(Self::Float),
            "boolean" => Ok(Self::Boolean),
            other => Err(WiknoError::invalid(format!(
                "value_type must be one of string, int, float, boolean; got {other:?}"
            ))),
        }
    }
}
