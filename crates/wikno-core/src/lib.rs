//! wikno-core: Shared types, configuration, and error handling for the Wikno services.
//!
//! This crate provides the foundational pieces used by both the identity and
//! graph services:
//! - Identifier newtypes and the catalog node kinds
//! - The error taxonomy every layer speaks
//! - Layered configuration loading and tracing setup
//! - Background health probing

pub mod config;
pub mod error;
pub mod health;
pub mod telemetry;
pub mod types;

pub use error::{ErrorKind, ResultExt, WiknoError};
pub use types::{NodeId, NodeKind, Principal, PrincipalId, TenantId, ValueType};
