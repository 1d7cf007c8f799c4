//! Wikno Graph: a shared catalog of entities, connection types and property
//! types, named per tenant through overlays.
//!
//! - [`orchestrator`]: link-or-create of a node plus its overlay, atomically
//! - [`search`]: global exact-name search, one overlay per node
//! - [`gateway`]: bearer token to verified caller, via the identity service
//! - [`store`]: in-memory and Neo4j catalog stores

pub mod api;
pub mod app;
pub mod config;
pub mod gateway;
pub mod model;
pub mod orchestrator;
pub mod search;
pub mod service;
pub mod store;

pub use app::GraphApp;
pub use config::GraphConfig;
pub use service::GraphService;
