//! Wikno Identity: authenticates principals and issues claim tokens.
//!
//! The graph service never verifies tokens itself; it calls
//! [`service::IdentityCore::verify_token`] through the `verify-token`
//! endpoint on every request.

pub mod api;
pub mod app;
pub mod bootstrap;
pub mod config;
pub mod graph_link;
pub mod password;
pub mod service;
pub mod store;
pub mod token;
pub mod validate;

pub use app::IdentityApp;
pub use config::IdentityConfig;
pub use service::{IdentityCore, Session};
