//! Wikno DB: the Neo4j access layer.
//!
//! Every persistence call in the services goes through this crate, and
//! every driver failure is classified here exactly once by
//! [`translate_error`]. Callers above this layer only add context.

pub mod client;
pub mod error;
pub mod unit;

pub use client::{DbConfig, Neo4jClient, Neo4jHealthCheck};
pub use error::translate_error;
pub use unit::Neo4jUnit;
