//! Driver error classification.

use neo4rs::{Neo4jClientErrorKind, Neo4jErrorKind};
use wikno_core::{ErrorKind, WiknoError};

/// Map a driver failure onto the service error taxonomy.
///
/// Constraint violations become `Conflict`, connection-level failures become
/// `Unavailable`, and anything else is `Internal`. Typed variants decide
/// first; the rendered text is only consulted for server failures the driver
/// reports as an unexpected message (commit and pull).
pub fn translate_error(err: neo4rs::Error) -> WiknoError {
    let kind = match &err {
        neo4rs::Error::ConnectionError | neo4rs::Error::IOError { .. } => ErrorKind::Unavailable,
        neo4rs::Error::Neo4j(e) => classify_code(e.code()),
        other => classify(&format!("{other} ({other:?})")),
    };
    WiknoError::from_kind(kind, format!("neo4j: {err}"))
}

/// Classify a Neo4j status code such as `Neo.ClientError.Schema.ConstraintValidationFailed`.
fn classify_code(code: &str) -> ErrorKind {
    if code.ends_with(".ConstraintValidationFailed") {
        return ErrorKind::Conflict;
    }
    match Neo4jErrorKind::from(code) {
        Neo4jErrorKind::Transient | Neo4jErrorKind::Client(Neo4jClientErrorKind::SessionExpired) => {
            ErrorKind::Unavailable
        }
        _ => ErrorKind::Internal,
    }
}

fn classify(detail: &str) -> ErrorKind {
    const CONFLICT: &[&str] = &["ConstraintValidationFailed", "already exists with label"];
    const UNAVAILABLE: &[&str] = &[
        "Neo.TransientError.",
        "ServiceUnavailable",
        "Connection refused",
        "connection reset",
        "broken pipe",
        "timed out",
    ];

    if CONFLICT.iter().any(|needle| detail.contains(needle)) {
        ErrorKind::Conflict
    } else if UNAVAILABLE
        .iter()
        .any(|needle| detail.to_ascii_lowercase().contains(&needle.to_ascii_lowercase()))
    {
        ErrorKind::Unavailable
    } else {
        ErrorKind::Internal
    }
}
