//! Integration tests for wikno-db against a live Neo4j instance.
//!
//! Run with: cargo test --package wikno-db --test integration -- --ignored
//!
//! Skipped automatically if Neo4j is not available.

use neo4rs::query;
use uuid::Uuid;
use wikno_core::ErrorKind;
use wikno_db::{DbConfig, Neo4jClient};

async fn connect_or_skip() -> Option<Neo4jClient> {
    match Neo4jClient::connect(&DbConfig::default()).await {
        Ok(client) => Some(client),
        Err(e) => {
            eprintln!("Skipping integration test (Neo4j not available): {e}");
            None
        }
    }
}

const SCHEMA: &[&str] =
    &["CREATE CONSTRAINT probe_id IF NOT EXISTS FOR (n:WiknoProbe) REQUIRE n.id IS UNIQUE"];

async fn cleanup(client: &Neo4jClient, id: &str) {
    let _ = client
        .run(query("MATCH (n:WiknoProbe {id: $id}) DETACH DELETE n").param("id", id))
        .await;
}

async fn count(client: &Neo4jClient, id: &str) -> i64 {
    let row = client
        .query_one(query("MATCH (n:WiknoProbe {id: $id}) RETURN count(n) AS c").param("id", id))
        .await
        .unwrap()
        .unwrap();
    row.get::<i64>("c").unwrap()
}

#[tokio::test]
#[ignore = "requires live Neo4j"]
async fn test_commit_makes_writes_visible() {
    let Some(client) = connect_or_skip().await else {
        return;
    };
    client.ensure_schema(SCHEMA).await.unwrap();
    let id = Uuid::new_v4().to_string();

    let mut unit = client.begin().await.unwrap();
    unit.run(query("CREATE (:WiknoProbe {id: $id})").param("id", id.as_str()))
        .await
        .unwrap();
    unit.commit().await.unwrap();

    assert_eq!(count(&client, &id).await, 1);
    cleanup(&client, &id).await;
}

#[tokio::test]
#[ignore = "requires live Neo4j"]
async fn test_dropped_unit_rolls_back() {
    let Some(client) = connect_or_skip().await else {
        return;
    };
    let id = Uuid::new_v4().to_string();

    {
        let mut unit = client.begin().await.unwrap();
        unit.run(query("CREATE (:WiknoProbe {id: $id})").param("id", id.as_str()))
            .await
            .unwrap();
    }
    tokio::time::sleep(std::time::Duration::from_millis(200)).await;

    assert_eq!(count(&client, &id).await, 0);
}

#[tokio::test]
#[ignore = "requires live Neo4j"]
async fn test_unique_violation_is_conflict() {
    let Some(client) = connect_or_skip().await else {
        return;
    };
    client.ensure_schema(SCHEMA).await.unwrap();
    let id = Uuid::new_v4().to_string();

    client
        .run(query("CREATE (:WiknoProbe {id: $id})").param("id", id.as_str()))
        .await
        .unwrap();
    let err = client
        .run(query("CREATE (:WiknoProbe {id: $id})").param("id", id.as_str()))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Conflict);

    cleanup(&client, &id).await;
}
