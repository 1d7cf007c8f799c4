//! Both services over real HTTP, with in-memory stores.

use std::net::SocketAddr;

use reqwest::StatusCode;
use serde_json::{json, Value};
use tokio::net::TcpListener;

use wikno_graph::config::StoreBackend as GraphStore;
use wikno_graph::model::{EntityOverlay, PropertyTypeOverlay, UserData};
use wikno_graph::{GraphApp, GraphConfig};
use wikno_identity::config::StoreBackend as IdentityStore;
use wikno_identity::{IdentityApp, IdentityConfig};

struct Stack {
    identity: String,
    graph: String,
    http: reqwest::Client,
}

async fn listener() -> (TcpListener, SocketAddr) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    (listener, addr)
}

async fn spawn_graph(identity_url: String) -> String {
    let (graph_listener, graph_addr) = listener().await;
    let mut config = GraphConfig::new(identity_url);
    config.store = GraphStore::Memory;
    let graph = GraphApp::build(&config).await.unwrap();
    tokio::spawn(graph.serve(graph_listener, std::future::pending()));
    format!("http://{graph_addr}")
}

async fn stack() -> Stack {
    let (identity_listener, identity_addr) = listener().await;
    let identity_url = format!("http://{identity_addr}");
    let graph_url = spawn_graph(identity_url.clone()).await;

    let mut config = IdentityConfig::new("e2e-secret", "service-pass-123");
    config.store = IdentityStore::Memory;
    config.token.bcrypt_cost = 4;
    config.graph.url = Some(graph_url.clone());
    let identity = IdentityApp::build(&config).await.unwrap();
    tokio::spawn(identity.serve(identity_listener, std::future::pending()));

    Stack {
        identity: identity_url,
        graph: graph_url,
        http: reqwest::Client::new(),
    }
}

impl Stack {
    async fn identity_call(&self, path: &str, body: Value) -> (StatusCode, Value) {
        let resp = self
            .http
            .post(format!("{}{path}", self.identity))
            .json(&body)
            .send()
            .await
            .unwrap();
        let status = resp.status();
        (status, resp.json().await.unwrap_or(Value::Null))
    }

    async fn register(&self, email: &str) -> String {
        let (status, body) = self
            .identity_call(
                "/v1/identity/register",
                json!({"email": email, "password": "pw123456"}),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        body["token"].as_str().unwrap().to_string()
    }

    async fn graph_call(
        &self,
        method: reqwest::Method,
        path: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut req = self.http.request(method, format!("{}{path}", self.graph));
        if let Some(t) = token {
            req = req.bearer_auth(t);
        }
        if let Some(b) = body {
            req = req.json(&b);
        }
        let resp = req.send().await.unwrap();
        let status = resp.status();
        (status, resp.json().await.unwrap_or(Value::Null))
    }

    async fn get(&self, path: &str, token: &str) -> (StatusCode, Value) {
        self.graph_call(reqwest::Method::GET, path, Some(token), None).await
    }

    async fn post(&self, path: &str, token: Option<&str>, body: Value) -> (StatusCode, Value) {
        self.graph_call(reqwest::Method::POST, path, token, Some(body)).await
    }

    async fn user_data(&self, token: &str) -> UserData {
        let (status, body) = self.get("/v1/graph/user-data", token).await;
        assert_eq!(status, StatusCode::OK, "{body}");
        serde_json::from_value(body).unwrap()
    }
}

#[tokio::test]
async fn test_register_create_find_and_user_data() {
    let s = stack().await;
    let t1 = s.register("a@x.com").await;

    let (status, body) = s
        .post(
            "/v1/graph/entities",
            Some(&t1),
            json!({"name": "Dog", "definition": "A canine"}),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    let e1: EntityOverlay = serde_json::from_value(body).unwrap();

    let (status, body) = s.get("/v1/graph/entities?name=Dog", &t1).await;
    assert_eq!(status, StatusCode::OK);
    let found: Vec<EntityOverlay> = serde_json::from_value(body).unwrap();
    assert!(found.iter().any(|o| o.entity_id == e1.entity_id));

    let data = s.user_data(&t1).await;
    assert_eq!(data.entities.len(), 1);
    assert_eq!(data.entities[0].name, "Dog");
    assert_eq!(data.entities[0].entity_id, e1.entity_id);
}

#[tokio::test]
async fn test_missing_token_creates_nothing() {
    let s = stack().await;
    let t1 = s.register("a@x.com").await;

    let (status, _) = s
        .post(
            "/v1/graph/entities",
            None,
            json!({"name": "Ghost", "definition": "Never stored"}),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = s.get("/v1/graph/entities?name=Ghost", &t1).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!([]));
}

#[tokio::test]
async fn test_property_type_link_checks_value_type() {
    let s = stack().await;
    let t1 = s.register("a@x.com").await;

    let (status, body) = s
        .post(
            "/v1/graph/property-types",
            Some(&t1),
            json!({"name": "Age", "definition": "Years alive", "value_type": "int"}),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    let p1: PropertyTypeOverlay = serde_json::from_value(body).unwrap();

    // A second tenant links to the same node.
    let t2 = s.register("b@x.com").await;
    let link = |value_type: &str| {
        json!({
            "id": p1.property_type_id.to_string(),
            "name": "Years",
            "definition": "Age in years",
            "value_type": value_type
        })
    };

    let (status, _) = s.post("/v1/graph/property-types", Some(&t2), link("float")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(s.user_data(&t2).await.property_types.is_empty());

    let (status, body) = s.post("/v1/graph/property-types", Some(&t2), link("int")).await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    let p2: PropertyTypeOverlay = serde_json::from_value(body).unwrap();
    assert_eq!(p2.property_type_id, p1.property_type_id);

    let data = s.user_data(&t2).await;
    assert_eq!(data.property_types.len(), 1);
    assert_eq!(data.property_types[0].name, "Years");
}

#[tokio::test]
async fn test_identity_failure_statuses() {
    let s = stack().await;
    s.register("a@x.com").await;

    let creds = |password: &str| json!({"email": "a@x.com", "password": password});
    let (status, _) = s.identity_call("/v1/identity/register", creds("pw123456")).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = s.identity_call("/v1/identity/login", creds("wrong-pass")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = s
        .identity_call(
            "/v1/identity/login",
            json!({"email": "nobody@x.com", "password": "pw123456"}),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = s.identity_call("/v1/identity/login", creds("pw123456")).await;
    assert_eq!(status, StatusCode::OK);
    let token = body["token"].as_str().unwrap();
    s.user_data(token).await;
}

#[tokio::test]
async fn test_update_without_overlay_is_not_found() {
    let s = stack().await;
    let t1 = s.register("a@x.com").await;
    let (status, body) = s
        .post(
            "/v1/graph/entities",
            Some(&t1),
            json!({"name": "Dog", "definition": "A canine"}),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let dog: EntityOverlay = serde_json::from_value(body).unwrap();

    // Another tenant has no overlay on this node.
    let t2 = s.register("b@x.com").await;
    let (status, _) = s
        .graph_call(
            reqwest::Method::PUT,
            &format!("/v1/graph/entities/{}", dog.entity_id),
            Some(&t2),
            Some(json!({"name": "Wolf", "definition": "Not mine"})),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let data = s.user_data(&t1).await;
    assert_eq!(data.entities[0].name, "Dog");
}

#[tokio::test]
async fn test_concurrent_duplicate_overlay() {
    let s = stack().await;
    let t1 = s.register("a@x.com").await;
    let (_, body) = s
        .post(
            "/v1/graph/connection-types",
            Some(&t1),
            json!({"name": "owns", "definition": "Ownership"}),
        )
        .await;
    let node_id = body["connection_type_id"].as_str().unwrap().to_string();

    let t2 = s.register("b@x.com").await;
    let request = |name: &str| json!({"id": node_id, "name": name, "definition": "Ownership"});
    let (a, b) = tokio::join!(
        s.post("/v1/graph/connection-types", Some(&t2), request("has")),
        s.post("/v1/graph/connection-types", Some(&t2), request("holds")),
    );

    let mut statuses = vec![a.0, b.0];
    statuses.sort();
    assert_eq!(statuses, vec![StatusCode::CREATED, StatusCode::CONFLICT]);
    assert_eq!(s.user_data(&t2).await.connection_types.len(), 1);
}

#[tokio::test]
async fn test_identity_outage_is_unavailable_not_unauthenticated() {
    let graph = spawn_graph("http://127.0.0.1:1".to_string()).await;
    let http = reqwest::Client::new();

    let resp = http
        .get(format!("{graph}/v1/graph/user-data"))
        .bearer_auth("any-token")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["kind"], "unavailable");

    // Liveness needs no credentials even while identity is down.
    let resp = http.get(format!("{graph}/v1/graph/health")).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_request_id_is_echoed() {
    let s = stack().await;
    let resp = s
        .http
        .get(format!("{}/v1/graph/health", s.graph))
        .header("x-request-id", "e2e-req-1")
        .send()
        .await
        .unwrap();
    assert_eq!(
        resp.headers().get("x-request-id").and_then(|v| v.to_str().ok()),
        Some("e2e-req-1")
    );
}
