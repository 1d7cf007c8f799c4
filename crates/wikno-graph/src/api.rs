//! HTTP surface of the graph service.
//!
//! Every route except liveness sits behind [`gateway::authorize`]. The
//! tenant of a call is always the verified caller, never a request field.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::middleware::from_fn_with_state;
use axum::routing::{get, post, put};
use axum::{Json, Router};

use wikno_core::health::HealthService;
use wikno_core::{NodeId, NodeKind, TenantId, WiknoError};
use wikno_rpc::{apply_common_layers, liveness, ApiJson, ApiQuery, ApiResult};

use crate::gateway::{authorize, Caller, TokenVerifier};
use crate::model::{
    ConnectionTypeOverlay, CreateUserRequest, EntityOverlay, FindQuery, NodeRequest,
    PropertyTypeOverlay, PropertyTypeRequest, UpdateRequest, UserData,
};
use crate::service::GraphService;

pub const USERS_PATH: &str = "/v1/graph/users";
pub const USER_DATA_PATH: &str = "/v1/graph/user-data";
pub const ENTITIES_PATH: &str = "/v1/graph/entities";
pub const CONNECTION_TYPES_PATH: &str = "/v1/graph/connection-types";
pub const PROPERTY_TYPES_PATH: &str = "/v1/graph/property-types";
pub const HEALTH_PATH: &str = "/v1/graph/health";

#[derive(Clone)]
pub struct AppState {
    pub service: Arc<GraphService>,
    /// Principal allowed to provision graph users.
    pub service_account_email: String,
}

// ── Users ────────────────────────────────────────────────────────

async fn create_user(
    State(state): State<AppState>,
    Caller(caller): Caller,
    ApiJson(req): ApiJson<CreateUserRequest>,
) -> ApiResult<StatusCode> {
    if !caller.email.eq_ignore_ascii_case(&state.service_account_email) {
        tracing::warn!(principal_id = %caller.id, "CreateUser from non-service principal");
        return Err(WiknoError::unauthenticated("CreateUser requires the service account").into());
    }
    let tenant_id: TenantId = req.tenant_id.parse()?;
    state.service.create_user(tenant_id).await?;
    Ok(StatusCode::CREATED)
}

async fn get_user_data(State(state): State<AppState>, Caller(caller): Caller) -> ApiResult<Json<UserData>> {
    Ok(Json(state.service.get_user_data(caller.tenant_id()).await?))
}

// ── Entities ─────────────────────────────────────────────────────

async fn create_entity(
    State(state): State<AppState>,
    Caller(caller): Caller,
    ApiJson(req): ApiJson<NodeRequest>,
) -> ApiResult<(StatusCode, Json<EntityOverlay>)> {
    let overlay = state.service.create_entity(caller.tenant_id(), &req).await?;
    Ok((StatusCode::CREATED, Json(overlay)))
}

async fn find_entities(
    State(state): State<AppState>,
    ApiQuery(q): ApiQuery<FindQuery>,
) -> ApiResult<Json<Vec<EntityOverlay>>> {
    Ok(Json(state.service.find_entities(&q.name).await?))
}

async fn update_entity(
    state: State<AppState>,
    caller: Caller,
    id: Path<String>,
    req: ApiJson<UpdateRequest>,
) -> ApiResult<StatusCode> {
    update(NodeKind::Entity, state, caller, id, req).await
}

// ── Connection types ─────────────────────────────────────────────

async fn create_connection_type(
    State(state): State<AppState>,
    Caller(caller): Caller,
    ApiJson(req): ApiJson<NodeRequest>,
) -> ApiResult<(StatusCode, Json<ConnectionTypeOverlay>)> {
    let overlay = state
        .service
        .create_connection_type(caller.tenant_id(), &req)
        .await?;
    Ok((StatusCode::CREATED, Json(overlay)))
}

async fn find_connection_types(
    State(state): State<AppState>,
    ApiQuery(q): ApiQuery<FindQuery>,
) -> ApiResult<Json<Vec<ConnectionTypeOverlay>>> {
    Ok(Json(state.service.find_connection_types(&q.name).await?))
}

async fn update_connection_type(
    state: State<AppState>,
    caller: Caller,
    id: Path<String>,
    req: ApiJson<UpdateRequest>,
) -> ApiResult<StatusCode> {
    update(NodeKind::ConnectionType, state, caller, id, req).await
}

// ── Property types ───────────────────────────────────────────────

async fn create_property_type(
    State(state): State<AppState>,
    Caller(caller): Caller,
    ApiJson(req): ApiJson<PropertyTypeRequest>,
) -> ApiResult<(StatusCode, Json<PropertyTypeOverlay>)> {
    let overlay = state
        .service
        .create_property_type(caller.tenant_id(), &req)
        .await?;
    Ok((StatusCode::CREATED, Json(overlay)))
}

async fn find_property_types(
    State(state): State<AppState>,
    ApiQuery(q): ApiQuery<FindQuery>,
) -> ApiResult<Json<Vec<PropertyTypeOverlay>>> {
    Ok(Json(state.service.find_property_types(&q.name).await?))
}

async fn update_property_type(
    state: State<AppState>,
    caller: Caller,
    id: Path<String>,
    req: ApiJson<UpdateRequest>,
) -> ApiResult<StatusCode> {
    update(NodeKind::PropertyType, state, caller, id, req).await
}

async fn update(
    kind: NodeKind,
    State(state): State<AppState>,
    Caller(caller): Caller,
    Path(id): Path<String>,
    ApiJson(req): ApiJson<UpdateRequest>,
) -> ApiResult<StatusCode> {
    let node_id: NodeId = id.parse()?;
    state
        .service
        .update_overlay(kind, caller.tenant_id(), node_id, &req)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

pub fn router(state: AppState, verifier: Arc<dyn TokenVerifier>, health: HealthService) -> Router {
    let api = Router::new()
        .route(USERS_PATH, post(create_user))
        .route(USER_DATA_PATH, get(get_user_data))
        .route(ENTITIES_PATH, post(create_entity).get(find_entities))
        .route(&format!("{ENTITIES_PATH}/{{id}}"), put(update_entity))
        .route(
            CONNECTION_TYPES_PATH,
            post(create_connection_type).get(find_connection_types),
        )
        .route(
            &format!("{CONNECTION_TYPES_PATH}/{{id}}"),
            put(update_connection_type),
        )
        .route(
            PROPERTY_TYPES_PATH,
            post(create_property_type).get(find_property_types),
        )
        .route(
            &format!("{PROPERTY_TYPES_PATH}/{{id}}"),
            put(update_property_type),
        )
        .route_layer(from_fn_with_state(verifier, authorize))
        .with_state(state);

    apply_common_layers(api.merge(liveness::router(HEALTH_PATH, health)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;
    use wikno_core::error::Result;
    use wikno_core::health::HealthConfig;
    use wikno_core::{ErrorKind, Principal, PrincipalId};
    use wikno_rpc::status::ErrorBody;
    use wikno_rpc::AUTHORIZATION_HEADER;

    use crate::store::MemoryCatalogStore;

    const SERVICE_EMAIL: &str = "svc@wikno.test";

    /// Treats the token as `<uuid>|<email>`.
    struct Echo;

    #[async_trait]
    impl TokenVerifier for Echo {
        async fn verify(&self, token: &str) -> Result<Principal> {
            let (id, email) = token
                .split_once('|')
                .ok_or_else(|| WiknoError::unauthenticated("bad token"))?;
            Ok(Principal {
                id: id.parse()?,
                email: email.to_string(),
            })
        }
    }

    fn app() -> Router {
        let state = AppState {
            service: Arc::new(GraphService::new(Arc::new(MemoryCatalogStore::new()))),
            service_account_email: SERVICE_EMAIL.into(),
        };
        router(
            state,
            Arc::new(Echo),
            HealthService::new(HealthConfig::default(), Vec::new()),
        )
    }

    fn token(id: PrincipalId, email: &str) -> String {
        format!("{id}|{email}")
    }

    async fn call(
        app: &Router,
        method: &str,
        path: &str,
        token: Option<&str>,
        body: Option<serde_json::Value>,
    ) -> (StatusCode, serde_json::Value) {
        let mut req = Request::builder().method(method).uri(path);
        if let Some(t) = token {
            req = req.header(AUTHORIZATION_HEADER, format!("Bearer {t}"));
        }
        let body = match body {
            Some(json) => {
                req = req.header("content-type", "application/json");
                Body::from(json.to_string())
            }
            None => Body::empty(),
        };
        let resp = app.clone().oneshot(req.body(body).unwrap()).await.unwrap();
        let status = resp.status();
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null))
    }

    async fn provisioned(app: &Router) -> (PrincipalId, String) {
        let user = PrincipalId::new();
        let svc = token(PrincipalId::new(), SERVICE_EMAIL);
        let (status, _) = call(
            app,
            "POST",
            USERS_PATH,
            Some(&svc),
            Some(serde_json::json!({"tenant_id": user.to_string()})),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        (user, token(user, "a@x.com"))
    }

    #[tokio::test]
    async fn test_create_user_is_service_account_only() {
        let app = app();
        let user = PrincipalId::new();
        let human = token(user, "a@x.com");
        let body = serde_json::json!({"tenant_id": user.to_string()});

        let (status, resp) = call(&app, "POST", USERS_PATH, Some(&human), Some(body.clone())).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        let err: ErrorBody = serde_json::from_value(resp).unwrap();
        assert_eq!(err.kind, ErrorKind::Unauthenticated);

        let svc = token(PrincipalId::new(), SERVICE_EMAIL);
        let (status, _) = call(&app, "POST", USERS_PATH, Some(&svc), Some(body.clone())).await;
        assert_eq!(status, StatusCode::CREATED);
        let (status, _) = call(&app, "POST", USERS_PATH, Some(&svc), Some(body)).await;
        assert_eq!(status, StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn test_create_find_update_entity() {
        let app = app();
        let (user, t) = provisioned(&app).await;

        let (status, created) = call(
            &app,
            "POST",
            ENTITIES_PATH,
            Some(&t),
            Some(serde_json::json!({"name": "Dog", "definition": "A canine"})),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        let dog: EntityOverlay = serde_json::from_value(created).unwrap();
        assert_eq!(dog.tenant_id, TenantId::from(user));

        let (status, found) = call(&app, "GET", &format!("{ENTITIES_PATH}?name=Dog"), Some(&t), None).await;
        assert_eq!(status, StatusCode::OK);
        let found: Vec<EntityOverlay> = serde_json::from_value(found).unwrap();
        assert_eq!(found, vec![dog.clone()]);

        let (status, _) = call(
            &app,
            "PUT",
            &format!("{ENTITIES_PATH}/{}", dog.entity_id),
            Some(&t),
            Some(serde_json::json!({"name": "Hound", "definition": "A hunting dog"})),
        )
        .await;
        assert_eq!(status, StatusCode::NO_CONTENT);

        let (status, _) = call(
            &app,
            "PUT",
            &format!("{ENTITIES_PATH}/{}", NodeId::new()),
            Some(&t),
            Some(serde_json::json!({"name": "Hound", "definition": "A hunting dog"})),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, data) = call(&app, "GET", USER_DATA_PATH, Some(&t), None).await;
        assert_eq!(status, StatusCode::OK);
        let data: UserData = serde_json::from_value(data).unwrap();
        assert_eq!(data.entities.len(), 1);
        assert_eq!(data.entities[0].name, "Hound");
    }

    #[tokio::test]
    async fn test_property_type_value_type_guard() {
        let app = app();
        let (_, t) = provisioned(&app).await;

        let (status, created) = call(
            &app,
            "POST",
            PROPERTY_TYPES_PATH,
            Some(&t),
            Some(serde_json::json!({"name": "Age", "definition": "Years alive", "value_type": "int"})),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        let age: PropertyTypeOverlay = serde_json::from_value(created).unwrap();

        let (status, _) = call(
            &app,
            "POST",
            PROPERTY_TYPES_PATH,
            Some(&t),
            Some(serde_json::json!({
                "id": age.property_type_id.to_string(),
                "name": "Years",
                "definition": "Age in years",
                "value_type": "float"
            })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_user_data_without_user_is_not_found() {
        let app = app();
        let t = token(PrincipalId::new(), "a@x.com");
        let (status, _) = call(&app, "GET", USER_DATA_PATH, Some(&t), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_bad_path_id_is_invalid_request() {
        let app = app();
        let (_, t) = provisioned(&app).await;
        let (status, _) = call(
            &app,
            "PUT",
            &format!("{CONNECTION_TYPES_PATH}/not-a-uuid"),
            Some(&t),
            Some(serde_json::json!({"name": "x", "definition": "y"})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_routes_require_token_but_health_does_not() {
        let app = app();
        for (method, path) in [
            ("GET", USER_DATA_PATH),
            ("GET", "/v1/graph/entities?name=Dog"),
            ("POST", CONNECTION_TYPES_PATH),
        ] {
            let (status, _) = call(&app, method, path, None, None).await;
            assert_eq!(status, StatusCode::UNAUTHORIZED, "{method} {path}");
        }
        let (status, _) = call(&app, "GET", HEALTH_PATH, None, None).await;
        assert_eq!(status, StatusCode::OK);
    }
}
