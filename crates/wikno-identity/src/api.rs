//! HTTP surface of the identity service.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};

use wikno_core::health::HealthService;
use wikno_core::PrincipalId;
use wikno_rpc::{apply_common_layers, liveness, ApiJson, ApiResult};

use crate::service::{IdentityCore, Session};

pub const REGISTER_PATH: &str = "/v1/identity/register";
pub const LOGIN_PATH: &str = "/v1/identity/login";
pub const VERIFY_TOKEN_PATH: &str = "/v1/identity/verify-token";
pub const HEALTH_PATH: &str = "/v1/identity/health";

#[derive(Debug, Serialize, Deserialize)]
pub struct CredentialsRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SessionResponse {
    pub principal_id: PrincipalId,
    pub email: String,
    pub token: String,
    pub expires_at: i64,
}

impl From<Session> for SessionResponse {
    fn from(s: Session) -> Self {
        Self {
            principal_id: s.principal.id,
            email: s.principal.email,
            token: s.token,
            expires_at: s.expires_at,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct VerifyTokenRequest {
    pub token: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PrincipalResponse {
    pub principal_id: PrincipalId,
    pub email: String,
}

async fn register(
    State(core): State<Arc<IdentityCore>>,
    ApiJson(req): ApiJson<CredentialsRequest>,
) -> ApiResult<(StatusCode, Json<SessionResponse>)> {
    let session = core.register(&req.email, &req.password).await?;
    Ok((StatusCode::CREATED, Json(session.into())))
}

async fn login(
    State(core): State<Arc<IdentityCore>>,
    ApiJson(req): ApiJson<CredentialsRequest>,
) -> ApiResult<Json<SessionResponse>> {
    let session = core.login(&req.email, &req.password).await?;
    Ok(Json(session.into()))
}

async fn verify_token(
    State(core): State<Arc<IdentityCore>>,
    ApiJson(req): ApiJson<VerifyTokenRequest>,
) -> ApiResult<Json<PrincipalResponse>> {
    let principal = core.verify_token(&req.token).await?;
    Ok(Json(PrincipalResponse {
        principal_id: principal.id,
        email: principal.email,
    }))
}

pub fn router(core: Arc<IdentityCore>, health: HealthService) -> Router {
    let api = Router::new()
        .route(REGISTER_PATH, post(register))
        .route(LOGIN_PATH, post(login))
        .route(VERIFY_TOKEN_PATH, post(verify_token))
        .with_state(core);

    apply_common_layers(api.merge(liveness::router(HEALTH_PATH, health)))
}
