//! Authorization gateway: turns the bearer token into a verified principal
//! before any graph handler runs.
//!
//! Verification is delegated to a [`TokenVerifier`]. The production verifier
//! calls the identity service on every request, so an unreachable identity
//! service surfaces as `Unavailable`, never as `Unauthenticated`.

use std::sync::Arc;

use async_trait::async_trait;
use axum::extract::{FromRequestParts, Request, State};
use axum::http::request::Parts;
use axum::http::HeaderMap;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};

use wikno_core::error::Result;
use wikno_core::{ErrorKind, Principal, PrincipalId, WiknoError};
use wikno_rpc::{ApiError, CallOptions, RpcClient, AUTHORIZATION_HEADER};

/// Identity service path that resolves a token to its principal.
pub const VERIFY_TOKEN_PATH: &str = "/v1/identity/verify-token";

#[async_trait]
pub trait TokenVerifier: Send + Sync {
    async fn verify(&self, token: &str) -> Result<Principal>;
}

#[derive(Serialize)]
struct VerifyTokenRequest<'a> {
    token: &'a str,
}

#[derive(Deserialize)]
struct PrincipalResponse {
    principal_id: PrincipalId,
    email: String,
}

/// Verifies tokens by calling the identity service.
pub struct RemoteTokenVerifier {
    client: RpcClient,
}

impl RemoteTokenVerifier {
    pub fn new(client: RpcClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl TokenVerifier for RemoteTokenVerifier {
    async fn verify(&self, token: &str) -> Result<Principal> {
        let resp: PrincipalResponse = self
            .client
            .post_json(VERIFY_TOKEN_PATH, &VerifyTokenRequest { token }, &CallOptions::new())
            .await
            .map_err(|e| match e.kind() {
                ErrorKind::Unauthenticated | ErrorKind::Unavailable => e.context("verify token"),
                // Outside the verify contract.
                _ => WiknoError::internal(format!("identity verify-token: {e}")),
            })?;
        Ok(Principal {
            id: resp.principal_id,
            email: resp.email,
        })
    }
}

/// The verified caller, inserted by [`authorize`].
#[derive(Debug, Clone)]
pub struct Caller(pub Principal);

impl<S> FromRequestParts<S> for Caller
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> std::result::Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Principal>()
            .cloned()
            .map(Caller)
            .ok_or_else(|| ApiError(WiknoError::internal("caller not set: authorization layer missing")))
    }
}

/// Read the token from `authorization`. Accepts `Bearer <token>` or a bare
/// token.
pub fn extract_bearer_token(headers: &HeaderMap) -> Option<&str> {
    let raw = headers.get(AUTHORIZATION_HEADER)?.to_str().ok()?.trim();
    let token = match raw.split_once(' ') {
        Some((scheme, rest)) if scheme.eq_ignore_ascii_case("bearer") => rest.trim(),
        None if raw.eq_ignore_ascii_case("bearer") => "",
        _ => raw,
    };
    (!token.is_empty()).then_some(token)
}

pub async fn authorize(
    State(verifier): State<Arc<dyn TokenVerifier>>,
    mut request: Request,
    next: Next,
) -> Response {
    let Some(token) = extract_bearer_token(request.headers()) else {
        return ApiError(WiknoError::unauthenticated("missing bearer token")).into_response();
    };

    let principal = match verifier.verify(token).await {
        Ok(principal) => principal,
        Err(err) => return ApiError(err).into_response(),
    };

    tracing::debug!(principal_id = %principal.id, "Caller authorized");
    request.extensions_mut().insert(principal);
    next.run(request).await
}
