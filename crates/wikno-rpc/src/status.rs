//! Error kind to wire status mapping.
//!
//! Callers only ever see a generic message per kind. The full error chain is
//! logged here, once, when the response is built.

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{FromRequest, FromRequestParts, Request};
use axum::http::request::Parts;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use wikno_core::{ErrorKind, WiknoError};

/// Handler error. Wraps the service error so it can become a response.
#[derive(Debug)]
pub struct ApiError(pub WiknoError);

pub type ApiResult<T> = Result<T, ApiError>;

impl From<WiknoError> for ApiError {
    fn from(e: WiknoError) -> Self {
        Self(e)
    }
}

/// JSON error body.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
    pub kind: ErrorKind,
    pub status: u16,
}

pub fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::InvalidRequest => StatusCode::BAD_REQUEST,
        ErrorKind::Unauthenticated => StatusCode::UNAUTHORIZED,
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::Conflict => StatusCode::CONFLICT,
        ErrorKind::Unavailable => StatusCode::SERVICE_UNAVAILABLE,
        ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// Reverse mapping used by clients when the body carries no kind.
pub fn kind_from_status(status: StatusCode) -> ErrorKind {
    match status {
        StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => ErrorKind::InvalidRequest,
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => ErrorKind::Unauthenticated,
        StatusCode::NOT_FOUND => ErrorKind::NotFound,
        StatusCode::CONFLICT => ErrorKind::Conflict,
        StatusCode::SERVICE_UNAVAILABLE
        | StatusCode::BAD_GATEWAY
        | StatusCode::GATEWAY_TIMEOUT
        | StatusCode::TOO_MANY_REQUESTS => ErrorKind::Unavailable,
        _ => ErrorKind::Internal,
    }
}

pub fn public_message(kind: ErrorKind) -> &'static str {
    match kind {
        ErrorKind::InvalidRequest => "request is invalid",
        ErrorKind::NotFound => "resource not found",
        ErrorKind::Conflict => "resource already exists",
        ErrorKind::Unauthenticated => "authentication failed",
        ErrorKind::Unavailable => "service temporarily unavailable",
        ErrorKind::Internal => "internal error",
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let kind = self.0.kind();
        let status = status_for(kind);

        match kind {
            ErrorKind::Internal | ErrorKind::Unavailable => {
                tracing::error!(kind = %kind, error = %self.0, "Request failed");
            }
            _ => {
                tracing::warn!(kind = %kind, error = %self.0, "Request rejected");
            }
        }

        let body = ErrorBody {
            error: public_message(kind).to_string(),
            kind,
            status: status.as_u16(),
        };
        (status, Json(body)).into_response()
    }
}

// ── Extractors ───────────────────────────────────────────────────

/// `Json` whose rejection is an `InvalidRequest` error body.
#[derive(Debug, Clone, Copy, Default)]
pub struct ApiJson<T>(pub T);

impl<S, T> FromRequest<S> for ApiJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(Self(value)),
            Err(rejection) => Err(json_rejection(rejection)),
        }
    }
}

fn json_rejection(rejection: JsonRejection) -> ApiError {
    ApiError(WiknoError::invalid(format!("body: {}", rejection.body_text())))
}

/// `Query` whose rejection is an `InvalidRequest` error body.
#[derive(Debug, Clone, Copy, Default)]
pub struct ApiQuery<T>(pub T);

impl<S, T> FromRequestParts<S> for ApiQuery<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        match axum::extract::Query::<T>::from_request_parts(parts, state).await {
            Ok(axum::extract::Query(value)) => Ok(Self(value)),
            Err(rejection) => Err(query_rejection(rejection)),
        }
    }
}

fn query_rejection(rejection: QueryRejection) -> ApiError {
    ApiError(WiknoError::invalid(format!("query: {}", rejection.body_text())))
}
