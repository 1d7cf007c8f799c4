//! Outbound JSON calls to a sibling Wikno service.

use std::time::Duration;

use reqwest::{Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::Serialize;

use wikno_core::error::Result;
use wikno_core::WiknoError;

use crate::layers::current_request_id;
use crate::status::{kind_from_status, ErrorBody};
use crate::{AUTHORIZATION_HEADER, REQUEST_ID_HEADER};

/// Per-call metadata.
#[derive(Debug, Clone, Default)]
pub struct CallOptions {
    bearer: Option<String>,
    request_id: Option<String>,
}

impl CallOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bearer(mut self, token: impl Into<String>) -> Self {
        self.bearer = Some(token.into());
        self
    }

    /// Override the request id. Defaults to the id of the call being handled.
    pub fn request_id(mut self, id: impl Into<String>) -> Self {
        self.request_id = Some(id.into());
        self
    }
}

/// JSON client for one base URL. Clone is cheap (inner Arc).
#[derive(Clone, Debug)]
pub struct RpcClient {
    http: reqwest::Client,
    base_url: String,
}

impl RpcClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout)
            .build()
            .map_err(|e| WiknoError::internal(format!("http client: {e}")))?;

        let base_url = base_url.into().trim_end_matches('/').to_string();
        Ok(Self { http, base_url })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub async fn post_json<Req, Resp>(&self, path: &str, body: &Req, opts: &CallOptions) -> Result<Resp>
    where
        Req: Serialize + ?Sized,
        Resp: DeserializeOwned,
    {
        let req = self.request(Method::POST, path, opts).json(body);
        decode(path, send(path, req).await?).await
    }

    pub async fn get_json<Resp>(&self, path: &str, opts: &CallOptions) -> Result<Resp>
    where
        Resp: DeserializeOwned,
    {
        let req = self.request(Method::GET, path, opts);
        decode(path, send(path, req).await?).await
    }

    /// POST and ignore the response body.
    pub async fn post_unit<Req>(&self, path: &str, body: &Req, opts: &CallOptions) -> Result<()>
    where
        Req: Serialize + ?Sized,
    {
        let req = self.request(Method::POST, path, opts).json(body);
        send(path, req).await.map(|_| ())
    }

    fn request(&self, method: Method, path: &str, opts: &CallOptions) -> RequestBuilder {
        let mut req = self.http.request(method, format!("{}{}", self.base_url, path));
        if let Some(token) = &opts.bearer {
            req = req.header(AUTHORIZATION_HEADER, format!("Bearer {token}"));
        }
        if let Some(id) = opts.request_id.clone().or_else(current_request_id) {
            req = req.header(REQUEST_ID_HEADER, id);
        }
        req
    }
}

/// Send and turn any non-success status into its error kind.
async fn send(path: &str, req: RequestBuilder) -> Result<Response> {
    let resp = req.send().await.map_err(|e| transport_error(path, e))?;
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }

    let text = resp.text().await.unwrap_or_default();
    let (kind, detail) = match serde_json::from_str::<ErrorBody>(&text) {
        Ok(body) => (body.kind, body.error),
        Err(_) => (kind_from_status(status), text),
    };
    Err(WiknoError::from_kind(
        kind,
        format!("{path} returned {status}: {detail}"),
    ))
}

async fn decode<Resp: DeserializeOwned>(path: &str, resp: Response) -> Result<Resp> {
    resp.json::<Resp>()
        .await
        .map_err(|e| WiknoError::internal(format!("{path}: undecodable response: {e}")))
}

fn transport_error(path: &str, e: reqwest::Error) -> WiknoError {
    if e.is_builder() {
        WiknoError::internal(format!("{path}: {e}"))
    } else {
        WiknoError::unavailable(format!("{path}: {e}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wikno_core::ErrorKind;

    #[tokio::test]
    async fn test_unreachable_peer_is_unavailable() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let client = RpcClient::new(format!("http://{addr}/"), Duration::from_millis(500)).unwrap();
        assert_eq!(client.base_url(), format!("http://{addr}"));

        let err = client
            .get_json::<serde_json::Value>("/v1/identity/health", &CallOptions::new())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Unavailable);
    }
}
