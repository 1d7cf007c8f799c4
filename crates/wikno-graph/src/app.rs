//! Process wiring: store selection, identity link, router and health.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::Router;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

use wikno_core::error::Result;
use wikno_core::health::{HealthCheck, HealthService, ServingStatus};
use wikno_core::WiknoError;
use wikno_db::{Neo4jClient, Neo4jHealthCheck};
use wikno_rpc::liveness::LivenessResponse;
use wikno_rpc::{CallOptions, RpcClient};

use crate::api::{self, AppState};
use crate::config::{GraphConfig, StoreBackend};
use crate::gateway::{RemoteTokenVerifier, TokenVerifier};
use crate::service::GraphService;
use crate::store::{self, CatalogStore, MemoryCatalogStore, Neo4jCatalogStore};

/// Identity service liveness path.
pub const IDENTITY_HEALTH_PATH: &str = "/v1/identity/health";

/// Every graph call depends on the identity service, so its liveness is
/// part of ours.
pub struct IdentityHealthCheck {
    client: RpcClient,
}

impl IdentityHealthCheck {
    pub fn new(client: RpcClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl HealthCheck for IdentityHealthCheck {
    fn name(&self) -> &str {
        "identity"
    }

    async fn check(&self) -> Result<()> {
        let resp: LivenessResponse = self
            .client
            .get_json(IDENTITY_HEALTH_PATH, &CallOptions::new())
            .await?;
        match resp.status {
            ServingStatus::Serving => Ok(()),
            ServingStatus::NotServing => Err(WiknoError::unavailable("identity service not serving")),
        }
    }
}

pub struct GraphApp {
    pub service: Arc<GraphService>,
    pub health: HealthService,
    router: Router,
}

impl GraphApp {
    /// Connect the configured store and build the service.
    pub async fn build(config: &GraphConfig) -> Result<Self> {
        match config.store {
            StoreBackend::Neo4j => {
                let client = Neo4jClient::connect(&config.neo4j).await?;
                client.ensure_schema(store::neo4j::SCHEMA).await?;
                let store: Arc<dyn CatalogStore> = Arc::new(Neo4jCatalogStore::new(client.clone()));
                let checks: Vec<Arc<dyn HealthCheck>> = vec![Arc::new(Neo4jHealthCheck::new(client))];
                Self::with_store(config, store, checks)
            }
            StoreBackend::Memory => {
                tracing::warn!("Using in-memory catalog store; graph data is not persisted");
                Self::with_store(config, Arc::new(MemoryCatalogStore::new()), Vec::new())
            }
        }
    }

    /// Build the service over an existing store. The identity checks are
    /// appended to `checks`.
    pub fn with_store(
        config: &GraphConfig,
        store: Arc<dyn CatalogStore>,
        mut checks: Vec<Arc<dyn HealthCheck>>,
    ) -> Result<Self> {
        let identity = RpcClient::new(
            config.identity.url.clone(),
            Duration::from_millis(config.identity.timeout_ms),
        )?;
        checks.push(Arc::new(IdentityHealthCheck::new(identity.clone())));
        let verifier: Arc<dyn TokenVerifier> = Arc::new(RemoteTokenVerifier::new(identity));

        let service = Arc::new(GraphService::new(store));
        let health = HealthService::new(config.health.clone(), checks);
        let state = AppState {
            service: service.clone(),
            service_account_email: config.service_account_email.clone(),
        };
        let router = api::router(state, verifier, health.clone());
        tracing::info!(identity_url = %config.identity.url, "Graph service assembled");

        Ok(Self {
            service,
            health,
            router,
        })
    }

    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Serve until `shutdown` resolves; health probing runs alongside.
    pub async fn serve<F>(self, listener: TcpListener, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let cancel = CancellationToken::new();
        let probes = self.health.spawn(cancel.clone());

        let served = wikno_rpc::serve(listener, self.router, shutdown).await;

        cancel.cancel();
        if let Err(e) = probes.await {
            tracing::error!(error = %e, "Health probe task panicked");
        }
        served
    }
}
