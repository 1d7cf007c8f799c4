//! Process wiring: store selection, bootstrap, router and health.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use secrecy::ExposeSecret;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

use wikno_core::error::Result;
use wikno_core::health::{HealthCheck, HealthService};
use wikno_db::{Neo4jClient, Neo4jHealthCheck};
use wikno_rpc::RpcClient;

use crate::api;
use crate::bootstrap::{ensure_service_account, ServiceTokenProvider};
use crate::config::{IdentityConfig, StoreBackend};
use crate::graph_link::GraphUserProvisioner;
use crate::password::PasswordHasher;
use crate::service::IdentityCore;
use crate::store::{self, CredentialStore, MemoryCredentialStore, Neo4jCredentialStore};
use crate::token::TokenIssuer;

pub struct IdentityApp {
    pub core: Arc<IdentityCore>,
    pub health: HealthService,
    router: Router,
}

impl IdentityApp {
    /// Connect the configured store and build the service.
    pub async fn build(config: &IdentityConfig) -> Result<Self> {
        match config.store {
            StoreBackend::Neo4j => {
                let client = Neo4jClient::connect(&config.neo4j).await?;
                client.ensure_schema(store::neo4j::SCHEMA).await?;
                let store: Arc<dyn CredentialStore> =
                    Arc::new(Neo4jCredentialStore::new(client.clone()));
                let checks: Vec<Arc<dyn HealthCheck>> =
                    vec![Arc::new(Neo4jHealthCheck::new(client))];
                Self::with_store(config, store, checks).await
            }
            StoreBackend::Memory => {
                tracing::warn!("Using in-memory credential store; principals are not persisted");
                Self::with_store(config, Arc::new(MemoryCredentialStore::new()), Vec::new()).await
            }
        }
    }

    /// Build the service over an existing store.
    pub async fn with_store(
        config: &IdentityConfig,
        store: Arc<dyn CredentialStore>,
        checks: Vec<Arc<dyn HealthCheck>>,
    ) -> Result<Self> {
        let tokens = Arc::new(TokenIssuer::new(
            &config.token.secret,
            Duration::from_secs(config.token.ttl_secs),
        )?);
        let hasher = PasswordHasher::new(config.token.bcrypt_cost);
        let mut core = IdentityCore::new(store.clone(), hasher, tokens.clone());

        let account = &config.service_account;
        ensure_service_account(&core, &account.email, account.password.expose_secret()).await?;

        if let Some(url) = &config.graph.url {
            let provider = Arc::new(ServiceTokenProvider::new(
                store,
                tokens,
                account.email.clone(),
                Duration::from_secs(account.refresh_margin_secs),
            ));
            let client = RpcClient::new(url.clone(), Duration::from_millis(config.graph.timeout_ms))?;
            core = core.with_provisioner(Arc::new(GraphUserProvisioner::new(client, provider)));
            tracing::info!(graph_url = %url, "Graph tenant provisioning enabled");
        }

        let core = Arc::new(core);
        let health = HealthService::new(config.health.clone(), checks);
        let router = api::router(core.clone(), health.clone());
        Ok(Self {
            core,
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
