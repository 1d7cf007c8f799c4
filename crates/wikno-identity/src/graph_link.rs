//! Graph-side tenant provisioning over the graph service's CreateUser call.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;

use wikno_core::error::Result;
use wikno_core::{ErrorKind, ResultExt, TenantId};
use wikno_rpc::{CallOptions, RpcClient};

use crate::bootstrap::ServiceTokenProvider;

pub const CREATE_USER_PATH: &str = "/v1/graph/users";

/// Creates the graph-side user record for a newly registered principal.
#[async_trait]
pub trait UserProvisioner: Send + Sync {
    async fn provision(&self, tenant_id: TenantId) -> Result<()>;
}

#[derive(Serialize)]
struct CreateUserRequest {
    tenant_id: TenantId,
}

pub struct GraphUserProvisioner {
    client: RpcClient,
    tokens: Arc<ServiceTokenProvider>,
}

impl GraphUserProvisioner {
    pub fn new(client: RpcClient, tokens: Arc<ServiceTokenProvider>) -> Self {
        Self { client, tokens }
    }

    async fn create_user(&self, tenant_id: TenantId) -> Result<()> {
        let token = self.tokens.token().await?;
        self.client
            .post_unit(
                CREATE_USER_PATH,
                &CreateUserRequest { tenant_id },
                &CallOptions::new().bearer(token),
            )
            .await
    }
}

#[async_trait]
impl UserProvisioner for GraphUserProvisioner {
    async fn provision(&self, tenant_id: TenantId) -> Result<()> {
        let mut outcome = self.create_user(tenant_id).await;

        if matches!(&outcome, Err(e) if e.kind() == ErrorKind::Unauthenticated) {
            tracing::warn!(tenant_id = %tenant_id, "Service token rejected, re-minting");
            self.tokens.invalidate().await;
            outcome = self.create_user(tenant_id).await;
        }

        match outcome {
            Ok(()) => {
                tracing::info!(tenant_id = %tenant_id, "Graph tenant provisioned");
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::Conflict => {
                tracing::info!(tenant_id = %tenant_id, "Graph tenant already provisioned");
                Ok(())
            }
            Err(e) => Err(e).with_context(|| format!("provision graph tenant {tenant_id}")),
        }
    }
}
