//! Service-account bootstrap and the service token provider.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::Mutex;

use wikno_core::error::Result;
use wikno_core::{ErrorKind, ResultExt};

use crate::service::IdentityCore;
use crate::store::CredentialStore;
use crate::token::TokenIssuer;

/// Register the service account if it does not exist yet.
pub async fn ensure_service_account(core: &IdentityCore, email: &str, password: &str) -> Result<()> {
    match core.create_principal(email, password).await {
        Ok(principal) => {
            tracing::info!(principal_id = %principal.id, email, "Service account created");
            Ok(())
        }
        Err(e) if e.kind() == ErrorKind::Conflict => {
            tracing::info!(email, "Service account already present");
            Ok(())
        }
        Err(e) => Err(e.context("bootstrap service account")),
    }
}

struct CachedToken {
    token: String,
    expires_at: i64,
}

/// Hands out the service account's token for outbound calls.
///
/// The token is minted on first use and cached until it is within
/// `refresh_margin` of expiry. The cache slot is held across the mint, so
/// concurrent callers share one mint.
pub struct ServiceTokenProvider {
    store: Arc<dyn CredentialStore>,
    tokens: Arc<TokenIssuer>,
    email: String,
    refresh_margin: Duration,
    cache: Mutex<Option<CachedToken>>,
}

impl ServiceTokenProvider {
    pub fn new(
        store: Arc<dyn CredentialStore>,
        tokens: Arc<TokenIssuer>,
        email: impl Into<String>,
        refresh_margin: Duration,
    ) -> Self {
        Self {
            store,
            tokens,
            email: email.into(),
            refresh_margin,
            cache: Mutex::new(None),
        }
    }

    pub async fn token(&self) -> Result<String> {
        let mut slot = self.cache.lock().await;
        let fresh_until = Utc::now().timestamp() + self.refresh_margin.as_secs() as i64;
        if let Some(cached) = slot.as_ref() {
            if cached.expires_at > fresh_until {
                return Ok(cached.token.clone());
            }
        }

        let record = self
            .store
            .find_by_email(&self.email)
            .await
            .context("mint service token")?;
        let issued = self.tokens.issue(&record.principal())?;
        tracing::debug!(expires_at = issued.expires_at, "Service token minted");

        *slot = Some(CachedToken {
            token: issued.token.clone(),
            expires_at: issued.expires_at,
        });
        Ok(issued.token)
    }

    /// Drop the cached token so the next call mints a new one.
    pub async fn invalidate(&self) {
        self.cache.lock().await.take();
    }
}
