//! Identity core: register, login and token verification.

use std::sync::Arc;

use wikno_core::error::Result;
use wikno_core::{ErrorKind, Principal, PrincipalId, ResultExt};

use crate::graph_link::UserProvisioner;
use crate::password::PasswordHasher;
use crate::store::{CredentialRecord, CredentialStore};
use crate::token::TokenIssuer;
use crate::validate;

/// A principal together with a freshly issued token.
#[derive(Debug, Clone)]
pub struct Session {
    pub principal: Principal,
    pub token: String,
    pub expires_at: i64,
}

pub struct IdentityCore {
    store: Arc<dyn CredentialStore>,
    hasher: PasswordHasher,
    tokens: Arc<TokenIssuer>,
    provisioner: Option<Arc<dyn UserProvisioner>>,
}

impl IdentityCore {
    pub fn new(
        store: Arc<dyn CredentialStore>,
        hasher: PasswordHasher,
        tokens: Arc<TokenIssuer>,
    ) -> Self {
        Self {
            store,
            hasher,
            tokens,
            provisioner: None,
        }
    }

    /// Provision a graph tenant after every human registration.
    pub fn with_provisioner(mut self, provisioner: Arc<dyn UserProvisioner>) -> Self {
        self.provisioner = Some(provisioner);
        self
    }

    pub fn store(&self) -> &Arc<dyn CredentialStore> {
        &self.store
    }

    pub fn tokens(&self) -> &Arc<TokenIssuer> {
        &self.tokens
    }

    /// Store a new principal without issuing a token or provisioning.
    pub async fn create_principal(&self, email: &str, password: &str) -> Result<Principal> {
        let email = validate::normalize_email(email)?;
        validate::password(password)?;

        let record = CredentialRecord {
            id: PrincipalId::new(),
            email,
            password_hash: self.hasher.hash(password).await?,
        };
        self.store.create(&record).await?;
        Ok(record.principal())
    }

    /// `Conflict` when the email is taken.
    pub async fn register(&self, email: &str, password: &str) -> Result<Session> {
        let principal = self.create_principal(email, password).await.context("register")?;
        tracing::info!(principal_id = %principal.id, "Principal registered");

        // Best effort: the principal is already committed.
        if let Some(provisioner) = &self.provisioner {
            if let Err(e) = provisioner.provision(principal.tenant_id()).await {
                tracing::error!(
                    principal_id = %principal.id,
                    error = %e,
                    "Graph tenant provisioning failed"
                );
            }
        }

        self.session(principal)
    }

    /// `NotFound` for an unknown email, `Unauthenticated` for a wrong password.
    pub async fn login(&self, email: &str, password: &str) -> Result<Session> {
        let email = validate::normalize_email(email)?;
        let record = self.store.find_by_email(&email).await.context("login")?;
        self.hasher
            .verify(password, &record.password_hash)
            .await
            .context("login")?;

        tracing::info!(principal_id = %record.id, "Principal logged in");
        self.session(record.principal())
    }

    /// Resolve a token to its principal.
    ///
    /// A token whose principal no longer exists is `Unauthenticated`, never
    /// `NotFound`.
    pub async fn verify_token(&self, token: &str) -> Result<Principal> {
        let claims = self.tokens.verify(token)?;
        let record = self
            .store
            .find_by_id(claims.principal_id)
            .await
            .map_err(|e| e.remap(ErrorKind::NotFound, ErrorKind::Unauthenticated))
            .context("verify token")?;
        Ok(record.principal())
    }

    fn session(&self, principal: Principal) -> Result<Session> {
        let issued = self.tokens.issue(&principal)?;
        Ok(Session {
            principal,
            token: issued.token,
            expires_at: issued.expires_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use async_trait::async_trait;
    use parking_lot::Mutex;
    use secrecy::SecretString;
    use wikno_core::{TenantId, WiknoError};

    use crate::store::MemoryCredentialStore;

    fn core_with(store: Arc<MemoryCredentialStore>) -> IdentityCore {
        let tokens =
            TokenIssuer::new(&SecretString::from("core-test"), Duration::from_secs(3600)).unwrap();
        IdentityCore::new(store, PasswordHasher::new(4), Arc::new(tokens))
    }

    #[derive(Default)]
    struct RecordingProvisioner {
        seen: Mutex<Vec<TenantId>>,
        fail: bool,
    }

    #[async_trait]
    impl UserProvisioner for RecordingProvisioner {
        async fn provision(&self, tenant_id: TenantId) -> Result<()> {
            self.seen.lock().push(tenant_id);
            if self.fail {
                Err(WiknoError::unavailable("graph down"))
            } else {
                Ok(())
            }
        }
    }

    #[tokio::test]
    async fn test_register_twice_conflicts() {
        let core = core_with(Arc::new(MemoryCredentialStore::new()));
        let first = core.register("a@x.com", "pw123456").await.unwrap();

        let err = core.register("a@x.com", "other-pass").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Conflict);

        let again = core.login("a@x.com", "pw123456").await.unwrap();
        assert_eq!(again.principal, first.principal);
    }

    #[tokio::test]
    async fn test_login_failure_kinds() {
        let core = core_with(Arc::new(MemoryCredentialStore::new()));
        core.register("a@x.com", "pw123456").await.unwrap();

        let wrong = core.login("a@x.com", "wrong-pass").await.unwrap_err();
        assert_eq!(wrong.kind(), ErrorKind::Unauthenticated);

        let unknown = core.login("nobody@x.com", "pw123456").await.unwrap_err();
        assert_eq!(unknown.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_every_session_gets_a_new_token() {
        let core = core_with(Arc::new(MemoryCredentialStore::new()));
        let registered = core.register("a@x.com", "pw123456").await.unwrap();
        let first = core.login("a@x.com", "pw123456").await.unwrap();
        let second = core.login("A@X.com", "pw123456").await.unwrap();

        assert_ne!(registered.token, first.token);
        assert_ne!(first.token, second.token);
        assert_eq!(
            core.verify_token(&second.token).await.unwrap(),
            registered.principal
        );
    }

    #[tokio::test]
    async fn test_invalid_input_rejected() {
        let core = core_with(Arc::new(MemoryCredentialStore::new()));
        let err = core.register("not-an-email", "pw123456").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidRequest);
        let err = core.register("a@x.com", "short").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidRequest);
    }

    #[tokio::test]
    async fn test_shared_bcrypt_prefix_is_not_a_credential() {
        let core = core_with(Arc::new(MemoryCredentialStore::new()));
        let prefix = "\u{1D49C}".repeat(18);

        let err = core
            .register("long@x.com", &format!("{prefix}aaaaaaaa"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidRequest);

        core.register("a@x.com", &prefix).await.unwrap();
        let err = core
            .login("a@x.com", &format!("{prefix}bbbbbbbb"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Unauthenticated);
        core.login("a@x.com", &prefix).await.unwrap();
    }

    #[tokio::test]
    async fn test_token_for_deleted_principal_is_unauthenticated() {
        let store = Arc::new(MemoryCredentialStore::new());
        let core = core_with(store.clone());
        let session = core.register("gone@x.com", "pw123456").await.unwrap();

        assert!(store.remove(session.principal.id));
        let err = core.verify_token(&session.token).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Unauthenticated);
    }

    #[tokio::test]
    async fn test_expired_token_is_unauthenticated() {
        let core = core_with(Arc::new(MemoryCredentialStore::new()));
        let session = core.register("a@x.com", "pw123456").await.unwrap();
        assert!(core.verify_token(&session.token).await.is_ok());

        let stale = core
            .tokens()
            .issue_at(&session.principal, chrono::Utc::now().timestamp() - 7200)
            .unwrap();
        let err = core.verify_token(&stale.token).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Unauthenticated);
    }

    #[tokio::test]
    async fn test_register_provisions_tenant() {
        let provisioner = Arc::new(RecordingProvisioner::default());
        let core = core_with(Arc::new(MemoryCredentialStore::new()))
            .with_provisioner(provisioner.clone());

        let session = core.register("a@x.com", "pw123456").await.unwrap();
        assert_eq!(*provisioner.seen.lock(), vec![session.principal.tenant_id()]);
    }

    #[tokio::test]
    async fn test_provisioning_failure_does_not_fail_register() {
        let provisioner = Arc::new(RecordingProvisioner {
            fail: true,
            ..Default::default()
        });
        let core = core_with(Arc::new(MemoryCredentialStore::new()))
            .with_provisioner(provisioner.clone());

        let session = core.register("a@x.com", "pw123456").await.unwrap();
        assert!(core.verify_token(&session.token).await.is_ok());
        assert_eq!(provisioner.seen.lock().len(), 1);
    }

    #[tokio::test]
    async fn test_create_principal_skips_provisioning() {
        let provisioner = Arc::new(RecordingProvisioner::default());
        let core = core_with(Arc::new(MemoryCredentialStore::new()))
            .with_provisioner(provisioner.clone());

        core.create_principal("svc@x.com", "service-pass").await.unwrap();
        assert!(provisioner.seen.lock().is_empty());
    }
}
