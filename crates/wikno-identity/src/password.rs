//! Salted password hashing (bcrypt) on the blocking pool.

use wikno_core::error::Result;
use wikno_core::WiknoError;

use crate::validate::MAX_PASSWORD_BYTES;

#[derive(Debug, Clone, Copy)]
pub struct PasswordHasher {
    cost: u32,
}

impl PasswordHasher {
    pub fn new(cost: u32) -> Self {
        Self { cost }
    }

    /// Refuses input bcrypt would silently truncate.
    pub async fn hash(&self, password: &str) -> Result<String> {
        if password.len() > MAX_PASSWORD_BYTES {
            return Err(WiknoError::invalid(format!(
                "password must be at most {MAX_PASSWORD_BYTES} bytes"
            )));
        }
        let password = password.to_owned();
        let cost = self.cost;
        tokio::task::spawn_blocking(move || bcrypt::hash(password, cost))
            .await
            .map_err(|e| WiknoError::internal(format!("hash task: {e}")))?
            .map_err(|e| WiknoError::internal(format!("bcrypt: {e}")))
    }

    /// `Unauthenticated` when the password does not match.
    pub async fn verify(&self, password: &str, hash: &str) -> Result<()> {
        // No stored hash covers more than the bcrypt input limit.
        if password.len() > MAX_PASSWORD_BYTES {
            return Err(WiknoError::unauthenticated("invalid credentials"));
        }
        let password = password.to_owned();
        let hash = hash.to_owned();
        let matched = tokio::task::spawn_blocking(move || bcrypt::verify(password, &hash))
            .await
            .map_err(|e| WiknoError::internal(format!("verify task: {e}")))?
            .map_err(|e| WiknoError::internal(format!("bcrypt: {e}")))?;

        if matched {
            Ok(())
        } else {
            Err(WiknoError::unauthenticated("invalid credentials"))
        }
    }
}
