//! Signed, time-bounded claim tokens (HS256 JWT).
//!
//! Tokens are stateless: validity is the signature plus `exp`. Validation is
//! pinned to HS256 with zero leeway, and every decode failure is reported as
//! `Unauthenticated` without further detail.

use std::time::Duration;

use chrono::Utc;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use wikno_core::error::Result;
use wikno_core::{Principal, PrincipalId, WiknoError};

/// Claims carried by every token.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Claims {
    pub principal_id: PrincipalId,
    pub email: String,
    #[serde(rename = "iat")]
    pub issued_at: i64,
    #[serde(rename = "exp")]
    pub expires_at: i64,
    /// Unique per token, so two tokens minted in the same second differ.
    pub jti: String,
}

impl Claims {
    pub fn principal(&self) -> Principal {
        Principal {
            id: self.principal_id,
            email: self.email.clone(),
        }
    }
}

/// A freshly minted token and its expiry (unix seconds).
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub expires_at: i64,
}

pub struct TokenIssuer {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    ttl: Duration,
}

impl TokenIssuer {
    pub fn new(secret: &SecretString, ttl: Duration) -> Result<Self> {
        let secret = secret.expose_secret().as_bytes();
        if secret.is_empty() {
            return Err(WiknoError::invalid("token secret is empty"));
        }

        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.validate_exp = true;
        validation.set_required_spec_claims(&["exp", "iat"]);

        Ok(Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            validation,
            ttl,
        })
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn issue(&self, principal: &Principal) -> Result<IssuedToken> {
        self.issue_at(principal, Utc::now().timestamp())
    }

    pub(crate) fn issue_at(&self, principal: &Principal, issued_at: i64) -> Result<IssuedToken> {
        let expires_at = issued_at + self.ttl.as_secs() as i64;
        let claims = Claims {
            principal_id: principal.id,
            email: principal.email.clone(),
            issued_at,
            expires_at,
            jti: Uuid::new_v4().to_string(),
        };

        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| WiknoError::internal(format!("sign token: {e}")))?;
        Ok(IssuedToken { token, expires_at })
    }

    /// Check signature, algorithm and expiry.
    pub fn verify(&self, token: &str) -> Result<Claims> {
        decode::<Claims>(token, &self.decoding, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| {
                tracing::debug!(error = %e, "Token rejected");
                WiknoError::unauthenticated("invalid or expired token")
            })
    }
}
