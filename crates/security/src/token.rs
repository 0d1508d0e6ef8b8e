//! HS256 JSON Web Tokens for the gateway.
//!
//! Claims carry the user id, email, role names and an expiry (unix seconds).

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use prodops_core::{AuthError, UserIdentity};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenClaims {
    pub user_id: i64,
    pub email: String,
    pub roles: Vec<String>,
    /// Expiry, seconds since the epoch.
    pub exp: i64,
}

impl From<TokenClaims> for UserIdentity {
    fn from(claims: TokenClaims) -> Self {
        UserIdentity {
            user_id: claims.user_id,
            email: claims.email,
            roles: claims.roles,
        }
    }
}

/// Issues and verifies bearer tokens with a shared secret.
pub struct TokenSigner {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
}

impl std::fmt::Debug for TokenSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenSigner")
            .field("secret", &"[REDACTED]")
            .field("ttl", &self.ttl)
            .finish()
    }
}

impl TokenSigner {
    pub fn new(secret: impl AsRef<[u8]>, ttl: Duration) -> Self {
        let secret = secret.as_ref();
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            ttl,
        }
    }

    fn validation() -> Validation {
        let mut validation = Validation::new(Algorithm::HS256);
        // Expiry is checked against the caller's clock in `verify_at`
        validation.validate_exp = false;
        validation.required_spec_claims.clear();
        validation
    }

    pub fn issue(&self, identity: &UserIdentity) -> Result<String, AuthError> {
        self.issue_at(identity, Utc::now())
    }

    pub fn issue_at(&self, identity: &UserIdentity, now: DateTime<Utc>) -> Result<String, AuthError> {
        let claims = TokenClaims {
            user_id: identity.user_id,
            email: identity.email.clone(),
            roles: identity.roles.clone(),
            exp: (now + self.ttl).timestamp(),
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| AuthError::InvalidToken(e.to_string()))
    }

    pub fn verify(&self, token: &str) -> Result<TokenClaims, AuthError> {
        self.verify_at(token, Utc::now())
    }

    pub fn verify_at(&self, token: &str, now: DateTime<Utc>) -> Result<TokenClaims, AuthError> {
        let claims = decode::<TokenClaims>(token.trim(), &self.decoding, &Self::validation())
            .map_err(|e| AuthError::InvalidToken(e.to_string()))?
            .claims;

        if claims.exp <= now.timestamp() {
            return Err(AuthError::Expired);
        }
        Ok(claims)
    }
}
