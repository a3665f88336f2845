//! Signed identity tokens (HS256 JWT).
//!
//! A token carries an [`IdentityClaims`] plus `iat`/`exp` in unix seconds.
//! Verification has a single failure outcome, [`InvalidToken`]; the concrete
//! reason (bad signature, malformed payload, expiry) is only logged.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::IdentityClaims;

/// Verification failed. Deliberately carries no detail.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("invalid token")]
pub struct InvalidToken;

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("token signing failed: {0}")]
    Signing(String),
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
enum TokenValidationError {
    #[error("token has expired")]
    Expired,

    #[error("invalid token time window (exp <= iat)")]
    InvalidTimeWindow,

    #[error("token could not be decoded: {0}")]
    Malformed(String),
}

#[derive(Debug, Serialize, Deserialize)]
struct SignedClaims {
    #[serde(flatten)]
    identity: IdentityClaims,
    iat: i64,
    exp: i64,
}

/// Issues and verifies tokens with one process-wide secret.
///
/// Replacing the secret invalidates every token issued under the old one.
#[derive(Clone)]
pub struct TokenCodec {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    ttl: Duration,
}

impl core::fmt::Debug for TokenCodec {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("TokenCodec")
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}

impl TokenCodec {
    pub fn new(secret: &[u8], ttl: Duration) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        // Expiry is checked against the caller's clock in `verify_at`.
        validation.validate_exp = false;
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp"]);

        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            validation,
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn issue(&self, claims: &IdentityClaims) -> Result<String, TokenError> {
        self.issue_at(claims, Utc::now())
    }

    /// Sign `claims` as issued at `now`, expiring at `now + ttl` (second precision).
    pub fn issue_at(&self, claims: &IdentityClaims, now: DateTime<Utc>) -> Result<String, TokenError> {
        let iat = now.timestamp();
        let signed = SignedClaims {
            identity: claims.clone(),
            iat,
            exp: iat + self.ttl.num_seconds(),
        };

        jsonwebtoken::encode(&Header::new(Algorithm::HS256), &signed, &self.encoding)
            .map_err(|e| TokenError::Signing(e.to_string()))
    }

    pub fn verify(&self, token: &str) -> Result<IdentityClaims, InvalidToken> {
        self.verify_at(token, Utc::now())
    }

    pub fn verify_at(&self, token: &str, now: DateTime<Utc>) -> Result<IdentityClaims, InvalidToken> {
        self.decode(token, now).map_err(|reason| {
            tracing::debug!(%reason, "token rejected");
            InvalidToken
        })
    }

    fn decode(&self, token: &str, now: DateTime<Utc>) -> Result<IdentityClaims, TokenValidationError> {
        let data = jsonwebtoken::decode::<SignedClaims>(token, &self.decoding, &self.validation)
            .map_err(|e| TokenValidationError::Malformed(e.to_string()))?;

        validate_window(data.claims.iat, data.claims.exp, now)?;
        Ok(data.claims.identity)
    }
}

fn validate_window(iat: i64, exp: i64, now: DateTime<Utc>) -> Result<(), TokenValidationError> {
    if exp <= iat {
        return Err(TokenValidationError::InvalidTimeWindow);
    }
    if now.timestamp() >= exp {
        return Err(TokenValidationError::Expired);
    }
    Ok(())
}
