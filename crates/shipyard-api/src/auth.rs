//! Bearer-token authentication and tenant scoping.
//!
//! Every control-plane request carries an `Authorization: Bearer` token
//! (HS256, shared secret). The token's `ns` claim pins the tenant
//! namespace server-side: a tenant can only ever act inside its own
//! namespace, whatever the request says. Operators with the
//! `platform_admin` role may address any namespace explicitly.

use axum::http::HeaderMap;
use axum::http::header::AUTHORIZATION;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use shipyard_state::epoch_secs;

/// Role allowed to address namespaces other than its own.
pub const ROLE_PLATFORM_ADMIN: &str = "platform_admin";

/// Token claims. `ns` is the tenant namespace the subject belongs to.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub ns: String,
    pub role: String,
    pub iat: u64,
    pub exp: u64,
}

impl Claims {
    /// The namespace this request operates in.
    ///
    /// A requested namespace is honored only for `platform_admin`;
    /// everyone else is confined to the namespace in their token.
    pub fn resolve_namespace<'a>(&'a self, requested: Option<&'a str>) -> &'a str {
        match requested {
            Some(ns) if self.role == ROLE_PLATFORM_ADMIN => ns,
            _ => &self.ns,
        }
    }
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("missing or malformed authorization header")]
    MissingToken,

    #[error("invalid token: {0}")]
    InvalidToken(#[from] jsonwebtoken::errors::Error),
}

/// Validates bearer tokens against the daemon's shared secret.
#[derive(Clone)]
pub struct TokenVerifier {
    decoding: DecodingKey,
    validation: Validation,
}

impl TokenVerifier {
    pub fn new(secret: &str) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_required_spec_claims(&["exp"]);
        Self {
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            validation,
        }
    }

    /// Decode and validate a raw token string.
    pub fn verify(&self, token: &str) -> Result<Claims, AuthError> {
        let data = decode::<Claims>(token, &self.decoding, &self.validation)?;
        Ok(data.claims)
    }

    /// Pull the bearer token out of the request headers and verify it.
    pub fn authorize(&self, headers: &HeaderMap) -> Result<Claims, AuthError> {
        let token = headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .ok_or(AuthError::MissingToken)?;
        self.verify(token)
    }
}

/// Mint a token for a subject. Used by the daemon's `token` command to
/// issue operator and tenant credentials.
pub fn issue_token(
    secret: &str,
    sub: &str,
    ns: &str,
    role: &str,
    ttl_secs: u64,
) -> Result<String, jsonwebtoken::errors::Error> {
    let now = epoch_secs();
    let claims = Claims {
        sub: sub.to_string(),
        ns: ns.to_string(),
        role: role.to_string(),
        iat: now,
        exp: now + ttl_secs,
    };
    encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
}
