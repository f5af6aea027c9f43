//! Identity & Authentication Module
//!
//! Port over the external identity provider that mints user tokens. The
//! HTTP layer depends only on the `IdentityProvider` trait plus the
//! `AuthedUser` extractor; the concrete provider is injected at process
//! start.
//!
//! `StaticTokenIdentity` is the in-process implementation: a fixed
//! `token -> user_id` table bootstrapped from `AUTH_TOKENS`
//! (`token=user` pairs, comma-separated). A malformed table is a fatal
//! initialization error.

use anyhow::{Result, bail};
use async_trait::async_trait;
use axum::Json;
use axum::extract::FromRequestParts;
use axum::http::StatusCode;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("missing or invalid bearer token")]
    InvalidToken,

    #[error("identity provider unavailable: {0}")]
    Unavailable(String),
}

/// Verifies bearer tokens into user ids.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn verify(&self, bearer_token: &str) -> Result<String, AuthError>;
}

/// Fixed token table, resolved once at boot.
pub struct StaticTokenIdentity {
    tokens: HashMap<String, String>,
}

impl StaticTokenIdentity {
    /// Parses `AUTH_TOKENS` (`token=user,token=user`). Empty means no
    /// user can authenticate, which is valid for replica-only nodes.
    pub fn from_env() -> Result<Self> {
        Self::from_spec(&std::env::var("AUTH_TOKENS").unwrap_or_default())
    }

    pub fn from_spec(spec: &str) -> Result<Self> {
        let mut tokens = HashMap::new();
        for pair in spec.split(',').map(str::trim).filter(|p| !p.is_empty()) {
            let Some((token, user)) = pair.split_once('=') else {
                bail!("malformed AUTH_TOKENS entry {:?}, expected token=user", pair);
            };
            let (token, user) = (token.trim(), user.trim());
            if token.is_empty() || user.is_empty() {
                bail!("malformed AUTH_TOKENS entry {:?}, expected token=user", pair);
            }
            if tokens.insert(token.to_string(), user.to_string()).is_some() {
                bail!("duplicate token in AUTH_TOKENS");
            }
        }
        Ok(Self { tokens })
    }
}

#[async_trait]
impl IdentityProvider for StaticTokenIdentity {
    async fn verify(&self, bearer_token: &str) -> Result<String, AuthError> {
        self.tokens
            .get(bearer_token)
            .cloned()
            .ok_or(AuthError::InvalidToken)
    }
}

/// Extractor for authenticated requests: resolves the `Authorization:
/// Bearer` header through the injected `IdentityProvider` and yields the
/// user id. Missing or unverifiable tokens reject with 401.
pub struct AuthedUser(pub String);

#[async_trait]
impl<S> FromRequestParts<S> for AuthedUser
where
    S: Send + Sync,
{
    type Rejection = AuthRejection;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let identity = parts
            .extensions
            .get::<Arc<dyn IdentityProvider>>()
            .ok_or(AuthRejection::ProviderMissing)?
            .clone();

        let header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .ok_or(AuthRejection::Unauthorized)?;

        let token = header.strip_prefix("Bearer ").unwrap_or(header);

        match identity.verify(token).await {
            Ok(user_id) => Ok(AuthedUser(user_id)),
            Err(AuthError::InvalidToken) => Err(AuthRejection::Unauthorized),
            Err(AuthError::Unavailable(reason)) => Err(AuthRejection::Upstream(reason)),
        }
    }
}

#[derive(Debug)]
pub enum AuthRejection {
    Unauthorized,
    ProviderMissing,
    Upstream(String),
}

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AuthRejection::Unauthorized => {
                (StatusCode::UNAUTHORIZED, "missing or invalid token".to_string())
            }
            AuthRejection::ProviderMissing => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "identity provider not configured".to_string(),
            ),
            AuthRejection::Upstream(reason) => (StatusCode::INTERNAL_SERVER_ERROR, reason),
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_verify_known_token() {
        let identity = StaticTokenIdentity::from_spec("tok-1=u1,tok-2=u2").unwrap();
        assert_eq!(identity.verify("tok-1").await.unwrap(), "u1");
        assert_eq!(identity.verify("tok-2").await.unwrap(), "u2");
    }

    #[tokio::test]
    async fn test_verify_unknown_token() {
        let identity = StaticTokenIdentity::from_spec("tok-1=u1").unwrap();
        assert!(matches!(
            identity.verify("nope").await,
            Err(AuthError::InvalidToken)
        ));
    }

    #[test]
    fn test_empty_spec_is_valid() {
        let identity = StaticTokenIdentity::from_spec("").unwrap();
        assert!(identity.tokens.is_empty());
    }

    #[test]
    fn test_malformed_spec_is_rejected() {
        assert!(StaticTokenIdentity::from_spec("tok-without-user").is_err());
        assert!(StaticTokenIdentity::from_spec("=u1").is_err());
        assert!(StaticTokenIdentity::from_spec("tok-1=").is_err());
    }

    #[test]
    fn test_duplicate_token_is_rejected() {
        assert!(StaticTokenIdentity::from_spec("tok=u1,tok=u2").is_err());
    }
}
