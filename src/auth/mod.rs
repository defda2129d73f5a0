//! Verification of identity-provider tokens.
//!
//! The storefront does not mint credentials. An external identity provider
//! issues HS256 JWTs carrying the principal id (`sub`) and verified email;
//! this module validates them and makes the principal available to handlers.
//! Requests without a valid principal are rejected with 401 before any other
//! logic runs.

use async_trait::async_trait;
use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts, HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

use crate::config::AppConfig;
use crate::errors::ErrorResponse;

/// Claim structure for identity-provider JWTs
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (principal id)
    pub sub: String,
    /// Verified email address, when the provider shares it
    pub email: Option<String>,
    pub iat: i64,
    pub exp: i64,
    pub iss: String,
    pub aud: String,
}

/// Authenticated principal extracted from a verified token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthUser {
    pub user_id: String,
    pub email: Option<String>,
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Missing authentication token")]
    MissingAuth,
    #[error("Invalid authentication token: {0}")]
    InvalidToken(String),
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let body = ErrorResponse {
            success: false,
            message: self.to_string(),
        };
        (StatusCode::UNAUTHORIZED, Json(body)).into_response()
    }
}

/// Validates externally-issued tokens against the shared secret, issuer and
/// audience from configuration.
#[derive(Clone)]
pub struct AuthService {
    decoding_key: DecodingKey,
    validation: Validation,
}

impl AuthService {
    pub fn new(cfg: &AppConfig) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_audience(&[cfg.auth_audience.clone()]);
        validation.set_issuer(&[cfg.auth_issuer.clone()]);

        Self {
            decoding_key: DecodingKey::from_secret(cfg.jwt_secret.as_bytes()),
            validation,
        }
    }

    pub fn validate_token(&self, token: &str) -> Result<Claims, AuthError> {
        decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| AuthError::InvalidToken(e.to_string()))
    }
}

fn extract_auth_from_headers(
    headers: &HeaderMap,
    auth_service: &AuthService,
) -> Result<AuthUser, AuthError> {
    let auth_header = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .ok_or(AuthError::MissingAuth)?;

    let token = auth_header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .ok_or(AuthError::MissingAuth)?;

    let claims = auth_service.validate_token(token)?;
    debug!(user_id = %claims.sub, "authenticated principal");

    Ok(AuthUser {
        user_id: claims.sub,
        email: claims.email,
    })
}

/// Middleware that validates the bearer token and stores the principal in
/// request extensions for the [`AuthUser`] extractor.
pub async fn auth_middleware(
    State(auth_service): State<Arc<AuthService>>,
    mut request: Request,
    next: Next,
) -> Response {
    match extract_auth_from_headers(request.headers(), &auth_service) {
        Ok(user) => {
            request.extensions_mut().insert(user);
            next.run(request).await
        }
        Err(e) => e.into_response(),
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthUser>()
            .cloned()
            .ok_or(AuthError::MissingAuth)
    }
}

/// Extension methods for Router to require authentication on a route group
pub trait AuthRouterExt {
    fn with_auth(self, auth_service: Arc<AuthService>) -> Self;
}

impl<S> AuthRouterExt for axum::Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    fn with_auth(self, auth_service: Arc<AuthService>) -> Self {
        self.layer(axum::middleware::from_fn_with_state(
            auth_service,
            auth_middleware,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use jsonwebtoken::{encode, EncodingKey, Header};

    fn test_config() -> AppConfig {
        AppConfig::new(
            "sqlite::memory:",
            "test_secret_key_for_testing_purposes_only_32chars",
            "sk_test_gateway",
            "whsec_test",
            "127.0.0.1",
            18_080,
            "test",
        )
    }

    fn issue(cfg: &AppConfig, sub: &str, email: Option<&str>, ttl_secs: i64) -> String {
        let now = Utc::now().timestamp();
        let claims = Claims {
            sub: sub.to_string(),
            email: email.map(str::to_string),
            iat: now,
            exp: now + ttl_secs,
            iss: cfg.auth_issuer.clone(),
            aud: cfg.auth_audience.clone(),
        };
        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(cfg.jwt_secret.as_bytes()),
        )
        .unwrap()
    }

    #[test]
    fn valid_token_yields_claims() {
        let cfg = test_config();
        let service = AuthService::new(&cfg);
        let token = issue(&cfg, "user_1", Some("shopper@example.com"), 3600);

        let claims = service.validate_token(&token).unwrap();
        assert_eq!(claims.sub, "user_1");
        assert_eq!(claims.email.as_deref(), Some("shopper@example.com"));
    }

    #[test]
    fn expired_token_is_rejected() {
        let cfg = test_config();
        let service = AuthService::new(&cfg);
        let token = issue(&cfg, "user_1", None, -600);

        assert_matches::assert_matches!(
            service.validate_token(&token),
            Err(AuthError::InvalidToken(_))
        );
    }

    #[test]
    fn wrong_audience_is_rejected() {
        let mut cfg = test_config();
        let service = AuthService::new(&cfg);
        cfg.auth_audience = "someone-else".to_string();
        let token = issue(&cfg, "user_1", None, 3600);

        assert!(service.validate_token(&token).is_err());
    }

    #[test]
    fn bearer_header_is_required() {
        let cfg = test_config();
        let service = AuthService::new(&cfg);
        let headers = HeaderMap::new();

        assert!(matches!(
            extract_auth_from_headers(&headers, &service),
            Err(AuthError::MissingAuth)
        ));

        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, "Basic abc".parse().unwrap());
        assert!(matches!(
            extract_auth_from_headers(&headers, &service),
            Err(AuthError::MissingAuth)
        ));
    }
}
