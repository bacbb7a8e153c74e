//! Credential middleware
//!
//! Extracts the credential each surface expects from its transport and runs
//! it through the [`Authenticator`](crate::services::Authenticator). Handlers
//! read the result back with the [`Identity`] extractor.

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header::AUTHORIZATION, request::Parts, HeaderMap},
    middleware::Next,
    response::Response,
};
use tracing::debug;

use crate::{
    models::{Credential, VerifiedIdentity},
    services::{signature::constant_time_eq, AuthError},
    AppState,
};

/// Header carrying a tenant API key
pub const API_KEY_HEADER: &str = "x-api-key";

/// Header carrying a public storefront key
pub const STOREFRONT_KEY_HEADER: &str = "x-storefront-key";

/// Verified identity of the caller, placed by one of the auth middlewares
#[derive(Debug, Clone)]
pub struct Identity(pub VerifiedIdentity);

impl<S> FromRequestParts<S> for Identity
where
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<VerifiedIdentity>()
            .cloned()
            .map(Identity)
            .ok_or(AuthError::MissingCredential)
    }
}

/// Extract bearer token from Authorization header
pub fn extract_bearer_token(auth_header: &str) -> Option<&str> {
    auth_header
        .strip_prefix("Bearer ")
        .or_else(|| auth_header.strip_prefix("bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

fn header_value<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|h| h.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
}

fn bearer_from(headers: &HeaderMap) -> Result<&str, AuthError> {
    let header = headers
        .get(AUTHORIZATION)
        .ok_or(AuthError::MissingCredential)?
        .to_str()
        .map_err(|_| AuthError::MalformedCredential("non-ASCII authorization header".to_string()))?;

    extract_bearer_token(header)
        .ok_or_else(|| AuthError::MalformedCredential("expected a bearer token".to_string()))
}

async fn authenticate(
    state: &AppState,
    mut request: Request,
    next: Next,
    credential: Credential<'_>,
) -> Result<Response, AuthError> {
    let identity = state.authenticator.verify(credential).await?;
    request.extensions_mut().insert(identity);
    Ok(next.run(request).await)
}

/// Require a user-session token
pub async fn user_auth_middleware(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let token = bearer_from(request.headers())?.to_string();
    authenticate(&state, request, next, Credential::UserToken(&token)).await
}

/// Require a store-session token
pub async fn store_auth_middleware(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let token = bearer_from(request.headers())?.to_string();
    authenticate(&state, request, next, Credential::StoreToken(&token)).await
}

/// Require a tenant API key, from `X-API-Key` or a bearer token
pub async fn api_key_middleware(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let key = match header_value(request.headers(), API_KEY_HEADER) {
        Some(key) => key.to_string(),
        None => bearer_from(request.headers())?.to_string(),
    };
    authenticate(&state, request, next, Credential::ApiKey(&key)).await
}

/// Require a storefront key
pub async fn storefront_middleware(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let key = header_value(request.headers(), STOREFRONT_KEY_HEADER)
        .ok_or(AuthError::MissingCredential)?
        .to_string();
    authenticate(&state, request, next, Credential::StorefrontKey(&key)).await
}

/// Static key gate for the platform session endpoints
///
/// Open when no session key is configured.
pub async fn session_key_gate(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let expected = match state.config.auth.session_api_key.as_deref() {
        Some(key) if !key.is_empty() => key,
        _ => return Ok(next.run(request).await),
    };

    let provided = bearer_from(request.headers())?;
    if !constant_time_eq(provided.as_bytes(), expected.as_bytes()) {
        debug!("Session key rejected");
        return Err(AuthError::InvalidCredential);
    }

    Ok(next.run(request).await)
}
