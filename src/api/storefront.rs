//! Storefront endpoints

use axum::{routing::get, Json, Router};

use crate::{
    middleware::Identity,
    models::TenantCredential,
    services::AuthError,
    utils::AppResult,
    AppState,
};

pub fn routes() -> Router<AppState> {
    Router::new().route("/scope", get(storefront_scope))
}

/// Read-only search scope bound to the presented storefront key
async fn storefront_scope(Identity(identity): Identity) -> AppResult<Json<TenantCredential>> {
    match identity.as_tenant() {
        Some(scope @ TenantCredential::Storefront { .. }) => Ok(Json(scope.clone())),
        _ => Err(AuthError::InvalidCredential.into()),
    }
}
