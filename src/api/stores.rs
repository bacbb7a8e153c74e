//! Store session endpoints

use axum::{extract::State, routing::get, Json, Router};

use crate::{
    middleware::Identity,
    models::{Access, SearchCredentials, StorePublic, TenantCredential, VerifiedIdentity},
    services::AuthError,
    utils::AppResult,
    AppState,
};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/current", get(current_store))
        .route("/search-credentials", get(search_credentials))
}

fn session_store(identity: &VerifiedIdentity) -> Result<uuid::Uuid, AuthError> {
    match identity.as_tenant() {
        Some(TenantCredential::StoreSession { store_id, .. }) => Ok(*store_id),
        _ => Err(AuthError::InvalidCredential),
    }
}

async fn current_store(
    State(state): State<AppState>,
    Identity(identity): Identity,
) -> AppResult<Json<StorePublic>> {
    let store_id = session_store(&identity)?;
    let store = state.oauth.store(store_id).await?;
    Ok(Json(StorePublic::from(&store)))
}

async fn search_credentials(
    State(state): State<AppState>,
    Identity(identity): Identity,
) -> AppResult<Json<SearchCredentials>> {
    let store_id = session_store(&identity)?;
    state.access.authorize_store(&identity, store_id, Access::Read)?;
    Ok(Json(state.oauth.search_credentials(store_id).await?))
}
