//! Tenant ("client") and API key endpoints
//!
//! Management routes run behind the user-session middleware; the scope route
//! runs behind the API key middleware.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{delete, get, post},
    Json, Router,
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    middleware::Identity,
    models::{
        AddMemberRequest, ApiKeyPublic, ClientPublic, CreateClientRequest, GenerateApiKeyRequest,
        GeneratedApiKey, TenantCredential,
    },
    utils::AppResult,
    AppState,
};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_clients).post(create_client))
        .route("/{id}", get(get_client))
        .route("/{id}/members", post(add_member))
        .route("/{id}/api-keys", get(list_api_keys).post(generate_api_key))
        .route("/{id}/api-keys/{key_id}", delete(revoke_api_key))
}

pub fn api_key_routes() -> Router<AppState> {
    Router::new().route("/{client_name}/scope", get(client_scope))
}

async fn create_client(
    State(state): State<AppState>,
    Identity(identity): Identity,
    Json(payload): Json<CreateClientRequest>,
) -> AppResult<(StatusCode, Json<ClientPublic>)> {
    payload.validate()?;
    let client = state.tenants.create(&identity, &payload).await?;
    Ok((StatusCode::CREATED, Json(client.into())))
}

async fn list_clients(
    State(state): State<AppState>,
    Identity(identity): Identity,
) -> AppResult<Json<Vec<ClientPublic>>> {
    let clients = state.tenants.list(&identity).await?;
    Ok(Json(clients.into_iter().map(ClientPublic::from).collect()))
}

async fn get_client(
    State(state): State<AppState>,
    Identity(identity): Identity,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ClientPublic>> {
    Ok(Json(state.tenants.get(&identity, id).await?.into()))
}

async fn add_member(
    State(state): State<AppState>,
    Identity(identity): Identity,
    Path(id): Path<Uuid>,
    Json(payload): Json<AddMemberRequest>,
) -> AppResult<Json<ClientPublic>> {
    payload.validate()?;
    let client = state.tenants.add_member(&identity, id, &payload.email).await?;
    Ok(Json(client.into()))
}

async fn generate_api_key(
    State(state): State<AppState>,
    Identity(identity): Identity,
    Path(id): Path<Uuid>,
    Json(payload): Json<GenerateApiKeyRequest>,
) -> AppResult<(StatusCode, Json<GeneratedApiKey>)> {
    payload.validate()?;
    let generated = state.tenants.generate_api_key(&identity, id, &payload).await?;
    Ok((StatusCode::CREATED, Json(generated)))
}

async fn list_api_keys(
    State(state): State<AppState>,
    Identity(identity): Identity,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Vec<ApiKeyPublic>>> {
    Ok(Json(state.tenants.list_api_keys(&identity, id).await?))
}

async fn revoke_api_key(
    State(state): State<AppState>,
    Identity(identity): Identity,
    Path((id, key_id)): Path<(Uuid, Uuid)>,
) -> AppResult<StatusCode> {
    state.tenants.revoke_api_key(&identity, id, key_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Confirm an API key may act on the tenant named in the URL
async fn client_scope(
    State(state): State<AppState>,
    Identity(identity): Identity,
    Path(client_name): Path<String>,
) -> AppResult<Json<serde_json::Value>> {
    let client = state.tenants.scope(&identity, &client_name).await?;
    let permissions = match identity.as_tenant() {
        Some(TenantCredential::ApiKey { permissions, .. }) => permissions.clone(),
        _ => Vec::new(),
    };

    Ok(Json(serde_json::json!({
        "client_id": client.id,
        "client_name": client.name,
        "permissions": permissions,
    })))
}
