//! Platform session endpoints, behind the session key gate

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{delete, get, post},
    Json, Router,
};
use serde_json::json;

use crate::{
    models::{DeleteSessionsRequest, PlatformSession},
    utils::AppResult,
    AppState,
};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", post(store_session))
        .route("/batch", delete(delete_sessions))
        .route("/shop/{shop}", get(sessions_for_shop))
        .route("/{id}", get(load_session).delete(delete_session))
}

async fn store_session(
    State(state): State<AppState>,
    Json(payload): Json<PlatformSession>,
) -> AppResult<Json<serde_json::Value>> {
    state.sessions.store(payload).await?;
    Ok(Json(json!({ "success": true })))
}

async fn load_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<PlatformSession>> {
    Ok(Json(state.sessions.load(&id).await?))
}

async fn delete_session(State(state): State<AppState>, Path(id): Path<String>) -> AppResult<StatusCode> {
    state.sessions.delete(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn delete_sessions(
    State(state): State<AppState>,
    Json(payload): Json<DeleteSessionsRequest>,
) -> AppResult<Json<serde_json::Value>> {
    let deleted = state.sessions.delete_many(&payload.ids).await?;
    Ok(Json(json!({ "success": true, "deleted": deleted })))
}

async fn sessions_for_shop(
    State(state): State<AppState>,
    Path(shop): Path<String>,
) -> AppResult<Json<Vec<PlatformSession>>> {
    Ok(Json(state.sessions.find_by_shop(&shop).await?))
}
