//! Platform OAuth install endpoints

use std::collections::BTreeMap;

use axum::{
    extract::{Query, State},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;

use crate::{
    models::{InstallRedirect, InstallResponse},
    utils::AppResult,
    AppState,
};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/begin", post(begin))
        .route("/callback", get(callback))
}

#[derive(Debug, Deserialize)]
struct BeginRequest {
    shop: String,
    redirect_uri: Option<String>,
}

async fn begin(
    State(state): State<AppState>,
    Json(payload): Json<BeginRequest>,
) -> AppResult<Json<InstallRedirect>> {
    let redirect = state
        .oauth
        .begin(&payload.shop, payload.redirect_uri.as_deref())?;
    Ok(Json(redirect))
}

/// The full query map is needed: the signature covers every parameter
async fn callback(
    State(state): State<AppState>,
    Query(params): Query<BTreeMap<String, String>>,
) -> AppResult<Json<InstallResponse>> {
    Ok(Json(state.oauth.callback(&params).await?))
}
