//! User account endpoints

use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use validator::Validate;

use crate::{
    middleware::Identity,
    models::{AuthResponse, LoginRequest, RegisterUserRequest, UpdateUserRequest, UserIdentity, UserPublic},
    services::AuthError,
    utils::AppResult,
    AppState,
};

pub fn public_routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
}

pub fn protected_routes() -> Router<AppState> {
    Router::new().route("/me", get(me).put(update_me).delete(deactivate_me))
}

fn caller(identity: &Identity) -> Result<&UserIdentity, AuthError> {
    identity.0.as_user().ok_or(AuthError::InvalidCredential)
}

async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterUserRequest>,
) -> AppResult<(StatusCode, Json<AuthResponse>)> {
    payload.validate()?;
    let response = state.accounts.register(&payload).await?;
    Ok((StatusCode::CREATED, Json(response)))
}

async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> AppResult<Json<AuthResponse>> {
    payload.validate()?;
    Ok(Json(state.accounts.login(&payload).await?))
}

async fn me(State(state): State<AppState>, identity: Identity) -> AppResult<Json<UserPublic>> {
    let user = caller(&identity)?;
    Ok(Json(state.accounts.me(user.user_id).await?))
}

async fn update_me(
    State(state): State<AppState>,
    identity: Identity,
    Json(payload): Json<UpdateUserRequest>,
) -> AppResult<Json<UserPublic>> {
    payload.validate()?;
    let user = caller(&identity)?;
    Ok(Json(state.accounts.update_profile(user.user_id, &payload).await?))
}

async fn deactivate_me(State(state): State<AppState>, identity: Identity) -> AppResult<StatusCode> {
    let user = caller(&identity)?;
    state.accounts.deactivate(user.user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
