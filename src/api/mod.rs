//! API routes and handlers
//!
//! Each route group is mounted behind the one credential middleware its
//! surface accepts; public routes carry none.

use axum::{http::HeaderValue, middleware::from_fn_with_state, routing::get, Router};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::{warn, Level};

use crate::{middleware, AppState};

mod clients;
mod health;
mod sessions;
mod shopify;
mod storefront;
mod stores;
mod users;
mod webhooks;

pub use health::*;
pub use webhooks::{HMAC_HEADER, SHOP_DOMAIN_HEADER};

/// Routes that need no credential, or verify their own (OAuth, webhooks)
pub fn public_routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health::health_check))
        .route("/health/ready", get(health::readiness))
        .nest("/api/users", users::public_routes())
        .nest("/api/auth/shopify", shopify::routes())
        .nest("/webhooks", webhooks::routes())
}

/// Routes behind a credential middleware
pub fn protected_routes(state: &AppState) -> Router<AppState> {
    Router::new()
        .nest(
            "/api/users",
            users::protected_routes().layer(from_fn_with_state(
                state.clone(),
                middleware::user_auth_middleware,
            )),
        )
        .nest(
            "/api/clients",
            clients::routes().layer(from_fn_with_state(
                state.clone(),
                middleware::user_auth_middleware,
            )),
        )
        .nest(
            "/api/v1/clients",
            clients::api_key_routes().layer(from_fn_with_state(
                state.clone(),
                middleware::api_key_middleware,
            )),
        )
        .nest(
            "/api/v1/storefront",
            storefront::routes().layer(from_fn_with_state(
                state.clone(),
                middleware::storefront_middleware,
            )),
        )
        .nest(
            "/api/stores",
            stores::routes().layer(from_fn_with_state(
                state.clone(),
                middleware::store_auth_middleware,
            )),
        )
        .nest(
            "/api/sessions",
            sessions::routes().layer(from_fn_with_state(
                state.clone(),
                middleware::session_key_gate,
            )),
        )
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    if origins.is_empty() {
        return layer.allow_origin(Any);
    }

    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();
    layer.allow_origin(origins)
}

/// Build the full application router
pub fn create_router(state: AppState) -> Router {
    let trace_layer = TraceLayer::new_for_http()
        .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
        .on_response(DefaultOnResponse::new().level(Level::INFO));

    public_routes()
        .merge(protected_routes(&state))
        .layer(cors_layer(&state.config.server.cors_origins))
        .layer(trace_layer)
        .with_state(state)
}
