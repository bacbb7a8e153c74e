//! Platform webhook endpoint
//!
//! The body is taken as raw bytes so the signature is computed over exactly
//! what the platform sent. Nothing is parsed before verification succeeds.

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::HeaderMap,
    routing::post,
    Json, Router,
};
use chrono::Utc;
use serde_json::json;
use tracing::{info, warn};

use crate::{
    models::{Access, Credential, TenantCredential},
    services::AuthError,
    utils::{AppError, AppResult},
    AppState,
};

pub const HMAC_HEADER: &str = "x-shopify-hmac-sha256";
pub const SHOP_DOMAIN_HEADER: &str = "x-shopify-shop-domain";

pub fn routes() -> Router<AppState> {
    Router::new().route("/shopify/{topic}/{subtopic}", post(shopify_webhook))
}

fn required_header<'a>(headers: &'a HeaderMap, name: &str) -> Result<&'a str, AppError> {
    headers
        .get(name)
        .and_then(|h| h.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| AppError::BadRequest("missing required headers".to_string()))
}

fn product_id(body: &[u8]) -> Result<serde_json::Value, AppError> {
    let payload: serde_json::Value = serde_json::from_slice(body)
        .map_err(|_| AppError::BadRequest("invalid webhook payload".to_string()))?;
    match payload.get("id") {
        Some(id) if !id.is_null() => Ok(id.clone()),
        _ => Err(AppError::BadRequest("product id missing".to_string())),
    }
}

async fn shopify_webhook(
    State(state): State<AppState>,
    Path((topic, subtopic)): Path<(String, String)>,
    headers: HeaderMap,
    body: Bytes,
) -> AppResult<Json<serde_json::Value>> {
    let event = format!("{}/{}", topic, subtopic);
    let signature = required_header(&headers, HMAC_HEADER)?;
    let shop = required_header(&headers, SHOP_DOMAIN_HEADER)?;

    let identity = state
        .authenticator
        .verify(Credential::WebhookSignature {
            shop,
            signature,
            body: &body,
        })
        .await
        .inspect_err(|e| warn!(shop = %shop, event = %event, error = %e, "Webhook rejected"))?;

    let (store_id, shop) = match identity.as_tenant() {
        Some(TenantCredential::Webhook {
            store_id: Some(store_id),
            shop,
        }) => (*store_id, shop.clone()),
        Some(TenantCredential::Webhook { store_id: None, .. }) => {
            return Err(AuthError::NotFound("store".to_string()).into());
        }
        _ => return Err(AuthError::InvalidCredential.into()),
    };
    state.access.authorize_store(&identity, store_id, Access::Write)?;

    match event.as_str() {
        "products/create" | "products/update" | "products/delete" => {
            let id = product_id(&body)?;
            let store = state.oauth.store(store_id).await?;
            info!(shop = %shop, event = %event, product_id = %id, "Webhook accepted");
            Ok(Json(json!({
                "status": "processed",
                "event": event,
                "index_uid": store.index_uid,
            })))
        }
        "app/uninstalled" => {
            state.stores.mark_uninstalled(&shop, Utc::now()).await.map_err(AuthError::from)?;
            let purged = state.sessions.purge_shop(&shop).await?;
            info!(shop = %shop, purged_sessions = purged, "Store uninstalled");
            Ok(Json(json!({ "status": "processed", "event": event })))
        }
        _ => Ok(Json(json!({ "message": "event ignored", "event": event }))),
    }
}
