//! Middleware components
//!
//! Each protected route group runs exactly one credential middleware, which
//! verifies the credential for that surface and stores the resulting
//! [`VerifiedIdentity`](crate::models::VerifiedIdentity) in request extensions.

pub mod auth;

pub use auth::{
    api_key_middleware, extract_bearer_token, session_key_gate, store_auth_middleware,
    storefront_middleware, user_auth_middleware, Identity, API_KEY_HEADER, STOREFRONT_KEY_HEADER,
};
