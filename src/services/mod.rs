//! Core services
//!
//! Credential verification, token issuance, secret sealing and the tenant
//! access checks every handler goes through.

pub mod access;
pub mod accounts;
pub mod api_keys;
pub mod credentials;
pub mod error;
pub mod oauth;
pub mod sessions;
pub mod shopify;
pub mod signature;
pub mod storefront;
pub mod tenants;
pub mod token;
pub mod vault;

pub use access::AccessControl;
pub use accounts::AccountService;
pub use api_keys::{ApiKeyService, ResolvedApiKey};
pub use credentials::Authenticator;
pub use error::AuthError;
pub use oauth::OAuthInstaller;
pub use sessions::SessionService;
pub use shopify::{AccessTokenExchange, AccessTokenGrant, ShopifyClient};
pub use signature::SignatureVerifier;
pub use storefront::StorefrontResolver;
pub use tenants::TenantService;
pub use token::{Claims, TokenKind, TokenService, TokenSubject};
pub use vault::TokenVault;
