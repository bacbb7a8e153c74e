//! HMAC-SHA256 signature verification
//!
//! Two surfaces share one primitive: OAuth callback query parameters
//! (hex-encoded HMAC over the sorted, `&`-joined parameters) and webhook
//! bodies (base64-encoded HMAC over the raw bytes). A missing or empty
//! signature is always a failure.

use std::collections::BTreeMap;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;

use super::AuthError;

type HmacSha256 = Hmac<Sha256>;

/// Parameters excluded from the OAuth canonical message
const EXCLUDED_PARAMS: [&str; 2] = ["hmac", "signature"];

/// Compare two byte strings in time independent of where they differ
pub fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    a.ct_eq(b).into()
}

/// Canonical OAuth message: sorted `key=value` pairs joined with `&`
pub fn oauth_message(params: &BTreeMap<String, String>) -> String {
    params
        .iter()
        .filter(|(k, _)| !EXCLUDED_PARAMS.contains(&k.as_str()))
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join("&")
}

fn mac_for(secret: &str) -> Result<HmacSha256, AuthError> {
    if secret.is_empty() {
        return Err(AuthError::ConfigurationFatal("empty HMAC secret".to_string()));
    }
    HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|_| AuthError::ConfigurationFatal("invalid HMAC secret".to_string()))
}

/// Hex HMAC over the canonical OAuth message
pub fn sign_oauth_params(secret: &str, params: &BTreeMap<String, String>) -> Result<String, AuthError> {
    let mut mac = mac_for(secret)?;
    mac.update(oauth_message(params).as_bytes());
    Ok(hex::encode(mac.finalize().into_bytes()))
}

/// Base64 HMAC over a raw webhook body
pub fn sign_webhook(secret: &str, body: &[u8]) -> Result<String, AuthError> {
    let mut mac = mac_for(secret)?;
    mac.update(body);
    Ok(BASE64.encode(mac.finalize().into_bytes()))
}

fn verify_mac(secret: &str, message: &[u8], expected: &[u8]) -> bool {
    match mac_for(secret) {
        Ok(mut mac) => {
            mac.update(message);
            mac.verify_slice(expected).is_ok()
        }
        Err(_) => false,
    }
}

/// Verifies platform-signed requests
pub struct SignatureVerifier {
    oauth_secret: String,
    webhook_secret: String,
}

impl SignatureVerifier {
    pub fn new(oauth_secret: &str, webhook_secret: &str) -> Result<Self, AuthError> {
        if oauth_secret.is_empty() {
            return Err(AuthError::ConfigurationFatal("OAuth shared secret is required".to_string()));
        }
        if webhook_secret.is_empty() {
            return Err(AuthError::ConfigurationFatal("webhook secret is required".to_string()));
        }

        Ok(Self {
            oauth_secret: oauth_secret.to_string(),
            webhook_secret: webhook_secret.to_string(),
        })
    }

    /// Verify the `hmac` parameter of an OAuth redirect
    pub fn verify_oauth_callback(&self, params: &BTreeMap<String, String>) -> Result<(), AuthError> {
        let provided = params
            .get("hmac")
            .map(|h| h.trim())
            .filter(|h| !h.is_empty())
            .ok_or(AuthError::MissingCredential)?;

        let provided = hex::decode(provided)
            .map_err(|_| AuthError::MalformedCredential("hmac is not hex".to_string()))?;

        if verify_mac(&self.oauth_secret, oauth_message(params).as_bytes(), &provided) {
            Ok(())
        } else {
            Err(AuthError::SignatureMismatch)
        }
    }

    /// Verify a webhook body against the global secret, then the store's own secret
    pub fn verify_webhook(
        &self,
        body: &[u8],
        signature: &str,
        store_secret: Option<&str>,
    ) -> Result<(), AuthError> {
        let signature = signature.trim();
        if signature.is_empty() {
            return Err(AuthError::MissingCredential);
        }

        let provided = BASE64
            .decode(signature)
            .map_err(|_| AuthError::MalformedCredential("signature is not base64".to_string()))?;

        let accepted = verify_mac(&self.webhook_secret, body, &provided)
            || store_secret.is_some_and(|secret| verify_mac(secret, body, &provided));

        if accepted {
            Ok(())
        } else {
            Err(AuthError::SignatureMismatch)
        }
    }
}
