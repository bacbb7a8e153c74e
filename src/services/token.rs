//! Signed token issuer and validator
//!
//! One HS256 signing key backs three token kinds: user sessions, store
//! sessions and OAuth state. Expiry is checked against the caller-supplied
//! clock rather than inside the JWT library so it can be tested exactly.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::AuthError;
use crate::config::AuthConfig;
use crate::models::UserIdentity;

/// Minimum signing key length in bytes
pub const MIN_SIGNING_KEY_LEN: usize = 32;

/// Allowed clock skew for `nbf`, in seconds
const NOT_BEFORE_LEEWAY_SECS: i64 = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenKind {
    UserSession,
    StoreSession,
    OauthState,
}

impl TokenKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenKind::UserSession => "user_session",
            TokenKind::StoreSession => "store_session",
            TokenKind::OauthState => "oauth_state",
        }
    }
}

/// Claim set carried by every token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// User id, store id, or shop domain depending on `kind`
    pub sub: String,
    pub kind: TokenKind,
    pub iat: i64,
    pub exp: i64,
    pub nbf: i64,
    pub jti: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shop: Option<String>,
}

/// Who a token speaks for
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenSubject {
    User { user_id: Uuid, email: String },
    Store { store_id: Uuid, shop: String },
    OAuthState { shop: String },
}

impl TokenSubject {
    pub fn kind(&self) -> TokenKind {
        match self {
            TokenSubject::User { .. } => TokenKind::UserSession,
            TokenSubject::Store { .. } => TokenKind::StoreSession,
            TokenSubject::OAuthState { .. } => TokenKind::OauthState,
        }
    }
}

impl Claims {
    /// Rebuild the typed subject; a claim set missing its kind-specific fields is malformed
    pub fn subject(&self) -> Result<TokenSubject, AuthError> {
        let malformed = || AuthError::MalformedCredential("incomplete token claims".to_string());

        match self.kind {
            TokenKind::UserSession => Ok(TokenSubject::User {
                user_id: Uuid::parse_str(&self.sub).map_err(|_| malformed())?,
                email: self.email.clone().ok_or_else(malformed)?,
            }),
            TokenKind::StoreSession => Ok(TokenSubject::Store {
                store_id: Uuid::parse_str(&self.sub).map_err(|_| malformed())?,
                shop: self.shop.clone().ok_or_else(malformed)?,
            }),
            TokenKind::OauthState => Ok(TokenSubject::OAuthState {
                shop: self.sub.clone(),
            }),
        }
    }
}

/// Issues and validates signed tokens
pub struct TokenService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    user_ttl: Duration,
    store_ttl: Duration,
    state_ttl: Duration,
}

impl TokenService {
    pub fn new(
        signing_key: &str,
        user_ttl: Duration,
        store_ttl: Duration,
        state_ttl: Duration,
    ) -> Result<Self, AuthError> {
        if signing_key.len() < MIN_SIGNING_KEY_LEN {
            return Err(AuthError::ConfigurationFatal(format!(
                "token signing key must be at least {} bytes",
                MIN_SIGNING_KEY_LEN
            )));
        }

        Ok(Self {
            encoding_key: EncodingKey::from_secret(signing_key.as_bytes()),
            decoding_key: DecodingKey::from_secret(signing_key.as_bytes()),
            user_ttl,
            store_ttl,
            state_ttl,
        })
    }

    pub fn from_config(config: &AuthConfig) -> Result<Self, AuthError> {
        Self::new(
            &config.signing_key,
            Duration::hours(config.user_token_ttl_hours),
            Duration::hours(config.store_token_ttl_hours),
            Duration::minutes(config.oauth_state_ttl_minutes),
        )
    }

    pub fn ttl_for(&self, kind: TokenKind) -> Duration {
        match kind {
            TokenKind::UserSession => self.user_ttl,
            TokenKind::StoreSession => self.store_ttl,
            TokenKind::OauthState => self.state_ttl,
        }
    }

    /// Issue a token for `subject` valid for `ttl`
    pub fn issue(&self, subject: &TokenSubject, ttl: Duration) -> Result<String, AuthError> {
        self.issue_at(subject, ttl, Utc::now())
    }

    pub fn issue_at(
        &self,
        subject: &TokenSubject,
        ttl: Duration,
        now: DateTime<Utc>,
    ) -> Result<String, AuthError> {
        let (sub, email, shop) = match subject {
            TokenSubject::User { user_id, email } => (user_id.to_string(), Some(email.clone()), None),
            TokenSubject::Store { store_id, shop } => (store_id.to_string(), None, Some(shop.clone())),
            TokenSubject::OAuthState { shop } => (shop.clone(), None, Some(shop.clone())),
        };

        let claims = Claims {
            sub,
            kind: subject.kind(),
            iat: now.timestamp(),
            exp: (now + ttl).timestamp(),
            nbf: now.timestamp(),
            jti: Uuid::new_v4().to_string(),
            email,
            shop,
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| AuthError::ConfigurationFatal(format!("token signing failed: {}", e)))
    }

    pub fn issue_user_session(&self, user_id: Uuid, email: &str) -> Result<String, AuthError> {
        let subject = TokenSubject::User {
            user_id,
            email: email.to_string(),
        };
        self.issue(&subject, self.user_ttl)
    }

    pub fn issue_store_session(&self, store_id: Uuid, shop: &str) -> Result<String, AuthError> {
        let subject = TokenSubject::Store {
            store_id,
            shop: shop.to_string(),
        };
        self.issue(&subject, self.store_ttl)
    }

    pub fn issue_oauth_state(&self, shop: &str) -> Result<String, AuthError> {
        let subject = TokenSubject::OAuthState {
            shop: shop.to_string(),
        };
        self.issue(&subject, self.state_ttl)
    }

    /// Validate a token of the expected kind against the current time
    pub fn validate(&self, token: &str, expected: TokenKind) -> Result<Claims, AuthError> {
        self.validate_at(token, expected, Utc::now())
    }

    /// Validate a token of the expected kind against `now`
    pub fn validate_at(
        &self,
        token: &str,
        expected: TokenKind,
        now: DateTime<Utc>,
    ) -> Result<Claims, AuthError> {
        let token = token.trim();
        if token.is_empty() {
            return Err(AuthError::MissingCredential);
        }

        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.validate_nbf = false;

        let claims = decode::<Claims>(token, &self.decoding_key, &validation)?.claims;

        if claims.kind != expected {
            return Err(AuthError::KindMismatch {
                expected: expected.as_str(),
                found: claims.kind.as_str(),
            });
        }
        if now.timestamp() >= claims.exp {
            return Err(AuthError::ExpiredCredential);
        }
        if claims.nbf > now.timestamp() + NOT_BEFORE_LEEWAY_SECS {
            return Err(AuthError::InvalidCredential);
        }

        Ok(claims)
    }

    /// Validate an OAuth state token and bind it to the shop presented at callback
    pub fn validate_oauth_state(&self, state: &str, shop: &str) -> Result<Claims, AuthError> {
        let claims = self.validate(state, TokenKind::OauthState)?;
        if claims.sub != shop {
            return Err(AuthError::SubjectMismatch);
        }
        Ok(claims)
    }

    /// Verify a user-session token into a user identity
    pub fn verify_user_session(&self, token: &str) -> Result<UserIdentity, AuthError> {
        match self.validate(token, TokenKind::UserSession)?.subject()? {
            TokenSubject::User { user_id, email } => Ok(UserIdentity { user_id, email }),
            _ => Err(AuthError::MalformedCredential("unexpected subject".to_string())),
        }
    }

    /// Verify a store-session token into `(store_id, shop)`
    pub fn verify_store_session(&self, token: &str) -> Result<(Uuid, String), AuthError> {
        match self.validate(token, TokenKind::StoreSession)?.subject()? {
            TokenSubject::Store { store_id, shop } => Ok((store_id, shop)),
            _ => Err(AuthError::MalformedCredential("unexpected subject".to_string())),
        }
    }
}
