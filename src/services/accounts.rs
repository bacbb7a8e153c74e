//! User accounts
//!
//! Registration, login, profile updates and soft deactivation. Passwords are
//! stored as Argon2id PHC strings.

use std::sync::{Arc, OnceLock};

use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use rand::rngs::OsRng;
use tracing::{info, warn};
use uuid::Uuid;

use super::{AuthError, TokenKind, TokenService};
use crate::db::UserStore;
use crate::models::{
    normalize_email, AuthResponse, LoginRequest, RegisterUserRequest, UpdateUserRequest, User,
    UserPublic,
};
use crate::utils::validation::validate_password;

/// Hash a password using Argon2id
pub fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|_| AuthError::CryptoFailure)
}

/// Verify a password against a stored PHC string
pub fn verify_password(password: &str, password_hash: &str) -> Result<bool, AuthError> {
    let parsed = PasswordHash::new(password_hash).map_err(|_| AuthError::CryptoFailure)?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}

/// Password behind [`decoy_hash`]; it never matches a stored account
const DECOY_PASSWORD: &str = "mgsearch-unknown-account";

/// PHC string verified against when the email is unknown
///
/// Keeps an unknown email on the same Argon2 cost as a wrong password.
fn decoy_hash() -> Option<&'static str> {
    static DECOY: OnceLock<Option<String>> = OnceLock::new();
    DECOY
        .get_or_init(|| hash_password(DECOY_PASSWORD).ok())
        .as_deref()
}

pub struct AccountService {
    users: Arc<dyn UserStore>,
    tokens: Arc<TokenService>,
    password_min_length: usize,
}

impl AccountService {
    pub fn new(users: Arc<dyn UserStore>, tokens: Arc<TokenService>, password_min_length: usize) -> Self {
        Self {
            users,
            tokens,
            password_min_length,
        }
    }

    fn auth_response(&self, user: User) -> Result<AuthResponse, AuthError> {
        let token = self.tokens.issue_user_session(user.id, &user.email)?;
        Ok(AuthResponse {
            user: UserPublic::from(user),
            token,
            token_type: "Bearer".to_string(),
            expires_in: self.tokens.ttl_for(TokenKind::UserSession).num_seconds(),
        })
    }

    /// Create an account; a taken email surfaces as `AlreadyExists`
    pub async fn register(&self, req: &RegisterUserRequest) -> Result<AuthResponse, AuthError> {
        if !validate_password(&req.password, self.password_min_length) {
            return Err(AuthError::InvalidInput(format!(
                "password must be at least {} characters",
                self.password_min_length
            )));
        }

        let email = normalize_email(&req.email);
        let user = User::new(
            email,
            hash_password(&req.password)?,
            req.first_name.trim().to_string(),
            req.last_name.trim().to_string(),
        );

        self.users.create_user(&user).await?;
        info!(user_id = %user.id, "User registered");

        self.auth_response(user)
    }

    /// Unknown email and wrong password fail identically
    pub async fn login(&self, req: &LoginRequest) -> Result<AuthResponse, AuthError> {
        let email = normalize_email(&req.email);
        let Some(user) = self.users.find_user_by_email(&email).await? else {
            if let Some(decoy) = decoy_hash() {
                let _ = verify_password(&req.password, decoy);
            }
            return Err(AuthError::InvalidCredential);
        };

        if !verify_password(&req.password, &user.password_hash)? {
            warn!(user_id = %user.id, "Failed login attempt");
            return Err(AuthError::InvalidCredential);
        }
        if !user.is_active {
            warn!(user_id = %user.id, "Login attempt on deactivated account");
            return Err(AuthError::AuthorizationDenied("account is deactivated".to_string()));
        }

        info!(user_id = %user.id, "User logged in");
        self.auth_response(user)
    }

    /// Load the caller's active account
    pub async fn me(&self, user_id: Uuid) -> Result<UserPublic, AuthError> {
        self.users
            .find_user_by_id(user_id)
            .await?
            .filter(|u| u.is_active)
            .map(UserPublic::from)
            .ok_or(AuthError::InvalidCredential)
    }

    pub async fn update_profile(
        &self,
        user_id: Uuid,
        req: &UpdateUserRequest,
    ) -> Result<UserPublic, AuthError> {
        self.me(user_id).await?;

        let user = self
            .users
            .update_user_profile(
                user_id,
                req.first_name.as_deref().map(str::trim),
                req.last_name.as_deref().map(str::trim),
            )
            .await?
            .ok_or(AuthError::InvalidCredential)?;

        Ok(UserPublic::from(user))
    }

    /// Soft-deactivate the account; it is never deleted
    pub async fn deactivate(&self, user_id: Uuid) -> Result<(), AuthError> {
        self.me(user_id).await?;
        self.users.deactivate_user(user_id).await?;
        info!(user_id = %user_id, "User deactivated");
        Ok(())
    }

    /// Look up an active user by email
    pub async fn find_active_by_email(&self, email: &str) -> Result<User, AuthError> {
        self.users
            .find_user_by_email(&normalize_email(email))
            .await?
            .filter(|u| u.is_active)
            .ok_or_else(|| AuthError::NotFound("User".to_string()))
    }
}
