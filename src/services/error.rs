//! Credential verification and authorization errors
//!
//! Every verifier recovers its failures into one of these kinds. Responses are
//! uniform per kind: unknown, revoked, forged, wrong-kind and wrong-subject
//! credentials all render as the same "Invalid credentials" denial.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;
use tracing::error;

use crate::db::RepositoryError;
use crate::utils::error::ErrorResponse;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Missing credentials")]
    MissingCredential,

    #[error("Malformed credential: {0}")]
    MalformedCredential(String),

    #[error("Credential has expired")]
    ExpiredCredential,

    #[error("Credential has been revoked")]
    RevokedCredential,

    #[error("Invalid credential")]
    InvalidCredential,

    #[error("Signature mismatch")]
    SignatureMismatch,

    #[error("Token kind mismatch: expected {expected}, found {found}")]
    KindMismatch {
        expected: &'static str,
        found: &'static str,
    },

    #[error("Token subject mismatch")]
    SubjectMismatch,

    #[error("Authorization denied: {0}")]
    AuthorizationDenied(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Already exists: {0}")]
    AlreadyExists(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Cryptographic failure")]
    CryptoFailure,

    #[error("Configuration error: {0}")]
    ConfigurationFatal(String),

    #[error("Timed out: {0}")]
    Timeout(String),

    /// The platform rejected or failed a server-to-server call
    #[error("Upstream error: {0}")]
    Upstream(String),

    #[error("Storage error: {0}")]
    Storage(String),
}

impl AuthError {
    /// True for failures that must be indistinguishable to the caller
    pub fn is_invalid_credential(&self) -> bool {
        matches!(
            self,
            AuthError::InvalidCredential
                | AuthError::RevokedCredential
                | AuthError::SignatureMismatch
                | AuthError::KindMismatch { .. }
                | AuthError::SubjectMismatch
        )
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            AuthError::MissingCredential
            | AuthError::MalformedCredential(_)
            | AuthError::ExpiredCredential => StatusCode::UNAUTHORIZED,
            e if e.is_invalid_credential() => StatusCode::UNAUTHORIZED,
            AuthError::AuthorizationDenied(_) => StatusCode::FORBIDDEN,
            AuthError::NotFound(_) => StatusCode::NOT_FOUND,
            AuthError::AlreadyExists(_) => StatusCode::CONFLICT,
            AuthError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            AuthError::Timeout(_) => StatusCode::SERVICE_UNAVAILABLE,
            AuthError::Upstream(_) => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Client-facing error body; internal detail is never included for 5xx
    pub fn to_error_response(&self) -> ErrorResponse {
        match self {
            AuthError::MissingCredential => {
                ErrorResponse::new("unauthorized", "Missing credentials")
            }
            AuthError::MalformedCredential(_) => {
                ErrorResponse::new("unauthorized", "Malformed credentials")
            }
            AuthError::ExpiredCredential => {
                ErrorResponse::new("unauthorized", "Credentials have expired")
            }
            e if e.is_invalid_credential() => {
                ErrorResponse::new("unauthorized", "Invalid credentials")
            }
            AuthError::AuthorizationDenied(_) => ErrorResponse::new("forbidden", "Access denied"),
            AuthError::NotFound(what) => ErrorResponse::new("not_found", format!("{} not found", what)),
            AuthError::AlreadyExists(what) => {
                ErrorResponse::new("conflict", format!("{} already exists", what))
            }
            AuthError::InvalidInput(msg) => ErrorResponse::new("bad_request", msg.clone()),
            AuthError::Timeout(_) => {
                ErrorResponse::new("service_unavailable", "Upstream storage timed out")
            }
            AuthError::Upstream(_) => {
                ErrorResponse::new("upstream_error", "Platform request failed")
            }
            _ => ErrorResponse::new("internal_error", "Internal server error"),
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            error!(error = %self, "Authentication subsystem failure");
        }
        (status, Json(self.to_error_response())).into_response()
    }
}

impl From<RepositoryError> for AuthError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::AlreadyExists(what) => AuthError::AlreadyExists(what),
            RepositoryError::NotFound(what) => AuthError::NotFound(what),
            RepositoryError::Database(e) => AuthError::Storage(e.to_string()),
            RepositoryError::Corrupt(msg) => AuthError::Storage(msg),
        }
    }
}

impl From<jsonwebtoken::errors::Error> for AuthError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        use jsonwebtoken::errors::ErrorKind;

        match err.kind() {
            ErrorKind::InvalidSignature
            | ErrorKind::InvalidAlgorithm
            | ErrorKind::InvalidAlgorithmName => AuthError::SignatureMismatch,
            ErrorKind::ExpiredSignature => AuthError::ExpiredCredential,
            _ => AuthError::MalformedCredential("unparsable token".to_string()),
        }
    }
}
