use axum::http::StatusCode;
use catalog_relay_init_data::InitDataError;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AccessError {
    #[error("user_id must be a positive integer, got {0}")]
    InvalidIdentity(i64),

    #[error("unknown role: {0}")]
    InvalidRole(String),

    #[error("init data is missing")]
    MissingCredential,

    #[error("invalid init data: {0}")]
    InvalidCredential(#[from] InitDataError),

    #[error("init data belongs to user {actual}, not {expected}")]
    IdentityMismatch { expected: i64, actual: i64 },

    #[error("init data verification is not configured")]
    VerificationUnavailable,
}

impl AccessError {
    pub fn to_status_code(&self) -> StatusCode {
        match self {
            AccessError::InvalidIdentity(_) | AccessError::InvalidRole(_) => {
                StatusCode::BAD_REQUEST
            }
            AccessError::MissingCredential
            | AccessError::InvalidCredential(_)
            | AccessError::IdentityMismatch { .. }
            | AccessError::VerificationUnavailable => StatusCode::FORBIDDEN,
        }
    }
}
