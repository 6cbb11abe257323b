use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum InitDataError {
    #[error("init data is empty")]
    Empty,

    #[error("init data contains duplicate field: {0}")]
    DuplicateField(String),

    #[error("init data has no hash field")]
    MissingHash,

    #[error("hash field is not valid hex")]
    InvalidHashEncoding,

    #[error("signature mismatch")]
    SignatureMismatch,

    #[error("invalid signing key: {0}")]
    InvalidKey(String),

    #[error("invalid user field: {0}")]
    InvalidUser(String),

    #[error("invalid auth_date field: {0}")]
    InvalidAuthDate(String),

    #[error("init data expired: issued {age_secs}s ago, limit {max_age_secs}s")]
    Expired { age_secs: i64, max_age_secs: i64 },
}
