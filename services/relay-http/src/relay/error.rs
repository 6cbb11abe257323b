use axum::http::StatusCode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RelayError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Upstream returned status {status}")]
    UpstreamStatus { status: u16 },

    #[error("Upstream returned a body that is not valid JSON")]
    MalformedUpstream { preview: String },

    #[error("Unrecognized upstream data structure")]
    UnrecognizedShape { keys: Vec<String> },

    #[error("{0}")]
    NotFound(String),

    #[error("Upstream request timed out")]
    Timeout,

    #[error("Failed to connect to upstream: {0}")]
    Connection(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<reqwest::Error> for RelayError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            RelayError::Timeout
        } else if err.is_builder() {
            RelayError::Internal(err.to_string())
        } else {
            RelayError::Connection(err.to_string())
        }
    }
}

impl RelayError {
    pub fn to_status_code(&self) -> StatusCode {
        match self {
            RelayError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            RelayError::UpstreamStatus { .. }
            | RelayError::MalformedUpstream { .. }
            | RelayError::UnrecognizedShape { .. } => StatusCode::BAD_GATEWAY,
            RelayError::NotFound(_) => StatusCode::NOT_FOUND,
            RelayError::Timeout => StatusCode::GATEWAY_TIMEOUT,
            RelayError::Connection(_) => StatusCode::SERVICE_UNAVAILABLE,
            RelayError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(
            RelayError::InvalidInput("nmId".into()).to_status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            RelayError::UpstreamStatus { status: 429 }.to_status_code(),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            RelayError::UnrecognizedShape { keys: vec![] }.to_status_code(),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            RelayError::NotFound("gone".into()).to_status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(RelayError::Timeout.to_status_code(), StatusCode::GATEWAY_TIMEOUT);
        assert_eq!(
            RelayError::Connection("refused".into()).to_status_code(),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }
}
