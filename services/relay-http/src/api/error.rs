use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::{error, warn};

use crate::access::AccessError;
use crate::relay::RelayError;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Relay(#[from] RelayError),

    #[error(transparent)]
    Access(#[from] AccessError),

    #[error("{0}")]
    BadRequest(String),

    #[error("Admin token missing or invalid")]
    AdminUnauthorized,
}

impl ApiError {
    pub fn to_status_code(&self) -> StatusCode {
        match self {
            ApiError::Relay(err) => err.to_status_code(),
            ApiError::Access(err) => err.to_status_code(),
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::AdminUnauthorized => StatusCode::FORBIDDEN,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.to_status_code();

        let mut body = json!({
            "error": self.to_string(),
            "status_code": status.as_u16(),
        });

        match &self {
            ApiError::Relay(RelayError::UpstreamStatus { status }) => {
                body["upstream_status"] = json!(status);
            }
            ApiError::Relay(RelayError::MalformedUpstream { preview }) => {
                body["response_preview"] = json!(preview);
            }
            ApiError::Relay(RelayError::UnrecognizedShape { keys }) => {
                body["data_structure"] = json!(keys);
            }
            _ => {}
        }

        if status.is_server_error() {
            error!(status = status.as_u16(), error = %self, "request failed");
        } else {
            warn!(status = status.as_u16(), error = %self, "request rejected");
        }

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    async fn body_of(err: ApiError) -> (StatusCode, serde_json::Value) {
        let response = err.into_response();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_unrecognized_shape_body() {
        let (status, body) = body_of(
            RelayError::UnrecognizedShape {
                keys: vec!["foo".to_string()],
            }
            .into(),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(body["data_structure"], json!(["foo"]));
        assert_eq!(body["status_code"], json!(502));
    }

    #[tokio::test]
    async fn test_upstream_status_body() {
        let (status, body) = body_of(RelayError::UpstreamStatus { status: 429 }.into()).await;

        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(body["upstream_status"], json!(429));
        assert_eq!(body["error"], json!("Upstream returned status 429"));
    }

    #[tokio::test]
    async fn test_timeout_body() {
        let (status, body) = body_of(RelayError::Timeout.into()).await;

        assert_eq!(status, StatusCode::GATEWAY_TIMEOUT);
        assert_eq!(body["status_code"], json!(504));
    }
}
