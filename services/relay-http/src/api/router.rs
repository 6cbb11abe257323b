use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::{HeaderName, HeaderValue},
    middleware::{self, Next},
    response::Response,
    routing::{get, post},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use subtle::ConstantTimeEq;
use tracing::warn;
use uuid::Uuid;

use crate::access::ACCESS_AUDIT_TARGET;

use super::handlers;
use super::{ApiError, ApiState};

const REQUEST_ID_HEADER: HeaderName = HeaderName::from_static("x-request-id");
pub const ADMIN_TOKEN_HEADER: HeaderName = HeaderName::from_static("x-admin-token");

pub fn create_router(state: Arc<ApiState>) -> Router {
    let admin = Router::new()
        .route("/api/admin/add-user", post(handlers::add_user))
        .route("/api/admin/users", get(handlers::list_users))
        .route_layer(middleware::from_fn_with_state(
            Arc::clone(&state),
            require_admin_token,
        ));

    Router::new()
        .route("/", get(handlers::home))
        .route("/api/health", get(handlers::health_check))
        .route("/api/product/:product_id", get(handlers::get_product))
        .route("/api/wb/product", get(handlers::get_extended_product))
        .route("/api/local/raw/nmInfo", get(handlers::get_local_raw))
        .route("/api/local/health", get(handlers::local_health))
        .route("/api/debug/wb", get(handlers::debug_catalog))
        .route("/api/check-access", post(handlers::check_access))
        .merge(admin)
        .with_state(state)
        .layer(middleware::from_fn(set_request_id))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

async fn require_admin_token(
    State(state): State<Arc<ApiState>>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    if let Some(expected) = state.config.admin_api_token.as_deref() {
        let provided = request
            .headers()
            .get(&ADMIN_TOKEN_HEADER)
            .and_then(|value| value.to_str().ok());

        if !token_matches(provided, expected) {
            warn!(
                target: ACCESS_AUDIT_TARGET,
                path = %request.uri().path(),
                "admin request rejected"
            );
            return Err(ApiError::AdminUnauthorized);
        }
    }

    Ok(next.run(request).await)
}

fn token_matches(provided: Option<&str>, expected: &str) -> bool {
    provided.is_some_and(|provided| bool::from(provided.as_bytes().ct_eq(expected.as_bytes())))
}

async fn set_request_id(mut request: Request, next: Next) -> Response {
    let request_id = Uuid::new_v4().to_string();
    request.extensions_mut().insert(request_id.clone());

    if let Ok(header_value) = HeaderValue::from_str(&request_id) {
        request
            .headers_mut()
            .insert(REQUEST_ID_HEADER.clone(), header_value);
    }

    let mut response = next.run(request).await;

    if !response.headers().contains_key(&REQUEST_ID_HEADER) {
        if let Ok(header_value) = HeaderValue::from_str(&request_id) {
            response
                .headers_mut()
                .insert(REQUEST_ID_HEADER.clone(), header_value);
        }
    }

    response
}
