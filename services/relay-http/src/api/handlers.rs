use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use serde_json::{json, Value};
use tracing::{info, instrument};

use crate::access::{AllowListEntry, Role};
use crate::relay::{CatalogDiagnostics, LocalProbe, ProductSummary, RelayError};

use super::types::{
    AddUserRequest, AddUserResponse, CheckAccessRequest, CheckAccessResponse,
    ExtendedProductResponse, HealthResponse, ListUsersResponse, NmIdQuery, ProductMetadata,
};
use super::{ApiError, ApiState, SERVICE_NAME};

type ApiResult<T> = Result<Json<T>, ApiError>;

pub async fn home() -> Json<Value> {
    Json(json!({
        "message": "Catalog relay for the mini-app",
        "endpoints": {
            "health": "/api/health",
            "product": "/api/product/<id>",
            "extended_product": "/api/wb/product?nmId=<id>",
            "local_raw": "/api/local/raw/nmInfo?nmId=<id>",
            "local_health": "/api/local/health",
            "check_access": "/api/check-access",
            "debug": "/api/debug/wb"
        }
    }))
}

pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        service: SERVICE_NAME,
        timestamp: Utc::now(),
    })
}

#[instrument(skip(state))]
pub async fn get_product(
    State(state): State<Arc<ApiState>>,
    Path(product_id): Path<String>,
) -> ApiResult<ProductSummary> {
    let product_id = parse_product_id(Some(&product_id), "product id")?;
    let summary = state.catalog_client.fetch_product(product_id).await?;
    Ok(Json(summary))
}

#[instrument(skip(state, query))]
pub async fn get_extended_product(
    State(state): State<Arc<ApiState>>,
    Query(query): Query<NmIdQuery>,
) -> ApiResult<ExtendedProductResponse> {
    let product_id = parse_product_id(query.nm_id.as_deref(), "nmId")?;
    let product = state.catalog_client.fetch_extended(product_id).await?;

    Ok(Json(ExtendedProductResponse {
        product,
        metadata: ProductMetadata {
            source: "catalog",
            requested_id: product_id,
            upstream_url: state.catalog_client.product_url(product_id),
            fetched_at: Utc::now(),
        },
    }))
}

#[instrument(skip(state, query))]
pub async fn get_local_raw(
    State(state): State<Arc<ApiState>>,
    Query(query): Query<NmIdQuery>,
) -> ApiResult<Value> {
    let nm_id = parse_product_id(query.nm_id.as_deref(), "nmId")?;
    let payload = state.local_client.fetch_raw(nm_id).await?;
    Ok(Json(payload))
}

pub async fn local_health(State(state): State<Arc<ApiState>>) -> ApiResult<Value> {
    let probe: LocalProbe = state.local_client.probe().await?;

    Ok(Json(json!({
        "status": "ok",
        "service": SERVICE_NAME,
        "local_api": probe,
    })))
}

pub async fn debug_catalog(State(state): State<Arc<ApiState>>) -> ApiResult<CatalogDiagnostics> {
    let diagnostics = state
        .catalog_client
        .diagnose(state.config.debug_product_id)
        .await?;
    Ok(Json(diagnostics))
}

#[instrument(skip(state, payload))]
pub async fn check_access(
    State(state): State<Arc<ApiState>>,
    payload: Result<Json<CheckAccessRequest>, JsonRejection>,
) -> (StatusCode, Json<CheckAccessResponse>) {
    let request = match payload {
        Ok(Json(request)) => request,
        Err(rejection) => return access_error(StatusCode::BAD_REQUEST, rejection.body_text()),
    };

    let Some(user_id) = request.user_id else {
        return access_error(StatusCode::BAD_REQUEST, "user_id is required".to_string());
    };

    match state
        .access_gate
        .check_access(user_id, request.init_data.as_deref())
    {
        Ok(decision) if decision.granted => (
            StatusCode::OK,
            Json(CheckAccessResponse {
                access: true,
                user: decision.entry,
                error: None,
            }),
        ),
        Ok(decision) => access_error(
            StatusCode::FORBIDDEN,
            decision
                .reason
                .map(|reason| reason.to_string())
                .unwrap_or_else(|| "access denied".to_string()),
        ),
        Err(err) => access_error(err.to_status_code(), err.to_string()),
    }
}

#[instrument(skip(state, payload))]
pub async fn add_user(
    State(state): State<Arc<ApiState>>,
    payload: Result<Json<AddUserRequest>, JsonRejection>,
) -> ApiResult<AddUserResponse> {
    let Json(request) = payload.map_err(|rejection| ApiError::BadRequest(rejection.body_text()))?;

    let identity_id = request
        .user_id
        .ok_or_else(|| ApiError::BadRequest("user_id is required".to_string()))?;

    let role = match request.role.as_deref() {
        Some(role) => role.parse::<Role>()?,
        None => Role::default(),
    };

    let username = request.username.filter(|name| !name.trim().is_empty());
    let display_name = request
        .name
        .filter(|name| !name.trim().is_empty())
        .or_else(|| username.clone())
        .unwrap_or_else(|| format!("User {identity_id}"));

    let user = state.access_gate.add_entry(AllowListEntry {
        identity_id,
        username,
        display_name,
        role,
    })?;

    info!(identity_id, "user added via admin API");
    Ok(Json(AddUserResponse {
        success: true,
        user,
    }))
}

pub async fn list_users(State(state): State<Arc<ApiState>>) -> Json<ListUsersResponse> {
    let users = state.access_gate.entries();
    let count = users.len();
    Json(ListUsersResponse { users, count })
}

fn parse_product_id(raw: Option<&str>, name: &str) -> Result<u64, RelayError> {
    let raw = raw
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .ok_or_else(|| RelayError::InvalidInput(format!("{name} is required")))?;

    raw.parse::<u64>()
        .ok()
        .filter(|id| *id > 0)
        .ok_or_else(|| RelayError::InvalidInput(format!("{name} must be a positive integer")))
}

fn access_error(status: StatusCode, message: String) -> (StatusCode, Json<CheckAccessResponse>) {
    (
        status,
        Json(CheckAccessResponse {
            access: false,
            user: None,
            error: Some(message),
        }),
    )
}
