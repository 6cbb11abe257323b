use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::access::AllowListEntry;
use crate::relay::ExtendedProduct;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NmIdQuery {
    #[serde(rename = "nmId")]
    pub nm_id: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProductMetadata {
    pub source: &'static str,
    pub requested_id: u64,
    pub upstream_url: String,
    pub fetched_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ExtendedProductResponse {
    pub product: ExtendedProduct,
    #[serde(rename = "_metadata")]
    pub metadata: ProductMetadata,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckAccessRequest {
    pub user_id: Option<i64>,
    #[serde(rename = "initData")]
    pub init_data: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckAccessResponse {
    pub access: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<AllowListEntry>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddUserRequest {
    pub user_id: Option<i64>,
    pub username: Option<String>,
    pub name: Option<String>,
    pub role: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddUserResponse {
    pub success: bool,
    pub user: AllowListEntry,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListUsersResponse {
    pub users: Vec<AllowListEntry>,
    pub count: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: &'static str,
    pub timestamp: DateTime<Utc>,
}
