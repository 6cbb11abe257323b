use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, ORIGIN, REFERER, USER_AGENT};
use reqwest::Client;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, instrument, warn};

use super::{
    parse_json_body, preview, resolve_product, ExtendedProduct, ProductSummary, RelayError,
    DIAGNOSTIC_PREVIEW_CHARS,
};

pub const CATALOG_DETAIL_PATH: &str = "/cards/v4/detail";
const CATALOG_QUERY: &str = "appType=1&curr=rub&dest=-1257786&spp=30";

/// Snapshot of a raw catalog exchange, used to debug upstream changes.
#[derive(Debug, Clone, Serialize)]
pub struct CatalogDiagnostics {
    pub status_code: u16,
    pub url: String,
    pub headers: BTreeMap<String, String>,
    pub content_type: Option<String>,
    pub content_length: usize,
    pub content_preview: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub json_structure: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub json_error: Option<String>,
}

pub struct CatalogClient {
    http_client: Client,
    catalog_base_url: String,
}

impl CatalogClient {
    pub fn new(catalog_url: String, timeout: Duration) -> anyhow::Result<Self> {
        let http_client = Client::builder()
            .timeout(timeout)
            .default_headers(browser_headers())
            .pool_max_idle_per_host(10)
            .build()?;

        Ok(Self {
            http_client,
            catalog_base_url: catalog_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn product_url(&self, product_id: u64) -> String {
        format!(
            "{}{}?{}&nm={}",
            self.catalog_base_url, CATALOG_DETAIL_PATH, CATALOG_QUERY, product_id
        )
    }

    #[instrument(skip(self))]
    pub async fn fetch_product(&self, product_id: u64) -> Result<ProductSummary, RelayError> {
        let envelope = self.fetch_envelope(product_id).await?;
        let product = resolve_product(&envelope)?;
        let summary = ProductSummary::from_product(product, product_id);

        info!(name = %summary.name, "product fetched");
        Ok(summary)
    }

    #[instrument(skip(self))]
    pub async fn fetch_extended(&self, product_id: u64) -> Result<ExtendedProduct, RelayError> {
        let envelope = self.fetch_envelope(product_id).await?;
        let product = resolve_product(&envelope)?;
        let extended = ExtendedProduct::from_product(product, product_id);

        info!(
            name = %extended.summary.name,
            warehouses = extended.warehouses.len(),
            "extended product fetched"
        );
        Ok(extended)
    }

    /// Fetch a product without interpreting the response. Upstream status
    /// codes are reported rather than treated as errors.
    #[instrument(skip(self))]
    pub async fn diagnose(&self, product_id: u64) -> Result<CatalogDiagnostics, RelayError> {
        let url = self.product_url(product_id);
        let response = self.http_client.get(&url).send().await?;

        let status_code = response.status().as_u16();
        let headers: BTreeMap<String, String> = response
            .headers()
            .iter()
            .map(|(name, value)| {
                (
                    name.as_str().to_string(),
                    String::from_utf8_lossy(value.as_bytes()).into_owned(),
                )
            })
            .collect();
        let content_type = headers.get("content-type").cloned();
        let body = response.text().await?;

        let mut diagnostics = CatalogDiagnostics {
            status_code,
            url,
            headers,
            content_type: content_type.clone(),
            content_length: body.len(),
            content_preview: if body.is_empty() {
                "Empty response".to_string()
            } else {
                preview(&body, DIAGNOSTIC_PREVIEW_CHARS)
            },
            json_structure: None,
            json_error: None,
        };

        if content_type.is_some_and(|ct| ct.contains("application/json")) {
            match serde_json::from_str::<Value>(&body) {
                Ok(json) => {
                    diagnostics.json_structure = Some(
                        json.as_object()
                            .map(|map| map.keys().cloned().collect())
                            .unwrap_or_default(),
                    );
                }
                Err(err) => diagnostics.json_error = Some(err.to_string()),
            }
        }

        Ok(diagnostics)
    }

    async fn fetch_envelope(&self, product_id: u64) -> Result<Value, RelayError> {
        let url = self.product_url(product_id);
        debug!(upstream_url = %url, "Requesting catalog");

        let start = Instant::now();
        let response = self.http_client.get(&url).send().await.map_err(|err| {
            warn!(error = %err, timeout = err.is_timeout(), "Catalog request failed");
            RelayError::from(err)
        })?;

        let status = response.status();
        info!(
            status = status.as_u16(),
            latency_ms = start.elapsed().as_millis(),
            "Catalog response received"
        );

        if !status.is_success() {
            return Err(RelayError::UpstreamStatus {
                status: status.as_u16(),
            });
        }

        let body = response.text().await?;
        parse_json_body(&body).map_err(|err| {
            warn!(body_len = body.len(), "Catalog returned non-JSON body");
            err
        })
    }
}

// The catalog only answers requests that look like they come from its storefront.
fn browser_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(
        USER_AGENT,
        HeaderValue::from_static(
            "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/117.0.0.0 Safari/537.36",
        ),
    );
    headers.insert(ACCEPT, HeaderValue::from_static("application/json, text/plain, */*"));
    headers.insert(
        ACCEPT_LANGUAGE,
        HeaderValue::from_static("ru-RU,ru;q=0.9,en-US;q=0.8,en;q=0.7"),
    );
    headers.insert(REFERER, HeaderValue::from_static("https://www.wildberries.ru/"));
    headers.insert(ORIGIN, HeaderValue::from_static("https://www.wildberries.ru"));
    headers.insert("sec-fetch-dest", HeaderValue::from_static("empty"));
    headers.insert("sec-fetch-mode", HeaderValue::from_static("cors"));
    headers.insert("sec-fetch-site", HeaderValue::from_static("same-site"));
    headers
}
