use std::time::{Duration, Instant};

use reqwest::Client;
use serde::Serialize;
use serde_json::{json, Map, Value};
use tracing::{debug, info, instrument, warn};

use super::{parse_json_body, RelayError};

pub const LOCAL_RAW_PATH: &str = "/nmInfo";
pub const LOCAL_HEALTH_PATH: &str = "/health";
pub const LOCAL_SOURCE: &str = "local_api";

#[derive(Debug, Clone, Serialize)]
pub struct LocalProbe {
    pub upstream_url: String,
    pub upstream_status: u16,
    pub latency_ms: u64,
    pub tls_verification: bool,
}

/// Client for the API on the local network. It serves a self-signed
/// certificate, so certificate validation can be switched off explicitly.
pub struct LocalApiClient {
    http_client: Client,
    local_base_url: String,
    accept_invalid_certs: bool,
}

impl LocalApiClient {
    pub fn new(
        local_url: String,
        timeout: Duration,
        accept_invalid_certs: bool,
    ) -> anyhow::Result<Self> {
        if accept_invalid_certs {
            warn!(
                local_url = %local_url,
                "TLS certificate validation is DISABLED for the local API"
            );
        }

        let http_client = Client::builder()
            .timeout(timeout)
            .danger_accept_invalid_certs(accept_invalid_certs)
            .build()?;

        Ok(Self {
            http_client,
            local_base_url: local_url.trim_end_matches('/').to_string(),
            accept_invalid_certs,
        })
    }

    pub fn raw_url(&self, nm_id: u64) -> String {
        format!("{}{}?nmId={}", self.local_base_url, LOCAL_RAW_PATH, nm_id)
    }

    /// Pass the upstream JSON through untouched, tagged with `_metadata`.
    #[instrument(skip(self))]
    pub async fn fetch_raw(&self, nm_id: u64) -> Result<Value, RelayError> {
        let url = self.raw_url(nm_id);
        debug!(upstream_url = %url, "Requesting local API");

        let start = Instant::now();
        let response = self.http_client.get(&url).send().await.map_err(|err| {
            warn!(error = %err, timeout = err.is_timeout(), "Local API request failed");
            RelayError::from(err)
        })?;

        let status = response.status();
        info!(
            status = status.as_u16(),
            latency_ms = start.elapsed().as_millis(),
            "Local API response received"
        );

        if !status.is_success() {
            return Err(RelayError::UpstreamStatus {
                status: status.as_u16(),
            });
        }

        let body = response.text().await?;
        let payload = parse_json_body(&body)?;

        let metadata = json!({
            "source": LOCAL_SOURCE,
            "status": status.as_u16(),
            "upstream_url": url,
            "requested_id": nm_id,
        });

        Ok(with_metadata(payload, metadata))
    }

    /// Any HTTP answer counts as reachable; only transport failures are errors.
    #[instrument(skip(self))]
    pub async fn probe(&self) -> Result<LocalProbe, RelayError> {
        let url = format!("{}{}", self.local_base_url, LOCAL_HEALTH_PATH);
        let start = Instant::now();
        let response = self.http_client.get(&url).send().await?;

        Ok(LocalProbe {
            upstream_url: url,
            upstream_status: response.status().as_u16(),
            latency_ms: start.elapsed().as_millis() as u64,
            tls_verification: !self.accept_invalid_certs,
        })
    }
}

fn with_metadata(payload: Value, metadata: Value) -> Value {
    match payload {
        Value::Object(mut map) => {
            map.insert("_metadata".to_string(), metadata);
            Value::Object(map)
        }
        other => {
            let mut map = Map::new();
            map.insert("value".to_string(), other);
            map.insert("_metadata".to_string(), metadata);
            Value::Object(map)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_object_payload_gets_metadata_key() {
        let merged = with_metadata(json!({"nmId": 5, "kp": 12}), json!({"source": "local_api"}));

        assert_eq!(
            merged,
            json!({"nmId": 5, "kp": 12, "_metadata": {"source": "local_api"}})
        );
    }

    #[test]
    fn test_non_object_payload_is_wrapped() {
        let merged = with_metadata(json!([1, 2]), json!({"source": "local_api"}));

        assert_eq!(
            merged,
            json!({"value": [1, 2], "_metadata": {"source": "local_api"}})
        );
    }

    #[test]
    fn test_raw_url() {
        let client =
            LocalApiClient::new("https://10.0.0.5:8443/".to_string(), Duration::from_secs(1), true)
                .unwrap();

        assert_eq!(client.raw_url(17), "https://10.0.0.5:8443/nmInfo?nmId=17");
    }
}
