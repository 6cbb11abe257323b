use std::sync::Arc;

use anyhow::Context;
use catalog_relay_init_data::InitDataVerifier;
use tracing::warn;

pub mod error;
pub mod handlers;
pub mod router;
pub mod types;

pub use error::ApiError;
pub use router::create_router;
pub use types::*;

use crate::access::{AccessGate, AccessStore, VerificationPolicy};
use crate::config::RelayConfig;
use crate::relay::{CatalogClient, LocalApiClient};

pub const SERVICE_NAME: &str = "catalog-relay";

pub struct ApiState {
    pub config: Arc<RelayConfig>,
    pub access_gate: Arc<AccessGate>,
    pub catalog_client: Arc<CatalogClient>,
    pub local_client: Arc<LocalApiClient>,
}

impl ApiState {
    pub fn new(config: RelayConfig) -> anyhow::Result<Self> {
        let policy = verification_policy(&config)?;
        let store = Arc::new(AccessStore::with_entries(config.allowed_users.clone()));
        let access_gate = Arc::new(AccessGate::new(
            store,
            Arc::new(policy),
            std::time::Duration::from_secs(config.access_cache_ttl_secs),
        ));

        let catalog_client = Arc::new(
            CatalogClient::new(config.catalog_api_url.clone(), config.request_timeout())
                .context("Failed to build catalog client")?,
        );
        let local_client = Arc::new(
            LocalApiClient::new(
                config.local_api_url.clone(),
                config.request_timeout(),
                config.local_api_accept_invalid_certs,
            )
            .context("Failed to build local API client")?,
        );

        Ok(Self {
            config: Arc::new(config),
            access_gate,
            catalog_client,
            local_client,
        })
    }
}

fn verification_policy(config: &RelayConfig) -> anyhow::Result<VerificationPolicy> {
    if let Some(token) = config.bot_token.as_deref() {
        let max_age = (config.init_data_max_age_secs > 0)
            .then(|| chrono::Duration::seconds(config.init_data_max_age_secs as i64));
        let verifier = InitDataVerifier::new(token)
            .context("Invalid BOT_TOKEN")?
            .with_max_age(max_age);
        return Ok(VerificationPolicy::Strict(verifier));
    }

    if config.verification_fails_open() {
        warn!(
            "BOT_TOKEN is not set and INSECURE_SKIP_INIT_DATA_VERIFICATION is enabled: \
             access checks accept unsigned init data"
        );
        Ok(VerificationPolicy::InsecureFailOpen)
    } else {
        warn!("BOT_TOKEN is not set: every access check will be denied");
        Ok(VerificationPolicy::Unconfigured)
    }
}
