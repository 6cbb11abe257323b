use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use url::Url;

use crate::access::{AllowListEntry, Role};

pub const DEFAULT_CATALOG_API_URL: &str = "https://card.wb.ru";
pub const DEFAULT_LOCAL_API_URL: &str = "https://localhost:8443";
pub const DEFAULT_DEBUG_PRODUCT_ID: u64 = 205886056;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelayConfig {
    /// Listen host address
    pub host: String,

    /// Listen port
    pub port: u16,

    /// Catalog API base URL
    pub catalog_api_url: String,

    /// Local network API base URL
    pub local_api_url: String,

    /// Skip TLS certificate validation for the local API (self-signed certs)
    pub local_api_accept_invalid_certs: bool,

    /// Outbound request timeout in seconds
    pub request_timeout_secs: u64,

    /// Bot token used to verify init data signatures
    #[serde(skip_serializing)]
    pub bot_token: Option<String>,

    /// Accept unverifiable init data when no bot token is configured
    pub insecure_skip_verification: bool,

    /// Maximum init data age in seconds, 0 disables the check
    pub init_data_max_age_secs: u64,

    /// Freshness window for cached access decisions
    pub access_cache_ttl_secs: u64,

    /// Allow-list loaded at startup
    pub allowed_users: Vec<AllowListEntry>,

    /// Token required on admin routes when set
    #[serde(skip_serializing)]
    pub admin_api_token: Option<String>,

    /// Product queried by the catalog diagnostics route
    pub debug_product_id: u64,

    /// Log level
    pub log_level: String,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5000,
            catalog_api_url: DEFAULT_CATALOG_API_URL.to_string(),
            local_api_url: DEFAULT_LOCAL_API_URL.to_string(),
            local_api_accept_invalid_certs: false,
            request_timeout_secs: 10,
            bot_token: None,
            insecure_skip_verification: false,
            init_data_max_age_secs: 86_400,
            access_cache_ttl_secs: crate::access::DEFAULT_DECISION_TTL_SECS,
            allowed_users: Vec::new(),
            admin_api_token: None,
            debug_product_id: DEFAULT_DEBUG_PRODUCT_ID,
            log_level: "info".to_string(),
        }
    }
}

impl RelayConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let mut cfg = Self::default();

        if let Ok(host) = std::env::var("RELAY_HOST") {
            cfg.host = host;
        }
        if let Ok(port) = std::env::var("PORT") {
            cfg.port = port.parse().context("Invalid PORT")?;
        }
        if let Ok(url) = std::env::var("CATALOG_API_URL") {
            cfg.catalog_api_url = url;
        }
        if let Ok(url) = std::env::var("LOCAL_API_URL") {
            cfg.local_api_url = url;
        }
        if let Ok(flag) = std::env::var("LOCAL_API_ACCEPT_INVALID_CERTS") {
            cfg.local_api_accept_invalid_certs = parse_bool(&flag)
                .with_context(|| format!("LOCAL_API_ACCEPT_INVALID_CERTS is invalid: {flag}"))?;
        }
        if let Ok(timeout) = std::env::var("REQUEST_TIMEOUT_SECS") {
            cfg.request_timeout_secs = timeout.parse().context("Invalid REQUEST_TIMEOUT_SECS")?;
        }

        cfg.bot_token = std::env::var("BOT_TOKEN")
            .ok()
            .filter(|token| !token.trim().is_empty());

        if let Ok(flag) = std::env::var("INSECURE_SKIP_INIT_DATA_VERIFICATION") {
            cfg.insecure_skip_verification = parse_bool(&flag).with_context(|| {
                format!("INSECURE_SKIP_INIT_DATA_VERIFICATION is invalid: {flag}")
            })?;
        }
        if let Ok(max_age) = std::env::var("INIT_DATA_MAX_AGE_SECS") {
            cfg.init_data_max_age_secs = max_age
                .parse()
                .context("Invalid INIT_DATA_MAX_AGE_SECS")?;
        }
        if let Ok(ttl) = std::env::var("ACCESS_CACHE_TTL_SECS") {
            cfg.access_cache_ttl_secs = ttl.parse().context("Invalid ACCESS_CACHE_TTL_SECS")?;
        }
        if let Ok(users) = std::env::var("ALLOWED_USERS") {
            cfg.allowed_users = parse_allowed_users(&users).context("Invalid ALLOWED_USERS")?;
        }

        cfg.admin_api_token = std::env::var("ADMIN_API_TOKEN")
            .ok()
            .filter(|token| !token.trim().is_empty());

        if let Ok(id) = std::env::var("DEBUG_PRODUCT_ID") {
            cfg.debug_product_id = id.parse().context("Invalid DEBUG_PRODUCT_ID")?;
        }
        if let Ok(level) = std::env::var("LOG_LEVEL") {
            cfg.log_level = level;
        }

        Ok(cfg)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        validate_url("CATALOG_API_URL", &self.catalog_api_url)?;
        validate_url("LOCAL_API_URL", &self.local_api_url)?;

        if self.request_timeout_secs == 0 {
            anyhow::bail!("REQUEST_TIMEOUT_SECS must be greater than 0");
        }

        if self.access_cache_ttl_secs == 0 {
            anyhow::bail!("ACCESS_CACHE_TTL_SECS must be greater than 0");
        }

        for entry in &self.allowed_users {
            if entry.identity_id <= 0 {
                anyhow::bail!(
                    "ALLOWED_USERS contains non-positive user id {}",
                    entry.identity_id
                );
            }
        }

        Ok(())
    }

    /// Get request timeout as Duration
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Get the listen address
    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Verification is skipped only when no bot token is present and the
    /// operator opted in explicitly.
    pub fn verification_fails_open(&self) -> bool {
        self.bot_token.is_none() && self.insecure_skip_verification
    }
}

fn validate_url(name: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        anyhow::bail!("{name} cannot be empty");
    }
    Url::parse(value).with_context(|| format!("{name} is not a valid URL: {value}"))?;
    Ok(())
}

fn parse_bool(value: &str) -> Result<bool> {
    match value.to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "y" => Ok(true),
        "false" | "0" | "no" | "n" => Ok(false),
        _ => anyhow::bail!("invalid boolean value {value}"),
    }
}

/// Parse `id:name:role[:username]` entries separated by commas.
fn parse_allowed_users(value: &str) -> Result<Vec<AllowListEntry>> {
    value
        .split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(|item| {
            let parts: Vec<&str> = item.split(':').map(str::trim).collect();
            if !(3..=4).contains(&parts.len()) {
                anyhow::bail!("expected id:name:role[:username], got {item}");
            }

            let identity_id = parts[0]
                .parse()
                .with_context(|| format!("invalid user id in {item}"))?;
            let role: Role = parts[2].parse()?;
            let username = parts
                .get(3)
                .filter(|name| !name.is_empty())
                .map(|name| name.to_string());

            Ok(AllowListEntry {
                identity_id,
                username,
                display_name: parts[1].to_string(),
                role,
            })
        })
        .collect()
}
