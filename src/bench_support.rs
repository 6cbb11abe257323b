use std::net::TcpListener;
use std::sync::Arc;
use std::time::Duration;

use catalog_relay_http::access::{
    AccessGate, AccessStore, AllowListEntry, Role, VerificationPolicy,
};
use catalog_relay_http::config::RelayConfig;
use catalog_relay_init_data::InitDataVerifier;
use serde_json::{json, Value};

pub use catalog_relay_http;
pub use catalog_relay_init_data;
pub use serde_json;

pub const BENCH_BOT_TOKEN: &str = "7000000000:AABenchTokenNotForProduction";

/// An access gate seeded with `population` allow-listed identities and a
/// signed credential for the first of them.
pub struct AccessBenchFixture {
    pub gate: Arc<AccessGate>,
    pub store: Arc<AccessStore>,
    pub verifier: InitDataVerifier,
    pub identity_id: i64,
    pub init_data: String,
}

impl AccessBenchFixture {
    pub fn new(population: i64) -> Self {
        let entries = (1..=population.max(1)).map(|identity_id| AllowListEntry {
            identity_id,
            username: Some(format!("user{identity_id}")),
            display_name: format!("Bench User {identity_id}"),
            role: Role::User,
        });
        let store = Arc::new(AccessStore::with_entries(entries));

        let verifier = InitDataVerifier::new(BENCH_BOT_TOKEN).expect("bench verifier");
        let policy = VerificationPolicy::Strict(
            InitDataVerifier::new(BENCH_BOT_TOKEN).expect("bench verifier"),
        );
        let gate = Arc::new(AccessGate::new(
            Arc::clone(&store),
            Arc::new(policy),
            Duration::from_secs(300),
        ));

        let identity_id = 1;
        let init_data = signed_init_data(&verifier, identity_id);

        Self {
            gate,
            store,
            verifier,
            identity_id,
            init_data,
        }
    }
}

pub fn signed_init_data(verifier: &InitDataVerifier, identity_id: i64) -> String {
    verifier
        .sign(&[
            ("auth_date", &chrono::Utc::now().timestamp().to_string()),
            ("query_id", "AAHbench"),
            (
                "user",
                &format!(r#"{{"id":{identity_id},"first_name":"Bench","language_code":"en"}}"#),
            ),
        ])
        .expect("sign bench init data")
}

/// Catalog envelope in the nested layout with a realistic number of sizes
/// and warehouse stocks.
pub fn sample_envelope(product_id: u64) -> Value {
    let stocks: Vec<Value> = (0..12)
        .map(|n| json!({"wh": 500 + n, "qty": n * 3}))
        .collect();

    json!({
        "state": 0,
        "data": {
            "products": [{
                "id": product_id,
                "name": "Running shoes",
                "brand": "Acme",
                "supplier": "Acme Trading",
                "supplierId": 4410,
                "supplierRating": 4.8,
                "rating": 4.7,
                "feedbacks": 812,
                "totalQuantity": 160,
                "sizes": [{
                    "name": "42",
                    "price": {"basic": 1_299_900, "product": 899_900},
                    "stocks": stocks
                }]
            }]
        }
    })
}

/// Relay configuration pointed at `upstream_url` on a free local port.
pub fn bench_relay_config(upstream_url: String) -> RelayConfig {
    RelayConfig {
        host: "127.0.0.1".to_string(),
        port: unused_port(),
        catalog_api_url: upstream_url.clone(),
        local_api_url: upstream_url,
        bot_token: Some(BENCH_BOT_TOKEN.to_string()),
        log_level: "error".to_string(),
        ..RelayConfig::default()
    }
}

pub fn unused_port() -> u16 {
    TcpListener::bind("127.0.0.1:0")
        .expect("bind ephemeral port")
        .local_addr()
        .expect("local addr")
        .port()
}
