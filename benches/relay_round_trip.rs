use std::time::Duration;

use catalog_relay_hub::bench_support::{bench_relay_config, sample_envelope};
use catalog_relay_http::server::RelayServer;
use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use reqwest::Client;
use tokio::runtime::Runtime;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const PRODUCT_ID: u64 = 205886056;

fn bench_product_round_trip(c: &mut Criterion) {
    let runtime = Runtime::new().expect("runtime");
    let mut group = c.benchmark_group("relay_round_trip");
    group
        .sample_size(200)
        .measurement_time(Duration::from_secs(10))
        .warm_up_time(Duration::from_secs(3));

    let (upstream, relay_url, server_handle) = runtime.block_on(async {
        let upstream = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/cards/v4/detail"))
            .respond_with(ResponseTemplate::new(200).set_body_json(sample_envelope(PRODUCT_ID)))
            .mount(&upstream)
            .await;

        let config = bench_relay_config(upstream.uri());
        let addr = config.listen_addr();
        let server = RelayServer::new(config).expect("relay server");
        let handle = tokio::spawn(async move { server.run().await });

        for _ in 0..20 {
            if tokio::net::TcpStream::connect(&addr).await.is_ok() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }

        (upstream, format!("http://{addr}"), handle)
    });

    let client = Client::builder()
        .timeout(Duration::from_secs(5))
        .build()
        .expect("client");

    for (route, url) in [
        ("summary", format!("{relay_url}/api/product/{PRODUCT_ID}")),
        ("extended", format!("{relay_url}/api/wb/product?nmId={PRODUCT_ID}")),
    ] {
        group.bench_function(BenchmarkId::new("product", route), |b| {
            b.iter(|| {
                runtime.block_on(async {
                    let response = client.get(&url).send().await.expect("response");
                    assert_eq!(response.status(), 200, "Expected 200 OK from relay");
                    response.bytes().await.expect("bytes");
                });
            });
        });
    }

    group.finish();

    server_handle.abort();
    drop(upstream);
}

criterion_group!(relay_round_trip, bench_product_round_trip);
criterion_main!(relay_round_trip);
