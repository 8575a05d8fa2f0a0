//! Hosting server behavior against real sockets: static serving, rewrite
//! dispatch, proxying, and bind retries.

use std::future::IntoFuture as _;
use std::net::IpAddr;

use axum::Router;
use axum::http::StatusCode;
use axum::response::IntoResponse;

use localcloud_suite::config::{RewriteRuleConfig, RewriteTargetConfig, SiteConfig};
use localcloud_suite::emulators::{EmulatorInfo, EmulatorKind, Registry};
use localcloud_suite::hosting::{HostingServer, PORT_RETRY_STEP};

use crate::common::{get_free_port, site_fixture, wait_for_listening};

fn localhost() -> IpAddr {
    "127.0.0.1".parse().unwrap()
}

fn site(rewrites: Vec<RewriteRuleConfig>) -> SiteConfig {
    SiteConfig {
        site: "app".to_string(),
        public: "public".to_string(),
        rewrites,
        not_found_page: None,
    }
}

fn function_rewrite(source: &str, function: &str) -> RewriteRuleConfig {
    RewriteRuleConfig {
        source: source.to_string(),
        target: RewriteTargetConfig::Function {
            function: function.to_string(),
        },
    }
}

#[tokio::test]
async fn serves_static_files_and_not_found_fallback() {
    let config_path = site_fixture(
        "static",
        &[("index.html", "<h1>hello</h1>"), ("about.html", "about")],
    );
    let port = get_free_port();

    let server = HostingServer::start(&site(vec![]), &config_path, localhost(), port, Registry::new())
        .await
        .unwrap();
    wait_for_listening(server.port(), 5).await;

    let base = format!("http://127.0.0.1:{}", server.port());

    let index = reqwest::get(format!("{base}/")).await.unwrap();
    assert_eq!(index.status(), StatusCode::OK);
    assert!(index.text().await.unwrap().contains("hello"));

    let about = reqwest::get(format!("{base}/about.html")).await.unwrap();
    assert_eq!(about.status(), StatusCode::OK);

    let missing = reqwest::get(format!("{base}/missing.html")).await.unwrap();
    assert_eq!(missing.status(), StatusCode::NOT_FOUND);
    assert!(missing.text().await.unwrap().contains("Page Not Found"));

    server.stop().await;
}

#[tokio::test]
async fn destination_rewrite_serves_the_configured_asset() {
    let config_path = site_fixture("spa", &[("index.html", "<h1>spa shell</h1>")]);
    let port = get_free_port();

    let rules = vec![RewriteRuleConfig {
        source: "/**".to_string(),
        target: RewriteTargetConfig::Destination {
            destination: "/index.html".to_string(),
        },
    }];
    let server = HostingServer::start(&site(rules), &config_path, localhost(), port, Registry::new())
        .await
        .unwrap();
    wait_for_listening(server.port(), 5).await;

    let res = reqwest::get(format!(
        "http://127.0.0.1:{}/some/client/route",
        server.port()
    ))
    .await
    .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert!(res.text().await.unwrap().contains("spa shell"));

    server.stop().await;
}

#[tokio::test]
async fn missing_backend_yields_503_and_server_survives() {
    let config_path = site_fixture("no_backend", &[("index.html", "still here")]);
    let port = get_free_port();

    let rules = vec![function_rewrite("/api/**", "api")];
    let server = HostingServer::start(&site(rules), &config_path, localhost(), port, Registry::new())
        .await
        .unwrap();
    wait_for_listening(server.port(), 5).await;

    let base = format!("http://127.0.0.1:{}", server.port());

    let res = reqwest::get(format!("{base}/api/foo")).await.unwrap();
    assert_eq!(res.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert!(res.text().await.unwrap().contains("functions"));

    // the server keeps handling subsequent requests
    let index = reqwest::get(format!("{base}/")).await.unwrap();
    assert_eq!(index.status(), StatusCode::OK);

    server.stop().await;
}

#[tokio::test]
async fn function_rewrite_proxies_to_the_registered_backend() {
    async fn backend() -> impl IntoResponse {
        (
            StatusCode::IM_A_TEAPOT,
            [("x-backend", "functions-stub")],
            "from backend",
        )
    }

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let backend_port = listener.local_addr().unwrap().port();
    tokio::spawn(axum::serve(listener, Router::new().fallback(backend)).into_future());

    let registry = Registry::new();
    registry.register(EmulatorInfo {
        kind: EmulatorKind::Functions,
        host: "127.0.0.1".to_string(),
        port: backend_port,
    });

    let config_path = site_fixture("proxy", &[("index.html", "static")]);
    let port = get_free_port();
    let rules = vec![function_rewrite("/api/**", "api")];
    let server = HostingServer::start(&site(rules), &config_path, localhost(), port, registry)
        .await
        .unwrap();
    wait_for_listening(server.port(), 5).await;

    let base = format!("http://127.0.0.1:{}", server.port());

    // status, headers, and body pass through verbatim
    let res = reqwest::get(format!("{base}/api/foo")).await.unwrap();
    assert_eq!(res.status(), StatusCode::IM_A_TEAPOT);
    assert_eq!(
        res.headers().get("x-backend").unwrap().to_str().unwrap(),
        "functions-stub"
    );
    assert_eq!(res.text().await.unwrap(), "from backend");

    // non-matching paths are still served statically
    let index = reqwest::get(format!("{base}/")).await.unwrap();
    assert_eq!(index.status(), StatusCode::OK);
    assert_eq!(index.text().await.unwrap(), "static");

    server.stop().await;
}

#[tokio::test]
async fn occupied_port_moves_the_server_up_the_retry_ladder() {
    let config_path = site_fixture("retry", &[("index.html", "moved")]);

    let occupied = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let base = occupied.local_addr().unwrap().port();

    let server = HostingServer::start(&site(vec![]), &config_path, localhost(), base, Registry::new())
        .await
        .unwrap();
    assert_eq!(server.port(), base + PORT_RETRY_STEP);

    wait_for_listening(server.port(), 5).await;
    let res = reqwest::get(format!("http://127.0.0.1:{}/", server.port()))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    server.stop().await;
    drop(occupied);
}
