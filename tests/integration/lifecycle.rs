//! Whole-suite lifecycle: controller startup in dependency order, port
//! assignment across sites, and clean shutdown.

use std::net::TcpStream;

use axum::http::StatusCode;

use localcloud_suite::config::{
    EmulatorsConfig, ProcessConfig, ServerConfig, SiteConfig, SuiteConfig,
};
use localcloud_suite::emulators::{Controller, EmulatorKind, Registry, StartOptions};
use localcloud_suite::hosting::hosting_port;

use crate::common::{get_free_port, site_fixture, wait_for_listening};

fn sleeper(port: u16) -> ProcessConfig {
    ProcessConfig {
        command: vec!["sleep".to_string(), "60".to_string()],
        host: "127.0.0.1".to_string(),
        port,
        wait_for_port: false,
        startup_timeout_secs: 5,
    }
}

fn suite_config(base_port: u16, sites: Vec<SiteConfig>) -> SuiteConfig {
    SuiteConfig {
        server: ServerConfig {
            host: "127.0.0.1".to_string(),
            port: base_port,
        },
        emulators: EmulatorsConfig {
            run: Some(sleeper(get_free_port())),
            ..EmulatorsConfig::default()
        },
        hosting: sites,
    }
}

fn sites(names: &[&str]) -> Vec<SiteConfig> {
    names
        .iter()
        .map(|name| SiteConfig {
            site: (*name).to_string(),
            public: "public".to_string(),
            rewrites: vec![],
            not_found_page: None,
        })
        .collect()
}

#[tokio::test]
async fn suite_starts_serves_and_shuts_down() {
    let config_path = site_fixture("lifecycle", &[("index.html", "suite up")]);
    let base_port = get_free_port();
    let config = suite_config(base_port, sites(&["app"]));

    let controller = Controller::new(Registry::new(), config_path);
    controller
        .start_all(&config, &StartOptions::default())
        .await
        .unwrap();

    // proxy target and hosting are both registered
    assert!(controller.registry().get_info(EmulatorKind::Run).is_some());
    let hosting = controller
        .registry()
        .get_info(EmulatorKind::Hosting)
        .unwrap();

    wait_for_listening(hosting.port, 5).await;
    let res = reqwest::get(format!("http://127.0.0.1:{}/", hosting.port))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.text().await.unwrap(), "suite up");

    controller.clean_shutdown().await;
    assert!(controller.registry().is_empty());
    assert!(
        TcpStream::connect(("127.0.0.1", hosting.port)).is_err(),
        "hosting port should be closed after shutdown"
    );

    // calling shutdown again is a no-op
    controller.clean_shutdown().await;
}

#[tokio::test]
async fn sites_are_assigned_ports_per_the_base_plus_four_plus_i_rule() {
    let config_path = site_fixture(
        "multi_site",
        &[("index.html", "site content")],
    );
    let base_port = get_free_port();
    let config = suite_config(base_port, sites(&["app", "admin"]));

    let controller = Controller::new(Registry::new(), config_path);
    controller
        .start_all(&config, &StartOptions::default())
        .await
        .unwrap();

    let first = controller
        .registry()
        .get_info(EmulatorKind::Hosting)
        .unwrap();
    assert_eq!(first.port, base_port);

    // the second site skipped the functions ports: base + 4 + 1
    let second_port = hosting_port(base_port, 1);
    assert_eq!(second_port, base_port + 5);
    wait_for_listening(second_port, 5).await;
    let res = reqwest::get(format!("http://127.0.0.1:{second_port}/"))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    controller.clean_shutdown().await;
}

#[tokio::test]
async fn only_flag_narrows_what_starts() {
    let config_path = site_fixture("only_flag", &[("index.html", "x")]);
    let base_port = get_free_port();
    let config = suite_config(base_port, sites(&["app"]));

    let options = StartOptions {
        only: Some(vec![EmulatorKind::Run]),
        ..StartOptions::default()
    };
    let controller = Controller::new(Registry::new(), config_path);
    controller.start_all(&config, &options).await.unwrap();

    assert!(controller.registry().get_info(EmulatorKind::Run).is_some());
    assert!(
        controller
            .registry()
            .get_info(EmulatorKind::Hosting)
            .is_none()
    );

    controller.clean_shutdown().await;
}
