//! Common utilities for integration tests.

use std::net::TcpListener;
use std::path::PathBuf;
use std::time::{Duration, Instant};

/// A port that was free a moment ago. The listener is dropped before the
/// port is returned, so the caller re-binds it.
pub fn get_free_port() -> u16 {
    TcpListener::bind("127.0.0.1:0")
        .expect("failed to bind to address")
        .local_addr()
        .unwrap()
        .port()
}

/// Block until a TCP listener is accepting on `127.0.0.1:port` or timeout.
pub async fn wait_for_listening(port: u16, timeout_secs: u64) {
    let start = Instant::now();
    while std::net::TcpStream::connect(("127.0.0.1", port)).is_err() {
        if start.elapsed() > Duration::from_secs(timeout_secs) {
            panic!("server did not start within timeout");
        }
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
}

/// Creates a `public/` fixture directory under a fresh temp root and returns
/// the path of a (non-existent) config file next to it; relative site paths
/// resolve against that file's directory.
pub fn site_fixture(name: &str, files: &[(&str, &str)]) -> PathBuf {
    let root = std::env::temp_dir().join(format!("localcloud_it_{name}_{}", std::process::id()));
    let public = root.join("public");
    std::fs::create_dir_all(&public).expect("failed to create fixture dir");
    for (file, content) in files {
        std::fs::write(public.join(file), content).expect("failed to write fixture file");
    }
    root.join("localcloud.toml")
}
