//! The hosting dev server: one per configured site.
//!
//! Composes request logging, rewrite dispatch, backend proxying, and static
//! serving into a single request pipeline. The listener is bound (with the
//! retry policy from [`crate::hosting::ports`]) before the serve task is
//! spawned, so the server never sees a request before it is listening.
//! `stop` consumes the handle: the server stops accepting connections,
//! drains in-flight requests, and cannot be restarted.

use std::future::IntoFuture as _;
use std::net::IpAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    extract::{Request, State},
    http::{StatusCode, Uri, header},
    middleware::{self, Next},
    response::{IntoResponse, Response},
};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tower::ServiceExt as _;
use tower_http::{services::ServeDir, trace::TraceLayer};
use tracing::{error, info, warn};

use crate::config::{RewriteTargetConfig, SiteConfig, resolve_config_relative};
use crate::emulators::{EmulatorKind, Registry};
use crate::error::SuiteError;
use crate::hosting::ports::bind_with_retry;
use crate::hosting::rewrites::{self, RewriteRule};

/// Served when no asset matches and the site has no custom page configured.
const DEFAULT_NOT_FOUND_PAGE: &str = "<!DOCTYPE html>\n<html>\n<head><title>Page Not Found</title></head>\n<body>\n<h1>404 &mdash; Page Not Found</h1>\n<p>This file does not exist and there was no matching rewrite. Check your hosting configuration.</p>\n</body>\n</html>\n";

#[derive(Clone)]
struct SiteState {
    site: Arc<str>,
    public_dir: PathBuf,
    rules: Arc<[RewriteRule]>,
    registry: Registry,
    client: reqwest::Client,
    not_found_page: Arc<str>,
}

/// A hosting server that is bound and serving. Dropping the handle without
/// calling [`HostingServer::stop`] also shuts the server down, but without
/// waiting for in-flight requests.
pub struct HostingServer {
    site: String,
    port: u16,
    shutdown_tx: oneshot::Sender<()>,
    task: JoinHandle<std::io::Result<()>>,
}

impl HostingServer {
    /// Binds and starts the server for one site.
    ///
    /// The bound port may differ from `requested_port` when the bind had to
    /// retry; the ready log line and [`HostingServer::port`] report the port
    /// actually in use.
    ///
    /// # Errors
    ///
    /// Fails when the rewrite rules or fallback page are unusable, or when
    /// no port could be bound.
    pub async fn start(
        cfg: &SiteConfig,
        config_path: &Path,
        host: IpAddr,
        requested_port: u16,
        registry: Registry,
    ) -> Result<Self, SuiteError> {
        let rules: Arc<[RewriteRule]> = compile_site_rules(cfg)?.into();
        let public_dir = resolve_config_relative(config_path, &cfg.public);
        let not_found_page = load_not_found_page(cfg, config_path).await?;

        let (listener, port) = bind_with_retry(host, requested_port, &cfg.site).await?;

        let state = SiteState {
            site: cfg.site.as_str().into(),
            public_dir: public_dir.clone(),
            rules,
            registry,
            client: reqwest::Client::new(),
            not_found_page,
        };

        let app = Router::new()
            .fallback(dispatch)
            .layer(middleware::from_fn_with_state(state.clone(), log_request))
            .layer(TraceLayer::new_for_http())
            .with_state(state);

        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let task = tokio::spawn(
            axum::serve(listener, app)
                .with_graceful_shutdown(async move {
                    let _ = shutdown_rx.await;
                })
                .into_future(),
        );

        info!(
            site = %cfg.site,
            "Serving hosting files from: {}",
            public_dir.display()
        );
        info!(site = %cfg.site, "Local server: http://{host}:{port}");

        Ok(Self {
            site: cfg.site.clone(),
            port,
            shutdown_tx,
            task,
        })
    }

    /// The port the server is actually listening on.
    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn site(&self) -> &str {
        &self.site
    }

    /// Stops accepting new connections, waits for in-flight requests to
    /// drain, and tears the server down. Failures are logged, never
    /// returned; a stopped server stays stopped.
    pub async fn stop(self) {
        let _ = self.shutdown_tx.send(());
        match self.task.await {
            Ok(Ok(())) => info!(site = %self.site, "Hosting server stopped"),
            Ok(Err(err)) => warn!(site = %self.site, "Hosting server exited with error: {err}"),
            Err(err) => warn!(site = %self.site, "Hosting server task failed: {err}"),
        }
    }
}

fn compile_site_rules(cfg: &SiteConfig) -> Result<Vec<RewriteRule>, SuiteError> {
    rewrites::compile_rules(&cfg.rewrites)
}

async fn load_not_found_page(
    cfg: &SiteConfig,
    config_path: &Path,
) -> Result<Arc<str>, SuiteError> {
    match &cfg.not_found_page {
        None => Ok(DEFAULT_NOT_FOUND_PAGE.into()),
        Some(page) => {
            let path = resolve_config_relative(config_path, page);
            let content = tokio::fs::read_to_string(&path).await.map_err(|err| {
                SuiteError::Config(format!(
                    "cannot read not_found_page at {}: {err}",
                    path.display()
                ))
            })?;
            Ok(content.into())
        }
    }
}

/// Per-request access log, one line per completed request.
async fn log_request(State(state): State<SiteState>, req: Request, next: Next) -> Response {
    let method = req.method().clone();
    let path = req.uri().path().to_owned();
    let response = next.run(req).await;
    info!(
        site = %state.site,
        %method,
        path = %path,
        status = response.status().as_u16(),
        "request"
    );
    response
}

/// The rewrite dispatch: first matching rule wins; no match falls through
/// to static serving. Each request is evaluated independently against the
/// immutable rule list.
async fn dispatch(State(state): State<SiteState>, req: Request) -> Response {
    let path = req.uri().path().to_owned();
    let target = rewrites::resolve(&path, &state.rules).map(|rule| rule.target.clone());

    match target {
        Some(RewriteTargetConfig::Function { function }) => {
            proxy_backend(&state, req, EmulatorKind::Functions, &function).await
        }
        Some(RewriteTargetConfig::Run { run }) => {
            proxy_backend(&state, req, EmulatorKind::Run, &run).await
        }
        Some(RewriteTargetConfig::Destination { destination }) => {
            serve_rewritten(&state, req, &destination).await
        }
        None => serve_static(&state, req).await,
    }
}

/// Serves a request from the site's public directory; a missing asset gets
/// the site's fallback page.
async fn serve_static(state: &SiteState, req: Request) -> Response {
    match ServeDir::new(&state.public_dir).oneshot(req).await {
        Ok(res) if res.status() == StatusCode::NOT_FOUND => not_found_response(state),
        Ok(res) => res.into_response(),
        Err(err) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("Unhandled internal error: {err}"),
        )
            .into_response(),
    }
}

/// A `destination` rewrite: serve the configured path instead of the
/// requested one.
async fn serve_rewritten(state: &SiteState, mut req: Request, destination: &str) -> Response {
    match destination.parse::<Uri>() {
        Ok(uri) => {
            *req.uri_mut() = uri;
            serve_static(state, req).await
        }
        Err(err) => {
            error!(site = %state.site, destination, "Invalid rewrite destination: {err}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Invalid rewrite destination '{destination}'"),
            )
                .into_response()
        }
    }
}

fn not_found_response(state: &SiteState) -> Response {
    (
        StatusCode::NOT_FOUND,
        [(header::CONTENT_TYPE, "text/html; charset=utf-8")],
        state.not_found_page.to_string(),
    )
        .into_response()
}

/// Forwards the request to a registered backend emulator and passes the
/// response through verbatim. An unregistered backend answers 503 and the
/// server keeps serving; a transport failure answers 502.
async fn proxy_backend(
    state: &SiteState,
    req: Request,
    kind: EmulatorKind,
    target: &str,
) -> Response {
    let Some(info) = state.registry.get_info(kind) else {
        warn!(
            site = %state.site,
            %kind,
            target,
            "Rewrite matched but the backend emulator is not running"
        );
        return (
            StatusCode::SERVICE_UNAVAILABLE,
            format!("The {kind} emulator is not running; cannot serve '{target}'."),
        )
            .into_response();
    };

    let (parts, body) = req.into_parts();
    let path_and_query = parts.uri.path_and_query().map_or("/", |pq| pq.as_str());
    let url = format!("http://{}:{}{}", info.host, info.port, path_and_query);

    let mut headers = parts.headers;
    for name in [
        header::HOST,
        header::CONNECTION,
        header::TRANSFER_ENCODING,
        header::UPGRADE,
    ] {
        headers.remove(&name);
    }

    let upstream = state
        .client
        .request(parts.method, &url)
        .headers(headers)
        .body(reqwest::Body::wrap_stream(body.into_data_stream()))
        .send()
        .await;

    match upstream {
        Ok(upstream) => {
            let status = upstream.status();
            let mut response_headers = upstream.headers().clone();
            for name in [header::CONNECTION, header::TRANSFER_ENCODING] {
                response_headers.remove(&name);
            }

            let mut builder = axum::http::Response::builder().status(status);
            if let Some(h) = builder.headers_mut() {
                h.extend(response_headers);
            }
            builder
                .body(Body::from_stream(upstream.bytes_stream()))
                .map_or_else(
                    |_| StatusCode::BAD_GATEWAY.into_response(),
                    |response| response,
                )
        }
        Err(err) => {
            error!(site = %state.site, %kind, "Proxy request failed: {err}");
            (
                StatusCode::BAD_GATEWAY,
                format!("Proxy to the {kind} emulator failed: {err}"),
            )
                .into_response()
        }
    }
}
