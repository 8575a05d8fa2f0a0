//! Configuration data types for the emulator suite.
//!
//! Loaded from a TOML file; read-only to the rest of the suite. Hosting
//! sites are an array of tables so their order (and therefore their port
//! assignment) is exactly the order in the file.

use std::path::{Path, PathBuf};

use serde::Deserialize;

/// Root config structure: hosting server binding, process emulators, and the
/// ordered list of hosting sites.
#[derive(Debug, Deserialize, Default, Clone, PartialEq)]
pub struct SuiteConfig {
    /// Bind address and base port for the hosting dev servers.
    #[serde(default)]
    pub server: ServerConfig,
    /// Externally provided emulator binaries, one optional entry per kind.
    #[serde(default)]
    pub emulators: EmulatorsConfig,
    /// Hosting sites in serving order. The first site binds the base port,
    /// the i-th subsequent site binds `base + 4 + i`.
    #[serde(default)]
    pub hosting: Vec<SiteConfig>,
}

/// Hosting bind configuration.
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct ServerConfig {
    /// Bind address for the hosting listeners.
    #[serde(default = "default_host")]
    pub host: String,
    /// Base port for the first hosting site.
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// The set of configured process emulators. A kind is only started when its
/// table is present (and selected by `--only`, when given).
#[derive(Debug, Deserialize, Default, Clone, PartialEq)]
pub struct EmulatorsConfig {
    pub functions: Option<ProcessConfig>,
    pub firestore: Option<ProcessConfig>,
    pub run: Option<ProcessConfig>,
    pub gui: Option<ProcessConfig>,
}

/// An externally provided emulator binary. The suite spawns it, waits for
/// its port to accept connections, and stops it on shutdown; managing or
/// downloading the binary itself is out of scope.
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct ProcessConfig {
    /// Program and arguments, e.g. `["node", "functions-runtime.js"]`.
    pub command: Vec<String>,
    /// Host the emulator listens on.
    #[serde(default = "default_host")]
    pub host: String,
    /// Port the emulator listens on.
    pub port: u16,
    /// Whether startup should wait until the port accepts connections.
    /// Disable for emulators without a TCP readiness signal.
    #[serde(default = "do_wait_for_port")]
    pub wait_for_port: bool,
    /// How long to wait for readiness before giving up.
    #[serde(default = "default_startup_timeout_secs")]
    pub startup_timeout_secs: u64,
}

/// One hosting site: a public directory plus an ordered rewrite list.
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct SiteConfig {
    /// Site name, used in logs and error messages.
    pub site: String,
    /// Directory with the static assets, relative to the config file.
    #[serde(default = "default_public_dir")]
    pub public: String,
    /// Rewrite rules, evaluated top to bottom; first match wins. No match
    /// falls through to static serving.
    #[serde(default)]
    pub rewrites: Vec<RewriteRuleConfig>,
    /// Optional HTML page served when no asset matches, relative to the
    /// config file. A built-in page is used when omitted.
    #[serde(default)]
    pub not_found_page: Option<String>,
}

/// A single rewrite rule: a glob over the request path and what to do with
/// matching requests.
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct RewriteRuleConfig {
    /// Glob pattern over the request path, e.g. `/api/**`.
    pub source: String,
    #[serde(flatten)]
    pub target: RewriteTargetConfig,
}

/// Rule action, distinguished by which key the table carries.
#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(untagged)]
pub enum RewriteTargetConfig {
    /// Proxy to the functions emulator; the value names the function.
    Function { function: String },
    /// Proxy to the container-backed service emulator.
    Run { run: String },
    /// Serve this path from the public directory instead.
    Destination { destination: String },
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

const fn default_port() -> u16 {
    5000
}

fn default_public_dir() -> String {
    "public".to_string()
}

const fn do_wait_for_port() -> bool {
    true
}

const fn default_startup_timeout_secs() -> u64 {
    30
}

/// Resolves a config-relative path against the config file's directory.
/// Absolute paths pass through unchanged.
pub fn resolve_config_relative(config_path: &Path, relative: &str) -> PathBuf {
    let path = Path::new(relative);
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        config_path
            .parent()
            .map_or_else(|| path.to_path_buf(), |dir| dir.join(path))
    }
}
