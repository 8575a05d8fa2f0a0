//! The hosting dev server: port assignment, rewrite rules, and the per-site
//! HTTP server.

pub mod ports;
pub mod rewrites;
pub mod server;

pub use ports::{MAX_PORT_ATTEMPTS, PORT_RETRY_STEP, bind_with_retry, hosting_port};
pub use server::HostingServer;
