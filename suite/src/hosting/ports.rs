//! Port assignment and bind-with-retry for the hosting dev servers.

use std::io;
use std::net::IpAddr;

use tokio::net::TcpListener;
use tracing::warn;

use crate::error::SuiteError;

/// How far the next bind attempt moves when a port is taken. A running
/// project cluster takes up to 5 ports (1 hosting port plus its functions
/// ports), so stepping by 5 lands on the next free cluster.
pub const PORT_RETRY_STEP: u16 = 5;

/// Bind attempts per server before giving up.
pub const MAX_PORT_ATTEMPTS: u16 = 10;

/// Port assigned to the hosting site at `index` (config order) for a given
/// base port. The first site uses the base port itself; the i-th subsequent
/// site skips over the functions emulator ports and uses `base + 4 + i`.
/// This arithmetic is a compatibility contract and must not change.
pub fn hosting_port(base: u16, index: usize) -> u16 {
    if index == 0 {
        base
    } else {
        base + 4 + u16::try_from(index).unwrap_or(u16::MAX)
    }
}

/// Binds a listener for the site, retrying on occupied ports.
///
/// Attempts `start_port`, then `start_port + 5`, and so on for up to 10
/// attempts; each retry logs a warning naming the occupied port. An
/// address-in-use error is the only retriable condition — any other bind
/// error fails immediately.
///
/// # Errors
///
/// [`SuiteError::NoOpenPort`] when every attempt hit an occupied port,
/// [`SuiteError::Bind`] for any other bind failure.
pub async fn bind_with_retry(
    host: IpAddr,
    start_port: u16,
    site: &str,
) -> Result<(TcpListener, u16), SuiteError> {
    let mut port = start_port;
    for attempt in 0..MAX_PORT_ATTEMPTS {
        match TcpListener::bind((host, port)).await {
            Ok(listener) => return Ok((listener, port)),
            Err(err) if err.kind() == io::ErrorKind::AddrInUse => {
                let Some(next) = port.checked_add(PORT_RETRY_STEP) else {
                    break;
                };
                if attempt + 1 < MAX_PORT_ATTEMPTS {
                    warn!(
                        site,
                        port, "Port is not available, trying port {next} instead"
                    );
                }
                port = next;
            }
            Err(err) => {
                return Err(SuiteError::Bind {
                    addr: format!("{host}:{port}"),
                    source: err,
                });
            }
        }
    }
    warn!(site, start_port, "Exhausted all bind attempts");
    Err(SuiteError::NoOpenPort {
        site: site.to_string(),
    })
}
