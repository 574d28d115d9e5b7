//! Listener binding with occupied-port fallback.

use std::net::SocketAddr;
use std::time::Duration;

use anyhow::{Result, anyhow};
use tiny_http::Server;

use crate::warn;

/// Pause before retrying a bind that hit an occupied port.
pub const RETRY_BACKOFF: Duration = Duration::from_secs(1);

/// Bind the listener at `addr`.
///
/// When the port is occupied, logs a warning, waits `backoff`, and retries
/// on an ephemeral port on the same host. Any other bind error is fatal.
/// Returns the server and the address it actually listens on.
pub fn bind_with_retry(mut addr: SocketAddr, backoff: Duration) -> Result<(Server, SocketAddr)> {
    loop {
        match Server::http(addr) {
            Ok(server) => {
                let bound = server
                    .server_addr()
                    .to_ip()
                    .ok_or_else(|| anyhow!("listener has no ip address"))?;
                return Ok((server, bound));
            }
            Err(e) if addr.port() != 0 && is_addr_in_use(e.as_ref()) => {
                warn!("serve"; "{addr} is already in use, trying another port");
                std::thread::sleep(backoff);
                addr.set_port(0);
            }
            Err(e) => return Err(anyhow!("failed to bind {}: {}", addr, e)),
        }
    }
}

fn is_addr_in_use(err: &(dyn std::error::Error + Send + Sync + 'static)) -> bool {
    err.downcast_ref::<std::io::Error>()
        .is_some_and(|io| io.kind() == std::io::ErrorKind::AddrInUse)
}
