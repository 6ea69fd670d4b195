//! Connectivity probing and endpoint URLs.

use std::fmt;
use std::net::Ipv6Addr;
use std::time::Duration;

use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::debug;

/// Reachability of a machine as seen from the host.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum MachineState {
    /// A TCP connection succeeded within the timeout.
    Running,
    /// The connection failed or timed out.
    Stopped,
}

impl fmt::Display for MachineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Running => f.write_str("Running"),
            Self::Stopped => f.write_str("Stopped"),
        }
    }
}

/// Attempts a single TCP connection bounded by `limit`.
///
/// Never calls the provider and never fails: any error or timeout maps to
/// [`MachineState::Stopped`].
pub async fn probe_tcp(host: &str, port: u16, limit: Duration) -> MachineState {
    match timeout(limit, TcpStream::connect((host, port))).await {
        Ok(Ok(_)) => MachineState::Running,
        Ok(Err(err)) => {
            debug!(host, port, error = %err, "probe connection failed");
            MachineState::Stopped
        }
        Err(_) => {
            debug!(host, port, "probe timed out");
            MachineState::Stopped
        }
    }
}

/// Builds `tcp://<host>:<port>`, bracketing IPv6 literals.
#[must_use]
pub fn engine_url(host: &str, port: u16) -> String {
    if host.parse::<Ipv6Addr>().is_ok() {
        format!("tcp://[{host}]:{port}")
    } else {
        format!("tcp://{host}:{port}")
    }
}
