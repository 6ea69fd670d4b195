//! Firewall exposure for the container engine.

use tracing::info;

use crate::error::DriverError;
use crate::provider::{LightsailApi, PortRange};

/// Opens the engine port, or every TCP port when `open_all` is set.
/// Not retried.
///
/// # Errors
///
/// Returns [`DriverError::PortExposeFailed`] when the provider call fails.
pub async fn expose_ports<A: LightsailApi + ?Sized>(
    api: &A,
    instance_name: &str,
    engine_port: u16,
    open_all: bool,
) -> Result<PortRange, DriverError> {
    let range = if open_all {
        PortRange::all()
    } else {
        PortRange::single(engine_port)
    };

    api.open_ports(instance_name, range)
        .await
        .map_err(|source| DriverError::PortExposeFailed {
            name: instance_name.to_owned(),
            from: range.from,
            to: range.to,
            source,
        })?;
    info!(
        instance = instance_name,
        from = range.from,
        to = range.to,
        "opened inbound TCP ports"
    );
    Ok(range)
}
