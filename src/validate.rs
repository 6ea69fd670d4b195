//! Pre-flight validation of a machine configuration against the provider.
//!
//! Only read-only provider queries are issued, so validation can be repeated
//! freely.

use tracing::{debug, info};

use crate::config::MachineConfig;
use crate::error::DriverError;
use crate::provider::{CatalogEntry, LightsailApi};

/// Checks credentials, zone, bundle, and blueprint in that order.
///
/// # Errors
///
/// Returns [`DriverError::Config`] for local configuration problems, then
/// the first of [`DriverError::MissingCredentials`],
/// [`DriverError::ZoneUnavailable`], [`DriverError::SizeUnavailable`], or
/// [`DriverError::ImageUnavailable`] that applies. Listing failures surface
/// as [`DriverError::Provider`].
pub async fn validate_config<A: LightsailApi + ?Sized>(
    api: &A,
    config: &MachineConfig,
) -> Result<(), DriverError> {
    config.validate()?;

    api.resolve_credentials()
        .await
        .map_err(|err| DriverError::MissingCredentials {
            message: err.message,
        })?;
    debug!("provider credentials resolved");

    let zone = config.availability_zone();
    let zones = api.list_zones().await?;
    if !zones
        .iter()
        .any(|candidate| candidate.name == zone && candidate.is_available())
    {
        return Err(DriverError::ZoneUnavailable { zone });
    }

    let bundles = api.list_bundles().await?;
    if !is_active(&bundles, &config.bundle) {
        return Err(DriverError::SizeUnavailable {
            bundle: config.bundle.clone(),
        });
    }

    let blueprints = api.list_blueprints().await?;
    if !is_active(&blueprints, &config.blueprint) {
        return Err(DriverError::ImageUnavailable {
            blueprint: config.blueprint.clone(),
        });
    }

    info!(
        zone = %zone,
        bundle = %config.bundle,
        blueprint = %config.blueprint,
        "machine configuration validated"
    );
    Ok(())
}

fn is_active(entries: &[CatalogEntry], id: &str) -> bool {
    entries.iter().any(|entry| entry.id == id && entry.active)
}
