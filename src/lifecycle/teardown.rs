//! Reverse path: delete the instance, then the key pair.

use tracing::{info, warn};

use crate::command::CommandRunner;
use crate::error::DriverError;
use crate::naming::MachineRecord;
use crate::provider::{LightsailApi, ProviderError};

use super::MachineDriver;

/// Deletes the recorded instance and key pair.
///
/// Both deletes are always attempted. Not-found counts as already deleted.
///
/// # Errors
///
/// Returns [`DriverError::TeardownFailed`] carrying the first hard failure.
pub async fn teardown<A: LightsailApi + ?Sized>(
    api: &A,
    record: &MachineRecord,
) -> Result<(), DriverError> {
    let instance = tolerate_missing(
        "instance",
        &record.instance_name,
        api.delete_instance(&record.instance_name).await,
    );
    let key_pair = tolerate_missing(
        "key pair",
        &record.key_pair_name,
        api.delete_key_pair(&record.key_pair_name).await,
    );

    match instance.and(key_pair) {
        Ok(()) => Ok(()),
        Err(source) => Err(DriverError::TeardownFailed { source }),
    }
}

fn tolerate_missing(
    kind: &str,
    name: &str,
    result: Result<(), ProviderError>,
) -> Result<(), ProviderError> {
    match result {
        Ok(()) => {
            info!(kind, name, "deleted");
            Ok(())
        }
        Err(err) if err.is_not_found() => {
            warn!(kind, name, "already absent");
            Ok(())
        }
        Err(err) => {
            warn!(kind, name, error = %err, "delete failed");
            Err(err)
        }
    }
}

impl<A, R> MachineDriver<A, R>
where
    A: LightsailApi,
    R: CommandRunner,
{
    /// Removes the machine: provider resources first, then local state.
    ///
    /// Machines with no record, and attached machines, only have their local
    /// directory removed.
    ///
    /// # Errors
    ///
    /// Returns [`DriverError::TeardownFailed`] when a provider delete fails;
    /// local state is kept in that case so the removal can be retried.
    pub async fn remove(&self) -> Result<(), DriverError> {
        match self.store.load_record()? {
            Some(record) if record.managed => teardown(&self.api, &record).await?,
            Some(_) => info!(machine = %self.config.machine_name, "detaching external host"),
            None => info!(machine = %self.config.machine_name, "no record; nothing to delete remotely"),
        }
        self.store.remove_all()?;
        info!(machine = %self.config.machine_name, "machine removed");
        Ok(())
    }
}
