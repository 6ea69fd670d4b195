//! Start, stop, restart, and state queries.

use tracing::info;

use crate::command::CommandRunner;
use crate::error::DriverError;
use crate::naming::MachineRecord;
use crate::provider::{InstanceInfo, LightsailApi};

use super::MachineDriver;

impl<A, R> MachineDriver<A, R>
where
    A: LightsailApi,
    R: CommandRunner,
{
    /// Powers the instance on and waits until it reports running.
    ///
    /// # Errors
    ///
    /// Returns [`DriverError::UnsupportedOperation`] for attached machines,
    /// [`DriverError::Provider`] when the call fails, and the readiness
    /// errors of create otherwise.
    pub async fn start(&self) -> Result<(), DriverError> {
        let record = self.require_managed("start")?;
        self.api.start_instance(&record.instance_name).await?;
        info!(instance = %record.instance_name, "start requested");
        self.wait_until_running(&record.instance_name).await?;
        self.refresh_address(record).await
    }

    /// Powers the instance off without waiting.
    ///
    /// # Errors
    ///
    /// Returns [`DriverError::UnsupportedOperation`] for attached machines
    /// and [`DriverError::Provider`] when the call fails.
    pub async fn stop(&self) -> Result<(), DriverError> {
        let record = self.require_managed("stop")?;
        self.api.stop_instance(&record.instance_name).await?;
        info!(instance = %record.instance_name, "stop requested");
        Ok(())
    }

    /// Reboots the instance and waits until it reports running again.
    ///
    /// # Errors
    ///
    /// Same as [`MachineDriver::start`].
    pub async fn restart(&self) -> Result<(), DriverError> {
        let record = self.require_managed("restart")?;
        self.api.reboot_instance(&record.instance_name).await?;
        info!(instance = %record.instance_name, "reboot requested");
        self.wait_until_running(&record.instance_name).await?;
        self.refresh_address(record).await
    }

    /// Re-fetches the provider's view of the instance.
    ///
    /// # Errors
    ///
    /// Returns [`DriverError::UnsupportedOperation`] for attached machines
    /// and [`DriverError::Provider`] when the lookup fails.
    pub async fn instance_state(&self) -> Result<InstanceInfo, DriverError> {
        let record = self.require_managed("instance_state")?;
        Ok(self.api.get_instance(&record.instance_name).await?)
    }

    async fn refresh_address(&self, mut record: MachineRecord) -> Result<(), DriverError> {
        let info = self.fetch_ready_info(&record.instance_name).await?;
        if info.public_ip.is_some() && info.public_ip != record.address {
            info!(
                instance = %record.instance_name,
                address = info.public_ip.as_deref().unwrap_or_default(),
                "public address changed"
            );
            record.address = info.public_ip;
            self.store.save_record(&record)?;
        }
        Ok(())
    }
}
