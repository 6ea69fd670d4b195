//! Machine lifecycle orchestration.
//!
//! [`MachineDriver`] ties together validation, key material, the remote key
//! pair, the instance, and its firewall. Create is written so that any
//! failure after the instance call is issued unwinds every resource the
//! attempt may have produced; teardown tolerates resources that are already
//! gone.

use tracing::info;

use crate::command::CommandRunner;
use crate::config::MachineConfig;
use crate::error::DriverError;
use crate::naming::MachineRecord;
use crate::probe::{MachineState, engine_url, probe_tcp};
use crate::provider::LightsailApi;
use crate::retry::RetryPolicy;
use crate::store::MachineStore;
use crate::validate;

mod create;
mod key_pair;
mod ports;
mod power;
mod teardown;

pub use key_pair::{ensure_key_pair, keep_key_pair};
pub use ports::expose_ports;
pub use teardown::teardown;

/// Result of a successful create.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct InstanceResource {
    /// Instance name, empty for attached machines.
    pub instance_name: String,
    /// Key pair name, empty for attached machines.
    pub key_pair_name: String,
    /// Public address of the machine.
    pub address: String,
    /// Login user.
    pub username: String,
    /// Provider state code at the end of create; `None` when attached.
    pub state_code: Option<i32>,
    /// `false` when the machine was attached rather than provisioned.
    pub managed: bool,
}

/// Drives the lifecycle of a single machine.
#[derive(Debug)]
pub struct MachineDriver<A, R> {
    api: A,
    runner: R,
    config: MachineConfig,
    store: MachineStore,
}

impl<A, R> MachineDriver<A, R>
where
    A: LightsailApi,
    R: CommandRunner,
{
    /// Creates a driver for the machine named in `config`.
    #[must_use]
    pub fn new(api: A, runner: R, config: MachineConfig) -> Self {
        let store = MachineStore::new(&config.store_root(), &config.machine_name);
        Self {
            api,
            runner,
            config,
            store,
        }
    }

    /// Configuration the driver was built with.
    #[must_use]
    pub const fn config(&self) -> &MachineConfig {
        &self.config
    }

    /// Local store for this machine.
    #[must_use]
    pub const fn store(&self) -> &MachineStore {
        &self.store
    }

    /// Provider client.
    #[must_use]
    pub const fn api(&self) -> &A {
        &self.api
    }

    /// Stored association record, if the machine was ever created.
    ///
    /// # Errors
    ///
    /// Returns [`DriverError::Store`] when the record cannot be read.
    pub fn record(&self) -> Result<Option<MachineRecord>, DriverError> {
        Ok(self.store.load_record()?)
    }

    /// Validates configuration before any resource is created. Attached
    /// machines only get local checks.
    ///
    /// # Errors
    ///
    /// See [`validate::validate_config`].
    pub async fn validate_config(&self) -> Result<(), DriverError> {
        if self.config.external_address.is_some() {
            self.config.validate()?;
            return Ok(());
        }
        validate::validate_config(&self.api, &self.config).await
    }

    /// Probes the recorded address on the SSH port. Makes no provider call.
    ///
    /// # Errors
    ///
    /// Returns [`DriverError::MissingAddress`] when no address is known.
    pub async fn probe_state(&self) -> Result<MachineState, DriverError> {
        let address = self.known_address()?;
        let state = probe_tcp(
            &address,
            self.config.ssh_port,
            self.config.probe_timeout(),
        )
        .await;
        info!(machine = %self.config.machine_name, %state, "probed machine");
        Ok(state)
    }

    /// Container engine URL, `tcp://<address>:<engine port>`.
    ///
    /// # Errors
    ///
    /// Returns [`DriverError::MissingAddress`] when no address is known.
    pub fn resolve_url(&self) -> Result<String, DriverError> {
        let address = self.known_address()?;
        Ok(engine_url(&address, self.config.engine_port))
    }

    fn known_address(&self) -> Result<String, DriverError> {
        self.store
            .load_record()?
            .and_then(|record| record.address)
            .or_else(|| self.config.external_address.clone())
            .ok_or_else(|| DriverError::MissingAddress {
                machine: self.config.machine_name.clone(),
            })
    }

    fn require_record(&self) -> Result<MachineRecord, DriverError> {
        self.store
            .load_record()?
            .ok_or_else(|| DriverError::MachineNotFound {
                machine: self.config.machine_name.clone(),
            })
    }

    fn require_managed(&self, operation: &str) -> Result<MachineRecord, DriverError> {
        let record = self.require_record()?;
        if !record.managed {
            return Err(DriverError::UnsupportedOperation {
                operation: operation.to_owned(),
                reason: format!(
                    "machine {} is attached to an external host",
                    self.config.machine_name
                ),
            });
        }
        Ok(record)
    }

    const fn readiness_policy(&self) -> RetryPolicy {
        RetryPolicy::fixed(self.config.poll_interval(), self.config.wait_timeout())
    }
}
