//! Lifecycle orchestrator for docker-machine style hosts on AWS Lightsail.
//!
//! A [`MachineDriver`] validates a [`MachineConfig`] against the provider
//! catalog, provisions SSH key material and a remote key pair, launches an
//! instance, waits for it to run, opens the engine port, and unwinds every
//! resource it created when any of those steps fails. The provider sits
//! behind [`LightsailApi`] so the orchestration can be exercised against an
//! in-memory double.

pub mod command;
pub mod config;
pub mod error;
pub mod keys;
pub mod lifecycle;
pub mod lightsail;
pub mod naming;
pub mod probe;
pub mod provider;
pub mod retry;
pub mod store;
pub mod test_support;
pub mod validate;

pub use command::{CommandError, CommandOutput, CommandRunner, ProcessCommandRunner};
pub use config::{ConfigError, MachineConfig};
pub use error::DriverError;
pub use keys::{KeyProvisioner, KeyReuse, LocalKeyFiles};
pub use lifecycle::{InstanceResource, MachineDriver, ensure_key_pair, expose_ports, teardown};
pub use lightsail::LightsailClient;
pub use naming::{MachineRecord, ResourceNames};
pub use probe::MachineState;
pub use provider::{
    InstanceInfo, InstanceSpec, LightsailApi, PortRange, ProviderError, ProviderErrorKind,
};
pub use retry::{Attempt, Backoff, RetryError, RetryPolicy, poll_until};
pub use store::{MachineStore, StoreError};
