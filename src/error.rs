//! Error taxonomy for machine lifecycle operations.

use std::fmt::Display;
use std::time::Duration;

use camino::Utf8PathBuf;
use thiserror::Error;

use crate::config::ConfigError;
use crate::provider::ProviderError;
use crate::store::StoreError;

/// Errors raised by [`crate::MachineDriver`] operations.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum DriverError {
    /// Raised when the provider credential chain yields nothing usable.
    #[error("no usable provider credentials: {message}")]
    MissingCredentials {
        /// Reason reported by the credential chain.
        message: String,
    },
    /// Raised when `region + zone` is not an available zone.
    #[error("availability zone {zone} is not available")]
    ZoneUnavailable {
        /// Full zone name that was requested.
        zone: String,
    },
    /// Raised when the bundle is unknown or inactive.
    #[error("bundle {bundle} is not an active instance size")]
    SizeUnavailable {
        /// Requested bundle identifier.
        bundle: String,
    },
    /// Raised when the blueprint is unknown or inactive.
    #[error("blueprint {blueprint} is not an active image")]
    ImageUnavailable {
        /// Requested blueprint identifier.
        blueprint: String,
    },
    /// Raised when fresh key generation fails.
    #[error("failed to generate SSH key material: {message}")]
    KeyGenerationFailed {
        /// Tool or I/O failure description.
        message: String,
    },
    /// Raised when a user supplied key cannot be copied into the store.
    #[error("failed to import SSH key from {path}: {message}")]
    KeyImportFailed {
        /// User supplied private key path.
        path: Utf8PathBuf,
        /// I/O failure description.
        message: String,
    },
    /// Raised when key files exist for a machine that has no record.
    #[error("SSH key material already exists in {path} but no machine record was found")]
    KeyMaterialExists {
        /// Machine directory holding the stray key files.
        path: Utf8PathBuf,
    },
    /// Raised when the local public key cannot be read for import.
    #[error("public key {path} is unreadable: {message}")]
    PublicKeyUnreadable {
        /// Public key path.
        path: Utf8PathBuf,
        /// I/O failure description.
        message: String,
    },
    /// Raised when the provider refuses the key pair import.
    #[error("provider rejected key pair {name}: {source}")]
    KeyImportRejected {
        /// Key pair name.
        name: String,
        /// Provider failure.
        source: ProviderError,
    },
    /// Raised when the create-instance call fails for a reason other than a
    /// name conflict.
    #[error("failed to create instance {name}: {}", .source.message)]
    InstanceCreateFailed {
        /// Instance name.
        name: String,
        /// Provider failure, message preserved verbatim.
        source: ProviderError,
    },
    /// Raised when the instance does not report running before the deadline.
    #[error("instance {name} did not reach running within {waited:?}")]
    InstanceNotReadyTimeout {
        /// Instance name.
        name: String,
        /// Time spent polling.
        waited: Duration,
    },
    /// Raised when instance details cannot be fetched or are incomplete.
    #[error("instance {name} details unavailable: {message}")]
    InstanceInfoUnavailable {
        /// Instance name.
        name: String,
        /// Failure description.
        message: String,
    },
    /// Raised when opening firewall ports fails.
    #[error("failed to open ports {from}-{to} on {name}: {source}")]
    PortExposeFailed {
        /// Instance name.
        name: String,
        /// First port of the range.
        from: u16,
        /// Last port of the range.
        to: u16,
        /// Provider failure.
        source: ProviderError,
    },
    /// Raised when a teardown delete fails for a reason other than
    /// not-found.
    #[error("teardown failed: {source}")]
    TeardownFailed {
        /// First hard provider failure.
        source: ProviderError,
    },
    /// Raised when an operation does not apply to the machine.
    #[error("{operation} is not supported: {reason}")]
    UnsupportedOperation {
        /// Operation name.
        operation: String,
        /// Why it does not apply.
        reason: String,
    },
    /// Raised when no address is known for the machine.
    #[error("no address recorded for machine {machine}")]
    MissingAddress {
        /// Machine name.
        machine: String,
    },
    /// Raised when an operation needs a machine that was never created.
    #[error("machine {machine} has not been created")]
    MachineNotFound {
        /// Machine name.
        machine: String,
    },
    /// Raised when configuration is invalid.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
    /// Raised when local machine state cannot be read or written.
    #[error("machine store error: {0}")]
    Store(#[from] StoreError),
    /// Raised for provider failures outside the named steps.
    #[error("provider error: {0}")]
    Provider(#[from] ProviderError),
    /// Raised when create failed after resources may have been created and
    /// cleanup ran.
    #[error("{source}{}", teardown_note(.teardown.as_deref()))]
    CreateAborted {
        /// Failure that aborted the create.
        source: Box<DriverError>,
        /// Cleanup failure, if cleanup also failed.
        teardown: Option<Box<DriverError>>,
    },
}

impl DriverError {
    /// Wraps a create failure with the outcome of the cleanup it triggered.
    #[must_use]
    pub fn create_aborted(source: Self, teardown: Option<Self>) -> Self {
        Self::CreateAborted {
            source: Box::new(source),
            teardown: teardown.map(Box::new),
        }
    }

    /// Returns the error that caused a [`DriverError::CreateAborted`], or
    /// `self` for every other variant.
    #[must_use]
    pub fn root_cause(&self) -> &Self {
        match self {
            Self::CreateAborted { source, .. } => source.root_cause(),
            other => other,
        }
    }
}

fn teardown_note<E: Display>(teardown: Option<&E>) -> String {
    teardown.map_or_else(String::new, |err| {
        format!(" (teardown also failed: {err})")
    })
}
