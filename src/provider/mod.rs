//! Provider abstraction for the Lightsail resources a machine owns.
//!
//! The orchestrator talks to the cloud exclusively through [`LightsailApi`],
//! so tests can substitute an in-memory double for the SDK-backed client.

use std::future::Future;
use std::pin::Pin;

mod error;

pub use error::{ProviderError, ProviderErrorKind};

/// Numeric state code Lightsail reports for a running instance.
pub const RUNNING_STATE_CODE: i32 = 16;

/// Future returned by provider operations.
pub type ProviderFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, ProviderError>> + Send + 'a>>;

/// Availability zone entry from the region listing.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ZoneInfo {
    /// Full zone name, for example `ap-northeast-1a`.
    pub name: String,
    /// Zone state as reported by the provider (for example `available`).
    pub state: String,
}

impl ZoneInfo {
    /// Returns `true` when the provider reports the zone as usable.
    #[must_use]
    pub fn is_available(&self) -> bool {
        self.state == "available"
    }
}

/// Bundle or blueprint entry from a provider catalog.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CatalogEntry {
    /// Catalog identifier (for example `small_2_0` or `ubuntu_18_04`).
    pub id: String,
    /// Whether the entry can currently be used to launch instances.
    pub active: bool,
}

/// Remote key pair as reported by the provider.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct KeyPairInfo {
    /// Key pair name.
    pub name: String,
}

/// Parameters for a create-instance call.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct InstanceSpec {
    /// Deterministic instance name.
    pub name: String,
    /// Full availability zone name (`region` + `zone`).
    pub availability_zone: String,
    /// Blueprint (image) identifier.
    pub blueprint_id: String,
    /// Bundle (size) identifier.
    pub bundle_id: String,
    /// Name of the key pair injected into the instance.
    pub key_pair_name: String,
}

/// Cached view of a remote instance, fetched on demand.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct InstanceInfo {
    /// Instance name.
    pub name: String,
    /// Provider numeric state code.
    pub state_code: i32,
    /// Provider state name (for example `pending` or `running`).
    pub state_name: String,
    /// Public IPv4 address once assigned.
    pub public_ip: Option<String>,
    /// Default login user for the blueprint.
    pub username: Option<String>,
}

impl InstanceInfo {
    /// Returns `true` when the state code is the provider's running code.
    #[must_use]
    pub const fn is_running(&self) -> bool {
        self.state_code == RUNNING_STATE_CODE
    }
}

/// Inclusive TCP port range to open on an instance firewall.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct PortRange {
    /// First port in the range.
    pub from: u16,
    /// Last port in the range.
    pub to: u16,
}

impl PortRange {
    /// Range covering a single port.
    #[must_use]
    pub const fn single(port: u16) -> Self {
        Self {
            from: port,
            to: port,
        }
    }

    /// Range covering every TCP port.
    #[must_use]
    pub const fn all() -> Self {
        Self {
            from: 0,
            to: u16::MAX,
        }
    }
}

/// Operations the orchestrator needs from the cloud provider.
///
/// Implementations must translate provider failures into [`ProviderError`]
/// so callers only ever match on [`ProviderErrorKind`].
pub trait LightsailApi {
    /// Resolves credentials through the provider's credential chain.
    fn resolve_credentials(&self) -> ProviderFuture<'_, ()>;

    /// Lists availability zones across the provider's regions.
    fn list_zones(&self) -> ProviderFuture<'_, Vec<ZoneInfo>>;

    /// Lists instance bundles (sizes).
    fn list_bundles(&self) -> ProviderFuture<'_, Vec<CatalogEntry>>;

    /// Lists instance blueprints (images).
    fn list_blueprints(&self) -> ProviderFuture<'_, Vec<CatalogEntry>>;

    /// Fetches a key pair by name.
    fn get_key_pair<'a>(&'a self, name: &'a str) -> ProviderFuture<'a, KeyPairInfo>;

    /// Imports an OpenSSH public key under `name`.
    fn import_key_pair<'a>(
        &'a self,
        name: &'a str,
        public_key: &'a str,
    ) -> ProviderFuture<'a, KeyPairInfo>;

    /// Deletes a key pair by name.
    fn delete_key_pair<'a>(&'a self, name: &'a str) -> ProviderFuture<'a, ()>;

    /// Issues a create-instance call.
    fn create_instance<'a>(&'a self, spec: &'a InstanceSpec) -> ProviderFuture<'a, ()>;

    /// Fetches an instance by name.
    fn get_instance<'a>(&'a self, name: &'a str) -> ProviderFuture<'a, InstanceInfo>;

    /// Deletes an instance by name.
    fn delete_instance<'a>(&'a self, name: &'a str) -> ProviderFuture<'a, ()>;

    /// Powers on a stopped instance.
    fn start_instance<'a>(&'a self, name: &'a str) -> ProviderFuture<'a, ()>;

    /// Powers off a running instance.
    fn stop_instance<'a>(&'a self, name: &'a str) -> ProviderFuture<'a, ()>;

    /// Reboots an instance.
    fn reboot_instance<'a>(&'a self, name: &'a str) -> ProviderFuture<'a, ()>;

    /// Opens an inbound TCP port range on the instance firewall.
    fn open_ports<'a>(&'a self, name: &'a str, range: PortRange) -> ProviderFuture<'a, ()>;
}
