//! AWS Lightsail implementation of [`LightsailApi`].
//!
//! The SDK client is built once per process with a standard retry policy and
//! reused for every call. SDK errors are classified into
//! [`ProviderErrorKind`] and never leave this module in their raw form.

mod catalog;
mod error;
mod instances;
mod key_pairs;

use aws_config::retry::RetryConfig;
use aws_config::{BehaviorVersion, SdkConfig};
use aws_sdk_lightsail::Client;
use aws_sdk_lightsail::config::{
    Credentials, ProvideCredentials, Region, SharedCredentialsProvider,
};

use crate::config::MachineConfig;
use crate::provider::{
    CatalogEntry, InstanceInfo, InstanceSpec, KeyPairInfo, LightsailApi, PortRange,
    ProviderError, ProviderErrorKind, ProviderFuture, ZoneInfo,
};

pub use error::classify_code;

/// Attempts per provider call, including the first.
pub const MAX_ATTEMPTS: u32 = 3;

const CREDENTIALS_SOURCE: &str = "lightsail-machine";

/// Provider client backed by `aws-sdk-lightsail`.
#[derive(Clone, Debug)]
pub struct LightsailClient {
    client: Client,
    credentials: Option<SharedCredentialsProvider>,
}

impl LightsailClient {
    /// Builds a client for the configured region.
    ///
    /// Static credentials from the configuration take precedence; otherwise
    /// the default AWS credential chain applies.
    pub async fn from_machine_config(config: &MachineConfig) -> Self {
        let mut loader = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(config.region.clone()))
            .retry_config(RetryConfig::standard().with_max_attempts(MAX_ATTEMPTS));

        if let (Some(access_key_id), Some(secret_access_key)) = (
            config.access_key_id.as_ref(),
            config.secret_access_key.as_ref(),
        ) {
            loader = loader.credentials_provider(Credentials::new(
                access_key_id.clone(),
                secret_access_key.clone(),
                config.session_token.clone(),
                None,
                CREDENTIALS_SOURCE,
            ));
        }

        Self::from_sdk_config(&loader.load().await)
    }

    /// Wraps an already loaded SDK configuration.
    #[must_use]
    pub fn from_sdk_config(sdk: &SdkConfig) -> Self {
        Self {
            client: Client::new(sdk),
            credentials: sdk.credentials_provider(),
        }
    }

    async fn check_credentials(&self) -> Result<(), ProviderError> {
        let provider = self.credentials.as_ref().ok_or_else(|| {
            ProviderError::new(
                "ResolveCredentials",
                ProviderErrorKind::Credentials,
                "no credentials provider configured",
            )
        })?;
        provider
            .provide_credentials()
            .await
            .map(|_| ())
            .map_err(|err| {
                ProviderError::new(
                    "ResolveCredentials",
                    ProviderErrorKind::Credentials,
                    err.to_string(),
                )
            })
    }
}

impl LightsailApi for LightsailClient {
    fn resolve_credentials(&self) -> ProviderFuture<'_, ()> {
        Box::pin(self.check_credentials())
    }

    fn list_zones(&self) -> ProviderFuture<'_, Vec<ZoneInfo>> {
        Box::pin(self.fetch_zones())
    }

    fn list_bundles(&self) -> ProviderFuture<'_, Vec<CatalogEntry>> {
        Box::pin(self.fetch_bundles())
    }

    fn list_blueprints(&self) -> ProviderFuture<'_, Vec<CatalogEntry>> {
        Box::pin(self.fetch_blueprints())
    }

    fn get_key_pair<'a>(&'a self, name: &'a str) -> ProviderFuture<'a, KeyPairInfo> {
        Box::pin(self.fetch_key_pair(name))
    }

    fn import_key_pair<'a>(
        &'a self,
        name: &'a str,
        public_key: &'a str,
    ) -> ProviderFuture<'a, KeyPairInfo> {
        Box::pin(self.upload_key_pair(name, public_key))
    }

    fn delete_key_pair<'a>(&'a self, name: &'a str) -> ProviderFuture<'a, ()> {
        Box::pin(self.remove_key_pair(name))
    }

    fn create_instance<'a>(&'a self, spec: &'a InstanceSpec) -> ProviderFuture<'a, ()> {
        Box::pin(self.launch_instance(spec))
    }

    fn get_instance<'a>(&'a self, name: &'a str) -> ProviderFuture<'a, InstanceInfo> {
        Box::pin(self.fetch_instance(name))
    }

    fn delete_instance<'a>(&'a self, name: &'a str) -> ProviderFuture<'a, ()> {
        Box::pin(self.remove_instance(name))
    }

    fn start_instance<'a>(&'a self, name: &'a str) -> ProviderFuture<'a, ()> {
        Box::pin(self.power_on(name))
    }

    fn stop_instance<'a>(&'a self, name: &'a str) -> ProviderFuture<'a, ()> {
        Box::pin(self.power_off(name))
    }

    fn reboot_instance<'a>(&'a self, name: &'a str) -> ProviderFuture<'a, ()> {
        Box::pin(self.reboot(name))
    }

    fn open_ports<'a>(&'a self, name: &'a str, range: PortRange) -> ProviderFuture<'a, ()> {
        Box::pin(self.open_public_ports(name, range))
    }
}
