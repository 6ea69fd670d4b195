//! Instance calls.

use aws_sdk_lightsail::types::{InstanceState, NetworkProtocol, PortInfo};

use crate::provider::{InstanceInfo, InstanceSpec, PortRange, ProviderError};

use super::LightsailClient;
use super::error::translate;

impl LightsailClient {
    pub(super) async fn launch_instance(&self, spec: &InstanceSpec) -> Result<(), ProviderError> {
        self.client
            .create_instances()
            .instance_names(&spec.name)
            .availability_zone(&spec.availability_zone)
            .blueprint_id(&spec.blueprint_id)
            .bundle_id(&spec.bundle_id)
            .key_pair_name(&spec.key_pair_name)
            .send()
            .await
            .map(|_| ())
            .map_err(|err| translate("CreateInstances", &err))
    }

    pub(super) async fn fetch_instance(&self, name: &str) -> Result<InstanceInfo, ProviderError> {
        let output = self
            .client
            .get_instance()
            .instance_name(name)
            .send()
            .await
            .map_err(|err| translate("GetInstance", &err))?;
        let instance = output.instance().ok_or_else(|| {
            ProviderError::not_found("GetInstance", format!("instance {name} not returned"))
        })?;
        let state = instance.state();
        Ok(InstanceInfo {
            name: instance.name().unwrap_or(name).to_owned(),
            state_code: state.and_then(InstanceState::code).unwrap_or_default(),
            state_name: state
                .and_then(InstanceState::name)
                .unwrap_or("unknown")
                .to_owned(),
            public_ip: instance.public_ip_address().map(str::to_owned),
            username: instance.username().map(str::to_owned),
        })
    }

    pub(super) async fn remove_instance(&self, name: &str) -> Result<(), ProviderError> {
        self.client
            .delete_instance()
            .instance_name(name)
            .send()
            .await
            .map(|_| ())
            .map_err(|err| translate("DeleteInstance", &err))
    }

    pub(super) async fn power_on(&self, name: &str) -> Result<(), ProviderError> {
        self.client
            .start_instance()
            .instance_name(name)
            .send()
            .await
            .map(|_| ())
            .map_err(|err| translate("StartInstance", &err))
    }

    pub(super) async fn power_off(&self, name: &str) -> Result<(), ProviderError> {
        self.client
            .stop_instance()
            .instance_name(name)
            .send()
            .await
            .map(|_| ())
            .map_err(|err| translate("StopInstance", &err))
    }

    pub(super) async fn reboot(&self, name: &str) -> Result<(), ProviderError> {
        self.client
            .reboot_instance()
            .instance_name(name)
            .send()
            .await
            .map(|_| ())
            .map_err(|err| translate("RebootInstance", &err))
    }

    pub(super) async fn open_public_ports(
        &self,
        name: &str,
        range: PortRange,
    ) -> Result<(), ProviderError> {
        let port_info = PortInfo::builder()
            .from_port(i32::from(range.from))
            .to_port(i32::from(range.to))
            .protocol(NetworkProtocol::Tcp)
            .build();
        self.client
            .open_instance_public_ports()
            .instance_name(name)
            .port_info(port_info)
            .send()
            .await
            .map(|_| ())
            .map_err(|err| translate("OpenInstancePublicPorts", &err))
    }
}
