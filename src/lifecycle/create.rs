//! Forward path: keys, key pair, instance, readiness, ports.

use tracing::{debug, info, warn};

use crate::command::CommandRunner;
use crate::error::DriverError;
use crate::keys::{KeyProvisioner, KeyReuse};
use crate::naming::{MachineRecord, ResourceNames};
use crate::provider::{InstanceInfo, InstanceSpec, LightsailApi, ProviderError};
use crate::retry::{Attempt, RetryError, poll_until};
use crate::validate;

use super::{
    InstanceResource, MachineDriver, ensure_key_pair, expose_ports, keep_key_pair, teardown,
};

impl<A, R> MachineDriver<A, R>
where
    A: LightsailApi,
    R: CommandRunner,
{
    /// Provisions the machine, or attaches to `external_address` when one is
    /// configured. Provider-side validation runs first, so an unusable zone,
    /// bundle, or blueprint fails before anything is created.
    ///
    /// Names are persisted before the first mutating provider call, so a
    /// repeated create resumes the same resources instead of leaking new
    /// ones. A machine whose earlier create completed keeps its remote key
    /// pair as is. Once the instance call has been issued, any failure
    /// triggers a full teardown before the error is returned.
    ///
    /// # Errors
    ///
    /// Returns validation, key, and key pair errors directly.
    /// Failures from the instance call onwards are wrapped in
    /// [`DriverError::CreateAborted`] together with any teardown failure.
    pub async fn create(&self) -> Result<InstanceResource, DriverError> {
        if let Some(address) = self.config.external_address.as_deref() {
            self.config.validate()?;
            return self.attach(address);
        }
        validate::validate_config(&self.api, &self.config).await?;

        let (record, reuse) = self.load_or_init_record()?;
        KeyProvisioner::new(&self.runner, &self.store, &self.config.machine_name)
            .provision(self.config.user_key_path().as_deref(), reuse)?;
        if record.address.is_some() {
            keep_key_pair(&self.api, &record.key_pair_name, &self.store).await?;
        } else {
            ensure_key_pair(&self.api, &record.key_pair_name, &self.store).await?;
        }

        match self.provision_instance(record.clone()).await {
            Ok(resource) => Ok(resource),
            Err(err) => Err(self.abort_create(&record, err).await),
        }
    }

    fn attach(&self, address: &str) -> Result<InstanceResource, DriverError> {
        if let Some(existing) = self.store.load_record()?
            && existing.managed
        {
            return Err(DriverError::UnsupportedOperation {
                operation: String::from("attach"),
                reason: format!(
                    "machine {} already owns instance {}",
                    self.config.machine_name, existing.instance_name
                ),
            });
        }

        let record = MachineRecord::attached(
            &self.config.machine_name,
            address,
            &self.config.ssh_user,
        );
        self.store.save_record(&record)?;
        info!(machine = %self.config.machine_name, address, "attached to existing host");
        Ok(InstanceResource {
            instance_name: String::new(),
            key_pair_name: String::new(),
            address: address.to_owned(),
            username: self.config.ssh_user.clone(),
            state_code: None,
            managed: false,
        })
    }

    fn load_or_init_record(&self) -> Result<(MachineRecord, KeyReuse), DriverError> {
        if let Some(record) = self.store.load_record()? {
            if !record.managed {
                return Err(DriverError::UnsupportedOperation {
                    operation: String::from("create"),
                    reason: format!(
                        "machine {} is attached to an external host; remove it first",
                        self.config.machine_name
                    ),
                });
            }
            info!(
                machine = %record.machine_name,
                instance = %record.instance_name,
                "resuming create with recorded names"
            );
            return Ok((record, KeyReuse::Resume));
        }

        if self.store.has_key_material()? {
            return Err(DriverError::KeyMaterialExists {
                path: self.store.machine_dir().to_path_buf(),
            });
        }

        let names = ResourceNames::generate(
            &self.config.machine_name,
            &self.config.bundle,
            &self.config.blueprint,
        );
        let record = MachineRecord::managed(&self.config.machine_name, names);
        self.store.save_record(&record)?;
        info!(
            machine = %record.machine_name,
            instance = %record.instance_name,
            key_pair = %record.key_pair_name,
            "recorded machine resource names"
        );
        Ok((record, KeyReuse::Fresh))
    }

    async fn provision_instance(
        &self,
        mut record: MachineRecord,
    ) -> Result<InstanceResource, DriverError> {
        let spec = InstanceSpec {
            name: record.instance_name.clone(),
            availability_zone: self.config.availability_zone(),
            blueprint_id: self.config.blueprint.clone(),
            bundle_id: self.config.bundle.clone(),
            key_pair_name: record.key_pair_name.clone(),
        };
        self.launch(&spec).await?;
        self.wait_until_running(&spec.name).await?;

        let info = self.fetch_ready_info(&spec.name).await?;
        let address = info
            .public_ip
            .clone()
            .ok_or_else(|| DriverError::InstanceInfoUnavailable {
                name: spec.name.clone(),
                message: String::from("no public address assigned"),
            })?;
        let username = info
            .username
            .clone()
            .unwrap_or_else(|| self.config.ssh_user.clone());

        expose_ports(
            &self.api,
            &spec.name,
            self.config.engine_port,
            self.config.open_all_ports,
        )
        .await?;

        record.address = Some(address.clone());
        record.username = Some(username.clone());
        self.store.save_record(&record)?;
        info!(instance = %spec.name, %address, "machine is running");

        Ok(InstanceResource {
            instance_name: record.instance_name,
            key_pair_name: record.key_pair_name,
            address,
            username,
            state_code: Some(info.state_code),
            managed: true,
        })
    }

    async fn launch(&self, spec: &InstanceSpec) -> Result<(), DriverError> {
        info!(
            instance = %spec.name,
            zone = %spec.availability_zone,
            bundle = %spec.bundle_id,
            blueprint = %spec.blueprint_id,
            "creating instance"
        );
        let Err(create_err) = self.api.create_instance(spec).await else {
            return Ok(());
        };
        if !create_err.is_invalid_input() {
            return Err(DriverError::InstanceCreateFailed {
                name: spec.name.clone(),
                source: create_err,
            });
        }

        match self.api.get_instance(&spec.name).await {
            Ok(existing) => {
                info!(
                    instance = %existing.name,
                    state = %existing.state_name,
                    "instance already exists; continuing with it"
                );
                Ok(())
            }
            Err(lookup_err) => {
                debug!(error = %lookup_err, "conflict lookup failed");
                Err(DriverError::InstanceCreateFailed {
                    name: spec.name.clone(),
                    source: create_err,
                })
            }
        }
    }

    pub(super) async fn wait_until_running(&self, name: &str) -> Result<(), DriverError> {
        let api = &self.api;
        let outcome = poll_until(self.readiness_policy(), || async move {
            match api.get_instance(name).await {
                Ok(info) if info.is_running() => Ok(Attempt::Ready(())),
                Ok(info) => {
                    debug!(instance = name, state = %info.state_name, "instance not running yet");
                    Ok(Attempt::Pending)
                }
                Err(err) if err.is_not_found() => Ok(Attempt::Pending),
                Err(err) => Err(err),
            }
        })
        .await;

        outcome.map_err(|err| match err {
            RetryError::DeadlineExceeded { elapsed, .. } => DriverError::InstanceNotReadyTimeout {
                name: name.to_owned(),
                waited: elapsed,
            },
            RetryError::Aborted(source) => info_unavailable(name, &source),
        })
    }

    pub(super) async fn fetch_ready_info(&self, name: &str) -> Result<InstanceInfo, DriverError> {
        self.api
            .get_instance(name)
            .await
            .map_err(|err| info_unavailable(name, &err))
    }

    async fn abort_create(&self, record: &MachineRecord, err: DriverError) -> DriverError {
        warn!(
            instance = %record.instance_name,
            error = %err,
            "create failed; tearing down"
        );
        let teardown_err = teardown(&self.api, record).await.err();
        if let Some(cleanup) = &teardown_err {
            warn!(error = %cleanup, "teardown after failed create also failed");
        }
        DriverError::create_aborted(err, teardown_err)
    }
}

fn info_unavailable(name: &str, err: &ProviderError) -> DriverError {
    DriverError::InstanceInfoUnavailable {
        name: name.to_owned(),
        message: err.to_string(),
    }
}
