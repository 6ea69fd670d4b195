//! Configuration loading via `ortho-config`.

use std::ffi::OsString;
use std::time::Duration;

use camino::Utf8PathBuf;
use ortho_config::OrthoConfig;
use serde::Deserialize;
use thiserror::Error;

use crate::store::is_valid_machine_name;

/// Default region for new machines.
pub const DEFAULT_REGION: &str = "ap-northeast-1";
/// Default availability zone suffix appended to the region.
pub const DEFAULT_ZONE: &str = "a";
/// Default blueprint (image) identifier.
pub const DEFAULT_BLUEPRINT: &str = "ubuntu_18_04";
/// Default bundle (size) identifier.
pub const DEFAULT_BUNDLE: &str = "small_2_0";
/// Default container engine port.
pub const DEFAULT_ENGINE_PORT: u16 = 2376;
/// Default root of the per-machine store.
pub const DEFAULT_STORE_PATH: &str = "~/.lightsail-machine";
/// Upper bound, in seconds, on every configured wait or interval (one day).
pub const MAX_WAIT_SECS: u64 = 86_400;

/// Machine settings derived from defaults, configuration files, environment
/// variables, and CLI flags.
#[derive(Clone, Debug, Deserialize, OrthoConfig, PartialEq, Eq)]
#[ortho_config(
    prefix = "LIGHTSAIL",
    discovery(
        app_name = "lightsail-machine",
        env_var = "LIGHTSAIL_CONFIG_PATH",
        config_file_name = "lightsail-machine.toml",
        dotfile_name = ".lightsail-machine.toml",
        project_file_name = "lightsail-machine.toml"
    )
)]
pub struct MachineConfig {
    /// Logical machine name. Usually supplied by the host tool rather than
    /// configuration files.
    #[ortho_config(default = String::new())]
    pub machine_name: String,
    /// Root directory under which each machine gets its own namespace.
    /// Supports tilde expansion.
    #[ortho_config(default = DEFAULT_STORE_PATH.to_owned())]
    pub store_path: String,
    /// AWS region. Defaults to `ap-northeast-1`.
    #[ortho_config(default = DEFAULT_REGION.to_owned())]
    pub region: String,
    /// Zone suffix appended to the region (`a`, `b`, ...).
    #[ortho_config(default = DEFAULT_ZONE.to_owned())]
    pub zone: String,
    /// Blueprint identifier used as the instance image.
    #[ortho_config(default = DEFAULT_BLUEPRINT.to_owned())]
    pub blueprint: String,
    /// Bundle identifier used as the instance size.
    #[ortho_config(default = DEFAULT_BUNDLE.to_owned())]
    pub bundle: String,
    /// Optional path to an existing SSH private key. Its `.pub` sibling must
    /// exist too. When absent a fresh key pair is generated.
    pub ssh_key_path: Option<String>,
    /// Login user used when the provider does not report one.
    #[ortho_config(default = "ubuntu".to_owned())]
    pub ssh_user: String,
    /// SSH port probed by the state prober.
    #[ortho_config(default = 22)]
    pub ssh_port: u16,
    /// Container engine port opened on the firewall and used in the URL.
    #[ortho_config(default = DEFAULT_ENGINE_PORT)]
    pub engine_port: u16,
    /// Opens every TCP port instead of only the engine port.
    #[ortho_config(default = false)]
    pub open_all_ports: bool,
    /// Static access key identifier. When unset the default credential
    /// chain is used.
    pub access_key_id: Option<String>,
    /// Static secret access key paired with `access_key_id`.
    pub secret_access_key: Option<String>,
    /// Optional session token for temporary credentials.
    pub session_token: Option<String>,
    /// Address of an existing host to attach to instead of provisioning one.
    pub external_address: Option<String>,
    /// Seconds between readiness polls.
    #[ortho_config(default = 5)]
    pub poll_interval_secs: u64,
    /// Seconds before the readiness poll gives up.
    #[ortho_config(default = 300)]
    pub wait_timeout_secs: u64,
    /// Seconds allowed for a single TCP probe.
    #[ortho_config(default = 2)]
    pub probe_timeout_secs: u64,
}

/// Metadata for a configuration field, used to generate actionable error messages.
struct FieldMetadata {
    description: &'static str,
    env_var: &'static str,
    toml_key: &'static str,
}

impl FieldMetadata {
    const fn new(description: &'static str, env_var: &'static str, toml_key: &'static str) -> Self {
        Self {
            description,
            env_var,
            toml_key,
        }
    }
}

impl MachineConfig {
    /// Builds a configuration populated with the documented defaults.
    #[must_use]
    pub fn with_defaults(machine_name: impl Into<String>) -> Self {
        Self {
            machine_name: machine_name.into(),
            store_path: DEFAULT_STORE_PATH.to_owned(),
            region: DEFAULT_REGION.to_owned(),
            zone: DEFAULT_ZONE.to_owned(),
            blueprint: DEFAULT_BLUEPRINT.to_owned(),
            bundle: DEFAULT_BUNDLE.to_owned(),
            ssh_key_path: None,
            ssh_user: String::from("ubuntu"),
            ssh_port: 22,
            engine_port: DEFAULT_ENGINE_PORT,
            open_all_ports: false,
            access_key_id: None,
            secret_access_key: None,
            session_token: None,
            external_address: None,
            poll_interval_secs: 5,
            wait_timeout_secs: 300,
            probe_timeout_secs: 2,
        }
    }

    /// Loads configuration without attempting to parse CLI arguments.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] when the merge fails.
    pub fn load_without_cli_args() -> Result<Self, ConfigError> {
        Self::load_from_iter([OsString::from("lightsail-machine")])
            .map_err(|err| ConfigError::Parse(err.to_string()))
    }

    /// Full availability zone name, for example `ap-northeast-1a`.
    #[must_use]
    pub fn availability_zone(&self) -> String {
        format!("{}{}", self.region, self.zone)
    }

    /// Store root with any leading `~/` expanded.
    #[must_use]
    pub fn store_root(&self) -> Utf8PathBuf {
        Utf8PathBuf::from(expand_tilde(&self.store_path))
    }

    /// User supplied private key path with any leading `~/` expanded.
    #[must_use]
    pub fn user_key_path(&self) -> Option<Utf8PathBuf> {
        self.ssh_key_path
            .as_deref()
            .map(|path| Utf8PathBuf::from(expand_tilde(path)))
    }

    /// Interval between readiness polls.
    #[must_use]
    pub const fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    /// Deadline for the readiness poll.
    #[must_use]
    pub const fn wait_timeout(&self) -> Duration {
        Duration::from_secs(self.wait_timeout_secs)
    }

    /// Bound on a single TCP probe.
    #[must_use]
    pub const fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.probe_timeout_secs)
    }

    fn require_field(value: &str, metadata: &FieldMetadata) -> Result<(), ConfigError> {
        if value.trim().is_empty() {
            return Err(ConfigError::MissingField(format!(
                "missing {}: set {} or add {} to lightsail-machine.toml",
                metadata.description, metadata.env_var, metadata.toml_key
            )));
        }
        Ok(())
    }

    fn require_optional_field(
        value: Option<&str>,
        metadata: &FieldMetadata,
    ) -> Result<(), ConfigError> {
        value.map_or(Ok(()), |present| Self::require_field(present, metadata))
    }

    /// Performs local validation on required fields. Error messages include
    /// guidance on how to provide missing values via environment variables or
    /// configuration files. No provider calls are made.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingField`] when a required field is empty.
    /// Returns [`ConfigError::InvalidValue`] when the machine name is not a
    /// single path component, when a port or wait is zero or longer than
    /// [`MAX_WAIT_SECS`], or when static credentials are only half set.
    pub fn validate(&self) -> Result<(), ConfigError> {
        Self::require_field(
            &self.machine_name,
            &FieldMetadata::new("machine name", "LIGHTSAIL_MACHINE_NAME", "machine_name"),
        )?;
        if !is_valid_machine_name(&self.machine_name) {
            return Err(ConfigError::InvalidValue(format!(
                "machine_name {:?} must be one path component without separators",
                self.machine_name
            )));
        }
        Self::require_field(
            &self.store_path,
            &FieldMetadata::new("store path", "LIGHTSAIL_STORE_PATH", "store_path"),
        )?;
        Self::require_field(
            &self.region,
            &FieldMetadata::new("region", "LIGHTSAIL_REGION", "region"),
        )?;
        Self::require_field(
            &self.zone,
            &FieldMetadata::new("zone suffix", "LIGHTSAIL_ZONE", "zone"),
        )?;
        Self::require_field(
            &self.blueprint,
            &FieldMetadata::new("blueprint", "LIGHTSAIL_BLUEPRINT", "blueprint"),
        )?;
        Self::require_field(
            &self.bundle,
            &FieldMetadata::new("bundle", "LIGHTSAIL_BUNDLE", "bundle"),
        )?;
        Self::require_field(
            &self.ssh_user,
            &FieldMetadata::new("SSH user", "LIGHTSAIL_SSH_USER", "ssh_user"),
        )?;
        Self::require_optional_field(
            self.ssh_key_path.as_deref(),
            &FieldMetadata::new("SSH key path", "LIGHTSAIL_SSH_KEY_PATH", "ssh_key_path"),
        )?;
        Self::require_optional_field(
            self.external_address.as_deref(),
            &FieldMetadata::new(
                "external address",
                "LIGHTSAIL_EXTERNAL_ADDRESS",
                "external_address",
            ),
        )?;

        if self.access_key_id.is_some() != self.secret_access_key.is_some() {
            return Err(ConfigError::InvalidValue(String::from(
                "access_key_id and secret_access_key must be set together",
            )));
        }
        if self.engine_port == 0 {
            return Err(ConfigError::InvalidValue(String::from(
                "engine_port must be non-zero",
            )));
        }
        if self.poll_interval_secs == 0 || self.wait_timeout_secs == 0 {
            return Err(ConfigError::InvalidValue(String::from(
                "poll_interval_secs and wait_timeout_secs must be non-zero",
            )));
        }
        for (key, value) in [
            ("poll_interval_secs", self.poll_interval_secs),
            ("wait_timeout_secs", self.wait_timeout_secs),
            ("probe_timeout_secs", self.probe_timeout_secs),
        ] {
            if value > MAX_WAIT_SECS {
                return Err(ConfigError::InvalidValue(format!(
                    "{key} must not exceed {MAX_WAIT_SECS} seconds, got {value}"
                )));
            }
        }
        Ok(())
    }
}

/// Expands a leading `~/` prefix to the user's home directory.
///
/// The input is returned unchanged when `HOME` is not set.
#[must_use]
pub fn expand_tilde(path: &str) -> String {
    if let Some(rest) = path.strip_prefix("~/")
        && let Some(home) = std::env::var_os("HOME")
    {
        return format!("{}/{rest}", home.to_string_lossy());
    }
    path.to_owned()
}

/// Errors raised during configuration loading and validation.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum ConfigError {
    /// Indicates a required configuration field is empty or missing.
    #[error("missing configuration field: {0}")]
    MissingField(String),
    /// Indicates a field holds a value that cannot be used.
    #[error("invalid configuration value: {0}")]
    InvalidValue(String),
    /// Surfaces errors from the `ortho-config` loader.
    #[error("configuration parsing failed: {0}")]
    Parse(String),
}

impl From<ortho_config::OrthoError> for ConfigError {
    fn from(value: ortho_config::OrthoError) -> Self {
        Self::Parse(value.to_string())
    }
}
