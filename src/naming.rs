//! Deterministic resource names and the stored machine association.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

const SUFFIX_LEN: usize = 8;
const FALLBACK_SLUG: &str = "machine";

/// Provider resource names owned by one machine.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ResourceNames {
    /// Instance name.
    pub instance_name: String,
    /// Key pair name.
    pub key_pair_name: String,
}

impl ResourceNames {
    /// Derives names from the machine name, bundle, blueprint, and a fresh
    /// random disambiguator.
    #[must_use]
    pub fn generate(machine_name: &str, bundle: &str, blueprint: &str) -> Self {
        let suffix: String = Uuid::new_v4()
            .simple()
            .to_string()
            .chars()
            .take(SUFFIX_LEN)
            .collect();
        Self::from_parts(machine_name, bundle, blueprint, &suffix)
    }

    /// Derives names from explicit parts. The same inputs always produce the
    /// same names.
    #[must_use]
    pub fn from_parts(machine_name: &str, bundle: &str, blueprint: &str, suffix: &str) -> Self {
        let slug = slugify(machine_name);
        let machine = if slug.is_empty() {
            FALLBACK_SLUG
        } else {
            slug.as_str()
        };
        let base = format!(
            "{machine}-{}-{}-{}",
            slugify(bundle),
            slugify(blueprint),
            slugify(suffix)
        );
        Self {
            key_pair_name: format!("{base}-key"),
            instance_name: base,
        }
    }
}

/// Explicit association between a machine and the provider resources it
/// owns. Persisted as `machine.json` before the first mutating call.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct MachineRecord {
    /// Logical machine name.
    pub machine_name: String,
    /// Instance name chosen for this machine.
    pub instance_name: String,
    /// Key pair name chosen for this machine.
    pub key_pair_name: String,
    /// `false` when the machine was attached to an externally supplied
    /// address and owns no provider resources.
    pub managed: bool,
    /// Last known public address.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    /// Last known login user.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
}

impl MachineRecord {
    /// Record for a machine whose resources the driver provisions.
    #[must_use]
    pub fn managed(machine_name: &str, names: ResourceNames) -> Self {
        Self {
            machine_name: machine_name.to_owned(),
            instance_name: names.instance_name,
            key_pair_name: names.key_pair_name,
            managed: true,
            address: None,
            username: None,
        }
    }

    /// Record for a machine attached to an existing host.
    #[must_use]
    pub fn attached(machine_name: &str, address: &str, username: &str) -> Self {
        Self {
            machine_name: machine_name.to_owned(),
            instance_name: String::new(),
            key_pair_name: String::new(),
            managed: false,
            address: Some(address.to_owned()),
            username: Some(username.to_owned()),
        }
    }
}

fn slugify(value: &str) -> String {
    let mut slug = String::new();
    let mut last_dash = false;
    for ch in value.chars() {
        if ch.is_ascii_alphanumeric() {
            slug.push(ch.to_ascii_lowercase());
            last_dash = false;
        } else if !last_dash {
            slug.push('-');
            last_dash = true;
        }
    }
    slug.trim_matches('-').to_owned()
}
