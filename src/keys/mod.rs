//! Local SSH key material for a machine.
//!
//! Keys either come from a user supplied private key (plus its `.pub`
//! sibling), copied into the machine's store directory, or are generated
//! fresh with `ssh-keygen`. The private key always ends up with mode `0600`.

use std::ffi::OsString;

use camino::{Utf8Path, Utf8PathBuf};
use tracing::{info, warn};

use crate::command::CommandRunner;
use crate::error::DriverError;
use crate::store::{MachineStore, PRIVATE_KEY_FILE, PUBLIC_KEY_FILE};

/// Program used to generate fresh key pairs.
pub const SSH_KEYGEN: &str = "ssh-keygen";
/// RSA modulus size for generated keys.
pub const RSA_BITS: u32 = 2048;

/// Paths of the key files inside a machine's store directory.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct LocalKeyFiles {
    /// Private key path.
    pub private_key: Utf8PathBuf,
    /// Public key path.
    pub public_key: Utf8PathBuf,
}

impl LocalKeyFiles {
    fn for_store(store: &MachineStore) -> Self {
        Self {
            private_key: store.private_key_path(),
            public_key: store.public_key_path(),
        }
    }
}

/// Whether a previous attempt for this machine is being resumed.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum KeyReuse {
    /// A machine record exists, so existing key files belong to it.
    Resume,
    /// No record exists; existing key files are an error.
    Fresh,
}

/// Materialises key files for one machine.
#[derive(Debug)]
pub struct KeyProvisioner<'a, R: CommandRunner> {
    runner: &'a R,
    store: &'a MachineStore,
    comment: &'a str,
}

impl<'a, R: CommandRunner> KeyProvisioner<'a, R> {
    /// Builds a provisioner writing into `store`. `comment` is embedded in
    /// generated public keys.
    #[must_use]
    pub const fn new(runner: &'a R, store: &'a MachineStore, comment: &'a str) -> Self {
        Self {
            runner,
            store,
            comment,
        }
    }

    /// Ensures key files exist in the machine directory.
    ///
    /// A complete pair left by an earlier attempt is reused when resuming.
    /// A lone private or public key from an interrupted attempt is discarded
    /// and provisioned again. When import or generation fails, whatever was
    /// written is removed so a retry starts clean.
    ///
    /// # Errors
    ///
    /// Returns [`DriverError::KeyMaterialExists`] when files are present but
    /// `reuse` is [`KeyReuse::Fresh`], [`DriverError::KeyImportFailed`] when a
    /// user key cannot be copied, and [`DriverError::KeyGenerationFailed`]
    /// when generation fails.
    pub fn provision(
        &self,
        user_key: Option<&Utf8Path>,
        reuse: KeyReuse,
    ) -> Result<LocalKeyFiles, DriverError> {
        let files = LocalKeyFiles::for_store(self.store);
        if self.store.has_key_material()? {
            match reuse {
                KeyReuse::Fresh => {
                    return Err(DriverError::KeyMaterialExists {
                        path: self.store.machine_dir().to_path_buf(),
                    });
                }
                KeyReuse::Resume if self.store.has_key_pair()? => {
                    info!(path = %self.store.machine_dir(), "reusing existing key material");
                    return Ok(files);
                }
                KeyReuse::Resume => {
                    warn!(path = %self.store.machine_dir(), "discarding incomplete key material");
                    self.store.remove_key_material()?;
                }
            }
        }

        let written = match user_key {
            Some(path) => self.import(path),
            None => self.generate(&files.private_key),
        };
        if let Err(err) = written {
            if let Err(cleanup) = self.store.remove_key_material() {
                warn!(error = %cleanup, "failed to remove partial key material");
            }
            return Err(err);
        }
        Ok(files)
    }

    fn import(&self, private_key: &Utf8Path) -> Result<(), DriverError> {
        let public_key = Utf8PathBuf::from(format!("{private_key}.pub"));
        let failed = |message: String| DriverError::KeyImportFailed {
            path: private_key.to_path_buf(),
            message,
        };

        self.store
            .copy_in(private_key, PRIVATE_KEY_FILE)
            .map_err(|err| failed(err.to_string()))?;
        self.store
            .copy_in(&public_key, PUBLIC_KEY_FILE)
            .map_err(|err| failed(err.to_string()))?;
        self.store
            .restrict_private_key()
            .map_err(|err| failed(err.to_string()))?;
        info!(source = %private_key, "copied user SSH key into machine store");
        Ok(())
    }

    fn generate(&self, private_key: &Utf8Path) -> Result<(), DriverError> {
        let failed = |message: String| DriverError::KeyGenerationFailed { message };

        self.store
            .ensure_dir()
            .map_err(|err| failed(err.to_string()))?;
        let args = keygen_args(private_key, self.comment);
        let output = self
            .runner
            .run(SSH_KEYGEN, &args)
            .map_err(|err| failed(err.to_string()))?;
        if !output.is_success() {
            return Err(failed(format!(
                "{SSH_KEYGEN} exited with status {}: {}",
                output.status_text(),
                output.stderr.trim()
            )));
        }
        self.store
            .restrict_private_key()
            .map_err(|err| failed(err.to_string()))?;
        info!(path = %private_key, "generated SSH key pair");
        Ok(())
    }
}

fn keygen_args(private_key: &Utf8Path, comment: &str) -> Vec<OsString> {
    let bits = RSA_BITS.to_string();
    [
        "-t",
        "rsa",
        "-b",
        bits.as_str(),
        "-f",
        private_key.as_str(),
        "-N",
        "",
        "-q",
        "-C",
        comment,
    ]
    .into_iter()
    .map(OsString::from)
    .collect()
}

#[cfg(test)]
mod tests;
