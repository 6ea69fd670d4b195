//! Remote key pair replacement.

use tracing::{debug, info};

use crate::error::DriverError;
use crate::provider::{KeyPairInfo, LightsailApi, ProviderError};
use crate::store::MachineStore;

/// Replaces any key pair called `name` with the machine's local public key.
///
/// A missing key pair is not an error; an existing one is deleted first so
/// the imported material always matches the local files.
///
/// # Errors
///
/// Returns [`DriverError::PublicKeyUnreadable`] when the local public key
/// cannot be read and [`DriverError::KeyImportRejected`] for any provider
/// failure other than not-found.
pub async fn ensure_key_pair<A: LightsailApi + ?Sized>(
    api: &A,
    name: &str,
    store: &MachineStore,
) -> Result<KeyPairInfo, DriverError> {
    match api.get_key_pair(name).await {
        Ok(existing) => {
            info!(key_pair = %existing.name, "replacing existing key pair");
            match api.delete_key_pair(name).await {
                Ok(()) => {}
                Err(err) if err.is_not_found() => debug!(key_pair = name, "key pair vanished"),
                Err(err) => return Err(rejected(name, err)),
            }
        }
        Err(err) if err.is_not_found() => debug!(key_pair = name, "no existing key pair"),
        Err(err) => return Err(rejected(name, err)),
    }
    import_local_key(api, name, store).await
}

/// Keeps an existing key pair called `name` untouched, importing the local
/// public key only when the provider no longer has one.
///
/// # Errors
///
/// Same as [`ensure_key_pair`].
pub async fn keep_key_pair<A: LightsailApi + ?Sized>(
    api: &A,
    name: &str,
    store: &MachineStore,
) -> Result<KeyPairInfo, DriverError> {
    match api.get_key_pair(name).await {
        Ok(existing) => {
            debug!(key_pair = %existing.name, "key pair already present");
            Ok(existing)
        }
        Err(err) if err.is_not_found() => {
            info!(key_pair = name, "key pair missing; importing it again");
            import_local_key(api, name, store).await
        }
        Err(err) => Err(rejected(name, err)),
    }
}

async fn import_local_key<A: LightsailApi + ?Sized>(
    api: &A,
    name: &str,
    store: &MachineStore,
) -> Result<KeyPairInfo, DriverError> {
    let public_key = store
        .read_public_key()
        .map_err(|err| DriverError::PublicKeyUnreadable {
            path: store.public_key_path(),
            message: err.to_string(),
        })?;

    let imported = api
        .import_key_pair(name, public_key.trim())
        .await
        .map_err(|err| rejected(name, err))?;
    info!(key_pair = %imported.name, "imported key pair");
    Ok(imported)
}

fn rejected(name: &str, source: ProviderError) -> DriverError {
    DriverError::KeyImportRejected {
        name: name.to_owned(),
        source,
    }
}
