//! Key pair calls.

use crate::provider::{KeyPairInfo, ProviderError};

use super::LightsailClient;
use super::error::translate;

impl LightsailClient {
    pub(super) async fn fetch_key_pair(&self, name: &str) -> Result<KeyPairInfo, ProviderError> {
        let output = self
            .client
            .get_key_pair()
            .key_pair_name(name)
            .send()
            .await
            .map_err(|err| translate("GetKeyPair", &err))?;
        let key_pair = output.key_pair().ok_or_else(|| {
            ProviderError::not_found("GetKeyPair", format!("key pair {name} not returned"))
        })?;
        Ok(KeyPairInfo {
            name: key_pair.name().unwrap_or(name).to_owned(),
        })
    }

    pub(super) async fn upload_key_pair(
        &self,
        name: &str,
        public_key: &str,
    ) -> Result<KeyPairInfo, ProviderError> {
        self.client
            .import_key_pair()
            .key_pair_name(name)
            .public_key_base64(public_key)
            .send()
            .await
            .map_err(|err| translate("ImportKeyPair", &err))?;
        Ok(KeyPairInfo {
            name: name.to_owned(),
        })
    }

    pub(super) async fn remove_key_pair(&self, name: &str) -> Result<(), ProviderError> {
        self.client
            .delete_key_pair()
            .key_pair_name(name)
            .send()
            .await
            .map(|_| ())
            .map_err(|err| translate("DeleteKeyPair", &err))
    }
}
