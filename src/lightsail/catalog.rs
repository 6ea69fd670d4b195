//! Read-only catalog queries: zones, bundles, blueprints.

use crate::provider::{CatalogEntry, ProviderError, ZoneInfo};

use super::LightsailClient;
use super::error::translate;

impl LightsailClient {
    pub(super) async fn fetch_zones(&self) -> Result<Vec<ZoneInfo>, ProviderError> {
        let output = self
            .client
            .get_regions()
            .include_availability_zones(true)
            .send()
            .await
            .map_err(|err| translate("GetRegions", &err))?;

        Ok(output
            .regions()
            .iter()
            .flat_map(|region| region.availability_zones())
            .map(|zone| ZoneInfo {
                name: zone.zone_name().unwrap_or_default().to_owned(),
                state: zone.state().unwrap_or_default().to_owned(),
            })
            .collect())
    }

    pub(super) async fn fetch_bundles(&self) -> Result<Vec<CatalogEntry>, ProviderError> {
        let mut entries = Vec::new();
        let mut page_token: Option<String> = None;
        loop {
            let output = self
                .client
                .get_bundles()
                .include_inactive(true)
                .set_page_token(page_token.take())
                .send()
                .await
                .map_err(|err| translate("GetBundles", &err))?;
            entries.extend(output.bundles().iter().map(|bundle| CatalogEntry {
                id: bundle.bundle_id().unwrap_or_default().to_owned(),
                active: bundle.is_active().unwrap_or(false),
            }));
            match output.next_page_token() {
                Some(token) if !token.is_empty() => page_token = Some(token.to_owned()),
                _ => break,
            }
        }
        Ok(entries)
    }

    pub(super) async fn fetch_blueprints(&self) -> Result<Vec<CatalogEntry>, ProviderError> {
        let mut entries = Vec::new();
        let mut page_token: Option<String> = None;
        loop {
            let output = self
                .client
                .get_blueprints()
                .include_inactive(true)
                .set_page_token(page_token.take())
                .send()
                .await
                .map_err(|err| translate("GetBlueprints", &err))?;
            entries.extend(output.blueprints().iter().map(|blueprint| CatalogEntry {
                id: blueprint.blueprint_id().unwrap_or_default().to_owned(),
                active: blueprint.is_active().unwrap_or(false),
            }));
            match output.next_page_token() {
                Some(token) if !token.is_empty() => page_token = Some(token.to_owned()),
                _ => break,
            }
        }
        Ok(entries)
    }
}
