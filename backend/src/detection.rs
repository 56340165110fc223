use std::sync::Arc;
use tracing::{debug, info};

use crate::chains::Chain;
use crate::platforms::{PlatformError, PlatformService};
use crate::registry::PlatformRegistry;
use crate::types::NftReference;

/// Matches content URLs against the registry and binds adapters to chains.
#[derive(Clone)]
pub struct DetectionEngine {
    registry: Arc<PlatformRegistry>,
}

impl DetectionEngine {
    pub fn new(registry: Arc<PlatformRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &PlatformRegistry {
        &self.registry
    }

    /// `Ok(None)` when no platform recognises the URL. Extractor failures propagate.
    pub async fn detect_nft_details(&self, url: &str) -> Result<Option<NftReference>, PlatformError> {
        let Some((descriptor, details)) = self.registry.lookup(url).await? else {
            debug!("No platform matched {}", url);
            return Ok(None);
        };

        info!(
            "Detected {} NFT {}:{} on {}",
            descriptor.name, details.contract_address, details.token_id, details.chain
        );
        let service = self.registry.create_service(descriptor, details.chain)?;

        Ok(Some(NftReference {
            platform_name: descriptor.name.clone(),
            platform_logo_url: descriptor.logo_url.clone(),
            details,
            service,
        }))
    }

    /// Rebuilds the adapter for a platform name persisted in init data.
    pub fn get_service(&self, platform_name: &str, chain: Chain) -> Result<Arc<dyn PlatformService>, PlatformError> {
        let descriptor = self
            .registry
            .get(platform_name)
            .ok_or_else(|| PlatformError::UnknownPlatform(platform_name.to_string()))?;
        self.registry.create_service(descriptor, chain)
    }
}
