use async_trait::async_trait;
use regex::Regex;
use reqwest::Client;
use std::sync::Arc;
use tracing::info;

use crate::chains::Chain;
use crate::config::{ApiEndpoints, KitConfig};
use crate::platforms::{
    artblocks, opensea, pods, rarible, superrare, zora, ArtBlocksService, OpenSeaService,
    PlatformError, PlatformService, PodsService, RaribleService, RpcEndpoints, ServiceConfig,
    SuperRareService, ZoraService,
};
use crate::types::NftDetails;
use crate::utils::MetadataFetcher;

/// Turns a URL already matched by the descriptor's pattern into NFT identifiers.
#[async_trait]
pub trait UrlExtractor: Send + Sync {
    async fn extract(&self, url: &str) -> Result<Option<NftDetails>, PlatformError>;
}

pub type ServiceFactory =
    Arc<dyn Fn(ServiceConfig) -> Result<Arc<dyn PlatformService>, PlatformError> + Send + Sync>;

/// Wraps an adapter constructor as a type-erased factory.
pub fn service_factory<S, F>(build: F) -> ServiceFactory
where
    S: PlatformService + 'static,
    F: Fn(ServiceConfig) -> Result<S, PlatformError> + Send + Sync + 'static,
{
    let factory = move |config: ServiceConfig| -> Result<Arc<dyn PlatformService>, PlatformError> {
        Ok(Arc::new(build(config)?))
    };
    Arc::new(factory)
}

#[derive(Clone)]
pub struct PlatformDescriptor {
    pub name: String,
    pub display_name: String,
    pub logo_url: String,
    pub url_pattern: Regex,
    pub extractor: Arc<dyn UrlExtractor>,
    pub factory: ServiceFactory,
    pub api_key: Option<String>,
}

impl PlatformDescriptor {
    pub fn new(
        name: &str,
        logo_url: &str,
        url_pattern: &Regex,
        extractor: Arc<dyn UrlExtractor>,
        factory: ServiceFactory,
    ) -> Self {
        Self {
            name: name.to_string(),
            display_name: name.to_string(),
            logo_url: logo_url.to_string(),
            url_pattern: url_pattern.clone(),
            extractor,
            factory,
            api_key: None,
        }
    }

    pub fn with_api_key(mut self, api_key: String) -> Self {
        self.api_key = Some(api_key);
        self
    }
}

impl std::fmt::Debug for PlatformDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlatformDescriptor")
            .field("name", &self.name)
            .field("url_pattern", &self.url_pattern.as_str())
            .field("has_api_key", &self.api_key.is_some())
            .finish()
    }
}

/// Shared resources handed to every adapter the registry builds.
#[derive(Clone)]
pub struct ServiceContext {
    pub endpoints: ApiEndpoints,
    pub rpc: RpcEndpoints,
    pub http: Client,
    pub metadata: MetadataFetcher,
}

impl ServiceContext {
    pub fn from_config(config: &KitConfig) -> Result<Self, PlatformError> {
        let http = Client::builder()
            .timeout(config.http_timeout())
            .build()
            .map_err(|e| PlatformError::Configuration(format!("Failed to create HTTP client: {}", e)))?;
        let metadata = MetadataFetcher::new(
            http.clone(),
            config.endpoints.gateways.clone(),
            config.metadata_timeout(),
        );

        Ok(Self {
            endpoints: config.endpoints.clone(),
            rpc: RpcEndpoints::new(config.fallback_rpcs.clone()),
            http,
            metadata,
        })
    }
}

/// Ordered set of platform descriptors, fixed once the owning kit is built.
#[derive(Clone)]
pub struct PlatformRegistry {
    descriptors: Vec<PlatformDescriptor>,
    context: ServiceContext,
}

impl PlatformRegistry {
    pub fn new(context: ServiceContext) -> Self {
        Self { descriptors: Vec::new(), context }
    }

    /// Registry holding every built-in platform. Platforms that need an API key
    /// are left out when none is configured.
    pub fn from_config(config: &KitConfig) -> Result<Self, PlatformError> {
        let context = ServiceContext::from_config(config)?;
        let mut registry = Self::new(context.clone());

        registry.register(PlatformDescriptor::new(
            zora::PLATFORM_NAME,
            zora::PLATFORM_LOGO_URL,
            &zora::URL_PATTERN,
            Arc::new(zora::ZoraUrlExtractor),
            service_factory(ZoraService::new),
        ));
        registry.register(PlatformDescriptor::new(
            pods::PLATFORM_NAME,
            pods::PLATFORM_LOGO_URL,
            &pods::URL_PATTERN,
            Arc::new(pods::PodsUrlExtractor::new(
                context.http.clone(),
                &context.endpoints.pods_api_url,
            )),
            service_factory(PodsService::new),
        ));
        registry.register(PlatformDescriptor::new(
            artblocks::PLATFORM_NAME,
            artblocks::PLATFORM_LOGO_URL,
            &artblocks::URL_PATTERN,
            Arc::new(artblocks::ArtBlocksUrlExtractor),
            service_factory(ArtBlocksService::new),
        ));
        registry.register(PlatformDescriptor::new(
            superrare::PLATFORM_NAME,
            superrare::PLATFORM_LOGO_URL,
            &superrare::URL_PATTERN,
            Arc::new(superrare::SuperRareUrlExtractor),
            service_factory(SuperRareService::new),
        ));

        if let Some(api_key) = config.rarible_api_key.clone().filter(|key| !key.is_empty()) {
            registry.register(
                PlatformDescriptor::new(
                    rarible::PLATFORM_NAME,
                    rarible::PLATFORM_LOGO_URL,
                    &rarible::URL_PATTERN,
                    Arc::new(rarible::RaribleUrlExtractor),
                    service_factory(RaribleService::new),
                )
                .with_api_key(api_key),
            );
        }

        if let Some(api_key) = config.opensea_api_key.clone().filter(|key| !key.is_empty()) {
            registry.register(
                PlatformDescriptor::new(
                    opensea::PLATFORM_NAME,
                    opensea::PLATFORM_LOGO_URL,
                    &opensea::URL_PATTERN,
                    Arc::new(opensea::OpenSeaUrlExtractor),
                    service_factory(OpenSeaService::new),
                )
                .with_api_key(api_key),
            );
        }

        info!("Platform registry initialized with {} platforms: {:?}", registry.len(), registry.names());
        Ok(registry)
    }

    pub fn register(&mut self, descriptor: PlatformDescriptor) {
        self.descriptors.retain(|existing| existing.name != descriptor.name);
        self.descriptors.push(descriptor);
    }

    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }

    pub fn names(&self) -> Vec<&str> {
        self.descriptors.iter().map(|d| d.name.as_str()).collect()
    }

    pub fn get(&self, name: &str) -> Option<&PlatformDescriptor> {
        self.descriptors.iter().find(|d| d.name == name)
    }

    /// Tests patterns in registration order and runs the first match's extractor.
    pub async fn lookup(&self, url: &str) -> Result<Option<(&PlatformDescriptor, NftDetails)>, PlatformError> {
        let Some(descriptor) = self.descriptors.iter().find(|d| d.url_pattern.is_match(url)) else {
            return Ok(None);
        };
        let details = descriptor.extractor.extract(url).await?;
        Ok(details.map(|details| (descriptor, details)))
    }

    pub fn service_config(&self, descriptor: &PlatformDescriptor, chain: Chain) -> ServiceConfig {
        ServiceConfig {
            chain,
            platform_name: descriptor.name.clone(),
            platform_logo_url: descriptor.logo_url.clone(),
            api_key: descriptor.api_key.clone(),
            endpoints: self.context.endpoints.clone(),
            rpc: self.context.rpc.clone(),
            http: self.context.http.clone(),
            metadata: self.context.metadata.clone(),
        }
    }

    pub fn create_service(
        &self,
        descriptor: &PlatformDescriptor,
        chain: Chain,
    ) -> Result<Arc<dyn PlatformService>, PlatformError> {
        (descriptor.factory)(self.service_config(descriptor, chain))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keyed_platforms_need_keys() {
        let registry = PlatformRegistry::from_config(&KitConfig::new("decent")).unwrap();
        assert_eq!(registry.names(), vec!["Zora", "Pods", "ArtBlocks", "SuperRare"]);

        let mut config = KitConfig::new("decent");
        config.rarible_api_key = Some("rarible".into());
        config.opensea_api_key = Some("opensea".into());
        let registry = PlatformRegistry::from_config(&config).unwrap();
        assert_eq!(
            registry.names(),
            vec!["Zora", "Pods", "ArtBlocks", "SuperRare", "Rarible", "OpenSea"]
        );
        assert_eq!(registry.get("OpenSea").unwrap().api_key.as_deref(), Some("opensea"));
    }

    #[tokio::test]
    async fn test_lookup_without_match_is_none() {
        let registry = PlatformRegistry::from_config(&KitConfig::new("decent")).unwrap();
        assert!(registry.lookup("https://example.com/nft/1").await.unwrap().is_none());
    }

    #[test]
    fn test_service_construction_is_offline() {
        let registry = PlatformRegistry::from_config(&KitConfig::new("decent")).unwrap();
        let zora = registry.get("Zora").unwrap();
        let service = registry.create_service(zora, Chain::Base).unwrap();
        assert_eq!(service.platform_name(), "Zora");
        assert_eq!(service.chain(), Chain::Base);

        assert!(matches!(
            registry.create_service(zora, Chain::Polygon),
            Err(PlatformError::UnsupportedChain(_))
        ));
    }
}
