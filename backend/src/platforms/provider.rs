use alloy::providers::{ProviderBuilder, RootProvider};
use alloy::transports::http::{Client, Http};
use std::collections::HashMap;
use tracing::debug;

use super::PlatformError;
use crate::chains::Chain;

/// Per-chain JSON-RPC endpoints. A configured override replaces the public default.
#[derive(Debug, Clone, Default)]
pub struct RpcEndpoints {
    overrides: HashMap<u64, String>,
}

impl RpcEndpoints {
    pub fn new(overrides: HashMap<u64, String>) -> Self {
        Self { overrides }
    }

    pub fn url_for(&self, chain: Chain) -> String {
        self.overrides
            .get(&chain.id())
            .cloned()
            .unwrap_or_else(|| chain.default_rpc_url().to_string())
    }

    /// Builds a fresh read-only provider. Nothing is cached between calls.
    pub fn provider(&self, chain: Chain) -> Result<RootProvider<Http<Client>>, PlatformError> {
        let rpc_url = self.url_for(chain);
        let parsed_url = rpc_url.parse().map_err(|e| {
            PlatformError::Configuration(format!("Invalid RPC URL {}: {}", rpc_url, e))
        })?;

        debug!("Creating provider for {} at {}", chain, rpc_url);
        Ok(ProviderBuilder::new().on_http(parsed_url))
    }
}
