use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::env;
use std::fs;
use std::time::Duration;
use thiserror::Error;
use tracing::{info, warn};

use crate::utils::metadata::Gateways;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Io { path: String, source: std::io::Error },
    #[error("Failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("Invalid configuration: {}", .0.join("; "))]
    Invalid(Vec<String>),
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ApiEndpoints {
    pub bridge_api_url: String,
    pub opensea_api_url: String,
    pub rarible_api_url: String,
    pub pods_api_url: String,
    pub gateways: Gateways,
}

impl Default for ApiEndpoints {
    fn default() -> Self {
        Self {
            bridge_api_url: "https://box-v2.api.decent.xyz/api/getBoxAction".to_string(),
            opensea_api_url: "https://api.opensea.io".to_string(),
            rarible_api_url: "https://api.rarible.org".to_string(),
            pods_api_url: "https://pods.media".to_string(),
            gateways: Gateways::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct KitConfig {
    pub decent_api_key: String,
    pub opensea_api_key: Option<String>,
    pub rarible_api_key: Option<String>,
    /// RPC URL per chain id, replacing the public default.
    pub fallback_rpcs: HashMap<u64, String>,
    pub endpoints: ApiEndpoints,
    pub action_module_address: String,
    pub http_timeout_secs: u64,
    pub metadata_timeout_secs: u64,
}

impl Default for KitConfig {
    fn default() -> Self {
        Self {
            decent_api_key: String::new(),
            opensea_api_key: None,
            rarible_api_key: None,
            fallback_rpcs: HashMap::new(),
            endpoints: ApiEndpoints::default(),
            action_module_address: "0x028f6aeE3CF9e1cA725f4C47d9460801b6c7508A".to_string(),
            http_timeout_secs: 10,
            metadata_timeout_secs: 5,
        }
    }
}

impl KitConfig {
    pub fn new(decent_api_key: impl Into<String>) -> Self {
        Self { decent_api_key: decent_api_key.into(), ..Self::default() }
    }

    pub fn load_from_file(path: &str) -> Result<Self, ConfigError> {
        info!("Loading kit configuration from: {}", path);
        let content = fs::read_to_string(path)
            .map_err(|source| ConfigError::Io { path: path.to_string(), source })?;
        let config: KitConfig = serde_json::from_str(&content)?;
        info!("Kit configuration loaded successfully");
        Ok(config)
    }

    pub fn save_to_file(&self, path: &str) -> Result<(), ConfigError> {
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content).map_err(|source| ConfigError::Io { path: path.to_string(), source })?;
        info!("Kit configuration saved to: {}", path);
        Ok(())
    }

    /// Reads `NFT_KIT_*` variables on top of the defaults.
    pub fn load_from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();
        let non_empty = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        if let Some(key) = non_empty("NFT_KIT_DECENT_API_KEY") {
            config.decent_api_key = key;
        }
        if let Some(key) = non_empty("NFT_KIT_OPENSEA_API_KEY") {
            config.opensea_api_key = Some(key);
            info!("Loaded API key for platform: OpenSea");
        }
        if let Some(key) = non_empty("NFT_KIT_RARIBLE_API_KEY") {
            config.rarible_api_key = Some(key);
            info!("Loaded API key for platform: Rarible");
        }
        if let Some(url) = non_empty("NFT_KIT_BRIDGE_API_URL") {
            config.endpoints.bridge_api_url = url;
        }
        if let Some(url) = non_empty("NFT_KIT_OPENSEA_API_URL") {
            config.endpoints.opensea_api_url = url;
        }
        if let Some(url) = non_empty("NFT_KIT_RARIBLE_API_URL") {
            config.endpoints.rarible_api_url = url;
        }
        if let Some(url) = non_empty("NFT_KIT_PODS_API_URL") {
            config.endpoints.pods_api_url = url;
        }
        if let Some(address) = non_empty("NFT_KIT_ACTION_MODULE_ADDRESS") {
            config.action_module_address = address;
        }
        if let Some(raw) = non_empty("NFT_KIT_HTTP_TIMEOUT_SECS") {
            match raw.parse() {
                Ok(secs) => config.http_timeout_secs = secs,
                Err(_) => warn!("Ignoring invalid NFT_KIT_HTTP_TIMEOUT_SECS: {}", raw),
            }
        }

        for chain in crate::chains::DESTINATION_CHAINS {
            let env_key = format!("NFT_KIT_RPC_{}", chain.id());
            if let Some(rpc_url) = non_empty(&env_key) {
                info!("Loaded custom RPC URL for chain {}: {}", chain.id(), rpc_url);
                config.fallback_rpcs.insert(chain.id(), rpc_url);
            }
        }

        config
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }

    pub fn metadata_timeout(&self) -> Duration {
        Duration::from_secs(self.metadata_timeout_secs)
    }

    /// Collects every problem instead of stopping at the first.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut errors = Vec::new();

        if self.decent_api_key.trim().is_empty() {
            errors.push("Decent API key is required".to_string());
        }
        if self.action_module_address.parse::<alloy::primitives::Address>().is_err() {
            errors.push(format!("Invalid action module address: {}", self.action_module_address));
        }
        for (name, url) in [
            ("bridge", &self.endpoints.bridge_api_url),
            ("opensea", &self.endpoints.opensea_api_url),
            ("rarible", &self.endpoints.rarible_api_url),
            ("pods", &self.endpoints.pods_api_url),
        ] {
            if !url.starts_with("http") {
                errors.push(format!("Endpoint {} has invalid URL: {}", name, url));
            }
        }
        for (chain_id, url) in &self.fallback_rpcs {
            if crate::chains::Chain::from_id(*chain_id).is_none() {
                errors.push(format!("RPC configured for unsupported chain {}", chain_id));
            }
            if url.is_empty() {
                errors.push(format!("Chain {} has empty RPC URL", chain_id));
            }
        }
        if self.http_timeout_secs == 0 || self.metadata_timeout_secs == 0 {
            errors.push("Timeouts must be greater than zero".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Invalid(errors))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_default_config_requires_decent_key() {
        let config = KitConfig::default();
        match config.validate() {
            Err(ConfigError::Invalid(errors)) => {
                assert_eq!(errors, vec!["Decent API key is required".to_string()]);
            }
            other => panic!("unexpected validation result: {:?}", other),
        }
        assert!(KitConfig::new("key").validate().is_ok());
    }

    #[test]
    fn test_from_lookup() {
        let vars = HashMap::from([
            ("NFT_KIT_DECENT_API_KEY", "decent"),
            ("NFT_KIT_OPENSEA_API_KEY", "opensea"),
            ("NFT_KIT_RARIBLE_API_KEY", "  "),
            ("NFT_KIT_RPC_8453", "https://base.example.org"),
            ("NFT_KIT_RPC_56", "https://bsc.example.org"),
        ]);
        let config = KitConfig::from_lookup(|key| vars.get(key).map(|v| v.to_string()));

        assert_eq!(config.decent_api_key, "decent");
        assert_eq!(config.opensea_api_key.as_deref(), Some("opensea"));
        assert_eq!(config.rarible_api_key, None);
        assert_eq!(config.fallback_rpcs.get(&8453).map(String::as_str), Some("https://base.example.org"));
        assert!(!config.fallback_rpcs.contains_key(&56));
    }

    #[test]
    fn test_config_file_operations() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("kit_config.json");
        let file_path_str = file_path.to_str().unwrap();

        let mut config = KitConfig::new("decent");
        config.fallback_rpcs.insert(10, "https://op.example.org".to_string());
        config.save_to_file(file_path_str).unwrap();

        let loaded = KitConfig::load_from_file(file_path_str).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let config: KitConfig = serde_json::from_str(r#"{"decent_api_key":"k"}"#).unwrap();
        assert_eq!(config.endpoints, ApiEndpoints::default());
        assert_eq!(config.http_timeout_secs, 10);
    }
}
