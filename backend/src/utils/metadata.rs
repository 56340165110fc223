use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};

/// Gateways used to resolve content-addressed token URIs.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Gateways {
    pub ipfs: String,
    pub ipfs_fallback: String,
    pub arweave: String,
}

impl Default for Gateways {
    fn default() -> Self {
        Self {
            ipfs: "https://magic.decentralized-content.com/ipfs/".to_string(),
            ipfs_fallback: "https://ipfs.io/ipfs/".to_string(),
            arweave: "https://arweave.net/".to_string(),
        }
    }
}

/// The subset of ERC-721/1155 metadata the UI needs. `raw` keeps the whole document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TokenMetadata {
    pub name: Option<String>,
    pub description: Option<String>,
    pub image: Option<String>,
    pub raw: Option<Value>,
}

impl TokenMetadata {
    pub fn from_value(value: Value) -> Self {
        let text = |key: &str| {
            value
                .get(key)
                .and_then(Value::as_str)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        };
        Self {
            name: text("name"),
            description: text("description"),
            image: text("image").or_else(|| text("image_url")),
            raw: Some(value),
        }
    }
}

#[derive(Clone)]
pub struct MetadataFetcher {
    client: Client,
    gateways: Gateways,
    timeout: Duration,
}

impl MetadataFetcher {
    pub fn new(client: Client, gateways: Gateways, timeout: Duration) -> Self {
        Self { client, gateways, timeout }
    }

    /// Rewrites `ipfs://` and `ar://` URIs onto the primary HTTP gateway.
    pub fn normalize_uri(&self, uri: &str) -> String {
        self.candidate_urls(uri)
            .into_iter()
            .next()
            .unwrap_or_else(|| uri.to_string())
    }

    /// Ordered list of URLs to try for a URI: primary gateway, then at most one fallback.
    pub fn candidate_urls(&self, uri: &str) -> Vec<String> {
        let uri = uri.trim();
        if let Some(path) = uri.strip_prefix("ipfs://") {
            let path = path.trim_start_matches("ipfs/");
            return vec![
                format!("{}{}", self.gateways.ipfs, path),
                format!("{}{}", self.gateways.ipfs_fallback, path),
            ];
        }
        if let Some(path) = uri.strip_prefix("ar://") {
            return vec![format!("{}{}", self.gateways.arweave, path)];
        }
        if let Some(index) = uri.find("/ipfs/") {
            if uri.starts_with("http") {
                let path = &uri[index + "/ipfs/".len()..];
                let fallback = format!("{}{}", self.gateways.ipfs_fallback, path);
                if fallback != uri {
                    return vec![uri.to_string(), fallback];
                }
            }
        }
        vec![uri.to_string()]
    }

    /// Fetches a JSON document, trying the fallback gateway once. Failures return `None`.
    pub async fn fetch_json(&self, uri: &str) -> Option<Value> {
        for url in self.candidate_urls(uri) {
            match self.fetch_with_timeout(&url).await {
                Ok(value) => return Some(value),
                Err(e) => warn!("Metadata fetch from {} failed: {}", url, e),
            }
        }
        None
    }

    pub async fn fetch_metadata(&self, uri: &str) -> TokenMetadata {
        if uri.is_empty() {
            return TokenMetadata::default();
        }
        match self.fetch_json(uri).await {
            Some(value) => TokenMetadata::from_value(value),
            None => TokenMetadata::default(),
        }
    }

    async fn fetch_with_timeout(&self, url: &str) -> Result<Value, String> {
        debug!("Fetching token metadata from: {}", url);

        let request = async {
            let response = self.client.get(url).send().await.map_err(|e| e.to_string())?;
            if !response.status().is_success() {
                return Err(format!("HTTP {}", response.status()));
            }
            response.json::<Value>().await.map_err(|e| e.to_string())
        };

        tokio::time::timeout(self.timeout, request)
            .await
            .map_err(|_| format!("timed out after {:?}", self.timeout))?
    }
}
