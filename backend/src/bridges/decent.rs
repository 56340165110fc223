use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;
use tracing::{error, info};

use super::{ActionBridge, ActionRequest, ActionResponse, BridgeError};
use crate::utils::bigint_json;

/// Client for the Decent box-action endpoint.
pub struct DecentBridge {
    client: Client,
    base_url: String,
    api_key: String,
}

impl DecentBridge {
    pub fn new(base_url: &str, api_key: &str, timeout: Duration) -> Result<Self, BridgeError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| BridgeError::NetworkError(format!("Failed to create HTTP client: {}", e)))?;
        Ok(Self::with_client(client, base_url, api_key))
    }

    pub fn with_client(client: Client, base_url: &str, api_key: &str) -> Self {
        Self { client, base_url: base_url.to_string(), api_key: api_key.to_string() }
    }
}

#[async_trait]
impl ActionBridge for DecentBridge {
    fn name(&self) -> &str {
        "Decent"
    }

    async fn get_action(&self, request: &ActionRequest) -> Result<ActionResponse, BridgeError> {
        let arguments = bigint_json::stringify(request)
            .map_err(|e| BridgeError::InvalidParameters(format!("Unserializable action request: {}", e)))?;

        info!(
            "Requesting box action from {} for chain {} -> chain {}",
            self.base_url, request.src_chain_id, request.dst_chain_id
        );

        let response = self
            .client
            .get(&self.base_url)
            .header("x-api-key", &self.api_key)
            .query(&[("arguments", arguments)])
            .send()
            .await
            .map_err(|e| BridgeError::NetworkError(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            error!("Decent API error {}: {}", status, error_text);
            return Err(BridgeError::ApiError { status: status.as_u16(), body: error_text });
        }

        let body = response
            .text()
            .await
            .map_err(|e| BridgeError::NetworkError(e.to_string()))?;
        let raw: Value = bigint_json::parse(&body)
            .map_err(|e| BridgeError::ParseError(format!("JSON parsing error: {}", e)))?;

        let success = raw.get("success").cloned().unwrap_or_default();
        info!("Decent box action received (success: {})", success);
        Ok(ActionResponse::new(raw))
    }
}
