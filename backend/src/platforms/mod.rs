// NFT platform adapters
pub mod artblocks;
pub mod opensea;
pub mod pods;
pub mod provider;
pub mod rarible;
pub mod superrare;
pub mod zora;

pub use artblocks::ArtBlocksService;
pub use opensea::OpenSeaService;
pub use pods::PodsService;
pub use provider::RpcEndpoints;
pub use rarible::RaribleService;
pub use superrare::SuperRareService;
pub use zora::ZoraService;

use alloy::primitives::{Address, U256};
use async_trait::async_trait;
use reqwest::Client;
use thiserror::Error;

use crate::chains::Chain;
use crate::config::ApiEndpoints;
use crate::types::{NftDetails, UiData};
use crate::utils::{AbiArg, MetadataFetcher};

#[derive(Error, Debug)]
pub enum PlatformError {
    #[error("Network request failed: {0}")]
    Network(#[from] reqwest::Error),
    #[error("JSON parsing failed: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Remote API error: {0}")]
    RemoteApi(String),
    #[error("RPC request failed: {0}")]
    Rpc(String),
    #[error("Contract call failed: {0}")]
    ContractCall(String),
    #[error("Unrecognized contract: {0}")]
    UnrecognizedContract(String),
    #[error("Unsupported mint signature: {0}")]
    UnsupportedSignature(String),
    #[error("Unknown platform: {0}")]
    UnknownPlatform(String),
    #[error("Unsupported chain: {0}")]
    UnsupportedChain(String),
    #[error("Configuration error: {0}")]
    Configuration(String),
    #[error("Invalid address: {0}")]
    InvalidAddress(String),
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("Data integrity error: {0}")]
    DataIntegrity(String),
    #[error("ABI encoding failed: {0}")]
    AbiEncoding(String),
}

/// A node error response (revert) or undecodable return data is the
/// contract's answer and becomes `ContractCall`. A request that never got an
/// answer from the node becomes `Rpc`.
impl From<alloy::contract::Error> for PlatformError {
    fn from(e: alloy::contract::Error) -> Self {
        match &e {
            alloy::contract::Error::TransportError(transport) if !transport.is_error_resp() => {
                PlatformError::Rpc(e.to_string())
            }
            _ => PlatformError::ContractCall(e.to_string()),
        }
    }
}

/// Contract rejections become `UnrecognizedContract` with `context`; RPC
/// failures pass through unchanged.
pub(crate) fn unrecognized_on_rejection(e: alloy::contract::Error, context: &str) -> PlatformError {
    match PlatformError::from(e) {
        PlatformError::ContractCall(reason) => {
            PlatformError::UnrecognizedContract(format!("{}: {}", context, reason))
        }
        other => other,
    }
}

pub fn parse_address(value: &str) -> Result<Address, PlatformError> {
    value
        .trim()
        .parse::<Address>()
        .map_err(|e| PlatformError::InvalidAddress(format!("{}: {}", value, e)))
}

/// Function a mint or purchase must target, plus the ERC-20 it is paid in (if any).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MintSignature {
    pub mint_signature: String,
    pub payment_token: Option<Address>,
}

impl MintSignature {
    pub fn native(signature: &str) -> Self {
        Self { mint_signature: signature.to_string(), payment_token: None }
    }
}

#[derive(Debug, Clone)]
pub struct PriceQuery {
    pub contract: Address,
    pub token_id: U256,
    pub signature: String,
    pub user: Address,
    pub quantity: U256,
    pub source_url: Option<String>,
    pub payment_token: Option<Address>,
}

#[derive(Debug, Clone)]
pub struct ArgsQuery {
    pub contract: Address,
    pub token_id: U256,
    pub sender: Address,
    pub signature: String,
    pub price: U256,
    pub quantity: U256,
    pub profile_owner: Address,
    pub source_url: Option<String>,
    pub payment_token: Option<Address>,
}

#[derive(Debug, Clone)]
pub struct UiDataQuery {
    pub signature: String,
    pub contract: Address,
    pub token_id: U256,
    pub dst_chain_id: u64,
    pub source_url: Option<String>,
}

/// On-chain sale state of one token.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Sale {
    pub sale_start: u64,
    /// `None` when the sale has no end.
    pub sale_end: Option<u64>,
    pub total_minted: U256,
    pub max_supply: U256,
    pub price: U256,
    pub payment_token: Option<Address>,
    pub mint_fee: U256,
}

impl Sale {
    pub fn is_valid_at(&self, now: u64) -> bool {
        let window_open =
            self.sale_start <= now && self.sale_end.map_or(true, |end| now <= end);
        window_open && self.total_minted < self.max_supply
    }

    pub fn is_valid(&self) -> bool {
        self.is_valid_at(unix_now())
    }
}

pub fn unix_now() -> u64 {
    u64::try_from(chrono::Utc::now().timestamp()).unwrap_or_default()
}

/// Everything an adapter needs to bind itself to one destination chain.
#[derive(Clone)]
pub struct ServiceConfig {
    pub chain: Chain,
    pub platform_name: String,
    pub platform_logo_url: String,
    pub api_key: Option<String>,
    pub endpoints: ApiEndpoints,
    pub rpc: RpcEndpoints,
    pub http: Client,
    pub metadata: MetadataFetcher,
}

impl ServiceConfig {
    pub fn require_api_key(&self) -> Result<String, PlatformError> {
        self.api_key
            .clone()
            .filter(|key| !key.is_empty())
            .ok_or_else(|| {
                PlatformError::Configuration(format!("{} requires an API key", self.platform_name))
            })
    }
}

/// Capability contract shared by every NFT platform.
#[async_trait]
pub trait PlatformService: Send + Sync {
    fn platform_name(&self) -> &str;
    fn platform_logo_url(&self) -> &str;
    fn chain(&self) -> Chain;

    /// Resolves the function to call. `Ok(None)` means "not mintable right now".
    async fn get_mint_signature(
        &self,
        nft: &NftDetails,
        ignore_valid_sale: bool,
    ) -> Result<Option<MintSignature>, PlatformError>;

    async fn get_minter_address(
        &self,
        contract: Address,
        token_id: U256,
        mint_signature: &str,
    ) -> Result<Address, PlatformError>;

    /// Total cost including protocol fees, scaled by quantity.
    async fn get_price(&self, query: &PriceQuery) -> Result<Option<U256>, PlatformError>;

    async fn get_args(&self, query: &ArgsQuery) -> Result<Vec<AbiArg>, PlatformError>;

    async fn get_ui_data(&self, query: &UiDataQuery) -> Result<Option<UiData>, PlatformError>;
}
