use alloy::primitives::{Address, U256};
use alloy::providers::RootProvider;
use alloy::sol_types::SolValue;
use alloy::transports::http::{Client, Http};
use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use serde_json::Value;
use tracing::{error, info};

use super::zora::{read_erc1155_display, IZoraCreator1155, IZoraFixedPriceSaleStrategy};
use super::{
    parse_address, ArgsQuery, MintSignature, PlatformError, PlatformService, PriceQuery, Sale,
    ServiceConfig, UiDataQuery, unrecognized_on_rejection,
};
use crate::chains::{pods_minter, Chain, ProtocolContracts};
use crate::registry::UrlExtractor;
use crate::types::{NftDetails, UiData};
use crate::utils::{parse_u256, AbiArg, MetadataFetcher};

pub const PLATFORM_NAME: &str = "Pods";
pub const PLATFORM_LOGO_URL: &str = "https://pods.media/icon.svg";

pub static URL_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(https?://)?pods\.media(/.+)").expect("static Pods URL pattern compiles")
});

/// 0.0007 ETH mint reward on Pods drops.
pub const MINT_FEE: U256 = U256::from_limbs([700_000_000_000_000, 0, 0, 0]);

pub const MINT_WITH_REWARDS: &str = "function mintWithRewards(address minter, uint256 tokenId, uint256 quantity, bytes calldata minterArguments, address mintReferral)";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PodsMint {
    MintWithRewards,
}

impl PodsMint {
    pub const fn signature(self) -> &'static str {
        match self {
            PodsMint::MintWithRewards => MINT_WITH_REWARDS,
        }
    }

    pub fn parse(signature: &str) -> Result<Self, PlatformError> {
        if signature.trim() == MINT_WITH_REWARDS {
            Ok(PodsMint::MintWithRewards)
        } else {
            Err(PlatformError::UnsupportedSignature(signature.to_string()))
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PodsTokenInfo {
    chain_id: Option<u64>,
    contract_address: Option<String>,
    token_id: Option<Value>,
}

/// Resolves `pods.media/<route>` into on-chain identifiers through the Pods API.
pub struct PodsUrlExtractor {
    client: reqwest::Client,
    api_url: String,
}

impl PodsUrlExtractor {
    pub fn new(client: reqwest::Client, api_url: &str) -> Self {
        Self { client, api_url: api_url.trim_end_matches('/').to_string() }
    }
}

#[async_trait]
impl UrlExtractor for PodsUrlExtractor {
    async fn extract(&self, url: &str) -> Result<Option<NftDetails>, PlatformError> {
        let Some(caps) = URL_PATTERN.captures(url) else {
            return Ok(None);
        };
        let route = &caps[2];
        let endpoint = format!("{}/api/tokenInfo", self.api_url);

        info!("Resolving Pods route {} via {}", route, endpoint);

        let response = self.client.get(&endpoint).query(&[("route", route)]).send().await?;
        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            error!("Pods API error {}: {}", status, error_text);
            return Err(PlatformError::RemoteApi(format!("Pods HTTP {}: {}", status, error_text)));
        }

        let info: PodsTokenInfo = response
            .json()
            .await
            .map_err(|e| PlatformError::RemoteApi(format!("Pods JSON parsing error: {}", e)))?;

        let (Some(chain_id), Some(contract_address), Some(token_id)) =
            (info.chain_id, info.contract_address, info.token_id)
        else {
            return Ok(None);
        };

        let token_id = match token_id {
            Value::String(id) => id,
            Value::Number(id) => id.to_string(),
            other => {
                return Err(PlatformError::RemoteApi(format!("Pods returned invalid token id: {}", other)))
            }
        };

        let chain = Chain::from_id(chain_id)
            .ok_or_else(|| PlatformError::UnsupportedChain(format!("Pods chain {}", chain_id)))?;
        let minter = pods_minter(chain)
            .ok_or_else(|| PlatformError::UnsupportedChain(format!("Pods is not deployed on {}", chain)))?;

        Ok(Some(NftDetails {
            chain,
            contracts: ProtocolContracts::Pods { minter },
            contract_address,
            token_id,
        }))
    }
}

pub fn build_mint_args(minter: Address, query: &ArgsQuery) -> Vec<AbiArg> {
    vec![
        AbiArg::Address(minter),
        AbiArg::Uint(query.token_id),
        AbiArg::Uint(query.quantity),
        AbiArg::Bytes(query.sender.abi_encode().into()),
        AbiArg::Address(Address::ZERO),
    ]
}

pub struct PodsService {
    platform_name: String,
    platform_logo_url: String,
    chain: Chain,
    minter: Address,
    provider: RootProvider<Http<Client>>,
    metadata: MetadataFetcher,
}

impl PodsService {
    pub fn new(config: ServiceConfig) -> Result<Self, PlatformError> {
        let minter = pods_minter(config.chain).ok_or_else(|| {
            PlatformError::UnsupportedChain(format!("Pods is not deployed on {}", config.chain))
        })?;
        let provider = config.rpc.provider(config.chain)?;

        Ok(Self {
            platform_name: config.platform_name,
            platform_logo_url: config.platform_logo_url,
            chain: config.chain,
            minter,
            provider,
            metadata: config.metadata,
        })
    }

    /// Fixed-price sale of a Pods episode. `None` when the minter has no sale for it.
    pub async fn get_sale(&self, contract: Address, token_id: U256) -> Result<Option<Sale>, PlatformError> {
        let collection = IZoraCreator1155::new(contract, &self.provider);
        let info = collection
            .getTokenInfo(token_id)
            .call()
            .await
            .map_err(|e| unrecognized_on_rejection(e, &format!("{} is not a Pods ERC-1155 token", contract)))?;

        let strategy = IZoraFixedPriceSaleStrategy::new(self.minter, &self.provider);
        let config = strategy.sale(contract, token_id).call().await?._0;
        if config.saleStart == 0 && config.saleEnd == 0 {
            return Ok(None);
        }

        Ok(Some(Sale {
            sale_start: config.saleStart,
            sale_end: Some(config.saleEnd),
            total_minted: info._0.totalMinted,
            max_supply: info._0.maxSupply,
            price: U256::from(config.pricePerToken),
            payment_token: None,
            mint_fee: MINT_FEE,
        }))
    }
}

#[async_trait]
impl PlatformService for PodsService {
    fn platform_name(&self) -> &str {
        &self.platform_name
    }

    fn platform_logo_url(&self) -> &str {
        &self.platform_logo_url
    }

    fn chain(&self) -> Chain {
        self.chain
    }

    async fn get_mint_signature(
        &self,
        nft: &NftDetails,
        ignore_valid_sale: bool,
    ) -> Result<Option<MintSignature>, PlatformError> {
        let contract = parse_address(&nft.contract_address)?;
        let token_id = parse_u256(&nft.token_id)?;

        let sale = self.get_sale(contract, token_id).await?.ok_or_else(|| {
            PlatformError::UnrecognizedContract(format!(
                "No Pods sale configured for {}:{}",
                contract, token_id
            ))
        })?;
        if !ignore_valid_sale && !sale.is_valid() {
            info!("Pods sale for {}:{} is not currently mintable", contract, token_id);
            return Ok(None);
        }

        Ok(Some(MintSignature::native(PodsMint::MintWithRewards.signature())))
    }

    async fn get_minter_address(
        &self,
        contract: Address,
        _token_id: U256,
        mint_signature: &str,
    ) -> Result<Address, PlatformError> {
        PodsMint::parse(mint_signature)?;
        Ok(contract)
    }

    async fn get_price(&self, query: &PriceQuery) -> Result<Option<U256>, PlatformError> {
        PodsMint::parse(&query.signature)?;
        let Some(sale) = self.get_sale(query.contract, query.token_id).await? else {
            return Ok(None);
        };
        if !sale.is_valid() {
            return Ok(None);
        }
        Ok(Some((sale.price + sale.mint_fee) * query.quantity))
    }

    async fn get_args(&self, query: &ArgsQuery) -> Result<Vec<AbiArg>, PlatformError> {
        PodsMint::parse(&query.signature)?;
        Ok(build_mint_args(self.minter, query))
    }

    async fn get_ui_data(&self, query: &UiDataQuery) -> Result<Option<UiData>, PlatformError> {
        let Some(display) =
            read_erc1155_display(&self.provider, &self.metadata, query.contract, query.token_id).await
        else {
            return Ok(None);
        };

        Ok(Some(UiData {
            platform_name: self.platform_name.clone(),
            platform_logo_url: self.platform_logo_url.clone(),
            nft_name: display.metadata.name.clone().unwrap_or(display.collection_name),
            nft_uri: display.image,
            nft_creator_address: Some(display.owner),
            token_standard: Some("erc1155".to_string()),
            dst_chain_id: Some(query.dst_chain_id),
            raw_metadata_uri: Some(display.uri),
            additional: None,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::encode_function_call;
    use alloy::primitives::address;

    #[test]
    fn test_route_capture() {
        let caps = URL_PATTERN.captures("https://pods.media/mint-podcast/why-nfts").unwrap();
        assert_eq!(&caps[2], "/mint-podcast/why-nfts");
        assert!(URL_PATTERN.is_match("pods.media/show/episode"));
        assert!(!URL_PATTERN.is_match("https://pods.media"));
    }

    #[test]
    fn test_args_fit_mint_with_rewards() {
        let query = ArgsQuery {
            contract: address!("8e8e9a5b5ec3b6d6f1b1b4f1e4c7e3f2c8a0d1b2"),
            token_id: U256::from(4u64),
            sender: address!("444483c2d87a6C298f44c223C0638A3eAc7B6ea0"),
            signature: MINT_WITH_REWARDS.to_string(),
            price: MINT_FEE,
            quantity: U256::from(2u64),
            profile_owner: Address::ZERO,
            source_url: None,
            payment_token: None,
        };
        let minter = pods_minter(Chain::Base).unwrap();
        let args = build_mint_args(minter, &query);

        assert_eq!(args[0], AbiArg::Address(minter));
        assert_eq!(args[2], AbiArg::Uint(U256::from(2u64)));
        assert!(encode_function_call(MINT_WITH_REWARDS, &args).is_ok());
    }

    #[test]
    fn test_signature_parse() {
        assert_eq!(PodsMint::parse(MINT_WITH_REWARDS).unwrap(), PodsMint::MintWithRewards);
        assert!(PodsMint::parse("function mint()").is_err());
    }
}
