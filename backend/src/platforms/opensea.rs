use alloy::primitives::{address, Address, U256};
use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{error, info, warn};

use super::{
    parse_address, ArgsQuery, MintSignature, PlatformError, PlatformService, PriceQuery,
    ServiceConfig, UiDataQuery,
};
use crate::chains::{Chain, ProtocolContracts};
use crate::registry::UrlExtractor;
use crate::types::{NftDetails, UiData};
use crate::utils::{parse_u256, AbiArg};

pub const PLATFORM_NAME: &str = "OpenSea";
pub const PLATFORM_LOGO_URL: &str = "https://opensea.io/favicon.ico";

/// Seaport 1.5, same address on every supported chain.
pub const SEAPORT_ADDRESS: Address = address!("00000000000000ADc04C56Bf30aC9d3c0aAF14dC");

pub const FULFILL_BASIC_ORDER: &str = "function fulfillBasicOrder((address considerationToken, uint256 considerationIdentifier, uint256 considerationAmount, address offerer, address zone, address offerToken, uint256 offerIdentifier, uint256 offerAmount, uint8 basicOrderType, uint256 startTime, uint256 endTime, bytes32 zoneHash, uint256 salt, bytes32 offererConduitKey, bytes32 fulfillerConduitKey, uint256 totalOriginalAdditionalRecipients, (uint256 amount, address recipient)[] additionalRecipients, bytes signature)) external payable returns (bool fulfilled)";

pub static URL_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"https://opensea\.io/assets/(ethereum|matic|optimism|arbitrum|zora|base)/(0x[a-fA-F0-9]{40})/(\d+)")
        .expect("static OpenSea URL pattern compiles")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenSeaMint {
    FulfillBasicOrder,
}

impl OpenSeaMint {
    pub fn parse(signature: &str) -> Result<Self, PlatformError> {
        if signature.trim() == FULFILL_BASIC_ORDER {
            Ok(OpenSeaMint::FulfillBasicOrder)
        } else {
            Err(PlatformError::UnsupportedSignature(signature.to_string()))
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct OpenSeaNft {
    pub identifier: Option<String>,
    pub collection: String,
    pub contract: Option<String>,
    pub token_standard: Option<String>,
    pub name: Option<String>,
    pub image_url: Option<String>,
    pub metadata_url: Option<String>,
    pub creator: Option<String>,
}

#[derive(Debug, Deserialize)]
struct NftResponse {
    nft: OpenSeaNft,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ListingPrice {
    pub currency: Option<String>,
    pub decimals: Option<u8>,
    pub value: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ListingPriceWrapper {
    pub current: ListingPrice,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BestListing {
    pub order_hash: String,
    pub chain: Option<String>,
    pub protocol_address: String,
    pub price: ListingPriceWrapper,
}

impl BestListing {
    pub fn unit_price(&self) -> Result<U256, PlatformError> {
        parse_u256(&self.price.current.value)
    }
}

/// Pulls the ordered call arguments out of a fulfillment response.
pub fn fulfillment_args(response: &Value) -> Result<Vec<AbiArg>, PlatformError> {
    let input = response
        .pointer("/fulfillment_data/transaction/input_data")
        .and_then(Value::as_object)
        .ok_or_else(|| {
            PlatformError::RemoteApi("OpenSea fulfillment data has no transaction input".into())
        })?;
    Ok(input.values().cloned().map(AbiArg::Json).collect())
}

pub struct OpenSeaUrlExtractor;

#[async_trait]
impl UrlExtractor for OpenSeaUrlExtractor {
    async fn extract(&self, url: &str) -> Result<Option<NftDetails>, PlatformError> {
        let Some(caps) = URL_PATTERN.captures(url) else {
            return Ok(None);
        };
        let Some(chain) = Chain::from_opensea_slug(&caps[1]) else {
            return Ok(None);
        };

        Ok(Some(NftDetails {
            chain,
            contracts: ProtocolContracts::Marketplace,
            contract_address: caps[2].to_string(),
            token_id: caps[3].to_string(),
        }))
    }
}

pub struct OpenSeaService {
    platform_name: String,
    platform_logo_url: String,
    chain: Chain,
    api_url: String,
    api_key: String,
    client: Client,
}

impl OpenSeaService {
    pub fn new(config: ServiceConfig) -> Result<Self, PlatformError> {
        let api_key = config.require_api_key()?;
        Ok(Self {
            platform_name: config.platform_name,
            platform_logo_url: config.platform_logo_url,
            chain: config.chain,
            api_url: config.endpoints.opensea_api_url.trim_end_matches('/').to_string(),
            api_key,
            client: config.http,
        })
    }

    async fn read_response<T: DeserializeOwned>(
        &self,
        response: reqwest::Response,
    ) -> Result<Option<T>, PlatformError> {
        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            error!("OpenSea API error {}: {}", status, error_text);
            return Err(PlatformError::RemoteApi(format!("OpenSea HTTP {}: {}", status, error_text)));
        }
        let value = response
            .json()
            .await
            .map_err(|e| PlatformError::RemoteApi(format!("OpenSea JSON parsing error: {}", e)))?;
        Ok(Some(value))
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<Option<T>, PlatformError> {
        let url = format!("{}{}", self.api_url, path);
        let response = self.client.get(&url).header("x-api-key", &self.api_key).send().await?;
        self.read_response(response).await
    }

    pub async fn get_nft(&self, contract: Address, token_id: U256) -> Result<Option<OpenSeaNft>, PlatformError> {
        let path = format!(
            "/api/v2/chain/{}/contract/{}/nfts/{}",
            self.chain.opensea_slug(),
            contract.to_checksum(None),
            token_id
        );
        Ok(self.get_json::<NftResponse>(&path).await?.map(|r| r.nft))
    }

    /// Cheapest active listing for the token, if any.
    pub async fn best_listing(&self, contract: Address, token_id: U256) -> Result<Option<BestListing>, PlatformError> {
        let Some(nft) = self.get_nft(contract, token_id).await? else {
            return Ok(None);
        };
        let path = format!("/api/v2/listings/collection/{}/nfts/{}/best", nft.collection, token_id);
        let listing: Option<BestListing> = self.get_json(&path).await?;
        if listing.is_none() {
            info!("No OpenSea listing for {}:{}", contract, token_id);
        }
        Ok(listing)
    }

    pub async fn fulfillment_data(&self, listing: &BestListing, fulfiller: Address) -> Result<Value, PlatformError> {
        let url = format!("{}/api/v2/listings/fulfillment_data", self.api_url);
        let body = json!({
            "listing": {
                "hash": listing.order_hash,
                "chain": self.chain.opensea_slug(),
                "protocol_address": listing.protocol_address,
            },
            "fulfiller": { "address": fulfiller.to_checksum(None) },
        });

        let response = self
            .client
            .post(&url)
            .header("x-api-key", &self.api_key)
            .json(&body)
            .send()
            .await?;
        self.read_response(response)
            .await?
            .ok_or_else(|| PlatformError::RemoteApi(format!("OpenSea listing {} not found", listing.order_hash)))
    }
}

#[async_trait]
impl PlatformService for OpenSeaService {
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
        if !ignore_valid_sale {
            let contract = parse_address(&nft.contract_address)?;
            let token_id = parse_u256(&nft.token_id)?;
            if self.best_listing(contract, token_id).await?.is_none() {
                return Ok(None);
            }
        }
        Ok(Some(MintSignature::native(FULFILL_BASIC_ORDER)))
    }

    async fn get_minter_address(
        &self,
        _contract: Address,
        _token_id: U256,
        mint_signature: &str,
    ) -> Result<Address, PlatformError> {
        OpenSeaMint::parse(mint_signature)?;
        Ok(SEAPORT_ADDRESS)
    }

    async fn get_price(&self, query: &PriceQuery) -> Result<Option<U256>, PlatformError> {
        OpenSeaMint::parse(&query.signature)?;
        let Some(listing) = self.best_listing(query.contract, query.token_id).await? else {
            return Ok(None);
        };
        Ok(Some(listing.unit_price()? * query.quantity))
    }

    async fn get_args(&self, query: &ArgsQuery) -> Result<Vec<AbiArg>, PlatformError> {
        OpenSeaMint::parse(&query.signature)?;
        let listing = self
            .best_listing(query.contract, query.token_id)
            .await?
            .ok_or_else(|| {
                PlatformError::RemoteApi(format!(
                    "No OpenSea listing for {}:{}",
                    query.contract, query.token_id
                ))
            })?;
        let fulfillment = self.fulfillment_data(&listing, query.sender).await?;
        fulfillment_args(&fulfillment)
    }

    async fn get_ui_data(&self, query: &UiDataQuery) -> Result<Option<UiData>, PlatformError> {
        let nft = match self.get_nft(query.contract, query.token_id).await {
            Ok(Some(nft)) => nft,
            Ok(None) => return Ok(None),
            Err(e) => {
                warn!("OpenSea NFT lookup failed for {}: {}", query.contract, e);
                return Ok(None);
            }
        };
        let creator = nft.creator.as_deref().and_then(|c| parse_address(c).ok());

        Ok(Some(UiData {
            platform_name: self.platform_name.clone(),
            platform_logo_url: self.platform_logo_url.clone(),
            nft_name: nft.name.clone().unwrap_or_else(|| format!("{} #{}", nft.collection, query.token_id)),
            nft_uri: nft.image_url.clone().unwrap_or_default(),
            nft_creator_address: creator,
            token_standard: nft.token_standard.clone(),
            dst_chain_id: Some(query.dst_chain_id),
            raw_metadata_uri: nft.metadata_url.clone(),
            additional: Some(json!({ "collection": nft.collection })),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_url_chain_slugs() {
        let details = OpenSeaUrlExtractor
            .extract("https://opensea.io/assets/matic/0x2953399124f0cbb46d2cbacd8a89cf0599974963/42")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(details.chain, Chain::Polygon);
        assert_eq!(details.token_id, "42");
        assert!(OpenSeaUrlExtractor
            .extract("https://opensea.io/assets/solana/abc")
            .await
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_fulfillment_args_keep_order() {
        let response = json!({
            "protocol": "seaport1.5",
            "fulfillment_data": {
                "transaction": {
                    "function": "fulfillBasicOrder_efficient_6GL6yc((...))",
                    "to": "0x00000000000000ADc04C56Bf30aC9d3c0aAF14dC",
                    "value": 1000,
                    "input_data": {
                        "parameters": { "considerationToken": "0x0000000000000000000000000000000000000000" }
                    }
                }
            }
        });
        let args = fulfillment_args(&response).unwrap();
        assert_eq!(args.len(), 1);
        assert_eq!(
            serde_json::to_value(&args[0]).unwrap(),
            json!({ "considerationToken": "0x0000000000000000000000000000000000000000" })
        );

        assert!(matches!(fulfillment_args(&json!({})), Err(PlatformError::RemoteApi(_))));
    }

    #[test]
    fn test_listing_price() {
        let listing: BestListing = serde_json::from_value(json!({
            "order_hash": "0xabc",
            "chain": "ethereum",
            "protocol_address": "0x00000000000000ADc04C56Bf30aC9d3c0aAF14dC",
            "price": { "current": { "currency": "ETH", "decimals": 18, "value": "25000000000000000" } }
        }))
        .unwrap();
        assert_eq!(listing.unit_price().unwrap(), U256::from(25_000_000_000_000_000u64));
    }

    #[test]
    fn test_signature_parse() {
        assert!(OpenSeaMint::parse(FULFILL_BASIC_ORDER).is_ok());
        assert!(OpenSeaMint::parse("function buy()").is_err());
    }

    #[test]
    fn test_basic_order_tuple_encodes() {
        use crate::utils::encode_function_call;
        use alloy::primitives::{keccak256, Bytes};

        let word = |n: u64| AbiArg::Uint(U256::from(n));
        let order = AbiArg::Tuple(vec![
            ("considerationToken".into(), AbiArg::Address(Address::ZERO)),
            ("considerationIdentifier".into(), word(0)),
            ("considerationAmount".into(), word(975_000_000_000_000)),
            ("offerer".into(), AbiArg::Address(address!("444483c2d87a6C298f44c223C0638A3eAc7B6ea0"))),
            ("zone".into(), AbiArg::Address(Address::ZERO)),
            ("offerToken".into(), AbiArg::Address(address!("2953399124F0cBB46d2CbACD8A89cF0599974963"))),
            ("offerIdentifier".into(), word(7)),
            ("offerAmount".into(), word(1)),
            ("basicOrderType".into(), word(0)),
            ("startTime".into(), word(1_709_251_200)),
            ("endTime".into(), word(1_711_929_600)),
            ("zoneHash".into(), AbiArg::FixedBytes(vec![0u8; 32])),
            ("salt".into(), word(42)),
            ("offererConduitKey".into(), AbiArg::FixedBytes(vec![0u8; 32])),
            ("fulfillerConduitKey".into(), AbiArg::FixedBytes(vec![0u8; 32])),
            ("totalOriginalAdditionalRecipients".into(), word(1)),
            (
                "additionalRecipients".into(),
                AbiArg::Array(vec![AbiArg::Tuple(vec![
                    ("amount".into(), word(25_000_000_000_000)),
                    ("recipient".into(), AbiArg::Address(SEAPORT_ADDRESS)),
                ])]),
            ),
            ("signature".into(), AbiArg::Bytes(Bytes::from(vec![0xde, 0xad]))),
        ]);

        let encoded = encode_function_call(FULFILL_BASIC_ORDER, &[order]).unwrap();
        let canonical = "fulfillBasicOrder((address,uint256,uint256,address,address,address,uint256,uint256,uint8,uint256,uint256,bytes32,uint256,bytes32,bytes32,uint256,(uint256,address)[],bytes))";
        assert_eq!(&encoded[..4], &keccak256(canonical.as_bytes())[..4]);
        assert_eq!(&encoded[..4], &[0xfb, 0x0f, 0x3e, 0xe1]);
    }
}
