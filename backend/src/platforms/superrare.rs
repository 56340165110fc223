use alloy::primitives::{address, Address, U256};
use alloy::providers::RootProvider;
use alloy::sol;
use alloy::transports::http::{Client, Http};
use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{info, warn};

use super::{
    parse_address, ArgsQuery, MintSignature, PlatformError, PlatformService, PriceQuery,
    ServiceConfig, UiDataQuery,
};
use crate::chains::{Chain, ProtocolContracts};
use crate::registry::UrlExtractor;
use crate::types::{NftDetails, UiData};
use crate::utils::{parse_u256, AbiArg, MetadataFetcher};

sol! {
    #[sol(rpc)]
    interface ISuperRareBazaar {
        function tokenSalePrices(address originContract, uint256 tokenId, address currency)
            external view returns (address seller, address currencyAddress, uint256 amount);
    }
}

sol! {
    #[sol(rpc)]
    interface ISuperRareToken {
        function tokenURI(uint256 tokenId) external view returns (string memory);
        function tokenCreator(uint256 tokenId) external view returns (address);
        function owner() external view returns (address);
    }
}

pub const PLATFORM_NAME: &str = "SuperRare";
pub const PLATFORM_LOGO_URL: &str = "https://superrare.com/favicon.ico";

pub const BAZAAR_ADDRESS: Address = address!("6D7c44773C52D396F43c2D511B81aa168E9a7a42");
pub const SUPERRARE_V2_ADDRESS: Address = address!("b932a70a57673d89f4acffbe830e8ed7f75fb9e0");

/// Marketplace fee charged to the buyer, in percent.
pub const MARKETPLACE_FEE_PERCENT: u64 = 3;

pub const BUY_SIGNATURE: &str = "function buy(address _originContract, uint256 _tokenId, address _currencyAddress, uint256 _amount) external payable";

pub static URL_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"https://superrare\.com/(?:artwork-v2/)?(?:(0x[a-fA-F0-9]{40})/)?[\w-]+(?::\s?[\w-]+)?-(\d+)")
        .expect("static SuperRare URL pattern compiles")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SuperRareMint {
    Buy,
}

impl SuperRareMint {
    pub fn parse(signature: &str) -> Result<Self, PlatformError> {
        if signature.trim() == BUY_SIGNATURE {
            Ok(SuperRareMint::Buy)
        } else {
            Err(PlatformError::UnsupportedSignature(signature.to_string()))
        }
    }
}

/// Sale price plus the buyer-side marketplace fee, scaled by quantity.
pub fn price_with_fee(sale_price: U256, quantity: U256) -> U256 {
    let fee = sale_price * U256::from(MARKETPLACE_FEE_PERCENT) / U256::from(100u64);
    (sale_price + fee) * quantity
}

pub struct SuperRareUrlExtractor;

#[async_trait]
impl UrlExtractor for SuperRareUrlExtractor {
    async fn extract(&self, url: &str) -> Result<Option<NftDetails>, PlatformError> {
        let Some(caps) = URL_PATTERN.captures(url) else {
            return Ok(None);
        };
        let contract_address = caps
            .get(1)
            .map(|m| m.as_str().to_string())
            .unwrap_or_else(|| SUPERRARE_V2_ADDRESS.to_checksum(None));

        Ok(Some(NftDetails {
            chain: Chain::Ethereum,
            contracts: ProtocolContracts::Marketplace,
            contract_address,
            token_id: caps[2].to_string(),
        }))
    }
}

pub struct SuperRareService {
    platform_name: String,
    platform_logo_url: String,
    chain: Chain,
    provider: RootProvider<Http<Client>>,
    metadata: MetadataFetcher,
}

impl SuperRareService {
    pub fn new(config: ServiceConfig) -> Result<Self, PlatformError> {
        if config.chain != Chain::Ethereum {
            return Err(PlatformError::UnsupportedChain(format!(
                "SuperRare is only available on mainnet, not {}",
                config.chain
            )));
        }
        let provider = config.rpc.provider(config.chain)?;

        Ok(Self {
            platform_name: config.platform_name,
            platform_logo_url: config.platform_logo_url,
            chain: config.chain,
            provider,
            metadata: config.metadata,
        })
    }

    /// Listed price in native currency; zero means the token is not for sale.
    pub async fn sale_price(&self, contract: Address, token_id: U256) -> Result<U256, PlatformError> {
        let bazaar = ISuperRareBazaar::new(BAZAAR_ADDRESS, &self.provider);
        let listing = bazaar.tokenSalePrices(contract, token_id, Address::ZERO).call().await?;
        Ok(listing.amount)
    }

    async fn creator(&self, contract: Address, token_id: U256) -> Option<Address> {
        let token = ISuperRareToken::new(contract, &self.provider);
        let result = if contract == SUPERRARE_V2_ADDRESS {
            token.tokenCreator(token_id).call().await.map(|r| r._0)
        } else {
            token.owner().call().await.map(|r| r._0)
        };
        match result {
            Ok(creator) => Some(creator),
            Err(e) => {
                warn!("SuperRare creator lookup failed for {}: {}", contract, e);
                None
            }
        }
    }
}

#[async_trait]
impl PlatformService for SuperRareService {
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

        if !ignore_valid_sale && self.sale_price(contract, token_id).await?.is_zero() {
            info!("SuperRare token {}:{} is not listed", contract, token_id);
            return Ok(None);
        }
        Ok(Some(MintSignature::native(BUY_SIGNATURE)))
    }

    async fn get_minter_address(
        &self,
        _contract: Address,
        _token_id: U256,
        mint_signature: &str,
    ) -> Result<Address, PlatformError> {
        SuperRareMint::parse(mint_signature)?;
        Ok(BAZAAR_ADDRESS)
    }

    async fn get_price(&self, query: &PriceQuery) -> Result<Option<U256>, PlatformError> {
        SuperRareMint::parse(&query.signature)?;
        let sale_price = self.sale_price(query.contract, query.token_id).await?;
        if sale_price.is_zero() {
            return Ok(None);
        }
        Ok(Some(price_with_fee(sale_price, query.quantity)))
    }

    /// `_amount` is the listed price; the bazaar adds its fee on top of it.
    async fn get_args(&self, query: &ArgsQuery) -> Result<Vec<AbiArg>, PlatformError> {
        SuperRareMint::parse(&query.signature)?;
        let sale_price = self.sale_price(query.contract, query.token_id).await?;
        Ok(vec![
            AbiArg::Address(query.contract),
            AbiArg::Uint(query.token_id),
            AbiArg::Address(Address::ZERO),
            AbiArg::Uint(sale_price),
        ])
    }

    async fn get_ui_data(&self, query: &UiDataQuery) -> Result<Option<UiData>, PlatformError> {
        let token = ISuperRareToken::new(query.contract, &self.provider);
        let token_uri = match token.tokenURI(query.token_id).call().await {
            Ok(uri) => uri._0,
            Err(e) => {
                warn!("SuperRare tokenURI failed for {}: {}", query.contract, e);
                return Ok(None);
            }
        };

        let metadata = self.metadata.fetch_metadata(&token_uri).await;
        let (Some(name), Some(image)) = (metadata.name.clone(), metadata.image.clone()) else {
            warn!("SuperRare metadata at {} lacks name or image", token_uri);
            return Ok(None);
        };
        let creator = self.creator(query.contract, query.token_id).await;

        Ok(Some(UiData {
            platform_name: self.platform_name.clone(),
            platform_logo_url: self.platform_logo_url.clone(),
            nft_name: name,
            nft_uri: self.metadata.normalize_uri(&image),
            nft_creator_address: creator,
            token_standard: Some("erc721".to_string()),
            dst_chain_id: Some(query.dst_chain_id),
            raw_metadata_uri: Some(token_uri),
            additional: None,
        }))
    }
}
