use alloy::primitives::{Address, U256};
use alloy::providers::RootProvider;
use alloy::sol;
use alloy::transports::http::{Client, Http};
use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use tracing::{info, warn};

use super::{
    parse_address, ArgsQuery, MintSignature, PlatformError, PlatformService, PriceQuery, Sale,
    ServiceConfig, UiDataQuery, unix_now, unrecognized_on_rejection,
};
use crate::chains::{Chain, ProtocolContracts};
use crate::registry::UrlExtractor;
use crate::types::{NftDetails, UiData};
use crate::utils::{parse_u256, AbiArg, MetadataFetcher};

sol! {
    #[sol(rpc)]
    interface IGenArt721CoreV3 {
        function minterContract() external view returns (address);
        function projectStateData(uint256 projectId) external view returns (uint256 invocations, uint256 maxInvocations, bool active, bool paused, uint256 completedTimestamp, bool locked);
        function tokenURI(uint256 tokenId) external view returns (string memory);
    }
}

sol! {
    #[sol(rpc)]
    interface IMinterFilterV2 {
        function getMinterForProject(uint256 projectId, address coreContract) external view returns (address);
    }
}

sol! {
    #[sol(rpc)]
    interface IMinterDAExpSettlementV3 {
        function projectAuctionParameters(uint256 projectId, address coreContract) external view returns (uint40 timestampStart, uint40 priceDecayHalfLifeSeconds, uint256 startPrice, uint256 basePrice);
        function getPriceInfo(uint256 projectId, address coreContract) external view returns (bool isConfigured, uint256 tokenPriceInWei, string memory currencySymbol, address currencyAddress);
    }
}

pub const PLATFORM_NAME: &str = "ArtBlocks";
pub const PLATFORM_LOGO_URL: &str = "https://www.artblocks.io/favicon.ico";

pub const PURCHASE_TO: &str = "function purchaseTo(address _to, uint256 _projectId, address _coreContract) external payable returns (uint256 tokenId)";

const PROJECT_ID_SCALE: u64 = 1_000_000;

pub static URL_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"https://www\.artblocks\.io/collections/curated/projects/(0x[a-fA-F0-9]{40})/(\d+)")
        .expect("static ArtBlocks URL pattern compiles")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtBlocksMint {
    PurchaseTo,
}

impl ArtBlocksMint {
    pub fn parse(signature: &str) -> Result<Self, PlatformError> {
        if signature.trim() == PURCHASE_TO {
            Ok(ArtBlocksMint::PurchaseTo)
        } else {
            Err(PlatformError::UnsupportedSignature(signature.to_string()))
        }
    }
}

/// Id of the latest token minted in a project: `1_000_000 * project + minted - 1`.
/// `None` until the project has at least one invocation.
pub fn artblocks_token_id(project_id: U256, minted: U256) -> Option<U256> {
    project_id
        .checked_mul(U256::from(PROJECT_ID_SCALE))?
        .checked_add(minted)?
        .checked_sub(U256::from(1u64))
        .filter(|_| !minted.is_zero())
}

/// Price of `quantity` tokens, absent when the sale is closed at `now` or the
/// minter reports no configured price.
pub fn project_price(sale: &Sale, now: u64, unit_price: Option<U256>, quantity: U256) -> Option<U256> {
    if !sale.is_valid_at(now) {
        return None;
    }
    unit_price.map(|price| price * quantity)
}

pub struct ArtBlocksUrlExtractor;

#[async_trait]
impl UrlExtractor for ArtBlocksUrlExtractor {
    async fn extract(&self, url: &str) -> Result<Option<NftDetails>, PlatformError> {
        let Some(caps) = URL_PATTERN.captures(url) else {
            return Ok(None);
        };

        Ok(Some(NftDetails {
            chain: Chain::Ethereum,
            contracts: ProtocolContracts::Marketplace,
            contract_address: caps[1].to_string(),
            token_id: caps[2].to_string(),
        }))
    }
}

pub struct ArtBlocksService {
    platform_name: String,
    platform_logo_url: String,
    chain: Chain,
    provider: RootProvider<Http<Client>>,
    metadata: MetadataFetcher,
}

impl ArtBlocksService {
    pub fn new(config: ServiceConfig) -> Result<Self, PlatformError> {
        if config.chain != Chain::Ethereum {
            return Err(PlatformError::UnsupportedChain(format!(
                "ArtBlocks curated projects live on mainnet, not {}",
                config.chain
            )));
        }

        Ok(Self {
            platform_name: config.platform_name,
            platform_logo_url: config.platform_logo_url,
            chain: config.chain,
            provider: config.rpc.provider(config.chain)?,
            metadata: config.metadata,
        })
    }

    /// Core contract -> minter filter -> minter assigned to the project.
    pub async fn project_minter(&self, core: Address, project_id: U256) -> Result<Address, PlatformError> {
        let filter = IGenArt721CoreV3::new(core, &self.provider).minterContract().call().await?._0;
        let minter = IMinterFilterV2::new(filter, &self.provider)
            .getMinterForProject(project_id, core)
            .call()
            .await?
            ._0;
        Ok(minter)
    }

    pub async fn get_sale(&self, core: Address, project_id: U256) -> Result<Sale, PlatformError> {
        let state = IGenArt721CoreV3::new(core, &self.provider)
            .projectStateData(project_id)
            .call()
            .await
            .map_err(|e| unrecognized_on_rejection(e, &format!("{} is not an ArtBlocks core", core)))?;
        let minter = self.project_minter(core, project_id).await?;
        let auction = IMinterDAExpSettlementV3::new(minter, &self.provider)
            .projectAuctionParameters(project_id, core)
            .call()
            .await?;

        Ok(Sale {
            sale_start: auction.timestampStart,
            sale_end: None,
            total_minted: state.invocations,
            max_supply: state.maxInvocations,
            price: auction.basePrice,
            payment_token: None,
            mint_fee: U256::ZERO,
        })
    }

    async fn project_invocations(&self, core: Address, project_id: U256) -> Result<U256, PlatformError> {
        Ok(IGenArt721CoreV3::new(core, &self.provider)
            .projectStateData(project_id)
            .call()
            .await?
            .invocations)
    }
}

#[async_trait]
impl PlatformService for ArtBlocksService {
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
        let core = parse_address(&nft.contract_address)?;
        let project_id = parse_u256(&nft.token_id)?;

        let sale = self.get_sale(core, project_id).await?;
        if !ignore_valid_sale && !sale.is_valid() {
            info!("ArtBlocks project {} on {} is not mintable", project_id, core);
            return Ok(None);
        }
        Ok(Some(MintSignature::native(PURCHASE_TO)))
    }

    async fn get_minter_address(
        &self,
        contract: Address,
        token_id: U256,
        mint_signature: &str,
    ) -> Result<Address, PlatformError> {
        ArtBlocksMint::parse(mint_signature)?;
        self.project_minter(contract, token_id).await
    }

    async fn get_price(&self, query: &PriceQuery) -> Result<Option<U256>, PlatformError> {
        ArtBlocksMint::parse(&query.signature)?;
        let sale = self.get_sale(query.contract, query.token_id).await?;
        let now = unix_now();
        if !sale.is_valid_at(now) {
            info!("ArtBlocks project {} on {} has no open sale", query.token_id, query.contract);
            return Ok(None);
        }

        let minter = self.project_minter(query.contract, query.token_id).await?;
        let info = IMinterDAExpSettlementV3::new(minter, &self.provider)
            .getPriceInfo(query.token_id, query.contract)
            .call()
            .await?;
        if !info.isConfigured {
            info!("ArtBlocks project {} has no configured price", query.token_id);
        }
        Ok(project_price(&sale, now, info.isConfigured.then_some(info.tokenPriceInWei), query.quantity))
    }

    async fn get_args(&self, query: &ArgsQuery) -> Result<Vec<AbiArg>, PlatformError> {
        ArtBlocksMint::parse(&query.signature)?;
        Ok(vec![
            AbiArg::Address(query.sender),
            AbiArg::Uint(query.token_id),
            AbiArg::Address(query.contract),
        ])
    }

    /// Shows the project's most recent token.
    async fn get_ui_data(&self, query: &UiDataQuery) -> Result<Option<UiData>, PlatformError> {
        let minted = match self.project_invocations(query.contract, query.token_id).await {
            Ok(minted) => minted,
            Err(e) => {
                warn!("ArtBlocks project lookup failed for {}: {}", query.contract, e);
                return Ok(None);
            }
        };
        let Some(token_id) = artblocks_token_id(query.token_id, minted) else {
            return Ok(None);
        };

        let token_uri = match IGenArt721CoreV3::new(query.contract, &self.provider).tokenURI(token_id).call().await {
            Ok(uri) => uri._0,
            Err(e) => {
                warn!("ArtBlocks tokenURI failed for {}: {}", token_id, e);
                return Ok(None);
            }
        };
        let Some(token) = self.metadata.fetch_json(&token_uri).await else {
            return Ok(None);
        };

        let field = |key: &str| {
            token
                .get(key)
                .and_then(Value::as_str)
                .filter(|value| !value.is_empty())
                .ok_or_else(|| PlatformError::DataIntegrity(format!("ArtBlocks token {} has no {}", token_id, key)))
        };
        let collection_name = field("collection_name")?;
        let preview = field("preview_asset_url")?;
        let payout = parse_address(field("payout_address")?)?;

        Ok(Some(UiData {
            platform_name: self.platform_name.clone(),
            platform_logo_url: self.platform_logo_url.clone(),
            nft_name: collection_name.to_string(),
            nft_uri: preview.to_string(),
            nft_creator_address: Some(payout),
            token_standard: Some("erc721".to_string()),
            dst_chain_id: Some(query.dst_chain_id),
            raw_metadata_uri: Some(token_uri),
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
    fn test_token_id_derivation() {
        assert_eq!(artblocks_token_id(U256::from(5u64), U256::from(10u64)), Some(U256::from(5_000_009u64)));
        assert_eq!(artblocks_token_id(U256::ZERO, U256::from(1u64)), Some(U256::ZERO));
        assert_eq!(artblocks_token_id(U256::from(5u64), U256::ZERO), None);
    }

    #[test]
    fn test_price_needs_open_sale() {
        let sale = |minted: u64| Sale {
            sale_start: 1_000,
            sale_end: None,
            total_minted: U256::from(minted),
            max_supply: U256::from(600u64),
            price: U256::ZERO,
            payment_token: None,
            mint_fee: U256::ZERO,
        };
        let unit = Some(U256::from(10_000_000_000_000_000u64));

        assert_eq!(
            project_price(&sale(599), 2_000, unit, U256::from(2u64)),
            Some(U256::from(20_000_000_000_000_000u64))
        );
        assert_eq!(project_price(&sale(600), 2_000, unit, U256::from(1u64)), None);
        assert_eq!(project_price(&sale(10), 999, unit, U256::from(1u64)), None);
        assert_eq!(project_price(&sale(10), 2_000, None, U256::from(1u64)), None);
    }

    #[tokio::test]
    async fn test_project_url() {
        let details = ArtBlocksUrlExtractor
            .extract("https://www.artblocks.io/collections/curated/projects/0x99a9b7c1116f9ceeb1652de04d5969cce509b069/474")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(details.chain, Chain::Ethereum);
        assert_eq!(details.token_id, "474");
    }

    #[test]
    fn test_purchase_to_args_encode() {
        let args = vec![
            AbiArg::Address(address!("444483c2d87a6C298f44c223C0638A3eAc7B6ea0")),
            AbiArg::Uint(U256::from(474u64)),
            AbiArg::Address(address!("99a9b7c1116f9ceeb1652de04d5969cce509b069")),
        ];
        assert!(encode_function_call(PURCHASE_TO, &args).is_ok());
        assert!(ArtBlocksMint::parse("function purchase(uint256 projectId, address coreContract)").is_err());
    }
}
