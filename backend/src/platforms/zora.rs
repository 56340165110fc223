use alloy::primitives::{Address, U256};
use alloy::providers::RootProvider;
use alloy::sol;
use alloy::sol_types::SolValue;
use alloy::transports::http::{Client, Http};
use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use std::future::IntoFuture;
use tracing::{debug, info, warn};

use super::{
    parse_address, ArgsQuery, MintSignature, PlatformError, PlatformService, PriceQuery, Sale,
    ServiceConfig, UiDataQuery, unrecognized_on_rejection,
};
use crate::chains::{zora_contracts, Chain, ProtocolContracts, ZoraContracts};
use crate::registry::UrlExtractor;
use crate::types::{NftDetails, UiData};
use crate::utils::{parse_u256, AbiArg, MetadataFetcher, TokenMetadata};

sol! {
    #[sol(rpc)]
    interface IZoraCreator1155 {
        struct TokenData {
            string uri;
            uint256 maxSupply;
            uint256 totalMinted;
        }

        function getTokenInfo(uint256 tokenId) external view returns (TokenData memory);
        function name() external view returns (string memory);
        function owner() external view returns (address);
        function uri(uint256 tokenId) external view returns (string memory);
    }
}

sol! {
    #[sol(rpc)]
    interface IZoraFixedPriceSaleStrategy {
        struct SalesConfig {
            uint64 saleStart;
            uint64 saleEnd;
            uint64 maxTokensPerAddress;
            uint96 pricePerToken;
            address fundsRecipient;
        }

        function sale(address tokenContract, uint256 tokenId) external view returns (SalesConfig memory);
    }
}

sol! {
    #[sol(rpc)]
    interface IZoraTimedSaleStrategy {
        struct SaleStorage {
            address erc20zAddress;
            uint64 saleStart;
            address poolAddress;
            uint64 saleEnd;
            bool secondaryActivated;
        }

        function sale(address collection, uint256 tokenId) external view returns (SaleStorage memory);
    }
}

sol! {
    #[sol(rpc)]
    interface IZoraERC20Minter {
        struct SalesConfig {
            uint64 saleStart;
            uint64 saleEnd;
            uint64 maxTokensPerAddress;
            uint256 pricePerToken;
            address fundsRecipient;
            address currency;
        }

        function sale(address tokenContract, uint256 tokenId) external view returns (SalesConfig memory);
    }
}

pub const PLATFORM_NAME: &str = "Zora";
pub const PLATFORM_LOGO_URL: &str = "https://zora.co/favicon.ico";

pub static URL_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"https://zora\.co/collect/([a-z]+):(0x[a-fA-F0-9]{40})(?:/(?:premint-)?(\d+))?")
        .expect("static Zora URL pattern compiles")
});

/// 0.000777 ETH protocol reward on fixed-price mints.
pub const FIXED_PRICE_MINT_FEE: U256 = U256::from_limbs([777_000_000_000_000, 0, 0, 0]);
/// 0.000111 ETH protocol reward on timed-sale mints.
pub const TIMED_SALE_MINT_FEE: U256 = U256::from_limbs([111_000_000_000_000, 0, 0, 0]);

/// Sale strategy contracts queried for a token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaleProbe {
    FixedPrice,
    TimedSale,
    Erc20Minter,
}

/// Strategies are probed in this order; the first non-empty record wins.
pub const SALE_PROBE_ORDER: [SaleProbe; 3] =
    [SaleProbe::FixedPrice, SaleProbe::TimedSale, SaleProbe::Erc20Minter];

/// Raw sale window read from one strategy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaleRecord {
    pub probe: SaleProbe,
    pub sale_start: u64,
    pub sale_end: u64,
    pub price: U256,
    pub currency: Option<Address>,
}

impl SaleRecord {
    pub fn empty(probe: SaleProbe) -> Self {
        Self { probe, sale_start: 0, sale_end: 0, price: U256::ZERO, currency: None }
    }

    /// A strategy that never configured the token returns a zeroed window.
    pub fn is_empty(&self) -> bool {
        self.sale_start == 0 && self.sale_end == 0
    }
}

#[async_trait]
pub trait SaleRecordSource: Send + Sync {
    async fn sale_record(
        &self,
        probe: SaleProbe,
        contract: Address,
        token_id: U256,
    ) -> Result<SaleRecord, PlatformError>;
}

/// Walks [`SALE_PROBE_ORDER`] and returns the first configured sale. A probe
/// whose read reverts counts as empty; an RPC failure aborts the walk.
pub async fn probe_sale_record<S: SaleRecordSource + ?Sized>(
    source: &S,
    contract: Address,
    token_id: U256,
) -> Result<Option<SaleRecord>, PlatformError> {
    for probe in SALE_PROBE_ORDER {
        let record = match source.sale_record(probe, contract, token_id).await {
            Ok(record) => record,
            Err(PlatformError::ContractCall(e)) => {
                debug!("Zora {:?} probe reverted for {}:{}: {}", probe, contract, token_id, e);
                continue;
            }
            Err(e) => return Err(e),
        };
        if !record.is_empty() {
            debug!("Zora sale found via {:?} for {}:{}", probe, contract, token_id);
            return Ok(Some(record));
        }
    }
    Ok(None)
}

/// Zora mint functions, keyed by their exact signature text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ZoraMint {
    FixedPrice,
    TimedSale,
    Erc20,
}

impl ZoraMint {
    pub const ALL: [ZoraMint; 3] = [ZoraMint::FixedPrice, ZoraMint::TimedSale, ZoraMint::Erc20];

    pub const fn signature(self) -> &'static str {
        match self {
            ZoraMint::FixedPrice => "function mint(address minter, uint256 tokenId, uint256 quantity, address[] calldata rewardsRecipients, bytes calldata minterArguments)",
            ZoraMint::TimedSale => "function mint(address mintTo, uint256 quantity, address collection, uint256 tokenId, address mintReferral, string comment)",
            ZoraMint::Erc20 => "function mint(address mintTo, uint256 quantity, address tokenAddress, uint256 tokenId, uint256 totalValue, address currency, address mintReferral, string comment)",
        }
    }

    pub fn from_signature(signature: &str) -> Option<Self> {
        let signature = signature.trim();
        Self::ALL.into_iter().find(|kind| kind.signature() == signature)
    }

    pub fn parse(signature: &str) -> Result<Self, PlatformError> {
        Self::from_signature(signature)
            .ok_or_else(|| PlatformError::UnsupportedSignature(signature.to_string()))
    }

    pub fn for_probe(probe: SaleProbe) -> Self {
        match probe {
            SaleProbe::FixedPrice => ZoraMint::FixedPrice,
            SaleProbe::TimedSale => ZoraMint::TimedSale,
            SaleProbe::Erc20Minter => ZoraMint::Erc20,
        }
    }

    pub fn probe(self) -> SaleProbe {
        match self {
            ZoraMint::FixedPrice => SaleProbe::FixedPrice,
            ZoraMint::TimedSale => SaleProbe::TimedSale,
            ZoraMint::Erc20 => SaleProbe::Erc20Minter,
        }
    }

    pub fn mint_fee(self) -> U256 {
        match self {
            ZoraMint::FixedPrice => FIXED_PRICE_MINT_FEE,
            ZoraMint::TimedSale => TIMED_SALE_MINT_FEE,
            ZoraMint::Erc20 => U256::ZERO,
        }
    }
}

/// `(price + fee) * quantity`, without the native fee when paying in an ERC-20.
pub fn total_price(
    price_per_token: U256,
    mint_fee: U256,
    quantity: U256,
    payment_token: Option<Address>,
) -> U256 {
    let pays_in_erc20 = payment_token.map_or(false, |token| token != Address::ZERO);
    if pays_in_erc20 {
        price_per_token * quantity
    } else {
        (price_per_token + mint_fee) * quantity
    }
}

fn sale_from_record(kind: ZoraMint, record: &SaleRecord, minted: U256, max_supply: U256) -> Sale {
    let sale_end = match (kind, record.sale_end) {
        (ZoraMint::TimedSale, 0) => None,
        (_, end) => Some(end),
    };
    Sale {
        sale_start: record.sale_start,
        sale_end,
        total_minted: minted,
        max_supply,
        price: record.price,
        payment_token: record.currency.filter(|currency| *currency != Address::ZERO),
        mint_fee: kind.mint_fee(),
    }
}

/// Positional arguments for `kind`, in signature order.
pub fn build_mint_args(kind: ZoraMint, contracts: &ZoraContracts, query: &ArgsQuery) -> Vec<AbiArg> {
    match kind {
        ZoraMint::FixedPrice => vec![
            AbiArg::Address(contracts.fixed_price_strategy),
            AbiArg::Uint(query.token_id),
            AbiArg::Uint(query.quantity),
            AbiArg::Array(vec![AbiArg::Address(query.profile_owner)]),
            AbiArg::Bytes(query.sender.abi_encode().into()),
        ],
        ZoraMint::TimedSale => vec![
            AbiArg::Address(query.sender),
            AbiArg::Uint(query.quantity),
            AbiArg::Address(collection_address(query.contract, query.source_url.as_deref())),
            AbiArg::Uint(query.token_id),
            AbiArg::Address(query.profile_owner),
            AbiArg::String(String::new()),
        ],
        ZoraMint::Erc20 => vec![
            AbiArg::Address(query.sender),
            AbiArg::Uint(query.quantity),
            AbiArg::Address(query.contract),
            AbiArg::Uint(query.token_id),
            AbiArg::Uint(query.price),
            AbiArg::Address(query.payment_token.unwrap_or(Address::ZERO)),
            AbiArg::Address(query.profile_owner),
            AbiArg::String(String::new()),
        ],
    }
}

/// The collection named in a Zora source URL, else `fallback`.
fn collection_address(fallback: Address, source_url: Option<&str>) -> Address {
    source_url
        .and_then(|url| URL_PATTERN.captures(url))
        .and_then(|caps| caps.get(2))
        .and_then(|m| m.as_str().parse().ok())
        .unwrap_or(fallback)
}

pub struct ZoraUrlExtractor;

#[async_trait]
impl UrlExtractor for ZoraUrlExtractor {
    async fn extract(&self, url: &str) -> Result<Option<NftDetails>, PlatformError> {
        let Some(caps) = URL_PATTERN.captures(url) else {
            return Ok(None);
        };
        let Some(chain) = Chain::from_zora_key(&caps[1]) else {
            debug!("Unknown Zora chain key: {}", &caps[1]);
            return Ok(None);
        };
        let Some(contracts) = zora_contracts(chain) else {
            return Ok(None);
        };
        // Collection links carry no token id; they resolve to token 0.
        let token_id = caps.get(3).map_or("0", |m| m.as_str());

        Ok(Some(NftDetails {
            chain,
            contracts: ProtocolContracts::Zora(contracts),
            contract_address: caps[2].to_string(),
            token_id: token_id.to_string(),
        }))
    }
}

pub struct ZoraService {
    platform_name: String,
    platform_logo_url: String,
    chain: Chain,
    contracts: ZoraContracts,
    provider: RootProvider<Http<Client>>,
    metadata: MetadataFetcher,
}

impl ZoraService {
    pub fn new(config: ServiceConfig) -> Result<Self, PlatformError> {
        let contracts = zora_contracts(config.chain).ok_or_else(|| {
            PlatformError::UnsupportedChain(format!("Zora is not deployed on {}", config.chain))
        })?;
        let provider = config.rpc.provider(config.chain)?;

        Ok(Self {
            platform_name: config.platform_name,
            platform_logo_url: config.platform_logo_url,
            chain: config.chain,
            contracts,
            provider,
            metadata: config.metadata,
        })
    }

    pub fn contracts(&self) -> &ZoraContracts {
        &self.contracts
    }

    async fn token_supply(&self, contract: Address, token_id: U256) -> Result<(U256, U256), PlatformError> {
        let collection = IZoraCreator1155::new(contract, &self.provider);
        let info = collection.getTokenInfo(token_id).call().await.map_err(|e| {
            unrecognized_on_rejection(e, &format!("{} is not a Zora ERC-1155 token on {}", contract, self.chain))
        })?;
        Ok((info._0.totalMinted, info._0.maxSupply))
    }

    /// Current sale for a token, resolved through the probe chain.
    pub async fn get_sale(&self, contract: Address, token_id: U256) -> Result<(ZoraMint, Sale), PlatformError> {
        let (minted, max_supply) = self.token_supply(contract, token_id).await?;
        let record = probe_sale_record(self, contract, token_id).await?.ok_or_else(|| {
            PlatformError::UnrecognizedContract(format!(
                "No Zora sale strategy configured for {}:{}",
                contract, token_id
            ))
        })?;
        let kind = ZoraMint::for_probe(record.probe);
        Ok((kind, sale_from_record(kind, &record, minted, max_supply)))
    }

    async fn sale_for(&self, kind: ZoraMint, contract: Address, token_id: U256) -> Result<Option<Sale>, PlatformError> {
        let record = self.sale_record(kind.probe(), contract, token_id).await?;
        if record.is_empty() {
            return Ok(None);
        }
        let (minted, max_supply) = self.token_supply(contract, token_id).await?;
        Ok(Some(sale_from_record(kind, &record, minted, max_supply)))
    }
}

#[async_trait]
impl SaleRecordSource for ZoraService {
    async fn sale_record(
        &self,
        probe: SaleProbe,
        contract: Address,
        token_id: U256,
    ) -> Result<SaleRecord, PlatformError> {
        let record = match probe {
            SaleProbe::FixedPrice => {
                let strategy = IZoraFixedPriceSaleStrategy::new(self.contracts.fixed_price_strategy, &self.provider);
                let config = strategy.sale(contract, token_id).call().await?._0;
                SaleRecord {
                    probe,
                    sale_start: config.saleStart,
                    sale_end: config.saleEnd,
                    price: U256::from(config.pricePerToken),
                    currency: None,
                }
            }
            SaleProbe::TimedSale => {
                let strategy = IZoraTimedSaleStrategy::new(self.contracts.timed_sale_strategy, &self.provider);
                let storage = strategy.sale(contract, token_id).call().await?._0;
                SaleRecord {
                    probe,
                    sale_start: storage.saleStart,
                    sale_end: storage.saleEnd,
                    price: U256::ZERO,
                    currency: None,
                }
            }
            SaleProbe::Erc20Minter => {
                let minter = IZoraERC20Minter::new(self.contracts.erc20_minter, &self.provider);
                let config = minter.sale(contract, token_id).call().await?._0;
                SaleRecord {
                    probe,
                    sale_start: config.saleStart,
                    sale_end: config.saleEnd,
                    price: config.pricePerToken,
                    currency: Some(config.currency),
                }
            }
        };
        Ok(record)
    }
}

#[async_trait]
impl PlatformService for ZoraService {
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

        let (kind, sale) = self.get_sale(contract, token_id).await?;
        if !ignore_valid_sale && !sale.is_valid() {
            info!("Zora sale for {}:{} is not currently mintable", contract, token_id);
            return Ok(None);
        }

        Ok(Some(MintSignature {
            mint_signature: kind.signature().to_string(),
            payment_token: sale.payment_token,
        }))
    }

    async fn get_minter_address(
        &self,
        contract: Address,
        _token_id: U256,
        mint_signature: &str,
    ) -> Result<Address, PlatformError> {
        Ok(match ZoraMint::parse(mint_signature)? {
            ZoraMint::FixedPrice => contract,
            ZoraMint::TimedSale => self.contracts.timed_sale_strategy,
            ZoraMint::Erc20 => self.contracts.erc20_minter,
        })
    }

    async fn get_price(&self, query: &PriceQuery) -> Result<Option<U256>, PlatformError> {
        let kind = ZoraMint::parse(&query.signature)?;
        let contract = match kind {
            ZoraMint::TimedSale => collection_address(query.contract, query.source_url.as_deref()),
            _ => query.contract,
        };

        let Some(sale) = self.sale_for(kind, contract, query.token_id).await? else {
            return Ok(None);
        };
        if !sale.is_valid() {
            return Ok(None);
        }

        let payment_token = query.payment_token.or(sale.payment_token);
        Ok(Some(total_price(sale.price, sale.mint_fee, query.quantity, payment_token)))
    }

    async fn get_args(&self, query: &ArgsQuery) -> Result<Vec<AbiArg>, PlatformError> {
        let kind = ZoraMint::parse(&query.signature)?;
        Ok(build_mint_args(kind, &self.contracts, query))
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
            additional: display.metadata.raw,
        }))
    }
}

/// Display fields of a Zora-protocol ERC-1155 token.
pub(crate) struct Erc1155Display {
    pub collection_name: String,
    pub owner: Address,
    pub uri: String,
    pub image: String,
    pub metadata: TokenMetadata,
}

/// Reads name, owner and token URI, then the metadata document. Any chain read
/// failure yields `None`; a metadata failure yields empty metadata.
pub(crate) async fn read_erc1155_display(
    provider: &RootProvider<Http<Client>>,
    metadata: &MetadataFetcher,
    contract: Address,
    token_id: U256,
) -> Option<Erc1155Display> {
    let collection = IZoraCreator1155::new(contract, provider);
    let name_call = collection.name();
    let owner_call = collection.owner();
    let uri_call = collection.uri(token_id);

    let (name, owner, uri) =
        match futures::try_join!(
            name_call.call().into_future(),
            owner_call.call().into_future(),
            uri_call.call().into_future()
        ) {
            Ok(reads) => reads,
            Err(e) => {
                warn!("ERC-1155 display data unavailable for {}: {}", contract, e);
                return None;
            }
        };

    let token_metadata = metadata.fetch_metadata(&uri._0).await;
    let image = token_metadata
        .image
        .as_deref()
        .map(|image| metadata.normalize_uri(image))
        .unwrap_or_default();

    Some(Erc1155Display {
        collection_name: name._0,
        owner: owner._0,
        uri: uri._0,
        image,
        metadata: token_metadata,
    })
}
