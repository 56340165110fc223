#![allow(dead_code)]

use alloy::primitives::{address, Address, U256};
use async_trait::async_trait;
use std::sync::{Arc, Mutex};

use nft_openaction_kit::chains::Chain;
use nft_openaction_kit::platforms::{
    zora, ArgsQuery, MintSignature, PlatformError, PlatformService, PriceQuery, UiDataQuery,
};
use nft_openaction_kit::registry::{service_factory, PlatformDescriptor, PlatformRegistry, ServiceContext};
use nft_openaction_kit::types::{NftDetails, PostDetails, UiData};
use nft_openaction_kit::utils::AbiArg;
use nft_openaction_kit::{KitConfig, MintRecord};

pub const NFT_CONTRACT: Address = address!("9D2fC5fFE5939efD1d573F975BC5EEFd364779ae");
pub const MINTER: Address = address!("04E2516A2c207E84a1839755675dfd8eF6302F0a");
pub const SENDER: Address = address!("444483c2d87a6C298f44c223C0638A3eAc7B6ea0");
pub const PRICE: u64 = 777_000_000_000_000;

/// Stand-in adapter that records which capability calls reach it.
#[derive(Clone)]
pub struct MockPlatform {
    pub chain: Chain,
    pub price: Option<U256>,
    pub calls: Arc<Mutex<Vec<String>>>,
}

impl MockPlatform {
    fn record(&self, call: &str) {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(call.to_string());
        }
    }
}

#[async_trait]
impl PlatformService for MockPlatform {
    fn platform_name(&self) -> &str {
        zora::PLATFORM_NAME
    }

    fn platform_logo_url(&self) -> &str {
        zora::PLATFORM_LOGO_URL
    }

    fn chain(&self) -> Chain {
        self.chain
    }

    async fn get_mint_signature(
        &self,
        _nft: &NftDetails,
        _ignore_valid_sale: bool,
    ) -> Result<Option<MintSignature>, PlatformError> {
        self.record("get_mint_signature");
        Ok(Some(MintSignature::native(zora::ZoraMint::FixedPrice.signature())))
    }

    async fn get_minter_address(
        &self,
        _contract: Address,
        _token_id: U256,
        _mint_signature: &str,
    ) -> Result<Address, PlatformError> {
        self.record("get_minter_address");
        Ok(MINTER)
    }

    async fn get_price(&self, query: &PriceQuery) -> Result<Option<U256>, PlatformError> {
        self.record("get_price");
        Ok(self.price.map(|price| price * query.quantity))
    }

    async fn get_args(&self, query: &ArgsQuery) -> Result<Vec<AbiArg>, PlatformError> {
        self.record("get_args");
        Ok(vec![
            AbiArg::Address(MINTER),
            AbiArg::Uint(query.token_id),
            AbiArg::Uint(query.quantity),
            AbiArg::Array(vec![AbiArg::Address(query.profile_owner)]),
            AbiArg::Bytes(vec![0u8; 32].into()),
        ])
    }

    async fn get_ui_data(&self, query: &UiDataQuery) -> Result<Option<UiData>, PlatformError> {
        self.record("get_ui_data");
        Ok(Some(UiData {
            platform_name: zora::PLATFORM_NAME.to_string(),
            platform_logo_url: zora::PLATFORM_LOGO_URL.to_string(),
            nft_name: "Onchain Summer".to_string(),
            nft_uri: "https://magic.decentralized-content.com/ipfs/bafy".to_string(),
            nft_creator_address: Some(SENDER),
            token_standard: Some("erc1155".to_string()),
            dst_chain_id: Some(query.dst_chain_id),
            raw_metadata_uri: None,
            additional: None,
        }))
    }
}

/// Registry whose "Zora" entry builds [`MockPlatform`]s.
pub fn mock_registry(config: &KitConfig, price: Option<U256>, calls: Arc<Mutex<Vec<String>>>) -> PlatformRegistry {
    let context = ServiceContext::from_config(config).unwrap();
    let mut registry = PlatformRegistry::new(context);
    registry.register(PlatformDescriptor::new(
        zora::PLATFORM_NAME,
        zora::PLATFORM_LOGO_URL,
        &zora::URL_PATTERN,
        Arc::new(zora::ZoraUrlExtractor),
        service_factory(move |service_config| {
            Ok(MockPlatform { chain: service_config.chain, price, calls: calls.clone() })
        }),
    ));
    registry
}

pub fn zora_base_record() -> MintRecord {
    MintRecord {
        target_contract: NFT_CONTRACT,
        token_id: U256::from(3u64),
        payment_token: Address::ZERO,
        chain_id: U256::from(8453u64),
        cost: U256::ZERO,
        publishing_client_profile_id: U256::from(1u64),
        signature: zora::ZoraMint::FixedPrice.signature().to_string(),
        platform_name: zora::PLATFORM_NAME.to_string(),
    }
}

pub fn post_with_record(config: &KitConfig, record: &MintRecord) -> PostDetails {
    PostDetails {
        profile_id: "0x01".to_string(),
        pub_id: "0x2a".to_string(),
        content_uri: Some("https://zora.co/collect/base:0x9D2fC5fFE5939efD1d573F975BC5EEFd364779ae/3".to_string()),
        action_modules: vec![config.action_module_address.to_lowercase()],
        action_modules_init_datas: vec![format!("0x{}", hex::encode(record.encode()))],
    }
}
