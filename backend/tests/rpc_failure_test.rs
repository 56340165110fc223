use alloy::primitives::{address, Address, U256};

use nft_openaction_kit::chains::{zora_contracts, Chain, ProtocolContracts};
use nft_openaction_kit::platforms::zora::ZoraMint;
use nft_openaction_kit::platforms::PriceQuery;
use nft_openaction_kit::types::NftDetails;
use nft_openaction_kit::{KitConfig, PlatformError, PlatformRegistry};

const COLLECTION: Address = address!("9D2fC5fFE5939efD1d573F975BC5EEFd364779ae");

/// Registry whose Base RPC points at a closed local port.
fn unreachable_base_registry() -> PlatformRegistry {
    let mut config = KitConfig::new("decent");
    config.fallback_rpcs.insert(Chain::Base.id(), "http://127.0.0.1:9".to_string());
    PlatformRegistry::from_config(&config).unwrap()
}

#[tokio::test]
async fn test_dead_rpc_is_not_an_unrecognized_contract() {
    let registry = unreachable_base_registry();
    let service = registry.create_service(registry.get("Zora").unwrap(), Chain::Base).unwrap();

    let details = NftDetails {
        chain: Chain::Base,
        contracts: ProtocolContracts::Zora(zora_contracts(Chain::Base).unwrap()),
        contract_address: COLLECTION.to_checksum(None),
        token_id: "3".to_string(),
    };
    let result = service.get_mint_signature(&details, false).await;
    assert!(matches!(result, Err(PlatformError::Rpc(_))), "{:?}", result);
}

#[tokio::test]
async fn test_dead_rpc_fails_price_lookup() {
    let registry = unreachable_base_registry();
    let service = registry.create_service(registry.get("Zora").unwrap(), Chain::Base).unwrap();

    let result = service
        .get_price(&PriceQuery {
            contract: COLLECTION,
            token_id: U256::from(3u64),
            signature: ZoraMint::TimedSale.signature().to_string(),
            user: Address::ZERO,
            quantity: U256::from(1u64),
            source_url: None,
            payment_token: None,
        })
        .await;
    assert!(matches!(result, Err(PlatformError::Rpc(_))), "{:?}", result);
}
