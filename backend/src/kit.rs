use alloy::primitives::{Address, Bytes, U256};
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

use crate::bridges::{
    ActionBridge, ActionConfig, ActionCost, ActionRequest, BridgeError, DecentBridge,
    DEFAULT_SLIPPAGE, LENS_ACTION_TYPE, PROCESS_PUBLICATION_ACTION,
};
use crate::calldata::{CalldataError, MintRecord};
use crate::chains::Chain;
use crate::config::KitConfig;
use crate::detection::DetectionEngine;
use crate::platforms::{parse_address, ArgsQuery, PlatformError, PriceQuery, UiDataQuery};
use crate::registry::PlatformRegistry;
use crate::types::{
    ActArguments, ActArgumentsFormatted, ActionData, ActionDataParams, PostDetails, TokenAmount,
};
use crate::utils::parse_u256;

#[derive(Error, Debug)]
pub enum KitError {
    #[error(transparent)]
    Platform(#[from] PlatformError),
    #[error("Bridging API failed: {0}")]
    Bridge(#[from] BridgeError),
    #[error("Invalid init data: {0}")]
    InvalidInitData(#[from] CalldataError),
    #[error("No init data for action module {0}")]
    InitDataNotFound(String),
    #[error("Unsupported destination chain id {0}")]
    UnsupportedChain(U256),
    #[error("No price")]
    NoPrice,
    #[error("No UI data")]
    NoUiData,
    #[error("No action response: {0}")]
    NoActionResponse(String),
    #[error("Configuration error: {0}")]
    Configuration(String),
}

/// Entry point: detects NFTs in post content and assembles open-action data for them.
pub struct NftOpenActionKit {
    detection: DetectionEngine,
    bridge: Arc<dyn ActionBridge>,
    action_module_address: Address,
}

impl NftOpenActionKit {
    pub fn new(config: KitConfig) -> Result<Self, KitError> {
        let registry = PlatformRegistry::from_config(&config)?;
        Self::with_registry(config, registry)
    }

    /// Same as [`NftOpenActionKit::new`] with a caller-built registry.
    pub fn with_registry(config: KitConfig, registry: PlatformRegistry) -> Result<Self, KitError> {
        if config.decent_api_key.trim().is_empty() {
            return Err(KitError::Configuration("Decent API key is mandatory".into()));
        }
        let bridge = DecentBridge::new(
            &config.endpoints.bridge_api_url,
            &config.decent_api_key,
            config.http_timeout(),
        )?;
        Self::with_bridge(&config, registry, Arc::new(bridge))
    }

    pub fn with_bridge(
        config: &KitConfig,
        registry: PlatformRegistry,
        bridge: Arc<dyn ActionBridge>,
    ) -> Result<Self, KitError> {
        let action_module_address = parse_address(&config.action_module_address)
            .map_err(|e| KitError::Configuration(e.to_string()))?;

        info!("NFT open action kit ready with bridge {}", bridge.name());
        Ok(Self {
            detection: DetectionEngine::new(Arc::new(registry)),
            bridge,
            action_module_address,
        })
    }

    pub fn detection(&self) -> &DetectionEngine {
        &self.detection
    }

    pub fn platform_names(&self) -> Vec<String> {
        self.detection.registry().names().into_iter().map(str::to_string).collect()
    }

    /// Init data for a post linking to `content_uri`, or `None` when nothing there is mintable.
    pub async fn detect_and_return_calldata(
        &self,
        content_uri: &str,
        publishing_client_profile_id: &str,
    ) -> Result<Option<Bytes>, KitError> {
        let Some(reference) = self.detection.detect_nft_details(content_uri).await? else {
            return Ok(None);
        };
        let Some(mint) = reference.service.get_mint_signature(&reference.details, false).await? else {
            info!("{} NFT at {} is not mintable", reference.platform_name, content_uri);
            return Ok(None);
        };

        let record = MintRecord {
            target_contract: parse_address(&reference.details.contract_address)?,
            token_id: parse_u256(&reference.details.token_id)?,
            payment_token: mint.payment_token.unwrap_or(Address::ZERO),
            chain_id: U256::from(reference.details.chain.id()),
            cost: U256::ZERO,
            publishing_client_profile_id: parse_u256(publishing_client_profile_id)?,
            signature: mint.mint_signature,
            platform_name: reference.platform_name,
        };
        Ok(Some(record.encode()))
    }

    /// Resolves live price, call arguments, bridged transaction data and UI
    /// metadata for acting on `params.post`. Any missing piece fails the call.
    pub async fn action_data_from_post(&self, params: &ActionDataParams) -> Result<ActionData, KitError> {
        let record = find_mint_record(&params.post, self.action_module_address)?;
        let chain = u64::try_from(record.chain_id)
            .ok()
            .and_then(Chain::from_id)
            .ok_or(KitError::UnsupportedChain(record.chain_id))?;
        let service = self.detection.get_service(&record.platform_name, chain)?;
        let payment_token = Some(record.payment_token).filter(|token| *token != Address::ZERO);

        let price = service
            .get_price(&PriceQuery {
                contract: record.target_contract,
                token_id: record.token_id,
                signature: record.signature.clone(),
                user: params.sender_address,
                quantity: params.quantity,
                source_url: params.source_url.clone(),
                payment_token,
            })
            .await?
            .ok_or(KitError::NoPrice)?;
        info!("{} price for {}:{} is {}", record.platform_name, record.target_contract, record.token_id, price);

        let minter = service
            .get_minter_address(record.target_contract, record.token_id, &record.signature)
            .await?;
        let args = service
            .get_args(&ArgsQuery {
                contract: record.target_contract,
                token_id: record.token_id,
                sender: params.sender_address,
                signature: record.signature.clone(),
                price,
                quantity: params.quantity,
                profile_owner: params.profile_owner_address,
                source_url: params.source_url.clone(),
                payment_token,
            })
            .await?;

        let request = ActionRequest {
            sender: params.sender_address,
            src_chain_id: params.src_chain_id,
            src_token: params.payment_token,
            dst_chain_id: chain.id(),
            dst_token: record.payment_token,
            slippage: DEFAULT_SLIPPAGE,
            action_type: LENS_ACTION_TYPE.to_string(),
            action_config: ActionConfig {
                function_call: PROCESS_PUBLICATION_ACTION.to_string(),
                pub_id: params.post.pub_id.clone(),
                profile_id: params.post.profile_id.clone(),
                contract_address: minter,
                chain_id: chain.id(),
                cost: ActionCost { is_native: payment_token.is_none(), amount: price },
                signature: record.signature.clone(),
                args,
            },
        };

        let response = self.bridge.get_action(&request).await?;
        if !response.is_success() {
            let reason = response.error_message().unwrap_or_else(|| "success is false".into());
            warn!("Bridging API rejected action: {}", reason);
            return Err(KitError::NoActionResponse(reason));
        }
        let action_module_data = response
            .lens_action_data()
            .ok_or_else(|| KitError::NoActionResponse("missing arbitraryData.lensActionData".into()))?;
        let (payment_address, payment_amount) = response
            .token_payment()
            .ok_or_else(|| KitError::NoActionResponse("missing tokenPayment".into()))?;

        let (referrer_profile_ids, referrer_pub_ids) = referrers(
            params.mirrorer_profile_id.as_deref(),
            params.mirror_pub_id.as_deref(),
            &params.executing_client_profile_id,
        )?;

        let act_arguments = ActArguments {
            publication_acted_profile_id: parse_u256(&params.post.profile_id)?,
            publication_acted_id: parse_u256(&params.post.pub_id)?,
            actor_profile_id: parse_u256(&params.profile_id)?,
            referrer_profile_ids,
            referrer_pub_ids,
            action_module_address: self.action_module_address,
            action_module_data,
        };

        let ui_data = service
            .get_ui_data(&UiDataQuery {
                signature: record.signature.clone(),
                contract: record.target_contract,
                token_id: record.token_id,
                dst_chain_id: chain.id(),
                source_url: params.source_url.clone(),
            })
            .await?
            .ok_or(KitError::NoUiData)?;

        let bridge_fee = response.bridge_fee().map(|(address, amount)| TokenAmount {
            address,
            amount,
            chain_id: params.src_chain_id,
        });

        Ok(ActionData {
            act_arguments,
            ui_data,
            act_arguments_formatted: ActArgumentsFormatted {
                payment_token: TokenAmount {
                    address: payment_address,
                    amount: payment_amount,
                    chain_id: params.src_chain_id,
                },
                bridge_fee,
            },
        })
    }
}

/// Decodes the init data stored next to `module` in a post.
pub fn find_mint_record(post: &PostDetails, module: Address) -> Result<MintRecord, KitError> {
    let index = post
        .action_modules
        .iter()
        .position(|candidate| parse_address(candidate).map_or(false, |address| address == module))
        .ok_or_else(|| KitError::InitDataNotFound(module.to_checksum(None)))?;
    let init_data = post
        .action_modules_init_datas
        .get(index)
        .ok_or_else(|| KitError::InitDataNotFound(module.to_checksum(None)))?;
    Ok(MintRecord::decode_hex(init_data)?)
}

/// Mirrored acts credit the mirrorer first, then the executing client.
pub fn referrers(
    mirrorer_profile_id: Option<&str>,
    mirror_pub_id: Option<&str>,
    executing_client_profile_id: &str,
) -> Result<(Vec<U256>, Vec<U256>), PlatformError> {
    let client = parse_u256(executing_client_profile_id)?;
    match (mirrorer_profile_id, mirror_pub_id) {
        (Some(mirrorer), Some(mirror_pub)) if !mirrorer.is_empty() && !mirror_pub.is_empty() => Ok((
            vec![parse_u256(mirrorer)?, client],
            vec![parse_u256(mirror_pub)?, U256::ZERO],
        )),
        _ => Ok((vec![client], vec![U256::ZERO])),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::address;

    const MODULE: Address = address!("028f6aeE3CF9e1cA725f4C47d9460801b6c7508A");

    fn record() -> MintRecord {
        MintRecord {
            target_contract: address!("9D2fC5fFE5939efD1d573F975BC5EEFd364779ae"),
            token_id: U256::from(3u64),
            payment_token: Address::ZERO,
            chain_id: U256::from(8453u64),
            cost: U256::ZERO,
            publishing_client_profile_id: U256::from(1u64),
            signature: "function mint()".into(),
            platform_name: "Zora".into(),
        }
    }

    fn post(modules: Vec<String>, datas: Vec<String>) -> PostDetails {
        PostDetails {
            profile_id: "0x01".into(),
            pub_id: "0x02".into(),
            content_uri: None,
            action_modules: modules,
            action_modules_init_datas: datas,
        }
    }

    #[test]
    fn test_init_data_matches_module_case_insensitively() {
        let encoded = format!("0x{}", hex::encode(record().encode()));
        let post = post(
            vec!["0x0000000000000000000000000000000000000001".into(), MODULE.to_checksum(None).to_lowercase()],
            vec!["0x".into(), encoded],
        );
        assert_eq!(find_mint_record(&post, MODULE).unwrap(), record());
    }

    #[test]
    fn test_missing_module_is_reported() {
        let post = post(vec!["0x0000000000000000000000000000000000000001".into()], vec!["0x".into()]);
        assert!(matches!(find_mint_record(&post, MODULE), Err(KitError::InitDataNotFound(_))));
    }

    #[test]
    fn test_referrer_lists() {
        let (profiles, pubs) = referrers(Some("7"), Some("0x09"), "1").unwrap();
        assert_eq!(profiles, vec![U256::from(7u64), U256::from(1u64)]);
        assert_eq!(pubs, vec![U256::from(9u64), U256::ZERO]);

        let (profiles, pubs) = referrers(None, Some("9"), "1").unwrap();
        assert_eq!(profiles, vec![U256::from(1u64)]);
        assert_eq!(pubs, vec![U256::ZERO]);
    }

    #[test]
    fn test_kit_requires_decent_key() {
        assert!(matches!(NftOpenActionKit::new(KitConfig::default()), Err(KitError::Configuration(_))));
        assert!(NftOpenActionKit::new(KitConfig::new("decent")).is_ok());
    }
}
