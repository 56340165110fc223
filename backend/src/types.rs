use alloy::primitives::{Address, Bytes, U256};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::chains::{Chain, ProtocolContracts};
use crate::platforms::PlatformService;
use crate::utils::bigint_json::{bigint, bigint_vec};

/// Identifiers extracted from a content URL.
///
/// `contract_address` and `token_id` keep the exact text captured from the URL.
/// For ArtBlocks the token id is a project id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NftDetails {
    pub chain: Chain,
    pub contracts: ProtocolContracts,
    pub contract_address: String,
    pub token_id: String,
}

/// A detected NFT bound to the adapter that serves it.
#[derive(Clone)]
pub struct NftReference {
    pub platform_name: String,
    pub platform_logo_url: String,
    pub details: NftDetails,
    pub service: Arc<dyn PlatformService>,
}

impl std::fmt::Debug for NftReference {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NftReference")
            .field("platform_name", &self.platform_name)
            .field("details", &self.details)
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UiData {
    pub platform_name: String,
    pub platform_logo_url: String,
    pub nft_name: String,
    pub nft_uri: String,
    pub nft_creator_address: Option<Address>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_standard: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dst_chain_id: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_metadata_uri: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub additional: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ActArguments {
    #[serde(with = "bigint")]
    pub publication_acted_profile_id: U256,
    #[serde(with = "bigint")]
    pub publication_acted_id: U256,
    #[serde(with = "bigint")]
    pub actor_profile_id: U256,
    #[serde(with = "bigint_vec")]
    pub referrer_profile_ids: Vec<U256>,
    #[serde(with = "bigint_vec")]
    pub referrer_pub_ids: Vec<U256>,
    pub action_module_address: Address,
    pub action_module_data: Bytes,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TokenAmount {
    pub address: Address,
    #[serde(with = "bigint")]
    pub amount: U256,
    pub chain_id: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ActArgumentsFormatted {
    pub payment_token: TokenAmount,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bridge_fee: Option<TokenAmount>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ActionData {
    pub act_arguments: ActArguments,
    pub ui_data: UiData,
    pub act_arguments_formatted: ActArgumentsFormatted,
}

/// The part of a published post needed to act on it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PostDetails {
    pub profile_id: String,
    pub pub_id: String,
    #[serde(default, rename = "contentURI", skip_serializing_if = "Option::is_none")]
    pub content_uri: Option<String>,
    pub action_modules: Vec<String>,
    pub action_modules_init_datas: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ActionDataParams {
    pub post: PostDetails,
    pub profile_id: String,
    pub profile_owner_address: Address,
    pub sender_address: Address,
    pub src_chain_id: u64,
    #[serde(with = "bigint", default = "one")]
    pub quantity: U256,
    pub payment_token: Address,
    pub executing_client_profile_id: String,
    #[serde(default)]
    pub mirrorer_profile_id: Option<String>,
    #[serde(default)]
    pub mirror_pub_id: Option<String>,
    #[serde(default)]
    pub source_url: Option<String>,
}

fn one() -> U256 {
    U256::from(1u64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_action_data_params_from_json() {
        let params: ActionDataParams = serde_json::from_value(json!({
            "post": {
                "profileId": "48935",
                "pubId": "10",
                "actionModules": ["0x028f6aeE3CF9e1cA725f4C47d9460801b6c7508A"],
                "actionModulesInitDatas": ["0x"]
            },
            "profileId": "50000",
            "profileOwnerAddress": "0x444483c2d87a6C298f44c223C0638A3eAc7B6ea0",
            "senderAddress": "0x444483c2d87a6C298f44c223C0638A3eAc7B6ea0",
            "srcChainId": 137,
            "paymentToken": "0x0000000000000000000000000000000000000000",
            "executingClientProfileId": "1"
        }))
        .unwrap();

        assert_eq!(params.quantity, U256::from(1u64));
        assert_eq!(params.post.pub_id, "10");
        assert!(params.mirrorer_profile_id.is_none());
    }

    #[test]
    fn test_act_arguments_use_bigint_strings() {
        let args = ActArguments {
            publication_acted_profile_id: U256::from(48935u64),
            publication_acted_id: U256::from(10u64),
            actor_profile_id: U256::from(50000u64),
            referrer_profile_ids: vec![U256::from(1u64)],
            referrer_pub_ids: vec![U256::ZERO],
            action_module_address: Address::ZERO,
            action_module_data: Bytes::from(vec![0x01]),
        };
        let value = serde_json::to_value(&args).unwrap();
        assert_eq!(value["publicationActedProfileId"], "48935n");
        assert_eq!(value["referrerPubIds"], json!(["0n"]));
        assert_eq!(value["actionModuleData"], "0x01");
    }
}
