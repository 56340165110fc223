use alloy::primitives::{Address, Bytes, U256};
use alloy::sol;
use alloy::sol_types::SolType;
use thiserror::Error;

sol! {
    /// Record stored in a post's action-module init data.
    struct InitializedAction {
        address targetContract;
        uint256 tokenId;
        address paymentToken;
        uint256 chainId;
        uint256 cost;
        uint256 publishingClientProfileId;
        bytes signature;
        bytes platformName;
    }
}

#[derive(Error, Debug)]
pub enum CalldataError {
    #[error("Init data is not a valid action record: {0}")]
    Abi(String),
    #[error("Init data {field} is not UTF-8")]
    Utf8 { field: &'static str },
}

/// Typed view of [`InitializedAction`]. `signature` and `platform_name` travel
/// as raw UTF-8 bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MintRecord {
    pub target_contract: Address,
    pub token_id: U256,
    pub payment_token: Address,
    pub chain_id: U256,
    /// Always zero when written; the live price is resolved when acting.
    pub cost: U256,
    pub publishing_client_profile_id: U256,
    pub signature: String,
    pub platform_name: String,
}

impl MintRecord {
    pub fn encode(&self) -> Bytes {
        let action = InitializedAction {
            targetContract: self.target_contract,
            tokenId: self.token_id,
            paymentToken: self.payment_token,
            chainId: self.chain_id,
            cost: self.cost,
            publishingClientProfileId: self.publishing_client_profile_id,
            signature: Bytes::copy_from_slice(self.signature.as_bytes()),
            platformName: Bytes::copy_from_slice(self.platform_name.as_bytes()),
        };
        <InitializedAction as SolType>::abi_encode(&action).into()
    }

    pub fn decode(data: &[u8]) -> Result<Self, CalldataError> {
        let action = <InitializedAction as SolType>::abi_decode(data, true)
            .map_err(|e| CalldataError::Abi(e.to_string()))?;
        let text = |bytes: &Bytes, field: &'static str| {
            String::from_utf8(bytes.to_vec()).map_err(|_| CalldataError::Utf8 { field })
        };

        Ok(Self {
            target_contract: action.targetContract,
            token_id: action.tokenId,
            payment_token: action.paymentToken,
            chain_id: action.chainId,
            cost: action.cost,
            publishing_client_profile_id: action.publishingClientProfileId,
            signature: text(&action.signature, "signature")?,
            platform_name: text(&action.platformName, "platformName")?,
        })
    }

    /// Decodes a `0x`-prefixed hex string as found in post records.
    pub fn decode_hex(data: &str) -> Result<Self, CalldataError> {
        let bytes = hex::decode(data.trim().trim_start_matches("0x"))
            .map_err(|e| CalldataError::Abi(format!("invalid hex: {}", e)))?;
        Self::decode(&bytes)
    }
}
