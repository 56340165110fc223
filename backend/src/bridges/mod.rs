use alloy::primitives::{Address, Bytes, U256};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

use crate::utils::bigint_json::{bigint, parse_bigint_literal};
use crate::utils::abi_args::checksum;
use crate::utils::AbiArg;

pub mod decent;

pub use decent::DecentBridge;

pub const LENS_ACTION_TYPE: &str = "lens-open-action";
pub const PROCESS_PUBLICATION_ACTION: &str = "processPublicationAction";
/// Percent.
pub const DEFAULT_SLIPPAGE: u32 = 3;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ActionCost {
    pub is_native: bool,
    #[serde(with = "bigint")]
    pub amount: U256,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ActionConfig {
    pub function_call: String,
    pub pub_id: String,
    pub profile_id: String,
    #[serde(serialize_with = "checksum::serialize")]
    pub contract_address: Address,
    pub chain_id: u64,
    pub cost: ActionCost,
    pub signature: String,
    pub args: Vec<AbiArg>,
}

/// Cross-chain request handed to the bridging API.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ActionRequest {
    #[serde(serialize_with = "checksum::serialize")]
    pub sender: Address,
    pub src_chain_id: u64,
    #[serde(serialize_with = "checksum::serialize")]
    pub src_token: Address,
    pub dst_chain_id: u64,
    #[serde(serialize_with = "checksum::serialize")]
    pub dst_token: Address,
    pub slippage: u32,
    pub action_type: String,
    pub action_config: ActionConfig,
}

/// Bridging API reply. Kept as JSON; only a few fields are contractual.
#[derive(Debug, Clone, PartialEq)]
pub struct ActionResponse {
    pub raw: Value,
}

impl ActionResponse {
    pub fn new(raw: Value) -> Self {
        Self { raw }
    }

    /// False when the API says `success: false` (either as a bool or the string).
    /// A reply without a `success` field counts as successful; the payload
    /// checks that follow decide whether it is usable.
    pub fn is_success(&self) -> bool {
        !matches!(self.raw.get("success"), Some(Value::Bool(false)))
            && self.raw.get("success").and_then(Value::as_str) != Some("false")
    }

    fn field(&self, name: &str) -> Option<&Value> {
        self.raw
            .get(name)
            .or_else(|| self.raw.get("actionResponse").and_then(|inner| inner.get(name)))
    }

    pub fn lens_action_data(&self) -> Option<Bytes> {
        self.field("arbitraryData")?
            .get("lensActionData")?
            .as_str()?
            .parse()
            .ok()
    }

    pub fn token_payment(&self) -> Option<(Address, U256)> {
        token_amount(self.field("tokenPayment")?)
    }

    pub fn bridge_fee(&self) -> Option<(Address, U256)> {
        token_amount(self.field("bridgeFee")?)
    }

    pub fn error_message(&self) -> Option<String> {
        self.raw.get("error").map(|e| match e {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        })
    }
}

fn token_amount(value: &Value) -> Option<(Address, U256)> {
    let address = value.get("tokenAddress")?.as_str()?.parse().ok()?;
    let amount = match value.get("amount")? {
        Value::String(s) => parse_bigint_literal(s).or_else(|| s.parse().ok())?,
        Value::Number(n) => U256::from(n.as_u64()?),
        _ => return None,
    };
    Some((address, amount))
}

#[derive(Debug, Clone)]
pub enum BridgeError {
    NetworkError(String),
    ApiError { status: u16, body: String },
    ParseError(String),
    InvalidParameters(String),
}

impl fmt::Display for BridgeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BridgeError::NetworkError(msg) => write!(f, "Network error: {}", msg),
            BridgeError::ApiError { status, body } => write!(f, "Bridging API HTTP {}: {}", status, body),
            BridgeError::ParseError(msg) => write!(f, "Parse error: {}", msg),
            BridgeError::InvalidParameters(msg) => write!(f, "Invalid parameters: {}", msg),
        }
    }
}

impl std::error::Error for BridgeError {}

#[async_trait]
pub trait ActionBridge: Send + Sync {
    fn name(&self) -> &str;

    /// Turns an action request into chain-specific transaction data.
    async fn get_action(&self, request: &ActionRequest) -> Result<ActionResponse, BridgeError>;
}
