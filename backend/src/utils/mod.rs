// Shared codecs and helpers used by every platform adapter
pub mod abi_args;
pub mod bigint_json;
pub mod metadata;
pub mod units;

pub use abi_args::{encode_function_call, AbiArg};
pub use metadata::{MetadataFetcher, TokenMetadata};
pub use units::{format_amount_safe, parse_amount_safe, parse_u256};
