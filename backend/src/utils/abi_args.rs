use alloy::primitives::{keccak256, Address, Bytes, B256, U256};
use alloy_dyn_abi::{DynSolType, DynSolValue};
use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Serialize, Serializer};

use super::bigint_json::to_bigint_literal;
use crate::platforms::PlatformError;

/// One positional argument of a mint or purchase call.
///
/// Serializes to the bridging API's JSON dialect: addresses and bytes as hex
/// strings, integers as `"<digits>n"`, tuples as objects keyed by field name.
#[derive(Debug, Clone, PartialEq)]
pub enum AbiArg {
    Address(Address),
    Uint(U256),
    Bool(bool),
    Bytes(Bytes),
    /// `bytesN`, stored unpadded.
    FixedBytes(Vec<u8>),
    String(String),
    Array(Vec<AbiArg>),
    Tuple(Vec<(String, AbiArg)>),
    /// Externally supplied payload passed through verbatim.
    Json(serde_json::Value),
}

impl AbiArg {
    /// Converts against the declared parameter type, so `uint96` or `bytes4`
    /// parameters get their declared width.
    pub fn to_typed_value(&self, ty: &DynSolType) -> Result<DynSolValue, PlatformError> {
        let mismatch = || PlatformError::AbiEncoding(format!("argument {:?} does not fit {:?}", self, ty));
        Ok(match (ty, self) {
            (DynSolType::Address, AbiArg::Address(address)) => DynSolValue::Address(*address),
            (DynSolType::Uint(bits), AbiArg::Uint(value)) => {
                if value.bit_len() > *bits {
                    return Err(mismatch());
                }
                DynSolValue::Uint(*value, *bits)
            }
            (DynSolType::Bool, AbiArg::Bool(value)) => DynSolValue::Bool(*value),
            (DynSolType::Bytes, AbiArg::Bytes(bytes)) => DynSolValue::Bytes(bytes.to_vec()),
            (DynSolType::FixedBytes(size), AbiArg::FixedBytes(bytes)) => {
                if bytes.len() != *size {
                    return Err(mismatch());
                }
                DynSolValue::FixedBytes(B256::right_padding_from(bytes), *size)
            }
            (DynSolType::String, AbiArg::String(value)) => DynSolValue::String(value.clone()),
            (DynSolType::Array(inner), AbiArg::Array(items)) => DynSolValue::Array(
                items.iter().map(|item| item.to_typed_value(inner)).collect::<Result<_, _>>()?,
            ),
            (DynSolType::FixedArray(inner, len), AbiArg::Array(items)) if items.len() == *len => {
                DynSolValue::FixedArray(
                    items.iter().map(|item| item.to_typed_value(inner)).collect::<Result<_, _>>()?,
                )
            }
            (DynSolType::Tuple(types), AbiArg::Tuple(fields)) if types.len() == fields.len() => {
                DynSolValue::Tuple(
                    types
                        .iter()
                        .zip(fields)
                        .map(|(ty, (_, value))| value.to_typed_value(ty))
                        .collect::<Result<_, _>>()?,
                )
            }
            _ => return Err(mismatch()),
        })
    }
}

/// Serializes addresses in EIP-55 checksum form, as the bridging API expects.
pub mod checksum {
    use alloy::primitives::Address;
    use serde::Serializer;

    pub fn serialize<S: Serializer>(address: &Address, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&address.to_checksum(None))
    }
}

impl Serialize for AbiArg {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            AbiArg::Address(address) => checksum::serialize(address, serializer),
            AbiArg::Uint(value) => serializer.serialize_str(&to_bigint_literal(value)),
            AbiArg::Bool(value) => serializer.serialize_bool(*value),
            AbiArg::Bytes(bytes) => serializer.serialize_str(&format!("0x{}", hex::encode(bytes))),
            AbiArg::FixedBytes(bytes) => {
                serializer.serialize_str(&format!("0x{}", hex::encode(bytes)))
            }
            AbiArg::String(value) => serializer.serialize_str(value),
            AbiArg::Array(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            AbiArg::Tuple(fields) => {
                let mut map = serializer.serialize_map(Some(fields.len()))?;
                for (name, value) in fields {
                    map.serialize_entry(name, value)?;
                }
                map.end()
            }
            AbiArg::Json(value) => value.serialize(serializer),
        }
    }
}

/// Canonical `name(type,...)` form of a human readable signature such as
/// `function mint(address minter, uint256 tokenId)`, plus its parameter types.
///
/// Anonymous tuple parameters are accepted, e.g. `buy((address a, uint b) order)`.
pub fn parse_signature(signature: &str) -> Result<(String, Vec<DynSolType>), PlatformError> {
    let invalid = |reason: &str| PlatformError::AbiEncoding(format!("{}: {}", signature, reason));
    let text = signature.trim();
    let text = text.strip_prefix("function").unwrap_or(text).trim_start();
    let open = text.find('(').ok_or_else(|| invalid("missing parameter list"))?;
    let name = text[..open].trim();
    if name.is_empty() {
        return Err(invalid("missing function name"));
    }
    let close = closing_paren(text, open).ok_or_else(|| invalid("unbalanced parentheses"))?;
    let params = canonical_params(&text[open + 1..close]).ok_or_else(|| invalid("malformed parameter"))?;

    let types = params
        .iter()
        .map(|param| DynSolType::parse(param).map_err(|e| invalid(&e.to_string())))
        .collect::<Result<Vec<_>, _>>()?;
    Ok((format!("{}({})", name, params.join(",")), types))
}

fn closing_paren(text: &str, open: usize) -> Option<usize> {
    let mut depth = 0usize;
    for (i, c) in text.char_indices().skip_while(|(i, _)| *i < open) {
        match c {
            '(' => depth += 1,
            ')' => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
    }
    None
}

/// Parameter types with names and data locations stripped.
fn canonical_params(list: &str) -> Option<Vec<String>> {
    let mut params = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    for (i, c) in list.char_indices() {
        match c {
            '(' => depth += 1,
            ')' => depth = depth.checked_sub(1)?,
            ',' if depth == 0 => {
                params.push(canonical_type(&list[start..i])?);
                start = i + 1;
            }
            _ => {}
        }
    }
    if !list[start..].trim().is_empty() || !params.is_empty() {
        params.push(canonical_type(&list[start..])?);
    }
    Some(params)
}

fn canonical_type(param: &str) -> Option<String> {
    let param = param.trim();
    let param = param.strip_prefix("tuple").filter(|rest| rest.starts_with('(')).unwrap_or(param);
    if param.starts_with('(') {
        let close = closing_paren(param, 0)?;
        let inner = canonical_params(&param[1..close])?;
        let suffix: String = param[close + 1..]
            .chars()
            .take_while(|c| *c == '[' || *c == ']' || c.is_ascii_digit())
            .collect();
        return Some(format!("({}){}", inner.join(","), suffix));
    }

    let token = param.split_whitespace().next()?;
    let (base, suffix) = token.split_at(token.find('[').unwrap_or(token.len()));
    let base = match base {
        "uint" => "uint256",
        "int" => "int256",
        other => other,
    };
    Some(format!("{}{}", base, suffix))
}

/// ABI-encodes `args` against a human readable signature, selector included.
pub fn encode_function_call(signature: &str, args: &[AbiArg]) -> Result<Bytes, PlatformError> {
    let (canonical, types) = parse_signature(signature)?;
    if types.len() != args.len() {
        return Err(PlatformError::AbiEncoding(format!(
            "{} takes {} arguments, got {}",
            canonical,
            types.len(),
            args.len()
        )));
    }
    let values = types
        .iter()
        .zip(args)
        .map(|(ty, arg)| arg.to_typed_value(ty))
        .collect::<Result<Vec<_>, _>>()?;

    let mut encoded = keccak256(canonical.as_bytes())[..4].to_vec();
    encoded.extend(DynSolValue::Tuple(values).abi_encode_params());
    Ok(Bytes::from(encoded))
}
