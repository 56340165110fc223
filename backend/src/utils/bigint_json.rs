//! JSON helpers that carry 256-bit integers as `"<digits>n"` strings.
//!
//! The bridging API and its clients exchange big integers this way so that
//! values never pass through a floating point representation.

use alloy::primitives::U256;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::str::FromStr;

static BIGINT_LITERAL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^-?\d+n$").expect("static bigint pattern compiles"));

pub fn is_bigint_literal(value: &str) -> bool {
    BIGINT_LITERAL.is_match(value)
}

pub fn to_bigint_literal(value: &U256) -> String {
    format!("{}n", value)
}

/// Parses a `"<digits>n"` literal. Negative literals do not fit an unsigned
/// 256-bit value and yield `None`.
pub fn parse_bigint_literal(value: &str) -> Option<U256> {
    if !is_bigint_literal(value) || value.starts_with('-') {
        return None;
    }
    U256::from_str(value.trim_end_matches('n')).ok()
}

pub fn stringify<T: Serialize + ?Sized>(value: &T) -> Result<String, serde_json::Error> {
    serde_json::to_string(value)
}

pub fn parse<T: DeserializeOwned>(text: &str) -> Result<T, serde_json::Error> {
    serde_json::from_str(text)
}

fn parse_lenient(raw: &str) -> Option<U256> {
    parse_bigint_literal(raw).or_else(|| U256::from_str(raw).ok())
}

/// `#[serde(with = "bigint")]` for a single `U256`.
///
/// Deserialization accepts bigint literals, plain decimal or `0x` strings and
/// JSON integers.
pub mod bigint {
    use super::*;
    use serde::de::Error;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &U256, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&to_bigint_literal(value))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<U256, D::Error> {
        match serde_json::Value::deserialize(deserializer)? {
            serde_json::Value::String(raw) => parse_lenient(&raw)
                .ok_or_else(|| D::Error::custom(format!("invalid big integer: {}", raw))),
            serde_json::Value::Number(number) => number
                .as_u64()
                .map(U256::from)
                .ok_or_else(|| D::Error::custom(format!("invalid big integer: {}", number))),
            other => Err(D::Error::custom(format!("expected big integer, got {}", other))),
        }
    }
}

/// `#[serde(with = "bigint_vec")]` for `Vec<U256>`.
pub mod bigint_vec {
    use super::*;
    use serde::de::Error;
    use serde::ser::SerializeSeq;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(values: &[U256], serializer: S) -> Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(values.len()))?;
        for value in values {
            seq.serialize_element(&to_bigint_literal(value))?;
        }
        seq.end()
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<U256>, D::Error> {
        let raw: Vec<serde_json::Value> = Vec::deserialize(deserializer)?;
        raw.into_iter()
            .map(|value| match value {
                serde_json::Value::String(s) => parse_lenient(&s)
                    .ok_or_else(|| D::Error::custom(format!("invalid big integer: {}", s))),
                serde_json::Value::Number(n) => n
                    .as_u64()
                    .map(U256::from)
                    .ok_or_else(|| D::Error::custom(format!("invalid big integer: {}", n))),
                other => Err(D::Error::custom(format!("expected big integer, got {}", other))),
            })
            .collect()
    }
}
