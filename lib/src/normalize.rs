//! Numeric normalization of backend output.
//!
//! snarkjs hands back proofs and public signals as JSON whose numeric leaves
//! may be decimal strings, `0x` hex strings or plain JSON integers. The
//! [`Normalizer`] rewrites such a tree into a [`Normalized`] tree of the same
//! shape whose numeric leaves are canonical [`BigUint`] values, so `"10"` and
//! `"0xa"` become indistinguishable.

use std::collections::{BTreeMap, BTreeSet};

use num_bigint::BigUint;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{HarnessError, HarnessResult};

static DECIMAL: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[0-9]+$").expect("static regex"));
static HEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"^0x[0-9a-fA-F]+$").expect("static regex"));

/// Keys whose string values are labels rather than numbers in snarkjs output.
pub const DEFAULT_LABEL_KEYS: [&str; 2] = ["protocol", "curve"];

/// Parse a decimal (`^[0-9]+$`) or `0x`-hex (`^0x[0-9a-fA-F]+$`) string.
///
/// Returns `None` for anything else, including signs, whitespace and a bare `0x`.
pub fn parse_integer(s: &str) -> Option<BigUint> {
    if DECIMAL.is_match(s) {
        BigUint::parse_bytes(s.as_bytes(), 10)
    } else if HEX.is_match(s) {
        BigUint::parse_bytes(s[2..].as_bytes(), 16)
    } else {
        None
    }
}

/// How scalars that are neither integers nor integer strings are treated.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NumericPolicy {
    /// Reject them, except string labels under the normalizer's label keys.
    #[default]
    Strict,
    /// Pass them through untouched.
    Lenient,
}

/// A backend structure with every numeric leaf replaced by a [`BigUint`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Normalized {
    Int(BigUint),
    Seq(Vec<Normalized>),
    Map(BTreeMap<String, Normalized>),
    Null,
    /// Non-numeric label string, e.g. `"protocol": "groth16"`.
    Text(String),
    /// Unrecognised scalar kept as-is under [`NumericPolicy::Lenient`].
    Opaque(Value),
}

impl Normalized {
    pub fn as_int(&self) -> Option<&BigUint> {
        match self {
            Self::Int(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_seq(&self) -> Option<&[Normalized]> {
        match self {
            Self::Seq(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&BTreeMap<String, Normalized>> {
        match self {
            Self::Map(entries) => Some(entries),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Look up a mapping entry.
    pub fn get(&self, key: &str) -> Option<&Normalized> {
        self.as_map().and_then(|m| m.get(key))
    }

    /// Convert back to JSON, rendering integers as decimal strings the way
    /// snarkjs writes them.
    pub fn to_value(&self) -> Value {
        match self {
            Self::Int(v) => Value::String(v.to_str_radix(10)),
            Self::Seq(items) => Value::Array(items.iter().map(Normalized::to_value).collect()),
            Self::Map(entries) => Value::Object(
                entries
                    .iter()
                    .map(|(k, v)| (k.clone(), v.to_value()))
                    .collect(),
            ),
            Self::Null => Value::Null,
            Self::Text(s) => Value::String(s.clone()),
            Self::Opaque(v) => v.clone(),
        }
    }
}

impl From<BigUint> for Normalized {
    fn from(value: BigUint) -> Self {
        Self::Int(value)
    }
}

impl From<u64> for Normalized {
    fn from(value: u64) -> Self {
        Self::Int(BigUint::from(value))
    }
}

/// Pure, stateless converter from raw backend JSON to [`Normalized`].
#[derive(Clone, Debug)]
pub struct Normalizer {
    policy: NumericPolicy,
    label_keys: BTreeSet<String>,
}

impl Default for Normalizer {
    fn default() -> Self {
        Self::new(NumericPolicy::Strict)
    }
}

impl Normalizer {
    pub fn new(policy: NumericPolicy) -> Self {
        Self {
            policy,
            label_keys: DEFAULT_LABEL_KEYS.iter().map(|k| k.to_string()).collect(),
        }
    }

    /// Allow string labels under `key` in strict mode.
    pub fn with_label_key(mut self, key: impl Into<String>) -> Self {
        self.label_keys.insert(key.into());
        self
    }

    pub fn normalize(&self, value: &Value) -> HarnessResult<Normalized> {
        self.walk(value, "", None)
    }

    /// Normalize an already normalized tree. The result equals the input.
    pub fn renormalize(&self, value: &Normalized) -> HarnessResult<Normalized> {
        self.normalize(&value.to_value())
    }

    /// Parse a single token that must denote an integer, whatever the policy.
    pub fn integer(&self, token: &str, path: &str) -> HarnessResult<BigUint> {
        parse_integer(token).ok_or_else(|| HarnessError::malformed(path, format!("{token:?}")))
    }

    fn walk(&self, value: &Value, path: &str, key: Option<&str>) -> HarnessResult<Normalized> {
        match value {
            Value::Null => Ok(Normalized::Null),
            Value::String(s) => {
                if let Some(v) = parse_integer(s) {
                    return Ok(Normalized::Int(v));
                }
                let is_label = key.map_or(false, |k| self.label_keys.contains(k));
                if is_label || self.policy == NumericPolicy::Lenient {
                    Ok(Normalized::Text(s.clone()))
                } else {
                    Err(HarnessError::malformed(display_path(path), format!("{s:?}")))
                }
            }
            // the literal text, so negatives, fractions and exponents stay unparsed
            Value::Number(n) => match parse_integer(&n.to_string()) {
                Some(v) => Ok(Normalized::Int(v)),
                None => self.unrecognised(value, path),
            },
            Value::Bool(_) => self.unrecognised(value, path),
            Value::Array(items) => items
                .iter()
                .enumerate()
                .map(|(i, item)| self.walk(item, &format!("{path}/{i}"), None))
                .collect::<HarnessResult<Vec<_>>>()
                .map(Normalized::Seq),
            Value::Object(entries) => entries
                .iter()
                .map(|(k, v)| Ok((k.clone(), self.walk(v, &format!("{path}/{k}"), Some(k))?)))
                .collect::<HarnessResult<BTreeMap<_, _>>>()
                .map(Normalized::Map),
        }
    }

    fn unrecognised(&self, value: &Value, path: &str) -> HarnessResult<Normalized> {
        match self.policy {
            NumericPolicy::Lenient => Ok(Normalized::Opaque(value.clone())),
            NumericPolicy::Strict => Err(HarnessError::malformed(display_path(path), value)),
        }
    }
}

fn display_path(path: &str) -> &str {
    if path.is_empty() {
        "/"
    } else {
        path
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use serde_json::json;

    const BN254_Q: &str =
        "21888242871839275222246405745257275088696311157297823662689037894645226208583";

    #[test]
    fn test_decimal_and_hex_strings_agree() {
        let n = Normalizer::default();
        let dec = n.normalize(&json!("10")).unwrap();
        let hex = n.normalize(&json!("0xa")).unwrap();
        let upper = n.normalize(&json!("0xA")).unwrap();
        assert_eq!(dec, Normalized::from(10u64));
        assert_eq!(dec, hex);
        assert_eq!(hex, upper);
    }

    #[test]
    fn test_large_field_element() {
        let n = Normalizer::default();
        let v = n.normalize(&json!(BN254_Q)).unwrap();
        assert_eq!(v.as_int().unwrap().to_str_radix(10), BN254_Q);
        assert!(v.as_int().unwrap().bits() > 250);
    }

    #[test]
    fn test_json_integers_become_big_integers() {
        let n = Normalizer::default();
        assert_eq!(n.normalize(&json!(7)).unwrap(), Normalized::from(7u64));
    }

    #[test]
    fn test_bare_integers_wider_than_u64() {
        let n = Normalizer::default();
        let past_u64: Value = serde_json::from_str("18446744073709551616").unwrap();
        assert_eq!(
            n.normalize(&past_u64).unwrap(),
            Normalized::Int(BigUint::from(u64::MAX) + 1u8)
        );

        let raw: Value = serde_json::from_str(&format!(r#"{{"pi_a": [{BN254_Q}, "1"]}}"#)).unwrap();
        let out = n.normalize(&raw).unwrap();
        let x = out.get("pi_a").unwrap().as_seq().unwrap()[0].as_int().unwrap();
        assert_eq!(x.to_str_radix(10), BN254_Q);
        assert_eq!(out, n.normalize(&json!({ "pi_a": [BN254_Q, "1"] })).unwrap());
    }

    #[test]
    fn test_bare_non_integers_rejected() {
        let n = Normalizer::default();
        for text in ["-18446744073709551616", "1e3", "2.0"] {
            let raw: Value = serde_json::from_str(text).unwrap();
            assert_eq!(
                n.normalize(&raw).unwrap_err().kind(),
                ErrorKind::MalformedNumericEncoding,
                "{text}"
            );
        }
    }

    #[test]
    fn test_rejects_near_miss_encodings() {
        for bad in ["", "0x", "-1", " 1", "1 ", "0xg1", "1e3", "0X1f", "+5"] {
            assert_eq!(parse_integer(bad), None, "{bad:?} should not parse");
        }
    }

    #[test]
    fn test_nested_shape_is_preserved() {
        let n = Normalizer::default();
        let raw = json!({
            "pi_a": ["1", "0x2", "1"],
            "pi_b": [["3", "4"], ["5", "6"], ["1", "0"]],
            "protocol": "groth16",
            "curve": "bn128"
        });
        let out = n.normalize(&raw).unwrap();
        let map = out.as_map().unwrap();
        assert_eq!(map.len(), 4);
        assert_eq!(out.get("pi_a").unwrap().as_seq().unwrap().len(), 3);
        assert_eq!(
            out.get("pi_a").unwrap().as_seq().unwrap()[1],
            Normalized::from(2u64)
        );
        let pi_b = out.get("pi_b").unwrap().as_seq().unwrap();
        assert_eq!(pi_b[2].as_seq().unwrap()[0], Normalized::from(1u64));
        assert_eq!(out.get("protocol").unwrap().as_text(), Some("groth16"));
    }

    #[test]
    fn test_null_passes_through() {
        let n = Normalizer::default();
        let out = n.normalize(&json!({ "x": null, "y": ["1", null] })).unwrap();
        assert_eq!(out.get("x"), Some(&Normalized::Null));
        assert_eq!(out.get("y").unwrap().as_seq().unwrap()[1], Normalized::Null);
    }

    #[test]
    fn test_strict_mode_reports_path() {
        let n = Normalizer::default();
        let err = n
            .normalize(&json!({ "pi_a": ["1", "not-a-number"] }))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MalformedNumericEncoding);
        match err {
            HarnessError::MalformedNumericEncoding { path, .. } => assert_eq!(path, "/pi_a/1"),
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn test_strict_mode_rejects_bools_and_negatives() {
        let n = Normalizer::default();
        assert!(n.normalize(&json!(true)).is_err());
        assert!(n.normalize(&json!(-3)).is_err());
        assert!(n.normalize(&json!(1.5)).is_err());
    }

    #[test]
    fn test_lenient_mode_passes_unrecognised_scalars() {
        let n = Normalizer::new(NumericPolicy::Lenient);
        let out = n.normalize(&json!(["abc", true, -3, "0x10"])).unwrap();
        let items = out.as_seq().unwrap();
        assert_eq!(items[0], Normalized::Text("abc".into()));
        assert_eq!(items[1], Normalized::Opaque(json!(true)));
        assert_eq!(items[2], Normalized::Opaque(json!(-3)));
        assert_eq!(items[3], Normalized::from(16u64));
    }

    #[test]
    fn test_extra_label_keys() {
        let n = Normalizer::default().with_label_key("note");
        let out = n.normalize(&json!({ "note": "hello" })).unwrap();
        assert_eq!(out.get("note").unwrap().as_text(), Some("hello"));
    }

    #[test]
    fn test_renormalize_is_fixed_point() {
        let n = Normalizer::default();
        let once = n
            .normalize(&json!({ "a": ["0xff", "12"], "protocol": "plonk", "z": null }))
            .unwrap();
        assert_eq!(n.renormalize(&once).unwrap(), once);
    }

    #[test]
    fn test_to_value_uses_decimal_strings() {
        let v = Normalized::Seq(vec![Normalized::from(255u64), Normalized::Null]);
        assert_eq!(v.to_value(), json!(["255", null]));
    }
}
