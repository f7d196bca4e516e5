//! Scheme-specific calldata for verifier entry points.
//!
//! A Groth16 verifier takes `verifyProof(uint256[2] a, uint256[2][2] b, uint256[2] c, uint256[n] input)`,
//! a PLONK verifier takes `verifyProof(bytes proof, uint256[] input)`. The
//! [`CalldataFormatter`] turns the flat textual export of a proving backend
//! into one of those layouts.

use std::fmt;
use std::str::FromStr;

use num_bigint::BigUint;
use num_traits::Zero;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::backend::CalldataExport;
use crate::error::{HarnessError, HarnessResult};
use crate::normalize::{Normalized, Normalizer};
use crate::types::{G1Point, G2Point};

static QUOTES_AND_SPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r#"["\s]"#).expect("static regex"));
static BRACKETS: Lazy<Regex> = Lazy::new(|| Regex::new(r"[\[\]]").expect("static regex"));
static EMPTY_GROUP: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\[+\]+$").expect("static regex"));

/// Proof blob handed to PLONK verifiers by the invalid-proof scenarios.
pub const INVALID_PLONK_PROOF: &str =
    "0x17ce68a47fa9815a091428e2a437ebc2afb8dadeb14b171899f62480a9478c1d1e0c942065faab3a62";

/// [`INVALID_PLONK_PROOF`] as raw bytes.
const INVALID_PLONK_BLOB: [u8; 41] = [
    0x17, 0xce, 0x68, 0xa4, 0x7f, 0xa9, 0x81, 0x5a, 0x09, 0x14, 0x28, 0xe2, 0xa4, 0x37, 0xeb, 0xc2,
    0xaf, 0xb8, 0xda, 0xde, 0xb1, 0x4b, 0x17, 0x18, 0x99, 0xf6, 0x24, 0x80, 0xa9, 0x47, 0x8c, 0x1d,
    0x1e, 0x0c, 0x94, 0x20, 0x65, 0xfa, 0xab, 0x3a, 0x62,
];

/// Proof system, which fixes the verifier's argument layout.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scheme {
    /// Pairing-based scheme: `a`, `b`, `c` tuple plus public inputs.
    Groth16,
    /// Polynomial-commitment scheme: one opaque proof blob plus public inputs.
    Plonk,
}

impl Scheme {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Groth16 => "groth16",
            Self::Plonk => "plonk",
        }
    }

    /// Number of tokens that precede the public inputs.
    pub fn prefix_tokens(&self) -> usize {
        match self {
            Self::Groth16 => 8,
            Self::Plonk => 1,
        }
    }

    /// Fewest tokens a textual export may hold.
    pub fn min_tokens(&self) -> usize {
        match self {
            Self::Groth16 => 8,
            Self::Plonk => 2,
        }
    }
}

impl fmt::Display for Scheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Scheme {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "groth16" => Ok(Self::Groth16),
            "plonk" => Ok(Self::Plonk),
            other => Err(format!("unknown proof scheme `{other}` (expected groth16 or plonk)")),
        }
    }
}

/// Shape of one verifier argument.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Slot {
    Vector(usize),
    Matrix(usize, usize),
    Bytes(usize),
}

/// Opaque PLONK proof argument.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProofBlob(Vec<u8>);

impl ProofBlob {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    /// A `0x` token keeps its exact bytes (an odd digit count gets a leading zero nibble),
    /// a decimal token becomes the minimal big-endian encoding of its value
    /// (`"0"` is the single byte `0x00`, same as `"0x00"`).
    pub fn from_token(token: &str, normalizer: &Normalizer, path: &str) -> HarnessResult<Self> {
        let value = normalizer.integer(token, path)?;
        match token.strip_prefix("0x") {
            Some(digits) => {
                let padded = if digits.len() % 2 == 1 {
                    format!("0{digits}")
                } else {
                    digits.to_string()
                };
                hex::decode(&padded)
                    .map(Self)
                    .map_err(|e| HarnessError::malformed(path, e))
            }
            None => Ok(Self(value.to_bytes_be())),
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(&self.0))
    }
}

/// Ordered verifier arguments.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Calldata {
    Groth16 {
        a: [BigUint; 2],
        b: [[BigUint; 2]; 2],
        c: [BigUint; 2],
        inputs: Vec<BigUint>,
    },
    Plonk {
        proof: ProofBlob,
        inputs: Vec<BigUint>,
    },
}

impl Calldata {
    /// Partition already tokenized calldata according to `scheme`.
    pub fn from_tokens<S: AsRef<str>>(
        scheme: Scheme,
        tokens: &[S],
        normalizer: &Normalizer,
    ) -> HarnessResult<Self> {
        let min = scheme.min_tokens();
        if tokens.len() < min {
            return Err(HarnessError::ArityMismatch {
                scheme,
                expected: min,
                actual: tokens.len(),
            });
        }
        let prefix = scheme.prefix_tokens();
        let inputs = tokens[prefix..]
            .iter()
            .enumerate()
            .map(|(i, t)| normalizer.integer(t.as_ref(), &format!("calldata[{}]", prefix + i)))
            .collect::<HarnessResult<Vec<_>>>()?;

        match scheme {
            Scheme::Groth16 => {
                let words = tokens[..prefix]
                    .iter()
                    .enumerate()
                    .map(|(i, t)| normalizer.integer(t.as_ref(), &format!("calldata[{i}]")))
                    .collect::<HarnessResult<Vec<_>>>()?;
                let [a0, a1, b00, b01, b10, b11, c0, c1]: [BigUint; 8] =
                    words.try_into().map_err(|w: Vec<BigUint>| HarnessError::ArityMismatch {
                        scheme,
                        expected: prefix,
                        actual: w.len(),
                    })?;
                Ok(Self::Groth16 {
                    a: [a0, a1],
                    b: [[b00, b01], [b10, b11]],
                    c: [c0, c1],
                    inputs,
                })
            }
            Scheme::Plonk => Ok(Self::Plonk {
                proof: ProofBlob::from_token(tokens[0].as_ref(), normalizer, "calldata[0]")?,
                inputs,
            }),
        }
    }

    /// Structurally valid arguments that no genuine verifier accepts.
    pub fn invalid(scheme: Scheme, public_inputs: usize) -> Self {
        let zeros = vec![BigUint::zero(); public_inputs];
        match scheme {
            Scheme::Groth16 => Self::Groth16 {
                a: G1Point::zero().words(),
                b: G2Point::zero().to_evm_words(),
                c: G1Point::zero().words(),
                inputs: zeros,
            },
            Scheme::Plonk => Self::Plonk {
                proof: ProofBlob(INVALID_PLONK_BLOB.to_vec()),
                inputs: zeros,
            },
        }
    }

    pub fn scheme(&self) -> Scheme {
        match self {
            Self::Groth16 { .. } => Scheme::Groth16,
            Self::Plonk { .. } => Scheme::Plonk,
        }
    }

    pub fn public_inputs(&self) -> &[BigUint] {
        match self {
            Self::Groth16 { inputs, .. } | Self::Plonk { inputs, .. } => inputs,
        }
    }

    /// Argument slots in call order.
    pub fn slots(&self) -> Vec<Slot> {
        match self {
            Self::Groth16 { inputs, .. } => vec![
                Slot::Vector(2),
                Slot::Matrix(2, 2),
                Slot::Vector(2),
                Slot::Vector(inputs.len()),
            ],
            Self::Plonk { proof, inputs } => {
                vec![Slot::Bytes(proof.len()), Slot::Vector(inputs.len())]
            }
        }
    }

    /// Solidity signature of the verifier entry point these arguments fit.
    pub fn solidity_signature(&self) -> String {
        match self {
            Self::Groth16 { inputs, .. } => format!(
                "verifyProof(uint256[2],uint256[2][2],uint256[2],uint256[{}])",
                inputs.len()
            ),
            Self::Plonk { .. } => "verifyProof(bytes,uint256[])".to_string(),
        }
    }

    /// Argument literals in the syntax EVM command-line tools accept.
    pub fn solidity_args(&self) -> Vec<String> {
        match self {
            Self::Groth16 { a, b, c, inputs } => vec![
                list(a),
                format!("[{},{}]", list(&b[0]), list(&b[1])),
                list(c),
                list(inputs),
            ],
            Self::Plonk { proof, inputs } => vec![proof.to_hex(), list(inputs)],
        }
    }
}

fn list(values: &[BigUint]) -> String {
    let items: Vec<String> = values.iter().map(|v| v.to_str_radix(10)).collect();
    format!("[{}]", items.join(","))
}

/// Strip quotes, brackets and whitespace, then split on commas.
///
/// An empty group such as the `[]` of a circuit without public inputs
/// contributes no token. Any other empty token is kept and later fails to parse.
pub fn tokenize(text: &str) -> Vec<String> {
    let compact = QUOTES_AND_SPACE.replace_all(text, "");
    if compact.is_empty() {
        return Vec::new();
    }
    compact
        .split(',')
        .filter(|piece| !EMPTY_GROUP.is_match(piece))
        .map(|piece| BRACKETS.replace_all(piece, "").into_owned())
        .collect()
}

/// Builds [`Calldata`] from a backend's textual calldata export.
#[derive(Clone, Debug, Default)]
pub struct CalldataFormatter {
    normalizer: Normalizer,
}

impl CalldataFormatter {
    pub fn new(normalizer: Normalizer) -> Self {
        Self { normalizer }
    }

    /// Export `(proof, public_signals)` through `exporter` and partition the result.
    pub async fn format<X>(
        &self,
        exporter: &X,
        scheme: Scheme,
        proof: &Normalized,
        public_signals: &Normalized,
    ) -> HarnessResult<Calldata>
    where
        X: CalldataExport + ?Sized,
    {
        let text = exporter
            .export_calldata(scheme, proof, public_signals)
            .await?;
        debug!(%scheme, bytes = text.len(), "received calldata export");
        self.parse(scheme, &text)
    }

    /// Pure half of [`CalldataFormatter::format`].
    pub fn parse(&self, scheme: Scheme, text: &str) -> HarnessResult<Calldata> {
        let tokens = tokenize(text);
        Calldata::from_tokens(scheme, &tokens, &self.normalizer)
    }
}
