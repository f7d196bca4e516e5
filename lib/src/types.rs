//! Curve point and key types shared by the export encoder and the local verifier.
//!
//! These mirror the snarkjs/circom JSON shapes: G1 points as `["x", "y", "1"]`,
//! G2 points as `[["x0", "x1"], ["y0", "y1"], ["1", "0"]]`.

use num_bigint::BigUint;
use num_traits::Zero;
use serde::{Deserialize, Serialize};
use uint::construct_uint;

use crate::error::{HarnessError, HarnessResult};
use crate::normalize::{parse_integer, Normalized};

construct_uint! {
    /// 256-bit unsigned integer, one EVM calldata word
    pub struct U256(4);
}

impl U256 {
    /// Convert to big-endian 32-byte array
    pub fn to_be_bytes(&self) -> [u8; 32] {
        let mut bytes = [0u8; 32];
        self.to_big_endian(&mut bytes);
        bytes
    }

    /// Create from big-endian bytes
    pub fn from_be_bytes(bytes: &[u8]) -> Self {
        U256::from_big_endian(bytes)
    }

    /// Narrow an arbitrary-precision integer, `None` if it needs more than 256 bits.
    pub fn from_biguint(value: &BigUint) -> Option<Self> {
        if value.bits() > 256 {
            return None;
        }
        Some(Self::from_be_bytes(&value.to_bytes_be()))
    }
}

/// G1 point on BN254 (affine coordinates)
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct G1Point {
    pub x: BigUint,
    pub y: BigUint,
}

impl G1Point {
    /// Point at infinity, encoded as `(0, 0)` on the EVM
    pub fn zero() -> Self {
        Self {
            x: BigUint::zero(),
            y: BigUint::zero(),
        }
    }

    pub fn is_zero(&self) -> bool {
        self.x.is_zero() && self.y.is_zero()
    }

    /// Create from snarkjs JSON array format ["x", "y", "1"].
    /// The third element is always "1" for affine coordinates.
    pub fn from_json_array(arr: &[String]) -> Result<Self, &'static str> {
        if arr.len() < 2 {
            return Err("G1 point requires at least 2 coordinates");
        }
        Ok(Self {
            x: parse_integer(&arr[0]).ok_or("Invalid integer string for x")?,
            y: parse_integer(&arr[1]).ok_or("Invalid integer string for y")?,
        })
    }

    /// Read a point out of a normalized snarkjs proof field.
    pub fn from_normalized(node: &Normalized, path: &str) -> HarnessResult<Self> {
        Ok(Self {
            x: int_at(node, path, &[0])?,
            y: int_at(node, path, &[1])?,
        })
    }

    pub fn words(&self) -> [BigUint; 2] {
        [self.x.clone(), self.y.clone()]
    }
}

/// G2 point on BN254 (affine coordinates over Fq2)
/// Each coordinate is an element of Fq2 = Fq[u]/(u² + 1)
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct G2Point {
    /// x coordinate: x[0] + x[1] * u
    pub x: [BigUint; 2],
    /// y coordinate: y[0] + y[1] * u
    pub y: [BigUint; 2],
}

impl G2Point {
    pub fn zero() -> Self {
        Self {
            x: [BigUint::zero(), BigUint::zero()],
            y: [BigUint::zero(), BigUint::zero()],
        }
    }

    pub fn is_zero(&self) -> bool {
        self.x.iter().chain(self.y.iter()).all(Zero::is_zero)
    }

    /// Create from snarkjs JSON array format [["x0", "x1"], ["y0", "y1"], ["1", "0"]]
    pub fn from_json_array(arr: &[Vec<String>]) -> Result<Self, &'static str> {
        if arr.len() < 2 {
            return Err("G2 point requires at least 2 coordinate pairs");
        }
        if arr[0].len() < 2 || arr[1].len() < 2 {
            return Err("Each G2 coordinate requires 2 elements");
        }
        let parse = |s: &String| parse_integer(s).ok_or("Invalid integer string in G2 coordinate");
        Ok(Self {
            x: [parse(&arr[0][0])?, parse(&arr[0][1])?],
            y: [parse(&arr[1][0])?, parse(&arr[1][1])?],
        })
    }

    pub fn from_normalized(node: &Normalized, path: &str) -> HarnessResult<Self> {
        Ok(Self {
            x: [int_at(node, path, &[0, 0])?, int_at(node, path, &[0, 1])?],
            y: [int_at(node, path, &[1, 0])?, int_at(node, path, &[1, 1])?],
        })
    }

    /// Words in EVM precompile order: [[x1, x0], [y1, y0]].
    /// snarkjs JSON stores the low part first, the pairing precompile wants the high part first.
    pub fn to_evm_words(&self) -> [[BigUint; 2]; 2] {
        [
            [self.x[1].clone(), self.x[0].clone()],
            [self.y[1].clone(), self.y[0].clone()],
        ]
    }

    /// Inverse of [`G2Point::to_evm_words`].
    pub fn from_evm_words(words: &[[BigUint; 2]; 2]) -> Self {
        Self {
            x: [words[0][1].clone(), words[0][0].clone()],
            y: [words[1][1].clone(), words[1][0].clone()],
        }
    }
}

/// Verification key for Groth16
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VerificationKey {
    /// α point in G1 (alpha)
    pub alpha: G1Point,
    /// β point in G2 (beta)
    pub beta: G2Point,
    /// γ point in G2 (gamma)
    pub gamma: G2Point,
    /// δ point in G2 (delta)
    pub delta: G2Point,
    /// IC[0] is the base, IC[1..n+1] are multiplied by public inputs
    pub ic: Vec<G1Point>,
}

impl VerificationKey {
    /// Number of public inputs this verification key expects
    pub fn num_inputs(&self) -> usize {
        self.ic.len().saturating_sub(1)
    }
}

/// JSON format for snarkjs verification_key.json
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct VerificationKeyJson {
    pub protocol: Option<String>,
    pub curve: Option<String>,
    #[serde(rename = "nPublic")]
    pub n_public: Option<u32>,
    pub vk_alpha_1: Vec<String>,
    pub vk_beta_2: Vec<Vec<String>>,
    pub vk_gamma_2: Vec<Vec<String>>,
    pub vk_delta_2: Vec<Vec<String>>,
    #[serde(rename = "IC")]
    pub ic: Vec<Vec<String>>,
}

impl VerificationKeyJson {
    /// Convert to VerificationKey struct
    pub fn to_vk(&self) -> Result<VerificationKey, &'static str> {
        if let Some(protocol) = self.protocol.as_deref() {
            if protocol != "groth16" {
                return Err("verification key is not for groth16");
            }
        }
        let ic = self
            .ic
            .iter()
            .map(|p| G1Point::from_json_array(p))
            .collect::<Result<Vec<_>, _>>()?;
        if ic.is_empty() {
            return Err("verification key has no IC points");
        }
        let vk = VerificationKey {
            alpha: G1Point::from_json_array(&self.vk_alpha_1)?,
            beta: G2Point::from_json_array(&self.vk_beta_2)?,
            gamma: G2Point::from_json_array(&self.vk_gamma_2)?,
            delta: G2Point::from_json_array(&self.vk_delta_2)?,
            ic,
        };
        if let Some(n) = self.n_public {
            if n as usize != vk.num_inputs() {
                return Err("nPublic does not match the number of IC points");
            }
        }
        Ok(vk)
    }
}

/// Walk `indices` into nested sequences under `node` and return the integer there.
pub(crate) fn int_at(node: &Normalized, path: &str, indices: &[usize]) -> HarnessResult<BigUint> {
    let mut current = node;
    let mut location = path.to_string();
    for &i in indices {
        location.push_str(&format!("/{i}"));
        current = current
            .as_seq()
            .and_then(|items| items.get(i))
            .ok_or_else(|| HarnessError::malformed(location.clone(), "missing element"))?;
    }
    current
        .as_int()
        .cloned()
        .ok_or_else(|| HarnessError::malformed(location, format!("{:?}", current.to_value())))
}
