//! Local Groth16 verifier over BN254.
//!
//! Checks the same equation the generated Solidity verifiers check:
//! ```text
//! e(A, B) = e(α, β) · e(vk_x, γ) · e(C, δ)
//! ```
//! where `vk_x = IC[0] + Σ(input[i] * IC[i+1])`, using arkworks for the
//! pairing arithmetic. Arguments arrive in EVM calldata order, so the G2
//! coordinate pairs of `b` are swapped back before use.

use std::path::Path;

use ark_bn254::{Bn254, Fq, Fq2, Fr, G1Affine, G2Affine};
use ark_ec::AffineRepr;
use ark_ff::{BigInteger, PrimeField};
use ark_groth16::{Groth16, PreparedVerifyingKey, Proof, VerifyingKey as ArkVerifyingKey};
use ark_snark::SNARK;
use async_trait::async_trait;
use num_bigint::BigUint;
use once_cell::sync::Lazy;
use tracing::{debug, warn};

use crate::calldata::{Calldata, Scheme};
use crate::error::InvocationError;
use crate::invoker::{VerificationInvoker, VerifierHandle};
use crate::types::{G1Point, G2Point, VerificationKey, VerificationKeyJson};

/// BN254 base field modulus (q)
static FQ_MODULUS: Lazy<BigUint> = Lazy::new(modulus::<Fq>);
/// BN254 scalar field modulus (r)
static FR_MODULUS: Lazy<BigUint> = Lazy::new(modulus::<Fr>);

fn modulus<F: PrimeField>() -> BigUint {
    BigUint::from_bytes_le(&F::MODULUS.to_bytes_le())
}

/// Groth16 Verifier
///
/// Stores the verification key and its pairing-ready form.
#[derive(Clone, Debug)]
pub struct Verifier {
    /// The verification key
    pub vk: VerificationKey,
    pvk: PreparedVerifyingKey<Bn254>,
}

impl Verifier {
    /// Create a new verifier with the given verification key
    pub fn new(vk: VerificationKey) -> Result<Self, InvocationError> {
        let invalid = |what: &str| InvocationError::VerificationKey(format!("{what} is not a valid curve point"));
        let ark_vk = ArkVerifyingKey::<Bn254> {
            alpha_g1: g1(&vk.alpha).ok_or_else(|| invalid("alpha"))?,
            beta_g2: g2(&vk.beta).ok_or_else(|| invalid("beta"))?,
            gamma_g2: g2(&vk.gamma).ok_or_else(|| invalid("gamma"))?,
            delta_g2: g2(&vk.delta).ok_or_else(|| invalid("delta"))?,
            gamma_abc_g1: vk
                .ic
                .iter()
                .map(g1)
                .collect::<Option<Vec<_>>>()
                .ok_or_else(|| invalid("IC"))?,
        };
        let pvk = Groth16::<Bn254>::process_vk(&ark_vk)
            .map_err(|e| InvocationError::VerificationKey(e.to_string()))?;
        Ok(Self { vk, pvk })
    }

    /// Create verifier from JSON-formatted verification key
    pub fn from_json(vk_json: &VerificationKeyJson) -> Result<Self, InvocationError> {
        let vk = vk_json
            .to_vk()
            .map_err(|e| InvocationError::VerificationKey(e.to_string()))?;
        Self::new(vk)
    }

    /// Load a snarkjs `verification_key.json`.
    pub async fn load(path: &Path) -> Result<Self, InvocationError> {
        let content = tokio::fs::read_to_string(path).await?;
        let vk_json: VerificationKeyJson = serde_json::from_str(&content)
            .map_err(|e| InvocationError::VerificationKey(format!("{}: {e}", path.display())))?;
        Self::from_json(&vk_json)
    }

    /// Verify Groth16 calldata.
    ///
    /// # Returns
    /// `Ok(true)` if the proof is valid, `Ok(false)` if it is well formed but
    /// does not verify (including points off the curve and out-of-field
    /// values), and an error when the arguments cannot be checked against
    /// this key at all.
    pub fn verify(&self, args: &Calldata) -> Result<bool, InvocationError> {
        let Calldata::Groth16 { a, b, c, inputs } = args else {
            return Err(InvocationError::UnsupportedScheme(args.scheme()));
        };
        if inputs.len() != self.vk.num_inputs() {
            return Err(InvocationError::Arity {
                expected: self.vk.num_inputs(),
                actual: inputs.len(),
            });
        }

        let Some(public_inputs) = inputs.iter().map(fr).collect::<Option<Vec<_>>>() else {
            warn!("public input outside the scalar field");
            return Ok(false);
        };

        let a = G1Point { x: a[0].clone(), y: a[1].clone() };
        let b = G2Point::from_evm_words(b);
        let c = G1Point { x: c[0].clone(), y: c[1].clone() };
        let (Some(a), Some(b), Some(c)) = (g1(&a), g2(&b), g1(&c)) else {
            warn!("proof point is not on the curve");
            return Ok(false);
        };

        let proof = Proof::<Bn254> { a, b, c };
        let valid = Groth16::<Bn254>::verify_with_processed_vk(&self.pvk, &public_inputs, &proof)
            .map_err(|e| InvocationError::Other(e.to_string()))?;
        debug!(valid, inputs = public_inputs.len(), "pairing check finished");
        Ok(valid)
    }
}

fn fq(value: &BigUint) -> Option<Fq> {
    (value < &*FQ_MODULUS).then(|| Fq::from_be_bytes_mod_order(&value.to_bytes_be()))
}

fn fr(value: &BigUint) -> Option<Fr> {
    (value < &*FR_MODULUS).then(|| Fr::from_be_bytes_mod_order(&value.to_bytes_be()))
}

/// `(0, 0)` is the point at infinity, as with the EVM precompiles.
fn g1(p: &G1Point) -> Option<G1Affine> {
    if p.is_zero() {
        return Some(G1Affine::zero());
    }
    let point = G1Affine::new_unchecked(fq(&p.x)?, fq(&p.y)?);
    (point.is_on_curve() && point.is_in_correct_subgroup_assuming_on_curve()).then_some(point)
}

fn g2(p: &G2Point) -> Option<G2Affine> {
    if p.is_zero() {
        return Some(G2Affine::zero());
    }
    let x = Fq2::new(fq(&p.x[0])?, fq(&p.x[1])?);
    let y = Fq2::new(fq(&p.y[0])?, fq(&p.y[1])?);
    let point = G2Affine::new_unchecked(x, y);
    (point.is_on_curve() && point.is_in_correct_subgroup_assuming_on_curve()).then_some(point)
}

/// Verifies Groth16 calldata in-process. The handle is the path of a
/// snarkjs `verification_key.json`.
#[derive(Clone, Copy, Debug, Default)]
pub struct LocalGroth16Invoker;

#[async_trait]
impl VerificationInvoker for LocalGroth16Invoker {
    async fn verify(&self, verifier: &VerifierHandle, args: &Calldata) -> Result<bool, InvocationError> {
        if args.scheme() != Scheme::Groth16 {
            return Err(InvocationError::UnsupportedScheme(args.scheme()));
        }
        let loaded = Verifier::load(Path::new(verifier.as_str())).await?;
        let args = args.clone();
        tokio::task::spawn_blocking(move || loaded.verify(&args))
            .await
            .map_err(|e| InvocationError::Other(format!("verifier task failed: {e}")))?
    }
}
