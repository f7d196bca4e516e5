//! snarkjs-compatible calldata export.
//!
//! Renders the same flattened text `snarkjs zkey export soliditycalldata`
//! prints, and builds [`Calldata`] straight from a normalized proof without
//! going through text at all. Both paths share one field layout, so they
//! agree by construction.
//!
//! PLONK proofs use the legacy snarkjs layout the bundled verifiers expect:
//! one `bytes` blob of 32-byte words in the order
//! `A B C Z T1 T2 T3 eval_a eval_b eval_c eval_s1 eval_s2 eval_zw eval_r Wxi Wxiw`.

use async_trait::async_trait;
use num_bigint::BigUint;

use crate::backend::CalldataExport;
use crate::calldata::{Calldata, ProofBlob, Scheme};
use crate::error::{BackendError, HarnessError, HarnessResult};
use crate::normalize::Normalized;
use crate::types::{int_at, G1Point, G2Point, U256};

const PLONK_POINTS_HEAD: [&str; 7] = ["A", "B", "C", "Z", "T1", "T2", "T3"];
const PLONK_EVALUATIONS: [&str; 7] = [
    "eval_a", "eval_b", "eval_c", "eval_s1", "eval_s2", "eval_zw", "eval_r",
];
const PLONK_POINTS_TAIL: [&str; 2] = ["Wxi", "Wxiw"];

/// Render snarkjs `exportSolidityCallData` text for `(proof, public_signals)`.
pub fn solidity_calldata(
    scheme: Scheme,
    proof: &Normalized,
    public_signals: &Normalized,
) -> HarnessResult<String> {
    let calldata = Calldata::from_proof(scheme, proof, public_signals)?;
    render(&calldata)
}

/// Render already built calldata in snarkjs text form.
pub fn render(calldata: &Calldata) -> HarnessResult<String> {
    match calldata {
        Calldata::Groth16 { a, b, c, inputs } => Ok(format!(
            "[{}],[[{}],[{}]],[{}],[{}]",
            quoted_words(a)?,
            quoted_words(&b[0])?,
            quoted_words(&b[1])?,
            quoted_words(c)?,
            quoted_words(inputs)?,
        )),
        Calldata::Plonk { proof, inputs } => {
            Ok(format!("\"{}\",[{}]", proof.to_hex(), quoted_words(inputs)?))
        }
    }
}

impl Calldata {
    /// Build verifier arguments directly from a normalized snarkjs proof.
    pub fn from_proof(
        scheme: Scheme,
        proof: &Normalized,
        public_signals: &Normalized,
    ) -> HarnessResult<Self> {
        check_protocol(scheme, proof)?;
        let inputs = signals(public_signals)?;
        match scheme {
            Scheme::Groth16 => {
                let a = G1Point::from_normalized(field(proof, "pi_a")?, "/pi_a")?;
                let b = G2Point::from_normalized(field(proof, "pi_b")?, "/pi_b")?;
                let c = G1Point::from_normalized(field(proof, "pi_c")?, "/pi_c")?;
                Ok(Self::Groth16 {
                    a: a.words(),
                    b: b.to_evm_words(),
                    c: c.words(),
                    inputs,
                })
            }
            Scheme::Plonk => Ok(Self::Plonk {
                proof: plonk_blob(proof)?,
                inputs,
            }),
        }
    }
}

/// Pure-Rust stand-in for the snarkjs export command.
#[derive(Clone, Copy, Debug, Default)]
pub struct LocalExport;

#[async_trait]
impl CalldataExport for LocalExport {
    async fn export_calldata(
        &self,
        scheme: Scheme,
        proof: &Normalized,
        public_signals: &Normalized,
    ) -> Result<String, BackendError> {
        solidity_calldata(scheme, proof, public_signals)
            .map_err(|e| BackendError::Export(e.to_string()))
    }
}

fn plonk_blob(proof: &Normalized) -> HarnessResult<ProofBlob> {
    let mut bytes = Vec::with_capacity(25 * 32);
    for key in PLONK_POINTS_HEAD {
        push_point(&mut bytes, proof, key)?;
    }
    for key in PLONK_EVALUATIONS {
        let path = format!("/{key}");
        let value = field(proof, key)?
            .as_int()
            .ok_or_else(|| HarnessError::malformed(path.clone(), "expected an integer"))?;
        bytes.extend_from_slice(&word(value, &path)?.to_be_bytes());
    }
    for key in PLONK_POINTS_TAIL {
        push_point(&mut bytes, proof, key)?;
    }
    Ok(ProofBlob::new(bytes))
}

fn push_point(bytes: &mut Vec<u8>, proof: &Normalized, key: &str) -> HarnessResult<()> {
    let path = format!("/{key}");
    let point = G1Point::from_normalized(field(proof, key)?, &path)?;
    for coordinate in point.words() {
        bytes.extend_from_slice(&word(&coordinate, &path)?.to_be_bytes());
    }
    Ok(())
}

fn field<'a>(proof: &'a Normalized, key: &str) -> HarnessResult<&'a Normalized> {
    proof
        .get(key)
        .ok_or_else(|| HarnessError::malformed(format!("/{key}"), "missing proof field"))
}

fn check_protocol(scheme: Scheme, proof: &Normalized) -> HarnessResult<()> {
    match proof.get("protocol").and_then(Normalized::as_text) {
        Some(protocol) if protocol != scheme.as_str() => Err(HarnessError::malformed(
            "/protocol",
            format!("{protocol:?} proof cannot be formatted as {scheme}"),
        )),
        _ => Ok(()),
    }
}

fn signals(public_signals: &Normalized) -> HarnessResult<Vec<BigUint>> {
    let count = public_signals
        .as_seq()
        .ok_or_else(|| HarnessError::malformed("/", "public signals must be a sequence"))?
        .len();
    (0..count).map(|i| int_at(public_signals, "", &[i])).collect()
}

fn word(value: &BigUint, path: &str) -> HarnessResult<U256> {
    U256::from_biguint(value)
        .ok_or_else(|| HarnessError::malformed(path, "value does not fit in 256 bits"))
}

fn quoted_words(values: &[BigUint]) -> HarnessResult<String> {
    let words = values
        .iter()
        .map(|v| word(v, "calldata").map(|w| format!("\"0x{}\"", hex::encode(w.to_be_bytes()))))
        .collect::<HarnessResult<Vec<_>>>()?;
    Ok(words.join(", "))
}
