//! Shared fixtures for the integration tests.
//!
//! `groth16_fixture` builds a verification key and a matching proof over
//! BN254 from a known trapdoor, so the accept path can be exercised without
//! snarkjs. With `γ = δ = [1]₂` and `B = [1]₂` the verifier equation reduces to
//! `a = α·β + vk_x + c` over the scalar field.
#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use ark_bn254::{Fq, Fr, G1Affine, G1Projective, G2Affine, G2Projective};
use ark_ec::{CurveGroup, Group};
use ark_ff::{BigInteger, PrimeField};
use async_trait::async_trait;
use num_bigint::BigUint;
use serde_json::{json, Value};

use zk_verifier_harness::prelude::*;
use zk_verifier_harness::{BackendError, InvocationError, LocalExport, ProofBundle};

pub struct Groth16Fixture {
    pub verification_key: Value,
    pub proof: Value,
    pub public_signals: Value,
}

impl Groth16Fixture {
    pub fn bundle(&self) -> ProofBundle {
        ProofBundle {
            proof: self.proof.clone(),
            public_signals: self.public_signals.clone(),
        }
    }

    /// Write `verification_key.json` into `dir` and return its path.
    pub fn write_key(&self, dir: &Path, name: &str) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, serde_json::to_vec_pretty(&self.verification_key).unwrap()).unwrap();
        path
    }
}

fn dec(f: Fq) -> String {
    BigUint::from_bytes_le(&f.into_bigint().to_bytes_le()).to_str_radix(10)
}

fn g1_json(p: G1Affine) -> Value {
    json!([dec(p.x), dec(p.y), "1"])
}

fn g2_json(p: G2Affine) -> Value {
    json!([[dec(p.x.c0), dec(p.x.c1)], [dec(p.y.c0), dec(p.y.c1)], ["1", "0"]])
}

pub fn groth16_fixture(public: &[u64]) -> Groth16Fixture {
    let g1 = G1Projective::generator();
    let g2 = G2Projective::generator();
    let (alpha, beta, c) = (Fr::from(3u64), Fr::from(5u64), Fr::from(11u64));
    let ic: Vec<Fr> = (0..=public.len()).map(|k| Fr::from(7 + k as u64)).collect();
    let vk_x = public
        .iter()
        .zip(&ic[1..])
        .fold(ic[0], |acc, (x, i)| acc + Fr::from(*x) * i);
    let a = alpha * beta + vk_x + c;

    let verification_key = json!({
        "protocol": "groth16",
        "curve": "bn128",
        "nPublic": public.len(),
        "vk_alpha_1": g1_json((g1 * alpha).into_affine()),
        "vk_beta_2": g2_json((g2 * beta).into_affine()),
        "vk_gamma_2": g2_json(g2.into_affine()),
        "vk_delta_2": g2_json(g2.into_affine()),
        "IC": ic.iter().map(|i| g1_json((g1 * i).into_affine())).collect::<Vec<_>>(),
    });
    let proof = json!({
        "pi_a": g1_json((g1 * a).into_affine()),
        "pi_b": g2_json(g2.into_affine()),
        "pi_c": g1_json((g1 * c).into_affine()),
        "protocol": "groth16",
        "curve": "bn128",
    });
    let public_signals = json!(public.iter().map(u64::to_string).collect::<Vec<_>>());

    Groth16Fixture {
        verification_key,
        proof,
        public_signals,
    }
}

pub struct PlonkFixture {
    pub bundle: ProofBundle,
    /// Blob a PLONK verifier must receive: 32-byte words in verifier order.
    pub blob: Vec<u8>,
}

/// snarkjs-shaped PLONK proof whose every field is a distinct small value.
/// Commitment `k` is the point `(1000 + 2k, 1001 + 2k)`, evaluation `k` is `500 + k`.
pub fn plonk_fixture(public: &[u64]) -> PlonkFixture {
    let commitments = ["A", "B", "C", "Z", "T1", "T2", "T3", "Wxi", "Wxiw"];
    let evaluations = ["eval_a", "eval_b", "eval_c", "eval_s1", "eval_s2", "eval_zw", "eval_r"];

    let mut proof = serde_json::Map::new();
    for (k, key) in commitments.iter().enumerate() {
        let (x, y) = (1000 + 2 * k as u64, 1001 + 2 * k as u64);
        proof.insert(key.to_string(), json!([x.to_string(), y.to_string(), "1"]));
    }
    for (k, key) in evaluations.iter().enumerate() {
        proof.insert(key.to_string(), json!((500 + k as u64).to_string()));
    }
    proof.insert("protocol".into(), json!("plonk"));
    proof.insert("curve".into(), json!("bn128"));

    let word = |v: u64| {
        let mut w = [0u8; 32];
        w[24..].copy_from_slice(&v.to_be_bytes());
        w
    };
    let mut blob = Vec::new();
    for k in 0..7u64 {
        blob.extend(word(1000 + 2 * k));
        blob.extend(word(1001 + 2 * k));
    }
    for k in 0..7u64 {
        blob.extend(word(500 + k));
    }
    for k in 7..9u64 {
        blob.extend(word(1000 + 2 * k));
        blob.extend(word(1001 + 2 * k));
    }

    PlonkFixture {
        bundle: ProofBundle {
            proof: Value::Object(proof),
            public_signals: json!(public.iter().map(u64::to_string).collect::<Vec<_>>()),
        },
        blob,
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Behaviour {
    Honest,
    MissingArtifact,
    ShortExport,
    Hang,
}

/// In-process backend returning a fixed proof bundle.
pub struct FakeBackend {
    pub bundle: ProofBundle,
    pub behaviour: Behaviour,
}

impl FakeBackend {
    pub fn honest(bundle: ProofBundle) -> Self {
        Self {
            bundle,
            behaviour: Behaviour::Honest,
        }
    }

    pub fn with(bundle: ProofBundle, behaviour: Behaviour) -> Self {
        Self { bundle, behaviour }
    }
}

#[async_trait]
impl CalldataExport for FakeBackend {
    async fn export_calldata(
        &self,
        scheme: Scheme,
        proof: &Normalized,
        public_signals: &Normalized,
    ) -> Result<String, BackendError> {
        match self.behaviour {
            Behaviour::ShortExport => Ok(r#"["0x01", "0x02"],[["0x03"]]"#.to_string()),
            _ => LocalExport.export_calldata(scheme, proof, public_signals).await,
        }
    }
}

#[async_trait]
impl ProvingBackend for FakeBackend {
    async fn prove(&self, _circuit: &CircuitId, _witness: &Witness) -> Result<ProofBundle, BackendError> {
        match self.behaviour {
            Behaviour::MissingArtifact => Err(BackendError::MissingArtifact("circuit_final.zkey".into())),
            Behaviour::Hang => futures::future::pending().await,
            _ => Ok(self.bundle.clone()),
        }
    }
}

/// Invoker whose verifier can never be reached.
pub struct UnreachableInvoker;

#[async_trait]
impl VerificationInvoker for UnreachableInvoker {
    async fn verify(&self, verifier: &VerifierHandle, _args: &Calldata) -> Result<bool, InvocationError> {
        Err(InvocationError::Process {
            program: "cast".into(),
            status: "exit status: 1".into(),
            stderr: format!("Error: could not reach {verifier}"),
        })
    }
}

/// Invoker that accepts everything and keeps the arguments it was handed.
#[derive(Default)]
pub struct RecordingInvoker {
    pub calls: Mutex<Vec<(VerifierHandle, Calldata)>>,
}

#[async_trait]
impl VerificationInvoker for RecordingInvoker {
    async fn verify(&self, verifier: &VerifierHandle, args: &Calldata) -> Result<bool, InvocationError> {
        self.calls.lock().unwrap().push((verifier.clone(), args.clone()));
        Ok(true)
    }
}

pub fn witness(pairs: &[(&str, u64)]) -> Witness {
    pairs
        .iter()
        .map(|(name, value)| (name.to_string(), json!(value.to_string())))
        .collect()
}
