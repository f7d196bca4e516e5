//! # zk_verifier_harness
//!
//! End-to-end verification scenarios for snarkjs Groth16 and PLONK proofs.
//!
//! ## Features
//! - Normalizes the mixed decimal / hex / native-integer encodings snarkjs emits
//! - Formats proofs into the exact argument layout generated Solidity verifiers expect
//! - Proves through the snarkjs CLI, verifies locally (arkworks BN254) or against a
//!   deployed contract through `cast`
//! - Runs scenarios sequentially or concurrently with per-step timeouts
//!
//! ## Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use zk_verifier_harness::prelude::*;
//!
//! let registry: CircuitRegistry = [(
//!     CircuitId::from("HelloWorld"),
//!     CircuitArtifacts {
//!         scheme: Scheme::Groth16,
//!         wasm: "HelloWorld.wasm".into(),
//!         zkey: "circuit_final.zkey".into(),
//!         verification_key: None,
//!     },
//! )]
//! .into_iter()
//! .collect();
//!
//! let ctx = ScenarioContext {
//!     backend: Arc::new(SnarkjsBackend::new(registry)),
//!     invoker: Arc::new(LocalGroth16Invoker),
//!     verifier: VerifierHandle::new("verification_key.json"),
//! };
//! let witness = Witness::from([("a".into(), "1".into()), ("b".into(), "2".into())]);
//! let scenario = Scenario::valid("hello world", Scheme::Groth16, "HelloWorld".into(), witness);
//!
//! let report = Orchestrator::default().run(&ctx, &scenario).await;
//! assert!(report.passed());
//! ```

pub mod backend;
pub mod calldata;
mod command;
pub mod config;
pub mod error;
pub mod evm;
pub mod export;
pub mod invoker;
pub mod normalize;
pub mod scenario;
pub mod snarkjs;
pub mod types;
pub mod verifier;

// Re-export main types
pub use backend::{CalldataExport, CircuitArtifacts, CircuitId, CircuitRegistry, ProofBundle, ProvingBackend, Witness};
pub use calldata::{tokenize, Calldata, CalldataFormatter, ProofBlob, Scheme, Slot};
pub use config::HarnessManifest;
pub use error::{BackendError, ErrorKind, HarnessError, HarnessResult, InvocationError};
pub use evm::{is_evm_address, CastInvoker};
pub use export::{solidity_calldata, LocalExport};
pub use invoker::{VerificationInvoker, VerifierHandle};
pub use normalize::{parse_integer, Normalized, Normalizer, NumericPolicy};
pub use scenario::{CalldataPath, Orchestrator, Outcome, RunSummary, Scenario, ScenarioContext, ScenarioKind, ScenarioReport, Stage};
pub use snarkjs::SnarkjsBackend;
pub use types::{G1Point, G2Point, VerificationKey, VerificationKeyJson, U256};
pub use verifier::{LocalGroth16Invoker, Verifier};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::backend::{CalldataExport, CircuitArtifacts, CircuitId, CircuitRegistry, ProvingBackend, Witness};
    pub use crate::calldata::{Calldata, CalldataFormatter, Scheme};
    pub use crate::error::{ErrorKind, HarnessError, HarnessResult};
    pub use crate::evm::CastInvoker;
    pub use crate::export::LocalExport;
    pub use crate::invoker::{VerificationInvoker, VerifierHandle};
    pub use crate::normalize::{Normalized, Normalizer, NumericPolicy};
    pub use crate::scenario::{Orchestrator, Outcome, Scenario, ScenarioContext, ScenarioReport, Stage};
    pub use crate::snarkjs::SnarkjsBackend;
    pub use crate::verifier::LocalGroth16Invoker;
}
