//! Proving backend collaborator.
//!
//! The harness never builds proofs itself. A [`ProvingBackend`] turns a
//! circuit id and a witness into raw proof JSON, and exports calldata text
//! for a normalized proof.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::calldata::Scheme;
use crate::error::BackendError;
use crate::normalize::Normalized;

/// Name under which compiled circuit artifacts are registered.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CircuitId(String);

impl CircuitId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CircuitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for CircuitId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// Named circuit input assignments, integers or numeric strings.
pub type Witness = BTreeMap<String, Value>;

/// Raw backend output, untrusted with respect to numeric encoding.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProofBundle {
    pub proof: Value,
    pub public_signals: Value,
}

/// Produces the flattened calldata text for a proof, e.g.
/// `["0x..","0x.."],[["0x..","0x.."],["0x..","0x.."]],["0x..","0x.."],["0x.."]`.
#[async_trait]
pub trait CalldataExport: Send + Sync {
    async fn export_calldata(
        &self,
        scheme: Scheme,
        proof: &Normalized,
        public_signals: &Normalized,
    ) -> Result<String, BackendError>;
}

#[async_trait]
pub trait ProvingBackend: CalldataExport {
    async fn prove(&self, circuit: &CircuitId, witness: &Witness) -> Result<ProofBundle, BackendError>;
}

/// Compiled circuit files for one circuit.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CircuitArtifacts {
    pub scheme: Scheme,
    /// Witness generator compiled to wasm.
    pub wasm: PathBuf,
    /// Final proving key.
    pub zkey: PathBuf,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verification_key: Option<PathBuf>,
}

impl CircuitArtifacts {
    /// Fail with [`BackendError::MissingArtifact`] on the first absent file.
    pub fn ensure_present(&self) -> Result<(), BackendError> {
        for path in [&self.wasm, &self.zkey] {
            if !path.is_file() {
                return Err(BackendError::MissingArtifact(path.clone()));
            }
        }
        Ok(())
    }

    /// Resolve relative paths against `base`.
    pub fn rebase(&mut self, base: &Path) {
        for path in [&mut self.wasm, &mut self.zkey] {
            if path.is_relative() {
                *path = base.join(&*path);
            }
        }
        if let Some(vk) = self.verification_key.as_mut() {
            if vk.is_relative() {
                *vk = base.join(&*vk);
            }
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct CircuitRegistry {
    circuits: BTreeMap<CircuitId, CircuitArtifacts>,
}

impl CircuitRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, id: CircuitId, artifacts: CircuitArtifacts) {
        self.circuits.insert(id, artifacts);
    }

    pub fn get(&self, id: &CircuitId) -> Result<&CircuitArtifacts, BackendError> {
        self.circuits
            .get(id)
            .ok_or_else(|| BackendError::UnknownCircuit(id.to_string()))
    }
}

impl FromIterator<(CircuitId, CircuitArtifacts)> for CircuitRegistry {
    fn from_iter<I: IntoIterator<Item = (CircuitId, CircuitArtifacts)>>(iter: I) -> Self {
        Self {
            circuits: iter.into_iter().collect(),
        }
    }
}
