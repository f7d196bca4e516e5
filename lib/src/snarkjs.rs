//! [`ProvingBackend`] driving the snarkjs command-line tool.
//!
//! ```bash
//! snarkjs groth16 fullprove input.json circuit.wasm circuit_final.zkey proof.json public.json
//! snarkjs zkey export soliditycalldata public.json proof.json
//! ```

use std::ffi::OsStr;
use std::path::Path;

use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, info};

use crate::backend::{CalldataExport, CircuitId, CircuitRegistry, ProofBundle, ProvingBackend, Witness};
use crate::calldata::Scheme;
use crate::command;
use crate::error::BackendError;
use crate::normalize::Normalized;

pub const DEFAULT_SNARKJS: &str = "snarkjs";

#[derive(Clone, Debug)]
pub struct SnarkjsBackend {
    program: String,
    registry: CircuitRegistry,
}

impl SnarkjsBackend {
    pub fn new(registry: CircuitRegistry) -> Self {
        Self::with_program(DEFAULT_SNARKJS, registry)
    }

    /// Use a specific snarkjs executable, e.g. `node_modules/.bin/snarkjs`.
    pub fn with_program(program: impl Into<String>, registry: CircuitRegistry) -> Self {
        Self {
            program: program.into(),
            registry,
        }
    }
}

async fn write_json(path: &Path, value: &Value) -> Result<(), BackendError> {
    tokio::fs::write(path, serde_json::to_vec_pretty(value)?).await?;
    Ok(())
}

async fn read_json(path: &Path) -> Result<Value, BackendError> {
    let content = tokio::fs::read_to_string(path).await?;
    Ok(serde_json::from_str(&content)?)
}

#[async_trait]
impl CalldataExport for SnarkjsBackend {
    async fn export_calldata(
        &self,
        scheme: Scheme,
        proof: &Normalized,
        public_signals: &Normalized,
    ) -> Result<String, BackendError> {
        let scratch = tempfile::tempdir()?;
        let proof_path = scratch.path().join("proof.json");
        let public_path = scratch.path().join("public.json");
        write_json(&proof_path, &proof.to_value()).await?;
        write_json(&public_path, &public_signals.to_value()).await?;

        let stdout = command::run(
            &self.program,
            [
                OsStr::new("zkey"),
                OsStr::new("export"),
                OsStr::new("soliditycalldata"),
                public_path.as_os_str(),
                proof_path.as_os_str(),
            ],
        )
        .await?;
        let calldata = stdout.trim().to_string();
        if calldata.is_empty() {
            return Err(BackendError::Export(format!(
                "{} printed no {scheme} calldata",
                self.program
            )));
        }
        debug!(%scheme, bytes = calldata.len(), "exported calldata");
        Ok(calldata)
    }
}

#[async_trait]
impl ProvingBackend for SnarkjsBackend {
    async fn prove(&self, circuit: &CircuitId, witness: &Witness) -> Result<ProofBundle, BackendError> {
        let artifacts = self.registry.get(circuit)?;
        artifacts.ensure_present()?;

        let scratch = tempfile::tempdir()?;
        let input_path = scratch.path().join("input.json");
        let proof_path = scratch.path().join("proof.json");
        let public_path = scratch.path().join("public.json");
        write_json(&input_path, &serde_json::to_value(witness)?).await?;

        info!(%circuit, scheme = %artifacts.scheme, "generating proof");
        command::run(
            &self.program,
            [
                OsStr::new(artifacts.scheme.as_str()),
                OsStr::new("fullprove"),
                input_path.as_os_str(),
                artifacts.wasm.as_os_str(),
                artifacts.zkey.as_os_str(),
                proof_path.as_os_str(),
                public_path.as_os_str(),
            ],
        )
        .await?;

        Ok(ProofBundle {
            proof: read_json(&proof_path).await?,
            public_signals: read_json(&public_path).await?,
        })
    }
}
