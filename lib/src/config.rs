//! JSON scenario manifests.
//!
//! ```json
//! {
//!   "rpc_url": "http://127.0.0.1:8545",
//!   "step_timeout_secs": 300,
//!   "circuits": {
//!     "HelloWorld": { "scheme": "groth16", "wasm": "HelloWorld.wasm", "zkey": "circuit_final.zkey",
//!                     "verification_key": "verification_key.json" }
//!   },
//!   "scenarios": [
//!     { "name": "hello world", "circuit": "HelloWorld", "witness": { "a": "1", "b": "2" } },
//!     { "name": "plonk rejects", "scheme": "plonk",
//!       "verifier": { "evm": "0x5FbDB2315678afecb367f032d93F642f64180aa3" },
//!       "invalid": { "public_inputs": 1 } }
//!   ]
//! }
//! ```
//!
//! Relative paths resolve against the manifest's directory.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::backend::{CircuitArtifacts, CircuitId, CircuitRegistry, ProvingBackend, Witness};
use crate::calldata::Scheme;
use crate::error::{HarnessError, HarnessResult};
use crate::evm::{is_evm_address, CastInvoker, DEFAULT_CAST, DEFAULT_RPC_URL};
use crate::invoker::{VerificationInvoker, VerifierHandle};
use crate::normalize::{NumericPolicy, Normalizer};
use crate::scenario::{CalldataPath, Orchestrator, Scenario, ScenarioContext};
use crate::snarkjs::{SnarkjsBackend, DEFAULT_SNARKJS};
use crate::verifier::LocalGroth16Invoker;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HarnessManifest {
    #[serde(default = "default_snarkjs")]
    pub snarkjs: String,
    #[serde(default = "default_cast")]
    pub cast: String,
    #[serde(default = "default_rpc_url")]
    pub rpc_url: String,
    #[serde(default)]
    pub numeric_policy: NumericPolicy,
    #[serde(default)]
    pub calldata: CalldataPath,
    #[serde(default)]
    pub step_timeout_secs: Option<u64>,
    #[serde(default)]
    pub circuits: BTreeMap<CircuitId, CircuitArtifacts>,
    #[serde(default)]
    pub scenarios: Vec<ScenarioConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioConfig {
    pub name: String,
    #[serde(default)]
    pub circuit: Option<CircuitId>,
    /// Required when no circuit is named; must match the circuit otherwise.
    #[serde(default)]
    pub scheme: Option<Scheme>,
    /// Defaults to the circuit's verification key, checked locally.
    #[serde(default)]
    pub verifier: Option<VerifierConfig>,
    #[serde(default)]
    pub witness: Option<Witness>,
    #[serde(default)]
    pub invalid: Option<InvalidProofConfig>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VerifierConfig {
    /// snarkjs `verification_key.json`, checked with the in-process verifier.
    Local(PathBuf),
    /// Address of a deployed verifier contract.
    Evm(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvalidProofConfig {
    pub public_inputs: usize,
}

fn default_snarkjs() -> String {
    DEFAULT_SNARKJS.to_string()
}

fn default_cast() -> String {
    DEFAULT_CAST.to_string()
}

fn default_rpc_url() -> String {
    DEFAULT_RPC_URL.to_string()
}

impl HarnessManifest {
    /// Read a manifest and resolve its relative paths.
    pub async fn load(path: &Path) -> HarnessResult<Self> {
        let contents = tokio::fs::read_to_string(path).await?;
        let mut manifest: HarnessManifest = serde_json::from_str(&contents)
            .map_err(|e| HarnessError::Manifest(format!("failed to parse {}: {e}", path.display())))?;
        if let Some(base) = path.parent() {
            manifest.rebase(base);
        }
        Ok(manifest)
    }

    pub fn rebase(&mut self, base: &Path) {
        for artifacts in self.circuits.values_mut() {
            artifacts.rebase(base);
        }
        for scenario in &mut self.scenarios {
            if let Some(VerifierConfig::Local(path)) = scenario.verifier.as_mut() {
                if path.is_relative() {
                    *path = base.join(&*path);
                }
            }
        }
    }

    /// Check every scenario can be resolved without touching the filesystem.
    pub fn validate(&self) -> HarnessResult<()> {
        let mut names = BTreeSet::new();
        for scenario in &self.scenarios {
            if !names.insert(scenario.name.as_str()) {
                return Err(manifest_error(&scenario.name, "duplicate scenario name"));
            }
            self.resolve(scenario)?;
        }
        Ok(())
    }

    pub fn registry(&self) -> CircuitRegistry {
        self.circuits
            .iter()
            .map(|(id, artifacts)| (id.clone(), artifacts.clone()))
            .collect()
    }

    pub fn orchestrator(&self) -> Orchestrator {
        let orchestrator =
            Orchestrator::new(Normalizer::new(self.numeric_policy)).with_calldata_path(self.calldata);
        match self.step_timeout_secs {
            Some(secs) => orchestrator.with_step_timeout(Duration::from_secs(secs)),
            None => orchestrator,
        }
    }

    /// Scenarios in manifest order, or the single one called `only`.
    pub fn scenarios(&self, only: Option<&str>) -> HarnessResult<Vec<Scenario>> {
        self.select(only)?
            .into_iter()
            .map(|config| self.resolve(config).map(|(scenario, _)| scenario))
            .collect()
    }

    /// Bind each selected scenario to its own collaborators.
    pub fn plan(&self, only: Option<&str>) -> HarnessResult<Vec<(ScenarioContext, Scenario)>> {
        self.validate()?;
        let backend: Arc<dyn ProvingBackend> =
            Arc::new(SnarkjsBackend::with_program(self.snarkjs.clone(), self.registry()));
        self.select(only)?
            .into_iter()
            .map(|config| {
                let (scenario, verifier) = self.resolve(config)?;
                let (invoker, handle) = match verifier {
                    VerifierConfig::Local(path) => (
                        Arc::new(LocalGroth16Invoker) as Arc<dyn VerificationInvoker>,
                        VerifierHandle::new(path.display().to_string()),
                    ),
                    VerifierConfig::Evm(address) => (
                        Arc::new(CastInvoker::with_program(self.cast.clone(), self.rpc_url.clone()))
                            as Arc<dyn VerificationInvoker>,
                        VerifierHandle::new(address),
                    ),
                };
                let context = ScenarioContext {
                    backend: Arc::clone(&backend),
                    invoker,
                    verifier: handle,
                };
                Ok((context, scenario))
            })
            .collect()
    }

    fn select(&self, only: Option<&str>) -> HarnessResult<Vec<&ScenarioConfig>> {
        match only {
            None => Ok(self.scenarios.iter().collect()),
            Some(name) => self
                .scenarios
                .iter()
                .find(|s| s.name == name)
                .map(|s| vec![s])
                .ok_or_else(|| manifest_error(name, "no such scenario")),
        }
    }

    fn resolve(&self, config: &ScenarioConfig) -> HarnessResult<(Scenario, VerifierConfig)> {
        let name = config.name.as_str();
        let circuit = match &config.circuit {
            Some(id) => Some((
                id,
                self.circuits
                    .get(id)
                    .ok_or_else(|| manifest_error(name, format!("unknown circuit `{id}`")))?,
            )),
            None => None,
        };

        let scheme = match (config.scheme, circuit) {
            (Some(scheme), Some((_, artifacts))) if scheme != artifacts.scheme => {
                return Err(manifest_error(
                    name,
                    format!("scheme {scheme} does not match circuit scheme {}", artifacts.scheme),
                ))
            }
            (_, Some((_, artifacts))) => artifacts.scheme,
            (Some(scheme), None) => scheme,
            (None, None) => return Err(manifest_error(name, "needs a circuit or a scheme")),
        };

        let verifier = match (&config.verifier, circuit) {
            (Some(verifier), _) => verifier.clone(),
            (None, Some((_, CircuitArtifacts { verification_key: Some(vk), .. }))) => {
                VerifierConfig::Local(vk.clone())
            }
            (None, _) => return Err(manifest_error(name, "no verifier configured")),
        };
        match &verifier {
            VerifierConfig::Local(_) if scheme != Scheme::Groth16 => {
                return Err(manifest_error(name, format!("no local verifier for {scheme}")))
            }
            VerifierConfig::Evm(address) if !is_evm_address(address) => {
                return Err(manifest_error(name, format!("invalid contract address {address:?}")))
            }
            _ => {}
        }

        let scenario = match (&config.witness, &config.invalid, circuit) {
            (Some(witness), None, Some((id, _))) => {
                Scenario::valid(name, scheme, id.clone(), witness.clone())
            }
            (Some(_), None, None) => return Err(manifest_error(name, "a witness needs a circuit")),
            (None, Some(invalid), _) => Scenario::invalid(name, scheme, invalid.public_inputs),
            (Some(_), Some(_), _) => {
                return Err(manifest_error(name, "set either `witness` or `invalid`, not both"))
            }
            (None, None, _) => return Err(manifest_error(name, "needs a `witness` or `invalid`")),
        };
        Ok((scenario, verifier))
    }
}

fn manifest_error(scenario: &str, message: impl std::fmt::Display) -> HarnessError {
    HarnessError::Manifest(format!("scenario `{scenario}`: {message}"))
}
