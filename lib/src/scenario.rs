//! Verification scenarios.
//!
//! Each scenario walks `Init → Proving → Normalizing → Formatting → Invoking → Done`.
//! Invalid-proof scenarios jump from `Init` straight to `Formatting` with
//! hand-built arguments. The first error aborts the scenario at the stage it
//! happened in; nothing is retried.

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, info_span, warn, Instrument};

use crate::backend::{CircuitId, ProvingBackend, Witness};
use crate::calldata::{Calldata, CalldataFormatter, Scheme};
use crate::error::{BackendError, ErrorKind, HarnessError, HarnessResult, InvocationError};
use crate::invoker::{VerificationInvoker, VerifierHandle};
use crate::normalize::Normalizer;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Stage {
    Init,
    Proving,
    Normalizing,
    Formatting,
    Invoking,
    Done,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Init => "init",
            Self::Proving => "proving",
            Self::Normalizing => "normalizing",
            Self::Formatting => "formatting",
            Self::Invoking => "invoking",
            Self::Done => "done",
        };
        f.write_str(name)
    }
}

/// How a valid-proof scenario turns the normalized proof into calldata.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CalldataPath {
    /// Build the argument layout straight from the proof structure.
    #[default]
    Structured,
    /// Ask the backend for its textual export and parse it back.
    Exported,
}

#[derive(Clone, Debug, PartialEq)]
pub enum ScenarioKind {
    ValidProof { circuit: CircuitId, witness: Witness },
    InvalidProof { public_inputs: usize },
}

#[derive(Clone, Debug, PartialEq)]
pub struct Scenario {
    pub name: String,
    pub scheme: Scheme,
    pub kind: ScenarioKind,
    /// Verdict the verifier must return for the scenario to pass.
    pub expect: bool,
}

impl Scenario {
    /// Prove `witness` on `circuit`; the verifier must accept.
    pub fn valid(name: impl Into<String>, scheme: Scheme, circuit: CircuitId, witness: Witness) -> Self {
        Self {
            name: name.into(),
            scheme,
            kind: ScenarioKind::ValidProof { circuit, witness },
            expect: true,
        }
    }

    /// Hand [`Calldata::invalid`] to the verifier; it must reject without erroring.
    pub fn invalid(name: impl Into<String>, scheme: Scheme, public_inputs: usize) -> Self {
        Self {
            name: name.into(),
            scheme,
            kind: ScenarioKind::InvalidProof { public_inputs },
            expect: false,
        }
    }
}

/// Collaborators bound to a single scenario.
#[derive(Clone)]
pub struct ScenarioContext {
    pub backend: Arc<dyn ProvingBackend>,
    pub invoker: Arc<dyn VerificationInvoker>,
    pub verifier: VerifierHandle,
}

impl fmt::Debug for ScenarioContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScenarioContext")
            .field("verifier", &self.verifier)
            .finish_non_exhaustive()
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Outcome {
    Passed,
    /// The verifier ran but returned the other boolean.
    WrongVerdict { expected: bool, actual: bool },
    /// A collaborator or the formatter failed; the verifier's answer is unknown.
    Failed {
        stage: Stage,
        kind: ErrorKind,
        message: String,
    },
}

#[derive(Clone, Debug)]
pub struct ScenarioReport {
    pub name: String,
    pub scheme: Scheme,
    /// Stages entered, in order.
    pub visited: Vec<Stage>,
    pub outcome: Outcome,
}

impl ScenarioReport {
    pub fn passed(&self) -> bool {
        self.outcome == Outcome::Passed
    }

    pub fn error_kind(&self) -> Option<ErrorKind> {
        match &self.outcome {
            Outcome::Failed { kind, .. } => Some(*kind),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct RunSummary {
    pub reports: Vec<ScenarioReport>,
}

impl RunSummary {
    pub fn passed(&self) -> usize {
        self.reports.iter().filter(|r| r.passed()).count()
    }

    pub fn failed(&self) -> usize {
        self.reports.len() - self.passed()
    }

    pub fn all_passed(&self) -> bool {
        self.reports.iter().all(ScenarioReport::passed)
    }
}

/// Drives scenarios against their contexts.
#[derive(Clone, Debug, Default)]
pub struct Orchestrator {
    normalizer: Normalizer,
    formatter: CalldataFormatter,
    calldata_path: CalldataPath,
    step_timeout: Option<Duration>,
}

impl Orchestrator {
    pub fn new(normalizer: Normalizer) -> Self {
        Self {
            formatter: CalldataFormatter::new(normalizer.clone()),
            normalizer,
            calldata_path: CalldataPath::default(),
            step_timeout: None,
        }
    }

    /// Fail a collaborator call that takes longer than `limit`.
    pub fn with_step_timeout(mut self, limit: Duration) -> Self {
        self.step_timeout = Some(limit);
        self
    }

    pub fn with_calldata_path(mut self, path: CalldataPath) -> Self {
        self.calldata_path = path;
        self
    }

    pub async fn run(&self, ctx: &ScenarioContext, scenario: &Scenario) -> ScenarioReport {
        let span = info_span!("scenario", name = %scenario.name, scheme = %scenario.scheme);
        async move {
            let mut visited = vec![Stage::Init];
            let outcome = match self.drive(ctx, scenario, &mut visited).await {
                Ok(actual) => {
                    visited.push(Stage::Done);
                    if actual == scenario.expect {
                        info!(verdict = actual, "scenario passed");
                        Outcome::Passed
                    } else {
                        warn!(expected = scenario.expect, actual, "wrong verdict");
                        Outcome::WrongVerdict {
                            expected: scenario.expect,
                            actual,
                        }
                    }
                }
                Err(err) => {
                    let stage = visited.last().copied().unwrap_or(Stage::Init);
                    warn!(%stage, kind = %err.kind(), "scenario aborted: {err}");
                    Outcome::Failed {
                        stage,
                        kind: err.kind(),
                        message: err.to_string(),
                    }
                }
            };
            ScenarioReport {
                name: scenario.name.clone(),
                scheme: scenario.scheme,
                visited,
                outcome,
            }
        }
        .instrument(span)
        .await
    }

    /// One scenario after another, in order.
    pub async fn run_sequential(&self, plan: &[(ScenarioContext, Scenario)]) -> RunSummary {
        let mut reports = Vec::with_capacity(plan.len());
        for (ctx, scenario) in plan {
            reports.push(self.run(ctx, scenario).await);
        }
        RunSummary { reports }
    }

    /// All scenarios at once. Each one still runs its stages in order, and
    /// reports come back in plan order.
    pub async fn run_concurrent(&self, plan: &[(ScenarioContext, Scenario)]) -> RunSummary {
        let reports = join_all(plan.iter().map(|(ctx, scenario)| self.run(ctx, scenario))).await;
        RunSummary { reports }
    }

    async fn drive(
        &self,
        ctx: &ScenarioContext,
        scenario: &Scenario,
        visited: &mut Vec<Stage>,
    ) -> HarnessResult<bool> {
        let calldata = match &scenario.kind {
            ScenarioKind::ValidProof { circuit, witness } => {
                enter(visited, Stage::Proving);
                let bundle = self
                    .bounded(ctx.backend.prove(circuit, witness), BackendError::Timeout)
                    .await?;

                enter(visited, Stage::Normalizing);
                let proof = self.normalizer.normalize(&bundle.proof)?;
                let signals = self.normalizer.normalize(&bundle.public_signals)?;

                enter(visited, Stage::Formatting);
                match self.calldata_path {
                    CalldataPath::Structured => Calldata::from_proof(scenario.scheme, &proof, &signals)?,
                    CalldataPath::Exported => {
                        self.bounded(
                            self.formatter
                                .format(ctx.backend.as_ref(), scenario.scheme, &proof, &signals),
                            |limit| HarnessError::BackendFailure(BackendError::Timeout(limit)),
                        )
                        .await?
                    }
                }
            }
            ScenarioKind::InvalidProof { public_inputs } => {
                enter(visited, Stage::Formatting);
                Calldata::invalid(scenario.scheme, *public_inputs)
            }
        };
        debug!(slots = ?calldata.slots(), "calldata ready");

        enter(visited, Stage::Invoking);
        let verdict = self
            .bounded(ctx.invoker.verify(&ctx.verifier, &calldata), InvocationError::Timeout)
            .await?;
        Ok(verdict)
    }

    async fn bounded<T, E, F>(&self, step: F, on_timeout: impl FnOnce(Duration) -> E) -> Result<T, E>
    where
        F: Future<Output = Result<T, E>>,
    {
        match self.step_timeout {
            Some(limit) => tokio::time::timeout(limit, step)
                .await
                .unwrap_or_else(|_| Err(on_timeout(limit))),
            None => step.await,
        }
    }
}

fn enter(visited: &mut Vec<Stage>, stage: Stage) {
    debug!(%stage, "entering stage");
    visited.push(stage);
}
