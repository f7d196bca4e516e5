//! Error types for the harness.
//!
//! Every failure that aborts a scenario maps to one of four kinds:
//! malformed numeric encodings, calldata arity mismatches, proving backend
//! failures and verifier invocation failures. None of them is ever folded
//! into a `false` verification result.

use std::fmt;
use std::io;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::calldata::Scheme;

/// Failure reported by a [`ProvingBackend`](crate::backend::ProvingBackend).
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("unknown circuit `{0}`")]
    UnknownCircuit(String),
    #[error("missing circuit artifact: {}", .0.display())]
    MissingArtifact(PathBuf),
    #[error("`{program}` exited with {status}: {stderr}")]
    Process {
        program: String,
        status: String,
        stderr: String,
    },
    #[error("backend timed out after {0:?}")]
    Timeout(Duration),
    #[error("backend produced invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("backend io error: {0}")]
    Io(#[from] io::Error),
    #[error("calldata export failed: {0}")]
    Export(String),
}

/// Failure reported by a [`VerificationInvoker`](crate::invoker::VerificationInvoker).
#[derive(Debug, Error)]
pub enum InvocationError {
    #[error("verifier expects {expected} public inputs, got {actual}")]
    Arity { expected: usize, actual: usize },
    #[error("verifier does not support {0} calldata")]
    UnsupportedScheme(Scheme),
    #[error("invalid verification key: {0}")]
    VerificationKey(String),
    #[error("`{program}` exited with {status}: {stderr}")]
    Process {
        program: String,
        status: String,
        stderr: String,
    },
    #[error("unexpected verifier output: {0:?}")]
    UnexpectedOutput(String),
    #[error("verifier timed out after {0:?}")]
    Timeout(Duration),
    #[error("verifier io error: {0}")]
    Io(#[from] io::Error),
    #[error("{0}")]
    Other(String),
}

#[derive(Debug, Error)]
pub enum HarnessError {
    #[error("malformed numeric encoding at {path}: {value}")]
    MalformedNumericEncoding { path: String, value: String },
    #[error("{scheme} calldata needs at least {expected} tokens, got {actual}")]
    ArityMismatch {
        scheme: Scheme,
        expected: usize,
        actual: usize,
    },
    #[error("proving backend failure: {0}")]
    BackendFailure(#[from] BackendError),
    #[error("verifier invocation failure: {0}")]
    InvocationFailure(#[from] InvocationError),
    #[error("manifest error: {0}")]
    Manifest(String),
    #[error("io error: {0}")]
    Io(#[from] io::Error),
}

impl HarnessError {
    pub(crate) fn malformed(path: impl Into<String>, value: impl fmt::Display) -> Self {
        Self::MalformedNumericEncoding {
            path: path.into(),
            value: value.to_string(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::MalformedNumericEncoding { .. } => ErrorKind::MalformedNumericEncoding,
            Self::ArityMismatch { .. } => ErrorKind::ArityMismatch,
            Self::BackendFailure(_) => ErrorKind::BackendFailure,
            Self::InvocationFailure(_) => ErrorKind::InvocationFailure,
            Self::Manifest(_) | Self::Io(_) => ErrorKind::Configuration,
        }
    }
}

/// Flat classification of [`HarnessError`], attached to failed scenario reports.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    MalformedNumericEncoding,
    ArityMismatch,
    BackendFailure,
    InvocationFailure,
    Configuration,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::MalformedNumericEncoding => "MalformedNumericEncodingError",
            Self::ArityMismatch => "ArityMismatchError",
            Self::BackendFailure => "BackendFailureError",
            Self::InvocationFailure => "InvocationFailureError",
            Self::Configuration => "ConfigurationError",
        };
        f.write_str(name)
    }
}

pub type HarnessResult<T> = Result<T, HarnessError>;
