//! Verifier invocation collaborator.

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::calldata::Calldata;
use crate::error::InvocationError;

/// Opaque reference to a verification capability: a deployed contract
/// address, a verification key path, whatever the invoker understands.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VerifierHandle(String);

impl VerifierHandle {
    pub fn new(handle: impl Into<String>) -> Self {
        Self(handle.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for VerifierHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Calls a verifier entry point with formatted arguments.
///
/// `Ok(false)` means the verifier ran and rejected the proof. Anything that
/// kept the verifier from running is an `Err`.
#[async_trait]
pub trait VerificationInvoker: Send + Sync {
    async fn verify(&self, verifier: &VerifierHandle, args: &Calldata) -> Result<bool, InvocationError>;
}
