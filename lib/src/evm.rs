//! [`VerificationInvoker`] for verifier contracts deployed on an EVM node,
//! called through Foundry's `cast`.

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

use crate::calldata::Calldata;
use crate::command;
use crate::error::InvocationError;
use crate::invoker::{VerificationInvoker, VerifierHandle};

pub const DEFAULT_CAST: &str = "cast";
pub const DEFAULT_RPC_URL: &str = "http://127.0.0.1:8545";

static EVM_ADDRESS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^0x[0-9a-fA-F]{40}$").expect("static regex"));

/// `0x` followed by 40 hex digits, either case.
pub fn is_evm_address(address: &str) -> bool {
    EVM_ADDRESS.is_match(address)
}

/// Calls `verifyProof` on the contract at the handle's address.
#[derive(Clone, Debug)]
pub struct CastInvoker {
    program: String,
    rpc_url: String,
}

impl CastInvoker {
    pub fn new(rpc_url: impl Into<String>) -> Self {
        Self::with_program(DEFAULT_CAST, rpc_url)
    }

    pub fn with_program(program: impl Into<String>, rpc_url: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            rpc_url: rpc_url.into(),
        }
    }

    /// Arguments passed to `cast`, without the program name.
    pub fn call_args(&self, verifier: &VerifierHandle, args: &Calldata) -> Vec<String> {
        let mut argv = vec![
            "call".to_string(),
            verifier.as_str().to_string(),
            format!("{}(bool)", args.solidity_signature()),
        ];
        argv.extend(args.solidity_args());
        argv.push("--rpc-url".to_string());
        argv.push(self.rpc_url.clone());
        argv
    }

    pub fn program(&self) -> &str {
        &self.program
    }
}

impl Default for CastInvoker {
    fn default() -> Self {
        Self::new(DEFAULT_RPC_URL)
    }
}

#[async_trait]
impl VerificationInvoker for CastInvoker {
    async fn verify(&self, verifier: &VerifierHandle, args: &Calldata) -> Result<bool, InvocationError> {
        let argv = self.call_args(verifier, args);
        debug!(%verifier, signature = %args.solidity_signature(), "calling verifier contract");
        let stdout = command::run(&self.program, &argv).await?;
        parse_cast_bool(&stdout)
    }
}

/// Parse `cast call` output for a `bool` return: either the decoded
/// `true`/`false` or a raw 32-byte ABI word.
pub fn parse_cast_bool(output: &str) -> Result<bool, InvocationError> {
    let output = output.trim();
    match output {
        "true" => return Ok(true),
        "false" => return Ok(false),
        _ => {}
    }
    let unexpected = || InvocationError::UnexpectedOutput(output.to_string());
    let digits = output.strip_prefix("0x").ok_or_else(unexpected)?;
    let word = hex::decode(digits).map_err(|_| unexpected())?;
    match word.split_last() {
        Some((&last, rest)) if word.len() == 32 && rest.iter().all(|b| *b == 0) && last <= 1 => {
            Ok(last == 1)
        }
        _ => Err(unexpected()),
    }
}
