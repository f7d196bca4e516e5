//! zk-harness CLI Tool
//!
//! A command-line tool for running verification scenarios against snarkjs
//! Groth16 and PLONK proofs.
//!
//! ## Features
//! - Run scenario manifests (prove, normalize, format, verify)
//! - Normalize snarkjs JSON output
//! - Format proofs into verifier calldata
//! - Generate `cast call` commands for deployed verifiers
//!
//! ## Usage
//! ```bash
//! # Run every scenario in a manifest, concurrently
//! zk-harness run --manifest harness.json --parallel
//!
//! # Format a proof for a Groth16 verifier contract
//! zk-harness format --scheme groth16 --proof proof.json --signals public.json
//!
//! # Print the cast command that calls a deployed verifier
//! zk-harness call-args --scheme plonk -p proof.json -s public.json --address 0x5FbD...
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand};
use colored::*;
use serde_json::Value;
use tracing_subscriber::EnvFilter;

use zk_verifier_harness::evm::DEFAULT_RPC_URL;
use zk_verifier_harness::prelude::*;
use zk_verifier_harness::{is_evm_address, HarnessManifest, RunSummary, ScenarioKind, Slot, VerificationKeyJson, Verifier};

#[derive(Parser)]
#[command(name = "zk-harness")]
#[command(about = "Verification scenarios for snarkjs Groth16 and PLONK proofs", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the scenarios of a manifest
    Run {
        /// Path to the harness manifest
        #[arg(short, long)]
        manifest: PathBuf,

        /// Only run the scenario with this name
        #[arg(short, long)]
        scenario: Option<String>,

        /// Run scenarios concurrently
        #[arg(long)]
        parallel: bool,
    },

    /// Check a manifest without running it
    Validate {
        /// Path to the harness manifest
        #[arg(short, long)]
        manifest: PathBuf,
    },

    /// Normalize the numeric encodings of a snarkjs JSON file
    Normalize {
        /// Path to proof.json, public.json or any snarkjs output
        #[arg(short, long)]
        input: PathBuf,

        /// Pass unrecognised scalars through instead of failing
        #[arg(long)]
        lenient: bool,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Format calldata into verifier argument slots
    Format {
        /// Proof system: groth16 or plonk
        #[arg(long)]
        scheme: Scheme,

        /// Calldata text as printed by `snarkjs zkey export soliditycalldata`
        #[arg(short, long, conflicts_with_all = ["proof", "signals"])]
        calldata: Option<String>,

        /// Path to proof.json
        #[arg(short, long, requires = "signals", required_unless_present = "calldata")]
        proof: Option<PathBuf>,

        /// Path to public.json
        #[arg(short = 's', long, requires = "proof")]
        signals: Option<PathBuf>,
    },

    /// Generate the cast command that calls a deployed verifier
    CallArgs {
        /// Proof system: groth16 or plonk
        #[arg(long)]
        scheme: Scheme,

        /// Path to proof.json
        #[arg(short, long)]
        proof: PathBuf,

        /// Path to public.json
        #[arg(short = 's', long)]
        signals: PathBuf,

        /// Verifier contract address
        #[arg(short, long)]
        address: String,

        /// JSON-RPC endpoint
        #[arg(long, default_value = DEFAULT_RPC_URL)]
        rpc_url: String,
    },

    /// Show circuit info from verification key
    Info {
        /// Path to verification_key.json
        #[arg(short, long)]
        input: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run { manifest, scenario, parallel } => {
            run_manifest(&manifest, scenario.as_deref(), parallel).await?;
        }

        Commands::Validate { manifest } => {
            validate_manifest(&manifest).await?;
        }

        Commands::Normalize { input, lenient, output } => {
            normalize_file(&input, lenient, output.as_deref())?;
        }

        Commands::Format { scheme, calldata, proof, signals } => {
            format_calldata(scheme, calldata.as_deref(), proof.as_deref(), signals.as_deref()).await?;
        }

        Commands::CallArgs { scheme, proof, signals, address, rpc_url } => {
            generate_call_args(scheme, &proof, &signals, &address, &rpc_url)?;
        }

        Commands::Info { input } => {
            show_vk_info(&input)?;
        }
    }

    Ok(())
}

async fn run_manifest(path: &Path, only: Option<&str>, parallel: bool) -> anyhow::Result<()> {
    let manifest = HarnessManifest::load(path)
        .await
        .with_context(|| format!("failed to load manifest {}", path.display()))?;
    let plan = manifest.plan(only)?;
    tracing::debug!(manifest = %path.display(), circuits = manifest.circuits.len(), "manifest loaded");
    let orchestrator = manifest.orchestrator();

    println!(
        "{} {} scenario(s){}",
        "Running".cyan(),
        plan.len(),
        if parallel { " concurrently" } else { "" }
    );

    let summary = if parallel {
        orchestrator.run_concurrent(&plan).await
    } else {
        orchestrator.run_sequential(&plan).await
    };
    print_summary(&summary);

    if !summary.all_passed() {
        anyhow::bail!("{} of {} scenario(s) failed", summary.failed(), summary.reports.len());
    }
    Ok(())
}

fn print_summary(summary: &RunSummary) {
    println!();
    for report in &summary.reports {
        let stages: Vec<String> = report.visited.iter().map(ToString::to_string).collect();
        match &report.outcome {
            Outcome::Passed => {
                println!("  {} {} [{}]", "✓".green(), report.name, report.scheme);
            }
            Outcome::WrongVerdict { expected, actual } => {
                println!(
                    "  {} {} [{}]: verifier returned {}, expected {}",
                    "✗".red(),
                    report.name,
                    report.scheme,
                    actual,
                    expected
                );
            }
            Outcome::Failed { stage, kind, message } => {
                println!(
                    "  {} {} [{}]: {} during {}: {}",
                    "✗".red(),
                    report.name,
                    report.scheme,
                    kind.to_string().yellow(),
                    stage,
                    message
                );
            }
        }
        println!("      {}", stages.join(" → ").dimmed());
    }
    println!();

    let line = format!("{} passed, {} failed", summary.passed(), summary.failed());
    if summary.all_passed() {
        println!("{}", line.green().bold());
    } else {
        println!("{}", line.red().bold());
    }
}

async fn validate_manifest(path: &Path) -> anyhow::Result<()> {
    println!("{}", "Validating manifest...".cyan());

    let manifest = HarnessManifest::load(path).await?;
    manifest.validate()?;

    for (id, artifacts) in &manifest.circuits {
        let status = match artifacts.ensure_present() {
            Ok(()) => "✓".green(),
            Err(_) => "⚠".yellow(),
        };
        println!("  {} Circuit {} ({})", status, id, artifacts.scheme);
    }
    for scenario in manifest.scenarios(None)? {
        let kind = match scenario.kind {
            ScenarioKind::ValidProof { circuit, .. } => format!("prove {circuit}"),
            ScenarioKind::InvalidProof { public_inputs } => format!("invalid proof, {public_inputs} input(s)"),
        };
        println!("  {} Scenario {} [{}]: {}", "✓".green(), scenario.name, scenario.scheme, kind);
    }

    println!();
    println!("{}", "Manifest is valid!".green().bold());
    Ok(())
}

fn read_json(path: &Path) -> anyhow::Result<Value> {
    let content =
        fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("failed to parse {}", path.display()))
}

fn normalize_file(input: &Path, lenient: bool, output: Option<&Path>) -> anyhow::Result<()> {
    let policy = if lenient { NumericPolicy::Lenient } else { NumericPolicy::Strict };
    let normalized = Normalizer::new(policy).normalize(&read_json(input)?)?;
    let output_str = serde_json::to_string_pretty(&normalized.to_value())?;

    if let Some(out_path) = output {
        fs::write(out_path, &output_str)?;
        println!("{} {}", "Saved to:".green(), out_path.display());
    } else {
        println!("{}", output_str);
    }

    Ok(())
}

fn load_proof(proof: &Path, signals: &Path) -> anyhow::Result<(Normalized, Normalized)> {
    let normalizer = Normalizer::default();
    Ok((
        normalizer.normalize(&read_json(proof)?)?,
        normalizer.normalize(&read_json(signals)?)?,
    ))
}

async fn format_calldata(
    scheme: Scheme,
    calldata: Option<&str>,
    proof: Option<&Path>,
    signals: Option<&Path>,
) -> anyhow::Result<()> {
    let formatter = CalldataFormatter::default();
    let args = match (calldata, proof, signals) {
        (Some(text), _, _) => formatter.parse(scheme, text)?,
        (None, Some(proof), Some(signals)) => {
            let (proof, signals) = load_proof(proof, signals)?;
            formatter.format(&LocalExport, scheme, &proof, &signals).await?
        }
        _ => anyhow::bail!("either --calldata or both --proof and --signals are required"),
    };

    println!("{}", args.solidity_signature().cyan().bold());
    println!();
    for (i, (slot, value)) in args.slots().iter().zip(args.solidity_args()).enumerate() {
        let shape = match slot {
            Slot::Vector(n) => format!("uint256[{n}]"),
            Slot::Matrix(rows, cols) => format!("uint256[{cols}][{rows}]"),
            Slot::Bytes(len) => format!("bytes ({len} bytes)"),
        };
        println!("  {} {}: {}", format!("arg{i}").yellow(), shape, value);
    }

    Ok(())
}

/// Validate an EVM contract address (0x followed by 40 hex digits)
fn validate_address(address: &str) -> anyhow::Result<()> {
    if !is_evm_address(address) {
        anyhow::bail!("Invalid contract address '{}'. Expected 0x followed by 40 hex digits.", address);
    }
    Ok(())
}

fn generate_call_args(
    scheme: Scheme,
    proof_path: &Path,
    signals_path: &Path,
    address: &str,
    rpc_url: &str,
) -> anyhow::Result<()> {
    validate_address(address)?;

    let (proof, signals) = load_proof(proof_path, signals_path)?;
    let args = Calldata::from_proof(scheme, &proof, &signals)?;
    let invoker = CastInvoker::new(rpc_url);
    let argv = invoker.call_args(&VerifierHandle::new(address), &args);

    let quoted: Vec<String> = argv
        .iter()
        .map(|arg| {
            if arg.contains(['(', '[', ' ']) {
                format!("'{}'", arg)
            } else {
                arg.clone()
            }
        })
        .collect();

    println!("{}", "cast call command:".cyan().bold());
    println!();
    println!("{} {}", invoker.program(), quoted.join(" "));
    println!();
    println!("{}", "Expected output: true".green());

    Ok(())
}

fn show_vk_info(input: &Path) -> anyhow::Result<()> {
    let content = fs::read_to_string(input)?;
    let vk: VerificationKeyJson = serde_json::from_str(&content)?;

    println!("{}", "=== Verification Key Info ===".cyan().bold());
    println!();
    println!("Protocol:       {}", vk.protocol.as_deref().unwrap_or("unknown"));
    println!("Curve:          {}", vk.curve.as_deref().unwrap_or("unknown"));
    println!("Public inputs:  {}", vk.ic.len().saturating_sub(1));
    println!("IC points:      {}", vk.ic.len());
    println!();

    match Verifier::from_json(&vk) {
        Ok(verifier) => {
            let signature = Calldata::invalid(Scheme::Groth16, verifier.vk.num_inputs()).solidity_signature();
            println!("{} all points on BN254", "✓".green());
            println!("Verifier entry point: {}", signature);
        }
        Err(e) => {
            println!("{} {}", "✗".red(), e);
            anyhow::bail!("verification key is not usable");
        }
    }

    Ok(())
}
