//! Scenario runs against in-process collaborators.

mod common;

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;

use common::{groth16_fixture, plonk_fixture, witness, Behaviour, FakeBackend, RecordingInvoker, UnreachableInvoker};
use num_bigint::BigUint;
use zk_verifier_harness::prelude::*;
use zk_verifier_harness::{CalldataPath, ProofBlob, Slot};

const ALL_STAGES: [Stage; 6] = [
    Stage::Init,
    Stage::Proving,
    Stage::Normalizing,
    Stage::Formatting,
    Stage::Invoking,
    Stage::Done,
];

fn local_context(backend: FakeBackend, key: &std::path::Path) -> ScenarioContext {
    ScenarioContext {
        backend: Arc::new(backend),
        invoker: Arc::new(LocalGroth16Invoker),
        verifier: VerifierHandle::new(key.display().to_string()),
    }
}

fn hello_world() -> Scenario {
    Scenario::valid(
        "hello world",
        Scheme::Groth16,
        "HelloWorld".into(),
        witness(&[("a", 1), ("b", 2)]),
    )
}

#[tokio::test]
async fn test_valid_proof_is_accepted() {
    let dir = tempfile::tempdir().unwrap();
    let fixture = groth16_fixture(&[2]);
    let key = fixture.write_key(dir.path(), "verification_key.json");
    let ctx = local_context(FakeBackend::honest(fixture.bundle()), &key);

    for path in [CalldataPath::Structured, CalldataPath::Exported] {
        let orchestrator = Orchestrator::default().with_calldata_path(path);
        let report = orchestrator.run(&ctx, &hello_world()).await;
        assert_eq!(report.outcome, Outcome::Passed, "{path:?}");
        assert_eq!(report.visited, ALL_STAGES);
    }
}

#[tokio::test]
async fn test_hex_encoded_backend_output_is_accepted() {
    let dir = tempfile::tempdir().unwrap();
    let fixture = groth16_fixture(&[6]);
    let key = fixture.write_key(dir.path(), "verification_key.json");
    let mut bundle = fixture.bundle();
    // native integer and hex encodings of the same public signal
    bundle.public_signals = json!([6]);
    let ctx = local_context(FakeBackend::honest(bundle.clone()), &key);
    assert!(Orchestrator::default().run(&ctx, &hello_world()).await.passed());

    bundle.public_signals = json!(["0x6"]);
    let ctx = local_context(FakeBackend::honest(bundle), &key);
    assert!(Orchestrator::default().run(&ctx, &hello_world()).await.passed());
}

#[tokio::test]
async fn test_valid_plonk_proof_reaches_verifier_in_order() {
    let fixture = plonk_fixture(&[6, 7]);
    let expected = Calldata::Plonk {
        proof: ProofBlob::new(fixture.blob.clone()),
        inputs: vec![BigUint::from(6u8), BigUint::from(7u8)],
    };
    let scenario = Scenario::valid(
        "plonk multiplier",
        Scheme::Plonk,
        "PlonkMultiplier3".into(),
        witness(&[("in1", 1), ("in2", 2), ("in3", 3)]),
    );

    for path in [CalldataPath::Structured, CalldataPath::Exported] {
        let recorder = Arc::new(RecordingInvoker::default());
        let ctx = ScenarioContext {
            backend: Arc::new(FakeBackend::honest(fixture.bundle.clone())),
            invoker: recorder.clone(),
            verifier: VerifierHandle::new("0x5FbDB2315678afecb367f032d93F642f64180aa3"),
        };

        let report = Orchestrator::default()
            .with_calldata_path(path)
            .run(&ctx, &scenario)
            .await;
        assert_eq!(report.outcome, Outcome::Passed, "{path:?}");
        assert_eq!(report.visited, ALL_STAGES);

        let calls = recorder.calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        let (handle, args) = &calls[0];
        assert_eq!(handle, &ctx.verifier);
        assert_eq!(args, &expected, "{path:?}");
        assert_eq!(args.slots(), vec![Slot::Bytes(25 * 32), Slot::Vector(2)]);
        assert_eq!(args.solidity_signature(), "verifyProof(bytes,uint256[])");
    }
}

#[tokio::test]
async fn test_invalid_proof_is_rejected_without_error() {
    let dir = tempfile::tempdir().unwrap();
    let key = groth16_fixture(&[2]).write_key(dir.path(), "verification_key.json");
    let ctx = local_context(FakeBackend::with(groth16_fixture(&[2]).bundle(), Behaviour::MissingArtifact), &key);

    let report = Orchestrator::default()
        .run(&ctx, &Scenario::invalid("zeros", Scheme::Groth16, 1))
        .await;
    assert_eq!(report.outcome, Outcome::Passed);
    assert_eq!(
        report.visited,
        vec![Stage::Init, Stage::Formatting, Stage::Invoking, Stage::Done]
    );
}

#[tokio::test]
async fn test_mismatched_public_signal_is_wrong_verdict() {
    let dir = tempfile::tempdir().unwrap();
    let fixture = groth16_fixture(&[2]);
    let key = fixture.write_key(dir.path(), "verification_key.json");
    let mut bundle = fixture.bundle();
    bundle.public_signals = json!(["3"]);
    let ctx = local_context(FakeBackend::honest(bundle), &key);

    let report = Orchestrator::default().run(&ctx, &hello_world()).await;
    assert_eq!(
        report.outcome,
        Outcome::WrongVerdict {
            expected: true,
            actual: false
        }
    );
}

#[tokio::test]
async fn test_backend_failure_aborts_before_formatting() {
    let dir = tempfile::tempdir().unwrap();
    let fixture = groth16_fixture(&[2]);
    let key = fixture.write_key(dir.path(), "verification_key.json");
    let ctx = local_context(FakeBackend::with(fixture.bundle(), Behaviour::MissingArtifact), &key);

    let report = Orchestrator::default().run(&ctx, &hello_world()).await;
    assert_eq!(report.visited, vec![Stage::Init, Stage::Proving]);
    assert_eq!(report.error_kind(), Some(ErrorKind::BackendFailure));
}

#[tokio::test]
async fn test_malformed_backend_output_aborts_at_normalizing() {
    let dir = tempfile::tempdir().unwrap();
    let fixture = groth16_fixture(&[2]);
    let key = fixture.write_key(dir.path(), "verification_key.json");
    let mut bundle = fixture.bundle();
    bundle.proof["pi_a"][0] = json!("12ab");
    let ctx = local_context(FakeBackend::honest(bundle), &key);

    let report = Orchestrator::default().run(&ctx, &hello_world()).await;
    match report.outcome {
        Outcome::Failed { stage, kind, message } => {
            assert_eq!(stage, Stage::Normalizing);
            assert_eq!(kind, ErrorKind::MalformedNumericEncoding);
            assert!(message.contains("/pi_a/0"), "{message}");
        }
        other => panic!("unexpected outcome {other:?}"),
    }
}

#[tokio::test]
async fn test_short_export_is_arity_mismatch() {
    let dir = tempfile::tempdir().unwrap();
    let fixture = groth16_fixture(&[2]);
    let key = fixture.write_key(dir.path(), "verification_key.json");
    let ctx = local_context(FakeBackend::with(fixture.bundle(), Behaviour::ShortExport), &key);

    let report = Orchestrator::default()
        .with_calldata_path(CalldataPath::Exported)
        .run(&ctx, &hello_world())
        .await;
    assert_eq!(report.error_kind(), Some(ErrorKind::ArityMismatch));
    assert_eq!(report.visited.last(), Some(&Stage::Formatting));
}

#[tokio::test]
async fn test_invocation_failure_is_not_false() {
    let fixture = groth16_fixture(&[2]);
    let ctx = ScenarioContext {
        backend: Arc::new(FakeBackend::honest(fixture.bundle())),
        invoker: Arc::new(UnreachableInvoker),
        verifier: VerifierHandle::new("0x5FbDB2315678afecb367f032d93F642f64180aa3"),
    };

    // an invalid proof expects `false`; an unreachable verifier must still fail the scenario
    let report = Orchestrator::default()
        .run(&ctx, &Scenario::invalid("zeros", Scheme::Plonk, 1))
        .await;
    assert!(!report.passed());
    assert_eq!(report.error_kind(), Some(ErrorKind::InvocationFailure));
    assert_eq!(report.visited.last(), Some(&Stage::Invoking));
}

#[tokio::test]
async fn test_missing_verification_key_is_invocation_failure() {
    let fixture = groth16_fixture(&[2]);
    let ctx = local_context(
        FakeBackend::honest(fixture.bundle()),
        std::path::Path::new("/nonexistent/verification_key.json"),
    );
    let report = Orchestrator::default().run(&ctx, &hello_world()).await;
    assert_eq!(report.error_kind(), Some(ErrorKind::InvocationFailure));
}

#[tokio::test]
async fn test_hung_backend_times_out() {
    let dir = tempfile::tempdir().unwrap();
    let fixture = groth16_fixture(&[2]);
    let key = fixture.write_key(dir.path(), "verification_key.json");
    let ctx = local_context(FakeBackend::with(fixture.bundle(), Behaviour::Hang), &key);

    let report = Orchestrator::default()
        .with_step_timeout(Duration::from_millis(50))
        .run(&ctx, &hello_world())
        .await;
    match report.outcome {
        Outcome::Failed { stage, kind, message } => {
            assert_eq!(stage, Stage::Proving);
            assert_eq!(kind, ErrorKind::BackendFailure);
            assert!(message.contains("timed out"), "{message}");
        }
        other => panic!("unexpected outcome {other:?}"),
    }
}

#[tokio::test]
async fn test_independent_scenarios_run_concurrently() {
    let dir = tempfile::tempdir().unwrap();
    let mut plan = Vec::new();
    for (i, public) in [vec![2u64], vec![6], vec![1, 2, 3]].into_iter().enumerate() {
        let fixture = groth16_fixture(&public);
        let key = fixture.write_key(dir.path(), &format!("vk_{i}.json"));
        let scenario = Scenario::valid(
            format!("circuit {i}"),
            Scheme::Groth16,
            CircuitId::new(format!("Circuit{i}")),
            witness(&[("in1", 1)]),
        );
        plan.push((local_context(FakeBackend::honest(fixture.bundle()), &key), scenario));
    }
    let key = groth16_fixture(&[2]).write_key(dir.path(), "vk_invalid.json");
    plan.push((
        local_context(FakeBackend::honest(groth16_fixture(&[2]).bundle()), &key),
        Scenario::invalid("zeros", Scheme::Groth16, 1),
    ));

    let orchestrator = Orchestrator::default();
    let summary = orchestrator.run_concurrent(&plan).await;
    assert!(summary.all_passed(), "{:?}", summary.reports);
    assert_eq!(summary.passed(), 4);
    let names: Vec<&str> = summary.reports.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(names, ["circuit 0", "circuit 1", "circuit 2", "zeros"]);

    let sequential = orchestrator.run_sequential(&plan).await;
    assert!(sequential.all_passed());
}
