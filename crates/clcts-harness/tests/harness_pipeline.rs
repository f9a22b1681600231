//! End-to-end runs of the harness pipeline against the mock device.

use std::cell::Cell;
use std::rc::Rc;

use clap::Parser;
use clcts_harness::mock::{MockDevice, MockProvider};
use clcts_harness::{
    test_def, ComputeDevice, ConfigBuilder, ContextMode, Harness, HarnessArgs, HarnessConfig,
    HarnessError, HarnessOutcome, Reporter, SelectionError, TestDefinition, TestEnv, TestRegistry,
    TestStatus, Version,
};
use clcts_harness::exit::{EXIT_SUCCESS, EXIT_TEST_FAILURE};
use rand::Rng;

type Env<'a> = TestEnv<'a, MockDevice>;

fn test_always_passes(_env: &mut Env<'_>) -> i32 {
    0
}

fn test_always_fails(_env: &mut Env<'_>) -> i32 {
    -1
}

fn test_needs_session(env: &mut Env<'_>) -> i32 {
    if env.session().is_some() {
        0
    } else {
        -1
    }
}

fn test_new_api(_env: &mut Env<'_>) -> i32 {
    panic!("must not run on a 1.2 device");
}

fn test_fp64(_env: &mut Env<'_>) -> i32 {
    0
}

fn registry() -> TestRegistry<MockDevice> {
    let mut registry = TestRegistry::new();
    registry.register(test_def!(test_always_passes)).unwrap();
    registry.register(test_def!(test_always_fails)).unwrap();
    registry.register(test_def!(test_needs_session)).unwrap();
    registry.register(test_def!(test_new_api, version = (2, 0))).unwrap();
    registry.register(test_def!(test_fp64, extension = "cl_khr_fp64")).unwrap();
    registry.register(TestDefinition::unimplemented("image_copy")).unwrap();
    registry
}

fn config(argv: &[&str]) -> HarnessConfig {
    let args = HarnessArgs::parse_from(std::iter::once("clcts").chain(argv.iter().copied()));
    ConfigBuilder::new().with_args(&args).build().unwrap()
}

struct Run {
    result: Result<HarnessOutcome, HarnessError>,
    stdout: String,
}

fn run_with(harness: Harness<'_, MockDevice>, device: MockDevice, config: &HarnessConfig) -> Run {
    let provider = MockProvider::new(device);
    let mut reporter = Reporter::new(Vec::new());
    let result = harness.run(config, &provider, &mut reporter);
    Run { result, stdout: String::from_utf8(reporter.into_inner()).unwrap() }
}

fn run(registry: &TestRegistry<MockDevice>, device: MockDevice, argv: &[&str]) -> Run {
    run_with(Harness::new("mock", registry), device, &config(argv))
}

// ── dispatch through the full pipeline ─────────────────────────────────────

#[test]
fn version_gated_test_is_skipped_without_running() {
    let registry = registry();
    let out = run(&registry, MockDevice::new(Version::V1_2), &["new_api"]);
    let outcome = out.result.unwrap();

    assert_eq!(outcome.exit_code, EXIT_SUCCESS);
    assert_eq!(outcome.summary.skipped, 1);
    assert!(out.stdout.contains(
        "new_api skipped (requires at least OpenCL version 2.0, but the device reports OpenCL version 1.2)"
    ));
}

#[test]
fn one_failure_makes_the_run_fail() {
    let registry = registry();
    let out = run(&registry, MockDevice::new(Version::V1_2), &["always_passes", "always_fails"]);
    let outcome = out.result.unwrap();

    assert_eq!(outcome.exit_code, EXIT_TEST_FAILURE);
    assert_eq!((outcome.summary.passed, outcome.summary.failed), (1, 1));
    assert!(out.stdout.contains("FAILED 1 of 2 tests."));
    assert!(out.stdout.ends_with("Summary: total=2 passed=1 failed=1 skipped=0\n"));
}

#[test]
fn running_everything_skips_unmet_requirements_and_missing_bodies() {
    let registry = registry();
    let out = run(&registry, MockDevice::new(Version::V1_2), &[]);
    let outcome = out.result.unwrap();

    let statuses: Vec<_> = outcome.records.iter().map(|r| (r.name.as_str(), r.status)).collect();
    assert_eq!(
        statuses,
        [
            ("always_passes", TestStatus::Pass),
            ("always_fails", TestStatus::Fail),
            ("needs_session", TestStatus::Pass),
            ("new_api", TestStatus::Skip),
            ("fp64", TestStatus::Skip),
            ("image_copy", TestStatus::Skip),
        ]
    );
    assert!(out.stdout.contains("image_copy test currently not implemented"));
    assert_eq!(outcome.summary.total, registry.len());
}

#[test]
fn extensions_unlock_tests() {
    let registry = registry();
    let device = MockDevice::new(Version::V1_2).with_extensions(&["cl_khr_fp64"]);
    let outcome = run(&registry, device, &["fp64"]).result.unwrap();
    assert_eq!(outcome.summary.passed, 1);
}

#[test]
fn none_context_mode_gives_tests_no_session() {
    let registry = registry();
    let out = run(
        &registry,
        MockDevice::new(Version::V1_2),
        &["needs_session", "--context-mode", "none"],
    );
    assert_eq!(out.result.unwrap().summary.failed, 1);
}

#[test]
fn empty_selection_exits_cleanly() {
    let registry = registry();
    let out = run(&registry, MockDevice::new(Version::V1_2), &["-x", "*"]);
    let outcome = out.result.unwrap();

    assert_eq!(outcome.exit_code, EXIT_SUCCESS);
    assert_eq!(outcome.summary.total, 0);
    assert!(out.stdout.ends_with("Summary: total=0 passed=0 failed=0 skipped=0\n"));
}

#[test]
fn list_mode_prints_names_without_acquiring_a_device() {
    let registry = registry();
    let provider = MockProvider::empty();
    let mut reporter = Reporter::new(Vec::new());
    let outcome = Harness::new("mock", &registry)
        .run(&config(&["--list"]), &provider, &mut reporter)
        .unwrap();

    assert_eq!(outcome.exit_code, EXIT_SUCCESS);
    assert!(provider.requests().is_empty());
    let stdout = String::from_utf8(reporter.into_inner()).unwrap();
    assert!(stdout.contains("\tnew_api (requires OpenCL 2.0)"));
}

// ── harness-fatal errors ───────────────────────────────────────────────────

#[test]
fn selection_errors_stop_before_any_test_runs() {
    let registry = registry();
    let provider = MockProvider::new(MockDevice::new(Version::V1_2));
    let mut reporter = Reporter::new(Vec::new());

    let err = Harness::new("mock", &registry)
        .run(&config(&["image_copy"]), &provider, &mut reporter)
        .unwrap_err();
    assert!(matches!(
        err,
        HarnessError::Selection(SelectionError::MissingImplementation(ref name)) if name == "image_copy"
    ));
    assert!(provider.requests().is_empty());
    assert!(reporter.into_inner().is_empty());
}

#[test]
fn missing_platforms_are_fatal() {
    let registry = registry();
    let mut reporter = Reporter::new(Vec::new());
    let err = Harness::new("mock", &registry)
        .run(&config(&[]), &MockProvider::empty(), &mut reporter)
        .unwrap_err();
    assert!(matches!(err, HarnessError::Device(_)));
}

#[test]
fn device_request_follows_configuration() {
    let registry = registry();
    let provider = MockProvider::new(MockDevice::new(Version::V1_2));
    let mut reporter = Reporter::new(Vec::new());
    Harness::new("mock", &registry)
        .run(
            &config(&["always_passes", "-t", "gpu", "--platform-index", "0", "--device-index", "0"]),
            &provider,
            &mut reporter,
        )
        .unwrap();

    let requests = provider.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].device_type, clcts_harness::DeviceType::Gpu);
    let stdout = String::from_utf8(reporter.into_inner()).unwrap();
    assert!(stdout.contains(
        "Requesting gpu device based on command line for platform index 0 and device index 0"
    ));
}

// ── device capability check ────────────────────────────────────────────────

fn refuse_with_skip(_device: &MockDevice) -> TestStatus {
    TestStatus::Skip
}

fn refuse_with_fail(_device: &MockDevice) -> TestStatus {
    TestStatus::Fail
}

fn accept_1_2(device: &MockDevice) -> TestStatus {
    if device.info().version >= Version::V1_2 {
        TestStatus::Pass
    } else {
        TestStatus::Fail
    }
}

#[test]
fn device_check_skip_records_every_test_and_exits_zero() {
    let registry = registry();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("results.json");
    let mut config = config(&[]);
    config.report.results_file = Some(path.clone());

    let harness = Harness::new("mock", &registry).with_device_check(refuse_with_skip);
    let out = run_with(harness, MockDevice::new(Version::V1_2), &config);
    let outcome = out.result.unwrap();

    assert_eq!(outcome.exit_code, EXIT_SUCCESS);
    assert_eq!(outcome.summary.skipped, registry.len());
    assert!(out.stdout.contains("Test skipped while initialization\nSKIPPED 6 of 6 tests.\n"));

    let json: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    let results = json["results"].as_object().unwrap();
    assert_eq!(results.len(), registry.len());
    assert!(results.values().all(|v| v == "skip"));
}

#[test]
fn device_check_fail_exits_non_zero() {
    let registry = registry();
    let harness = Harness::new("mock", &registry).with_device_check(refuse_with_fail);
    let out = run_with(harness, MockDevice::new(Version::V1_2), &config(&[]));
    let outcome = out.result.unwrap();

    assert_eq!(outcome.exit_code, EXIT_TEST_FAILURE);
    assert_eq!(outcome.summary.failed, registry.len());
    assert!(out.stdout.contains("Test failed while initialization\nFAILED 6 of 6 tests.\n"));
    assert!(!out.stdout.contains("always_passes..."));
}

#[test]
fn passing_device_check_runs_tests() {
    let registry = registry();
    let harness = Harness::new("mock", &registry).with_device_check(accept_1_2);
    let out = run_with(harness, MockDevice::new(Version::V1_2), &config(&["always_passes"]));
    assert_eq!(out.result.unwrap().summary.passed, 1);
}

// ── results file ───────────────────────────────────────────────────────────

#[test]
fn results_file_lists_selected_tests_in_registry_order() {
    let registry = registry();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("out.json");
    let path_arg = path.to_str().unwrap();

    run(
        &registry,
        MockDevice::new(Version::V1_2),
        &["new_api", "always_fails", "always_passes", "--results-file", path_arg],
    )
    .result
    .unwrap();

    let text = std::fs::read_to_string(&path).unwrap();
    let json: serde_json::Value = serde_json::from_str(&text).unwrap();
    assert_eq!(json["cmd"], "mock");
    assert_eq!(
        json["results"],
        serde_json::json!({"always_passes": "pass", "always_fails": "fail", "new_api": "skip"})
    );
    let passes = text.find("always_passes").unwrap();
    let fails = text.find("always_fails").unwrap();
    let new_api = text.find("new_api").unwrap();
    assert!(passes < fails && fails < new_api);
}

#[test]
fn unwritable_results_file_is_an_error() {
    let registry = registry();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("no-such-dir").join("out.json");
    let out = run(
        &registry,
        MockDevice::new(Version::V1_2),
        &["always_passes", "--results-file", path.to_str().unwrap()],
    );
    assert!(matches!(out.result, Err(HarnessError::Results { .. })));
}

// ── seeding ────────────────────────────────────────────────────────────────

fn seeded_registry(seen: Rc<Cell<u64>>) -> TestRegistry<MockDevice> {
    let mut registry = TestRegistry::new();
    registry
        .register(TestDefinition::from_closure("first", |env: &mut Env<'_>| {
            let _: u64 = env.rng().gen();
            TestStatus::Pass
        }))
        .unwrap();
    registry
        .register(TestDefinition::from_closure("second", move |env: &mut Env<'_>| {
            seen.set(env.rng().gen());
            TestStatus::Pass
        }))
        .unwrap();
    registry
}

fn second_draw(argv: &[&str]) -> u64 {
    let seen = Rc::new(Cell::new(0));
    let registry = seeded_registry(Rc::clone(&seen));
    run(&registry, MockDevice::new(Version::V1_2), argv).result.unwrap();
    seen.get()
}

#[test]
fn same_seed_reproduces_the_same_streams() {
    assert_eq!(second_draw(&["--seed", "9"]), second_draw(&["--seed", "9"]));
    assert_ne!(second_draw(&["--seed", "9"]), second_draw(&["--seed", "10"]));
}

#[test]
fn reseeding_makes_a_test_independent_of_earlier_tests() {
    let alone = second_draw(&["second", "--seed", "4", "--reseed"]);
    let after_first = second_draw(&["--seed", "4", "--reseed"]);
    assert_eq!(alone, after_first);

    let shared_alone = second_draw(&["second", "--seed", "4"]);
    let shared_after_first = second_draw(&["--seed", "4"]);
    assert_ne!(shared_alone, shared_after_first);
}

#[test]
fn randomize_announces_its_seed() {
    let registry = registry();
    let out = run(&registry, MockDevice::new(Version::V1_2), &["always_passes", "--randomize"]);
    assert!(out.stdout.starts_with("Random seed: "));
}

#[test]
fn shared_mode_opens_one_session() {
    let registry = registry();
    let device = MockDevice::new(Version::V1_2);
    let probe = device.clone();
    let config = config(&["always_passes", "needs_session"]);
    assert_eq!(config.run.context_mode, ContextMode::Shared);
    run_with(Harness::new("mock", &registry), device, &config).result.unwrap();
    assert_eq!(probe.sessions_opened(), 1);
}
