//! The sequential dispatch loop.

use std::fmt;
use std::io::Write;
use std::str::FromStr;
use std::time::{Duration, Instant};

use clcts_common::QueueProperties;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, warn};

use crate::context::{RunState, TestEnv};
use crate::device::{ComputeDevice, DeviceSession};
use crate::error::HarnessError;
use crate::registry::{TestCase, TestRegistry};
use crate::report::Reporter;
use crate::selection::SelectionMask;
use crate::status::TestStatus;

/// Where tests get their context and queue from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ContextMode {
    /// One session for the whole run, created after device acquisition.
    #[default]
    Shared,
    /// A fresh session per test, finished and released after it.
    PerTest,
    /// No session; tests only see the device.
    None,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown context mode `{0}` (expected shared, per-test or none)")]
pub struct ContextModeParseError(String);

impl ContextMode {
    pub const fn as_str(self) -> &'static str {
        match self {
            ContextMode::Shared => "shared",
            ContextMode::PerTest => "per-test",
            ContextMode::None => "none",
        }
    }
}

impl fmt::Display for ContextMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ContextMode {
    type Err = ContextModeParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "shared" => Ok(ContextMode::Shared),
            "per-test" | "per_test" => Ok(ContextMode::PerTest),
            "none" => Ok(ContextMode::None),
            _ => Err(ContextModeParseError(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatchOptions {
    pub num_elements: usize,
    pub context_mode: ContextMode,
    pub queue_properties: QueueProperties,
}

/// Outcome of one dispatched test.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestRecord {
    pub index: usize,
    pub name: String,
    pub status: TestStatus,
    pub elapsed: Duration,
}

pub struct Dispatcher<'r, D: ComputeDevice> {
    registry: &'r TestRegistry<D>,
    options: DispatchOptions,
}

impl<'r, D: ComputeDevice> Dispatcher<'r, D> {
    pub fn new(registry: &'r TestRegistry<D>, options: DispatchOptions) -> Self {
        Self { registry, options }
    }

    /// Run every selected test once, in registry order.
    ///
    /// Only a failure to create the shared session aborts the loop; every
    /// other problem is recorded against the test it happened in.
    pub fn run<W: Write>(
        &self,
        device: &D,
        mask: &SelectionMask,
        state: &mut RunState,
        reporter: &mut Reporter<W>,
    ) -> Result<Vec<TestRecord>, HarnessError> {
        debug_assert_eq!(mask.len(), self.registry.len());

        let shared = match self.options.context_mode {
            ContextMode::Shared if mask.count_selected() > 0 => Some(
                device
                    .open_session(self.options.queue_properties)
                    .map_err(HarnessError::SharedSession)?,
            ),
            _ => None,
        };

        let mut records = Vec::with_capacity(mask.count_selected());
        for (index, test) in self.registry.iter().enumerate() {
            if !mask.is_selected(index) {
                continue;
            }
            let started = Instant::now();
            let status = self.run_one(index, test, device, shared.as_ref(), state, reporter);
            let elapsed = started.elapsed();
            debug!("{} finished in {:.3}s", test.name(), elapsed.as_secs_f64());
            state.record(status);
            records.push(TestRecord { index, name: test.name().to_string(), status, elapsed });
        }

        if let Some(session) = &shared {
            if let Err(err) = session.finish() {
                warn!("finishing the shared queue failed: {err}");
            }
        }
        Ok(records)
    }

    fn run_one<W: Write>(
        &self,
        index: usize,
        test: &dyn TestCase<D>,
        device: &D,
        shared: Option<&D::Session>,
        state: &mut RunState,
        reporter: &mut Reporter<W>,
    ) -> TestStatus {
        let name = test.name();
        reporter.test_started(name);

        let info = device.info();
        if test.min_version() > info.version {
            reporter.version_skip(name, test.min_version(), info.version);
            return TestStatus::Skip;
        }
        if let Some(extension) = test.required_extension() {
            if !info.has_extension(extension) {
                reporter.extension_skip(name, extension);
                return TestStatus::Skip;
            }
        }
        if !test.is_implemented() {
            reporter.not_implemented(name);
            return TestStatus::Skip;
        }

        let owned;
        let session = match self.options.context_mode {
            ContextMode::Shared => shared,
            ContextMode::PerTest => match device.open_session(self.options.queue_properties) {
                Ok(session) => {
                    owned = session;
                    Some(&owned)
                }
                Err(err) => {
                    error!("Unable to create testing context: {err}");
                    reporter.test_failed(name);
                    return TestStatus::Fail;
                }
            },
            ContextMode::None => None,
        };

        let seed = state.seed_policy().test_seed(index);
        let (rng, subtests) = state.begin_test(index);
        let mut env = TestEnv::new(device, session, self.options.num_elements, rng, subtests)
            .identified(name, seed);
        let mut status = test.run(&mut env);

        if self.options.context_mode == ContextMode::PerTest {
            if let Some(session) = session {
                if let Err(err) = session.finish() {
                    error!("clFinish failed: {err}");
                    status = TestStatus::Fail;
                }
            }
        }

        match status {
            TestStatus::Pass => reporter.test_passed(name),
            TestStatus::Fail => reporter.test_failed(name),
            TestStatus::Skip => reporter.test_not_supported(name),
        }
        status
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{MockBehaviour, MockDevice};
    use crate::registry::TestDefinition;
    use crate::seed::SeedPolicy;
    use crate::{Version, TEST_SKIPPED_ITSELF};

    fn pass(_env: &mut TestEnv<'_, MockDevice>) -> i32 {
        0
    }

    fn fail(_env: &mut TestEnv<'_, MockDevice>) -> i32 {
        -1
    }

    fn skip_itself(_env: &mut TestEnv<'_, MockDevice>) -> i32 {
        TEST_SKIPPED_ITSELF
    }

    fn options(context_mode: ContextMode) -> DispatchOptions {
        DispatchOptions { num_elements: 64, context_mode, queue_properties: QueueProperties::default() }
    }

    fn run(
        registry: &TestRegistry<MockDevice>,
        device: &MockDevice,
        mode: ContextMode,
    ) -> (Vec<TestRecord>, String) {
        let mut reporter = Reporter::new(Vec::new());
        let mut state = RunState::new(SeedPolicy::fixed(0));
        let mask = SelectionMask::all(registry.len());
        let records =
            Dispatcher::new(registry, options(mode)).run(device, &mask, &mut state, &mut reporter).unwrap();
        (records, String::from_utf8(reporter.into_inner()).unwrap())
    }

    fn statuses(records: &[TestRecord]) -> Vec<TestStatus> {
        records.iter().map(|r| r.status).collect()
    }

    #[test]
    fn maps_return_codes() {
        let mut registry = TestRegistry::new();
        registry.register(TestDefinition::from_fn("a", pass)).unwrap();
        registry.register(TestDefinition::from_fn("b", fail)).unwrap();
        registry.register(TestDefinition::from_fn("c", skip_itself)).unwrap();
        let device = MockDevice::new(Version::V1_2);

        let (records, out) = run(&registry, &device, ContextMode::Shared);
        assert_eq!(statuses(&records), [TestStatus::Pass, TestStatus::Fail, TestStatus::Skip]);
        assert_eq!(out, "a...\na passed\nb...\nb FAILED\nc...\nc test not supported\n");
        assert_eq!(device.sessions_opened(), 1);
    }

    #[test]
    fn requirement_skips_do_not_invoke_the_body() {
        let mut registry = TestRegistry::new();
        registry
            .register(TestDefinition::from_fn("new_api", fail).with_min_version(Version::V2_0))
            .unwrap();
        registry
            .register(TestDefinition::from_fn("fp64", fail).with_required_extension("cl_khr_fp64"))
            .unwrap();
        registry.register(TestDefinition::unimplemented("later")).unwrap();
        let device = MockDevice::new(Version::V1_2);

        let (records, out) = run(&registry, &device, ContextMode::Shared);
        assert_eq!(statuses(&records), [TestStatus::Skip; 3]);
        assert!(out.contains(
            "new_api skipped (requires at least OpenCL version 2.0, but the device reports OpenCL version 1.2)"
        ));
        assert!(out.contains("fp64 skipped (requires the cl_khr_fp64 extension)"));
        assert!(out.contains("later test currently not implemented"));
    }

    #[test]
    fn per_test_mode_opens_and_finishes_a_session_per_test() {
        let mut registry = TestRegistry::new();
        registry.register(TestDefinition::from_fn("a", pass)).unwrap();
        registry.register(TestDefinition::from_fn("b", pass)).unwrap();
        let device = MockDevice::new(Version::V2_0);

        let (records, _) = run(&registry, &device, ContextMode::PerTest);
        assert_eq!(statuses(&records), [TestStatus::Pass, TestStatus::Pass]);
        assert_eq!(device.sessions_opened(), 2);
        assert_eq!(device.finish_calls(), 2);
    }

    #[test]
    fn per_test_session_failures_fail_the_test() {
        let mut registry = TestRegistry::new();
        registry.register(TestDefinition::from_fn("a", pass)).unwrap();
        let device = MockDevice::new(Version::V2_0)
            .with_behaviour(MockBehaviour { fail_open_session: true, ..MockBehaviour::default() });

        let (records, out) = run(&registry, &device, ContextMode::PerTest);
        assert_eq!(statuses(&records), [TestStatus::Fail]);
        assert_eq!(out, "a...\na FAILED\n");
    }

    #[test]
    fn finish_errors_turn_a_pass_into_a_failure() {
        let mut registry = TestRegistry::new();
        registry.register(TestDefinition::from_fn("a", pass)).unwrap();
        let device = MockDevice::new(Version::V2_0)
            .with_behaviour(MockBehaviour { fail_finish: true, ..MockBehaviour::default() });

        let (records, out) = run(&registry, &device, ContextMode::PerTest);
        assert_eq!(statuses(&records), [TestStatus::Fail]);
        assert_eq!(out, "a...\na FAILED\n");
    }

    #[test]
    fn shared_session_failure_is_fatal() {
        let mut registry = TestRegistry::new();
        registry.register(TestDefinition::from_fn("a", pass)).unwrap();
        let device = MockDevice::new(Version::V2_0)
            .with_behaviour(MockBehaviour { fail_open_session: true, ..MockBehaviour::default() });
        let mut state = RunState::new(SeedPolicy::default());
        let mut reporter = Reporter::new(Vec::new());

        let err = Dispatcher::new(&registry, options(ContextMode::Shared))
            .run(&device, &SelectionMask::all(1), &mut state, &mut reporter)
            .unwrap_err();
        assert!(matches!(err, HarnessError::SharedSession(_)));
    }

    #[test]
    fn none_mode_runs_without_a_session() {
        let mut registry = TestRegistry::<MockDevice>::new();
        registry
            .register(TestDefinition::from_closure("sessionless", |env| {
                if env.session().is_none() && env.num_elements() == 64 {
                    TestStatus::Pass
                } else {
                    TestStatus::Fail
                }
            }))
            .unwrap();
        let device = MockDevice::new(Version::V1_2);

        let (records, _) = run(&registry, &device, ContextMode::None);
        assert_eq!(statuses(&records), [TestStatus::Pass]);
        assert_eq!(device.sessions_opened(), 0);
    }

    #[test]
    fn unselected_tests_are_not_recorded() {
        let mut registry = TestRegistry::new();
        registry.register(TestDefinition::from_fn("a", pass)).unwrap();
        registry.register(TestDefinition::from_fn("b", fail)).unwrap();
        let device = MockDevice::new(Version::V1_2);
        let mask = crate::select_tests(&registry, &["a".to_string()], &[]).unwrap();
        let mut state = RunState::new(SeedPolicy::default());
        let mut reporter = Reporter::new(Vec::new());

        let records = Dispatcher::new(&registry, options(ContextMode::Shared))
            .run(&device, &mask, &mut state, &mut reporter)
            .unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].name, "a");
        assert_eq!(state.summary().total, 1);
    }

    #[test]
    fn reseeded_tests_see_their_own_seed() {
        let mut registry = TestRegistry::<MockDevice>::new();
        for name in ["a", "b", "c"] {
            registry
                .register(TestDefinition::from_closure(name, |env| {
                    let want = match env.test_name() {
                        "a" => 7,
                        "b" => 8,
                        _ => 9,
                    };
                    if env.seed() == want {
                        TestStatus::Pass
                    } else {
                        TestStatus::Fail
                    }
                }))
                .unwrap();
        }
        let device = MockDevice::new(Version::V1_2);
        let mut state = RunState::new(SeedPolicy { seed: 7, reseed_per_test: true });
        let mut reporter = Reporter::new(Vec::new());

        let records = Dispatcher::new(&registry, options(ContextMode::Shared))
            .run(&device, &SelectionMask::all(3), &mut state, &mut reporter)
            .unwrap();
        assert_eq!(statuses(&records), [TestStatus::Pass; 3]);
    }

    #[test]
    fn context_mode_parsing() {
        assert_eq!("per-test".parse::<ContextMode>().unwrap(), ContextMode::PerTest);
        assert_eq!("SHARED".parse::<ContextMode>().unwrap(), ContextMode::Shared);
        assert_eq!(ContextMode::None.to_string(), "none");
        assert!("sometimes".parse::<ContextMode>().is_err());
    }
}
