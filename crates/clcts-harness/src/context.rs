//! Per-run state and the view of it each test body receives.

use clcts_common::DeviceInfo;
use rand_chacha::ChaCha8Rng;

use crate::device::ComputeDevice;
use crate::report::RunSummary;
use crate::seed::SeedPolicy;
use crate::status::{TestFailure, TestStatus};

/// Counters a test body may bump for finer-grained reporting than one
/// status per test.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SubTestCounters {
    pub count: usize,
    pub failed: usize,
}

impl SubTestCounters {
    pub fn record(&mut self, passed: bool) {
        self.count += 1;
        if !passed {
            self.failed += 1;
        }
    }
}

/// Mutable state for one harness run, threaded through dispatch by
/// reference.
#[derive(Debug)]
pub struct RunState {
    policy: SeedPolicy,
    rng: ChaCha8Rng,
    subtests: SubTestCounters,
    passed: usize,
    failed: usize,
    skipped: usize,
}

impl RunState {
    pub fn new(policy: SeedPolicy) -> Self {
        Self {
            policy,
            rng: policy.run_rng(),
            subtests: SubTestCounters::default(),
            passed: 0,
            failed: 0,
            skipped: 0,
        }
    }

    pub fn seed_policy(&self) -> SeedPolicy {
        self.policy
    }

    pub fn subtests(&self) -> SubTestCounters {
        self.subtests
    }

    pub fn record(&mut self, status: TestStatus) {
        match status {
            TestStatus::Pass => self.passed += 1,
            TestStatus::Fail => self.failed += 1,
            TestStatus::Skip => self.skipped += 1,
        }
    }

    pub fn summary(&self) -> RunSummary {
        RunSummary {
            total: self.passed + self.failed + self.skipped,
            passed: self.passed,
            failed: self.failed,
            skipped: self.skipped,
        }
    }

    /// Hand out the generator and counters for the test at `index`,
    /// reseeding first when the policy asks for it.
    pub(crate) fn begin_test(&mut self, index: usize) -> (&mut ChaCha8Rng, &mut SubTestCounters) {
        if self.policy.reseed_per_test {
            self.rng = self.policy.test_rng(index);
        }
        (&mut self.rng, &mut self.subtests)
    }
}

/// Everything a test body may touch: the device, the session it should
/// enqueue work on, the element count and its random stream.
pub struct TestEnv<'a, D: ComputeDevice> {
    device: &'a D,
    session: Option<&'a D::Session>,
    num_elements: usize,
    name: &'a str,
    seed: u32,
    rng: &'a mut ChaCha8Rng,
    subtests: &'a mut SubTestCounters,
}

impl<'a, D: ComputeDevice> TestEnv<'a, D> {
    pub fn new(
        device: &'a D,
        session: Option<&'a D::Session>,
        num_elements: usize,
        rng: &'a mut ChaCha8Rng,
        subtests: &'a mut SubTestCounters,
    ) -> Self {
        Self { device, session, num_elements, name: "", seed: 0, rng, subtests }
    }

    pub(crate) fn identified(mut self, name: &'a str, seed: u32) -> Self {
        self.name = name;
        self.seed = seed;
        self
    }

    pub fn device(&self) -> &'a D {
        self.device
    }

    pub fn info(&self) -> &'a DeviceInfo {
        self.device.info()
    }

    /// The session to enqueue work on; `None` when the run uses
    /// `--context-mode none`.
    pub fn session(&self) -> Option<&'a D::Session> {
        self.session
    }

    pub fn require_session(&self) -> Result<&'a D::Session, TestFailure> {
        self.session.ok_or(TestFailure::NoSession)
    }

    pub fn num_elements(&self) -> usize {
        self.num_elements
    }

    pub fn test_name(&self) -> &'a str {
        self.name
    }

    pub fn seed(&self) -> u32 {
        self.seed
    }

    pub fn rng(&mut self) -> &mut ChaCha8Rng {
        &mut *self.rng
    }

    pub fn record_subtest(&mut self, passed: bool) {
        self.subtests.record(passed);
    }
}
