//! The top-level pipeline: select, acquire, check, dispatch, report.

use std::io::Write;

use clcts_common::{DeviceInfo, Version};
use tracing::{info, warn};

use crate::config::HarnessConfig;
use crate::context::RunState;
use crate::device::{ComputeDevice, DeviceProvider};
use crate::dispatch::{Dispatcher, TestRecord};
use crate::error::{DeviceError, HarnessError};
use crate::exit::{EXIT_SUCCESS, EXIT_TEST_FAILURE};
use crate::registry::TestRegistry;
use crate::report::{Reporter, RunSummary};
use crate::results::ResultsReport;
use crate::seed::SeedPolicy;
use crate::selection::select_tests;
use crate::status::TestStatus;

/// Suite-supplied capability check run once after acquisition. Anything
/// other than `Pass` stops the run before the first test.
pub type DeviceCheck<D> = fn(&D) -> TestStatus;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HarnessOutcome {
    pub summary: RunSummary,
    pub records: Vec<TestRecord>,
    pub exit_code: i32,
}

impl HarnessOutcome {
    fn listed() -> Self {
        Self { summary: RunSummary::default(), records: Vec::new(), exit_code: EXIT_SUCCESS }
    }
}

pub struct Harness<'r, D: ComputeDevice> {
    suite: String,
    registry: &'r TestRegistry<D>,
    device_check: Option<DeviceCheck<D>>,
}

impl<'r, D: ComputeDevice> Harness<'r, D> {
    pub fn new(suite: impl Into<String>, registry: &'r TestRegistry<D>) -> Self {
        Self { suite: suite.into(), registry, device_check: None }
    }

    pub fn with_device_check(mut self, check: DeviceCheck<D>) -> Self {
        self.device_check = Some(check);
        self
    }

    pub fn suite(&self) -> &str {
        &self.suite
    }

    /// Run the suite as configured.
    ///
    /// `Err` means the harness itself could not do its job (bad selection,
    /// no device, unwritable results file). Test failures are reported in
    /// the returned outcome's exit code.
    pub fn run<P, W>(
        &self,
        config: &HarnessConfig,
        provider: &P,
        reporter: &mut Reporter<W>,
    ) -> Result<HarnessOutcome, HarnessError>
    where
        P: DeviceProvider<Device = D>,
        W: Write,
    {
        if config.run.list {
            reporter.test_list(self.registry);
            return Ok(HarnessOutcome::listed());
        }

        let mask = select_tests(self.registry, &config.run.tests, &config.run.exclude)?;

        let policy = if config.run.randomize {
            let policy = SeedPolicy::randomized();
            reporter.line(format_args!("Random seed: {}.", policy.seed));
            policy
        } else {
            reporter.line(format_args!(" Initializing random seed to {}.", config.run.seed));
            SeedPolicy { seed: config.run.seed, reseed_per_test: config.run.reseed }
        };

        let request = config.device_request();
        reporter.line(format_args!(
            "Requesting {} device based on {} for platform index {} and device index {}",
            request.device_type,
            config.device.device_type_source,
            request.platform_index,
            request.device_index
        ));
        let device = provider.acquire(&request)?;
        validate_device(device.info())?;
        reporter.device_header(device.info());

        let queue_properties = config.queue_properties();
        if !device.info().supports_queue_properties(queue_properties) {
            warn!(
                "device does not report support for queue properties {:#x}; session creation may fail",
                queue_properties.bits()
            );
        }

        if let Some(check) = self.device_check {
            let status = check(&device);
            if status != TestStatus::Pass {
                return self.did_not_pass_init(status, config, reporter);
            }
        }

        let mut state = RunState::new(policy);
        let records = Dispatcher::new(self.registry, config.dispatch_options())
            .run(&device, &mask, &mut state, reporter)?;

        let summary = state.summary();
        reporter.final_results(state.subtests(), &summary);

        let mut report = ResultsReport::new(&self.suite);
        for record in &records {
            report.push(&record.name, record.status);
        }
        self.save_results(config, &report)?;

        Ok(HarnessOutcome { summary, exit_code: summary.exit_code(), records })
    }

    /// Record every registered test with the device check's status.
    fn did_not_pass_init<W: Write>(
        &self,
        status: TestStatus,
        config: &HarnessConfig,
        reporter: &mut Reporter<W>,
    ) -> Result<HarnessOutcome, HarnessError> {
        let mut report = ResultsReport::new(&self.suite);
        for name in self.registry.names() {
            report.push(name, status);
        }
        reporter.init_outcome(status, self.registry.len());
        self.save_results(config, &report)?;

        let summary = RunSummary::from_statuses(std::iter::repeat(status).take(self.registry.len()));
        let exit_code = if status == TestStatus::Skip { EXIT_SUCCESS } else { EXIT_TEST_FAILURE };
        Ok(HarnessOutcome { summary, records: Vec::new(), exit_code })
    }

    fn save_results(
        &self,
        config: &HarnessConfig,
        report: &ResultsReport<'_>,
    ) -> Result<(), HarnessError> {
        match &config.report.results_file {
            Some(path) => report.write_to(path),
            None => {
                info!("no results file requested, skipping JSON output");
                Ok(())
            }
        }
    }
}

/// Reject devices whose self-description the harness cannot work with.
pub fn validate_device(info: &DeviceInfo) -> Result<(), DeviceError> {
    let parsed = Version::parse_device_version(&info.version_string)?;
    if parsed != info.version {
        warn!(
            "device version string `{}` disagrees with reported version {}",
            info.version_string, info.version
        );
    }
    if info.address_bits == 0 {
        return Err(DeviceError::InvalidAddressBits(info.address_bits));
    }
    Ok(())
}
