//! Console report lines and the run summary.
//!
//! Everything a CI log scraper might key on goes through [`Reporter`] on
//! stdout, one line per event. Diagnostics go to `tracing` instead.

use std::fmt;
use std::io::{self, Write};

use clcts_common::{DeviceInfo, Version};
use serde::Serialize;
use tracing::debug;

use crate::context::SubTestCounters;
use crate::device::ComputeDevice;
use crate::exit::{EXIT_SUCCESS, EXIT_TEST_FAILURE};
use crate::registry::TestRegistry;
use crate::status::TestStatus;

/// Aggregate counts over the recorded statuses of one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct RunSummary {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub skipped: usize,
}

impl RunSummary {
    pub fn from_statuses<I: IntoIterator<Item = TestStatus>>(statuses: I) -> Self {
        statuses.into_iter().fold(Self::default(), |mut summary, status| {
            summary.total += 1;
            match status {
                TestStatus::Pass => summary.passed += 1,
                TestStatus::Fail => summary.failed += 1,
                TestStatus::Skip => summary.skipped += 1,
            }
            summary
        })
    }

    pub fn all_passed(&self) -> bool {
        self.failed == 0
    }

    pub fn exit_code(&self) -> i32 {
        if self.all_passed() {
            EXIT_SUCCESS
        } else {
            EXIT_TEST_FAILURE
        }
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Summary: total={} passed={} failed={} skipped={}",
            self.total, self.passed, self.failed, self.skipped
        )
    }
}

/// `PASSED n of n tests.`, `FAILED f of n tests.` or the singular forms.
pub fn results_line(failed: usize, count: usize, noun: &str) -> String {
    let count = count.max(failed);
    match (failed, count) {
        (0, 1) => format!("PASSED {noun}."),
        (0, n) => format!("PASSED {n} of {n} {noun}s."),
        (_, 1) => format!("FAILED {noun}."),
        (f, n) => format!("FAILED {f} of {n} {noun}s."),
    }
}

pub struct Reporter<W: Write> {
    out: W,
}

impl Reporter<io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write> Reporter<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    pub fn line(&mut self, args: fmt::Arguments<'_>) {
        let written = writeln!(self.out, "{args}").and_then(|()| self.out.flush());
        if let Err(err) = written {
            debug!("dropping report line: {err}");
        }
    }

    pub fn test_started(&mut self, name: &str) {
        self.line(format_args!("{name}..."));
    }

    pub fn test_passed(&mut self, name: &str) {
        self.line(format_args!("{name} passed"));
    }

    pub fn test_failed(&mut self, name: &str) {
        self.line(format_args!("{name} FAILED"));
    }

    pub fn test_not_supported(&mut self, name: &str) {
        self.line(format_args!("{name} test not supported"));
    }

    pub fn not_implemented(&mut self, name: &str) {
        self.line(format_args!("{name} test currently not implemented"));
    }

    pub fn version_skip(&mut self, name: &str, required: Version, reported: Version) {
        self.line(format_args!(
            "{name} skipped (requires at least OpenCL version {required}, but the device reports OpenCL version {reported})"
        ));
    }

    pub fn extension_skip(&mut self, name: &str, extension: &str) {
        self.line(format_args!("{name} skipped (requires the {extension} extension)"));
    }

    pub fn device_header(&mut self, info: &DeviceInfo) {
        self.line(format_args!(
            "Compute Device Name = {}, Compute Device Vendor = {}, Compute Device Version = {}, CL C Version = OpenCL C {}",
            info.name,
            info.vendor,
            info.version_string.trim_end(),
            info.latest_opencl_c_version()
        ));
        if info.version >= Version::V3_0 {
            if let Some(cts) = &info.latest_conformance_version {
                self.line(format_args!("Device latest conformance version passed: {cts}"));
            }
        }
        self.line(format_args!(
            "Supports single precision denormals: {}",
            if info.supports_denormals() { "YES" } else { "NO" }
        ));
        self.line(format_args!("sizeof( void*) = {}  (host)", std::mem::size_of::<usize>()));
        self.line(format_args!("sizeof( void*) = {}  (device)", info.pointer_size()));
    }

    pub fn results(&mut self, failed: usize, count: usize, noun: &str) {
        let line = results_line(failed, count, noun);
        self.line(format_args!("{line}"));
    }

    /// Final lines of a run that reached dispatch.
    pub fn final_results(&mut self, subtests: SubTestCounters, summary: &RunSummary) {
        if subtests.count > 0 || subtests.failed > 0 {
            self.results(subtests.failed, subtests.count, "sub-test");
        }
        self.results(summary.failed, summary.passed + summary.failed, "test");
        self.line(format_args!("{summary}"));
    }

    /// Lines for a suite whose device check refused to run any test.
    pub fn init_outcome(&mut self, status: TestStatus, count: usize) {
        let (verb, upper) =
            if status == TestStatus::Skip { ("skipped", "SKIPPED") } else { ("failed", "FAILED") };
        self.line(format_args!("Test {verb} while initialization"));
        self.line(format_args!("{upper} {count} of {count} tests."));
    }

    pub fn test_list<D: ComputeDevice>(&mut self, registry: &TestRegistry<D>) {
        self.line(format_args!("Test names:"));
        for test in registry.iter() {
            let mut notes = Vec::new();
            if test.min_version() > Version::V1_0 {
                notes.push(format!("OpenCL {}", test.min_version()));
            }
            if let Some(ext) = test.required_extension() {
                notes.push(ext.to_string());
            }
            let mut entry = format!("\t{}", test.name());
            if !notes.is_empty() {
                entry.push_str(&format!(" (requires {})", notes.join(", ")));
            }
            if !test.is_implemented() {
                entry.push_str(" [not implemented]");
            }
            self.line(format_args!("{entry}"));
        }
    }
}
