//! Per-test outcomes and the return-code convention test bodies use.

use std::fmt;

use clcts_common::error_name;
use serde::Serialize;
use tracing::{error, info};

/// Returned by a test body that decided the device does not support what it
/// exercises. Any other non-zero value is a failure.
pub const TEST_SKIPPED_ITSELF: i32 = -100;

/// Generic failure code for bodies that have no more specific status.
pub const TEST_FAILED: i32 = -1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TestStatus {
    Pass,
    Fail,
    Skip,
}

impl TestStatus {
    /// Map a body's return code onto a status.
    pub fn from_code(code: i32) -> Self {
        match code {
            0 => TestStatus::Pass,
            TEST_SKIPPED_ITSELF => TestStatus::Skip,
            _ => TestStatus::Fail,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            TestStatus::Pass => "pass",
            TestStatus::Fail => "fail",
            TestStatus::Skip => "skip",
        }
    }
}

impl fmt::Display for TestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Failure raised inside a test body.
///
/// Bodies are free to return raw codes, but most read better written as
/// `Result<(), TestFailure>` and finished with [`into_code`].
#[derive(Debug, thiserror::Error)]
pub enum TestFailure {
    #[error("{call} failed: {} ({code})", error_name(*.code))]
    Api { call: &'static str, code: i32 },

    #[error(transparent)]
    Build(#[from] crate::kernel::BuildFailure),

    #[error("verification failed: {0}")]
    Mismatch(String),

    #[error("test requires a command queue but was run without one")]
    NoSession,

    #[error("{0}")]
    Unsupported(String),
}

/// Collapse a body's result into the return-code convention, logging the
/// failure.
pub fn into_code(result: Result<(), TestFailure>) -> i32 {
    match result {
        Ok(()) => 0,
        Err(TestFailure::Unsupported(reason)) => {
            info!("{reason}");
            TEST_SKIPPED_ITSELF
        }
        Err(failure) => {
            error!("{failure}");
            TEST_FAILED
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_map_to_statuses() {
        assert_eq!(TestStatus::from_code(0), TestStatus::Pass);
        assert_eq!(TestStatus::from_code(TEST_SKIPPED_ITSELF), TestStatus::Skip);
        assert_eq!(TestStatus::from_code(-1), TestStatus::Fail);
        assert_eq!(TestStatus::from_code(1), TestStatus::Fail);
        assert_eq!(TestStatus::from_code(-11), TestStatus::Fail);
    }

    #[test]
    fn failures_collapse_to_codes() {
        assert_eq!(into_code(Ok(())), 0);
        assert_eq!(into_code(Err(TestFailure::Mismatch("x".into()))), TEST_FAILED);
        assert_eq!(into_code(Err(TestFailure::Unsupported("no fp64".into()))), TEST_SKIPPED_ITSELF);
        assert_eq!(
            TestFailure::Api { call: "clEnqueueReadBuffer", code: -5 }.to_string(),
            "clEnqueueReadBuffer failed: CL_OUT_OF_RESOURCES (-5)"
        );
    }

    #[test]
    fn serializes_lowercase() {
        assert_eq!(serde_json::to_string(&TestStatus::Skip).unwrap(), "\"skip\"");
    }
}
