//! Program build helper shared by every test body.
//!
//! Backends do the raw compile in [`DeviceSession::build_kernel`]; this
//! module owns the policy around it: which build options reach the compiler
//! and what gets logged when a build fails.

use std::fmt;

use clcts_common::{error_name, Version};
use tracing::{debug, error, warn};

use crate::device::DeviceSession;

/// Options only an offline compiler understands. They are dropped before
/// handing options to the runtime compiler.
pub const OFFLINE_ONLY_OPTIONS: [&str; 3] =
    ["-cl-fp16-enable", "-cl-fp64-enable", "-cl-zero-init-local-mem-vars"];

/// What to compile and which kernel to pull out of it.
#[derive(Debug, Clone, Copy)]
pub struct KernelRequest<'a> {
    pub sources: &'a [&'a str],
    pub kernel_name: &'a str,
    pub build_options: &'a str,
}

impl<'a> KernelRequest<'a> {
    pub fn new(sources: &'a [&'a str], kernel_name: &'a str) -> Self {
        Self { sources, kernel_name, build_options: "" }
    }

    pub fn with_options(mut self, build_options: &'a str) -> Self {
        self.build_options = build_options;
        self
    }

    /// Build options as they should reach a compiler whose newest dialect is
    /// `latest_cl_c`.
    pub fn effective_build_options(&self, latest_cl_c: Version) -> String {
        effective_build_options(self.build_options, latest_cl_c)
    }
}

/// Strip offline-only options and pin `-cl-std` to the newest dialect the
/// device supports unless the caller already chose one.
pub fn effective_build_options(options: &str, latest_cl_c: Version) -> String {
    let mut parts: Vec<&str> =
        options.split_whitespace().filter(|opt| !OFFLINE_ONLY_OPTIONS.contains(opt)).collect();
    if !parts.iter().any(|opt| opt.starts_with("-cl-std")) {
        if let Some(std) = latest_cl_c.cl_std_option() {
            parts.push(std);
        }
    }
    parts.join(" ")
}

/// `cl_build_status` of a program on one device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildStatus {
    Success,
    None,
    Error,
    InProgress,
    Unknown(i32),
}

impl BuildStatus {
    pub fn from_raw(raw: i32) -> Self {
        match raw {
            0 => BuildStatus::Success,
            -1 => BuildStatus::None,
            -2 => BuildStatus::Error,
            -3 => BuildStatus::InProgress,
            other => BuildStatus::Unknown(other),
        }
    }
}

impl fmt::Display for BuildStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BuildStatus::Success => f.write_str("CL_BUILD_SUCCESS"),
            BuildStatus::None => f.write_str("CL_BUILD_NONE"),
            BuildStatus::Error => f.write_str("CL_BUILD_ERROR"),
            BuildStatus::InProgress => f.write_str("CL_BUILD_IN_PROGRESS"),
            BuildStatus::Unknown(raw) => write!(f, "UNKNOWN ({raw})"),
        }
    }
}

/// Build outcome for one device the program was built for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceBuildLog {
    pub device_name: String,
    pub status: BuildStatus,
    pub log: String,
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum BuildFailure {
    #[error("{call} failed: {} ({code})", error_name(*.code))]
    Api { call: &'static str, code: i32 },

    #[error("failed to build program: {} ({code})", error_name(*.code))]
    Build { code: i32, options: String, sources: Vec<String>, devices: Vec<DeviceBuildLog> },

    #[error("unable to create kernel \"{kernel_name}\": {} ({code})", error_name(*.code))]
    Kernel { kernel_name: String, code: i32 },
}

impl BuildFailure {
    pub fn build(code: i32, options: &str, sources: &[&str], devices: Vec<DeviceBuildLog>) -> Self {
        BuildFailure::Build {
            code,
            options: options.to_string(),
            sources: sources.iter().map(|s| s.to_string()).collect(),
            devices,
        }
    }

    /// True when the compiler reported an error while the only device
    /// claims the build succeeded. Still a failure, but worth calling out.
    pub fn is_inconsistent(&self) -> bool {
        match self {
            BuildFailure::Build { devices, .. } => {
                devices.len() == 1 && devices[0].status == BuildStatus::Success
            }
            _ => false,
        }
    }
}

/// Build `request` on `session` and create its kernel, logging the full
/// build diagnostics on failure.
pub fn create_single_kernel<S: DeviceSession>(
    session: &S,
    request: &KernelRequest<'_>,
) -> Result<S::Kernel, BuildFailure> {
    debug!("building kernel \"{}\" from {} source(s)", request.kernel_name, request.sources.len());
    session.build_kernel(request).map_err(|failure| {
        log_build_failure(&failure);
        failure
    })
}

pub fn log_build_failure(failure: &BuildFailure) {
    let BuildFailure::Build { code, options, sources, devices } = failure else {
        error!("{failure}");
        return;
    };

    error!("clBuildProgram failed: {} ({code})", error_name(*code));
    error!("Build options: {options}");
    error!("Kernel source is: ------------\n{}", sources.concat());
    for device in devices {
        if device.status != BuildStatus::Success {
            error!(
                "Build not successful for device \"{}\", status: {}",
                device.device_name, device.status
            );
        }
        error!("Build log for device \"{}\" is: ------------\n{}\n", device.device_name, device.log);
    }
    if failure.is_inconsistent() {
        warn!("clBuildProgram returned an error, but the device reports CL_BUILD_SUCCESS");
    }
}
