//! OpenCL backend for the clcts harness.
//!
//! [`ClProvider`] implements the harness's
//! [`DeviceProvider`](clcts_harness::DeviceProvider) on top of `opencl3`.
//! Linking against the ICD loader is opt-in through the `runtime` feature;
//! without it the same types exist but acquisition fails with
//! [`DeviceError::BackendUnavailable`](clcts_harness::DeviceError::BackendUnavailable),
//! so suites always compile.

pub mod select;

#[cfg(feature = "runtime")]
mod runtime;
#[cfg(feature = "runtime")]
pub use runtime::{ClDevice, ClKernel, ClProvider, ClResultExt, ClSession};

#[cfg(not(feature = "runtime"))]
mod stub;
#[cfg(not(feature = "runtime"))]
pub use stub::{ClDevice, ClKernel, ClProvider, ClSession};

/// Whether this build can talk to real OpenCL drivers.
pub const fn runtime_available() -> bool {
    cfg!(feature = "runtime")
}
