//! Common types shared by the clcts harness and its OpenCL backend.
//!
//! Nothing in this crate talks to a driver. It describes devices, versions
//! and queue properties in plain Rust so the harness can be exercised against
//! a mock device as easily as against real hardware.

pub mod device_info;
pub mod device_type;
pub mod error_codes;
pub mod queue;
pub mod version;

pub use device_info::{max_opencl_c_for_devices, DeviceInfo, FpConfig};
pub use device_type::{DeviceType, DeviceTypeParseError};
pub use error_codes::error_name;
pub use queue::QueueProperties;
pub use version::{Version, VersionParseError};
