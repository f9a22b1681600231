//! `opencl3`-backed implementation of the harness device traits.

mod query;
mod session;

use clcts_common::{DeviceInfo, QueueProperties};
use clcts_harness::{ComputeDevice, DeviceError, DeviceProvider, DeviceRequest, TestFailure};
use opencl3::device::Device;
use opencl3::error_codes::ClError;
use opencl3::platform::get_platforms;
use tracing::{debug, info};

use crate::select::{device_query_error, pick_device, pick_platform};

pub use session::{ClKernel, ClSession};

/// Attach the name of the failing OpenCL call to a raw `ClError`.
pub trait ClResultExt<T> {
    /// For use inside test bodies.
    fn cl_call(self, call: &'static str) -> Result<T, TestFailure>;

    fn device_call(self, call: &'static str) -> Result<T, DeviceError>;
}

impl<T> ClResultExt<T> for Result<T, ClError> {
    fn cl_call(self, call: &'static str) -> Result<T, TestFailure> {
        self.map_err(|ClError(code)| TestFailure::Api { call, code })
    }

    fn device_call(self, call: &'static str) -> Result<T, DeviceError> {
        self.map_err(|ClError(code)| DeviceError::Api { call, code })
    }
}

/// Acquires devices through the system ICD loader.
#[derive(Debug, Default)]
pub struct ClProvider;

impl ClProvider {
    pub fn new() -> Self {
        Self
    }
}

impl DeviceProvider for ClProvider {
    type Device = ClDevice;

    fn acquire(&self, request: &DeviceRequest) -> Result<ClDevice, DeviceError> {
        // The ICD loader reports "no platforms" as an error code on some
        // systems and as an empty list on others.
        let platforms = get_platforms().unwrap_or_default();
        let platform = &platforms[pick_platform(request.platform_index, platforms.len())?];
        let platform_name = platform.name().unwrap_or_default();
        debug!("using OpenCL platform {} ({platform_name})", request.platform_index);

        let ids = platform
            .get_devices(request.device_type.bits())
            .map_err(|ClError(code)| device_query_error(code, request))?;
        let id = ids[pick_device(request.device_index, ids.len())?];

        let device = Device::new(id);
        let info = query::query_info(&device, platform_name)?;
        info!("acquired {} ({})", info.name, info.version_string.trim_end());
        Ok(ClDevice { device, info })
    }
}

/// A device picked by [`ClProvider`], with its properties queried once.
#[derive(Debug)]
pub struct ClDevice {
    device: Device,
    info: DeviceInfo,
}

impl ClDevice {
    pub fn raw(&self) -> &Device {
        &self.device
    }
}

impl ComputeDevice for ClDevice {
    type Session = ClSession;

    fn info(&self) -> &DeviceInfo {
        &self.info
    }

    fn open_session(&self, properties: QueueProperties) -> Result<ClSession, DeviceError> {
        ClSession::open(&self.device, &self.info, properties)
    }
}
