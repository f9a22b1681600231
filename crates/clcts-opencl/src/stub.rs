//! Stand-ins used when the crate is built without `runtime`.

use clcts_common::{DeviceInfo, QueueProperties};
use clcts_harness::{
    BuildFailure, ComputeDevice, DeviceError, DeviceProvider, DeviceRequest, DeviceSession,
    KernelRequest,
};
use tracing::warn;

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
        warn!("cannot acquire {} device: built without the OpenCL runtime", request.device_type);
        Err(DeviceError::BackendUnavailable)
    }
}

/// Never constructed without the runtime.
#[derive(Debug)]
pub struct ClDevice {
    info: DeviceInfo,
}

impl ComputeDevice for ClDevice {
    type Session = ClSession;

    fn info(&self) -> &DeviceInfo {
        &self.info
    }

    fn open_session(&self, _properties: QueueProperties) -> Result<ClSession, DeviceError> {
        Err(DeviceError::BackendUnavailable)
    }
}

#[derive(Debug)]
pub struct ClSession;

#[derive(Debug)]
pub struct ClKernel;

impl DeviceSession for ClSession {
    type Kernel = ClKernel;

    fn build_kernel(&self, _request: &KernelRequest<'_>) -> Result<ClKernel, BuildFailure> {
        Err(BuildFailure::Api { call: "clCreateProgramWithSource", code: -1001 })
    }

    fn finish(&self) -> Result<(), DeviceError> {
        Err(DeviceError::BackendUnavailable)
    }
}
