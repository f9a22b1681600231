//! The seam between the harness and a compute backend.
//!
//! The harness only ever talks to these traits, so the dispatch loop can be
//! driven by [`MockDevice`](crate::mock::MockDevice) without hardware and by
//! the OpenCL backend in production.

use clcts_common::{DeviceInfo, DeviceType, QueueProperties};

use crate::error::DeviceError;
use crate::kernel::{BuildFailure, KernelRequest};

/// Criteria for picking the one device a run executes on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DeviceRequest {
    pub device_type: DeviceType,
    pub platform_index: usize,
    pub device_index: usize,
}

/// Resolves a [`DeviceRequest`] to a concrete device.
pub trait DeviceProvider {
    type Device: ComputeDevice;

    fn acquire(&self, request: &DeviceRequest) -> Result<Self::Device, DeviceError>;
}

/// An acquired device. Lives for the whole run.
pub trait ComputeDevice {
    type Session: DeviceSession;

    fn info(&self) -> &DeviceInfo;

    /// Create a context and command queue on this device.
    fn open_session(&self, properties: QueueProperties) -> Result<Self::Session, DeviceError>;
}

/// A context plus command queue. Dropping it releases both.
pub trait DeviceSession {
    type Kernel;

    /// Build `request.sources` and create the named kernel. Implementations
    /// return the raw failure; logging is done by
    /// [`create_single_kernel`](crate::kernel::create_single_kernel).
    fn build_kernel(&self, request: &KernelRequest<'_>) -> Result<Self::Kernel, BuildFailure>;

    /// Block until all queued work has completed.
    fn finish(&self) -> Result<(), DeviceError>;
}
