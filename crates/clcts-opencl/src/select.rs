//! Driver-independent pieces of device acquisition.

use clcts_common::Version;
use clcts_harness::{DeviceError, DeviceRequest};

/// `CL_DEVICE_NOT_FOUND`, returned by `clGetDeviceIDs` when a platform has no
/// device of the requested type.
pub const CL_DEVICE_NOT_FOUND: i32 = -1;

pub fn pick_platform(index: usize, count: usize) -> Result<usize, DeviceError> {
    if count == 0 {
        return Err(DeviceError::NoPlatforms);
    }
    if index >= count {
        return Err(DeviceError::PlatformIndexOutOfRange { index, count });
    }
    Ok(index)
}

pub fn pick_device(index: usize, count: usize) -> Result<usize, DeviceError> {
    if index >= count {
        return Err(DeviceError::DeviceIndexOutOfRange { index, count });
    }
    Ok(index)
}

/// Map a failed `clGetDeviceIDs` onto the harness error for `request`.
pub fn device_query_error(code: i32, request: &DeviceRequest) -> DeviceError {
    if code == CL_DEVICE_NOT_FOUND {
        DeviceError::NoMatchingDevice {
            device_type: request.device_type,
            platform_index: request.platform_index,
        }
    } else {
        DeviceError::Api { call: "clGetDeviceIDs", code }
    }
}

/// Which command-queue constructor a device needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueApi {
    /// `clCreateCommandQueue` with a property bitfield.
    Legacy,
    /// `clCreateCommandQueueWithProperties`.
    WithProperties,
}

impl QueueApi {
    pub fn for_version(version: Version) -> Self {
        if version >= Version::V2_0 {
            QueueApi::WithProperties
        } else {
            QueueApi::Legacy
        }
    }
}
