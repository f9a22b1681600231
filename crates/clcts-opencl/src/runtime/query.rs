use clcts_common::{DeviceInfo, DeviceType, FpConfig, Version};
use clcts_harness::DeviceError;
use opencl3::device::Device;
use tracing::debug;

use super::ClResultExt;

const CALL: &str = "clGetDeviceInfo";

/// Snapshot everything the harness needs to know about `device`.
pub(super) fn query_info(device: &Device, platform_name: String) -> Result<DeviceInfo, DeviceError> {
    let version_string = device.version().device_call(CALL)?;
    let version = Version::parse_device_version(&version_string)?;
    let opencl_c_version = if version.reports_opencl_c_version() {
        Version::parse_opencl_c_version(&device.opencl_c_version().device_call(CALL)?)?
    } else {
        Version::V1_0
    };

    let (opencl_c_all_versions, latest_conformance_version) = if version >= Version::V3_0 {
        let all = device
            .opencl_c_all_versions()
            .device_call(CALL)?
            .iter()
            .map(|v| Version::from_packed(v.version))
            .collect();
        (all, device.latest_conformance_version_passed().ok())
    } else {
        (Vec::new(), None)
    };

    // Optional on older or embedded devices; absent reads as zero.
    let double_fp_config = device.double_fp_config().unwrap_or(0);

    let info = DeviceInfo {
        name: device.name().device_call(CALL)?,
        vendor: device.vendor().device_call(CALL)?,
        platform_name,
        driver_version: device.driver_version().device_call(CALL)?,
        version_string,
        version,
        opencl_c_version,
        opencl_c_all_versions,
        profile: device.profile().device_call(CALL)?,
        device_type: DeviceType::from_reported_bits(device.dev_type().device_call(CALL)?),
        extensions: DeviceInfo::parse_extensions(&device.extensions().device_call(CALL)?),
        address_bits: device.address_bits().device_call(CALL)?,
        max_work_group_size: device.max_work_group_size().device_call(CALL)?,
        single_fp_config: FpConfig(device.single_fp_config().device_call(CALL)?),
        double_fp_config: FpConfig(double_fp_config),
        queue_properties: device.queue_on_host_properties().device_call(CALL)?,
        latest_conformance_version,
    };
    debug!("{} reports {} extensions", info.name, info.extensions.len());
    Ok(info)
}
