//! Snapshot of the properties a device reports about itself.
//!
//! The harness queries the driver once at acquisition time and then works
//! purely from this snapshot: requirement checks in the dispatch loop,
//! `-cl-std` selection when building programs, and the device header printed
//! at start-up all read from here.

use serde::{Deserialize, Serialize};

use crate::device_type::DeviceType;
use crate::queue::QueueProperties;
use crate::version::Version;

/// Bits of `cl_device_fp_config`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct FpConfig(pub u64);

impl FpConfig {
    pub const DENORM: u64 = 1 << 0;
    pub const INF_NAN: u64 = 1 << 1;
    pub const ROUND_TO_NEAREST: u64 = 1 << 2;
    pub const FMA: u64 = 1 << 5;

    pub const fn contains(self, flag: u64) -> bool {
        self.0 & flag == flag
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DeviceInfo {
    pub name: String,
    pub vendor: String,
    pub platform_name: String,
    pub driver_version: String,
    /// Raw `CL_DEVICE_VERSION` string, e.g. `"OpenCL 3.0 CUDA"`.
    pub version_string: String,
    pub version: Version,
    /// `CL_DEVICE_OPENCL_C_VERSION`, the newest dialect a pre-3.0 device
    /// supports. On 3.0 devices this may lag behind `opencl_c_all_versions`.
    pub opencl_c_version: Version,
    /// `CL_DEVICE_OPENCL_C_ALL_VERSIONS`; empty on devices older than 3.0.
    pub opencl_c_all_versions: Vec<Version>,
    pub profile: String,
    pub device_type: DeviceType,
    pub extensions: Vec<String>,
    pub address_bits: u32,
    pub max_work_group_size: usize,
    pub single_fp_config: FpConfig,
    pub double_fp_config: FpConfig,
    /// `CL_DEVICE_QUEUE_ON_HOST_PROPERTIES` bitfield.
    pub queue_properties: u64,
    pub latest_conformance_version: Option<String>,
}

impl DeviceInfo {
    /// Split a space-separated `CL_DEVICE_EXTENSIONS` string.
    pub fn parse_extensions(list: &str) -> Vec<String> {
        list.split_whitespace().map(str::to_string).collect()
    }

    /// Exact-token extension lookup; `cl_khr_fp16` does not match
    /// `cl_khr_fp16_extra`.
    pub fn has_extension(&self, name: &str) -> bool {
        self.extensions.iter().any(|ext| ext == name)
    }

    pub fn is_embedded(&self) -> bool {
        self.profile.contains("EMBEDDED_PROFILE")
    }

    pub fn supports_double(&self) -> bool {
        self.has_extension("cl_khr_fp64") || !self.double_fp_config.is_empty()
    }

    /// 64-bit integers are optional in the embedded profile.
    pub fn supports_long(&self) -> bool {
        !self.is_embedded() || self.has_extension("cles_khr_int64")
    }

    pub fn supports_denormals(&self) -> bool {
        self.single_fp_config.contains(FpConfig::DENORM)
    }

    pub fn supports_queue_properties(&self, wanted: QueueProperties) -> bool {
        wanted.is_subset_of(self.queue_properties)
    }

    /// Every OpenCL C version the device accepts, oldest first.
    ///
    /// 3.0 devices list them explicitly; older devices support every
    /// dialect up to their `CL_DEVICE_OPENCL_C_VERSION`.
    pub fn opencl_c_versions(&self) -> Vec<Version> {
        if self.version >= Version::V3_0 && !self.opencl_c_all_versions.is_empty() {
            let mut versions = self.opencl_c_all_versions.clone();
            versions.sort();
            versions.dedup();
            return versions;
        }
        let older = [Version::V1_0, Version::V1_1, Version::V1_2, Version::V2_0];
        let mut versions: Vec<Version> = older
            .into_iter()
            .filter(|v| *v < self.opencl_c_version)
            .collect();
        versions.push(self.opencl_c_version);
        versions
    }

    pub fn supports_opencl_c(&self, wanted: Version) -> bool {
        if self.version >= Version::V3_0 && self.opencl_c_all_versions.contains(&wanted) {
            return true;
        }
        wanted <= self.opencl_c_version
    }

    /// Newest OpenCL C dialect this device compiles.
    pub fn latest_opencl_c_version(&self) -> Version {
        self.opencl_c_versions().into_iter().max().unwrap_or(self.opencl_c_version)
    }

    /// Size of a device pointer in bytes.
    pub fn pointer_size(&self) -> u32 {
        self.address_bits / 8
    }
}

/// Newest OpenCL C version every device in `devices` can compile.
///
/// 3.0 made most 2.x features optional, so a 3.0 device is not guaranteed to
/// accept 2.0 code: mixing 2.x and 3.0 devices caps the result at 1.2.
pub fn max_opencl_c_for_devices<'a, I>(devices: I) -> Version
where
    I: IntoIterator<Item = &'a DeviceInfo>,
{
    let latest: Vec<Version> = devices.into_iter().map(DeviceInfo::latest_opencl_c_version).collect();
    let Some(&min) = latest.iter().min() else {
        return Version::V1_2;
    };
    let has_2x = latest.iter().any(|v| v.major == 2);
    let has_3x = latest.iter().any(|v| v.major >= 3);
    if has_2x && has_3x {
        min.min(Version::V1_2)
    } else {
        min
    }
}
