//! Device type selection.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

pub const CL_DEVICE_TYPE_DEFAULT: u64 = 1 << 0;
pub const CL_DEVICE_TYPE_CPU: u64 = 1 << 1;
pub const CL_DEVICE_TYPE_GPU: u64 = 1 << 2;
pub const CL_DEVICE_TYPE_ACCELERATOR: u64 = 1 << 3;
pub const CL_DEVICE_TYPE_CUSTOM: u64 = 1 << 4;
pub const CL_DEVICE_TYPE_ALL: u64 = 0xFFFF_FFFF;

/// Which class of device the harness should run against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceType {
    #[default]
    Default,
    Cpu,
    Gpu,
    Accelerator,
    Custom,
    All,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown device type `{0}` (expected default, cpu, gpu, accelerator, custom or all)")]
pub struct DeviceTypeParseError(pub String);

impl DeviceType {
    pub const ALL_TYPES: [DeviceType; 6] = [
        DeviceType::Default,
        DeviceType::Cpu,
        DeviceType::Gpu,
        DeviceType::Accelerator,
        DeviceType::Custom,
        DeviceType::All,
    ];

    /// The `cl_device_type` bitfield used when enumerating devices.
    pub const fn bits(self) -> u64 {
        match self {
            DeviceType::Default => CL_DEVICE_TYPE_DEFAULT,
            DeviceType::Cpu => CL_DEVICE_TYPE_CPU,
            DeviceType::Gpu => CL_DEVICE_TYPE_GPU,
            DeviceType::Accelerator => CL_DEVICE_TYPE_ACCELERATOR,
            DeviceType::Custom => CL_DEVICE_TYPE_CUSTOM,
            DeviceType::All => CL_DEVICE_TYPE_ALL,
        }
    }

    /// Classify the `CL_DEVICE_TYPE` a device reports about itself.
    ///
    /// Devices may set `DEFAULT` alongside their real class; the concrete
    /// class wins.
    pub fn from_reported_bits(bits: u64) -> Self {
        if bits & CL_DEVICE_TYPE_GPU != 0 {
            DeviceType::Gpu
        } else if bits & CL_DEVICE_TYPE_CPU != 0 {
            DeviceType::Cpu
        } else if bits & CL_DEVICE_TYPE_ACCELERATOR != 0 {
            DeviceType::Accelerator
        } else if bits & CL_DEVICE_TYPE_CUSTOM != 0 {
            DeviceType::Custom
        } else {
            DeviceType::Default
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            DeviceType::Default => "default",
            DeviceType::Cpu => "cpu",
            DeviceType::Gpu => "gpu",
            DeviceType::Accelerator => "accelerator",
            DeviceType::Custom => "custom",
            DeviceType::All => "all",
        }
    }
}

impl fmt::Display for DeviceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Accepts both the short spelling (`gpu`) and the API constant name
/// (`CL_DEVICE_TYPE_GPU`), case-insensitively.
impl FromStr for DeviceType {
    type Err = DeviceTypeParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lowered = s.trim().to_ascii_lowercase();
        let short = lowered.strip_prefix("cl_device_type_").unwrap_or(&lowered);
        DeviceType::ALL_TYPES
            .into_iter()
            .find(|t| t.as_str() == short)
            .ok_or_else(|| DeviceTypeParseError(s.to_string()))
    }
}
