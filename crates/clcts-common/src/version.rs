//! OpenCL platform and OpenCL C version numbers.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// A `major.minor` OpenCL version.
///
/// Ordering is lexicographic on `(major, minor)`, so `Version::new(1, 2) <
/// Version::new(2, 0)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct Version {
    pub major: u32,
    pub minor: u32,
}

/// Errors produced while parsing version strings reported by a device.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum VersionParseError {
    #[error("version string `{0}` does not start with `{1}`")]
    MissingPrefix(String, &'static str),

    #[error("version string `{0}` has no `major.minor` component")]
    Malformed(String),
}

impl Version {
    pub const V1_0: Version = Version::new(1, 0);
    pub const V1_1: Version = Version::new(1, 1);
    pub const V1_2: Version = Version::new(1, 2);
    pub const V2_0: Version = Version::new(2, 0);
    pub const V2_1: Version = Version::new(2, 1);
    pub const V2_2: Version = Version::new(2, 2);
    pub const V3_0: Version = Version::new(3, 0);

    pub const fn new(major: u32, minor: u32) -> Self {
        Self { major, minor }
    }

    /// Parse a `CL_DEVICE_VERSION` string such as `"OpenCL 3.0 CUDA"`.
    pub fn parse_device_version(s: &str) -> Result<Self, VersionParseError> {
        Self::parse_prefixed(s, "OpenCL ")
    }

    /// Parse a `CL_DEVICE_OPENCL_C_VERSION` string such as `"OpenCL C 1.2 "`.
    pub fn parse_opencl_c_version(s: &str) -> Result<Self, VersionParseError> {
        Self::parse_prefixed(s, "OpenCL C ")
    }

    fn parse_prefixed(s: &str, prefix: &'static str) -> Result<Self, VersionParseError> {
        let rest = s
            .trim_start()
            .strip_prefix(prefix)
            .ok_or_else(|| VersionParseError::MissingPrefix(s.to_string(), prefix))?;
        let token = rest.split_whitespace().next().unwrap_or_default();
        token.parse().map_err(|_| VersionParseError::Malformed(s.to_string()))
    }

    /// Decode a packed `cl_version` (`major:10 | minor:10 | patch:12`).
    pub const fn from_packed(packed: u32) -> Self {
        Self { major: packed >> 22, minor: (packed >> 12) & 0x3ff }
    }

    /// `CL_DEVICE_OPENCL_C_VERSION` was added in 1.1; 1.0 devices compile
    /// OpenCL C 1.0 without reporting it.
    pub fn reports_opencl_c_version(self) -> bool {
        self >= Version::V1_1
    }

    /// Value of `-cl-std=` to request for this OpenCL C version, if any.
    ///
    /// 1.x compilers default to the newest 1.x dialect they support, so no
    /// option is needed there.
    pub fn cl_std_option(self) -> Option<&'static str> {
        if self >= Version::V3_0 {
            Some("-cl-std=CL3.0")
        } else if self >= Version::V2_0 {
            Some("-cl-std=CL2.0")
        } else {
            None
        }
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

impl FromStr for Version {
    type Err = VersionParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let malformed = || VersionParseError::Malformed(s.to_string());
        let (major, minor) = s.trim().split_once('.').ok_or_else(malformed)?;
        let major = major.parse().map_err(|_| malformed())?;
        let minor = minor.parse().map_err(|_| malformed())?;
        Ok(Self { major, minor })
    }
}
