//! Error types for harness-level failures.
//!
//! Anything in here aborts the whole run. Per-test problems never surface as
//! these errors; they are folded into a [`TestStatus`](crate::TestStatus).

use std::path::PathBuf;

use clcts_common::{error_name, DeviceType, DeviceTypeParseError, VersionParseError};

#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("test `{0}` is already registered")]
    DuplicateName(String),

    #[error("test names must not be empty")]
    EmptyName,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SelectionError {
    #[error("test '{0}' has already been selected")]
    AlreadySelected(String),

    #[error("test '{0}' is missing implementation")]
    MissingImplementation(String),

    #[error("the argument '{0}' did not match any test names")]
    NoMatch(String),

    #[error("invalid test pattern '{0}': '*' is only allowed at the end")]
    InvalidPattern(String),
}

#[derive(Debug, thiserror::Error)]
pub enum DeviceError {
    #[error("no OpenCL platforms found")]
    NoPlatforms,

    #[error(
        "platform index out of range -- chosen platform index ({index}) >= number of platforms ({count})"
    )]
    PlatformIndexOutOfRange { index: usize, count: usize },

    #[error("no {device_type} devices found on platform {platform_index}")]
    NoMatchingDevice { device_type: DeviceType, platform_index: usize },

    #[error("device index out of range -- chosen device index ({index}) >= number of devices ({count})")]
    DeviceIndexOutOfRange { index: usize, count: usize },

    #[error("unable to parse device version: {0}")]
    UnknownVersion(#[from] VersionParseError),

    #[error("invalid device address bit size returned by device ({0})")]
    InvalidAddressBits(u32),

    #[error("{call} failed: {} ({code})", error_name(*.code))]
    Api { call: &'static str, code: i32 },

    #[error("OpenCL support is not compiled in; rebuild with the `runtime` feature of clcts-opencl")]
    BackendUnavailable,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("{origin}: {source}")]
    DeviceType {
        origin: &'static str,
        #[source]
        source: DeviceTypeParseError,
    },

    #[error("invalid value `{value}` for {var}: expected a non-negative integer")]
    InvalidIndex { var: &'static str, value: String },

    #[error("invalid log level `{0}`")]
    InvalidLogLevel(String),
}

#[derive(Debug, thiserror::Error)]
pub enum HarnessError {
    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Selection(#[from] SelectionError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("device acquisition failed: {0}")]
    Device(#[from] DeviceError),

    #[error("unable to create the shared test session: {0}")]
    SharedSession(#[source] DeviceError),

    #[error("failed to write results to {path}: {source}")]
    Results {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to initialise logging: {0}")]
    Logging(String),
}
