//! Harness configuration.
//!
//! Settings are layered lowest to highest: built-in defaults, an optional
//! TOML file, the conformance environment variables, then command-line
//! flags. [`ConfigBuilder`] applies the layers in that order.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use clcts_common::{DeviceType, QueueProperties};
use serde::{Deserialize, Serialize};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use crate::cli::HarnessArgs;
use crate::device::DeviceRequest;
use crate::dispatch::{ContextMode, DispatchOptions};
use crate::error::ConfigError;

/// Element count handed to tests when none is requested.
pub const DEFAULT_NUM_ELEMENTS: usize = 0x4000;

pub const ENV_DEVICE_TYPE: &str = "CL_DEVICE_TYPE";
pub const ENV_PLATFORM_INDEX: &str = "CL_PLATFORM_INDEX";
pub const ENV_DEVICE_INDEX: &str = "CL_DEVICE_INDEX";
pub const ENV_RESULTS_FILE: &str = "CL_CONFORMANCE_RESULTS_FILENAME";

/// Which layer last set a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SettingSource {
    #[default]
    Default,
    ConfigFile,
    Environment,
    CommandLine,
}

impl fmt::Display for SettingSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SettingSource::Default => "default",
            SettingSource::ConfigFile => "configuration file",
            SettingSource::Environment => "environment variable",
            SettingSource::CommandLine => "command line",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HarnessConfig {
    pub device: DeviceConfig,
    pub run: RunConfig,
    pub report: ReportConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DeviceConfig {
    pub device_type: DeviceType,
    pub platform_index: usize,
    pub device_index: usize,
    pub profiling: bool,
    pub out_of_order: bool,
    #[serde(skip)]
    pub device_type_source: SettingSource,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RunConfig {
    /// Element count for tests; `0` means [`DEFAULT_NUM_ELEMENTS`].
    pub num_elements: usize,
    pub seed: u32,
    pub randomize: bool,
    pub reseed: bool,
    pub context_mode: ContextMode,
    pub tests: Vec<String>,
    pub exclude: Vec<String>,
    #[serde(skip)]
    pub list: bool,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            num_elements: DEFAULT_NUM_ELEMENTS,
            seed: 0,
            randomize: false,
            reseed: false,
            context_mode: ContextMode::default(),
            tests: Vec::new(),
            exclude: Vec::new(),
            list: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ReportConfig {
    pub results_file: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingConfig {
    /// `tracing` filter directive used when `RUST_LOG` is unset.
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: "info".to_string() }
    }
}

impl HarnessConfig {
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        Ok(ConfigBuilder::from_file(path)?.config)
    }

    pub fn device_request(&self) -> DeviceRequest {
        DeviceRequest {
            device_type: self.device.device_type,
            platform_index: self.device.platform_index,
            device_index: self.device.device_index,
        }
    }

    pub fn queue_properties(&self) -> QueueProperties {
        QueueProperties { profiling: self.device.profiling, out_of_order: self.device.out_of_order }
    }

    pub fn dispatch_options(&self) -> DispatchOptions {
        DispatchOptions {
            num_elements: self.run.num_elements,
            context_mode: self.run.context_mode,
            queue_properties: self.queue_properties(),
        }
    }
}

/// Layered construction of a [`HarnessConfig`].
#[derive(Debug, Clone, Default)]
pub struct ConfigBuilder {
    config: HarnessConfig,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path)
            .map_err(|source| ConfigError::Read { path: path.to_path_buf(), source })?;
        let parse_error = |source| ConfigError::Parse { path: path.to_path_buf(), source };
        let mut config: HarnessConfig = toml::from_str(&text).map_err(parse_error)?;

        let table: toml::Table = toml::from_str(&text).map_err(parse_error)?;
        let sets_device_type = table
            .get("device")
            .and_then(|device| device.get("device_type"))
            .is_some();
        if sets_device_type {
            config.device.device_type_source = SettingSource::ConfigFile;
        }
        debug!("loaded configuration from {}", path.display());
        Ok(Self { config })
    }

    /// Apply the conformance environment variables from the process
    /// environment.
    pub fn with_env(self) -> Result<Self, ConfigError> {
        self.with_env_from(|name| std::env::var(name).ok())
    }

    /// Apply environment overrides using `lookup` to read variables. Empty
    /// values count as unset.
    pub fn with_env_from<F>(mut self, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

        if let Some(value) = read(ENV_DEVICE_TYPE) {
            self.config.device.device_type = value
                .parse()
                .map_err(|source| ConfigError::DeviceType { origin: ENV_DEVICE_TYPE, source })?;
            self.config.device.device_type_source = SettingSource::Environment;
        }
        if let Some(value) = read(ENV_PLATFORM_INDEX) {
            self.config.device.platform_index = parse_index(ENV_PLATFORM_INDEX, &value)?;
        }
        if let Some(value) = read(ENV_DEVICE_INDEX) {
            self.config.device.device_index = parse_index(ENV_DEVICE_INDEX, &value)?;
        }
        if let Some(value) = read(ENV_RESULTS_FILE) {
            self.config.report.results_file = Some(PathBuf::from(value));
        }
        Ok(self)
    }

    /// Apply command-line flags, which take precedence over every other
    /// layer.
    pub fn with_args(mut self, args: &HarnessArgs) -> Self {
        let device = &mut self.config.device;
        if let Some(device_type) = args.device_type {
            device.device_type = device_type;
            device.device_type_source = SettingSource::CommandLine;
        }
        if let Some(index) = args.platform_index {
            device.platform_index = index;
        }
        if let Some(index) = args.device_index {
            device.device_index = index;
        }
        device.profiling |= args.profiling;
        device.out_of_order |= args.out_of_order;

        let run = &mut self.config.run;
        if let Some(n) = args.num_elements {
            run.num_elements = usize::try_from(n).unwrap_or(0);
        }
        if let Some(seed) = args.seed {
            run.seed = seed;
        }
        run.randomize |= args.randomize;
        run.reseed |= args.reseed;
        if let Some(mode) = args.context_mode {
            run.context_mode = mode;
        }
        if !args.tests.is_empty() {
            run.tests = args.tests.clone();
        }
        if !args.exclude.is_empty() {
            run.exclude = args.exclude.clone();
        }
        run.list = args.list;

        if let Some(path) = &args.results_file {
            self.config.report.results_file = Some(path.clone());
        }
        if let Some(level) = &args.log_level {
            self.config.logging.level = level.clone();
        }
        self
    }

    pub fn build(mut self) -> Result<HarnessConfig, ConfigError> {
        if self.config.run.num_elements == 0 {
            self.config.run.num_elements = DEFAULT_NUM_ELEMENTS;
        }
        EnvFilter::try_new(&self.config.logging.level)
            .map_err(|_| ConfigError::InvalidLogLevel(self.config.logging.level.clone()))?;
        Ok(self.config)
    }

    /// The full layering for a command line: `--config` file if given, then
    /// the environment, then the flags themselves.
    pub fn from_args(args: &HarnessArgs) -> Result<HarnessConfig, ConfigError> {
        let builder = match &args.config {
            Some(path) => Self::from_file(path)?,
            None => Self::new(),
        };
        builder.with_env()?.with_args(args).build()
    }
}

fn parse_index(var: &'static str, value: &str) -> Result<usize, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::InvalidIndex { var, value: value.to_string() })
}
