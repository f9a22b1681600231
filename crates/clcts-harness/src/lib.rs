//! Test harness for OpenCL conformance suites.
//!
//! A suite registers its tests in a [`TestRegistry`], hands it to a
//! [`Harness`] together with a [`DeviceProvider`], and gets back an exit
//! code. The harness owns everything in between: selecting tests from the
//! command line, acquiring the device, the sequential dispatch loop, the
//! console report and the optional JSON results file.
//!
//! ```ignore
//! let mut registry = TestRegistry::new();
//! registry.register(test_def!(test_int_add))?;
//! registry.register(test_def!(test_work_group_reduce, version = (2, 0)))?;
//!
//! let config = ConfigBuilder::from_args(&HarnessArgs::parse())?;
//! let outcome = Harness::new("basic", &registry).run(&config, &provider, &mut Reporter::stdout())?;
//! std::process::exit(outcome.exit_code);
//! ```

pub mod cli;
pub mod config;
pub mod context;
pub mod device;
pub mod dispatch;
pub mod error;
pub mod exit;
pub mod harness;
pub mod kernel;
pub mod logging;
pub mod mock;
pub mod registry;
pub mod report;
pub mod results;
pub mod seed;
pub mod selection;
pub mod status;

pub use clcts_common::{DeviceInfo, DeviceType, QueueProperties, Version};

pub use cli::HarnessArgs;
pub use config::{ConfigBuilder, HarnessConfig, DEFAULT_NUM_ELEMENTS};
pub use context::{RunState, SubTestCounters, TestEnv};
pub use device::{ComputeDevice, DeviceProvider, DeviceRequest, DeviceSession};
pub use dispatch::{ContextMode, DispatchOptions, Dispatcher, TestRecord};
pub use error::{ConfigError, DeviceError, HarnessError, RegistryError, SelectionError};
pub use harness::{DeviceCheck, Harness, HarnessOutcome};
pub use kernel::{create_single_kernel, BuildFailure, BuildStatus, DeviceBuildLog, KernelRequest};
pub use logging::init_logging;
pub use registry::{TestCase, TestDefinition, TestFn, TestRegistry};
pub use report::{Reporter, RunSummary};
pub use seed::SeedPolicy;
pub use selection::{select_tests, SelectionMask};
pub use status::{into_code, TestFailure, TestStatus, TEST_FAILED, TEST_SKIPPED_ITSELF};
