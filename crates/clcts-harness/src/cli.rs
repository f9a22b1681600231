//! Command-line surface shared by every suite binary.

use std::path::PathBuf;

use clap::Parser;
use clcts_common::DeviceType;

use crate::dispatch::ContextMode;

#[derive(Debug, Clone, Default, Parser)]
#[command(
    name = "clcts",
    version,
    about = "OpenCL conformance test harness",
    after_help = "Environment: CL_DEVICE_TYPE, CL_PLATFORM_INDEX, CL_DEVICE_INDEX and \
                  CL_CONFORMANCE_RESULTS_FILENAME are honoured when the matching flag is absent."
)]
pub struct HarnessArgs {
    /// Tests to run: a test name, a `prefix*` wildcard, or `all` (default)
    #[arg(value_name = "TEST")]
    pub tests: Vec<String>,

    /// Remove a test name or `prefix*` wildcard from the selection
    #[arg(short = 'x', long = "exclude", value_name = "PATTERN")]
    pub exclude: Vec<String>,

    /// List the registered tests and exit
    #[arg(short, long)]
    pub list: bool,

    /// Device type to run on: default, cpu, gpu, accelerator, custom or all
    #[arg(short = 't', long, value_name = "TYPE")]
    pub device_type: Option<DeviceType>,

    /// Index of the platform to use
    #[arg(long, value_name = "INDEX")]
    pub platform_index: Option<usize>,

    /// Index of the device within the platform
    #[arg(long, value_name = "INDEX")]
    pub device_index: Option<usize>,

    /// Element count handed to each test; zero or negative selects the default
    #[arg(short = 'n', long, value_name = "N", allow_negative_numbers = true)]
    pub num_elements: Option<i64>,

    /// Seed for the per-test random generators
    #[arg(short, long, value_name = "SEED", conflicts_with = "randomize")]
    pub seed: Option<u32>,

    /// Seed from the clock and reseed every test
    #[arg(long)]
    pub randomize: bool,

    /// Give every test its own generator seeded from `seed + test index`
    #[arg(long)]
    pub reseed: bool,

    /// How tests get their context and queue: shared, per-test or none
    #[arg(long, value_name = "MODE")]
    pub context_mode: Option<ContextMode>,

    /// Enable queue profiling
    #[arg(long)]
    pub profiling: bool,

    /// Request an out-of-order command queue
    #[arg(long)]
    pub out_of_order: bool,

    /// Write a JSON results file
    #[arg(long, value_name = "PATH")]
    pub results_file: Option<PathBuf>,

    /// TOML configuration file
    #[arg(short, long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Log filter used when RUST_LOG is unset (e.g. info, debug, clcts_harness=trace)
    #[arg(long, value_name = "LEVEL")]
    pub log_level: Option<String>,
}
