//! clcts: run OpenCL conformance suites against one device.
//!
//! ```text
//! clcts --list
//! clcts int_add float_mad -t gpu --results-file basic.json
//! CL_DEVICE_TYPE=cpu clcts 'work_*' -x work_group_reduce
//! ```

use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use clcts_harness::exit::EXIT_HARNESS_FAILURE;
use clcts_harness::{init_logging, ConfigBuilder, Harness, HarnessArgs, HarnessConfig, Reporter};
use clcts_opencl::ClProvider;
use tracing::{debug, error};

mod basic;

fn main() -> ExitCode {
    let args = HarnessArgs::parse();

    let config = match ConfigBuilder::from_args(&args).context("failed to build configuration") {
        Ok(config) => config,
        Err(err) => {
            // Logging is configured from the very settings that failed.
            let _ = init_logging("warn");
            report_error(&err);
            return exit_code(EXIT_HARNESS_FAILURE);
        }
    };
    if let Err(err) = init_logging(&config.logging.level) {
        eprintln!("clcts: {err}");
    }

    match run(&config) {
        Ok(code) => exit_code(code),
        Err(err) => {
            report_error(&err);
            exit_code(EXIT_HARNESS_FAILURE)
        }
    }
}

fn run(config: &HarnessConfig) -> Result<i32> {
    let registry = basic::registry().context("failed to register the basic suite")?;
    debug!("{} tests registered in suite {}", registry.len(), basic::SUITE);

    let outcome = Harness::new(basic::SUITE, &registry)
        .with_device_check(basic::check_device)
        .run(config, &ClProvider::new(), &mut Reporter::stdout())
        .context("conformance run aborted")?;
    Ok(outcome.exit_code)
}

fn report_error(err: &anyhow::Error) {
    error!("{err}");
    for cause in err.chain().skip(1) {
        error!("  Caused by: {cause}");
    }
}

fn exit_code(code: i32) -> ExitCode {
    ExitCode::from(u8::try_from(code).unwrap_or(1))
}
