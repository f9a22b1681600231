//! The `basic` suite: smoke tests for compilation, dispatch and data
//! movement.

mod arith;
mod types;
mod work_items;

use clcts_harness::{
    test_def, ComputeDevice, RegistryError, TestDefinition, TestEnv, TestFailure, TestRegistry,
    TestStatus,
};
use clcts_opencl::{ClDevice, ClResultExt, ClSession};
use opencl3::event::Event;
use tracing::warn;

pub const SUITE: &str = "basic";

pub type Env<'a> = TestEnv<'a, ClDevice>;

pub fn registry() -> Result<TestRegistry<ClDevice>, RegistryError> {
    use arith::{test_double_add, test_float_mad, test_int_add};
    use types::test_sizeof_types;
    use work_items::{test_work_group_reduce, test_work_item_ids};

    let mut registry = TestRegistry::new();
    registry.register(test_def!(test_int_add))?;
    registry.register(test_def!(test_work_item_ids))?;
    registry.register(test_def!(test_sizeof_types))?;
    registry.register(test_def!(test_float_mad))?;
    registry.register(test_def!(test_double_add, extension = "cl_khr_fp64"))?;
    registry.register(test_def!(test_work_group_reduce, version = (2, 0)))?;
    registry.register(TestDefinition::unimplemented("image_copy"))?;
    Ok(registry)
}

/// Refuse devices the suite cannot say anything meaningful about.
pub fn check_device(device: &ClDevice) -> TestStatus {
    let info = device.info();
    if info.max_work_group_size == 0 {
        warn!("{} reports a maximum work-group size of 0", info.name);
        return TestStatus::Fail;
    }
    TestStatus::Pass
}

/// Wait for a kernel launch, then make sure the queue has drained.
fn complete(session: &ClSession, event: Event) -> Result<(), TestFailure> {
    event.wait().cl_call("clWaitForEvents")?;
    session.queue().finish().cl_call("clFinish")
}

/// Largest power of two that is at most `limit` and at most 64.
fn local_size(limit: usize) -> usize {
    let capped = limit.clamp(1, 64);
    1 << (usize::BITS - 1 - capped.leading_zeros())
}
