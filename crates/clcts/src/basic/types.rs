use clcts_common::DeviceInfo;
use clcts_harness::{create_single_kernel, into_code, KernelRequest, TestFailure};
use clcts_opencl::ClResultExt;
use opencl3::kernel::ExecuteKernel;
use opencl3::memory::{ClMem, CL_MEM_WRITE_ONLY};

use super::{complete, Env};

const SIZEOF_TYPES: &str = r#"
__kernel void sizeof_types(__global uint *out)
{
    out[0] = sizeof(char);
    out[1] = sizeof(short);
    out[2] = sizeof(int);
    out[3] = sizeof(float);
    out[4] = sizeof(void *);
    out[5] = sizeof(size_t);
#ifdef CLCTS_HAVE_LONG
    out[6] = sizeof(long);
#endif
}
"#;

/// Type names in the order the kernel writes them.
const TYPE_NAMES: [&str; 7] = ["char", "short", "int", "float", "void*", "size_t", "long"];

/// Sizes the kernel must report on `info`. `long` is only checked where the
/// device supports 64-bit integers.
fn expected_sizes(info: &DeviceInfo) -> Vec<u32> {
    let pointer = info.pointer_size();
    let mut sizes = vec![1, 2, 4, 4, pointer, pointer];
    if info.supports_long() {
        sizes.push(8);
    }
    sizes
}

pub fn test_sizeof_types(env: &mut Env<'_>) -> i32 {
    into_code(sizeof_types(env))
}

fn sizeof_types(env: &mut Env<'_>) -> Result<(), TestFailure> {
    let session = env.require_session()?;
    let expected = expected_sizes(env.info());
    let options = if env.info().supports_long() { "-DCLCTS_HAVE_LONG" } else { "" };

    let sources = [SIZEOF_TYPES];
    let request = KernelRequest::new(&sources, "sizeof_types").with_options(options);
    let kernel = create_single_kernel(session, &request)?;
    let out_buf = session.buffer::<u32>(CL_MEM_WRITE_ONLY, TYPE_NAMES.len())?;

    // SAFETY: one buffer argument with room for every type.
    let event = unsafe {
        ExecuteKernel::new(kernel.kernel())
            .set_arg(&out_buf.get())
            .set_global_work_size(1)
            .enqueue_nd_range(session.queue())
    }
    .cl_call("clEnqueueNDRangeKernel")?;
    complete(session, event)?;

    let mut out = vec![0u32; TYPE_NAMES.len()];
    session.download(&out_buf, &mut out)?;

    let wrong: Vec<String> = expected
        .iter()
        .zip(&out)
        .zip(TYPE_NAMES)
        .filter(|((want, got), _)| want != got)
        .map(|((want, got), name)| format!("sizeof({name}) = {got}, expected {want}"))
        .collect();
    if wrong.is_empty() {
        Ok(())
    } else {
        Err(TestFailure::Mismatch(wrong.join("; ")))
    }
}
