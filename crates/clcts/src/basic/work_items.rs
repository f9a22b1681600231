use clcts_common::Version;
use clcts_harness::{create_single_kernel, into_code, KernelRequest, TestFailure};
use clcts_opencl::ClResultExt;
use opencl3::kernel::ExecuteKernel;
use opencl3::memory::{ClMem, CL_MEM_WRITE_ONLY};
use rand::Rng;

use super::{complete, local_size, Env};

const WORK_ITEM_IDS: &str = r#"
__kernel void work_item_ids(__global uint *global_ids, __global uint *local_ids,
                            __global uint *group_ids)
{
    size_t i = get_global_id(0);
    global_ids[i] = (uint)i;
    local_ids[i] = (uint)get_local_id(0);
    group_ids[i] = (uint)get_group_id(0);
}
"#;

const WORK_GROUP_REDUCE: &str = r#"
#if !defined(__OPENCL_C_VERSION__) || __OPENCL_C_VERSION__ < 200
#define CLCTS_COLLECTIVES 0
#elif __OPENCL_C_VERSION__ >= 300 && !defined(__opencl_c_work_group_collective_functions)
#define CLCTS_COLLECTIVES 0
#else
#define CLCTS_COLLECTIVES 1
#endif

__kernel void collectives_supported(__global int *flag)
{
    flag[0] = CLCTS_COLLECTIVES;
}

#if CLCTS_COLLECTIVES
__kernel void work_group_reduce(__global const int *in, __global int *out)
{
    int sum = work_group_reduce_add(in[get_global_id(0)]);
    if (get_local_id(0) == 0)
        out[get_group_id(0)] = sum;
}
#endif
"#;

pub fn test_work_item_ids(env: &mut Env<'_>) -> i32 {
    into_code(work_item_ids(env))
}

fn work_item_ids(env: &mut Env<'_>) -> Result<(), TestFailure> {
    let session = env.require_session()?;
    let local = local_size(env.info().max_work_group_size);
    let n = env.num_elements().div_ceil(local) * local;

    let sources = [WORK_ITEM_IDS];
    let kernel = create_single_kernel(session, &KernelRequest::new(&sources, "work_item_ids"))?;
    let global_buf = session.buffer::<u32>(CL_MEM_WRITE_ONLY, n)?;
    let local_buf = session.buffer::<u32>(CL_MEM_WRITE_ONLY, n)?;
    let group_buf = session.buffer::<u32>(CL_MEM_WRITE_ONLY, n)?;

    // SAFETY: three uint buffers of `n` elements; `n` is a multiple of the
    // local size.
    let event = unsafe {
        ExecuteKernel::new(kernel.kernel())
            .set_arg(&global_buf.get())
            .set_arg(&local_buf.get())
            .set_arg(&group_buf.get())
            .set_global_work_size(n)
            .set_local_work_size(local)
            .enqueue_nd_range(session.queue())
    }
    .cl_call("clEnqueueNDRangeKernel")?;
    complete(session, event)?;

    let mut global_ids = vec![0u32; n];
    let mut local_ids = vec![0u32; n];
    let mut group_ids = vec![0u32; n];
    session.download(&global_buf, &mut global_ids)?;
    session.download(&local_buf, &mut local_ids)?;
    session.download(&group_buf, &mut group_ids)?;

    for i in 0..n {
        let want = (i as u32, (i % local) as u32, (i / local) as u32);
        let got = (global_ids[i], local_ids[i], group_ids[i]);
        if got != want {
            return Err(TestFailure::Mismatch(format!(
                "work item {i} reported (global, local, group) = {got:?}, expected {want:?}"
            )));
        }
    }
    Ok(())
}

pub fn test_work_group_reduce(env: &mut Env<'_>) -> i32 {
    into_code(work_group_reduce(env))
}

fn work_group_reduce(env: &mut Env<'_>) -> Result<(), TestFailure> {
    if env.info().latest_opencl_c_version() < Version::V2_0 {
        return Err(TestFailure::Unsupported("device has no OpenCL C 2.0 or newer compiler".into()));
    }
    let session = env.require_session()?;
    let sources = [WORK_GROUP_REDUCE];

    let probe_request = KernelRequest::new(&sources, "collectives_supported");
    let probe = create_single_kernel(session, &probe_request)?;
    let flag_buf = session.buffer::<i32>(CL_MEM_WRITE_ONLY, 1)?;
    // SAFETY: single int output.
    let event = unsafe {
        ExecuteKernel::new(probe.kernel())
            .set_arg(&flag_buf.get())
            .set_global_work_size(1)
            .enqueue_nd_range(session.queue())
    }
    .cl_call("clEnqueueNDRangeKernel")?;
    complete(session, event)?;
    let mut flag = [0i32];
    session.download(&flag_buf, &mut flag)?;
    if flag[0] == 0 {
        return Err(TestFailure::Unsupported(
            "work-group collective functions not supported".into(),
        ));
    }

    let local = local_size(env.info().max_work_group_size);
    let groups = (env.num_elements() / local).max(1);
    let n = groups * local;
    let input: Vec<i32> = (0..n).map(|_| env.rng().gen_range(0..16)).collect();

    let request = KernelRequest::new(&sources, "work_group_reduce");
    let kernel = create_single_kernel(session, &request)?;
    let in_buf = session.upload(&input)?;
    let out_buf = session.buffer::<i32>(CL_MEM_WRITE_ONLY, groups)?;

    // SAFETY: `n` inputs, one output per work-group, uniform work-groups.
    let event = unsafe {
        ExecuteKernel::new(kernel.kernel())
            .set_arg(&in_buf.get())
            .set_arg(&out_buf.get())
            .set_global_work_size(n)
            .set_local_work_size(local)
            .enqueue_nd_range(session.queue())
    }
    .cl_call("clEnqueueNDRangeKernel")?;
    complete(session, event)?;

    let mut sums = vec![0i32; groups];
    session.download(&out_buf, &mut sums)?;

    for (group, (got, chunk)) in sums.iter().zip(input.chunks(local)).enumerate() {
        let want: i32 = chunk.iter().sum();
        if *got != want {
            return Err(TestFailure::Mismatch(format!(
                "work-group {group} reduced to {got}, expected {want}"
            )));
        }
    }
    Ok(())
}
