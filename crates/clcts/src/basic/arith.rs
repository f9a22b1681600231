use clcts_harness::{create_single_kernel, into_code, KernelRequest, TestFailure};
use clcts_opencl::ClResultExt;
use opencl3::kernel::ExecuteKernel;
use opencl3::memory::{ClMem, CL_MEM_WRITE_ONLY};
use rand::Rng;
use tracing::error;

use super::{complete, Env};

const INT_ADD: &str = r#"
__kernel void int_add(__global const int *a, __global const int *b, __global int *out)
{
    size_t i = get_global_id(0);
    out[i] = a[i] + b[i];
}
"#;

const FLOAT_MAD: &str = r#"
__kernel void float_mad(__global const float *a, __global const float *b,
                        __global const float *c, __global float *out)
{
    size_t i = get_global_id(0);
    out[i] = a[i] * b[i] + c[i];
}
"#;

const DOUBLE_ADD: &str = r#"
#pragma OPENCL EXTENSION cl_khr_fp64 : enable
__kernel void double_add(__global const double *a, __global const double *b,
                         __global double *out)
{
    size_t i = get_global_id(0);
    out[i] = a[i] + b[i];
}
"#;

/// Magnitude ranges exercised by `float_mad`, one sub-test each.
const MAD_RANGES: [(f32, f32); 4] = [(0.0, 1.0), (-1.0, 1.0), (-1.0e3, 1.0e3), (-1.0e-3, 1.0e-3)];

pub fn test_int_add(env: &mut Env<'_>) -> i32 {
    into_code(int_add(env))
}

fn int_add(env: &mut Env<'_>) -> Result<(), TestFailure> {
    let session = env.require_session()?;
    let n = env.num_elements();
    let a: Vec<i32> = (0..n).map(|_| env.rng().gen_range(-(1 << 30)..(1 << 30))).collect();
    let b: Vec<i32> = (0..n).map(|_| env.rng().gen_range(-(1 << 30)..(1 << 30))).collect();

    let sources = [INT_ADD];
    let kernel = create_single_kernel(session, &KernelRequest::new(&sources, "int_add"))?;
    let a_buf = session.upload(&a)?;
    let b_buf = session.upload(&b)?;
    let out_buf = session.buffer::<i32>(CL_MEM_WRITE_ONLY, n)?;

    // SAFETY: argument types match the kernel signature and every buffer
    // holds `n` elements.
    let event = unsafe {
        ExecuteKernel::new(kernel.kernel())
            .set_arg(&a_buf.get())
            .set_arg(&b_buf.get())
            .set_arg(&out_buf.get())
            .set_global_work_size(n)
            .enqueue_nd_range(session.queue())
    }
    .cl_call("clEnqueueNDRangeKernel")?;
    complete(session, event)?;

    let mut out = vec![0i32; n];
    session.download(&out_buf, &mut out)?;

    let mismatch = (0..n).find(|&i| out[i] != a[i].wrapping_add(b[i]));
    match mismatch {
        Some(i) => Err(TestFailure::Mismatch(format!(
            "int_add[{i}]: {} + {} gave {}, expected {}",
            a[i],
            b[i],
            out[i],
            a[i].wrapping_add(b[i])
        ))),
        None => Ok(()),
    }
}

pub fn test_float_mad(env: &mut Env<'_>) -> i32 {
    into_code(float_mad(env))
}

/// `a * b + c` may be contracted to a fused multiply-add, so results are
/// compared against an f64 reference with a few ulps of slack.
fn mad_within_tolerance(a: f32, b: f32, c: f32, got: f32) -> bool {
    let (a, b, c) = (f64::from(a), f64::from(b), f64::from(c));
    let reference = a * b + c;
    let scale = (a * b).abs() + c.abs();
    (f64::from(got) - reference).abs() <= 4.0 * f64::from(f32::EPSILON) * scale
}

fn float_mad(env: &mut Env<'_>) -> Result<(), TestFailure> {
    let session = env.require_session()?;
    let per_range = (env.num_elements() / MAD_RANGES.len()).max(1);
    let n = per_range * MAD_RANGES.len();

    let mut inputs = [Vec::with_capacity(n), Vec::with_capacity(n), Vec::with_capacity(n)];
    for &(lo, hi) in &MAD_RANGES {
        for _ in 0..per_range {
            for input in inputs.iter_mut() {
                input.push(env.rng().gen_range(lo..hi));
            }
        }
    }
    let [a, b, c] = inputs;

    let sources = [FLOAT_MAD];
    let kernel = create_single_kernel(session, &KernelRequest::new(&sources, "float_mad"))?;
    let a_buf = session.upload(&a)?;
    let b_buf = session.upload(&b)?;
    let c_buf = session.upload(&c)?;
    let out_buf = session.buffer::<f32>(CL_MEM_WRITE_ONLY, n)?;

    // SAFETY: as in `int_add`.
    let event = unsafe {
        ExecuteKernel::new(kernel.kernel())
            .set_arg(&a_buf.get())
            .set_arg(&b_buf.get())
            .set_arg(&c_buf.get())
            .set_arg(&out_buf.get())
            .set_global_work_size(n)
            .enqueue_nd_range(session.queue())
    }
    .cl_call("clEnqueueNDRangeKernel")?;
    complete(session, event)?;

    let mut out = vec![0f32; n];
    session.download(&out_buf, &mut out)?;

    let mut failed_ranges = 0;
    for (range, &(lo, hi)) in MAD_RANGES.iter().enumerate() {
        let block = range * per_range..(range + 1) * per_range;
        let bad = block.clone().find(|&i| !mad_within_tolerance(a[i], b[i], c[i], out[i]));
        if let Some(i) = bad {
            error!(
                "float_mad [{lo}, {hi}): {} * {} + {} gave {}, expected {}",
                a[i],
                b[i],
                c[i],
                out[i],
                f64::from(a[i]) * f64::from(b[i]) + f64::from(c[i])
            );
            failed_ranges += 1;
        }
        env.record_subtest(bad.is_none());
    }

    if failed_ranges > 0 {
        return Err(TestFailure::Mismatch(format!(
            "{failed_ranges} of {} input ranges out of tolerance",
            MAD_RANGES.len()
        )));
    }
    Ok(())
}

pub fn test_double_add(env: &mut Env<'_>) -> i32 {
    into_code(double_add(env))
}

fn double_add(env: &mut Env<'_>) -> Result<(), TestFailure> {
    if !env.info().supports_double() {
        return Err(TestFailure::Unsupported(
            "device lists cl_khr_fp64 but reports no double precision support".into(),
        ));
    }
    let session = env.require_session()?;
    let n = env.num_elements();
    let a: Vec<f64> = (0..n).map(|_| env.rng().gen_range(-1.0e6..1.0e6)).collect();
    let b: Vec<f64> = (0..n).map(|_| env.rng().gen_range(-1.0e6..1.0e6)).collect();

    let sources = [DOUBLE_ADD];
    let kernel = create_single_kernel(session, &KernelRequest::new(&sources, "double_add"))?;
    let a_buf = session.upload(&a)?;
    let b_buf = session.upload(&b)?;
    let out_buf = session.buffer::<f64>(CL_MEM_WRITE_ONLY, n)?;

    // SAFETY: as in `int_add`.
    let event = unsafe {
        ExecuteKernel::new(kernel.kernel())
            .set_arg(&a_buf.get())
            .set_arg(&b_buf.get())
            .set_arg(&out_buf.get())
            .set_global_work_size(n)
            .enqueue_nd_range(session.queue())
    }
    .cl_call("clEnqueueNDRangeKernel")?;
    complete(session, event)?;

    let mut out = vec![0f64; n];
    session.download(&out_buf, &mut out)?;

    // Addition is correctly rounded, so results must match exactly.
    match (0..n).find(|&i| out[i] != a[i] + b[i]) {
        Some(i) => Err(TestFailure::Mismatch(format!(
            "double_add[{i}]: {} + {} gave {}, expected {}",
            a[i],
            b[i],
            out[i],
            a[i] + b[i]
        ))),
        None => Ok(()),
    }
}
