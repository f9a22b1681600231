use std::ptr;

use clcts_common::{max_opencl_c_for_devices, DeviceInfo, QueueProperties, Version};
use clcts_harness::{
    BuildFailure, BuildStatus, DeviceBuildLog, DeviceError, DeviceSession, KernelRequest,
    TestFailure,
};
use opencl3::command_queue::CommandQueue;
use opencl3::context::Context;
use opencl3::device::Device;
use opencl3::error_codes::ClError;
use opencl3::kernel::Kernel;
use opencl3::memory::{Buffer, CL_MEM_READ_WRITE};
use opencl3::program::Program;
use opencl3::types::{cl_mem_flags, CL_BLOCKING};
use tracing::debug;

use super::ClResultExt;
use crate::select::QueueApi;

/// Context and in-order (or out-of-order, if asked) queue on one device.
pub struct ClSession {
    context: Context,
    queue: CommandQueue,
    latest_cl_c: Version,
}

impl std::fmt::Debug for ClSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClSession").field("latest_cl_c", &self.latest_cl_c).finish()
    }
}

impl ClSession {
    pub(super) fn open(
        device: &Device,
        info: &DeviceInfo,
        properties: QueueProperties,
    ) -> Result<Self, DeviceError> {
        let context = Context::from_device(device).device_call("clCreateContext")?;
        let queue = match QueueApi::for_version(info.version) {
            QueueApi::Legacy => {
                #[allow(deprecated)]
                let queue = CommandQueue::create_default(&context, properties.bits());
                queue.device_call("clCreateCommandQueue")?
            }
            QueueApi::WithProperties => {
                CommandQueue::create_default_with_properties(&context, properties.bits(), 0)
                    .device_call("clCreateCommandQueueWithProperties")?
            }
        };
        debug!("opened session on {} with queue properties {:#x}", info.name, properties.bits());
        // The context holds exactly `device`.
        let latest_cl_c = max_opencl_c_for_devices([info]);
        Ok(Self { context, queue, latest_cl_c })
    }

    pub fn context(&self) -> &Context {
        &self.context
    }

    pub fn queue(&self) -> &CommandQueue {
        &self.queue
    }

    /// Newest OpenCL C dialect the device accepts.
    pub fn latest_cl_c(&self) -> Version {
        self.latest_cl_c
    }

    /// Read-write buffer initialised from `data` with a blocking write.
    pub fn upload<T>(&self, data: &[T]) -> Result<Buffer<T>, TestFailure> {
        let mut buffer = self.buffer::<T>(CL_MEM_READ_WRITE, data.len())?;
        // SAFETY: the write is blocking and `buffer` holds `data.len()` elements.
        unsafe { self.queue.enqueue_write_buffer(&mut buffer, CL_BLOCKING, 0, data, &[]) }
            .cl_call("clEnqueueWriteBuffer")?;
        Ok(buffer)
    }

    /// Uninitialised device buffer of `len` elements.
    pub fn buffer<T>(&self, flags: cl_mem_flags, len: usize) -> Result<Buffer<T>, TestFailure> {
        // SAFETY: no host pointer is passed, so the driver owns the storage.
        unsafe { Buffer::<T>::create(&self.context, flags, len, ptr::null_mut()) }
            .cl_call("clCreateBuffer")
    }

    /// Blocking read of the whole of `out.len()` elements from `buffer`.
    pub fn download<T>(&self, buffer: &Buffer<T>, out: &mut [T]) -> Result<(), TestFailure> {
        // SAFETY: the read is blocking, so `out` is filled before we return.
        unsafe { self.queue.enqueue_read_buffer(buffer, CL_BLOCKING, 0, out, &[]) }
            .cl_call("clEnqueueReadBuffer")?;
        Ok(())
    }

    fn build_logs(&self, program: &Program) -> Vec<DeviceBuildLog> {
        self.context
            .devices()
            .iter()
            .map(|&id| {
                let device_name = Device::new(id).name().unwrap_or_else(|_| format!("{id:?}"));
                let status = program
                    .get_build_status(id)
                    .map(BuildStatus::from_raw)
                    .unwrap_or(BuildStatus::Unknown(i32::MIN));
                let log = program.get_build_log(id).unwrap_or_default();
                DeviceBuildLog { device_name, status, log }
            })
            .collect()
    }
}

/// A compiled kernel and the program that owns it.
pub struct ClKernel {
    kernel: Kernel,
    _program: Program,
}

impl ClKernel {
    pub fn kernel(&self) -> &Kernel {
        &self.kernel
    }
}

impl std::fmt::Debug for ClKernel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClKernel").finish_non_exhaustive()
    }
}

impl DeviceSession for ClSession {
    type Kernel = ClKernel;

    fn build_kernel(&self, request: &KernelRequest<'_>) -> Result<ClKernel, BuildFailure> {
        let options = request.effective_build_options(self.latest_cl_c);
        let mut program = Program::create_from_sources(&self.context, request.sources)
            .map_err(|ClError(code)| BuildFailure::Api { call: "clCreateProgramWithSource", code })?;

        if let Err(ClError(code)) = program.build(self.context.devices(), &options) {
            let devices = self.build_logs(&program);
            return Err(BuildFailure::build(code, &options, request.sources, devices));
        }

        let kernel = Kernel::create(&program, request.kernel_name).map_err(|ClError(code)| {
            BuildFailure::Kernel { kernel_name: request.kernel_name.to_string(), code }
        })?;
        Ok(ClKernel { kernel, _program: program })
    }

    fn finish(&self) -> Result<(), DeviceError> {
        self.queue.finish().device_call("clFinish")
    }
}
