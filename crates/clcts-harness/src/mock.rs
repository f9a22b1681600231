//! Hardware-free device for exercising the harness.
//!
//! Suites can dry-run their registries against it, and the harness's own
//! tests use it to drive selection, dispatch and reporting end to end.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use clcts_common::{max_opencl_c_for_devices, DeviceInfo, DeviceType, QueueProperties, Version};

use crate::device::{ComputeDevice, DeviceProvider, DeviceRequest, DeviceSession};
use crate::error::DeviceError;
use crate::kernel::{BuildFailure, KernelRequest};

/// Knobs for making a [`MockDevice`] misbehave.
#[derive(Debug, Clone, Default)]
pub struct MockBehaviour {
    pub fail_open_session: bool,
    pub fail_finish: bool,
    pub build_failure: Option<BuildFailure>,
}

#[derive(Debug, Default)]
struct Counters {
    sessions_opened: Cell<usize>,
    finish_calls: Cell<usize>,
    last_properties: Cell<Option<QueueProperties>>,
}

#[derive(Debug, Clone)]
pub struct MockDevice {
    info: DeviceInfo,
    behaviour: MockBehaviour,
    counters: Rc<Counters>,
}

impl MockDevice {
    /// A full-profile 64-bit device reporting `version`.
    pub fn new(version: Version) -> Self {
        let (opencl_c_version, opencl_c_all_versions) = if version >= Version::V3_0 {
            (Version::V1_2, vec![Version::V1_0, Version::V1_1, Version::V1_2, Version::V3_0])
        } else {
            (version, Vec::new())
        };
        let info = DeviceInfo {
            name: "Mock Device".into(),
            vendor: "clcts".into(),
            platform_name: "clcts mock platform".into(),
            driver_version: env!("CARGO_PKG_VERSION").into(),
            version_string: format!("OpenCL {version} mock"),
            version,
            opencl_c_version,
            opencl_c_all_versions,
            profile: "FULL_PROFILE".into(),
            device_type: DeviceType::Cpu,
            extensions: Vec::new(),
            address_bits: 64,
            max_work_group_size: 256,
            queue_properties: QueueProperties { profiling: true, out_of_order: true }.bits(),
            ..DeviceInfo::default()
        };
        Self::from_info(info)
    }

    pub fn from_info(info: DeviceInfo) -> Self {
        Self { info, behaviour: MockBehaviour::default(), counters: Rc::default() }
    }

    pub fn with_extensions(mut self, extensions: &[&str]) -> Self {
        self.info.extensions = extensions.iter().map(|e| e.to_string()).collect();
        self
    }

    pub fn with_behaviour(mut self, behaviour: MockBehaviour) -> Self {
        self.behaviour = behaviour;
        self
    }

    pub fn info_mut(&mut self) -> &mut DeviceInfo {
        &mut self.info
    }

    pub fn sessions_opened(&self) -> usize {
        self.counters.sessions_opened.get()
    }

    pub fn finish_calls(&self) -> usize {
        self.counters.finish_calls.get()
    }

    /// Queue properties passed to the most recent `open_session`.
    pub fn last_queue_properties(&self) -> Option<QueueProperties> {
        self.counters.last_properties.get()
    }
}

impl ComputeDevice for MockDevice {
    type Session = MockSession;

    fn info(&self) -> &DeviceInfo {
        &self.info
    }

    fn open_session(&self, properties: QueueProperties) -> Result<MockSession, DeviceError> {
        self.counters.last_properties.set(Some(properties));
        if self.behaviour.fail_open_session {
            return Err(DeviceError::Api { call: "clCreateContext", code: -6 });
        }
        self.counters.sessions_opened.set(self.counters.sessions_opened.get() + 1);
        Ok(MockSession {
            latest_cl_c: max_opencl_c_for_devices([&self.info]),
            behaviour: self.behaviour.clone(),
            counters: Rc::clone(&self.counters),
        })
    }
}

#[derive(Debug)]
pub struct MockSession {
    latest_cl_c: Version,
    behaviour: MockBehaviour,
    counters: Rc<Counters>,
}

/// What a [`MockSession`] "compiled".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockKernel {
    pub name: String,
    pub options: String,
}

impl DeviceSession for MockSession {
    type Kernel = MockKernel;

    fn build_kernel(&self, request: &KernelRequest<'_>) -> Result<MockKernel, BuildFailure> {
        if let Some(failure) = &self.behaviour.build_failure {
            return Err(failure.clone());
        }
        Ok(MockKernel {
            name: request.kernel_name.to_string(),
            options: request.effective_build_options(self.latest_cl_c),
        })
    }

    fn finish(&self) -> Result<(), DeviceError> {
        self.counters.finish_calls.set(self.counters.finish_calls.get() + 1);
        if self.behaviour.fail_finish {
            return Err(DeviceError::Api { call: "clFinish", code: -36 });
        }
        Ok(())
    }
}

/// Hands out clones of one [`MockDevice`] and remembers what was asked for.
#[derive(Debug, Default)]
pub struct MockProvider {
    device: Option<MockDevice>,
    requests: RefCell<Vec<DeviceRequest>>,
}

impl MockProvider {
    pub fn new(device: MockDevice) -> Self {
        Self { device: Some(device), requests: RefCell::default() }
    }

    /// A provider that behaves like a machine with no OpenCL platforms.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn requests(&self) -> Vec<DeviceRequest> {
        self.requests.borrow().clone()
    }
}

impl DeviceProvider for MockProvider {
    type Device = MockDevice;

    fn acquire(&self, request: &DeviceRequest) -> Result<MockDevice, DeviceError> {
        self.requests.borrow_mut().push(*request);
        self.device.clone().ok_or(DeviceError::NoPlatforms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernel::create_single_kernel;

    #[test]
    fn sessions_share_counters_with_their_device() {
        let device = MockDevice::new(Version::V2_0);
        let session = device.open_session(QueueProperties::default()).unwrap();
        session.finish().unwrap();
        session.finish().unwrap();
        assert_eq!(device.sessions_opened(), 1);
        assert_eq!(device.finish_calls(), 2);
        assert_eq!(device.last_queue_properties(), Some(QueueProperties::default()));
    }

    #[test]
    fn builds_pick_up_the_device_dialect() {
        let device = MockDevice::new(Version::V3_0);
        let session = device.open_session(QueueProperties::default()).unwrap();
        let sources = ["kernel void k(global int *out) { out[0] = 1; }"];
        let kernel = create_single_kernel(&session, &KernelRequest::new(&sources, "k")).unwrap();
        assert_eq!(kernel, MockKernel { name: "k".into(), options: "-cl-std=CL3.0".into() });
    }

    #[test]
    fn opencl_3_devices_without_a_version_list_build_as_cl3() {
        let mut device = MockDevice::new(Version::V3_0);
        device.info_mut().opencl_c_version = Version::V3_0;
        device.info_mut().opencl_c_all_versions.clear();
        let session = device.open_session(QueueProperties::default()).unwrap();
        let sources = ["kernel void k(global int *out) { out[0] = 1; }"];
        let kernel = create_single_kernel(&session, &KernelRequest::new(&sources, "k")).unwrap();
        assert_eq!(kernel.options, "-cl-std=CL3.0");
    }

    #[test]
    fn configured_build_failures_surface() {
        let device = MockDevice::new(Version::V1_2).with_behaviour(MockBehaviour {
            build_failure: Some(BuildFailure::Kernel { kernel_name: "k".into(), code: -46 }),
            ..MockBehaviour::default()
        });
        let session = device.open_session(QueueProperties::default()).unwrap();
        let sources = ["kernel void j() {}"];
        let err = create_single_kernel(&session, &KernelRequest::new(&sources, "k")).unwrap_err();
        assert!(matches!(err, BuildFailure::Kernel { .. }));
    }

    #[test]
    fn empty_provider_reports_no_platforms() {
        let provider = MockProvider::empty();
        assert!(matches!(provider.acquire(&DeviceRequest::default()), Err(DeviceError::NoPlatforms)));
        assert_eq!(provider.requests().len(), 1);
    }
}
