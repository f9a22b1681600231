//! Acquisition through `ClProvider`, with or without a driver present.

use clcts_harness::{DeviceError, DeviceProvider, DeviceRequest};
use clcts_opencl::ClProvider;

#[test]
#[cfg(not(feature = "runtime"))]
fn without_runtime_acquisition_reports_missing_backend() {
    assert!(!clcts_opencl::runtime_available());
    let err = ClProvider::new().acquire(&DeviceRequest::default()).unwrap_err();
    assert!(matches!(err, DeviceError::BackendUnavailable));
    assert!(err.to_string().contains("`runtime` feature"));
}

#[test]
#[cfg(feature = "runtime")]
fn acquisition_succeeds_or_fails_with_a_harness_error() {
    use clcts_harness::ComputeDevice;

    match ClProvider::new().acquire(&DeviceRequest::default()) {
        Ok(device) => {
            assert!(!device.info().name.is_empty());
            assert!(device.info().address_bits > 0);
        }
        Err(err) => assert!(
            matches!(
                err,
                DeviceError::NoPlatforms
                    | DeviceError::NoMatchingDevice { .. }
                    | DeviceError::Api { .. }
                    | DeviceError::UnknownVersion(_)
            ),
            "unexpected error: {err}"
        ),
    }
}

#[test]
#[cfg(feature = "runtime")]
fn absurd_platform_index_is_rejected() {
    let request = DeviceRequest { platform_index: 4096, ..DeviceRequest::default() };
    let err = ClProvider::new().acquire(&request).unwrap_err();
    assert!(
        matches!(err, DeviceError::NoPlatforms | DeviceError::PlatformIndexOutOfRange { .. }),
        "unexpected error: {err}"
    );
}
