//! Shared fixtures for the caniot end-to-end tests

pub mod mock_driver;

use caniot_device::common::{Did, Endpoint, Error};
use caniot_device::{Api, Config, Device, Identification};

use mock_driver::MockDriver;

/// The device under test: class 1, sub-id 2
pub static IDENTIFICATION: Identification =
    Identification::new(Did::from_parts(1, 2), 0x0102, "caniot-test", 0x1234_5678);

/// A class-0 variant of the device under test
pub static IDENTIFICATION_CLS0: Identification =
    Identification::new(Did::from_parts(0, 4), 0x0001, "caniot-cls0", 0x1234_5678);

/// A telemetry handler echoing the endpoint number
pub fn echo_telemetry(
    _dev: &mut Device<'_, &mut MockDriver>,
    endpoint: Endpoint,
    buf: &mut [u8; 8],
) -> Result<u8, Error> {
    buf[0] = endpoint as u8;
    buf[1] = 0x42;
    Ok(2)
}

/// An API table with only the telemetry handler plugged in
pub fn telemetry_only_api<'a>() -> Api<&'a mut MockDriver> {
    Api {
        telemetry_handler: Some(echo_telemetry),
        ..Api::new()
    }
}

/// Build a device around the standard identification and the given pieces
pub fn make_device<'a>(
    config: &'a mut Config,
    api: Api<&'a mut MockDriver>,
    driver: &'a mut MockDriver,
) -> Device<'a, &'a mut MockDriver> {
    Device::new(&IDENTIFICATION, config, api, driver).expect("device construction failed")
}
