//! Attribute read/write requests over the bus

use caniot_device::common::{AttrKey, Did, Error, Frame, FrameType};
use caniot_device::{attrs, Api, Config, Device};
use integration_tests::{make_device, mock_driver::MockDriver, IDENTIFICATION_CLS0};

fn read_request(key: u16) -> Frame {
    let mut frame = Frame::query_read_attribute(AttrKey::from(key));
    frame.set_did(Did::from_parts(1, 2));
    frame
}

fn write_request(key: u16, value: u32) -> Frame {
    let mut frame = Frame::query_write_attribute(AttrKey::from(key), value);
    frame.set_did(Did::from_parts(1, 2));
    frame
}

#[test]
fn read_version() {
    let mut driver = MockDriver::new();
    driver.push_rx(read_request(0x0010));
    let mut config = Config::default();
    let mut dev = make_device(&mut config, Api::new(), &mut driver);

    dev.process().unwrap();

    let (resp, delay) = dev.driver_mut().sent.remove(0);
    assert_eq!(0, delay);
    assert_eq!(FrameType::ReadAttribute, resp.id.frame_type);
    assert!(!resp.is_error());
    assert_eq!(Did::from_parts(1, 2), resp.did());
    assert_eq!(&[0x10, 0x00, 0x02, 0x01, 0x00, 0x00], resp.payload());
}

#[test]
fn write_telemetry_period() {
    fn on_write(dev: &mut Device<'_, &mut MockDriver>) -> Result<(), Error> {
        // marker observed by the test
        dev.config_mut().timezone = 42;
        Ok(())
    }

    let mut driver = MockDriver::new();
    driver.push_rx(write_request(0x2000, 60));
    let mut config = Config::default();
    let api = Api {
        config: caniot_device::api::ConfigHooks {
            on_read: None,
            on_write: Some(on_write),
        },
        ..Api::new()
    };
    let mut dev = make_device(&mut config, api, &mut driver);

    dev.process().unwrap();

    assert_eq!(60, dev.config().telemetry.period);
    assert_eq!(42, dev.config().timezone);

    let (resp, _) = dev.driver_mut().sent.remove(0);
    assert_eq!(FrameType::ReadAttribute, resp.id.frame_type);
    assert_eq!(&[0x00, 0x20, 60, 0x00, 0x00, 0x00], resp.payload());
}

#[test]
fn read_invalid_part_reports_the_key() {
    let mut driver = MockDriver::new();
    // identification.version is 2 bytes; part 1 is out of range
    driver.push_rx(read_request(0x0011));
    let mut config = Config::default();
    let mut dev = make_device(&mut config, Api::new(), &mut driver);

    assert_eq!(Err(Error::NoSuchPart), dev.process());

    let (resp, _) = dev.driver_mut().sent.remove(0);
    assert!(resp.is_error());
    assert_eq!(FrameType::WriteAttribute, resp.id.frame_type);
    assert_eq!(8, resp.len);
    assert_eq!(Some(Error::NoSuchPart.wire_code()), resp.error_code());
    assert_eq!(Some(AttrKey::from(0x0011)), resp.error_key());
}

#[test]
fn identification_rejects_writes() {
    let mut driver = MockDriver::new();
    driver.push_rx(write_request(0x0000, 0x3F));
    let mut config = Config::default();
    let mut dev = make_device(&mut config, Api::new(), &mut driver);

    assert_eq!(Err(Error::ReadOnly), dev.process());

    let (resp, _) = dev.driver_mut().sent.remove(0);
    assert_eq!(Some(Error::ReadOnly.wire_code()), resp.error_code());
    assert_eq!(Some(AttrKey::from(0x0000)), resp.error_key());
    // the identification memory is untouched
    assert_eq!(Did::from_parts(1, 2), dev.did());
}

#[test]
fn hidden_attribute_is_not_readable() {
    let mut driver = MockDriver::new();
    // system.received.ignored is declared hidden
    driver.push_rx(read_request(0x10A0));
    let mut config = Config::default();
    let mut dev = make_device(&mut config, Api::new(), &mut driver);

    assert_eq!(Err(Error::AttributeNotAvailable), dev.process());

    // schema iteration still visits it
    assert!(attrs::attributes().any(|info| info.name == "received.ignored"));
}

#[test]
fn class_restricted_attributes() {
    // the class-1 device can access cls1 rows but not cls0 rows
    let mut driver = MockDriver::new();
    driver.push_rx(read_request(0x2070)); // cls0_gpio.pulse_duration.oc1
    driver.push_rx(read_request(0x20D0)); // cls1_gpio.pulse_duration.pc0
    let mut config = Config::default();
    let mut dev = make_device(&mut config, Api::new(), &mut driver);

    assert_eq!(Err(Error::ClassMismatch), dev.process());
    dev.process().unwrap();

    let sent = dev.driver_mut().take_sent();
    assert_eq!(Some(Error::ClassMismatch.wire_code()), sent[0].0.error_code());
    assert!(!sent[1].0.is_error());

    // write side is gated the same way
    dev.driver_mut().push_rx(write_request(0x2070, 10));
    assert_eq!(Err(Error::ClassMismatch), dev.process());
}

#[test]
fn class0_device_accesses_cls0_rows() {
    let mut driver = MockDriver::new();
    let mut frame = Frame::query_write_attribute(AttrKey::from(0x2070), 1500);
    frame.set_did(Did::from_parts(0, 4));
    driver.push_rx(frame);
    let mut config = Config::default();
    let mut dev = Device::new(&IDENTIFICATION_CLS0, &mut config, Api::new(), &mut driver).unwrap();

    dev.process().unwrap();

    assert_eq!(1500, dev.config().cls0_gpio.pulse_durations[0]);
    let (resp, _) = dev.driver_mut().sent.remove(0);
    assert_eq!(&[0x70, 0x20, 0xDC, 0x05, 0x00, 0x00], resp.payload());
}

#[test]
fn custom_attributes_handle_unresolved_keys() {
    fn custom_read(
        _dev: &mut Device<'_, &mut MockDriver>,
        key: AttrKey,
    ) -> Result<u32, Error> {
        Ok(key.raw() as u32 + 1)
    }
    fn custom_write(
        _dev: &mut Device<'_, &mut MockDriver>,
        _key: AttrKey,
        _value: u32,
    ) -> Result<(), Error> {
        Ok(())
    }

    let mut driver = MockDriver::new();
    driver.push_rx(read_request(0x5000));
    let mut config = Config::default();
    let api = Api {
        custom_attr: caniot_device::api::CustomAttrHooks {
            read: Some(custom_read),
            write: Some(custom_write),
        },
        ..Api::new()
    };
    let mut dev = make_device(&mut config, api, &mut driver);

    dev.process().unwrap();

    let (resp, _) = dev.driver_mut().sent.remove(0);
    assert_eq!(AttrKey::from(0x5000), resp.attr_key().unwrap());
    assert_eq!(0x5001, resp.attr_value().unwrap());
}

#[test]
fn unresolved_key_without_custom_hooks_fails() {
    let mut driver = MockDriver::new();
    driver.push_rx(read_request(0x5000));
    let mut config = Config::default();
    let mut dev = make_device(&mut config, Api::new(), &mut driver);

    assert_eq!(Err(Error::NoSuchSection), dev.process());
}

#[test]
fn writing_system_time_rebases_the_deadlines() {
    let mut driver = MockDriver::new();
    driver.now_sec = 1000;
    let mut config = Config::default();
    let mut dev = make_device(&mut config, Api::new(), &mut driver);
    assert!(!dev.time_synced());

    // 100 seconds of uptime before the clock is synchronised
    dev.driver_mut().advance_ms(100_000);
    dev.driver_mut().push_rx(write_request(0x1010, 5000));
    dev.process().unwrap();

    assert_eq!(vec![5000], dev.driver_mut().set_time_calls);
    assert_eq!(5000, dev.system().time);
    assert_eq!(4900, dev.system().start_time);
    assert_eq!(100, dev.system().uptime_synced);
    assert!(dev.time_synced());

    // the response acknowledges the new value
    let (resp, _) = dev.driver_mut().sent.remove(0);
    assert_eq!(5000, resp.attr_value().unwrap());
}

#[test]
fn config_reads_preflight_through_on_read() {
    fn on_read(dev: &mut Device<'_, &mut MockDriver>) -> Result<(), Error> {
        dev.config_mut().telemetry.period = 12_345;
        Ok(())
    }

    let mut driver = MockDriver::new();
    driver.push_rx(read_request(0x2000));
    let mut config = Config::default();
    let api = Api {
        config: caniot_device::api::ConfigHooks {
            on_read: Some(on_read),
            on_write: None,
        },
        ..Api::new()
    };
    let mut dev = make_device(&mut config, api, &mut driver);

    dev.process().unwrap();

    // the stored configuration was loaded before the read was served
    let (resp, _) = dev.driver_mut().sent.remove(0);
    assert_eq!(12_345, resp.attr_value().unwrap());
}
