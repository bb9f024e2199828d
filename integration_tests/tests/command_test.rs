//! Command dispatch, telemetry responses and board-control system commands

use caniot_device::common::datatype::BlcSysCmd;
use caniot_device::common::{Did, Endpoint, Error, Frame, FrameType};
use caniot_device::{Api, Config, Device};
use integration_tests::{echo_telemetry, make_device, mock_driver::MockDriver};

fn recording_command(
    dev: &mut Device<'_, &mut MockDriver>,
    _endpoint: Endpoint,
    payload: &[u8],
) -> Result<(), Error> {
    dev.driver_mut().command_payloads.push(payload.to_vec());
    Ok(())
}

fn failing_command(
    _dev: &mut Device<'_, &mut MockDriver>,
    _endpoint: Endpoint,
    _payload: &[u8],
) -> Result<(), Error> {
    Err(Error::NotSupported)
}

fn recording_blc(
    dev: &mut Device<'_, &mut MockDriver>,
    cmd: BlcSysCmd,
) -> Result<(), Error> {
    dev.driver_mut().blc_cmds.push(cmd);
    Ok(())
}

fn command_frame(endpoint: Endpoint, payload: &[u8]) -> Frame {
    let mut frame = Frame::query_command(endpoint, payload);
    frame.set_did(Did::from_parts(1, 2));
    frame
}

#[test]
fn successful_commands_answer_with_telemetry() {
    let mut driver = MockDriver::new();
    driver.push_rx(command_frame(Endpoint::Ep1, &[0xDE, 0xAD]));

    let mut config = Config::default();
    let api = Api {
        command_handler: Some(recording_command),
        telemetry_handler: Some(echo_telemetry),
        ..Api::new()
    };
    let mut dev = make_device(&mut config, api, &mut driver);

    dev.process().unwrap();

    assert_eq!(1, dev.system().received.total);
    assert_eq!(1, dev.system().received.command);
    assert_eq!(0, dev.system().last_command_error);
    assert_eq!(1, dev.system().sent.telemetry);

    let driver = dev.driver_mut();
    assert_eq!(vec![vec![0xDE, 0xAD]], driver.command_payloads);
    let (resp, _) = driver.sent.remove(0);
    assert!(resp.is_telemetry_response());
    assert_eq!(Endpoint::Ep1, resp.id.endpoint);
    assert_eq!(&[Endpoint::Ep1 as u8, 0x42], resp.payload());
}

#[test]
fn command_failures_become_command_error_frames() {
    let mut driver = MockDriver::new();
    driver.push_rx(command_frame(Endpoint::App, &[0x01]));

    let mut config = Config::default();
    let api = Api {
        command_handler: Some(failing_command),
        telemetry_handler: Some(echo_telemetry),
        ..Api::new()
    };
    let mut dev = make_device(&mut config, api, &mut driver);

    assert_eq!(Err(Error::NotSupported), dev.process());
    assert_eq!(
        Error::NotSupported.wire_code() as i16,
        dev.system().last_command_error
    );

    let (resp, _) = dev.driver_mut().sent.remove(0);
    assert!(resp.is_error());
    assert_eq!(FrameType::Command, resp.id.frame_type);
    assert_eq!(Endpoint::App, resp.id.endpoint);
    assert_eq!(
        Error::NotSupported.wire_code().to_le_bytes(),
        resp.payload()[..4]
    );
}

#[test]
fn telemetry_requests_are_answered_on_the_requested_endpoint() {
    let mut driver = MockDriver::new();
    let mut frame = Frame::query_telemetry(Endpoint::Ep2);
    frame.set_did(Did::from_parts(1, 2));
    driver.push_rx(frame);

    let mut config = Config::default();
    let api = Api {
        telemetry_handler: Some(echo_telemetry),
        ..Api::new()
    };
    let mut dev = make_device(&mut config, api, &mut driver);

    dev.process().unwrap();

    assert_eq!(1, dev.system().received.request_telemetry);
    let (resp, _) = dev.driver_mut().sent.remove(0);
    assert!(resp.is_telemetry_response());
    assert_eq!(Endpoint::Ep2, resp.id.endpoint);
}

#[test]
fn missing_telemetry_handler_is_reported() {
    let mut driver = MockDriver::new();
    let mut frame = Frame::query_telemetry(Endpoint::App);
    frame.set_did(Did::from_parts(1, 2));
    driver.push_rx(frame);

    let mut config = Config::default();
    let mut dev = make_device(&mut config, Api::new(), &mut driver);

    assert_eq!(Err(Error::NoTelemetryHandler), dev.process());
    let (resp, _) = dev.driver_mut().sent.remove(0);
    assert!(resp.is_error());
    assert_eq!(
        Some(Error::NoTelemetryHandler.wire_code()),
        resp.error_code()
    );
}

#[test]
fn full_board_control_commands_carry_a_system_command() {
    let mut driver = MockDriver::new();
    // inhibit on, config reset, watchdog on, reset, watchdog reset,
    // software reset, all at once
    let mut payload = [0u8; 8];
    payload[7] = 0x6F;
    driver.push_rx(command_frame(Endpoint::BoardControl, &payload));

    let mut config = Config::default();
    let api = Api {
        command_handler: Some(recording_command),
        telemetry_handler: Some(echo_telemetry),
        blc_sys_cmd_handler: Some(recording_blc),
        ..Api::new()
    };
    let mut dev = make_device(&mut config, api, &mut driver);

    dev.process().unwrap();

    let driver = dev.driver_mut();
    // sub-commands dispatch inhibit first, ordinary resets last
    assert_eq!(
        vec![
            BlcSysCmd::InhibitOn,
            BlcSysCmd::ConfigReset,
            BlcSysCmd::WatchdogEnable,
            BlcSysCmd::Reset,
            BlcSysCmd::WatchdogReset,
            BlcSysCmd::SoftReset,
        ],
        driver.blc_cmds
    );
    // the ordinary command handler still runs afterwards
    assert_eq!(1, driver.command_payloads.len());
}

#[test]
fn short_board_control_commands_skip_the_system_command() {
    let mut driver = MockDriver::new();
    driver.push_rx(command_frame(Endpoint::BoardControl, &[0x6F; 7]));

    let mut config = Config::default();
    let api = Api {
        command_handler: Some(recording_command),
        telemetry_handler: Some(echo_telemetry),
        blc_sys_cmd_handler: Some(recording_blc),
        ..Api::new()
    };
    let mut dev = make_device(&mut config, api, &mut driver);

    dev.process().unwrap();

    let driver = dev.driver_mut();
    assert!(driver.blc_cmds.is_empty());
    assert_eq!(1, driver.command_payloads.len());
}

#[test]
fn reception_counters_classify_requests() {
    let mut driver = MockDriver::new();
    driver.push_rx(command_frame(Endpoint::App, &[0]));
    let mut frame = Frame::query_telemetry(Endpoint::App);
    frame.set_did(Did::from_parts(1, 2));
    driver.push_rx(frame);
    let mut frame = Frame::query_read_attribute(caniot_device::attrs::keys::VERSION);
    frame.set_did(Did::from_parts(1, 2));
    driver.push_rx(frame);
    let mut frame =
        Frame::query_write_attribute(caniot_device::attrs::keys::TELEMETRY_PERIOD, 30_000);
    frame.set_did(Did::from_parts(1, 2));
    driver.push_rx(frame);

    let mut config = Config::default();
    let api = Api {
        command_handler: Some(recording_command),
        telemetry_handler: Some(echo_telemetry),
        ..Api::new()
    };
    let mut dev = make_device(&mut config, api, &mut driver);

    for _ in 0..4 {
        dev.process().unwrap();
    }

    let system = dev.system();
    assert_eq!(4, system.received.total);
    assert_eq!(1, system.received.command);
    assert_eq!(1, system.received.request_telemetry);
    assert_eq!(1, system.received.read_attribute);
    assert_eq!(1, system.received.write_attribute);
    assert_eq!(4, system.sent.total);
}
