//! The device protocol engine
//!
//! [`Device`] ties the three state sections, the application callback table
//! and the driver together. It owns the request dispatcher
//! ([`Device::handle_frame`]), the attribute engine, and the cooperative
//! [`Device::process`] step that polls the driver, serves requests and
//! drives periodic telemetry.

use bytemuck::{bytes_of, bytes_of_mut};
use defmt_or_log::{debug, warn};

use caniot_common::datatype::{BlcSysCmd, BlcSysCommand, OneStateCmd, TspCmd, TwoStateCmd};
use caniot_common::frame::MAX_PAYLOAD;
use caniot_common::id::STD_ID_MASK;
use caniot_common::{AttrKey, Did, Direction, Endpoint, Error, Frame, FrameId, FrameType};

use crate::api::Api;
use crate::attrs::resolve::{resolve, AttrRef};
use crate::attrs::{keys, Section};
use crate::driver::Driver;
use crate::state::{
    Config, Identification, SystemState, TELEMETRY_DELAY_MAX_DEFAULT_MS,
    TELEMETRY_DELAY_MIN_DEFAULT_MS,
};

/// Acceptance mask matching the direction, class and sub-id fields of an
/// identifier
pub fn mask() -> u16 {
    FrameId {
        frame_type: FrameType::Command,
        direction: Direction::Query,
        class: 7,
        sub_id: 7,
        endpoint: Endpoint::App,
    }
    .to_can()
}

/// Acceptance filter matching queries addressed to one device
pub fn filter_for(did: Did) -> u16 {
    FrameId {
        frame_type: FrameType::Command,
        direction: Direction::Query,
        class: did.class(),
        sub_id: did.sub_id(),
        endpoint: Endpoint::App,
    }
    .to_can()
}

/// Acceptance filter matching broadcast queries
pub fn broadcast_filter() -> u16 {
    filter_for(Did::BROADCAST)
}

/// Acceptance filter matching queries addressed to any device of one class
pub fn filter_for_class(class: u8) -> u16 {
    filter_for(Did::from_parts(class, 0))
}

fn matches_filter_or_broadcast(raw_id: u32, filter: u16) -> bool {
    let std_id = (raw_id as u16) & STD_ID_MASK;
    (std_id & mask()) == filter || (std_id & mask()) == broadcast_filter()
}

/// Decide whether a received CAN identifier targets a device
///
/// Extended-ID and RTR frames never target a CANIOT device; a standard ID
/// targets the device when its direction, class and sub-id match the
/// device's filter or the broadcast filter.
pub fn is_targeted(did: Did, ext: bool, rtr: bool, raw_id: u32) -> bool {
    if ext || rtr {
        return false;
    }
    matches_filter_or_broadcast(raw_id, filter_for(did))
}

/// Decide whether a received CAN identifier targets a device class
pub fn is_class_targeted(class: u8, ext: bool, rtr: bool, raw_id: u32) -> bool {
    if ext || rtr {
        return false;
    }
    matches_filter_or_broadcast(raw_id, filter_for_class(class))
}

/// Attribute-layer failures that do not abort startup publication
fn is_attribute_error(error: Error) -> bool {
    matches!(
        error,
        Error::NoSuchSection
            | Error::NoSuchAttribute
            | Error::NoSuchPart
            | Error::ClassMismatch
            | Error::AttributeNotAvailable
            | Error::ReadFailed
            | Error::WriteFailed
            | Error::ReadOnly
    )
}

#[derive(Debug, Default, Clone, Copy)]
struct DeviceFlags {
    /// Endpoints with a pending telemetry request, one bit per endpoint
    request_telemetry_ep: u8,
    config_dirty: bool,
    startup_attrs_sent: bool,
}

/// A failure of the attribute path, remembering the offending key when it
/// is known so it can be embedded in the error frame
type AttrFailure = (Error, Option<AttrKey>);

/// The target of an attribute operation: a schema-resolved window, or the
/// application's custom hooks when resolution failed and both hooks exist
enum AttrTarget<D> {
    Schema(AttrRef),
    Custom(
        crate::api::CustomAttrReadHandler<D>,
        crate::api::CustomAttrWriteHandler<D>,
    ),
}

/// A CANIOT device
///
/// Holds the only mutable state of the protocol core; a process can host
/// several devices side by side, each with its own driver and callbacks.
pub struct Device<'a, D> {
    identification: &'a Identification,
    system: SystemState,
    config: &'a mut Config,
    api: Api<D>,
    driver: D,
    flags: DeviceFlags,
    startup_attrs: &'a [AttrKey],
    startup_cursor: usize,
}

impl<'a, D: Driver> Device<'a, D> {
    /// Create a device
    ///
    /// Samples the driver clock for the start time and marks the
    /// configuration dirty so the first access goes through
    /// `config.on_read`. Fails when the identification carries a device
    /// identifier with a broadcast class or sub-id field.
    pub fn new(
        identification: &'a Identification,
        config: &'a mut Config,
        api: Api<D>,
        mut driver: D,
    ) -> Result<Self, Error> {
        let did = identification.did();
        if did.class() == Did::BROADCAST.class() || did.sub_id() == Did::BROADCAST.sub_id() {
            return Err(Error::InvalidArgument);
        }

        let (start_time, _) = driver.get_time();
        let mut system = SystemState::default();
        system.start_time = start_time;

        Ok(Device {
            identification,
            system,
            config,
            api,
            driver,
            flags: DeviceFlags {
                request_telemetry_ep: 0,
                config_dirty: true,
                startup_attrs_sent: true,
            },
            startup_attrs: &[],
            startup_cursor: 0,
        })
    }

    /// Publish the given attribute keys once at startup
    ///
    /// Each key is answered as an ordinary attribute read response during
    /// the first [`process`](Self::process) calls with no pending frame.
    pub fn with_startup_attributes(mut self, attrs: &'a [AttrKey]) -> Self {
        self.startup_attrs = attrs;
        self.startup_cursor = 0;
        self.flags.startup_attrs_sent = attrs.is_empty();
        self
    }

    /// The device identifier, read from identification memory
    pub fn did(&self) -> Did {
        self.identification.did()
    }

    /// The identification section
    pub fn identification(&self) -> &Identification {
        self.identification
    }

    /// The system section
    pub fn system(&self) -> &SystemState {
        &self.system
    }

    /// The configuration section
    pub fn config(&self) -> &Config {
        self.config
    }

    /// Mutable access to the configuration section, for use from the
    /// `config.on_read` hook
    pub fn config_mut(&mut self) -> &mut Config {
        self.config
    }

    /// The driver
    pub fn driver_mut(&mut self) -> &mut D {
        &mut self.driver
    }

    /// Report the battery level in the system section
    pub fn set_battery(&mut self, level: u8) {
        self.system.battery = level;
    }

    /// Zero the system section
    pub fn system_reset(&mut self) {
        self.system = SystemState::default();
    }

    /// Mark the in-RAM configuration stale; the next access will go through
    /// `config.on_read`
    pub fn mark_config_dirty(&mut self) {
        self.flags.config_dirty = true;
    }

    /// Whether the wall clock has been synchronised since startup
    pub fn time_synced(&self) -> bool {
        self.system.uptime_synced != 0
    }

    /// Request a telemetry emission on one endpoint
    pub fn trigger_telemetry(&mut self, endpoint: Endpoint) {
        self.flags.request_telemetry_ep |= endpoint.bit();
    }

    /// Whether a telemetry emission is pending on one endpoint
    pub fn telemetry_requested(&self, endpoint: Endpoint) -> bool {
        self.flags.request_telemetry_ep & endpoint.bit() != 0
    }

    /// Whether any telemetry emission is pending
    pub fn telemetry_requested_any(&self) -> bool {
        self.flags.request_telemetry_ep != 0
    }

    fn clear_telemetry_request(&mut self, endpoint: Endpoint) {
        self.flags.request_telemetry_ep &= !endpoint.bit();
    }

    /// Refresh the in-RAM configuration through `config.on_read` when it is
    /// marked dirty
    fn refresh_config(&mut self) -> Result<(), Error> {
        if !self.flags.config_dirty {
            return Ok(());
        }
        let Some(on_read) = self.api.config.on_read else {
            return Ok(());
        };
        debug!("config read");
        on_read(self)?;
        self.flags.config_dirty = false;
        Ok(())
    }

    /// Notify the application after a configuration write and re-base the
    /// telemetry deadlines by the clock shift the callback may have caused
    fn config_written(&mut self) -> Result<(), Error> {
        let Some(on_write) = self.api.config.on_write else {
            return Ok(());
        };

        let (prev_sec, prev_msec) = self.driver.get_time();
        debug!("config write");
        let result = on_write(self);
        let (new_sec, new_msec) = self.driver.get_time();

        let diff_sec = new_sec.wrapping_sub(prev_sec);
        let diff_msec = diff_sec
            .wrapping_mul(1000)
            .wrapping_add(new_msec as u32)
            .wrapping_sub(prev_msec as u32);
        self.system.start_time = self.system.start_time.wrapping_add(diff_sec);
        self.system.last_telemetry = self.system.last_telemetry.wrapping_add(diff_sec);
        self.system.last_telemetry_ms = self.system.last_telemetry_ms.wrapping_add(diff_msec);

        result
    }

    /// Whether an attribute exists for the device's class
    fn class_attr_exists(&self, r: &AttrRef) -> bool {
        match r.flags.class_restriction() {
            None => true,
            Some(class) => class == self.did().class(),
        }
    }

    /// Read the addressed window as a zero-extended 32-bit value
    fn attribute_read(&mut self, r: &AttrRef) -> Result<u32, Error> {
        if !self.class_attr_exists(r) {
            return Err(Error::ClassMismatch);
        }
        if !r.flags.readable() {
            return Err(Error::AttributeNotAvailable);
        }

        let mut value = [0u8; 4];
        let window = r.offset as usize..r.offset as usize + r.size as usize;
        match r.section {
            Section::Identification => {
                value[..r.size as usize].copy_from_slice(&bytes_of(self.identification)[window]);
            }
            Section::System => {
                value[..r.size as usize].copy_from_slice(&bytes_of(&self.system)[window]);
            }
            Section::Configuration => {
                self.refresh_config()?;
                value[..r.size as usize].copy_from_slice(&bytes_of(&*self.config)[window]);
            }
        }
        Ok(u32::from_le_bytes(value))
    }

    /// Write a 32-bit value into the addressed window
    fn attribute_write(&mut self, r: &AttrRef, key: AttrKey, value: u32) -> Result<(), Error> {
        if !self.class_attr_exists(r) {
            return Err(Error::ClassMismatch);
        }
        if !r.flags.writable() {
            return Err(Error::ReadOnly);
        }

        let window = r.offset as usize..r.offset as usize + r.size as usize;
        match r.section {
            Section::System => {
                if key == keys::TIME {
                    self.set_system_time(value);
                } else {
                    bytes_of_mut(&mut self.system)[window]
                        .copy_from_slice(&value.to_le_bytes()[..r.size as usize]);
                }
                Ok(())
            }
            Section::Configuration => {
                bytes_of_mut(self.config)[window]
                    .copy_from_slice(&value.to_le_bytes()[..r.size as usize]);
                self.config_written()
            }
            // unreachable through resolution: the section role strips the
            // writable flag
            Section::Identification => Err(Error::WriteFailed),
        }
    }

    /// Reset the wall clock and shift every stored deadline so that the
    /// jump does not trigger or starve periodic telemetry
    fn set_system_time(&mut self, epoch_sec: u32) {
        let (prev_sec, prev_msec) = self.driver.get_time();
        self.driver.set_time(epoch_sec);

        let diff_sec = epoch_sec.wrapping_sub(prev_sec);
        self.system.last_telemetry_ms = self
            .system
            .last_telemetry_ms
            .wrapping_add(diff_sec.wrapping_mul(1000))
            .wrapping_sub(prev_msec as u32);
        self.system.last_telemetry = self.system.last_telemetry.wrapping_add(diff_sec);
        self.system.start_time = self.system.start_time.wrapping_add(diff_sec);

        // the value acknowledgement read must already observe the new time
        self.system.time = epoch_sec;
        self.system.uptime_synced = epoch_sec.wrapping_sub(self.system.start_time);
    }

    /// Serve an attribute read or write request and fill the response
    fn handle_attribute_request(
        &mut self,
        req: &Frame,
        resp: &mut Frame,
        write: bool,
    ) -> Result<(), AttrFailure> {
        let key = req.attr_key().map_err(|e| (e, None))?;

        let target = match resolve(key) {
            Ok(r) => AttrTarget::Schema(r),
            Err(e) => match (self.api.custom_attr.read, self.api.custom_attr.write) {
                (Some(read_hook), Some(write_hook)) => AttrTarget::Custom(read_hook, write_hook),
                _ => return Err((e, Some(key))),
            },
        };

        if write {
            let value = req.attr_value().map_err(|e| (e, None))?;
            match &target {
                AttrTarget::Schema(r) => self.attribute_write(r, key, value),
                AttrTarget::Custom(_, write_hook) => write_hook(self, key, value),
            }
            .map_err(|e| (e, Some(key)))?;
        }

        // read back, so a write response acknowledges the stored value
        let value = match &target {
            AttrTarget::Schema(r) => self.attribute_read(r),
            AttrTarget::Custom(read_hook, _) => read_hook(self, key),
        }
        .map_err(|e| (e, Some(key)))?;

        self.prepare_response(resp, FrameType::ReadAttribute, req.id.endpoint);
        resp.set_attr_response(key, value);
        Ok(())
    }

    /// Dispatch one decoded board-control system sub-command
    fn call_blc_sys_cmd(&mut self, cmd: BlcSysCmd) -> Result<(), Error> {
        match self.api.blc_sys_cmd_handler {
            Some(handler) => handler(self, cmd),
            None => Ok(()),
        }
    }

    /// Dispatch the sub-commands of a board-control system command byte,
    /// inhibit first
    fn handle_blc_sys_command(&mut self, sys: &BlcSysCommand) -> Result<(), Error> {
        match sys.inhibit {
            TspCmd::On => self.call_blc_sys_cmd(BlcSysCmd::InhibitOn)?,
            TspCmd::Off => self.call_blc_sys_cmd(BlcSysCmd::InhibitOff)?,
            TspCmd::Pulse => self.call_blc_sys_cmd(BlcSysCmd::InhibitPulse)?,
            TspCmd::None => {}
        }

        if sys.config_reset == OneStateCmd::Set {
            self.call_blc_sys_cmd(BlcSysCmd::ConfigReset)?;
        }

        match sys.watchdog {
            TwoStateCmd::On => self.call_blc_sys_cmd(BlcSysCmd::WatchdogEnable)?,
            TwoStateCmd::Off => self.call_blc_sys_cmd(BlcSysCmd::WatchdogDisable)?,
            TwoStateCmd::Toggle => self.call_blc_sys_cmd(BlcSysCmd::WatchdogToggle)?,
            TwoStateCmd::None => {}
        }

        if sys.reset == OneStateCmd::Set {
            self.call_blc_sys_cmd(BlcSysCmd::Reset)?;
        }
        if sys.watchdog_reset == OneStateCmd::Set {
            self.call_blc_sys_cmd(BlcSysCmd::WatchdogReset)?;
        }
        if sys.software_reset == OneStateCmd::Set {
            self.call_blc_sys_cmd(BlcSysCmd::SoftReset)?;
        }
        Ok(())
    }

    /// Execute a command query through the application handler
    fn handle_command(&mut self, req: &Frame) -> Result<(), Error> {
        let endpoint = req.id.endpoint;
        debug!("executing command handler for endpoint {}", endpoint as u8);

        // a full board-control command carries the system command byte last
        if endpoint == Endpoint::BoardControl
            && req.len as usize >= MAX_PAYLOAD
            && self.api.blc_sys_cmd_handler.is_some()
        {
            let sys = BlcSysCommand::from_byte(req.buf[MAX_PAYLOAD - 1]);
            self.handle_blc_sys_command(&sys)?;
        }

        match self.api.command_handler {
            Some(handler) => {
                let result = handler(self, endpoint, req.payload());
                self.system.last_command_error = match result {
                    Ok(()) => 0,
                    Err(e) => e.wire_code() as i16,
                };
                result
            }
            None => Err(Error::NoCommandHandler),
        }
    }

    /// Build a telemetry response for one endpoint through the application
    /// handler
    fn build_telemetry(&mut self, resp: &mut Frame, endpoint: Endpoint) -> Result<(), Error> {
        self.prepare_response(resp, FrameType::Telemetry, endpoint);

        let Some(handler) = self.api.telemetry_handler else {
            return Err(Error::NoTelemetryHandler);
        };
        debug!("executing telemetry handler for endpoint {}", endpoint as u8);

        let result = handler(self, endpoint, &mut resp.buf);
        match result {
            Ok(len) => {
                resp.len = len.min(MAX_PAYLOAD as u8);
                self.system.sent.telemetry = self.system.sent.telemetry.wrapping_add(1);
                self.system.last_telemetry_error = 0;
                Ok(())
            }
            Err(e) => {
                self.system.last_telemetry_error = e.wire_code() as i16;
                Err(e)
            }
        }
    }

    /// Start a response frame, reading the authoritative class/sub-id from
    /// identification memory
    fn prepare_response(&self, resp: &mut Frame, frame_type: FrameType, endpoint: Endpoint) {
        resp.clear();
        resp.id = FrameId {
            frame_type,
            direction: Direction::Response,
            endpoint,
            ..Default::default()
        };
        resp.set_did(self.did());
    }

    /// Build the error frame for a failed request
    ///
    /// The error frame reuses the request endpoint; its type distinguishes
    /// command/telemetry errors from attribute errors. The offending key is
    /// embedded for attribute errors other than frame-shape errors.
    fn wrap_error(&self, resp: &mut Frame, req: &Frame, error: Error, key: Option<AttrKey>) {
        self.prepare_response(resp, req.id.frame_type.error_type(), req.id.endpoint);
        resp.buf[0..4].copy_from_slice(&error.wire_code().to_le_bytes());
        if let Some(key) = key {
            resp.buf[4..8].copy_from_slice(&(key.raw() as u32).to_le_bytes());
            resp.len = 8;
        } else {
            resp.len = 4;
        }
    }

    /// Classify and serve one inbound frame, filling `resp`
    ///
    /// On failure `resp` holds an error frame and the failure code is
    /// returned, except for non-query input which is rejected with
    /// [`Error::InvalidArgument`] and produces no response at all. Whether
    /// an error frame actually gets sent is decided by the caller (see
    /// [`process`](Self::process) and the `error_response` flag).
    pub fn handle_frame(&mut self, req: &Frame, resp: &mut Frame) -> Result<(), Error> {
        if req.id.direction != Direction::Query {
            return Err(Error::InvalidArgument);
        }

        self.system.received.total = self.system.received.total.wrapping_add(1);

        let result: Result<(), AttrFailure> = match req.id.frame_type {
            FrameType::Command => {
                self.system.received.command = self.system.received.command.wrapping_add(1);
                self.handle_command(req)
                    .and_then(|()| self.build_telemetry(resp, req.id.endpoint))
                    .map_err(|e| (e, None))
            }
            FrameType::Telemetry => {
                self.system.received.request_telemetry =
                    self.system.received.request_telemetry.wrapping_add(1);
                self.build_telemetry(resp, req.id.endpoint)
                    .map_err(|e| (e, None))
            }
            FrameType::WriteAttribute => {
                self.system.received.write_attribute =
                    self.system.received.write_attribute.wrapping_add(1);
                self.handle_attribute_request(req, resp, true)
            }
            FrameType::ReadAttribute => {
                self.system.received.read_attribute =
                    self.system.received.read_attribute.wrapping_add(1);
                self.handle_attribute_request(req, resp, false)
            }
        };

        match result {
            Ok(()) => Ok(()),
            Err((error, key)) => {
                self.wrap_error(resp, req, error, key);
                Err(error)
            }
        }
    }

    /// Sample the broadcast response delay
    ///
    /// Uniform in `[delay_min, delay_min + amplitude)` where the amplitude
    /// is `delay_max - delay_min`, or the default amplitude when the
    /// configured bounds are inverted or empty.
    fn response_delay(&mut self, random: bool) -> u32 {
        if !random {
            return 0;
        }

        let mut rdm = [0u8; 2];
        self.driver.entropy(&mut rdm);
        let rdm = u16::from_le_bytes(rdm);

        let mut delay_min = TELEMETRY_DELAY_MIN_DEFAULT_MS;
        let mut delay_max = TELEMETRY_DELAY_MAX_DEFAULT_MS;
        if self.refresh_config().is_ok() {
            delay_min = self.config.telemetry.delay_min;
            delay_max = self.config.telemetry.delay_max;
        }

        let amplitude = if delay_max > delay_min {
            delay_max - delay_min
        } else {
            TELEMETRY_DELAY_MAX_DEFAULT_MS
        };

        delay_min as u32 + (rdm % amplitude) as u32
    }

    /// Synthesise and serve the pending startup-attribute publication
    ///
    /// Returns whether `resp` now holds a response to send; a key failing
    /// at the attribute layer is skipped without a response.
    fn publish_startup_attribute(&mut self, resp: &mut Frame) -> Result<bool, Error> {
        let Some(&key) = self.startup_attrs.get(self.startup_cursor) else {
            self.flags.startup_attrs_sent = true;
            return Ok(false);
        };

        let mut req = Frame::query_read_attribute(key);
        req.set_did(self.did());

        // served below the dispatcher so the synthetic frame does not show
        // up in the reception counters
        let result = self.handle_attribute_request(&req, resp, false);

        match result {
            Ok(()) => {}
            Err((e, _)) if is_attribute_error(e) => {
                warn!("startup attribute {} skipped", key.raw());
            }
            Err((e, _)) => return Err(e),
        }

        self.startup_cursor += 1;
        if self.startup_cursor >= self.startup_attrs.len() {
            self.flags.startup_attrs_sent = true;
        }

        Ok(result.is_ok())
    }

    /// Run one cooperative step of the device loop
    ///
    /// Refreshes the configuration, updates the timebase, triggers periodic
    /// telemetry, serves at most one pending frame (or startup attribute,
    /// or requested telemetry), and sends at most one response. Returns
    /// [`Error::Again`] when there was nothing to do; the failure code of
    /// the dispatched request otherwise.
    pub fn process(&mut self) -> Result<(), Error> {
        let _ = self.refresh_config();

        let (sec, msec) = self.driver.get_time();
        self.system.time = sec;
        self.system.uptime = sec.wrapping_sub(self.system.start_time);
        let now_ms = sec.wrapping_mul(1000).wrapping_add(msec as u32);

        if self.config.flags.periodic_enabled() {
            let elapsed_ms = now_ms.wrapping_sub(self.system.last_telemetry_ms);
            if elapsed_ms >= self.config.telemetry.period {
                debug!("requesting periodic telemetry");
                self.trigger_telemetry(self.config.flags.telemetry_endpoint());
            }
        }

        let mut resp = Frame::default();
        let mut random_delay = false;
        let mut failure = None;

        match self.driver.recv() {
            Ok(req) => {
                if !req.targets(self.did()) {
                    self.system.received.ignored = self.system.received.ignored.wrapping_add(1);
                    warn!("unexpected frame id received: {}", req.id.to_can());
                    return Err(Error::UnexpectedFrame);
                }

                // broadcast requests get a randomly delayed response
                random_delay = req.is_broadcast();

                match self.handle_frame(&req, &mut resp) {
                    Ok(()) => {}
                    Err(Error::InvalidArgument) => return Err(Error::InvalidArgument),
                    Err(e) => failure = Some(e),
                }
            }
            Err(Error::Again) if !self.flags.startup_attrs_sent => {
                if !self.publish_startup_attribute(&mut resp)? {
                    return Ok(());
                }
            }
            Err(Error::Again) if self.telemetry_requested_any() => {
                let mut result = Ok(());
                for endpoint in Endpoint::PRIORITY {
                    if self.telemetry_requested(endpoint) {
                        result = self.build_telemetry(&mut resp, endpoint);
                        if let Err(e) = result {
                            // report the failure as a telemetry error frame
                            self.wrap_error(&mut resp, &Frame::query_telemetry(endpoint), e, None);
                        }
                        break;
                    }
                }
                failure = result.err();
            }
            Err(e) => return Err(e),
        }

        if let Some(error) = failure {
            let _ = self.refresh_config();
            if !self.config.flags.error_response() {
                return Err(error);
            }
        }

        let delay_ms = self.response_delay(random_delay);
        self.driver.send(&resp, delay_ms)?;
        self.system.sent.total = self.system.sent.total.wrapping_add(1);

        if resp.is_telemetry_response() {
            self.clear_telemetry_request(resp.id.endpoint);
            if self.config.flags.periodic_enabled()
                && resp.id.endpoint == self.config.flags.telemetry_endpoint()
            {
                self.system.last_telemetry_ms = now_ms;
                self.system.last_telemetry = self.system.time;
            }
        }

        match failure {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    /// Milliseconds until the next [`process`](Self::process) call is due
    ///
    /// `Some(0)` when work is already pending, `None` when periodic
    /// telemetry is disabled and nothing else is scheduled. After a failed
    /// configuration refresh, retries in one second.
    pub fn time_until_next_process(&mut self) -> Option<u32> {
        if !self.flags.startup_attrs_sent {
            return Some(0);
        }
        if self.refresh_config().is_err() {
            return Some(1000);
        }
        if !self.config.flags.periodic_enabled() {
            return None;
        }

        let (sec, msec) = self.driver.get_time();
        let now_ms = sec.wrapping_mul(1000).wrapping_add(msec as u32);
        let elapsed_ms = now_ms.wrapping_sub(self.system.last_telemetry_ms);
        Some(self.config.telemetry.period.saturating_sub(elapsed_ms))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mask_covers_direction_class_and_subid() {
        assert_eq!(0x1FC, mask());
    }

    #[test]
    fn filters_derive_from_the_id_codec() {
        let did = Did::from_parts(1, 2);
        let expected = FrameId {
            frame_type: FrameType::Command,
            direction: Direction::Query,
            class: 1,
            sub_id: 2,
            endpoint: Endpoint::App,
        };
        assert_eq!(expected.to_can(), filter_for(did));
        assert_eq!(filter_for(Did::BROADCAST), broadcast_filter());
    }

    #[test]
    fn targeting_over_all_identifiers() {
        let did = Did::from_parts(1, 2);
        for raw in 0..=STD_ID_MASK {
            let id = FrameId::from_can(raw);
            let expected = id.direction == Direction::Query
                && ((id.class == 1 && id.sub_id == 2) || (id.class == 7 && id.sub_id == 7));
            assert_eq!(
                expected,
                is_targeted(did, false, false, raw as u32),
                "id {raw:#05x}"
            );
        }
    }

    #[test]
    fn extended_and_rtr_never_target() {
        let did = Did::from_parts(1, 2);
        let raw = filter_for(did) as u32;
        assert!(is_targeted(did, false, false, raw));
        assert!(!is_targeted(did, true, false, raw));
        assert!(!is_targeted(did, false, true, raw));
    }

    #[test]
    fn class_targeting() {
        assert!(is_class_targeted(1, false, false, filter_for_class(1) as u32));
        assert!(!is_class_targeted(1, false, false, filter_for_class(2) as u32));
        assert!(is_class_targeted(1, false, false, broadcast_filter() as u32));
    }
}
