//! A scripted driver for exercising the device loop without a CAN bus

use std::collections::VecDeque;

use caniot_device::common::datatype::BlcSysCmd;
use caniot_device::common::{Error, Frame};
use caniot_device::Driver;

/// A driver backed by in-memory queues and a manually advanced clock
///
/// It doubles as the scratch pad of the test handlers: they record what
/// they were invoked with here, since they are plain function pointers.
#[derive(Debug, Default)]
pub struct MockDriver {
    /// Frames waiting to be received by the device
    pub rx: VecDeque<Frame>,
    /// Frames the device sent, with the delay it requested
    pub sent: Vec<(Frame, u32)>,
    /// Current clock, whole seconds
    pub now_sec: u32,
    /// Current clock, millisecond remainder
    pub now_msec: u16,
    /// Scripted entropy bytes; zero once exhausted
    pub entropy: VecDeque<u8>,
    /// Arguments of every set_time call
    pub set_time_calls: Vec<u32>,
    /// When set, the next send fails with this error
    pub send_error: Option<Error>,
    /// Board-control system sub-commands seen by the test handler
    pub blc_cmds: Vec<BlcSysCmd>,
    /// Payloads seen by the test command handler
    pub command_payloads: Vec<Vec<u8>>,
}

impl MockDriver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a frame for reception
    pub fn push_rx(&mut self, frame: Frame) {
        self.rx.push_back(frame);
    }

    /// Advance the clock by a number of milliseconds
    pub fn advance_ms(&mut self, ms: u32) {
        let total = self.now_msec as u32 + ms;
        self.now_sec = self.now_sec.wrapping_add(total / 1000);
        self.now_msec = (total % 1000) as u16;
    }

    /// Take the frames sent so far
    pub fn take_sent(&mut self) -> Vec<(Frame, u32)> {
        std::mem::take(&mut self.sent)
    }
}

impl Driver for MockDriver {
    fn recv(&mut self) -> Result<Frame, Error> {
        self.rx.pop_front().ok_or(Error::Again)
    }

    fn send(&mut self, frame: &Frame, delay_ms: u32) -> Result<(), Error> {
        if let Some(error) = self.send_error.take() {
            return Err(error);
        }
        self.sent.push((*frame, delay_ms));
        Ok(())
    }

    fn get_time(&mut self) -> (u32, u16) {
        (self.now_sec, self.now_msec)
    }

    fn set_time(&mut self, sec: u32) {
        self.set_time_calls.push(sec);
        self.now_sec = sec;
        self.now_msec = 0;
    }

    fn entropy(&mut self, buf: &mut [u8]) {
        for byte in buf {
            *byte = self.entropy.pop_front().unwrap_or(0);
        }
    }
}
