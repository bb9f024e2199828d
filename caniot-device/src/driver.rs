//! The driver interface consumed by the device core
//!
//! The core never blocks and never talks to hardware directly; receiving,
//! sending, timekeeping and entropy are all delegated to an application
//! supplied [`Driver`]. The implementations may block or not; the caller of
//! [`Device::process`](crate::Device::process) chooses how to schedule them.

use caniot_common::{Error, Frame};

/// Platform services required by a CANIOT device
pub trait Driver {
    /// Receive a pending frame, without blocking
    ///
    /// Returns [`Error::Again`] when no frame is pending. Any other error is
    /// treated as a transport failure and propagated out of the process
    /// loop. Implementations are expected to deliver only standard-ID data
    /// frames; extended-ID and RTR frames never target a CANIOT device.
    fn recv(&mut self) -> Result<Frame, Error>;

    /// Deliver a frame to the bus after at least `delay_ms` milliseconds
    fn send(&mut self, frame: &Frame, delay_ms: u32) -> Result<(), Error>;

    /// Sample the clock as whole seconds and the millisecond remainder
    ///
    /// The clock may be monotonic since boot or wall-clock since the epoch;
    /// the core only forms differences.
    fn get_time(&mut self) -> (u32, u16);

    /// Reset the wall clock to `sec` seconds
    fn set_time(&mut self, sec: u32);

    /// Fill `buf` with cryptographically unimportant randomness
    ///
    /// Used only to spread broadcast responses in time.
    fn entropy(&mut self, buf: &mut [u8]);
}

impl<T: Driver + ?Sized> Driver for &mut T {
    fn recv(&mut self) -> Result<Frame, Error> {
        (**self).recv()
    }

    fn send(&mut self, frame: &Frame, delay_ms: u32) -> Result<(), Error> {
        (**self).send(frame, delay_ms)
    }

    fn get_time(&mut self) -> (u32, u16) {
        (**self).get_time()
    }

    fn set_time(&mut self, sec: u32) {
        (**self).set_time(sec)
    }

    fn entropy(&mut self, buf: &mut [u8]) {
        (**self).entropy(buf)
    }
}
