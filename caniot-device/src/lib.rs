//! A library to implement a CANIOT device in Rust
//!
//! Caniot-device implements the device side of the CANIOT application
//! protocol, carried over 11-bit CAN identifiers. It is primarily intended
//! to run on microcontrollers: it is no_std compatible, performs no heap
//! allocation, and reaches the outside world only through the [`Driver`]
//! trait supplied by the application. It provides the following features:
//!
//! * Decodes inbound frames and classifies them as commands, telemetry
//!   requests, or attribute reads/writes.
//! * Resolves 16-bit attribute keys against a statically declared schema of
//!   identification, system and configuration attributes, with role and
//!   class based access control.
//! * Builds response, telemetry and error frames with authoritative
//!   identifier fields, optionally delaying broadcast responses by a random
//!   amount.
//! * Drives periodic telemetry from the driver's timebase and publishes a
//!   configurable list of attributes at startup.
//!
//! # Getting started
//!
//! The application provides three pieces of state: a read-only
//! [`Identification`] record, an externally owned [`Config`], and an
//! implementation of the [`Driver`] trait wrapping the CAN controller,
//! clock and entropy source. Application behaviour is plugged in through
//! the [`Api`] callback table; every slot is optional.
//!
//! ```ignore
//! static IDENTIFICATION: Identification =
//!     Identification::new(Did::from_parts(1, 2), 0x0102, "my-device", 0xDEADBEEF);
//!
//! let mut config = Config::default();
//! let api = Api {
//!     command_handler: Some(handle_command),
//!     telemetry_handler: Some(build_telemetry),
//!     ..Api::new()
//! };
//! let mut device = Device::new(&IDENTIFICATION, &mut config, api, driver)?;
//!
//! loop {
//!     match device.process() {
//!         Ok(()) | Err(Error::Again) => {}
//!         Err(e) => warn!("process: {e}"),
//!     }
//!     wait_for_rx_or_timeout(device.time_until_next_process());
//! }
//! ```
//!
//! The CAN acceptance filters of the controller can be configured from
//! [`filter_for`], [`broadcast_filter`] and [`mask`], so that only frames
//! addressed to the device (or broadcast) reach [`Device::process`].
#![cfg_attr(all(not(test), not(feature = "std")), no_std)]
#![warn(missing_docs)]
#![cfg_attr(docsrs, feature(doc_cfg))]

pub mod api;
pub mod attrs;
mod device;
pub mod driver;
pub mod state;

pub use caniot_common as common;

pub use api::Api;
pub use common::{AttrKey, Did, Error, Frame};
pub use device::{
    broadcast_filter, filter_for, filter_for_class, is_class_targeted, is_targeted, mask, Device,
};
pub use driver::Driver;
pub use state::{Config, Identification, SystemState};
