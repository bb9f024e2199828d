//! Common functionality shared among the caniot crates.
//!
//! This crate defines the CANIOT wire format: the 11-bit frame identifier
//! codec, the frame payload layouts, the 16-bit attribute key, the closed
//! error taxonomy and the board-level data type codecs. It contains no
//! device state; the device protocol engine lives in `caniot-device` and
//! re-exports this crate.
#![cfg_attr(all(not(test), not(feature = "std")), no_std)]
#![warn(missing_docs, missing_copy_implementations)]
#![cfg_attr(docsrs, feature(doc_cfg))]

pub mod datatype;
pub mod did;
pub mod error;
pub mod frame;
pub mod id;
pub mod key;

pub use did::Did;
pub use error::Error;
pub use frame::Frame;
pub use id::{Direction, Endpoint, FrameId, FrameType};
pub use key::AttrKey;
