//! CANIOT frames
//!
//! A frame is an unpacked identifier plus up to 8 payload bytes. Command and
//! telemetry payloads are opaque application bytes; attribute payloads carry
//! a little-endian key at bytes `[0..2)` and, for writes and read responses,
//! a little-endian 32-bit value at bytes `[2..6)`.

use crate::did::Did;
use crate::error::Error;
use crate::id::{Direction, Endpoint, FrameId, FrameType};
use crate::key::AttrKey;

/// Maximum payload length of a CANIOT frame
pub const MAX_PAYLOAD: usize = 8;

/// A CANIOT frame
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Frame {
    /// Unpacked frame identifier
    pub id: FrameId,
    /// Payload storage; only the first `len` bytes are meaningful
    pub buf: [u8; MAX_PAYLOAD],
    /// Payload length, 0..=8
    pub len: u8,
}

impl Frame {
    /// Create a frame from an identifier and payload bytes
    ///
    /// Payloads longer than 8 bytes are truncated.
    pub fn new(id: FrameId, data: &[u8]) -> Self {
        let mut frame = Frame {
            id,
            ..Default::default()
        };
        frame.set_payload(data);
        frame
    }

    /// Reset the frame to an all-zero state
    pub fn clear(&mut self) {
        *self = Frame::default();
    }

    /// The meaningful payload bytes
    pub fn payload(&self) -> &[u8] {
        &self.buf[..(self.len as usize).min(MAX_PAYLOAD)]
    }

    /// Replace the payload, truncating to 8 bytes
    pub fn set_payload(&mut self, data: &[u8]) {
        let len = data.len().min(MAX_PAYLOAD);
        self.buf[..len].copy_from_slice(&data[..len]);
        self.len = len as u8;
    }

    /// The device identifier in the class/sub-id fields
    pub fn did(&self) -> Did {
        self.id.did()
    }

    /// Set the class/sub-id fields
    pub fn set_did(&mut self, did: Did) {
        self.id.set_did(did);
    }

    /// Return true if the frame is addressed to the broadcast identifier
    pub fn is_broadcast(&self) -> bool {
        self.did().is_broadcast()
    }

    /// Return true if a received frame targets the device with the given
    /// identifier: it must be a query, addressed either to the device or to
    /// the broadcast address.
    pub fn targets(&self, did: Did) -> bool {
        self.id.direction == Direction::Query
            && (self.did() == did || self.is_broadcast())
    }

    /// Build a telemetry request query for one endpoint
    pub fn query_telemetry(endpoint: Endpoint) -> Self {
        Frame {
            id: FrameId {
                frame_type: FrameType::Telemetry,
                direction: Direction::Query,
                endpoint,
                ..Default::default()
            },
            ..Default::default()
        }
    }

    /// Build a command query for one endpoint
    pub fn query_command(endpoint: Endpoint, data: &[u8]) -> Self {
        let mut frame = Frame::query_telemetry(endpoint);
        frame.id.frame_type = FrameType::Command;
        frame.set_payload(data);
        frame
    }

    /// Build an attribute read query
    pub fn query_read_attribute(key: AttrKey) -> Self {
        let mut frame = Frame {
            id: FrameId {
                frame_type: FrameType::ReadAttribute,
                direction: Direction::Query,
                ..Default::default()
            },
            ..Default::default()
        };
        frame.buf[0..2].copy_from_slice(&key.raw().to_le_bytes());
        frame.len = 2;
        frame
    }

    /// Build an attribute write query
    pub fn query_write_attribute(key: AttrKey, value: u32) -> Self {
        let mut frame = Frame::query_read_attribute(key);
        frame.id.frame_type = FrameType::WriteAttribute;
        frame.buf[2..6].copy_from_slice(&value.to_le_bytes());
        frame.len = 6;
        frame
    }

    /// Decode the attribute key from the payload
    pub fn attr_key(&self) -> Result<AttrKey, Error> {
        if self.len < 2 {
            return Err(Error::MalformedFrame);
        }
        Ok(AttrKey::from(u16::from_le_bytes([self.buf[0], self.buf[1]])))
    }

    /// Decode the attribute value from the payload
    pub fn attr_value(&self) -> Result<u32, Error> {
        if self.len < 6 {
            return Err(Error::MalformedFrame);
        }
        Ok(u32::from_le_bytes([
            self.buf[2],
            self.buf[3],
            self.buf[4],
            self.buf[5],
        ]))
    }

    /// Fill the payload with an attribute read response
    pub fn set_attr_response(&mut self, key: AttrKey, value: u32) {
        self.buf[0..2].copy_from_slice(&key.raw().to_le_bytes());
        self.buf[2..6].copy_from_slice(&value.to_le_bytes());
        self.len = 6;
    }

    /// Return true if this frame is an error frame
    pub fn is_error(&self) -> bool {
        self.id.is_error()
    }

    /// Decode the signed error code from an error frame payload
    pub fn error_code(&self) -> Option<i32> {
        if !self.is_error() || self.len < 4 {
            return None;
        }
        Some(i32::from_le_bytes([
            self.buf[0],
            self.buf[1],
            self.buf[2],
            self.buf[3],
        ]))
    }

    /// Decode the offending attribute key from an error frame payload, when
    /// present
    pub fn error_key(&self) -> Option<AttrKey> {
        if !self.is_error() || self.len < 8 {
            return None;
        }
        let raw = u32::from_le_bytes([self.buf[4], self.buf[5], self.buf[6], self.buf[7]]);
        Some(AttrKey::from(raw as u16))
    }

    /// Return true if this frame is a telemetry response
    pub fn is_telemetry_response(&self) -> bool {
        self.id.direction == Direction::Response && self.id.frame_type == FrameType::Telemetry
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payload_truncates_to_eight_bytes() {
        let mut frame = Frame::default();
        frame.set_payload(&[0xAA; 12]);
        assert_eq!(8, frame.len);
        assert_eq!([0xAA; 8], frame.buf);
    }

    #[test]
    fn attr_query_builders() {
        let frame = Frame::query_read_attribute(AttrKey::from(0x1010));
        assert_eq!(FrameType::ReadAttribute, frame.id.frame_type);
        assert_eq!(Direction::Query, frame.id.direction);
        assert_eq!(&[0x10, 0x10], frame.payload());
        assert_eq!(AttrKey::from(0x1010), frame.attr_key().unwrap());
        assert_eq!(Err(Error::MalformedFrame), frame.attr_value());

        let frame = Frame::query_write_attribute(AttrKey::from(0x2000), 60);
        assert_eq!(FrameType::WriteAttribute, frame.id.frame_type);
        assert_eq!(&[0x00, 0x20, 60, 0, 0, 0], frame.payload());
        assert_eq!(60, frame.attr_value().unwrap());
    }

    #[test]
    fn short_payload_is_malformed() {
        let mut frame = Frame::query_read_attribute(AttrKey::from(0x1010));
        frame.len = 1;
        assert_eq!(Err(Error::MalformedFrame), frame.attr_key());
    }

    #[test]
    fn targeting() {
        let own = Did::from_parts(1, 2);
        let mut frame = Frame::query_telemetry(Endpoint::App);
        frame.set_did(own);
        assert!(frame.targets(own));
        assert!(!frame.targets(Did::from_parts(1, 3)));

        frame.set_did(Did::BROADCAST);
        assert!(frame.targets(own));
        assert!(frame.is_broadcast());

        // responses never target a device
        frame.id.direction = Direction::Response;
        assert!(!frame.targets(own));
    }

    #[test]
    fn error_payload() {
        let mut frame = Frame::default();
        frame.id = FrameId {
            frame_type: FrameType::WriteAttribute,
            direction: Direction::Response,
            class: 1,
            sub_id: 2,
            endpoint: Endpoint::App,
        };
        frame.buf[0..4].copy_from_slice(&Error::NoSuchPart.wire_code().to_le_bytes());
        frame.buf[4..8].copy_from_slice(&0x1012u32.to_le_bytes());
        frame.len = 8;

        assert!(frame.is_error());
        assert_eq!(Some(Error::NoSuchPart.wire_code()), frame.error_code());
        assert_eq!(Some(AttrKey::from(0x1012)), frame.error_key());
    }
}
