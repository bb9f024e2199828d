//! Protocol error taxonomy
//!
//! All protocol-level failures are drawn from a closed set of numeric codes
//! living in a dedicated base range, so that hosts can tell protocol errors
//! apart from transport errors. On the wire an error is carried as the
//! negated code, little-endian, in the first word of an error frame.

use int_enum::IntEnum;
use snafu::Snafu;

/// Base of the dedicated protocol error code range
pub const ERROR_BASE: u16 = 0x3A00;

/// A CANIOT protocol error
///
/// The discriminants are the positive error codes; [`Error::wire_code`]
/// yields the negated form that peers see in error frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq, IntEnum, Snafu)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u16)]
pub enum Error {
    /// An argument or frame field is invalid
    #[snafu(display("invalid argument"))]
    InvalidArgument = 0x3A00,
    /// The frame payload is too short for its type
    #[snafu(display("malformed frame"))]
    MalformedFrame = 0x3A01,
    /// The key names a section which does not exist
    #[snafu(display("no such attribute section"))]
    NoSuchSection = 0x3A02,
    /// The key names an attribute which does not exist in its section
    #[snafu(display("no such attribute"))]
    NoSuchAttribute = 0x3A03,
    /// The key names a part beyond the end of the attribute
    #[snafu(display("no such attribute part"))]
    NoSuchPart = 0x3A04,
    /// The attribute is restricted to another device class
    #[snafu(display("attribute restricted to another class"))]
    ClassMismatch = 0x3A05,
    /// The attribute exists but is not accessible
    #[snafu(display("attribute not available"))]
    AttributeNotAvailable = 0x3A06,
    /// Reading the attribute failed
    #[snafu(display("attribute read failed"))]
    ReadFailed = 0x3A07,
    /// Writing the attribute failed
    #[snafu(display("attribute write failed"))]
    WriteFailed = 0x3A08,
    /// The attribute is not writable
    #[snafu(display("attribute is read-only"))]
    ReadOnly = 0x3A09,
    /// No command handler is registered
    #[snafu(display("no command handler"))]
    NoCommandHandler = 0x3A0A,
    /// No telemetry handler is registered
    #[snafu(display("no telemetry handler"))]
    NoTelemetryHandler = 0x3A0B,
    /// The frame does not target this device
    #[snafu(display("unexpected frame"))]
    UnexpectedFrame = 0x3A0C,
    /// No frame is pending; not an error at the protocol level
    #[snafu(display("try again"))]
    Again = 0x3A0D,
    /// The operation is not supported
    #[snafu(display("not supported"))]
    NotSupported = 0x3A0E,
    /// The operation is not implemented
    #[snafu(display("not implemented"))]
    NotImplemented = 0x3A0F,
}

impl Error {
    /// The positive numeric code of this error
    pub const fn code(self) -> u16 {
        self as u16
    }

    /// The negated code as written into error frames
    pub const fn wire_code(self) -> i32 {
        -(self as u16 as i32)
    }

    /// Decode an error from the negated wire form
    pub fn from_wire_code(code: i32) -> Option<Self> {
        let positive = code.checked_neg()?;
        u16::try_from(positive).ok().and_then(|c| c.try_into().ok())
    }

    /// Return true if a signed code (positive or negated) lies in the
    /// dedicated protocol error range
    pub const fn is_protocol_code(code: i32) -> bool {
        let magnitude = code.unsigned_abs();
        magnitude >= ERROR_BASE as u32 && magnitude <= ERROR_BASE as u32 + 0xFF
    }
}
