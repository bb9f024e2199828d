//! Device state sections
//!
//! The attribute namespace is backed by three memory sections: the
//! read-only [`Identification`] supplied at construction, the volatile
//! [`SystemState`] owned by the core, and the persistent [`Config`] owned
//! by the application. Each section is a `#[repr(C)]` struct without
//! padding so that the attribute engine can address it as plain bytes; on
//! hosts this byte view is an ordinary in-memory copy, while the schema
//! itself stays in read-only memory.

use bytemuck::{Pod, Zeroable};
use caniot_common::{Did, Endpoint};

/// Default periodic telemetry period
pub const TELEMETRY_PERIOD_DEFAULT_MS: u32 = 60_000;
/// Default minimum broadcast response delay
pub const TELEMETRY_DELAY_MIN_DEFAULT_MS: u16 = 0;
/// Default maximum broadcast response delay; also the delay amplitude used
/// when the configured bounds are inverted or empty
pub const TELEMETRY_DELAY_MAX_DEFAULT_MS: u16 = 100;

/// Read-only device identification
///
/// Lives for the entire process, possibly in program memory. The core never
/// mutates it.
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
#[repr(C)]
pub struct Identification {
    pub(crate) did: u8,
    pub(crate) _reserved: u8,
    /// Firmware version
    pub version: u16,
    /// Device name, NUL padded
    pub name: [u8; 32],
    /// Magic number identifying the firmware image
    pub magic_number: u32,
    /// Build date as a UNIX timestamp
    pub build_date: u32,
    /// Commit hash of the build
    pub build_commit: [u8; 20],
    /// Feature words advertised to the controller
    pub features: [u32; 4],
}

const _: () = assert!(core::mem::size_of::<Identification>() == 80);

impl Identification {
    /// Create an identification record
    ///
    /// Names longer than 32 bytes are truncated.
    pub const fn new(did: Did, version: u16, name: &str, magic_number: u32) -> Self {
        let mut buf = [0u8; 32];
        let bytes = name.as_bytes();
        let mut i = 0;
        while i < bytes.len() && i < buf.len() {
            buf[i] = bytes[i];
            i += 1;
        }
        Identification {
            did: did.raw(),
            _reserved: 0,
            version,
            name: buf,
            magic_number,
            build_date: 0,
            build_commit: [0; 20],
            features: [0; 4],
        }
    }

    /// Attach build information
    pub const fn with_build_info(mut self, date: u32, commit: [u8; 20]) -> Self {
        self.build_date = date;
        self.build_commit = commit;
        self
    }

    /// Attach feature words
    pub const fn with_features(mut self, features: [u32; 4]) -> Self {
        self.features = features;
        self
    }

    /// The device identifier
    pub const fn did(&self) -> Did {
        Did::from_parts(self.did >> 3, self.did)
    }

    /// The device name as a string slice, NUL padding stripped
    pub fn name(&self) -> &str {
        let end = self.name.iter().position(|&b| b == 0).unwrap_or(self.name.len());
        core::str::from_utf8(&self.name[..end]).unwrap_or("")
    }
}

/// Frame reception counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Pod, Zeroable)]
#[repr(C)]
pub struct ReceivedCounters {
    /// All handled frames
    pub total: u32,
    /// Attribute read requests
    pub read_attribute: u32,
    /// Attribute write requests
    pub write_attribute: u32,
    /// Command requests
    pub command: u32,
    /// Telemetry requests
    pub request_telemetry: u32,
    /// Frames dropped because they did not target this device
    pub ignored: u32,
}

/// Frame emission counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Pod, Zeroable)]
#[repr(C)]
pub struct SentCounters {
    /// All sent frames
    pub total: u32,
    /// Telemetry frames
    pub telemetry: u32,
}

/// Volatile system section
///
/// Created zeroed at device construction and written only by the core.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Pod, Zeroable)]
#[repr(C)]
pub struct SystemState {
    /// Uptime at the moment the wall clock was last set
    pub uptime_synced: u32,
    /// Wall-clock seconds sampled at the last process invocation
    pub time: u32,
    /// Seconds since the device started
    pub uptime: u32,
    /// Wall-clock seconds at device start
    pub start_time: u32,
    /// Wall-clock seconds of the last periodic telemetry emission
    pub last_telemetry: u32,
    /// Reception counters
    pub received: ReceivedCounters,
    /// Millisecond timestamp of the last periodic telemetry emission
    pub last_telemetry_ms: u32,
    /// Emission counters
    pub sent: SentCounters,
    pub(crate) _reserved1: u32,
    /// Result of the most recent command handler invocation
    pub last_command_error: i16,
    /// Result of the most recent telemetry handler invocation
    pub last_telemetry_error: i16,
    pub(crate) _reserved2: i16,
    /// Battery level reported by the application
    pub battery: u8,
    pub(crate) _reserved3: u8,
}

const _: () = assert!(core::mem::size_of::<SystemState>() == 68);

/// Periodic telemetry timing configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Pod, Zeroable)]
#[repr(C)]
pub struct TelemetryConfig {
    /// Period of unsolicited telemetry in milliseconds
    pub period: u32,
    /// Minimum random delay applied to broadcast responses, milliseconds
    pub delay_min: u16,
    /// Maximum random delay applied to broadcast responses, milliseconds
    pub delay_max: u16,
}

/// Configuration flag bitfield
///
/// Bit 0 enables error responses, bit 1 enables the random broadcast delay,
/// bits 2..3 select the periodic telemetry endpoint, bit 4 enables periodic
/// telemetry.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Pod, Zeroable)]
#[repr(transparent)]
pub struct ConfigFlags(u8);

impl ConfigFlags {
    const ERROR_RESPONSE: u8 = 1 << 0;
    const RANDOM_DELAY: u8 = 1 << 1;
    const ENDPOINT_POS: u8 = 2;
    const ENDPOINT_MASK: u8 = 0x3;
    const PERIODIC_ENABLED: u8 = 1 << 4;

    /// All flags cleared
    pub const fn new() -> Self {
        ConfigFlags(0)
    }

    /// Whether error frames are emitted on failures
    pub const fn error_response(&self) -> bool {
        self.0 & Self::ERROR_RESPONSE != 0
    }

    /// Whether broadcast responses are randomly delayed
    pub const fn random_delay(&self) -> bool {
        self.0 & Self::RANDOM_DELAY != 0
    }

    /// The endpoint used for periodic telemetry
    pub const fn telemetry_endpoint(&self) -> Endpoint {
        Endpoint::from_bits(self.0 >> Self::ENDPOINT_POS)
    }

    /// Whether periodic telemetry is enabled
    pub const fn periodic_enabled(&self) -> bool {
        self.0 & Self::PERIODIC_ENABLED != 0
    }

    /// Builder-style setter for the error response flag
    pub const fn with_error_response(self, on: bool) -> Self {
        self.with_bit(Self::ERROR_RESPONSE, on)
    }

    /// Builder-style setter for the random delay flag
    pub const fn with_random_delay(self, on: bool) -> Self {
        self.with_bit(Self::RANDOM_DELAY, on)
    }

    /// Builder-style setter for the periodic telemetry endpoint
    pub const fn with_telemetry_endpoint(self, endpoint: Endpoint) -> Self {
        ConfigFlags(
            (self.0 & !(Self::ENDPOINT_MASK << Self::ENDPOINT_POS))
                | (endpoint as u8) << Self::ENDPOINT_POS,
        )
    }

    /// Builder-style setter for the periodic telemetry flag
    pub const fn with_periodic_enabled(self, on: bool) -> Self {
        self.with_bit(Self::PERIODIC_ENABLED, on)
    }

    const fn with_bit(self, bit: u8, on: bool) -> Self {
        if on {
            ConfigFlags(self.0 | bit)
        } else {
            ConfigFlags(self.0 & !bit)
        }
    }
}

/// Geographic location, as two-letter region and country codes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Pod, Zeroable)]
#[repr(C)]
pub struct Location {
    /// Region code
    pub region: [u8; 2],
    /// Country code
    pub country: [u8; 2],
}

/// GPIO configuration of a class-0 board
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Pod, Zeroable)]
#[repr(C)]
pub struct Class0Gpio {
    /// Pulse duration per output (oc1, oc2, rl1, rl2), milliseconds
    pub pulse_durations: [u32; 4],
    /// Default output states applied at startup
    pub outputs_default: u32,
    /// Mask of inputs/outputs whose change triggers telemetry
    pub telemetry_on_change: u32,
}

/// GPIO configuration of a class-1 board
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Pod, Zeroable)]
#[repr(C)]
pub struct Class1Gpio {
    /// Pulse duration per output, milliseconds
    pub pulse_durations: [u32; 20],
    /// Pin direction mask
    pub directions: u32,
    /// Default output states applied at startup
    pub outputs_default: u32,
    /// Mask of inputs/outputs whose change triggers telemetry
    pub telemetry_on_change: u32,
}

/// Persistent configuration section
///
/// Owned by the application; the core reads and writes it under the dirty
/// flag protocol and surfaces writes through
/// [`Api::config`](crate::api::Api::config).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Pod, Zeroable)]
#[repr(C)]
pub struct Config {
    /// Telemetry timing
    pub telemetry: TelemetryConfig,
    /// Behaviour flags
    pub flags: ConfigFlags,
    pub(crate) _reserved: [u8; 3],
    /// Timezone offset in seconds
    pub timezone: i32,
    /// Device location
    pub location: Location,
    /// Class-0 GPIO configuration
    pub cls0_gpio: Class0Gpio,
    /// Class-1 GPIO configuration
    pub cls1_gpio: Class1Gpio,
}

const _: () = assert!(core::mem::size_of::<Config>() == 136);

impl Default for Config {
    fn default() -> Self {
        Config {
            telemetry: TelemetryConfig {
                period: TELEMETRY_PERIOD_DEFAULT_MS,
                delay_min: TELEMETRY_DELAY_MIN_DEFAULT_MS,
                delay_max: TELEMETRY_DELAY_MAX_DEFAULT_MS,
            },
            flags: ConfigFlags::new()
                .with_error_response(true)
                .with_random_delay(true)
                .with_periodic_enabled(true)
                .with_telemetry_endpoint(Endpoint::BoardControl),
            _reserved: [0; 3],
            timezone: 0,
            location: Location::default(),
            cls0_gpio: Class0Gpio {
                telemetry_on_change: u32::MAX,
                ..Default::default()
            },
            cls1_gpio: Class1Gpio {
                telemetry_on_change: u32::MAX,
                ..Default::default()
            },
        }
    }
}
