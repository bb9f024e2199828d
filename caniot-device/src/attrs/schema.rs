//! The static attribute schema
//!
//! Three sections — identification, system, configuration — each an ordered
//! table of `(name, offset, size, flags)` rows describing where an
//! attribute lives inside its section struct and who may access it. The
//! tables are `static` and never mutated; offsets are derived from the
//! section struct layouts so the tables cannot drift from the state types.

use core::mem::{offset_of, size_of};

use caniot_common::AttrKey;

use crate::state::{
    Class0Gpio, Class1Gpio, Config, Identification, ReceivedCounters, SentCounters, SystemState,
    TelemetryConfig,
};

const READABLE: u8 = 1 << 0;
const WRITABLE: u8 = 1 << 1;
const CLASS_POS: u8 = 2;
const CLASS_MASK: u8 = 0x7;
const CLASS_ALL: u8 = 1 << 5;

/// Per-attribute role flags: readable/writable bits plus a class
/// restriction (all classes, or one specific class)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct AttrFlags(u8);

impl AttrFlags {
    pub(crate) const fn readable(&self) -> bool {
        self.0 & READABLE != 0
    }

    pub(crate) const fn writable(&self) -> bool {
        self.0 & WRITABLE != 0
    }

    /// The class this attribute is restricted to, if any
    pub(crate) const fn class_restriction(&self) -> Option<u8> {
        if self.0 & CLASS_ALL != 0 {
            None
        } else {
            Some((self.0 >> CLASS_POS) & CLASS_MASK)
        }
    }

    pub(crate) const fn without_writable(self) -> Self {
        AttrFlags(self.0 & !WRITABLE)
    }
}

/// Readable by everyone
const RO: AttrFlags = AttrFlags(READABLE | CLASS_ALL);
/// Readable and writable by everyone
const RW: AttrFlags = AttrFlags(READABLE | WRITABLE | CLASS_ALL);
/// Present in the schema but not accessible over the bus
const HIDDEN: AttrFlags = AttrFlags(CLASS_ALL);

/// Readable and writable, restricted to one device class
const fn class_rw(class: u8) -> AttrFlags {
    AttrFlags(READABLE | WRITABLE | (class & CLASS_MASK) << CLASS_POS)
}

/// One attribute row: location within the section struct plus role flags
#[derive(Debug, Clone, Copy)]
pub(crate) struct AttrSpec {
    pub(crate) name: &'static str,
    pub(crate) offset: u16,
    pub(crate) size: u8,
    pub(crate) flags: AttrFlags,
}

const fn attr(name: &'static str, offset: usize, size: usize, flags: AttrFlags) -> AttrSpec {
    AttrSpec {
        name,
        offset: offset as u16,
        size: size as u8,
        flags,
    }
}

/// The role a section imposes on all of its attributes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SectionRole {
    /// Never writable, regardless of per-attribute flags
    ReadOnly,
    /// Writes go directly to RAM
    Volatile,
    /// Writes are surfaced to the application for persistence
    Persistent,
}

/// One attribute section: its role and its ordered attribute table
#[derive(Debug, Clone, Copy)]
pub(crate) struct SectionSpec {
    pub(crate) name: &'static str,
    pub(crate) role: SectionRole,
    pub(crate) attributes: &'static [AttrSpec],
}

static IDENTIFICATION_ATTRS: [AttrSpec; 7] = [
    attr("did", offset_of!(Identification, did), size_of::<u8>(), RO),
    attr("version", offset_of!(Identification, version), size_of::<u16>(), RO),
    attr("name", offset_of!(Identification, name), 32, RO),
    attr("magic_number", offset_of!(Identification, magic_number), size_of::<u32>(), RO),
    attr("build_date", offset_of!(Identification, build_date), size_of::<u32>(), RO),
    attr("build_commit", offset_of!(Identification, build_commit), 20, RO),
    attr("features", offset_of!(Identification, features), 16, RO),
];

const RECEIVED: usize = offset_of!(SystemState, received);
const SENT: usize = offset_of!(SystemState, sent);

static SYSTEM_ATTRS: [AttrSpec; 0x13] = [
    attr("uptime_synced", offset_of!(SystemState, uptime_synced), size_of::<u32>(), RO),
    attr("time", offset_of!(SystemState, time), size_of::<u32>(), RW),
    attr("uptime", offset_of!(SystemState, uptime), size_of::<u32>(), RO),
    attr("start_time", offset_of!(SystemState, start_time), size_of::<u32>(), RO),
    attr("last_telemetry", offset_of!(SystemState, last_telemetry), size_of::<u32>(), RO),
    attr("received.total", RECEIVED + offset_of!(ReceivedCounters, total), size_of::<u32>(), RO),
    attr(
        "received.read_attribute",
        RECEIVED + offset_of!(ReceivedCounters, read_attribute),
        size_of::<u32>(),
        RO,
    ),
    attr(
        "received.write_attribute",
        RECEIVED + offset_of!(ReceivedCounters, write_attribute),
        size_of::<u32>(),
        RO,
    ),
    attr("received.command", RECEIVED + offset_of!(ReceivedCounters, command), size_of::<u32>(), RO),
    attr(
        "received.request_telemetry",
        RECEIVED + offset_of!(ReceivedCounters, request_telemetry),
        size_of::<u32>(),
        RO,
    ),
    attr("received.ignored", RECEIVED + offset_of!(ReceivedCounters, ignored), size_of::<u32>(), HIDDEN),
    attr("_last_telemetry_ms", offset_of!(SystemState, last_telemetry_ms), size_of::<u32>(), RO),
    attr("sent.total", SENT + offset_of!(SentCounters, total), size_of::<u32>(), RO),
    attr("sent.telemetry", SENT + offset_of!(SentCounters, telemetry), size_of::<u32>(), RO),
    attr("", offset_of!(SystemState, _reserved1), size_of::<u32>(), HIDDEN),
    attr("last_command_error", offset_of!(SystemState, last_command_error), size_of::<i16>(), RO),
    attr("last_telemetry_error", offset_of!(SystemState, last_telemetry_error), size_of::<i16>(), RO),
    attr("", offset_of!(SystemState, _reserved2), size_of::<i16>(), HIDDEN),
    attr("battery", offset_of!(SystemState, battery), size_of::<u8>(), RO),
];

const TELEMETRY: usize = offset_of!(Config, telemetry);
const CLS0: usize = offset_of!(Config, cls0_gpio);
const CLS1: usize = offset_of!(Config, cls1_gpio);
const CLS0_PULSE: usize = CLS0 + offset_of!(Class0Gpio, pulse_durations);
const CLS1_PULSE: usize = CLS1 + offset_of!(Class1Gpio, pulse_durations);

const fn cls0_pulse(name: &'static str, index: usize) -> AttrSpec {
    attr(name, CLS0_PULSE + index * size_of::<u32>(), size_of::<u32>(), class_rw(0))
}

const fn cls1_pulse(name: &'static str, index: usize) -> AttrSpec {
    attr(name, CLS1_PULSE + index * size_of::<u32>(), size_of::<u32>(), class_rw(1))
}

static CONFIG_ATTRS: [AttrSpec; 0x24] = [
    attr("telemetry.period", TELEMETRY + offset_of!(TelemetryConfig, period), size_of::<u32>(), RW),
    // "delay" aliases delay_min: the two keys address the same field
    attr("telemetry.delay", TELEMETRY + offset_of!(TelemetryConfig, delay_min), size_of::<u16>(), RW),
    attr(
        "telemetry.delay_min",
        TELEMETRY + offset_of!(TelemetryConfig, delay_min),
        size_of::<u16>(),
        RW,
    ),
    attr(
        "telemetry.delay_max",
        TELEMETRY + offset_of!(TelemetryConfig, delay_max),
        size_of::<u16>(),
        RW,
    ),
    attr("flags", offset_of!(Config, flags), size_of::<u8>(), RW),
    attr("timezone", offset_of!(Config, timezone), size_of::<i32>(), RW),
    attr("location", offset_of!(Config, location), 4, RW),
    cls0_pulse("cls0_gpio.pulse_duration.oc1", 0),
    cls0_pulse("cls0_gpio.pulse_duration.oc2", 1),
    cls0_pulse("cls0_gpio.pulse_duration.rl1", 2),
    cls0_pulse("cls0_gpio.pulse_duration.rl2", 3),
    attr(
        "cls0_gpio.outputs_default",
        CLS0 + offset_of!(Class0Gpio, outputs_default),
        size_of::<u32>(),
        class_rw(0),
    ),
    attr(
        "cls0_gpio.telemetry_on_change",
        CLS0 + offset_of!(Class0Gpio, telemetry_on_change),
        size_of::<u32>(),
        class_rw(0),
    ),
    cls1_pulse("cls1_gpio.pulse_duration.pc0", 0),
    cls1_pulse("cls1_gpio.pulse_duration.pc1", 1),
    cls1_pulse("cls1_gpio.pulse_duration.pc2", 2),
    cls1_pulse("cls1_gpio.pulse_duration.pc3", 3),
    cls1_pulse("cls1_gpio.pulse_duration.pd0", 4),
    cls1_pulse("cls1_gpio.pulse_duration.pd1", 5),
    cls1_pulse("cls1_gpio.pulse_duration.pd2", 6),
    cls1_pulse("cls1_gpio.pulse_duration.pd3", 7),
    cls1_pulse("cls1_gpio.pulse_duration.pei0", 8),
    cls1_pulse("cls1_gpio.pulse_duration.pei1", 9),
    cls1_pulse("cls1_gpio.pulse_duration.pei2", 10),
    cls1_pulse("cls1_gpio.pulse_duration.pei3", 11),
    cls1_pulse("cls1_gpio.pulse_duration.pei4", 12),
    cls1_pulse("cls1_gpio.pulse_duration.pei5", 13),
    cls1_pulse("cls1_gpio.pulse_duration.pei6", 14),
    cls1_pulse("cls1_gpio.pulse_duration.pei7", 15),
    cls1_pulse("cls1_gpio.pulse_duration.pb0", 16),
    cls1_pulse("cls1_gpio.pulse_duration.pe0", 17),
    cls1_pulse("cls1_gpio.pulse_duration.pe1", 18),
    cls1_pulse("cls1_gpio.pulse_duration._reserved", 19),
    attr("cls1_gpio.directions", CLS1 + offset_of!(Class1Gpio, directions), size_of::<u32>(), class_rw(1)),
    attr(
        "cls1_gpio.outputs_default",
        CLS1 + offset_of!(Class1Gpio, outputs_default),
        size_of::<u32>(),
        class_rw(1),
    ),
    attr(
        "cls1_gpio.telemetry_on_change",
        CLS1 + offset_of!(Class1Gpio, telemetry_on_change),
        size_of::<u32>(),
        class_rw(1),
    ),
];

pub(crate) static SECTIONS: [SectionSpec; 3] = [
    SectionSpec {
        name: "identification",
        role: SectionRole::ReadOnly,
        attributes: &IDENTIFICATION_ATTRS,
    },
    SectionSpec {
        name: "system",
        role: SectionRole::Volatile,
        attributes: &SYSTEM_ATTRS,
    },
    SectionSpec {
        name: "configuration",
        role: SectionRole::Persistent,
        attributes: &CONFIG_ATTRS,
    },
];

/// Well-known attribute keys
pub mod keys {
    use super::AttrKey;

    /// identification.did
    pub const DID: AttrKey = AttrKey::new(0, 0x00, 0);
    /// identification.version
    pub const VERSION: AttrKey = AttrKey::new(0, 0x01, 0);
    /// identification.name (first part)
    pub const NAME: AttrKey = AttrKey::new(0, 0x02, 0);
    /// identification.magic_number
    pub const MAGIC_NUMBER: AttrKey = AttrKey::new(0, 0x03, 0);
    /// system.uptime_synced
    pub const UPTIME_SYNCED: AttrKey = AttrKey::new(1, 0x00, 0);
    /// system.time
    pub const TIME: AttrKey = AttrKey::new(1, 0x01, 0);
    /// system.uptime
    pub const UPTIME: AttrKey = AttrKey::new(1, 0x02, 0);
    /// system.last_telemetry
    pub const LAST_TELEMETRY: AttrKey = AttrKey::new(1, 0x04, 0);
    /// configuration.telemetry.period
    pub const TELEMETRY_PERIOD: AttrKey = AttrKey::new(2, 0x00, 0);
    /// configuration.telemetry.delay_min
    pub const TELEMETRY_DELAY_MIN: AttrKey = AttrKey::new(2, 0x02, 0);
    /// configuration.telemetry.delay_max
    pub const TELEMETRY_DELAY_MAX: AttrKey = AttrKey::new(2, 0x03, 0);
    /// configuration.flags
    pub const CONFIG_FLAGS: AttrKey = AttrKey::new(2, 0x04, 0);
    /// configuration.timezone
    pub const TIMEZONE: AttrKey = AttrKey::new(2, 0x05, 0);
    /// configuration.location
    pub const LOCATION: AttrKey = AttrKey::new(2, 0x06, 0);
}
