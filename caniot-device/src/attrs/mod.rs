//! The attribute namespace
//!
//! Device state is exposed on the bus as a three-level namespace of 16-bit
//! keys ([`AttrKey`]): a section, an attribute within the section, and a
//! 4-byte part for attributes wider than one value word. The catalogue of
//! attributes is a static, read-only schema; the live bytes come from the
//! section structs in [`crate::state`].
//!
//! Access control is two-layered. Each attribute carries role flags
//! (readable, writable, class restriction); each section imposes a role on
//! all of its attributes: the identification section strips writability,
//! the configuration section surfaces writes to the application for
//! persistence, and the system section is plain volatile RAM.

use caniot_common::{AttrKey, Error};

pub(crate) mod resolve;
pub(crate) mod schema;

pub use schema::{keys, SectionRole};

/// The three attribute sections
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum Section {
    /// Static device identity, read-only
    Identification = 0,
    /// Live counters and times, volatile
    System = 1,
    /// Application configuration, persistent
    Configuration = 2,
}

impl Section {
    /// Map a key section index to a section
    pub const fn from_index(index: u8) -> Option<Self> {
        match index {
            0 => Some(Section::Identification),
            1 => Some(Section::System),
            2 => Some(Section::Configuration),
            _ => None,
        }
    }

    /// The role this section imposes on its attributes
    pub const fn role(self) -> SectionRole {
        match self {
            Section::Identification => SectionRole::ReadOnly,
            Section::System => SectionRole::Volatile,
            Section::Configuration => SectionRole::Persistent,
        }
    }

    /// The section name
    pub fn name(self) -> &'static str {
        schema::SECTIONS[self as usize].name
    }
}

/// Description of one schema attribute, as reported by [`lookup`] and
/// [`attributes`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttributeInfo {
    /// The root key of the attribute (part index zero)
    pub key: AttrKey,
    /// Dotted attribute name
    pub name: &'static str,
    /// Whether the attribute can be read over the bus
    pub readable: bool,
    /// Whether the attribute can be written over the bus, after the section
    /// role adjustment
    pub writable: bool,
    /// Whether writes are persisted through the application
    pub persistent: bool,
    /// The section the attribute lives in
    pub section: Section,
    /// Total size of the attribute in bytes
    pub size: u8,
}

/// Look up the schema description of a single key
///
/// Fails with the same errors as bus-level resolution when the key names no
/// attribute or an out-of-range part.
pub fn lookup(key: AttrKey) -> Result<AttributeInfo, Error> {
    let (section, section_spec, spec) = resolve::lookup_spec(key)?;
    if key.part_offset() >= spec.size as u16 {
        return Err(Error::NoSuchPart);
    }
    let mut flags = spec.flags;
    if section_spec.role == SectionRole::ReadOnly {
        flags = flags.without_writable();
    }
    Ok(AttributeInfo {
        key: key.root(),
        name: spec.name,
        readable: flags.readable(),
        writable: flags.writable(),
        persistent: section_spec.role == SectionRole::Persistent,
        section,
        size: spec.size,
    })
}

/// Iterate over every attribute declared in the schema, hidden ones
/// included
pub fn attributes() -> impl Iterator<Item = AttributeInfo> {
    const ALL: [Section; 3] = [
        Section::Identification,
        Section::System,
        Section::Configuration,
    ];
    ALL.into_iter().flat_map(|section| {
        let section_spec = &schema::SECTIONS[section as usize];
        section_spec
            .attributes
            .iter()
            .enumerate()
            .map(move |(attr_index, spec)| {
                let mut flags = spec.flags;
                if section_spec.role == SectionRole::ReadOnly {
                    flags = flags.without_writable();
                }
                AttributeInfo {
                    key: AttrKey::new(section as u8, attr_index as u8, 0),
                    name: spec.name,
                    readable: flags.readable(),
                    writable: flags.writable(),
                    persistent: section_spec.role == SectionRole::Persistent,
                    section,
                    size: spec.size,
                }
            })
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_reports_roles() {
        let info = lookup(keys::VERSION).unwrap();
        assert_eq!("version", info.name);
        assert!(info.readable);
        assert!(!info.writable);
        assert!(!info.persistent);
        assert_eq!(Section::Identification, info.section);
        assert_eq!(2, info.size);

        let info = lookup(keys::TELEMETRY_PERIOD).unwrap();
        assert!(info.writable);
        assert!(info.persistent);
        assert_eq!(Section::Configuration, info.section);
    }

    #[test]
    fn section_roles_match_schema() {
        for section in [
            Section::Identification,
            Section::System,
            Section::Configuration,
        ] {
            assert_eq!(section.role(), schema::SECTIONS[section as usize].role);
            assert!(!section.name().is_empty());
        }
    }

    #[test]
    fn lookup_normalises_part_index() {
        let info = lookup(keys::NAME.with_part(3)).unwrap();
        assert_eq!(keys::NAME, info.key);
        assert_eq!(32, info.size);
    }

    #[test]
    fn iteration_visits_every_row_including_hidden() {
        let infos: Vec<_> = attributes().collect();
        assert_eq!(7 + 0x13 + 0x24, infos.len());

        // hidden attributes are visited but not accessible
        let ignored = infos
            .iter()
            .find(|i| i.name == "received.ignored")
            .unwrap();
        assert!(!ignored.readable);
        assert!(!ignored.writable);

        // every visited key resolves through lookup
        for info in &infos {
            assert_eq!(*info, lookup(info.key).unwrap());
        }
    }
}
