//! Attribute key resolution
//!
//! Turns a 16-bit key into an access descriptor against the schema: the
//! section, the final byte offset (attribute offset plus the selected
//! 4-byte part), the window size, and the role flags adjusted by the
//! section role.

use caniot_common::{AttrKey, Error};

use super::schema::{AttrFlags, AttrSpec, SectionRole, SectionSpec, SECTIONS};
use super::Section;

/// A resolved attribute access descriptor
#[derive(Debug, Clone, Copy)]
pub(crate) struct AttrRef {
    pub(crate) section: Section,
    /// Byte offset of the addressed window within the section struct
    pub(crate) offset: u16,
    /// Number of meaningful bytes in the window, at most 4
    pub(crate) size: u8,
    /// Role flags, adjusted for the section role
    pub(crate) flags: AttrFlags,
}

/// Locate the schema row named by a key
pub(crate) fn lookup_spec(
    key: AttrKey,
) -> Result<(Section, &'static SectionSpec, &'static AttrSpec), Error> {
    let section =
        Section::from_index(key.section_index()).ok_or(Error::NoSuchSection)?;
    let section_spec = &SECTIONS[section as usize];
    let spec = section_spec
        .attributes
        .get(key.attr_index() as usize)
        .ok_or(Error::NoSuchAttribute)?;
    Ok((section, section_spec, spec))
}

/// Resolve a key into an access descriptor
pub(crate) fn resolve(key: AttrKey) -> Result<AttrRef, Error> {
    let (section, section_spec, spec) = lookup_spec(key)?;

    if key.part_offset() >= spec.size as u16 {
        return Err(Error::NoSuchPart);
    }

    let mut flags = spec.flags;
    if section_spec.role == SectionRole::ReadOnly {
        flags = flags.without_writable();
    }

    Ok(AttrRef {
        section,
        offset: spec.offset + key.part_offset(),
        size: spec.size.min(4),
        flags,
    })
}
