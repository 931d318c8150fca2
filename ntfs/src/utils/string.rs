//! UTF-16 name handling
//!
//! NTFS stores names as UTF-16LE code units. Lookups compare unit by unit;
//! case-insensitive comparison folds each unit on its own.

use crate::types::MAX_COMPONENT_UNITS;

/// Fold one UTF-16 code unit to lower case
///
/// Units whose lower-case form is not a single BMP character (and lone
/// surrogates) are returned unchanged.
pub fn fold_unit(unit: u16) -> u16 {
    if unit < 0x80 {
        return (unit as u8).to_ascii_lowercase() as u16;
    }
    let Some(c) = char::from_u32(unit as u32) else {
        return unit;
    };
    let mut lower = c.to_lowercase();
    match (lower.next(), lower.next()) {
        (Some(l), None) if (l as u32) <= 0xFFFF => l as u32 as u16,
        _ => unit,
    }
}

/// Compare a UTF-16LE byte string against UTF-16 units
pub fn le_bytes_eq(bytes: &[u8], units: &[u16]) -> bool {
    bytes.len() == units.len() * 2
        && bytes
            .chunks_exact(2)
            .zip(units)
            .all(|(pair, &u)| u16::from_le_bytes([pair[0], pair[1]]) == u)
}

/// Compare a UTF-16LE byte string against UTF-16 units, ignoring case
pub fn le_bytes_eq_ignore_case(bytes: &[u8], units: &[u16]) -> bool {
    bytes.len() == units.len() * 2
        && bytes
            .chunks_exact(2)
            .zip(units)
            .all(|(pair, &u)| fold_unit(u16::from_le_bytes([pair[0], pair[1]])) == fold_unit(u))
}

/// Display adapter for a UTF-16LE byte string
pub struct LeName<'a>(pub &'a [u8]);

impl core::fmt::Display for LeName<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let units = self.0.chunks_exact(2).map(|p| u16::from_le_bytes([p[0], p[1]]));
        for c in char::decode_utf16(units) {
            write!(f, "{}", c.unwrap_or(char::REPLACEMENT_CHARACTER))?;
        }
        Ok(())
    }
}

/// Fixed-capacity UTF-16 copy of a path component
#[derive(Clone)]
pub struct Utf16Name {
    units: [u16; MAX_COMPONENT_UNITS],
    len: usize,
}

impl Utf16Name {
    /// Encode `name`; `None` if it needs more than 255 code units
    pub fn encode(name: &str) -> Option<Self> {
        let mut units = [0u16; MAX_COMPONENT_UNITS];
        let mut len = 0;
        for unit in name.encode_utf16() {
            *units.get_mut(len)? = unit;
            len += 1;
        }
        Some(Self { units, len })
    }

    /// Encoded code units
    pub fn as_units(&self) -> &[u16] {
        &self.units[..self.len]
    }
}

impl core::fmt::Debug for Utf16Name {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        for c in char::decode_utf16(self.as_units().iter().copied()) {
            write!(f, "{}", c.unwrap_or(char::REPLACEMENT_CHARACTER))?;
        }
        Ok(())
    }
}
