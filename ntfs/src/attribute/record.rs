//! Attribute record header parsing
//!
//! Every attribute in a file record starts with a common header followed by
//! either the resident value or the non-resident sizes and mapping pairs.
//! [`AttributeRecord::parse`] checks that every offset the header declares
//! stays inside the record before any accessor is used.

use crate::error::{NtfsError, Result};
use crate::types::AttributeType;
use crate::utils::bytes::{u16_at, u32_at, u64_at, u8_at};
use crate::utils::string;

/// Smallest possible attribute record (resident header)
pub const RESIDENT_HEADER_LEN: usize = 0x18;
/// Smallest non-resident attribute record header
pub const NON_RESIDENT_HEADER_LEN: usize = 0x40;

/// Placement of the attribute value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttributeForm {
    /// Value stored inline
    Resident {
        /// Offset of the value within the record
        value_offset: usize,
        /// Value length in bytes
        value_length: u32,
    },
    /// Value stored in clusters described by mapping pairs
    NonResident {
        /// First VCN covered by this record
        lowest_vcn: u64,
        /// Offset of the mapping pairs within the record
        mapping_pairs_offset: usize,
        /// Logical size of the value
        data_size: u64,
    },
}

/// Validated view of one attribute record
#[derive(Debug, Clone, Copy)]
pub struct AttributeRecord<'a> {
    bytes: &'a [u8],
    type_code: u32,
    flags: u16,
    name_offset: usize,
    name_length: usize,
    form: AttributeForm,
}

impl<'a> AttributeRecord<'a> {
    /// Parse an attribute record from the start of `data`
    ///
    /// `data` may extend past the record; the returned view covers exactly
    /// the record's declared length.
    pub fn parse(data: &'a [u8]) -> Result<Self> {
        let corrupt = || NtfsError::CorruptVolume;

        let type_code = u32_at(data, 0x00).ok_or_else(corrupt)?;
        let length = u32_at(data, 0x04).ok_or_else(corrupt)? as usize;
        if length < RESIDENT_HEADER_LEN || length > data.len() {
            return Err(NtfsError::CorruptVolume);
        }
        let bytes = &data[..length];

        let non_resident = u8_at(bytes, 0x08).ok_or_else(corrupt)? != 0;
        let name_length = u8_at(bytes, 0x09).ok_or_else(corrupt)? as usize;
        let name_offset = u16_at(bytes, 0x0A).ok_or_else(corrupt)? as usize;
        let flags = u16_at(bytes, 0x0C).ok_or_else(corrupt)?;

        if name_length > 0 && name_offset + name_length * 2 > length {
            return Err(NtfsError::CorruptVolume);
        }

        let form = if non_resident {
            if length < NON_RESIDENT_HEADER_LEN {
                return Err(NtfsError::CorruptVolume);
            }
            let mapping_pairs_offset = u16_at(bytes, 0x20).ok_or_else(corrupt)? as usize;
            if mapping_pairs_offset >= length {
                return Err(NtfsError::CorruptRunList);
            }
            AttributeForm::NonResident {
                lowest_vcn: u64_at(bytes, 0x10).ok_or_else(corrupt)?,
                mapping_pairs_offset,
                data_size: u64_at(bytes, 0x30).ok_or_else(corrupt)?,
            }
        } else {
            let value_length = u32_at(bytes, 0x10).ok_or_else(corrupt)?;
            let value_offset = u16_at(bytes, 0x14).ok_or_else(corrupt)? as usize;
            if value_offset + value_length as usize > length {
                return Err(NtfsError::CorruptVolume);
            }
            AttributeForm::Resident {
                value_offset,
                value_length,
            }
        };

        Ok(Self {
            bytes,
            type_code,
            flags,
            name_offset,
            name_length,
            form,
        })
    }

    /// Raw bytes of the whole record
    pub fn as_bytes(&self) -> &'a [u8] {
        self.bytes
    }

    /// Record length in bytes
    pub fn record_length(&self) -> usize {
        self.bytes.len()
    }

    /// Attribute type code
    pub fn type_code(&self) -> u32 {
        self.type_code
    }

    /// Is this attribute of the given type?
    pub fn is_type(&self, ty: AttributeType) -> bool {
        self.type_code == ty.code()
    }

    /// Header flags
    pub fn flags(&self) -> u16 {
        self.flags
    }

    /// Resident or non-resident placement
    pub fn form(&self) -> AttributeForm {
        self.form
    }

    /// Is the value stored outside the record?
    pub fn is_non_resident(&self) -> bool {
        matches!(self.form, AttributeForm::NonResident { .. })
    }

    /// Name as raw UTF-16LE bytes (empty for unnamed attributes)
    pub fn name_bytes(&self) -> &'a [u8] {
        &self.bytes[self.name_offset..self.name_offset + self.name_length * 2]
    }

    /// Name length in UTF-16 code units
    pub fn name_length(&self) -> usize {
        self.name_length
    }

    /// Exact name comparison (length and every code unit)
    pub fn name_matches(&self, name: &[u16]) -> bool {
        string::le_bytes_eq(self.name_bytes(), name)
    }

    /// Logical size of the attribute value
    pub fn data_size(&self) -> u64 {
        match self.form {
            AttributeForm::Resident { value_length, .. } => value_length as u64,
            AttributeForm::NonResident { data_size, .. } => data_size,
        }
    }

    /// Inline value of a resident attribute
    pub fn resident_value(&self) -> Option<&'a [u8]> {
        match self.form {
            AttributeForm::Resident {
                value_offset,
                value_length,
            } => Some(&self.bytes[value_offset..value_offset + value_length as usize]),
            AttributeForm::NonResident { .. } => None,
        }
    }

    /// Mapping pairs of a non-resident attribute
    pub fn mapping_pairs(&self) -> Option<&'a [u8]> {
        match self.form {
            AttributeForm::NonResident {
                mapping_pairs_offset,
                ..
            } => Some(&self.bytes[mapping_pairs_offset..]),
            AttributeForm::Resident { .. } => None,
        }
    }
}
