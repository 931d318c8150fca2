//! `$ATTRIBUTE_LIST` entries
//!
//! When a file's attributes do not fit in one record, the base record holds
//! an attribute list naming every attribute and the record it lives in.

use crate::error::{NtfsError, Result};
use crate::types::record_number;
use crate::utils::bytes::{slice_at, u16_at, u32_at, u64_at, u8_at};
use crate::utils::string;
use log::warn;

/// Smallest valid entry (header up to the attribute id)
const MIN_ENTRY_LEN: usize = 0x1A;

/// One entry of an attribute list
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListEntry<'a> {
    /// Attribute type code
    pub type_code: u32,
    /// First VCN held by the referenced attribute record
    pub starting_vcn: u64,
    /// File reference of the record holding the attribute
    pub file_reference: u64,
    name: &'a [u8],
}

impl ListEntry<'_> {
    /// Record number of the holding record
    pub fn record_number(&self) -> u64 {
        record_number(self.file_reference)
    }

    /// Exact name comparison
    pub fn name_matches(&self, name: &[u16]) -> bool {
        string::le_bytes_eq(self.name, name)
    }
}

/// Iterator over the packed entries of an attribute list value
pub struct ListEntries<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> ListEntries<'a> {
    /// Walk `data`, the complete attribute list value
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    fn parse_at(&self, pos: usize) -> Option<(ListEntry<'a>, usize)> {
        let data = self.data;
        let length = u16_at(data, pos + 0x04)? as usize;
        if length < MIN_ENTRY_LEN || pos.checked_add(length)? > data.len() {
            return None;
        }
        let entry = &data[pos..pos + length];
        let name_length = u8_at(entry, 0x06)? as usize;
        let name_offset = u8_at(entry, 0x07)? as usize;
        Some((
            ListEntry {
                type_code: u32_at(entry, 0x00)?,
                starting_vcn: u64_at(entry, 0x08)?,
                file_reference: u64_at(entry, 0x10)?,
                name: slice_at(entry, name_offset, name_length * 2)?,
            },
            pos + length,
        ))
    }
}

impl<'a> Iterator for ListEntries<'a> {
    type Item = Result<ListEntry<'a>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.pos >= self.data.len() {
            return None;
        }
        match self.parse_at(self.pos) {
            Some((entry, next)) => {
                self.pos = next;
                Some(Ok(entry))
            }
            None => {
                warn!("ntfs: malformed attribute list entry at {:#x}", self.pos);
                self.pos = self.data.len();
                Some(Err(NtfsError::CorruptVolume))
            }
        }
    }
}
