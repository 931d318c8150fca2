//! MFT file records
//!
//! A file record is a fixed-size, fixup-protected buffer holding a header
//! followed by attribute records up to an end marker. [`MftRecord`] only
//! exists after the magic and fixups have been checked, so everything that
//! walks its attributes can trust the sector tails.

pub mod fixup;

use crate::attribute::record::AttributeRecord;
use crate::attribute::AttrContext;
use crate::error::{NtfsError, Result};
use crate::types::{AttributeType, FILE_MAGIC, RECORD_FLAG_DIRECTORY, RECORD_FLAG_IN_USE};
use crate::utils::bytes::{slice_at, u16_at, u32_at};
use crate::volume::boot::BootParameters;
use alloc::vec::Vec;
use log::warn;

/// Header offset of the first attribute
const FIRST_ATTRIBUTE_FIELD: usize = 0x14;
/// Header offset of the record flags
const FLAGS_FIELD: usize = 0x16;
/// Header offset of the used length
const BYTES_IN_USE_FIELD: usize = 0x18;
/// Type code that terminates the attribute sequence
const END_MARKER: u32 = AttributeType::End as u32;

/// Access to MFT records and attribute data of a mounted volume
///
/// The attribute resolver and the index walker are written against this
/// trait rather than a concrete volume.
pub trait MftAccess {
    /// Geometry of the mounted volume
    fn params(&self) -> &BootParameters;

    /// Load, check and fix up record `index`
    fn read_mft_record(&mut self, index: u64) -> Result<MftRecord>;

    /// Fill `buf` with attribute data through the volume's disk
    ///
    /// Disk failures are `IoError`; data ending early is `CorruptVolume`.
    fn read_attribute_exact(
        &mut self,
        ctx: &mut AttrContext,
        offset: u64,
        buf: &mut [u8],
    ) -> Result<()>;
}

/// A validated MFT file record
#[derive(Clone)]
pub struct MftRecord {
    index: u64,
    data: Vec<u8>,
}

impl MftRecord {
    /// Validate a raw record buffer read from the MFT
    ///
    /// # Errors
    /// * `CorruptVolume` - Missing `FILE` magic or header fields out of range
    /// * `FixupMismatch` - A sector tail failed the fixup check
    pub fn from_bytes(index: u64, mut data: Vec<u8>, bytes_per_sector: usize) -> Result<Self> {
        if slice_at(&data, 0, 4) != Some(&FILE_MAGIC[..]) {
            warn!("ntfs: record {} has no FILE magic", index);
            return Err(NtfsError::CorruptVolume);
        }
        fixup::apply_fixups(&mut data, bytes_per_sector)?;

        let first = u16_at(&data, FIRST_ATTRIBUTE_FIELD).ok_or(NtfsError::CorruptVolume)? as usize;
        let in_use = u32_at(&data, BYTES_IN_USE_FIELD).ok_or(NtfsError::CorruptVolume)? as usize;
        if first < BYTES_IN_USE_FIELD + 4 || first >= data.len() || in_use > data.len() {
            warn!("ntfs: record {} header out of range", index);
            return Err(NtfsError::CorruptVolume);
        }

        Ok(Self { index, data })
    }

    /// Record number within the MFT
    pub fn index(&self) -> u64 {
        self.index
    }

    /// Raw record bytes (fixups already undone)
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Header flags
    pub fn flags(&self) -> u16 {
        u16_at(&self.data, FLAGS_FIELD).unwrap_or(0)
    }

    /// Is the record allocated to a file?
    pub fn is_in_use(&self) -> bool {
        self.flags() & RECORD_FLAG_IN_USE != 0
    }

    /// Does the record describe a directory?
    pub fn is_directory(&self) -> bool {
        self.flags() & RECORD_FLAG_DIRECTORY != 0
    }

    /// Iterate the attribute records in on-disk order
    pub fn attributes(&self) -> AttributeIter<'_> {
        // Bounds were checked in from_bytes.
        let start = u16_at(&self.data, FIRST_ATTRIBUTE_FIELD).unwrap_or(0) as usize;
        let end = u32_at(&self.data, BYTES_IN_USE_FIELD).unwrap_or(0) as usize;
        AttributeIter {
            data: &self.data[..end.max(start)],
            pos: start,
            index: self.index,
            done: false,
        }
    }
}

impl core::fmt::Debug for MftRecord {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("MftRecord")
            .field("index", &self.index)
            .field("flags", &self.flags())
            .field("size", &self.data.len())
            .finish()
    }
}

/// Iterator over the attribute records of a file record
///
/// Running off the used part of the record without an end marker yields
/// a `CorruptVolume` error.
pub struct AttributeIter<'a> {
    data: &'a [u8],
    pos: usize,
    index: u64,
    done: bool,
}

impl<'a> Iterator for AttributeIter<'a> {
    type Item = Result<AttributeRecord<'a>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let Some(type_code) = u32_at(self.data, self.pos) else {
            warn!("ntfs: record {} has no attribute end marker", self.index);
            self.done = true;
            return Some(Err(NtfsError::CorruptVolume));
        };
        if type_code == END_MARKER {
            self.done = true;
            return None;
        }
        match AttributeRecord::parse(&self.data[self.pos..]) {
            Ok(attr) => {
                self.pos += attr.record_length();
                Some(Ok(attr))
            }
            Err(e) => {
                warn!("ntfs: record {} has a malformed attribute at {:#x}", self.index, self.pos);
                self.done = true;
                Some(Err(e))
            }
        }
    }
}
