//! Directory index lookup
//!
//! A directory's `$I30` index starts with a resident `$INDEX_ROOT`. Large
//! directories spill into fixed-size INDX blocks stored in
//! `$INDEX_ALLOCATION`, with a `$BITMAP` marking which blocks are in use.
//!
//! Lookup is a linear scan of every node: the root first, then each
//! allocated block in allocation order. Sub-node pointers are not used to
//! prune the search.

pub mod entry;

use crate::attribute::{find_attribute, read_value};
use crate::error::{NtfsError, Result};
use crate::record::fixup::apply_fixups;
use crate::record::{MftAccess, MftRecord};
use crate::types::{AttributeType, I30, INDEX_FLAG_LARGE, INDX_MAGIC};
use crate::utils::bytes::{self, slice_at, u32_at, u8_at};
use crate::utils::sector;
use entry::IndexEntries;
use log::{trace, warn};

/// Offset of the index header within the root value
const ROOT_HEADER: usize = 0x10;
/// Offset of the index header within an INDX block
const BLOCK_HEADER: usize = 0x18;

/// Node header fields
struct NodeHeader {
    entries_offset: usize,
    index_length: usize,
    flags: u8,
}

impl NodeHeader {
    fn parse(header: &[u8]) -> Result<Self> {
        let corrupt = || NtfsError::CorruptVolume;
        Ok(Self {
            entries_offset: u32_at(header, 0x00).ok_or_else(corrupt)? as usize,
            index_length: u32_at(header, 0x04).ok_or_else(corrupt)? as usize,
            flags: u8_at(header, 0x0C).ok_or_else(corrupt)?,
        })
    }

    /// Entry area, bounded by the declared index length
    fn entries<'a>(&self, header: &'a [u8]) -> Result<&'a [u8]> {
        if self.entries_offset > self.index_length {
            warn!("ntfs: index entries start past the node end");
            return Err(NtfsError::CorruptVolume);
        }
        header.get(self.entries_offset..self.index_length).ok_or_else(|| {
            warn!("ntfs: index length {:#x} overruns its node", self.index_length);
            NtfsError::CorruptVolume
        })
    }
}

/// Scan one node for `name`
fn scan_node(entries: &[u8], name: &[u16]) -> Result<Option<u64>> {
    for entry in IndexEntries::new(entries) {
        let entry = entry?;
        if entry.matches(name) {
            return Ok(Some(entry.record_number()));
        }
    }
    Ok(None)
}

/// Find `name` in a directory's filename index
///
/// Returns the record number of the first matching entry.
///
/// # Errors
/// * `CorruptVolume` - The index is missing or malformed
/// * `FixupMismatch` - An index block failed its fixups
/// * `IoError` - An index block could not be read
pub fn lookup<M: MftAccess + ?Sized>(
    mft: &mut M,
    dir: &MftRecord,
    name: &[u16],
) -> Result<Option<u64>> {
    // I. Resident root
    let Some(root) = find_attribute(mft, dir, AttributeType::IndexRoot, &I30)? else {
        warn!("ntfs: directory {} has no $I30 root", dir.index());
        return Err(NtfsError::CorruptVolume);
    };
    let value = root.resident_value().ok_or_else(|| {
        warn!("ntfs: directory {} has a non-resident index root", dir.index());
        NtfsError::CorruptVolume
    })?;
    let block_size = u32_at(value, 0x08).ok_or(NtfsError::CorruptVolume)? as usize;
    let header = value.get(ROOT_HEADER..).ok_or(NtfsError::CorruptVolume)?;
    let root_header = NodeHeader::parse(header)?;

    if let Some(found) = scan_node(root_header.entries(header)?, name)? {
        return Ok(Some(found));
    }
    if root_header.flags & INDEX_FLAG_LARGE == 0 {
        return Ok(None);
    }

    // II. Allocation blocks
    let Some(mut bitmap) = find_attribute(mft, dir, AttributeType::Bitmap, &I30)? else {
        warn!("ntfs: large directory {} has no $I30 bitmap", dir.index());
        return Err(NtfsError::CorruptVolume);
    };
    let Some(mut allocation) =
        find_attribute(mft, dir, AttributeType::IndexAllocation, &I30)?
    else {
        warn!("ntfs: large directory {} has no $I30 allocation", dir.index());
        return Err(NtfsError::CorruptVolume);
    };

    let bytes_per_sector = mft.params().bytes_per_sector;
    if block_size == 0 || !sector::is_sector_aligned(block_size, bytes_per_sector) {
        warn!("ntfs: directory {} declares index blocks of {:#x} bytes", dir.index(), block_size);
        return Err(NtfsError::CorruptVolume);
    }

    let bits = read_value(mft, &mut bitmap)?;
    let mut block = bytes::zeroed(block_size)?;
    let end = allocation.data_size();

    for (vbn, offset) in (0..end).step_by(block_size).enumerate() {
        let byte = *bits.get(vbn / 8).ok_or_else(|| {
            warn!("ntfs: directory {} bitmap too short for block {}", dir.index(), vbn);
            NtfsError::CorruptVolume
        })?;
        if byte & (1 << (vbn % 8)) == 0 {
            trace!("ntfs: directory {} skipping free block {}", dir.index(), vbn);
            continue;
        }

        mft.read_attribute_exact(&mut allocation, offset, &mut block)?;
        if slice_at(&block, 0, 4) != Some(&INDX_MAGIC[..]) {
            warn!("ntfs: directory {} block {} has no INDX magic", dir.index(), vbn);
            return Err(NtfsError::CorruptVolume);
        }
        apply_fixups(&mut block, bytes_per_sector)?;

        let header = &block[BLOCK_HEADER..];
        let node = NodeHeader::parse(header)?;
        if let Some(found) = scan_node(node.entries(header)?, name)? {
            trace!("ntfs: directory {} match in block {}", dir.index(), vbn);
            return Ok(Some(found));
        }
    }

    Ok(None)
}
