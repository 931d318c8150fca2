//! Attribute lookup within a file record
//!
//! Attributes are matched on type code and exact name. A record carrying an
//! `$ATTRIBUTE_LIST` may keep the wanted attribute in an extension record;
//! the list is followed one level deep. A list found inside an extension
//! record is treated as corruption instead of being followed further.

use super::list::ListEntries;
use super::{read_value, AttrContext};
use crate::error::{NtfsError, Result};
use crate::record::{MftAccess, MftRecord};
use crate::types::{AttributeType, MAX_ATTRIBUTE_LIST_DEPTH};
use log::{trace, warn};

/// Find an attribute in `record` without following attribute lists
///
/// Used while the MFT itself is being bootstrapped, before record reads
/// are possible.
pub fn find_local_attribute(
    record: &MftRecord,
    ty: AttributeType,
    name: &[u16],
) -> Result<Option<AttrContext>> {
    for attr in record.attributes() {
        let attr = attr?;
        if attr.is_type(ty) && attr.name_matches(name) {
            return AttrContext::new(&attr).map(Some);
        }
    }
    Ok(None)
}

/// Find an attribute by type and name
///
/// Returns `Ok(None)` only when the search completed over well-formed
/// structures.
///
/// # Errors
/// * `CorruptVolume` - Malformed records, lists, or a nested attribute list
/// * `FixupMismatch` - A referenced extension record failed its fixups
/// * `IoError` - The attribute list or an extension record could not be read
pub fn find_attribute<M: MftAccess + ?Sized>(
    mft: &mut M,
    record: &MftRecord,
    ty: AttributeType,
    name: &[u16],
) -> Result<Option<AttrContext>> {
    search(mft, record, ty, name, 0)
}

fn search<M: MftAccess + ?Sized>(
    mft: &mut M,
    record: &MftRecord,
    ty: AttributeType,
    name: &[u16],
    depth: usize,
) -> Result<Option<AttrContext>> {
    for attr in record.attributes() {
        let attr = attr?;

        if attr.is_type(AttributeType::AttributeList) && ty != AttributeType::AttributeList {
            if depth >= MAX_ATTRIBUTE_LIST_DEPTH {
                warn!("ntfs: nested attribute list in record {}", record.index());
                return Err(NtfsError::CorruptVolume);
            }
            let mut list = AttrContext::new(&attr)?;
            if let Some(found) = search_list(mft, record, &mut list, ty, name, depth)? {
                return Ok(Some(found));
            }
            continue;
        }

        if attr.is_type(ty) && attr.name_matches(name) {
            return AttrContext::new(&attr).map(Some);
        }
    }
    Ok(None)
}

/// Follow the entries of an attribute list into extension records
fn search_list<M: MftAccess + ?Sized>(
    mft: &mut M,
    base: &MftRecord,
    list: &mut AttrContext,
    ty: AttributeType,
    name: &[u16],
    depth: usize,
) -> Result<Option<AttrContext>> {
    let value = read_value(mft, list)?;

    for entry in ListEntries::new(&value) {
        let entry = entry?;
        // Only the first fragment starts a context; later fragments hold
        // runs past its end.
        if entry.type_code != ty.code() || entry.starting_vcn != 0 || !entry.name_matches(name) {
            continue;
        }
        // Attributes held by the base record are found by the direct scan.
        if entry.record_number() == base.index() {
            continue;
        }
        trace!(
            "ntfs: attribute {:#x} of record {} lives in record {}",
            entry.type_code,
            base.index(),
            entry.record_number()
        );
        let extension = mft.read_mft_record(entry.record_number())?;
        if let Some(found) = search(mft, &extension, ty, name, depth + 1)? {
            return Ok(Some(found));
        }
    }
    Ok(None)
}
