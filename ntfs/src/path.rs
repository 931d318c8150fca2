//! Path resolution
//!
//! Paths are walked from the root directory one component at a time; every
//! intermediate record must be a directory and every component must match
//! exactly one index entry.

use crate::attribute::{find_attribute, AttrContext};
use crate::error::{NtfsError, Result};
use crate::index;
use crate::record::{MftAccess, MftRecord};
use crate::types::{AttributeType, MAX_PATH_COMPONENTS, ROOT_RECORD};
use crate::utils::string::Utf16Name;
use log::{debug, warn};

/// Split a path on `/` and `\`, skipping empty components
pub fn components(path: &str) -> impl Iterator<Item = &str> {
    path.split(['/', '\\']).filter(|c| !c.is_empty())
}

/// A resolved file: its record and its unnamed data stream
#[derive(Debug)]
pub struct ResolvedFile {
    /// Target file record
    pub record: MftRecord,
    /// Context on the unnamed `$DATA` attribute
    pub data: AttrContext,
}

/// Walk `path` from the root directory to a record
///
/// # Errors
/// * `PathNotFound` - A component is missing, too long, or walks through a
///   non-directory; or the path has too many components
/// * `CorruptVolume` - An entry references an unused record
pub fn resolve_record<M: MftAccess + ?Sized>(mft: &mut M, path: &str) -> Result<MftRecord> {
    if components(path).count() > MAX_PATH_COMPONENTS {
        return Err(NtfsError::PathNotFound);
    }

    let mut current = mft.read_mft_record(ROOT_RECORD)?;
    for component in components(path) {
        let name = Utf16Name::encode(component).ok_or(NtfsError::PathNotFound)?;
        if !current.is_directory() {
            debug!("ntfs: record {} is not a directory", current.index());
            return Err(NtfsError::PathNotFound);
        }

        let Some(next) = index::lookup(mft, &current, name.as_units())? else {
            debug!("ntfs: {:?} not found in directory {}", name, current.index());
            return Err(NtfsError::PathNotFound);
        };
        debug!("ntfs: {:?} -> record {}", name, next);

        let record = mft.read_mft_record(next)?;
        if !record.is_in_use() {
            warn!("ntfs: directory {} references free record {}", current.index(), next);
            return Err(NtfsError::CorruptVolume);
        }
        current = record;
    }
    Ok(current)
}

/// Resolve `path` to its record and unnamed data attribute
///
/// # Errors
/// Everything [`resolve_record`] returns, plus:
/// * `NoDataAttribute` - The target has no unnamed `$DATA` stream
/// * `UnsupportedAttribute` - The stream is compressed or encrypted
pub fn resolve<M: MftAccess + ?Sized>(mft: &mut M, path: &str) -> Result<ResolvedFile> {
    let record = resolve_record(mft, path)?;
    let Some(data) = find_attribute(mft, &record, AttributeType::Data, &[])? else {
        return Err(NtfsError::NoDataAttribute);
    };
    if data.is_compressed_or_encrypted() {
        warn!("ntfs: record {} data is compressed or encrypted", record.index());
        return Err(NtfsError::UnsupportedAttribute);
    }
    Ok(ResolvedFile { record, data })
}
