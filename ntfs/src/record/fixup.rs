//! Update sequence array handling
//!
//! Multi-sector records (MFT file records, index blocks) overwrite the last
//! two bytes of every sector with the update sequence number. The original
//! bytes live in the update sequence array; they are put back only after
//! every sector tail has been checked.

use crate::error::{NtfsError, Result};
use crate::utils::bytes::u16_at;
use log::warn;

/// Offset of the update sequence array offset field
const USA_OFFSET_FIELD: usize = 0x04;
/// Offset of the update sequence array count field
const USA_COUNT_FIELD: usize = 0x06;

/// Validate and undo the fixups of a multi-sector record in place
///
/// # Arguments
/// * `record` - Whole record buffer (a multiple of the sector size)
/// * `bytes_per_sector` - Sector stride of the fixups
///
/// # Errors
/// * `CorruptVolume` - Array header lies outside the record
/// * `FixupMismatch` - A sector tail does not hold the sequence number
pub fn apply_fixups(record: &mut [u8], bytes_per_sector: usize) -> Result<()> {
    let usa_offset = u16_at(record, USA_OFFSET_FIELD).ok_or(NtfsError::CorruptVolume)? as usize;
    let usa_count = u16_at(record, USA_COUNT_FIELD).ok_or(NtfsError::CorruptVolume)? as usize;

    // The first entry is the sequence number itself.
    let sectors = usa_count.checked_sub(1).ok_or(NtfsError::CorruptVolume)?;
    if bytes_per_sector < 2
        || usa_offset + usa_count * 2 > record.len()
        || sectors * bytes_per_sector > record.len()
    {
        return Err(NtfsError::CorruptVolume);
    }

    let usn = u16_at(record, usa_offset).ok_or(NtfsError::CorruptVolume)?;

    for i in 1..=sectors {
        let tail = i * bytes_per_sector - 2;
        if u16_at(record, tail) != Some(usn) {
            warn!("ntfs: fixup mismatch in sector {} (usn {:#06x})", i - 1, usn);
            return Err(NtfsError::FixupMismatch);
        }
    }

    for i in 1..=sectors {
        let tail = i * bytes_per_sector - 2;
        let saved = usa_offset + i * 2;
        record.copy_within(saved..saved + 2, tail);
    }

    Ok(())
}
