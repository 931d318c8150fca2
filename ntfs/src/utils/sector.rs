//! Sector alignment and calculation utilities
//!
//! NTFS sector sizes vary per volume, so every helper takes the size
//! explicitly instead of relying on a crate constant.

/// Convert byte offset to sector number
pub fn byte_to_sector(byte_offset: u64, sector_size: usize) -> u64 {
    byte_offset / sector_size as u64
}

/// Offset of a byte within its sector
pub fn offset_in_sector(byte_offset: u64, sector_size: usize) -> usize {
    (byte_offset % sector_size as u64) as usize
}

/// Calculate number of sectors needed for byte count
pub fn sectors_for_bytes(byte_count: usize, sector_size: usize) -> usize {
    byte_count.div_ceil(sector_size)
}

/// Check if value is a whole multiple of the sector size
pub fn is_sector_aligned(value: usize, sector_size: usize) -> bool {
    value % sector_size == 0
}
