//! Bounds-checked little-endian field access
//!
//! Every on-disk structure is read through these helpers so that a field
//! lying past the end of its buffer surfaces as `None` instead of a panic.
//! Callers decide which corruption error the miss maps to.

use crate::error::{NtfsError, Result};
use alloc::vec::Vec;

/// Read a byte at `offset`
pub fn u8_at(data: &[u8], offset: usize) -> Option<u8> {
    data.get(offset).copied()
}

/// Read a little-endian `u16` at `offset`
pub fn u16_at(data: &[u8], offset: usize) -> Option<u16> {
    let bytes = data.get(offset..offset.checked_add(2)?)?;
    Some(u16::from_le_bytes([bytes[0], bytes[1]]))
}

/// Read a little-endian `u32` at `offset`
pub fn u32_at(data: &[u8], offset: usize) -> Option<u32> {
    let bytes = data.get(offset..offset.checked_add(4)?)?;
    Some(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
}

/// Read a little-endian `u64` at `offset`
pub fn u64_at(data: &[u8], offset: usize) -> Option<u64> {
    let bytes = data.get(offset..offset.checked_add(8)?)?;
    let mut raw = [0u8; 8];
    raw.copy_from_slice(bytes);
    Some(u64::from_le_bytes(raw))
}

/// Borrow `len` bytes starting at `offset`
pub fn slice_at(data: &[u8], offset: usize, len: usize) -> Option<&[u8]> {
    data.get(offset..offset.checked_add(len)?)
}

/// Read an unsigned little-endian integer of 0..=8 bytes
pub fn uint_le(bytes: &[u8]) -> u64 {
    bytes
        .iter()
        .enumerate()
        .fold(0u64, |acc, (i, &b)| acc | (b as u64) << (i * 8))
}

/// Read a signed little-endian integer of 1..=8 bytes
///
/// The sign comes from the top bit of the last encoded byte.
pub fn int_le(bytes: &[u8]) -> i64 {
    let width = bytes.len();
    if width == 0 {
        return 0;
    }
    let raw = uint_le(bytes) as i64;
    let shift = 64 - 8 * width as u32;
    (raw << shift) >> shift
}

/// Allocate a zero-filled buffer, reporting failure as `OutOfMemory`
pub fn zeroed(len: usize) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    buf.try_reserve_exact(len).map_err(|_| NtfsError::OutOfMemory)?;
    buf.resize(len, 0);
    Ok(buf)
}
