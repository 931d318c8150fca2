//! Data run decoding for non-resident attributes
//!
//! The mapping pairs of a non-resident attribute are a sequence of packed
//! entries:
//! - Header byte: `(offset_bytes << 4) | length_bytes`
//! - `length_bytes` unsigned LE bytes: cluster count
//! - `offset_bytes` signed LE bytes: LCN delta from the previous run, sign
//!   taken from the last encoded byte. Zero bytes mark a sparse run.
//!
//! A `0x00` header (or a header with no length bytes) ends the list.

use crate::error::{NtfsError, Result};
use crate::utils::bytes::{int_le, slice_at, uint_le};
use log::warn;

/// One packed entry as encoded on disk
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunEntry {
    /// LCN delta from the previous run; `None` for a sparse run
    pub lcn_delta: Option<i64>,
    /// Run length in clusters
    pub length: u64,
}

/// A decoded data run: a contiguous range of clusters on disk
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DataRun {
    /// First logical cluster; `None` means a sparse (zeroed) run
    pub start_cluster: Option<u64>,
    /// Number of clusters in this run
    pub length: u64,
}

/// Decode the entry whose header byte is at `pos`
///
/// Returns the entry and the position of the next header, or `None` at the
/// end of the list. Any field reaching past `pairs` is `CorruptRunList`.
pub fn decode_run(pairs: &[u8], pos: usize) -> Result<Option<(RunEntry, usize)>> {
    let header = *pairs.get(pos).ok_or_else(|| {
        warn!("ntfs: run list ends without terminator at {:#x}", pos);
        NtfsError::CorruptRunList
    })?;

    let length_bytes = (header & 0x0F) as usize;
    let offset_bytes = (header >> 4) as usize;
    if header == 0 || length_bytes == 0 {
        return Ok(None);
    }
    if length_bytes > 8 || offset_bytes > 8 {
        return Err(NtfsError::CorruptRunList);
    }

    let mut cursor = pos + 1;
    let length = uint_le(slice_at(pairs, cursor, length_bytes).ok_or(NtfsError::CorruptRunList)?);
    cursor += length_bytes;
    if length == 0 {
        return Err(NtfsError::CorruptRunList);
    }

    let lcn_delta = if offset_bytes == 0 {
        None
    } else {
        let delta = int_le(slice_at(pairs, cursor, offset_bytes).ok_or(NtfsError::CorruptRunList)?);
        cursor += offset_bytes;
        Some(delta)
    };

    Ok(Some((RunEntry { lcn_delta, length }, cursor)))
}

/// Resumable position in a run list
///
/// Holds no borrow so it can be cached next to the bytes it walks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RunCursor {
    pos: usize,
    last_lcn: i64,
}

impl RunCursor {
    /// Cursor at the first entry
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode the next run and resolve its absolute start cluster
    pub fn next_run(&mut self, pairs: &[u8]) -> Result<Option<DataRun>> {
        let Some((entry, next)) = decode_run(pairs, self.pos)? else {
            return Ok(None);
        };

        let start_cluster = match entry.lcn_delta {
            None => None,
            Some(delta) => {
                let lcn = self.last_lcn.checked_add(delta).ok_or(NtfsError::CorruptRunList)?;
                if lcn < 0 {
                    warn!("ntfs: run starts before cluster zero ({})", lcn);
                    return Err(NtfsError::CorruptRunList);
                }
                self.last_lcn = lcn;
                Some(lcn as u64)
            }
        };

        self.pos = next;
        Ok(Some(DataRun {
            start_cluster,
            length: entry.length,
        }))
    }
}

/// Iterator over the runs of a mapping pairs stream
pub struct RunList<'a> {
    pairs: &'a [u8],
    cursor: RunCursor,
    done: bool,
}

impl<'a> RunList<'a> {
    /// Start decoding `pairs` from the beginning
    pub fn new(pairs: &'a [u8]) -> Self {
        Self {
            pairs,
            cursor: RunCursor::new(),
            done: false,
        }
    }
}

impl Iterator for RunList<'_> {
    type Item = Result<DataRun>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.cursor.next_run(self.pairs) {
            Ok(Some(run)) => Some(Ok(run)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}
