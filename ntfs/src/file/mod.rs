//! Open file state
//!
//! A [`FileHandle`] owns the context of the file's unnamed data stream and
//! a read position. Handles are independent: each keeps its own run cache.
//! Dropping a handle (or passing it to `Volume::close`) releases the context.

use crate::attribute::AttrContext;
use crate::error::{NtfsError, Result};

/// Requested access for an open
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenMode {
    /// Read access
    ReadOnly,
    /// Write access (never granted)
    WriteOnly,
    /// Read and write access (never granted)
    ReadWrite,
}

/// Seek origin
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeekMode {
    /// From the start of the file
    Absolute,
    /// From the current position (not supported)
    Relative,
}

/// File status as returned by `Volume::stat`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileInfo {
    /// Size of the data stream in bytes
    pub total_size: u64,
    /// Current read position
    pub current_offset: u64,
    /// MFT record number of the file
    pub record: u64,
}

/// An open file
#[derive(Debug)]
pub struct FileHandle {
    data: AttrContext,
    offset: u64,
    record: u64,
}

impl FileHandle {
    /// Wrap a data stream positioned at its start
    pub fn new(data: AttrContext, record: u64) -> Self {
        Self {
            data,
            offset: 0,
            record,
        }
    }

    /// Size of the data stream
    pub fn size(&self) -> u64 {
        self.data.data_size()
    }

    /// Current read position
    pub fn position(&self) -> u64 {
        self.offset
    }

    /// MFT record number of the file
    pub fn record(&self) -> u64 {
        self.record
    }

    /// Data stream context
    pub fn data_mut(&mut self) -> &mut AttrContext {
        &mut self.data
    }

    /// Move the position forward by `count` bytes read
    pub fn advance(&mut self, count: usize) {
        self.offset += count as u64;
    }

    /// Reposition the handle
    ///
    /// Only absolute targets within 32 bits and not past the end are valid.
    /// Seeking to exactly the end is allowed.
    pub fn seek(&mut self, offset: u64, mode: SeekMode) -> Result<()> {
        if mode != SeekMode::Absolute || offset > u32::MAX as u64 || offset > self.size() {
            return Err(NtfsError::InvalidArgument);
        }
        self.offset = offset;
        Ok(())
    }

    /// Size and position snapshot
    pub fn info(&self) -> FileInfo {
        FileInfo {
            total_size: self.size(),
            current_offset: self.offset,
            record: self.record,
        }
    }
}
