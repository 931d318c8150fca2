//! Directory index entries
//!
//! Every node of a `$I30` index (the root or an INDX block) holds a packed
//! run of entries ending with a sentinel entry flagged as last. An entry's
//! key is a `$FILE_NAME` value.

use crate::error::{NtfsError, Result};
use crate::types::{record_number, Namespace, INDEX_ENTRY_END};
use crate::utils::bytes::{slice_at, u16_at, u64_at, u8_at};
use crate::utils::string::{self, LeName};
use log::warn;

/// Fixed part of an index entry
const ENTRY_HEADER_LEN: usize = 0x10;
/// Key offset of the name length
const KEY_NAME_LENGTH: usize = 0x40;
/// Key offset of the namespace tag
const KEY_NAMESPACE: usize = 0x41;
/// Key offset of the name
const KEY_NAME: usize = 0x42;

/// One non-sentinel entry of an index node
#[derive(Debug, Clone, Copy)]
pub struct IndexEntry<'a> {
    file_reference: u64,
    flags: u16,
    namespace: u8,
    name: &'a [u8],
}

impl IndexEntry<'_> {
    /// Record number of the file the entry names
    pub fn record_number(&self) -> u64 {
        record_number(self.file_reference)
    }

    /// Namespace tag, if known
    pub fn namespace(&self) -> Option<Namespace> {
        Namespace::from_u8(self.namespace)
    }

    /// Compare the entry's name with `target`
    ///
    /// Posix names are case-sensitive; every other namespace folds case.
    pub fn matches(&self, target: &[u16]) -> bool {
        if self.namespace() == Some(Namespace::Posix) {
            string::le_bytes_eq(self.name, target)
        } else {
            string::le_bytes_eq_ignore_case(self.name, target)
        }
    }
}

/// Iterator over the entries of one index node
///
/// Stops at the sentinel. Entries that overrun the node are reported as
/// `CorruptVolume`.
pub struct IndexEntries<'a> {
    data: &'a [u8],
    pos: usize,
    done: bool,
}

impl<'a> IndexEntries<'a> {
    /// Walk the entry area of a node
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            data,
            pos: 0,
            done: false,
        }
    }

    fn corrupt(&mut self, what: &str) -> Option<Result<IndexEntry<'a>>> {
        warn!("ntfs: index entry at {:#x}: {}", self.pos, what);
        self.done = true;
        Some(Err(NtfsError::CorruptVolume))
    }
}

impl<'a> Iterator for IndexEntries<'a> {
    type Item = Result<IndexEntry<'a>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let Some(header) = slice_at(self.data, self.pos, ENTRY_HEADER_LEN) else {
            // A node must end with its sentinel.
            return self.corrupt("node ends without a last entry");
        };

        let length = u16_at(header, 0x08).unwrap_or(0) as usize;
        let key_length = u16_at(header, 0x0A).unwrap_or(0) as usize;
        let flags = u16_at(header, 0x0C).unwrap_or(0);

        if flags & INDEX_ENTRY_END != 0 {
            self.done = true;
            return None;
        }
        if length < ENTRY_HEADER_LEN || key_length > length - ENTRY_HEADER_LEN {
            return self.corrupt("bad length");
        }
        let Some(entry) = slice_at(self.data, self.pos, length) else {
            return self.corrupt("overruns node");
        };

        let key = &entry[ENTRY_HEADER_LEN..ENTRY_HEADER_LEN + key_length];
        let name_length = u8_at(key, KEY_NAME_LENGTH).unwrap_or(0) as usize;
        let (Some(namespace), Some(name)) = (
            u8_at(key, KEY_NAMESPACE),
            slice_at(key, KEY_NAME, name_length * 2),
        ) else {
            return self.corrupt("key too short for its name");
        };

        let parsed = IndexEntry {
            file_reference: u64_at(entry, 0x00).unwrap_or(0),
            flags,
            namespace,
            name,
        };

        #[cfg(feature = "trace")]
        log::trace!("ntfs: index entry {} -> {}", LeName(name), parsed.record_number());

        self.pos += length;
        Some(Ok(parsed))
    }
}

impl core::fmt::Display for IndexEntry<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", LeName(self.name))
    }
}
