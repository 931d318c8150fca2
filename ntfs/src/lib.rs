//! NTFS Read-Only Metadata Engine
//!
//! A `no_std` NTFS reader for boot loaders: just enough of the on-disk
//! format to find a kernel or configuration file by path and stream it.
//!
//! # Overview
//!
//! This crate provides:
//! - Boot sector parsing (sector, cluster and record geometry)
//! - MFT record loading with update sequence (fixup) validation
//! - Resident and non-resident attributes, including sparse runs
//! - Attribute list indirection (one level)
//! - `$I30` directory index lookup across the root and INDX blocks
//! - Read-only file handles with read, seek and stat
//!
//! Writing, compressed and encrypted data are not supported.
//!
//! # Architecture
//!
//! The implementation is layered:
//! 1. **Disk layer** - Sector reads over a `BlockIo` device, in bursts
//! 2. **Record layer** - MFT records, fixups and attribute records
//! 3. **Attribute layer** - Run lists, attribute contexts, attribute lists
//! 4. **Index layer** - Filename lookup in directory indexes
//! 5. **Volume layer** - Mount, path resolution and open files
//!
//! # Usage
//!
//! ```ignore
//! use ntfs::{OpenMode, Volume};
//!
//! // Mount the partition starting at sector 2048
//! let mut volume = Volume::mount(block_io, 0x80, 2048, 0)?;
//!
//! // Stream a file
//! let mut file = volume.open("/boot/vmlinuz", OpenMode::ReadOnly)?;
//! let mut chunk = [0u8; 4096];
//! while volume.read(&mut file, &mut chunk)? != 0 {
//!     // ...
//! }
//! volume.close(file);
//! ```
//!
//! # Logging
//!
//! Diagnostics go through the `log` facade; the host installs the logger.
//! The `trace` feature also logs every directory entry compared during a
//! lookup.

#![no_std]
#![warn(missing_docs)]

extern crate alloc;

pub mod attribute;
pub mod disk;
pub mod error;
pub mod file;
pub mod index;
pub mod path;
pub mod record;
pub mod types;
pub mod utils;
pub mod volume;

pub use attribute::runlist::DataRun;
pub use attribute::AttrContext;
pub use error::{NtfsError, Result};
pub use file::{FileHandle, FileInfo, OpenMode, SeekMode};
pub use record::{MftAccess, MftRecord};
pub use volume::boot::BootParameters;

// High-level API exports
pub use volume::{probe, Volume};
