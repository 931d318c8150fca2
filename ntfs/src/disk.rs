//! Sector-level access to the volume
//!
//! All disk traffic goes through [`SectorReader`], which turns byte ranges
//! relative to cluster zero into whole-sector `read_blocks` calls. Reads are
//! staged in a scratch buffer of [`BURST_SECTORS`] sectors so that a failed
//! read never leaves partial sector data in the caller's buffer.

use crate::error::{NtfsError, Result};
use crate::types::BURST_SECTORS;
use crate::utils::sector;
use alloc::vec::Vec;
use gpt_disk_io::BlockIo;
use gpt_disk_types::Lba;
use log::{trace, warn};

/// Byte-granular reads relative to cluster zero
///
/// Attribute contexts read through this trait so they do not depend on the
/// block device type.
pub trait VolumeRead {
    /// Bytes per cluster
    fn cluster_size(&self) -> u64;

    /// Fill as much of `buf` as possible from byte `offset`
    ///
    /// Returns the number of leading bytes filled and the error that stopped
    /// the read, if any.
    fn read_partial(&mut self, offset: u64, buf: &mut [u8]) -> (usize, Result<()>);
}

/// Byte-addressed reader over a block device
pub struct SectorReader<B: BlockIo> {
    block_io: B,
    drive_id: u8,
    start_sector: u64,
    sector_count: u64,
    bytes_per_sector: usize,
    cluster_size: u64,
    scratch: Vec<u8>,
}

impl<B: BlockIo> SectorReader<B> {
    /// Create a reader for a volume starting at `start_sector`
    ///
    /// `sector_count` bounds all reads; zero means unbounded.
    pub fn new(
        block_io: B,
        drive_id: u8,
        start_sector: u64,
        sector_count: u64,
        bytes_per_sector: usize,
        cluster_size: u64,
    ) -> Result<Self> {
        if bytes_per_sector == 0 || cluster_size == 0 {
            return Err(NtfsError::CorruptVolume);
        }
        let mut scratch = Vec::new();
        scratch
            .try_reserve_exact(BURST_SECTORS * bytes_per_sector)
            .map_err(|_| NtfsError::OutOfMemory)?;
        scratch.resize(BURST_SECTORS * bytes_per_sector, 0);

        Ok(Self {
            block_io,
            drive_id,
            start_sector,
            sector_count,
            bytes_per_sector,
            cluster_size,
            scratch,
        })
    }

    /// Bytes per sector
    pub fn bytes_per_sector(&self) -> usize {
        self.bytes_per_sector
    }

    /// Bytes per cluster
    pub fn cluster_size(&self) -> u64 {
        self.cluster_size
    }

    /// Underlying block device
    pub fn block_io(&self) -> &B {
        &self.block_io
    }

    /// Mutable access to the underlying block device
    pub fn block_io_mut(&mut self) -> &mut B {
        &mut self.block_io
    }

    /// Give the block device back
    pub fn into_inner(self) -> B {
        self.block_io
    }

    /// Read `count` sectors at `sector` (volume relative) into the scratch buffer
    fn read_sectors(&mut self, sector: u64, count: usize) -> Result<()> {
        debug_assert!(count > 0 && count <= BURST_SECTORS);

        if self.sector_count != 0 {
            let end = sector.checked_add(count as u64).ok_or(NtfsError::IoError)?;
            if end > self.sector_count {
                warn!(
                    "ntfs: drive {:#x} read of sectors {}..{} beyond volume end {}",
                    self.drive_id, sector, end, self.sector_count
                );
                return Err(NtfsError::IoError);
            }
        }

        let lba = self
            .start_sector
            .checked_add(sector)
            .ok_or(NtfsError::IoError)?;
        let len = count * self.bytes_per_sector;
        self.block_io
            .read_blocks(Lba(lba), &mut self.scratch[..len])
            .map_err(|_| {
                warn!(
                    "ntfs: drive {:#x} failed to read {} sectors at lba {}",
                    self.drive_id, count, lba
                );
                NtfsError::IoError
            })
    }

    /// Read `buf.len()` bytes starting at byte `offset` from cluster zero
    pub fn read_bytes(&mut self, offset: u64, buf: &mut [u8]) -> Result<()> {
        self.read_partial(offset, buf).1
    }

    /// Read as much of `buf` as the device delivers
    ///
    /// Returns how many leading bytes of `buf` hold volume data, plus the
    /// error that stopped the read, if any. An unaligned head and tail each
    /// cost one single-sector read; the aligned middle is read in bursts.
    /// Bytes past the returned count are left untouched.
    pub fn read_partial(&mut self, offset: u64, buf: &mut [u8]) -> (usize, Result<()>) {
        let bps = self.bytes_per_sector;
        let mut offset = offset;
        let mut done = 0usize;

        trace!("ntfs: disk read offset {:#x} length {:#x}", offset, buf.len());

        // I. Partial first sector
        let head = sector::offset_in_sector(offset, bps);
        if head != 0 && !buf.is_empty() {
            if let Err(e) = self.read_sectors(sector::byte_to_sector(offset, bps), 1) {
                return (done, Err(e));
            }
            let len = (bps - head).min(buf.len());
            buf[..len].copy_from_slice(&self.scratch[head..head + len]);
            done += len;
            offset += len as u64;
        }

        // II. Whole sectors, up to a burst at a time
        while buf.len() - done >= bps {
            let count = ((buf.len() - done) / bps).min(BURST_SECTORS);
            let len = count * bps;
            if let Err(e) = self.read_sectors(sector::byte_to_sector(offset, bps), count) {
                return (done, Err(e));
            }
            buf[done..done + len].copy_from_slice(&self.scratch[..len]);
            done += len;
            offset += len as u64;
        }

        // III. Partial last sector
        if done < buf.len() {
            if let Err(e) = self.read_sectors(sector::byte_to_sector(offset, bps), 1) {
                return (done, Err(e));
            }
            let len = buf.len() - done;
            buf[done..].copy_from_slice(&self.scratch[..len]);
            done += len;
        }

        (done, Ok(()))
    }
}

impl<B: BlockIo> VolumeRead for SectorReader<B> {
    fn cluster_size(&self) -> u64 {
        self.cluster_size
    }

    fn read_partial(&mut self, offset: u64, buf: &mut [u8]) -> (usize, Result<()>) {
        SectorReader::read_partial(self, offset, buf)
    }
}
