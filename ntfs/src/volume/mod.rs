//! Volume mounting and file access
//!
//! Mounting reads the boot sector, then bootstraps the MFT: record 0 is read
//! straight from disk (no attribute context exists yet), its unnamed
//! `$DATA` run list becomes the context for every later record read.
//! Everything else goes through [`Volume`].

pub mod boot;

use crate::attribute::{find_attribute, find_local_attribute, AttrContext};
use crate::disk::SectorReader;
use crate::error::{NtfsError, Result};
use crate::file::{FileHandle, FileInfo, OpenMode, SeekMode};
use crate::path;
use crate::record::{MftAccess, MftRecord};
use crate::types::AttributeType;
use crate::utils::{bytes, sector};
use alloc::vec::Vec;
use boot::{BootParameters, BOOT_SECTOR_SIZE};
use gpt_disk_io::BlockIo;
use gpt_disk_types::Lba;
use log::{debug, warn};

/// Read the first volume sector(s), rounded up to whole device blocks
fn read_boot_sector<B: BlockIo>(block_io: &mut B, start_sector: u64) -> Result<Vec<u8>> {
    let block_size = block_io.block_size().to_u64() as usize;
    let len = sector::sectors_for_bytes(BOOT_SECTOR_SIZE, block_size) * block_size;
    let mut buffer = bytes::zeroed(len)?;
    block_io
        .read_blocks(Lba(start_sector), &mut buffer)
        .map_err(|_| NtfsError::IoError)?;
    Ok(buffer)
}

/// Check whether the volume at `start_sector` looks like NTFS
///
/// Only the boot sector signature is inspected.
pub fn probe<B: BlockIo>(block_io: &mut B, start_sector: u64) -> Result<bool> {
    let sector = read_boot_sector(block_io, start_sector)?;
    Ok(boot::has_signature(&sector))
}

/// A mounted NTFS volume
pub struct Volume<B: BlockIo> {
    disk: SectorReader<B>,
    params: BootParameters,
    mft: AttrContext,
}

impl<B: BlockIo> Volume<B> {
    /// Mount the volume at `start_sector` of `block_io`
    ///
    /// # Arguments
    /// * `block_io` - Device holding the volume
    /// * `drive_id` - Opaque drive tag kept for diagnostics
    /// * `start_sector` - First sector of the volume on the device
    /// * `sector_count` - Sectors in the volume, or 0 if unknown
    ///
    /// # Errors
    /// * `InvalidSignature` - Not an NTFS boot sector
    /// * `CorruptVolume` - Bad geometry or an unusable `$MFT` record
    /// * `IoError` - The boot sector or `$MFT` could not be read
    pub fn mount(
        mut block_io: B,
        drive_id: u8,
        start_sector: u64,
        sector_count: u64,
    ) -> Result<Self> {
        let sector = read_boot_sector(&mut block_io, start_sector)?;
        let params = BootParameters::parse(&sector, drive_id, start_sector)?;

        let device_block = block_io.block_size().to_u64();
        if device_block != params.bytes_per_sector as u64 {
            warn!(
                "ntfs: drive {:#x} block size {} does not match {} bytes per sector",
                drive_id, device_block, params.bytes_per_sector
            );
            return Err(NtfsError::CorruptVolume);
        }

        debug!(
            "ntfs: drive {:#x} sector {}: {} B/sector, {} B/cluster, {} B/record, \
             {} B/index, mft at lcn {}",
            drive_id,
            start_sector,
            params.bytes_per_sector,
            params.cluster_size,
            params.mft_record_size,
            params.index_record_size,
            params.mft_lcn
        );

        let mut disk = SectorReader::new(
            block_io,
            drive_id,
            start_sector,
            sector_count,
            params.bytes_per_sector,
            params.cluster_size,
        )?;

        // I. $MFT record straight from disk
        let mut raw = bytes::zeroed(params.mft_record_size)?;
        disk.read_bytes(params.mft_offset()?, &mut raw)?;
        let mft_record = MftRecord::from_bytes(0, raw, params.bytes_per_sector)?;

        // II. Its data run list, enough to reach any extension records
        let Some(bootstrap) = find_local_attribute(&mft_record, AttributeType::Data, &[])? else {
            warn!("ntfs: $MFT has no data attribute");
            return Err(NtfsError::CorruptVolume);
        };

        let mut volume = Self {
            disk,
            params,
            mft: bootstrap,
        };

        // III. Full resolution, following an attribute list if present
        let Some(mft) = find_attribute(&mut volume, &mft_record, AttributeType::Data, &[])? else {
            return Err(NtfsError::CorruptVolume);
        };
        debug!("ntfs: $MFT data is {} bytes", mft.data_size());
        volume.mft = mft;

        Ok(volume)
    }

    /// Geometry of the mounted volume
    pub fn params(&self) -> &BootParameters {
        &self.params
    }

    /// Underlying block device
    pub fn block_io(&self) -> &B {
        self.disk.block_io()
    }

    /// Mutable access to the underlying block device
    pub fn block_io_mut(&mut self) -> &mut B {
        self.disk.block_io_mut()
    }

    /// Unmount and give the block device back
    pub fn into_inner(self) -> B {
        self.disk.into_inner()
    }

    /// Load MFT record `index`
    ///
    /// # Errors
    /// * `CorruptVolume` - Record past the end of the MFT, or malformed
    /// * `FixupMismatch` - The record failed its fixups
    /// * `IoError` - The record could not be read
    pub fn read_mft_record(&mut self, index: u64) -> Result<MftRecord> {
        let size = self.params.mft_record_size;
        let offset = index
            .checked_mul(size as u64)
            .ok_or(NtfsError::CorruptVolume)?;
        if offset >= self.mft.data_size() {
            warn!("ntfs: record {} lies past the end of the MFT", index);
            return Err(NtfsError::CorruptVolume);
        }
        let mut raw = bytes::zeroed(size)?;
        self.mft.read_exact(&mut self.disk, offset, &mut raw)?;
        MftRecord::from_bytes(index, raw, self.params.bytes_per_sector)
    }

    /// Resolve `path` to its MFT record
    pub fn lookup(&mut self, path: &str) -> Result<MftRecord> {
        path::resolve_record(self, path)
    }

    /// Open the unnamed data stream of the file at `path`
    ///
    /// # Errors
    /// * `AccessDenied` - Any mode other than `ReadOnly`
    /// * `PathNotFound` - The path does not name a file
    /// * `NoDataAttribute` - The file has no unnamed data stream
    /// * `UnsupportedAttribute` - The stream is compressed or encrypted
    pub fn open(&mut self, path: &str, mode: OpenMode) -> Result<FileHandle> {
        if mode != OpenMode::ReadOnly {
            return Err(NtfsError::AccessDenied);
        }
        let resolved = path::resolve(self, path)?;
        debug!(
            "ntfs: opened {} as record {} ({} bytes)",
            path,
            resolved.record.index(),
            resolved.data.data_size()
        );
        Ok(FileHandle::new(resolved.data, resolved.record.index()))
    }

    /// Read from the handle's position and advance it
    ///
    /// Returns 0 at end of file. A disk failure after some bytes were read
    /// yields the short count; a failure before any byte is `IoError`.
    pub fn read(&mut self, handle: &mut FileHandle, buf: &mut [u8]) -> Result<usize> {
        let position = handle.position();
        let count = handle.data_mut().read(&mut self.disk, position, buf)?;
        handle.advance(count);
        Ok(count)
    }

    /// Reposition a handle
    ///
    /// # Errors
    /// * `InvalidArgument` - Relative seeks, targets above 4 GiB or past
    ///   the end of the file
    pub fn seek(&self, handle: &mut FileHandle, offset: u64, mode: SeekMode) -> Result<()> {
        handle.seek(offset, mode)
    }

    /// Size and position of a handle
    pub fn stat(&self, handle: &FileHandle) -> FileInfo {
        handle.info()
    }

    /// Close a handle, releasing its data context
    pub fn close(&mut self, handle: FileHandle) {
        drop(handle);
    }

    /// Read a whole file into memory
    pub fn read_file(&mut self, path: &str) -> Result<Vec<u8>> {
        let mut handle = self.open(path, OpenMode::ReadOnly)?;
        let size = usize::try_from(handle.size()).map_err(|_| NtfsError::OutOfMemory)?;
        let mut data = bytes::zeroed(size)?;
        let mut filled = 0;
        while filled < size {
            match self.read(&mut handle, &mut data[filled..])? {
                0 => break,
                n => filled += n,
            }
        }
        if filled != size {
            warn!("ntfs: {} is shorter on disk than its size", path);
            return Err(NtfsError::IoError);
        }
        self.close(handle);
        Ok(data)
    }
}

impl<B: BlockIo> MftAccess for Volume<B> {
    fn params(&self) -> &BootParameters {
        &self.params
    }

    fn read_mft_record(&mut self, index: u64) -> Result<MftRecord> {
        Volume::read_mft_record(self, index)
    }

    fn read_attribute_exact(
        &mut self,
        ctx: &mut AttrContext,
        offset: u64,
        buf: &mut [u8],
    ) -> Result<()> {
        ctx.read_exact(&mut self.disk, offset, buf)
    }
}
