//! Boot sector parsing
//!
//! The NTFS boot sector carries a BIOS parameter block describing sector,
//! cluster and record geometry, plus the location of the MFT.

use crate::error::{NtfsError, Result};
use crate::types::NTFS_SIGNATURE;
use crate::utils::bytes::{slice_at, u16_at, u64_at, u8_at};

/// Size of the part of the boot sector that is parsed
pub const BOOT_SECTOR_SIZE: usize = 512;

/// Volume geometry derived from the boot sector
///
/// Immutable for the lifetime of a mount.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BootParameters {
    /// Bytes per sector
    pub bytes_per_sector: usize,

    /// Sectors per cluster
    pub sectors_per_cluster: u32,

    /// Bytes per cluster
    pub cluster_size: u64,

    /// Bytes per MFT file record
    pub mft_record_size: usize,

    /// Bytes per directory index block
    pub index_record_size: usize,

    /// First cluster of the MFT
    pub mft_lcn: u64,

    /// First cluster of the MFT mirror
    pub mft_mirror_lcn: u64,

    /// Sectors in the volume
    pub total_sectors: u64,

    /// Volume serial number
    pub serial_number: u64,

    /// Drive tag given at mount
    pub drive_id: u8,

    /// Absolute sector of cluster zero
    pub sector_of_cluster_zero: u64,
}

/// Check only the OEM signature
pub fn has_signature(sector: &[u8]) -> bool {
    slice_at(sector, 3, NTFS_SIGNATURE.len()) == Some(&NTFS_SIGNATURE[..])
}

/// Decode a clusters-per-record byte
///
/// Positive values count clusters, negative values give the size as a power
/// of two in bytes.
fn record_size(raw: u8, cluster_size: u64) -> Result<usize> {
    let signed = raw as i8;
    let size = if signed > 0 {
        (signed as u64).checked_mul(cluster_size)
    } else if signed < 0 && signed > -32 {
        Some(1u64 << (-(signed as i32)))
    } else {
        None
    };
    size.map(|s| s as usize).ok_or(NtfsError::CorruptVolume)
}

impl BootParameters {
    /// Parse a boot sector
    ///
    /// # Arguments
    /// * `sector` - Raw bytes of the first volume sector
    /// * `drive_id` - Drive tag to record
    /// * `start_sector` - Absolute sector where the volume starts
    pub fn parse(sector: &[u8], drive_id: u8, start_sector: u64) -> Result<Self> {
        if sector.len() < BOOT_SECTOR_SIZE {
            return Err(NtfsError::CorruptVolume);
        }
        if !has_signature(sector) {
            return Err(NtfsError::InvalidSignature);
        }

        let corrupt = || NtfsError::CorruptVolume;

        let bytes_per_sector = u16_at(sector, 0x0B).ok_or_else(corrupt)? as usize;
        if !bytes_per_sector.is_power_of_two() || !(256..=4096).contains(&bytes_per_sector) {
            return Err(NtfsError::CorruptVolume);
        }

        let raw_spc = u8_at(sector, 0x0D).ok_or_else(corrupt)? as u32;
        let sectors_per_cluster = match raw_spc {
            0 => return Err(NtfsError::CorruptVolume),
            1..=0x80 => raw_spc,
            _ => 1u32 << (256 - raw_spc).min(31),
        };
        if !sectors_per_cluster.is_power_of_two() {
            return Err(NtfsError::CorruptVolume);
        }
        let cluster_size = sectors_per_cluster as u64 * bytes_per_sector as u64;

        let mft_record_size =
            record_size(u8_at(sector, 0x40).ok_or_else(corrupt)?, cluster_size)?;
        let index_record_size =
            record_size(u8_at(sector, 0x44).ok_or_else(corrupt)?, cluster_size)?;

        // Fixups protect whole sectors, so records must span whole sectors.
        if mft_record_size % bytes_per_sector != 0 || index_record_size % bytes_per_sector != 0 {
            return Err(NtfsError::CorruptVolume);
        }

        Ok(Self {
            bytes_per_sector,
            sectors_per_cluster,
            cluster_size,
            mft_record_size,
            index_record_size,
            mft_lcn: u64_at(sector, 0x30).ok_or_else(corrupt)?,
            mft_mirror_lcn: u64_at(sector, 0x38).ok_or_else(corrupt)?,
            total_sectors: u64_at(sector, 0x28).ok_or_else(corrupt)?,
            serial_number: u64_at(sector, 0x48).ok_or_else(corrupt)?,
            drive_id,
            sector_of_cluster_zero: start_sector,
        })
    }

    /// Byte offset of the first MFT record from cluster zero
    pub fn mft_offset(&self) -> Result<u64> {
        self.mft_lcn
            .checked_mul(self.cluster_size)
            .ok_or(NtfsError::CorruptVolume)
    }
}
