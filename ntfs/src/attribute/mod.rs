//! Attribute access
//!
//! An [`AttrContext`] owns a private copy of one attribute record so it can
//! outlive the file record buffer it was found in. Non-resident contexts
//! keep a cursor into their run list: sequential reads (MFT record scans,
//! file streaming) resume from the cached run instead of decoding the
//! mapping pairs from the start on every call.

pub mod list;
pub mod record;
pub mod resolver;
pub mod runlist;

use crate::disk::VolumeRead;
use crate::error::{NtfsError, Result};
use crate::record::MftAccess;
use crate::types::{ATTR_FLAG_COMPRESSED, ATTR_FLAG_ENCRYPTED};
use crate::utils::bytes;
use alloc::vec::Vec;
use log::{trace, warn};
use record::{AttributeForm, AttributeRecord};
use runlist::{DataRun, RunCursor, RunList};

pub use resolver::{find_attribute, find_local_attribute};

/// Position of a decoded run within the attribute
#[derive(Debug, Clone, Copy)]
struct CachedRun {
    /// The run itself
    run: DataRun,
    /// First VCN covered by the run
    vcn: u64,
    /// Cursor positioned just after the run
    cursor: RunCursor,
}

impl CachedRun {
    /// Byte offset just past the run
    fn end(&self, cluster_size: u64) -> u128 {
        (self.vcn as u128 + self.run.length as u128) * cluster_size as u128
    }

    /// Does the run's byte span contain `offset`?
    fn covers(&self, offset: u64, cluster_size: u64) -> bool {
        let start = self.vcn as u128 * cluster_size as u128;
        (start..self.end(cluster_size)).contains(&(offset as u128))
    }
}

/// Runtime handle on one attribute's value
#[derive(Debug, Clone)]
pub struct AttrContext {
    record: Vec<u8>,
    type_code: u32,
    flags: u16,
    form: AttributeForm,
    cache: Option<CachedRun>,
}

impl AttrContext {
    /// Copy an attribute record into a new context
    ///
    /// The first run of a non-resident attribute is decoded here to seed
    /// the run cache.
    pub fn new(attr: &AttributeRecord<'_>) -> Result<Self> {
        let bytes = attr.as_bytes();
        let mut record = Vec::new();
        record
            .try_reserve_exact(bytes.len())
            .map_err(|_| NtfsError::OutOfMemory)?;
        record.extend_from_slice(bytes);

        let mut ctx = Self {
            record,
            type_code: attr.type_code(),
            flags: attr.flags(),
            form: attr.form(),
            cache: None,
        };
        ctx.cache = ctx.first_run()?;
        Ok(ctx)
    }

    /// Parse raw attribute record bytes into a new context
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        Self::new(&AttributeRecord::parse(bytes)?)
    }

    /// Raw bytes of the owned attribute record
    pub fn as_bytes(&self) -> &[u8] {
        &self.record
    }

    /// Attribute type code
    pub fn type_code(&self) -> u32 {
        self.type_code
    }

    /// Compressed or encrypted data cannot be streamed
    pub fn is_compressed_or_encrypted(&self) -> bool {
        self.flags & (ATTR_FLAG_COMPRESSED | ATTR_FLAG_ENCRYPTED) != 0
    }

    /// Is the value stored outside the record?
    pub fn is_non_resident(&self) -> bool {
        matches!(self.form, AttributeForm::NonResident { .. })
    }

    /// Logical size of the value
    pub fn data_size(&self) -> u64 {
        match self.form {
            AttributeForm::Resident { value_length, .. } => value_length as u64,
            AttributeForm::NonResident { data_size, .. } => data_size,
        }
    }

    /// Inline value of a resident attribute
    pub fn resident_value(&self) -> Option<&[u8]> {
        match self.form {
            AttributeForm::Resident {
                value_offset,
                value_length,
            } => Some(&self.record[value_offset..value_offset + value_length as usize]),
            AttributeForm::NonResident { .. } => None,
        }
    }

    /// Runs of a non-resident attribute
    pub fn runs(&self) -> Option<RunList<'_>> {
        self.mapping_pairs().map(RunList::new)
    }

    /// Run the cache currently points at
    pub fn cached_run(&self) -> Option<DataRun> {
        self.cache.map(|c| c.run)
    }

    /// Forget the cached run; the next read decodes from the start
    pub fn invalidate_run_cache(&mut self) {
        self.cache = None;
    }

    fn mapping_pairs(&self) -> Option<&[u8]> {
        match self.form {
            AttributeForm::NonResident {
                mapping_pairs_offset,
                ..
            } => Some(&self.record[mapping_pairs_offset..]),
            AttributeForm::Resident { .. } => None,
        }
    }

    fn lowest_vcn(&self) -> u64 {
        match self.form {
            AttributeForm::NonResident { lowest_vcn, .. } => lowest_vcn,
            AttributeForm::Resident { .. } => 0,
        }
    }

    fn first_run(&self) -> Result<Option<CachedRun>> {
        let Some(pairs) = self.mapping_pairs() else {
            return Ok(None);
        };
        let mut cursor = RunCursor::new();
        Ok(cursor.next_run(pairs)?.map(|run| CachedRun {
            run,
            vcn: self.lowest_vcn(),
            cursor,
        }))
    }

    /// Decode from the first run until one covers `offset`
    fn find_run(&self, offset: u64, cluster_size: u64) -> Result<Option<CachedRun>> {
        let Some(pairs) = self.mapping_pairs() else {
            return Ok(None);
        };
        let mut cursor = RunCursor::new();
        let mut vcn = self.lowest_vcn();
        while let Some(run) = cursor.next_run(pairs)? {
            let candidate = CachedRun { run, vcn, cursor };
            if candidate.covers(offset, cluster_size) {
                return Ok(Some(candidate));
            }
            vcn = vcn.checked_add(run.length).ok_or(NtfsError::CorruptRunList)?;
        }
        Ok(None)
    }

    /// Read up to `buf.len()` bytes of the value starting at `offset`
    ///
    /// Returns the number of bytes read, which is short at the end of the
    /// value, at the end of the run list, or when a disk read fails after
    /// some data was delivered. Bytes past the returned count are not
    /// written. Sparse runs read as zeros without touching the disk.
    ///
    /// # Errors
    /// * `IoError` - The first disk read failed, so nothing was read
    /// * `CorruptRunList` - The mapping pairs are malformed
    pub fn read<D: VolumeRead + ?Sized>(
        &mut self,
        disk: &mut D,
        offset: u64,
        buf: &mut [u8],
    ) -> Result<usize> {
        match self.fill(disk, offset, buf)? {
            (0, Some(e)) => Err(e),
            (done, _) => Ok(done),
        }
    }

    /// Fill all of `buf` from `offset`
    ///
    /// # Errors
    /// * `IoError` - A disk read failed, even after some bytes arrived
    /// * `CorruptVolume` - The value or its runs end before `buf` is full
    /// * `CorruptRunList` - The mapping pairs are malformed
    pub fn read_exact<D: VolumeRead + ?Sized>(
        &mut self,
        disk: &mut D,
        offset: u64,
        buf: &mut [u8],
    ) -> Result<()> {
        let (done, failure) = self.fill(disk, offset, buf)?;
        if let Some(e) = failure {
            return Err(e);
        }
        if done != buf.len() {
            warn!(
                "ntfs: attribute {:#x} ends {:#x} bytes into a {:#x} byte read at {:#x}",
                self.type_code,
                done,
                buf.len(),
                offset
            );
            return Err(NtfsError::CorruptVolume);
        }
        Ok(())
    }

    /// Copy as much as possible; also report the disk error that stopped it
    fn fill<D: VolumeRead + ?Sized>(
        &mut self,
        disk: &mut D,
        offset: u64,
        buf: &mut [u8],
    ) -> Result<(usize, Option<NtfsError>)> {
        match self.form {
            AttributeForm::Resident {
                value_offset,
                value_length,
            } => {
                let len = value_length as u64;
                if offset >= len {
                    return Ok((0, None));
                }
                let count = (buf.len() as u64).min(len - offset) as usize;
                let start = value_offset + offset as usize;
                buf[..count].copy_from_slice(&self.record[start..start + count]);
                Ok((count, None))
            }
            AttributeForm::NonResident { data_size, .. } => {
                self.fill_non_resident(disk, offset, buf, data_size)
            }
        }
    }

    /// Run following `state` in the list
    fn next_after(&self, state: &CachedRun) -> Result<Option<CachedRun>> {
        let mut cursor = state.cursor;
        let Some(run) = cursor.next_run(self.mapping_pairs().unwrap_or(&[]))? else {
            return Ok(None);
        };
        let vcn = state
            .vcn
            .checked_add(state.run.length)
            .ok_or(NtfsError::CorruptRunList)?;
        Ok(Some(CachedRun { run, vcn, cursor }))
    }

    fn fill_non_resident<D: VolumeRead + ?Sized>(
        &mut self,
        disk: &mut D,
        offset: u64,
        buf: &mut [u8],
        data_size: u64,
    ) -> Result<(usize, Option<NtfsError>)> {
        if offset >= data_size || buf.is_empty() {
            return Ok((0, None));
        }
        let want = (buf.len() as u64).min(data_size - offset) as usize;
        let cluster_size = disk.cluster_size();

        // I. Find the run holding the first byte: the cached run, the one
        // right after it, or a scan from the start.
        let resumed = match self.cache {
            Some(cached) if cached.covers(offset, cluster_size) => Some(cached),
            Some(cached) if cached.end(cluster_size) == offset as u128 => self
                .next_after(&cached)?
                .filter(|next| next.covers(offset, cluster_size)),
            _ => None,
        };
        let mut state = match resumed {
            Some(state) => state,
            None => match self.find_run(offset, cluster_size)? {
                Some(found) => found,
                None => return Ok((0, None)),
            },
        };

        // II. Copy run by run.
        let mut done = 0usize;
        let mut failure = None;
        loop {
            let position = offset + done as u64;
            let run_start = state
                .vcn
                .checked_mul(cluster_size)
                .ok_or(NtfsError::CorruptRunList)?;
            let run_bytes = state
                .run
                .length
                .checked_mul(cluster_size)
                .ok_or(NtfsError::CorruptRunList)?;
            let within = position - run_start;
            let chunk = (run_bytes - within).min((want - done) as u64) as usize;
            let dst = &mut buf[done..done + chunk];

            match state.run.start_cluster {
                None => dst.fill(0),
                Some(lcn) => {
                    let disk_offset = lcn
                        .checked_mul(cluster_size)
                        .and_then(|o| o.checked_add(within))
                        .ok_or(NtfsError::CorruptRunList)?;
                    let (filled, result) = disk.read_partial(disk_offset, dst);
                    if let Err(e) = result {
                        done += filled;
                        failure = Some(e);
                        break;
                    }
                }
            }
            done += chunk;
            if done == want {
                break;
            }

            // III. This run is used up and more is wanted.
            let Some(next) = self.next_after(&state)? else {
                break;
            };
            trace!(
                "ntfs: attr {:#x} advancing to run at vcn {:#x}",
                self.type_code,
                next.vcn
            );
            state = next;
        }

        self.cache = Some(state);
        Ok((done, failure))
    }
}

/// Read an attribute's whole value into a new buffer
///
/// # Errors
/// * `IoError` - Part of the value could not be read
/// * `CorruptVolume` - The value is shorter on disk than its declared size
pub fn read_value<M: MftAccess + ?Sized>(mft: &mut M, ctx: &mut AttrContext) -> Result<Vec<u8>> {
    let len = usize::try_from(ctx.data_size()).map_err(|_| NtfsError::CorruptVolume)?;
    let mut buf = bytes::zeroed(len)?;
    mft.read_attribute_exact(ctx, 0, &mut buf)?;
    Ok(buf)
}
