//! Synthetic NTFS volume images
//!
//! Geometry is fixed: 512-byte sectors, 1 KiB clusters, 1 KiB file records
//! and 4 KiB index blocks. The MFT starts at cluster 4 and holds 64 records;
//! the root directory is record 5 and new records are numbered from 16.

use crate::common::MemoryBlockDevice;
use std::collections::BTreeMap;

pub const SECTOR: usize = 512;
pub const CLUSTER: usize = 1024;
pub const RECORD: usize = 1024;
pub const INDEX_BLOCK: usize = 4096;
pub const MFT_LCN: u64 = 4;
pub const MFT_RECORDS: u64 = 64;
pub const ROOT: u64 = 5;
pub const FIRST_USER_RECORD: u64 = 16;

/// Second MFT fragment (records 16 and up) when the MFT is fragmented
const MFT_TAIL_LCN: u64 = 80;
const FIRST_DATA_LCN: u64 = 160;
const INDEX_BLOCK_CLUSTERS: u64 = (INDEX_BLOCK / CLUSTER) as u64;

pub const SI: u32 = 0x10;
pub const ATTRIBUTE_LIST: u32 = 0x20;
pub const FILE_NAME: u32 = 0x30;
pub const DATA: u32 = 0x80;
pub const INDEX_ROOT: u32 = 0x90;
pub const INDEX_ALLOCATION: u32 = 0xA0;
pub const BITMAP: u32 = 0xB0;

pub const POSIX: u8 = 0;
pub const WIN32: u8 = 1;
pub const DOS: u8 = 2;
pub const WIN32_AND_DOS: u8 = 3;

pub const IN_USE: u16 = 0x1;
pub const DIRECTORY: u16 = 0x2;

pub const COMPRESSED: u16 = 0x0001;
pub const ENCRYPTED: u16 = 0x4000;

/// One directory index entry
#[derive(Debug, Clone)]
pub struct NameEntry {
    pub name: String,
    pub namespace: u8,
    pub target: u64,
}

impl NameEntry {
    pub fn new(name: &str, namespace: u8, target: u64) -> Self {
        Self {
            name: name.to_string(),
            namespace,
            target,
        }
    }
}

/// One extent of a file's cluster layout
#[derive(Debug, Clone, Copy)]
pub enum Extent {
    /// Clusters backed by disk
    Allocated(u64),
    /// Clusters with no backing (read as zeros)
    Sparse(u64),
}

struct Record {
    flags: u16,
    base: u64,
    attrs: Vec<Vec<u8>>,
}

struct Directory {
    parent: u64,
    entries: Vec<NameEntry>,
    /// INDX blocks (None = unallocated) and their first cluster
    blocks: Option<(Vec<Option<Vec<NameEntry>>>, u64)>,
}

pub struct ImageBuilder {
    data: Vec<u8>,
    records: BTreeMap<u64, Record>,
    dirs: BTreeMap<u64, Directory>,
    extents: BTreeMap<u64, Vec<Option<u64>>>,
    next_record: u64,
    next_lcn: u64,
    fragmented_mft: bool,
}

fn align8(n: usize) -> usize {
    (n + 7) & !7
}

fn utf16(name: &str) -> Vec<u16> {
    name.encode_utf16().collect()
}

fn put_u16(buf: &mut [u8], at: usize, v: u16) {
    buf[at..at + 2].copy_from_slice(&v.to_le_bytes());
}

fn put_u32(buf: &mut [u8], at: usize, v: u32) {
    buf[at..at + 4].copy_from_slice(&v.to_le_bytes());
}

fn put_u64(buf: &mut [u8], at: usize, v: u64) {
    buf[at..at + 8].copy_from_slice(&v.to_le_bytes());
}

fn put_name(buf: &mut [u8], at: usize, name: &[u16]) {
    for (i, u) in name.iter().enumerate() {
        put_u16(buf, at + i * 2, *u);
    }
}

/// File reference with sequence number 1
pub fn file_reference(record: u64) -> u64 {
    record | (1 << 48)
}

/// Apply update sequence protection to a multi-sector record
pub fn protect(buf: &mut [u8], usa_offset: usize, usn: u16) {
    let count = buf.len() / SECTOR + 1;
    put_u16(buf, 0x04, usa_offset as u16);
    put_u16(buf, 0x06, count as u16);
    put_u16(buf, usa_offset, usn);
    for i in 1..count {
        let tail = i * SECTOR - 2;
        let saved = [buf[tail], buf[tail + 1]];
        buf[usa_offset + i * 2..usa_offset + i * 2 + 2].copy_from_slice(&saved);
        put_u16(buf, tail, usn);
    }
}

/// Encode a run list; `None` start clusters are sparse runs
pub fn encode_runs(runs: &[(Option<u64>, u64)]) -> Vec<u8> {
    fn unsigned_width(v: u64) -> usize {
        (1..=8).find(|&n| n == 8 || v < 1u64 << (8 * n)).unwrap()
    }
    fn signed_width(v: i64) -> usize {
        (1..=8)
            .find(|&n| n == 8 || (-(1i64 << (8 * n - 1))..(1i64 << (8 * n - 1))).contains(&v))
            .unwrap()
    }

    let mut out = Vec::new();
    let mut last = 0i64;
    for &(start, length) in runs {
        let lw = unsigned_width(length);
        match start {
            None => {
                out.push(lw as u8);
                out.extend_from_slice(&length.to_le_bytes()[..lw]);
            }
            Some(lcn) => {
                let delta = lcn as i64 - last;
                last = lcn as i64;
                let ow = signed_width(delta);
                out.push(((ow as u8) << 4) | lw as u8);
                out.extend_from_slice(&length.to_le_bytes()[..lw]);
                out.extend_from_slice(&delta.to_le_bytes()[..ow]);
            }
        }
    }
    out.push(0);
    out
}

/// Resident attribute record
pub fn resident_attr(type_code: u32, name: &str, value: &[u8], flags: u16) -> Vec<u8> {
    let name = utf16(name);
    let value_offset = align8(0x18 + name.len() * 2);
    let len = align8(value_offset + value.len());
    let mut a = vec![0u8; len];
    put_u32(&mut a, 0x00, type_code);
    put_u32(&mut a, 0x04, len as u32);
    a[0x09] = name.len() as u8;
    put_u16(&mut a, 0x0A, 0x18);
    put_u16(&mut a, 0x0C, flags);
    put_u32(&mut a, 0x10, value.len() as u32);
    put_u16(&mut a, 0x14, value_offset as u16);
    put_name(&mut a, 0x18, &name);
    a[value_offset..value_offset + value.len()].copy_from_slice(value);
    a
}

/// Non-resident attribute record over `runs`
pub fn non_resident_attr(
    type_code: u32,
    name: &str,
    runs: &[(Option<u64>, u64)],
    data_size: u64,
    flags: u16,
) -> Vec<u8> {
    let name = utf16(name);
    let pairs = encode_runs(runs);
    let clusters: u64 = runs.iter().map(|r| r.1).sum();
    let pairs_offset = align8(0x40 + name.len() * 2);
    let len = align8(pairs_offset + pairs.len());
    let mut a = vec![0u8; len];
    put_u32(&mut a, 0x00, type_code);
    put_u32(&mut a, 0x04, len as u32);
    a[0x08] = 1;
    a[0x09] = name.len() as u8;
    put_u16(&mut a, 0x0A, 0x40);
    put_u16(&mut a, 0x0C, flags);
    put_u64(&mut a, 0x10, 0);
    put_u64(&mut a, 0x18, clusters.saturating_sub(1));
    put_u16(&mut a, 0x20, pairs_offset as u16);
    put_u64(&mut a, 0x28, clusters * CLUSTER as u64);
    put_u64(&mut a, 0x30, data_size);
    put_u64(&mut a, 0x38, data_size);
    put_name(&mut a, 0x40, &name);
    a[pairs_offset..pairs_offset + pairs.len()].copy_from_slice(&pairs);
    a
}

/// `$FILE_NAME` value (also the key of index entries)
pub fn file_name_value(parent: u64, name: &str, namespace: u8) -> Vec<u8> {
    let units = utf16(name);
    let mut v = vec![0u8; 0x42 + units.len() * 2];
    put_u64(&mut v, 0x00, file_reference(parent));
    v[0x40] = units.len() as u8;
    v[0x41] = namespace;
    put_name(&mut v, 0x42, &units);
    v
}

/// Attribute list entry
pub fn attribute_list_entry(type_code: u32, name: &str, starting_vcn: u64, record: u64) -> Vec<u8> {
    let units = utf16(name);
    let len = align8(0x1A + units.len() * 2);
    let mut e = vec![0u8; len];
    put_u32(&mut e, 0x00, type_code);
    put_u16(&mut e, 0x04, len as u16);
    e[0x06] = units.len() as u8;
    e[0x07] = 0x1A;
    put_u64(&mut e, 0x08, starting_vcn);
    put_u64(&mut e, 0x10, file_reference(record));
    put_name(&mut e, 0x1A, &units);
    e
}

/// Index entries of one node, closed by the last-entry sentinel
pub fn index_entries(parent: u64, entries: &[NameEntry]) -> Vec<u8> {
    let mut out = Vec::new();
    for entry in entries {
        let key = file_name_value(parent, &entry.name, entry.namespace);
        let len = align8(0x10 + key.len());
        let mut e = vec![0u8; len];
        put_u64(&mut e, 0x00, file_reference(entry.target));
        put_u16(&mut e, 0x08, len as u16);
        put_u16(&mut e, 0x0A, key.len() as u16);
        e[0x10..0x10 + key.len()].copy_from_slice(&key);
        out.extend(e);
    }
    let mut last = vec![0u8; 0x10];
    put_u16(&mut last, 0x08, 0x10);
    put_u16(&mut last, 0x0C, 0x2);
    out.extend(last);
    out
}

/// `$INDEX_ROOT` value for `$I30`
pub fn index_root_value(parent: u64, entries: &[NameEntry], large: bool) -> Vec<u8> {
    let packed = index_entries(parent, entries);
    let mut v = vec![0u8; 0x20];
    put_u32(&mut v, 0x00, FILE_NAME);
    put_u32(&mut v, 0x04, 1);
    put_u32(&mut v, 0x08, INDEX_BLOCK as u32);
    v[0x0C] = INDEX_BLOCK_CLUSTERS as u8;
    put_u32(&mut v, 0x10, 0x10);
    put_u32(&mut v, 0x14, (0x10 + packed.len()) as u32);
    put_u32(&mut v, 0x18, (0x10 + packed.len()) as u32);
    v[0x1C] = large as u8;
    v.extend(packed);
    v
}

/// A protected INDX block
pub fn index_block(parent: u64, vbn: u64, entries: &[NameEntry]) -> Vec<u8> {
    let packed = index_entries(parent, entries);
    let mut b = vec![0u8; INDEX_BLOCK];
    b[0..4].copy_from_slice(b"INDX");
    put_u64(&mut b, 0x10, vbn * INDEX_BLOCK_CLUSTERS);
    put_u32(&mut b, 0x18, 0x28);
    put_u32(&mut b, 0x1C, (0x28 + packed.len()) as u32);
    put_u32(&mut b, 0x20, (INDEX_BLOCK - 0x18) as u32);
    b[0x40..0x40 + packed.len()].copy_from_slice(&packed);
    protect(&mut b, 0x28, 0x0101 + vbn as u16);
    b
}

impl ImageBuilder {
    pub fn new() -> Self {
        let mut builder = Self {
            data: Vec::new(),
            records: BTreeMap::new(),
            dirs: BTreeMap::new(),
            extents: BTreeMap::new(),
            next_record: FIRST_USER_RECORD,
            next_lcn: FIRST_DATA_LCN,
            fragmented_mft: false,
        };
        builder.insert_record(ROOT, IN_USE | DIRECTORY, 0);
        let root_name = file_name_value(ROOT, ".", WIN32_AND_DOS);
        builder.push_attr(ROOT, resident_attr(FILE_NAME, "", &root_name, 0));
        builder.dirs.insert(
            ROOT,
            Directory {
                parent: ROOT,
                entries: Vec::new(),
                blocks: None,
            },
        );
        builder
    }

    /// Split the MFT into two runs: records 0..16 and 16..64
    pub fn fragment_mft(&mut self) -> &mut Self {
        self.fragmented_mft = true;
        self
    }

    /// Volume-relative byte offset of an MFT record
    pub fn record_offset(&self, index: u64) -> usize {
        let lcn = if self.fragmented_mft && index >= FIRST_USER_RECORD {
            MFT_TAIL_LCN + (index - FIRST_USER_RECORD)
        } else {
            MFT_LCN + index
        };
        lcn as usize * CLUSTER
    }

    /// Volume-relative byte offset of a directory's index block
    pub fn index_block_offset(&self, dir: u64, vbn: u64) -> usize {
        let (_, lcn) = self.dirs[&dir].blocks.as_ref().expect("large directory");
        (*lcn as usize + vbn as usize * INDEX_BLOCK_CLUSTERS as usize) * CLUSTER
    }

    /// First cluster of a file's data
    pub fn data_lcn(&self, record: u64) -> u64 {
        self.extent_lcns(record).into_iter().flatten().next().expect("allocated data")
    }

    /// First cluster of every extent of a file (None for sparse extents)
    pub fn extent_lcns(&self, record: u64) -> Vec<Option<u64>> {
        self.extents[&record].clone()
    }

    /// Reserve `count` fresh clusters
    pub fn alloc(&mut self, count: u64) -> u64 {
        let lcn = self.next_lcn;
        self.next_lcn += count;
        self.ensure((self.next_lcn as usize) * CLUSTER);
        lcn
    }

    fn ensure(&mut self, len: usize) {
        if self.data.len() < len {
            self.data.resize(len, 0);
        }
    }

    /// Write raw bytes at a volume offset
    pub fn write_at(&mut self, offset: usize, bytes: &[u8]) {
        self.ensure(offset + bytes.len());
        self.data[offset..offset + bytes.len()].copy_from_slice(bytes);
    }

    fn insert_record(&mut self, index: u64, flags: u16, base: u64) {
        self.records.insert(
            index,
            Record {
                flags,
                base,
                attrs: Vec::new(),
            },
        );
    }

    /// New record carrying `$STANDARD_INFORMATION`
    pub fn add_record(&mut self, flags: u16) -> u64 {
        let index = self.next_record;
        assert!(index < MFT_RECORDS, "MFT full");
        self.next_record += 1;
        self.insert_record(index, flags, 0);
        self.push_attr(index, resident_attr(SI, "", &[0u8; 0x48], 0));
        index
    }

    /// Append an attribute record to a file record
    pub fn push_attr(&mut self, record: u64, attr: Vec<u8>) {
        self.records.get_mut(&record).expect("record exists").attrs.push(attr);
    }

    /// Add a name to a directory's index
    pub fn add_entry(&mut self, dir: u64, name: &str, namespace: u8, target: u64) {
        self.dirs
            .get_mut(&dir)
            .expect("directory exists")
            .entries
            .push(NameEntry::new(name, namespace, target));
    }

    fn named_record(&mut self, parent: u64, name: &str, namespace: u8, flags: u16) -> u64 {
        let index = self.add_record(flags);
        let value = file_name_value(parent, name, namespace);
        self.push_attr(index, resident_attr(FILE_NAME, "", &value, 0));
        self.add_entry(parent, name, namespace, index);
        index
    }

    pub fn add_dir(&mut self, parent: u64, name: &str) -> u64 {
        let index = self.named_record(parent, name, WIN32_AND_DOS, IN_USE | DIRECTORY);
        self.dirs.insert(
            index,
            Directory {
                parent,
                entries: Vec::new(),
                blocks: None,
            },
        );
        index
    }

    /// Directory whose index spills into INDX blocks
    ///
    /// `blocks[i] == None` leaves block `i` unallocated: its bitmap bit is
    /// clear and its clusters hold garbage.
    pub fn add_large_dir(
        &mut self,
        parent: u64,
        name: &str,
        root_entries: Vec<NameEntry>,
        blocks: Vec<Option<Vec<NameEntry>>>,
    ) -> u64 {
        let index = self.named_record(parent, name, WIN32_AND_DOS, IN_USE | DIRECTORY);
        let lcn = self.alloc(blocks.len() as u64 * INDEX_BLOCK_CLUSTERS);
        self.dirs.insert(
            index,
            Directory {
                parent,
                entries: root_entries,
                blocks: Some((blocks, lcn)),
            },
        );
        index
    }

    /// File with a resident data stream
    pub fn add_resident_file(&mut self, parent: u64, name: &str, content: &[u8]) -> u64 {
        let index = self.named_record(parent, name, WIN32_AND_DOS, IN_USE);
        self.push_attr(index, resident_attr(DATA, "", content, 0));
        index
    }

    /// File stored resident when small, contiguous otherwise
    pub fn add_file(&mut self, parent: u64, name: &str, content: &[u8]) -> u64 {
        self.add_file_in_namespace(parent, name, WIN32_AND_DOS, content)
    }

    pub fn add_file_in_namespace(
        &mut self,
        parent: u64,
        name: &str,
        namespace: u8,
        content: &[u8],
    ) -> u64 {
        let index = self.named_record(parent, name, namespace, IN_USE);
        let attr = if content.len() <= 256 {
            resident_attr(DATA, "", content, 0)
        } else {
            self.contiguous_data(index, content, 0)
        };
        self.push_attr(index, attr);
        index
    }

    /// Contiguous non-resident file with the given attribute flags
    pub fn add_file_with_flags(
        &mut self,
        parent: u64,
        name: &str,
        content: &[u8],
        flags: u16,
    ) -> u64 {
        let index = self.named_record(parent, name, WIN32_AND_DOS, IN_USE);
        let attr = self.contiguous_data(index, content, flags);
        self.push_attr(index, attr);
        index
    }

    fn contiguous_data(&mut self, record: u64, content: &[u8], flags: u16) -> Vec<u8> {
        let clusters = (content.len().div_ceil(CLUSTER) as u64).max(1);
        let lcn = self.alloc(clusters);
        self.write_at(lcn as usize * CLUSTER, content);
        self.extents.insert(record, vec![Some(lcn)]);
        non_resident_attr(DATA, "", &[(Some(lcn), clusters)], content.len() as u64, flags)
    }

    /// Non-resident file laid out over `extents`
    ///
    /// Allocated extents are placed at descending cluster numbers with a gap
    /// between them, so the run list carries negative deltas. Bytes of
    /// `content` falling in sparse extents must be zero.
    pub fn add_file_with_layout(
        &mut self,
        parent: u64,
        name: &str,
        content: &[u8],
        extents: &[Extent],
    ) -> u64 {
        let index = self.named_record(parent, name, WIN32_AND_DOS, IN_USE);

        let mut lcns = vec![None; extents.len()];
        for (i, extent) in extents.iter().enumerate().rev() {
            if let Extent::Allocated(n) = *extent {
                lcns[i] = Some(self.alloc(n));
                self.alloc(1);
            }
        }

        let mut runs = Vec::new();
        let mut vcn = 0u64;
        for (extent, lcn) in extents.iter().zip(&lcns) {
            let n = match *extent {
                Extent::Allocated(n) | Extent::Sparse(n) => n,
            };
            if let Some(lcn) = *lcn {
                let start = (vcn as usize * CLUSTER).min(content.len());
                let end = ((vcn + n) as usize * CLUSTER).min(content.len());
                let bytes = content[start..end].to_vec();
                self.write_at(lcn as usize * CLUSTER, &bytes);
            }
            runs.push((*lcn, n));
            vcn += n;
        }

        self.extents.insert(index, lcns);
        self.push_attr(index, non_resident_attr(DATA, "", &runs, content.len() as u64, 0));
        index
    }

    /// File whose data attribute lives in an extension record
    ///
    /// Returns `(base, extension)`.
    pub fn add_file_with_extension(
        &mut self,
        parent: u64,
        name: &str,
        content: &[u8],
    ) -> (u64, u64) {
        let base = self.named_record(parent, name, WIN32_AND_DOS, IN_USE);

        let extension = self.next_record;
        self.next_record += 1;
        self.insert_record(extension, IN_USE, base);
        let data = self.contiguous_data(base, content, 0);
        self.push_attr(extension, data);

        let mut list = attribute_list_entry(SI, "", 0, base);
        list.extend(attribute_list_entry(FILE_NAME, "", 0, base));
        list.extend(attribute_list_entry(DATA, "", 0, extension));
        self.push_attr(base, resident_attr(ATTRIBUTE_LIST, "", &list, 0));
        (base, extension)
    }

    fn serialize_record(index: u64, record: &Record) -> Vec<u8> {
        let mut buf = vec![0u8; RECORD];
        buf[0..4].copy_from_slice(b"FILE");
        put_u16(&mut buf, 0x10, 1);
        put_u16(&mut buf, 0x12, 1);
        put_u16(&mut buf, 0x14, 0x38);
        put_u16(&mut buf, 0x16, record.flags);
        put_u32(&mut buf, 0x1C, RECORD as u32);
        if record.base != 0 {
            put_u64(&mut buf, 0x20, file_reference(record.base));
        }
        put_u32(&mut buf, 0x2C, index as u32);

        let mut attrs: Vec<&Vec<u8>> = record.attrs.iter().collect();
        attrs.sort_by_key(|a| u32::from_le_bytes([a[0], a[1], a[2], a[3]]));

        let mut pos = 0x38;
        for (id, attr) in attrs.into_iter().enumerate() {
            assert!(pos + attr.len() + 8 <= RECORD, "record {} overflows", index);
            buf[pos..pos + attr.len()].copy_from_slice(attr);
            put_u16(&mut buf, pos + 0x0E, id as u16);
            pos += attr.len();
        }
        put_u32(&mut buf, pos, 0xFFFF_FFFF);
        put_u32(&mut buf, 0x18, (pos + 8) as u32);
        put_u16(&mut buf, 0x28, record.attrs.len() as u16);

        protect(&mut buf, 0x30, 0x0200 + index as u16);
        buf
    }

    fn boot_sector(&self, total_sectors: u64) -> Vec<u8> {
        let mut s = vec![0u8; SECTOR];
        s[0..3].copy_from_slice(&[0xEB, 0x52, 0x90]);
        s[3..11].copy_from_slice(b"NTFS    ");
        put_u16(&mut s, 0x0B, SECTOR as u16);
        s[0x0D] = (CLUSTER / SECTOR) as u8;
        s[0x15] = 0xF8;
        put_u64(&mut s, 0x28, total_sectors);
        put_u64(&mut s, 0x30, MFT_LCN);
        put_u64(&mut s, 0x38, 2);
        s[0x40] = 0xF6; // 2^10 bytes per record
        s[0x44] = 0xF4; // 2^12 bytes per index block
        put_u64(&mut s, 0x48, 0x1234_5678_9ABC_DEF0);
        s[510] = 0x55;
        s[511] = 0xAA;
        s
    }

    /// Volume image as raw bytes
    pub fn build_bytes(mut self) -> Vec<u8> {
        self.ensure(self.next_lcn as usize * CLUSTER);

        // I. Directory indexes
        let dirs = std::mem::take(&mut self.dirs);
        for (&dir, d) in &dirs {
            let large = d.blocks.is_some();
            let root = index_root_value(d.parent, &d.entries, large);
            self.push_attr(dir, resident_attr(INDEX_ROOT, "$I30", &root, 0));

            if let Some((blocks, lcn)) = &d.blocks {
                let mut bitmap = vec![0u8; align8(blocks.len().div_ceil(8))];
                for (vbn, block) in blocks.iter().enumerate() {
                    let offset = (*lcn as usize + vbn * INDEX_BLOCK_CLUSTERS as usize) * CLUSTER;
                    match block {
                        Some(entries) => {
                            bitmap[vbn / 8] |= 1 << (vbn % 8);
                            let bytes = index_block(dir, vbn as u64, entries);
                            self.write_at(offset, &bytes);
                        }
                        None => self.write_at(offset, &vec![0xCC; INDEX_BLOCK]),
                    }
                }
                let clusters = blocks.len() as u64 * INDEX_BLOCK_CLUSTERS;
                let size = blocks.len() as u64 * INDEX_BLOCK as u64;
                self.push_attr(
                    dir,
                    non_resident_attr(INDEX_ALLOCATION, "$I30", &[(Some(*lcn), clusters)], size, 0),
                );
                self.push_attr(dir, resident_attr(BITMAP, "$I30", &bitmap, 0));
            }
        }

        // II. $MFT
        let runs = if self.fragmented_mft {
            vec![
                (Some(MFT_LCN), FIRST_USER_RECORD),
                (Some(MFT_TAIL_LCN), MFT_RECORDS - FIRST_USER_RECORD),
            ]
        } else {
            vec![(Some(MFT_LCN), MFT_RECORDS)]
        };
        self.insert_record(0, IN_USE, 0);
        self.push_attr(0, resident_attr(SI, "", &[0u8; 0x48], 0));
        let mft_name = file_name_value(ROOT, "$MFT", WIN32_AND_DOS);
        self.push_attr(0, resident_attr(FILE_NAME, "", &mft_name, 0));
        self.push_attr(
            0,
            non_resident_attr(DATA, "", &runs, MFT_RECORDS * RECORD as u64, 0),
        );

        // III. Records and boot sector
        let records = std::mem::take(&mut self.records);
        for (&index, record) in &records {
            let bytes = Self::serialize_record(index, record);
            let offset = self.record_offset(index);
            self.write_at(offset, &bytes);
        }
        let total_sectors = (self.data.len() / SECTOR) as u64 - 1;
        let boot = self.boot_sector(total_sectors);
        self.write_at(0, &boot);

        self.data
    }

    /// Volume image at sector 0 of a device
    pub fn build(self) -> MemoryBlockDevice {
        MemoryBlockDevice::new(self.build_bytes())
    }

    /// Volume image preceded by `start_sector` empty sectors
    pub fn build_at(self, start_sector: u64) -> MemoryBlockDevice {
        let mut data = vec![0u8; start_sector as usize * SECTOR];
        data.extend(self.build_bytes());
        MemoryBlockDevice::new(data)
    }
}
