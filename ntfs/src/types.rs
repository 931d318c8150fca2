//! Common types and constants for NTFS

/// Boot sector OEM identifier prefix (at offset 3)
pub const NTFS_SIGNATURE: &[u8; 4] = b"NTFS";

/// Magic of an MFT file record
pub const FILE_MAGIC: &[u8; 4] = b"FILE";

/// Magic of an index allocation block
pub const INDX_MAGIC: &[u8; 4] = b"INDX";

/// MFT record of the root directory
pub const ROOT_RECORD: u64 = 5;

/// Sectors per disk read burst
pub const BURST_SECTORS: usize = 64;

/// Attribute lists are followed this many levels deep
pub const MAX_ATTRIBUTE_LIST_DEPTH: usize = 1;

/// Maximum number of path components
pub const MAX_PATH_COMPONENTS: usize = 64;

/// Maximum file name length in UTF-16 code units
pub const MAX_COMPONENT_UNITS: usize = 255;

/// Name of the filename index (`$I30`) as UTF-16
pub const I30: [u16; 4] = [b'$' as u16, b'I' as u16, b'3' as u16, b'0' as u16];

/// File reference numbers keep the record number in the low 48 bits
pub const FILE_REFERENCE_MASK: u64 = 0x0000_FFFF_FFFF_FFFF;

/// Attribute type codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum AttributeType {
    /// Timestamps and DOS flags
    StandardInformation = 0x10,
    /// Pointers to attributes stored in other records
    AttributeList = 0x20,
    /// File name (one or more per file)
    FileName = 0x30,
    /// Object identifier
    ObjectId = 0x40,
    /// Security descriptor
    SecurityDescriptor = 0x50,
    /// Volume label
    VolumeName = 0x60,
    /// Volume version and flags
    VolumeInformation = 0x70,
    /// File data stream
    Data = 0x80,
    /// Directory index root
    IndexRoot = 0x90,
    /// Directory index blocks
    IndexAllocation = 0xA0,
    /// Allocation bitmap
    Bitmap = 0xB0,
    /// Reparse point data
    ReparsePoint = 0xC0,
    /// End of the attribute sequence
    End = 0xFFFF_FFFF,
}

impl AttributeType {
    /// Raw type code
    pub fn code(self) -> u32 {
        self as u32
    }
}

/// File name namespace of an index entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Namespace {
    /// Case-sensitive, any code unit except NUL and `/`
    Posix = 0,
    /// Case-insensitive long name
    Win32 = 1,
    /// 8.3 short name
    Dos = 2,
    /// Long name that is also a valid short name
    Win32AndDos = 3,
}

impl Namespace {
    /// Decode a namespace tag
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Posix),
            1 => Some(Self::Win32),
            2 => Some(Self::Dos),
            3 => Some(Self::Win32AndDos),
            _ => None,
        }
    }
}

/// Attribute header flag: data is compressed
pub const ATTR_FLAG_COMPRESSED: u16 = 0x0001;
/// Attribute header flag: data is encrypted
pub const ATTR_FLAG_ENCRYPTED: u16 = 0x4000;

/// File record flag: record is in use
pub const RECORD_FLAG_IN_USE: u16 = 0x0001;
/// File record flag: record is a directory
pub const RECORD_FLAG_DIRECTORY: u16 = 0x0002;

/// Index header flag: index blocks exist in `$INDEX_ALLOCATION`
pub const INDEX_FLAG_LARGE: u8 = 0x01;

/// Index entry flag: last entry of the node
pub const INDEX_ENTRY_END: u16 = 0x0002;

/// Extract the record number from a file reference
pub fn record_number(file_reference: u64) -> u64 {
    file_reference & FILE_REFERENCE_MASK
}
