//! On-disk layout of a record store.
//!
//! ```text
//! [ StoreHeader | StoreMeta | owner_table | path_offsets | paths_blob |
//!   sizes | atimes | mtimes | ctimes | owner_ids | flags ]
//! ```
//!
//! Every column holds exactly one entry per record, except `path_offsets`
//! which holds `record_count + 1` so that path `i` spans
//! `paths_blob[offsets[i]..offsets[i + 1]]`. The store root path is appended
//! to `paths_blob` after the last record path and located through
//! [StoreMeta].

use bytemuck::{Pod, Zeroable, bytes_of};
use crc32fast::Hasher;

/// Magic number: "RLUP" in little-endian
pub const STORE_MAGIC: u32 = 0x50554C52;

pub const STORE_VERSION: u32 = 2;

/// Alignment of every section that holds `u32`, `u64` or `i64` values.
pub(crate) const SECTION_ALIGNMENT: u64 = 8;

/// Describes a section within the store file.
/// All offsets are absolute byte offsets from file start.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Pod, Zeroable)]
pub struct SectionDesc {
    pub offset: u64,
    /// Length in bytes
    pub len: u64,
}

impl SectionDesc {
    #[inline]
    pub fn new(offset: u64, len: u64) -> Self {
        Self { offset, len }
    }

    #[inline]
    pub fn end(&self) -> Option<u64> {
        self.offset.checked_add(self.len)
    }
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct StoreHeader {
    /// Magic number (STORE_MAGIC)
    pub magic: u32,
    /// Store format version
    pub version: u32,
    /// Size of this header in bytes
    pub header_size: u32,
    /// CRC32 of the header bytes, computed with this field set to 0
    pub header_crc32: u32,
    pub record_count: u64,
    /// Number of distinct owners in the owner table
    pub owner_count: u32,
    /// Builder-defined flags, currently always 0
    pub flags_bits: u32,
    pub reserved: [u8; 16],

    pub metadata: SectionDesc,
    pub owner_table: SectionDesc,
    pub path_offsets: SectionDesc,
    pub paths_blob: SectionDesc,
    pub sizes: SectionDesc,
    pub atimes: SectionDesc,
    pub mtimes: SectionDesc,
    pub ctimes: SectionDesc,
    pub owner_ids: SectionDesc,
    pub flags: SectionDesc,
}

impl StoreHeader {
    /// Every section paired with its name and whether it must be aligned.
    pub(crate) fn sections(&self) -> [(&'static str, SectionDesc, bool); 10] {
        [
            ("metadata", self.metadata, true),
            ("owner_table", self.owner_table, false),
            ("path_offsets", self.path_offsets, true),
            ("paths_blob", self.paths_blob, false),
            ("sizes", self.sizes, true),
            ("atimes", self.atimes, true),
            ("mtimes", self.mtimes, true),
            ("ctimes", self.ctimes, true),
            ("owner_ids", self.owner_ids, true),
            ("flags", self.flags, false),
        ]
    }

    /// CRC32 over the header with the checksum field zeroed.
    pub fn compute_crc(&self) -> u32 {
        let mut copy = *self;
        copy.header_crc32 = 0;
        let mut hasher = Hasher::new();
        hasher.update(bytes_of(&copy));
        hasher.finalize()
    }
}

/// Build metadata stored in the `metadata` section.
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct StoreMeta {
    /// Unix timestamp of the filesystem snapshot
    pub created_secs: i64,
    /// Offset into paths_blob for the root path
    pub root_path_offset: u64,
    /// Length of the root path, 0 when the builder recorded none
    pub root_path_len: u64,
    pub build_flags: u32,
    pub _reserved: u32,
}

/// Align `value` up to the next multiple of `alignment`
#[inline]
pub(crate) fn align_up(value: u64, alignment: u64) -> u64 {
    debug_assert!(alignment.is_power_of_two());
    (value + alignment - 1) & !(alignment - 1)
}
