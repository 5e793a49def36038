use std::{io, path::PathBuf};

use thiserror::Error;

/// Everything that can go wrong opening or writing a record store.
///
/// None of these are recoverable for a query: the caller reports the error
/// and produces no output.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("cannot access index {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("index file too small for header ({len} bytes)")]
    TooSmall { len: usize },

    #[error("invalid index magic {found:#010x}")]
    BadMagic { found: u32 },

    #[error("index format version {found} is not supported (expected {expected})")]
    VersionMismatch { found: u32, expected: u32 },

    #[error("index header checksum mismatch (stored {stored:#010x}, computed {computed:#010x})")]
    ChecksumMismatch { stored: u32, computed: u32 },

    #[error("section `{name}` lies outside the index file")]
    SectionOutOfBounds { name: &'static str },

    #[error("section `{name}` is not {align}-byte aligned")]
    Misaligned { name: &'static str, align: u64 },

    #[error("section `{name}` holds {found} entries, expected {expected}")]
    ColumnLength {
        name: &'static str,
        found: u64,
        expected: u64,
    },

    #[error("record {id} is corrupt: {reason}")]
    CorruptRecord { id: u64, reason: &'static str },

    #[error("owner table is not valid UTF-8")]
    InvalidOwnerTable,

    #[error("index holds {0} records, more than this platform can address")]
    TooManyRecords(u64),
}

impl StoreError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        StoreError::Io {
            path: path.into(),
            source,
        }
    }
}
