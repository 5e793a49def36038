use std::{fmt, str::FromStr};

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

pub type RecordId = usize;

bitflags! {
    /// Per-record flags as stored in the `flags` column.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct RecordFlags: u8 {
        const IS_DIR = 0b0000_0001;
    }
}

/// Which timestamp column a time filter reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimestampKind {
    /// Last access
    #[default]
    Atime,
    /// Last modification
    Mtime,
    /// Creation
    Ctime,
}

impl TimestampKind {
    pub fn as_str(self) -> &'static str {
        match self {
            TimestampKind::Atime => "atime",
            TimestampKind::Mtime => "mtime",
            TimestampKind::Ctime => "ctime",
        }
    }
}

impl fmt::Display for TimestampKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TimestampKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "atime" => Ok(TimestampKind::Atime),
            "mtime" => Ok(TimestampKind::Mtime),
            "ctime" => Ok(TimestampKind::Ctime),
            _ => Err(s.to_owned()),
        }
    }
}

/// One indexed filesystem entry, owned.
///
/// This is what external builders feed into [crate::StoreBuilder]. Queries
/// never see it; they work on borrowed [RecordView]s.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectRecord {
    /// Absolute, slash-delimited path. Unique within a store.
    pub path: String,
    pub is_dir: bool,
    pub size_bytes: u64,
    /// User or group name owning the entry
    pub owner: String,
    /// Seconds since the Unix epoch
    pub atime: i64,
    pub mtime: i64,
    /// Creation time
    pub ctime: i64,
}

impl ObjectRecord {
    pub fn file(path: impl Into<String>, size_bytes: u64, owner: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            is_dir: false,
            size_bytes,
            owner: owner.into(),
            atime: 0,
            mtime: 0,
            ctime: 0,
        }
    }

    pub fn dir(path: impl Into<String>, owner: impl Into<String>) -> Self {
        Self {
            is_dir: true,
            ..Self::file(path, 0, owner)
        }
    }

    /// Set all three timestamps at once.
    pub fn with_times(mut self, atime: i64, mtime: i64, ctime: i64) -> Self {
        self.atime = atime;
        self.mtime = mtime;
        self.ctime = ctime;
        self
    }

    pub fn flags(&self) -> RecordFlags {
        if self.is_dir {
            RecordFlags::IS_DIR
        } else {
            RecordFlags::empty()
        }
    }

    pub fn view(&self, id: RecordId) -> RecordView<'_> {
        RecordView {
            id,
            path: &self.path,
            owner: &self.owner,
            size: self.size_bytes,
            flags: self.flags(),
            atime: self.atime,
            mtime: self.mtime,
            ctime: self.ctime,
        }
    }
}

/// Zero-copy view of one record, borrowed from whichever source produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordView<'a> {
    pub id: RecordId,
    pub path: &'a str,
    pub owner: &'a str,
    pub size: u64,
    pub flags: RecordFlags,
    pub atime: i64,
    pub mtime: i64,
    pub ctime: i64,
}

impl RecordView<'_> {
    #[inline]
    pub fn is_dir(&self) -> bool {
        self.flags.contains(RecordFlags::IS_DIR)
    }

    #[inline]
    pub fn timestamp(&self, kind: TimestampKind) -> i64 {
        match kind {
            TimestampKind::Atime => self.atime,
            TimestampKind::Mtime => self.mtime,
            TimestampKind::Ctime => self.ctime,
        }
    }

    pub fn to_record(&self) -> ObjectRecord {
        ObjectRecord {
            path: self.path.to_owned(),
            is_dir: self.is_dir(),
            size_bytes: self.size,
            owner: self.owner.to_owned(),
            atime: self.atime,
            mtime: self.mtime,
            ctime: self.ctime,
        }
    }
}
