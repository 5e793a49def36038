use std::{fs::File, mem, ops::Range, path::Path, str};

use bytemuck::{Pod, cast_slice, from_bytes, pod_read_unaligned};
use chrono::{DateTime, Utc};
use log::{debug, warn};
use memmap2::{Mmap, MmapOptions};

use crate::{
    error::StoreError,
    format::{
        SECTION_ALIGNMENT, STORE_MAGIC, STORE_VERSION, SectionDesc, StoreHeader, StoreMeta,
    },
    record::{RecordFlags, RecordId, RecordView},
    source::RecordSource,
};

/// The on-disk, mmap'd record store.
///
/// Every column is validated once in [RecordStore::open]; accessors after
/// that slice the map directly without copying.
pub struct RecordStore {
    mmap: Mmap,
    header: StoreHeader,
    meta: StoreMeta,
    record_count: usize,
    owners: Vec<String>,
}

impl RecordStore {
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        let file = File::open(path).map_err(|e| StoreError::io(path, e))?;
        // SAFETY: stores are replaced by rename, never rewritten in place.
        let mmap = unsafe { MmapOptions::new().map(&file) }.map_err(|e| StoreError::io(path, e))?;
        let store = Self::from_mmap(mmap)?;

        debug!(
            "opened {}: {} records, {} owners",
            path.display(),
            store.record_count,
            store.owners.len()
        );
        let modified = file
            .metadata()
            .and_then(|m| m.modified())
            .ok()
            .map(DateTime::<Utc>::from);
        if let Some(notice) = snapshot_notice(path, store.created_at(), modified) {
            warn!("{notice}");
        }

        Ok(store)
    }

    fn from_mmap(mmap: Mmap) -> Result<Self, StoreError> {
        let header = read_header(&mmap)?;
        verify_sections(&mmap, &header)?;

        let record_count = usize::try_from(header.record_count)
            .map_err(|_| StoreError::TooManyRecords(header.record_count))?;

        verify_column_lengths(&header, record_count)?;

        let meta_bytes = section_bytes(&mmap, &header.metadata);
        let meta: StoreMeta = pod_read_unaligned(&meta_bytes[..mem::size_of::<StoreMeta>()]);
        let owners = decode_owner_table(&mmap, &header)?;

        let store = Self {
            mmap,
            header,
            meta,
            record_count,
            owners,
        };
        store.verify_records()?;

        Ok(store)
    }

    #[inline]
    fn column<T: Pod>(&self, range: Range<usize>) -> &[T] {
        cast_slice(&self.mmap[range])
    }

    #[inline]
    fn path_offsets(&self) -> &[u64] {
        self.column(section_range(&self.header.path_offsets))
    }

    #[inline]
    fn paths_blob(&self) -> &[u8] {
        &self.mmap[section_range(&self.header.paths_blob)]
    }

    #[inline]
    fn sizes(&self) -> &[u64] {
        self.column(section_range(&self.header.sizes))
    }

    #[inline]
    fn atimes(&self) -> &[i64] {
        self.column(section_range(&self.header.atimes))
    }

    #[inline]
    fn mtimes(&self) -> &[i64] {
        self.column(section_range(&self.header.mtimes))
    }

    #[inline]
    fn ctimes(&self) -> &[i64] {
        self.column(section_range(&self.header.ctimes))
    }

    #[inline]
    fn owner_ids(&self) -> &[u32] {
        self.column(section_range(&self.header.owner_ids))
    }

    #[inline]
    fn flags(&self) -> &[u8] {
        &self.mmap[section_range(&self.header.flags)]
    }

    fn path_str(&self, id: RecordId) -> Option<&str> {
        let offsets = self.path_offsets();
        let start = usize::try_from(*offsets.get(id)?).ok()?;
        let end = usize::try_from(*offsets.get(id + 1)?).ok()?;
        let bytes = self.paths_blob().get(start..end)?;
        str::from_utf8(bytes).ok()
    }

    /// Walk every record once so that later accessors cannot fail.
    fn verify_records(&self) -> Result<(), StoreError> {
        let corrupt = |id: usize, reason| StoreError::CorruptRecord {
            id: id as u64,
            reason,
        };

        let offsets = self.path_offsets();
        let blob_len = self.paths_blob().len() as u64;
        if offsets.first().copied() != Some(0) {
            return Err(corrupt(0, "path offsets do not start at zero"));
        }
        for id in 0..self.record_count {
            if offsets[id] > offsets[id + 1] || offsets[id + 1] > blob_len {
                return Err(corrupt(id, "path offsets out of order"));
            }
            if self.path_str(id).is_none() {
                return Err(corrupt(id, "path is not valid UTF-8"));
            }
        }

        let owner_count = self.owners.len() as u32;
        if let Some(id) = self.owner_ids().iter().position(|&o| o >= owner_count) {
            return Err(corrupt(id, "owner id outside the owner table"));
        }

        if self.root_path_range().is_none() {
            return Err(StoreError::SectionOutOfBounds { name: "root_path" });
        }

        Ok(())
    }

    fn root_path_range(&self) -> Option<Range<usize>> {
        let start = usize::try_from(self.meta.root_path_offset).ok()?;
        let end = start.checked_add(usize::try_from(self.meta.root_path_len).ok()?)?;
        (end <= self.paths_blob().len()).then_some(start..end)
    }

    pub fn owner_count(&self) -> usize {
        self.owners.len()
    }

    pub fn owners(&self) -> &[String] {
        &self.owners
    }
}

impl RecordSource for RecordStore {
    fn record_count(&self) -> usize {
        self.record_count
    }

    fn get(&self, id: RecordId) -> Option<RecordView<'_>> {
        if id >= self.record_count {
            return None;
        }
        let owner = self.owners.get(self.owner_ids()[id] as usize)?;
        Some(RecordView {
            id,
            path: self.path_str(id)?,
            owner,
            size: self.sizes()[id],
            flags: RecordFlags::from_bits_truncate(self.flags()[id]),
            atime: self.atimes()[id],
            mtime: self.mtimes()[id],
            ctime: self.ctimes()[id],
        })
    }

    fn root_path(&self) -> Option<&str> {
        let range = self.root_path_range()?;
        if range.is_empty() {
            return None;
        }
        str::from_utf8(&self.paths_blob()[range]).ok()
    }

    fn created_at(&self) -> Option<DateTime<Utc>> {
        if self.meta.created_secs <= 0 {
            return None;
        }
        DateTime::from_timestamp(self.meta.created_secs, 0)
    }
}

/// How old the data is. The snapshot time wins; the file's modification
/// time stands in when the builder recorded none.
pub(crate) fn snapshot_notice(
    path: &Path,
    created: Option<DateTime<Utc>>,
    modified: Option<DateTime<Utc>>,
) -> Option<String> {
    const STAMP: &str = "%Y-%m-%d %H:%M:%S UTC";

    let when = match (created, modified) {
        (Some(created), _) => format!("The data was collected on {}", created.format(STAMP)),
        (None, Some(modified)) => format!(
            "The file {} was last modified on {}",
            path.display(),
            modified.format(STAMP)
        ),
        (None, None) => return None,
    };
    Some(format!("{when}; reported usage is a snapshot from around that time"))
}

#[inline]
fn section_range(desc: &SectionDesc) -> Range<usize> {
    let start = desc.offset as usize;
    start..start + desc.len as usize
}

#[inline]
fn section_bytes<'m>(mmap: &'m Mmap, desc: &SectionDesc) -> &'m [u8] {
    &mmap[section_range(desc)]
}

fn read_header(mmap: &Mmap) -> Result<StoreHeader, StoreError> {
    let header_size = mem::size_of::<StoreHeader>();
    if mmap.len() < header_size {
        return Err(StoreError::TooSmall { len: mmap.len() });
    }

    let header: StoreHeader = *from_bytes(&mmap[..header_size]);

    if header.magic != STORE_MAGIC {
        return Err(StoreError::BadMagic {
            found: header.magic,
        });
    }
    if header.version != STORE_VERSION {
        return Err(StoreError::VersionMismatch {
            found: header.version,
            expected: STORE_VERSION,
        });
    }

    let computed = header.compute_crc();
    if computed != header.header_crc32 {
        return Err(StoreError::ChecksumMismatch {
            stored: header.header_crc32,
            computed,
        });
    }

    Ok(header)
}

fn verify_sections(mmap: &Mmap, header: &StoreHeader) -> Result<(), StoreError> {
    let file_len = mmap.len() as u64;

    for (name, section, aligned) in header.sections() {
        match section.end() {
            Some(end) if end <= file_len && usize::try_from(end).is_ok() => {}
            _ => return Err(StoreError::SectionOutOfBounds { name }),
        }
        if aligned && section.offset % SECTION_ALIGNMENT != 0 {
            return Err(StoreError::Misaligned {
                name,
                align: SECTION_ALIGNMENT,
            });
        }
    }

    if header.metadata.len < mem::size_of::<StoreMeta>() as u64 {
        return Err(StoreError::SectionOutOfBounds { name: "metadata" });
    }

    Ok(())
}

fn verify_column_lengths(header: &StoreHeader, record_count: usize) -> Result<(), StoreError> {
    let n = record_count as u64;
    let offsets = n
        .checked_add(1)
        .ok_or(StoreError::TooManyRecords(header.record_count))?;
    let columns = [
        ("path_offsets", header.path_offsets.len, 8, offsets),
        ("sizes", header.sizes.len, 8, n),
        ("atimes", header.atimes.len, 8, n),
        ("mtimes", header.mtimes.len, 8, n),
        ("ctimes", header.ctimes.len, 8, n),
        ("owner_ids", header.owner_ids.len, 4, n),
        ("flags", header.flags.len, 1, n),
    ];

    for (name, len_bytes, width, expected) in columns {
        if len_bytes % width != 0 || len_bytes / width != expected {
            return Err(StoreError::ColumnLength {
                name,
                found: len_bytes / width,
                expected,
            });
        }
    }

    Ok(())
}

/// Decode the NUL-terminated owner names.
fn decode_owner_table(mmap: &Mmap, header: &StoreHeader) -> Result<Vec<String>, StoreError> {
    let bytes = section_bytes(mmap, &header.owner_table);
    let expected = header.owner_count as usize;

    let owners = bytes
        .split(|b| *b == 0)
        .take(expected)
        .map(|part| {
            str::from_utf8(part)
                .map(str::to_owned)
                .map_err(|_| StoreError::InvalidOwnerTable)
        })
        .collect::<Result<Vec<_>, _>>()?;

    if owners.len() != expected {
        return Err(StoreError::ColumnLength {
            name: "owner_table",
            found: owners.len() as u64,
            expected: expected as u64,
        });
    }

    Ok(owners)
}

#[cfg(test)]
#[path = "reader_tests.rs"]
mod tests;
