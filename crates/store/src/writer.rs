use std::{
    fs::{self, File},
    io::{self, BufWriter, Write},
    path::Path,
    time::{SystemTime, UNIX_EPOCH},
};

use bytemuck::{bytes_of, cast_slice};
use hashbrown::HashMap;
use log::debug;
use tempfile::NamedTempFile;

use crate::{
    error::StoreError,
    format::{
        SECTION_ALIGNMENT, STORE_MAGIC, STORE_VERSION, SectionDesc, StoreHeader, StoreMeta,
        align_up,
    },
    record::ObjectRecord,
};

/// Column-oriented copy of a record set, ready to be written.
#[derive(Debug, Default)]
pub struct StagedStore {
    pub created_secs: i64,
    pub root_path_offset: u64,
    pub root_path_len: u64,
    pub owners: Vec<String>,
    pub path_offsets: Vec<u64>,
    pub paths_blob: Vec<u8>,
    pub sizes: Vec<u64>,
    pub atimes: Vec<i64>,
    pub mtimes: Vec<i64>,
    pub ctimes: Vec<i64>,
    pub owner_ids: Vec<u32>,
    pub flags: Vec<u8>,
}

impl StagedStore {
    pub fn record_count(&self) -> usize {
        self.sizes.len()
    }
}

/// Ingests [ObjectRecord]s and splits them into columns.
///
/// Records keep their insertion order; ids in the written store are
/// positions in that order.
#[derive(Debug)]
pub struct StoreBuilder {
    root: Option<String>,
    created_secs: Option<i64>,
    staged: StagedStore,
    owner_map: HashMap<String, u32>,
}

impl Default for StoreBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl StoreBuilder {
    pub fn new() -> Self {
        let staged = StagedStore {
            path_offsets: vec![0],
            ..StagedStore::default()
        };
        Self {
            root: None,
            created_secs: None,
            staged,
            owner_map: HashMap::new(),
        }
    }

    /// Record the root directory the snapshot was taken from.
    pub fn with_root(mut self, root: impl Into<String>) -> Self {
        self.root = Some(root.into());
        self
    }

    /// Override the snapshot time. Defaults to the moment `finish` runs.
    pub fn with_created_at(mut self, secs: i64) -> Self {
        self.created_secs = Some(secs);
        self
    }

    fn intern_owner(&mut self, owner: &str) -> u32 {
        if let Some(&id) = self.owner_map.get(owner) {
            return id;
        }
        let id = self.staged.owners.len() as u32;
        self.staged.owners.push(owner.to_owned());
        self.owner_map.insert(owner.to_owned(), id);
        id
    }

    pub fn add(&mut self, record: &ObjectRecord) {
        let owner_id = self.intern_owner(&record.owner);
        let s = &mut self.staged;

        s.paths_blob.extend_from_slice(record.path.as_bytes());
        s.path_offsets.push(s.paths_blob.len() as u64);
        s.sizes.push(record.size_bytes);
        s.atimes.push(record.atime);
        s.mtimes.push(record.mtime);
        s.ctimes.push(record.ctime);
        s.owner_ids.push(owner_id);
        s.flags.push(record.flags().bits());
    }

    pub fn add_batch<'r, I>(&mut self, records: I)
    where
        I: IntoIterator<Item = &'r ObjectRecord>,
    {
        for record in records {
            self.add(record);
        }
    }

    pub fn finish(self) -> StagedStore {
        let mut staged = self.staged;

        staged.created_secs = self.created_secs.unwrap_or_else(|| {
            SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_secs() as i64)
                .unwrap_or(0)
        });

        // Root path lives after the last record path.
        let root = self.root.unwrap_or_default();
        staged.root_path_offset = staged.paths_blob.len() as u64;
        staged.root_path_len = root.len() as u64;
        staged.paths_blob.extend_from_slice(root.as_bytes());

        debug!(
            "staged {} records, {} owners, {} path bytes",
            staged.record_count(),
            staged.owners.len(),
            staged.paths_blob.len()
        );

        staged
    }
}

/// Encode owner table as NUL-terminated UTF-8 names.
fn encode_owner_table(owners: &[String]) -> Vec<u8> {
    let mut buf = Vec::new();
    for owner in owners {
        buf.extend_from_slice(owner.as_bytes());
        buf.push(0);
    }
    buf
}

/// Write a [StagedStore] to an open file positioned at start.
pub fn write_store_to(file: &File, staged: &StagedStore) -> io::Result<()> {
    let meta = StoreMeta {
        created_secs: staged.created_secs,
        root_path_offset: staged.root_path_offset,
        root_path_len: staged.root_path_len,
        build_flags: 0,
        _reserved: 0,
    };
    let owner_table = encode_owner_table(&staged.owners);

    // Section payloads in file order, with their alignment requirement.
    let payloads: [(&[u8], bool); 10] = [
        (bytes_of(&meta), true),
        (owner_table.as_slice(), false),
        (cast_slice(staged.path_offsets.as_slice()), true),
        (staged.paths_blob.as_slice(), false),
        (cast_slice(staged.sizes.as_slice()), true),
        (cast_slice(staged.atimes.as_slice()), true),
        (cast_slice(staged.mtimes.as_slice()), true),
        (cast_slice(staged.ctimes.as_slice()), true),
        (cast_slice(staged.owner_ids.as_slice()), true),
        (staged.flags.as_slice(), false),
    ];

    let header_size = std::mem::size_of::<StoreHeader>() as u64;
    let mut descs = [SectionDesc::new(0, 0); 10];
    let mut offset = header_size;
    for (desc, (bytes, aligned)) in descs.iter_mut().zip(payloads.iter()) {
        if *aligned {
            offset = align_up(offset, SECTION_ALIGNMENT);
        }
        *desc = SectionDesc::new(offset, bytes.len() as u64);
        offset += bytes.len() as u64;
    }

    let [
        metadata,
        owner_table_desc,
        path_offsets,
        paths_blob,
        sizes,
        atimes,
        mtimes,
        ctimes,
        owner_ids,
        flags,
    ] = descs;

    let mut header = StoreHeader {
        magic: STORE_MAGIC,
        version: STORE_VERSION,
        header_size: header_size as u32,
        header_crc32: 0,
        record_count: staged.record_count() as u64,
        owner_count: staged.owners.len() as u32,
        flags_bits: 0,
        reserved: [0u8; 16],
        metadata,
        owner_table: owner_table_desc,
        path_offsets,
        paths_blob,
        sizes,
        atimes,
        mtimes,
        ctimes,
        owner_ids,
        flags,
    };
    header.header_crc32 = header.compute_crc();

    const ZERO_PAD: [u8; SECTION_ALIGNMENT as usize] = [0u8; SECTION_ALIGNMENT as usize];

    let mut writer = BufWriter::new(file);
    writer.write_all(bytes_of(&header))?;
    let mut pos = header_size;

    for (desc, (bytes, _)) in descs.iter().zip(payloads.iter()) {
        debug_assert!(desc.offset >= pos);
        let padding = (desc.offset - pos) as usize;
        writer.write_all(&ZERO_PAD[..padding])?;
        writer.write_all(bytes)?;
        pos = desc.offset + desc.len;
    }

    writer.flush()?;
    Ok(())
}

/// Write the store to a temp file next to `path`, then rename it into place.
pub fn write_store_atomic(path: &Path, staged: &StagedStore) -> Result<(), StoreError> {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    fs::create_dir_all(parent).map_err(|e| StoreError::io(parent, e))?;

    let tmp = NamedTempFile::new_in(parent).map_err(|e| StoreError::io(parent, e))?;
    write_store_to(tmp.as_file(), staged).map_err(|e| StoreError::io(tmp.path(), e))?;
    tmp.as_file()
        .sync_all()
        .map_err(|e| StoreError::io(tmp.path(), e))?;

    tmp.persist(path)
        .map_err(|e| StoreError::io(path, e.error))?;

    #[cfg(unix)]
    {
        if let Ok(dir) = File::open(parent) {
            let _ = dir.sync_all();
        }
    }

    Ok(())
}
