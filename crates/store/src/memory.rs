use chrono::{DateTime, Utc};

use crate::{
    record::{ObjectRecord, RecordId, RecordView},
    source::RecordSource,
};

/// A record source held entirely in memory.
///
/// Used by tests and by callers that already have their records in hand and
/// do not want to round-trip through a store file.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    records: Vec<ObjectRecord>,
    root: Option<String>,
    created_at: Option<DateTime<Utc>>,
}

impl MemoryStore {
    pub fn new(records: Vec<ObjectRecord>) -> Self {
        Self {
            records,
            root: None,
            created_at: None,
        }
    }

    pub fn with_root(mut self, root: impl Into<String>) -> Self {
        self.root = Some(root.into());
        self
    }

    pub fn with_created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = Some(created_at);
        self
    }

    pub fn push(&mut self, record: ObjectRecord) {
        self.records.push(record);
    }

    pub fn records(&self) -> &[ObjectRecord] {
        &self.records
    }
}

impl FromIterator<ObjectRecord> for MemoryStore {
    fn from_iter<T: IntoIterator<Item = ObjectRecord>>(iter: T) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

impl RecordSource for MemoryStore {
    fn record_count(&self) -> usize {
        self.records.len()
    }

    fn get(&self, id: RecordId) -> Option<RecordView<'_>> {
        self.records.get(id).map(|r| r.view(id))
    }

    fn root_path(&self) -> Option<&str> {
        self.root.as_deref()
    }

    fn created_at(&self) -> Option<DateTime<Utc>> {
        self.created_at
    }
}
