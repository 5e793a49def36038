use std::sync::{
    Mutex, MutexGuard, PoisonError,
    atomic::{AtomicU64, Ordering},
};

use anyhow::Context;
use rollup_protocol::StoreStatus;
use rollup_store::{RecordSource, RecordStore};

use crate::config::DaemonConfig;

pub struct DaemonState {
    pub config: DaemonConfig,
    store: RecordStore,
    /// Held for the duration of each report.
    query_lock: Mutex<()>,
    reports_served: AtomicU64,
}

impl DaemonState {
    pub fn new(config: DaemonConfig) -> anyhow::Result<Self> {
        let store = RecordStore::open(&config.index_path).with_context(|| {
            format!(
                "Failed to open record store at {}",
                config.index_path.display()
            )
        })?;
        Ok(Self::with_store(config, store))
    }

    pub fn with_store(config: DaemonConfig, store: RecordStore) -> Self {
        Self {
            config,
            store,
            query_lock: Mutex::new(()),
            reports_served: AtomicU64::new(0),
        }
    }

    /// Exclusive access to the store for one query.
    pub fn lock_store(&self) -> (MutexGuard<'_, ()>, &RecordStore) {
        // The guarded value is `()`, so a poisoned lock holds nothing broken.
        let guard = self
            .query_lock
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        (guard, &self.store)
    }

    pub fn note_report(&self) {
        self.reports_served.fetch_add(1, Ordering::Relaxed);
    }

    pub fn status(&self) -> StoreStatus {
        StoreStatus {
            index_path: self.config.index_path.display().to_string(),
            root: self.store.root_path().map(str::to_owned),
            records: self.store.record_count() as u64,
            owners: self.store.owner_count() as u64,
            created_secs: self.store.created_at().map(|t| t.timestamp()),
            reports_served: self.reports_served.load(Ordering::Relaxed),
        }
    }
}
