mod error;
mod format;
mod memory;
mod reader;
mod record;
mod source;
mod writer;

pub use error::StoreError;
pub use format::{STORE_MAGIC, STORE_VERSION, SectionDesc, StoreHeader, StoreMeta};
pub use memory::MemoryStore;
pub use reader::RecordStore;
pub use record::{ObjectRecord, RecordFlags, RecordId, RecordView, TimestampKind};
pub use source::{AcceptAll, RecordPredicate, RecordSource, Scan};
pub use writer::{StagedStore, StoreBuilder, write_store_atomic, write_store_to};
