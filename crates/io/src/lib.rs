// Action log I/O: raw log ingestion and the indexed store

pub mod error;
pub mod raw;
pub mod store;

pub use error::{StoreError, StoreResult};
pub use raw::{RawAction, RawLogReader};
pub use store::{
    store_path_for, ActionRecord, LogMeta, LogStore, ReplayRecord, INSERT_BATCH_SIZE, STORE_EXTENSION,
    STORE_FORMAT_VERSION,
};
