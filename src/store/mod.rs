//! Owned-record store with append-only history

pub mod records;

pub use records::{owned_filter, owner_filter, OwnedRecord, RecordStore};
