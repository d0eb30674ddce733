//! Database schemas for landgate
//!
//! Defines MongoDB document structures for land and participator records,
//! their embedded history entries, and the post-deletion history archive.

mod history;
mod land;
mod metadata;
mod participator;

pub use history::{
    HistoryAction, HistoryArchiveDoc, HistoryEntry, HISTORY_ARCHIVE_COLLECTION,
};
pub use land::{LandDoc, LandPayload, LAND_COLLECTION};
pub use metadata::Metadata;
pub use participator::{ParticipatorDoc, ParticipatorPayload, PARTICIPATOR_COLLECTION};
