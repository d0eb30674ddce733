//! History entries and the post-deletion archive
//!
//! Every mutation appends one `HistoryEntry` to its record. Entries are
//! never modified or removed once written; when a record is deleted, its
//! full entry sequence (including the final `delete` entry) is copied to
//! the `history_archive` collection before the record goes away.

use bson::{doc, oid::ObjectId, Bson, DateTime, Document};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};

use crate::db::mongo::{IntoIndexes, MutMetadata};
use crate::db::schemas::Metadata;

/// Collection name for archived histories of deleted records
pub const HISTORY_ARCHIVE_COLLECTION: &str = "history_archive";

/// What a history entry records
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum HistoryAction {
    Create,
    Update,
    Delete,
}

/// Immutable audit entry embedded in each record
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct HistoryEntry {
    /// What happened
    pub action: HistoryAction,

    /// Acting identity at the time of the action
    #[serde(rename = "userId")]
    pub user_id: String,

    /// When the action was recorded
    pub timestamp: DateTime,

    /// Opaque snapshot: the request payload for create/update, the
    /// pre-deletion record state for delete
    pub details: Bson,
}

impl HistoryEntry {
    /// Build an entry stamped with the current time
    pub fn new(action: HistoryAction, user_id: &str, details: Bson) -> Self {
        Self {
            action,
            user_id: user_id.to_string(),
            timestamp: DateTime::now(),
            details,
        }
    }
}

/// Archived history of a deleted record
///
/// Written once, immediately before the record itself is removed. Never
/// updated afterwards.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct HistoryArchiveDoc {
    /// MongoDB document ID
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,

    /// Common metadata (createdAt, updatedAt)
    #[serde(default)]
    pub metadata: Metadata,

    /// The deleted record's id
    #[serde(rename = "recordId")]
    pub record_id: ObjectId,

    /// Record kind ("land" or "participator")
    pub kind: String,

    /// Identity that deleted the record
    #[serde(rename = "deletedBy")]
    pub deleted_by: String,

    /// Full entry sequence, ending with the `delete` entry
    pub entries: Vec<HistoryEntry>,
}

impl Default for HistoryArchiveDoc {
    fn default() -> Self {
        Self {
            id: None,
            metadata: Metadata::default(),
            record_id: ObjectId::new(),
            kind: String::new(),
            deleted_by: String::new(),
            entries: Vec::new(),
        }
    }
}

impl IntoIndexes for HistoryArchiveDoc {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![
            (
                doc! { "recordId": 1 },
                Some(
                    IndexOptions::builder()
                        .name("record_id_index".to_string())
                        .build(),
                ),
            ),
            (
                doc! { "deletedBy": 1 },
                Some(
                    IndexOptions::builder()
                        .name("deleted_by_index".to_string())
                        .build(),
                ),
            ),
        ]
    }
}

impl MutMetadata for HistoryArchiveDoc {
    fn mut_metadata(&mut self) -> &mut Metadata {
        &mut self.metadata
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_carries_actor_and_action() {
        let details = Bson::Document(doc! { "name": "Plot A" });
        let entry = HistoryEntry::new(HistoryAction::Create, "u1", details.clone());

        assert_eq!(entry.action, HistoryAction::Create);
        assert_eq!(entry.user_id, "u1");
        assert_eq!(entry.details, details);
    }

    #[test]
    fn test_action_serializes_lowercase() {
        // Wire format matches the original log entries: "create"/"update"/"delete"
        let entry = HistoryEntry::new(HistoryAction::Delete, "u1", Bson::Null);
        let doc = bson::to_document(&entry).unwrap();

        assert_eq!(doc.get_str("action").unwrap(), "delete");
        assert_eq!(doc.get_str("userId").unwrap(), "u1");
        assert!(doc.get_datetime("timestamp").is_ok());
    }

    #[test]
    fn test_archive_roundtrip() {
        let record_id = ObjectId::new();
        let archive = HistoryArchiveDoc {
            id: None,
            metadata: Metadata::default(),
            record_id,
            kind: "land".to_string(),
            deleted_by: "u1".to_string(),
            entries: vec![
                HistoryEntry::new(HistoryAction::Create, "u1", Bson::Null),
                HistoryEntry::new(HistoryAction::Delete, "u1", Bson::Null),
            ],
        };

        let doc = bson::to_document(&archive).unwrap();
        let back: HistoryArchiveDoc = bson::from_document(doc).unwrap();

        assert_eq!(back.record_id, record_id);
        assert_eq!(back.entries.len(), 2);
        assert_eq!(back.entries.last().unwrap().action, HistoryAction::Delete);
    }
}
