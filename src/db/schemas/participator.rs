//! Participator record schema

use bson::{doc, oid::ObjectId, Document};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};

use crate::db::mongo::{IntoIndexes, MutMetadata};
use crate::db::schemas::{HistoryEntry, Metadata};
use crate::store::OwnedRecord;

/// Collection name for participator records
pub const PARTICIPATOR_COLLECTION: &str = "participators";

/// Participator document stored in MongoDB
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct ParticipatorDoc {
    /// MongoDB document ID
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,

    /// Common metadata (createdAt, updatedAt)
    #[serde(default)]
    pub metadata: Metadata,

    #[serde(default)]
    pub name: Option<String>,

    /// Relationship to the land holding (heir, co-owner, tenant, ...)
    #[serde(default)]
    pub relation: Option<String>,

    /// Share of the holding, free-form
    #[serde(default)]
    pub portion: Option<String>,

    /// Identity that created the record; the ownership key
    #[serde(rename = "createdBy")]
    pub created_by: String,

    /// Identity that last mutated the record
    #[serde(rename = "updatedBy")]
    pub updated_by: String,

    /// Append-only audit trail
    #[serde(default)]
    pub history: Vec<HistoryEntry>,
}

/// Request payload for creating or replacing a participator record
///
/// Serializes with explicit nulls, same full-replace contract as land.
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct ParticipatorPayload {
    #[serde(default)]
    pub name: Option<String>,

    #[serde(default)]
    pub relation: Option<String>,

    #[serde(default)]
    pub portion: Option<String>,
}

impl OwnedRecord for ParticipatorDoc {
    type Payload = ParticipatorPayload;

    const COLLECTION: &'static str = PARTICIPATOR_COLLECTION;
    const KIND: &'static str = "participator";
    const KIND_LABEL: &'static str = "Participator";

    fn from_payload(payload: &ParticipatorPayload, uid: &str) -> Self {
        Self {
            id: None,
            metadata: Metadata::default(),
            name: payload.name.clone(),
            relation: payload.relation.clone(),
            portion: payload.portion.clone(),
            created_by: uid.to_string(),
            updated_by: uid.to_string(),
            history: Vec::new(),
        }
    }

    fn history(&self) -> &[HistoryEntry] {
        &self.history
    }

    fn history_mut(&mut self) -> &mut Vec<HistoryEntry> {
        &mut self.history
    }
}

impl IntoIndexes for ParticipatorDoc {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![
            (
                doc! { "createdBy": 1 },
                Some(
                    IndexOptions::builder()
                        .name("created_by_index".to_string())
                        .build(),
                ),
            ),
        ]
    }
}

impl MutMetadata for ParticipatorDoc {
    fn mut_metadata(&mut self) -> &mut Metadata {
        &mut self.metadata
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_payload_sets_ownership() {
        let payload = ParticipatorPayload {
            name: Some("Asha".into()),
            relation: Some("heir".into()),
            portion: Some("1/3".into()),
        };
        let doc = ParticipatorDoc::from_payload(&payload, "u2");

        assert_eq!(doc.created_by, "u2");
        assert_eq!(doc.updated_by, "u2");
        assert_eq!(doc.relation.as_deref(), Some("heir"));
        assert!(doc.history.is_empty());
    }

    #[test]
    fn test_payload_serializes_omitted_fields_as_null() {
        let payload = ParticipatorPayload {
            name: Some("Asha".into()),
            ..Default::default()
        };
        let doc = bson::to_document(&payload).unwrap();

        assert_eq!(doc.get_str("name").unwrap(), "Asha");
        assert!(matches!(doc.get("relation"), Some(bson::Bson::Null)));
        assert!(matches!(doc.get("portion"), Some(bson::Bson::Null)));
    }
}
