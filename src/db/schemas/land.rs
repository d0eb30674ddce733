//! Land record schema
//!
//! Domain fields mirror the land registry form: free-form strings plus a
//! JSON polygon blob for map geometry.

use bson::{doc, oid::ObjectId, Document};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};

use crate::db::mongo::{IntoIndexes, MutMetadata};
use crate::db::schemas::{HistoryEntry, Metadata};
use crate::store::OwnedRecord;

/// Collection name for land records
pub const LAND_COLLECTION: &str = "lands";

/// Land document stored in MongoDB
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct LandDoc {
    /// MongoDB document ID
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,

    /// Common metadata (createdAt, updatedAt)
    #[serde(default)]
    pub metadata: Metadata,

    #[serde(default)]
    pub name: Option<String>,

    #[serde(default)]
    pub location: Option<String>,

    #[serde(default)]
    pub size: Option<String>,

    /// Registered owner as written on the deed (display field; the
    /// access-control owner is `createdBy`)
    #[serde(default)]
    pub owner: Option<String>,

    #[serde(rename = "landType", default)]
    pub land_type: Option<String>,

    #[serde(rename = "marketValue", default)]
    pub market_value: Option<String>,

    #[serde(default)]
    pub notes: Option<String>,

    /// Map geometry, free-form JSON
    #[serde(default)]
    pub polygons: Option<serde_json::Value>,

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

/// Request payload for creating or replacing a land record
///
/// Fields serialize with explicit nulls (no skip) so an update `$set` built
/// from a payload clears whatever the caller omitted: full-replace
/// semantics.
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct LandPayload {
    #[serde(default)]
    pub name: Option<String>,

    #[serde(default)]
    pub location: Option<String>,

    #[serde(default)]
    pub size: Option<String>,

    #[serde(default)]
    pub owner: Option<String>,

    #[serde(rename = "landType", default)]
    pub land_type: Option<String>,

    #[serde(rename = "marketValue", default)]
    pub market_value: Option<String>,

    #[serde(default)]
    pub notes: Option<String>,

    #[serde(default)]
    pub polygons: Option<serde_json::Value>,
}

impl OwnedRecord for LandDoc {
    type Payload = LandPayload;

    const COLLECTION: &'static str = LAND_COLLECTION;
    const KIND: &'static str = "land";
    const KIND_LABEL: &'static str = "Land";

    fn from_payload(payload: &LandPayload, uid: &str) -> Self {
        Self {
            id: None,
            metadata: Metadata::default(),
            name: payload.name.clone(),
            location: payload.location.clone(),
            size: payload.size.clone(),
            owner: payload.owner.clone(),
            land_type: payload.land_type.clone(),
            market_value: payload.market_value.clone(),
            notes: payload.notes.clone(),
            polygons: payload.polygons.clone(),
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

impl IntoIndexes for LandDoc {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![
            // Every read and write is scoped by owner
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

impl MutMetadata for LandDoc {
    fn mut_metadata(&mut self) -> &mut Metadata {
        &mut self.metadata
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_payload_sets_ownership() {
        let payload = LandPayload {
            name: Some("Plot A".into()),
            location: Some("X".into()),
            size: Some("10".into()),
            ..Default::default()
        };
        let doc = LandDoc::from_payload(&payload, "u1");

        assert_eq!(doc.created_by, "u1");
        assert_eq!(doc.updated_by, "u1");
        assert_eq!(doc.name.as_deref(), Some("Plot A"));
        assert!(doc.id.is_none());
        assert!(doc.history.is_empty());
    }

    #[test]
    fn test_payload_serializes_omitted_fields_as_null() {
        // Full-replace contract: a $set built from a payload must clear
        // whatever the caller left out
        let payload = LandPayload {
            name: Some("Plot A".into()),
            ..Default::default()
        };
        let doc = bson::to_document(&payload).unwrap();

        assert_eq!(doc.get_str("name").unwrap(), "Plot A");
        assert!(matches!(doc.get("location"), Some(bson::Bson::Null)));
        assert!(matches!(doc.get("landType"), Some(bson::Bson::Null)));
        assert!(doc.get("createdBy").is_none());
        assert!(doc.get("history").is_none());
    }

    #[test]
    fn test_doc_deserializes_with_missing_optional_fields() {
        let raw = doc! {
            "createdBy": "u1",
            "updatedBy": "u1",
        };
        let land: LandDoc = bson::from_document(raw).unwrap();
        assert_eq!(land.created_by, "u1");
        assert!(land.name.is_none());
        assert!(land.history.is_empty());
    }
}
