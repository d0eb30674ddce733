//! Ownership-scoped CRUD over record collections
//!
//! Every operation is parameterized by the acting identity resolved at the
//! auth gate, and every lookup filter carries the `createdBy` predicate
//! alongside the id. A missing id and another user's id therefore produce
//! the same miss, and no operation can observe a foreign record.
//!
//! Mutations append one immutable history entry each. Creation embeds the
//! seed entry in the same document insert, so a record can never exist
//! without it. Deletion archives the full trail before the record is
//! removed.
//!
//! No transactions are used: a race between two updates on the same record
//! interleaves last-write-wins on fields while both history entries land in
//! driver write order.

use bson::{doc, oid::ObjectId, Bson, DateTime, Document};
use serde::{de::DeserializeOwned, Serialize};
use tracing::debug;

use crate::db::mongo::{IntoIndexes, MongoClient, MongoCollection, MutMetadata};
use crate::db::schemas::{
    HistoryAction, HistoryArchiveDoc, HistoryEntry, Metadata, HISTORY_ARCHIVE_COLLECTION,
};
use crate::types::{LandgateError, Result};

/// A record kind the store can manage
///
/// Implemented by the schema documents; ties together the collection name,
/// the kind labels used in client-facing messages, and the request payload
/// type with its full-replace application.
pub trait OwnedRecord:
    Serialize
    + DeserializeOwned
    + Unpin
    + Send
    + Sync
    + Default
    + Clone
    + IntoIndexes
    + MutMetadata
{
    /// Request payload for create and update
    type Payload: Serialize + DeserializeOwned + Send + Sync;

    /// MongoDB collection this kind lives in
    const COLLECTION: &'static str;

    /// Lowercase kind label ("land")
    const KIND: &'static str;

    /// Capitalized kind label for messages ("Land")
    const KIND_LABEL: &'static str;

    /// Build a fresh document from a payload, owned by `uid`
    fn from_payload(payload: &Self::Payload, uid: &str) -> Self;

    fn history(&self) -> &[HistoryEntry];

    fn history_mut(&mut self) -> &mut Vec<HistoryEntry>;
}

/// Filter matching all records owned by `uid`
pub fn owner_filter(uid: &str) -> Document {
    doc! { "createdBy": uid }
}

/// Filter matching one record by id, scoped to its owner
pub fn owned_filter(uid: &str, id: &ObjectId) -> Document {
    doc! { "_id": id, "createdBy": uid }
}

/// The ownership-scoped miss for a record kind
fn not_found<T: OwnedRecord>() -> LandgateError {
    LandgateError::NotFound(format!("{} record not found", T::KIND_LABEL))
}

fn payload_snapshot<P: Serialize>(payload: &P) -> Result<Bson> {
    bson::to_bson(payload).map_err(|e| LandgateError::Serialization(e.to_string()))
}

/// Build the update command applying a payload wholesale
///
/// The `$set` document is built only from payload fields plus `updatedBy`
/// and the metadata timestamp, so `createdBy` and existing history entries
/// are untouched by construction; the new entry arrives via `$push`.
fn replace_update<T: OwnedRecord>(
    payload: &T::Payload,
    uid: &str,
    entry: &HistoryEntry,
) -> Result<Document> {
    let mut set =
        bson::to_document(payload).map_err(|e| LandgateError::Serialization(e.to_string()))?;
    set.insert("updatedBy", uid);
    set.insert("metadata.updatedAt", DateTime::now());

    let entry_bson =
        bson::to_bson(entry).map_err(|e| LandgateError::Serialization(e.to_string()))?;

    Ok(doc! {
        "$set": set,
        "$push": { "history": entry_bson },
    })
}

/// Build the archive document for a record about to be deleted
///
/// The final `delete` entry captures the pre-deletion domain state; the
/// trail itself is carried by the archive's entry sequence, so the snapshot
/// drops the embedded history rather than nesting it.
fn build_archive<T: OwnedRecord>(
    record: &T,
    uid: &str,
    id: &ObjectId,
) -> Result<HistoryArchiveDoc> {
    let mut snapshot =
        bson::to_document(record).map_err(|e| LandgateError::Serialization(e.to_string()))?;
    snapshot.remove("history");

    let mut entries = record.history().to_vec();
    entries.push(HistoryEntry::new(
        HistoryAction::Delete,
        uid,
        Bson::Document(snapshot),
    ));

    Ok(HistoryArchiveDoc {
        id: None,
        metadata: Metadata::default(),
        record_id: *id,
        kind: T::KIND.to_string(),
        deleted_by: uid.to_string(),
        entries,
    })
}

/// Ownership-scoped store for one record kind
pub struct RecordStore<T: OwnedRecord> {
    records: MongoCollection<T>,
    archive: MongoCollection<HistoryArchiveDoc>,
}

impl<T: OwnedRecord> RecordStore<T> {
    /// Open the kind's collection (and the shared history archive)
    pub async fn open(mongo: &MongoClient) -> Result<Self> {
        Ok(Self {
            records: mongo.collection::<T>(T::COLLECTION).await?,
            archive: mongo
                .collection::<HistoryArchiveDoc>(HISTORY_ARCHIVE_COLLECTION)
                .await?,
        })
    }

    /// All records owned by `uid`
    ///
    /// An empty vector is a successful outcome here; the route layer decides
    /// how to report it (the wire contract reports it as not-found).
    pub async fn list(&self, uid: &str) -> Result<Vec<T>> {
        self.records.find_many(owner_filter(uid)).await
    }

    /// One record by id, scoped to `uid`
    ///
    /// A nonexistent id and another user's id are indistinguishable.
    pub async fn get(&self, uid: &str, id: &ObjectId) -> Result<T> {
        self.records
            .find_one(owned_filter(uid, id))
            .await?
            .ok_or_else(not_found::<T>)
    }

    /// Create a record owned by `uid`, seeded with its `create` entry
    ///
    /// The seed entry is embedded in the same document insert: the record
    /// and its history cannot partially persist.
    pub async fn create(&self, uid: &str, payload: &T::Payload) -> Result<ObjectId> {
        let entry = HistoryEntry::new(HistoryAction::Create, uid, payload_snapshot(payload)?);

        let mut record = T::from_payload(payload, uid);
        record.history_mut().push(entry);

        let id = self.records.insert_one(record).await?;
        debug!(kind = T::KIND, %id, "record created");
        Ok(id)
    }

    /// Replace a record's fields and append an `update` entry
    ///
    /// Full-replace semantics: payload fields overwrite wholesale, omitted
    /// fields are cleared. Returns the updated record.
    pub async fn update(&self, uid: &str, id: &ObjectId, payload: &T::Payload) -> Result<T> {
        let filter = owned_filter(uid, id);

        // Ownership-scoped existence check; miss short-circuits without
        // revealing whether the id exists under another identity
        if self.records.find_one(filter.clone()).await?.is_none() {
            return Err(not_found::<T>());
        }

        let entry = HistoryEntry::new(HistoryAction::Update, uid, payload_snapshot(payload)?);
        let update = replace_update::<T>(payload, uid, &entry)?;

        self.records.update_one(filter.clone(), update).await?;
        debug!(kind = T::KIND, %id, "record updated");

        self.records
            .find_one(filter)
            .await?
            .ok_or_else(not_found::<T>)
    }

    /// Delete a record, preserving its full history in the archive
    ///
    /// The final `delete` entry captures the pre-deletion state; the archive
    /// write happens before the record is removed, so the trail survives
    /// even though the record disappears.
    pub async fn delete(&self, uid: &str, id: &ObjectId) -> Result<()> {
        let filter = owned_filter(uid, id);

        let record = self
            .records
            .find_one(filter.clone())
            .await?
            .ok_or_else(not_found::<T>)?;

        self.archive
            .insert_one(build_archive(&record, uid, id)?)
            .await?;

        self.records.delete_one(filter).await?;
        debug!(kind = T::KIND, %id, "record deleted, history archived");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::schemas::{LandDoc, LandPayload};

    #[test]
    fn test_owner_filter_shape() {
        let filter = owner_filter("u1");
        assert_eq!(filter.get_str("createdBy").unwrap(), "u1");
        assert_eq!(filter.len(), 1);
    }

    #[test]
    fn test_owned_filter_carries_both_predicates() {
        let id = ObjectId::new();
        let filter = owned_filter("u1", &id);

        assert_eq!(filter.get_object_id("_id").unwrap(), id);
        assert_eq!(filter.get_str("createdBy").unwrap(), "u1");
        assert_eq!(filter.len(), 2);
    }

    #[test]
    fn test_not_found_message_does_not_distinguish_cases() {
        // The same error for "absent" and "foreign" ids; the message names
        // only the kind
        let err = not_found::<LandDoc>();
        assert_eq!(err.to_string(), "Land record not found");
    }

    #[test]
    fn test_replace_update_clears_omitted_fields() {
        let payload = LandPayload {
            name: Some("Plot B".into()),
            ..Default::default()
        };
        let entry = HistoryEntry::new(HistoryAction::Update, "u1", Bson::Null);
        let update = replace_update::<LandDoc>(&payload, "u1", &entry).unwrap();

        let set = update.get_document("$set").unwrap();
        assert_eq!(set.get_str("name").unwrap(), "Plot B");
        assert!(matches!(set.get("location"), Some(Bson::Null)));
        assert!(matches!(set.get("notes"), Some(Bson::Null)));
        assert_eq!(set.get_str("updatedBy").unwrap(), "u1");
        assert!(set.get("metadata.updatedAt").is_some());

        // Never touches ownership or rewrites the trail
        assert!(set.get("createdBy").is_none());
        assert!(set.get("history").is_none());
        let push = update.get_document("$push").unwrap();
        assert!(push.get_document("history").is_ok());
    }

    #[test]
    fn test_replace_update_entry_is_pushed_not_set() {
        let payload = LandPayload::default();
        let entry = HistoryEntry::new(HistoryAction::Update, "u1", Bson::Null);
        let update = replace_update::<LandDoc>(&payload, "u1", &entry).unwrap();

        let pushed = update
            .get_document("$push")
            .unwrap()
            .get_document("history")
            .unwrap();
        assert_eq!(pushed.get_str("action").unwrap(), "update");
        assert_eq!(pushed.get_str("userId").unwrap(), "u1");
    }

    #[test]
    fn test_build_archive_ends_with_delete_entry() {
        let payload = LandPayload {
            name: Some("Plot A".into()),
            ..Default::default()
        };
        let mut record = LandDoc::from_payload(&payload, "u1");
        record
            .history
            .push(HistoryEntry::new(HistoryAction::Create, "u1", Bson::Null));
        record
            .history
            .push(HistoryEntry::new(HistoryAction::Update, "u1", Bson::Null));

        let id = ObjectId::new();
        let archive = build_archive(&record, "u1", &id).unwrap();

        // Full sequence plus the final delete entry
        assert_eq!(archive.entries.len(), 3);
        assert_eq!(archive.entries.last().unwrap().action, HistoryAction::Delete);
        assert_eq!(archive.record_id, id);
        assert_eq!(archive.kind, "land");
        assert_eq!(archive.deleted_by, "u1");
    }

    #[test]
    fn test_build_archive_snapshot_captures_state_without_nesting_history() {
        let payload = LandPayload {
            name: Some("Plot A".into()),
            ..Default::default()
        };
        let mut record = LandDoc::from_payload(&payload, "u1");
        record
            .history
            .push(HistoryEntry::new(HistoryAction::Create, "u1", Bson::Null));

        let archive = build_archive(&record, "u1", &ObjectId::new()).unwrap();

        let details = archive
            .entries
            .last()
            .unwrap()
            .details
            .as_document()
            .unwrap();
        assert_eq!(details.get_str("name").unwrap(), "Plot A");
        assert_eq!(details.get_str("createdBy").unwrap(), "u1");
        assert!(details.get("history").is_none());
    }

    #[test]
    fn test_payload_snapshot_preserves_fields() {
        let payload = LandPayload {
            name: Some("Plot A".into()),
            size: Some("10".into()),
            ..Default::default()
        };
        let snapshot = payload_snapshot(&payload).unwrap();
        let doc = snapshot.as_document().unwrap();
        assert_eq!(doc.get_str("name").unwrap(), "Plot A");
        assert_eq!(doc.get_str("size").unwrap(), "10");
    }
}
