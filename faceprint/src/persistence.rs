use std::sync::Arc;

use chrono::{DateTime, Utc};
use faceprint_kv::KVStore;
use serde::{Deserialize, Serialize};

use crate::identity::{identity_id, Identity};
use crate::store::{DescriptorStore, StoreSnapshot};
use crate::{Embedding, FaceprintError};

/// Key under which the serialized database is stored by default.
pub const DEFAULT_STORAGE_KEY: &str = "faceprint:database";

/// Message reported when a document lacks the `faces` collection.
pub const INVALID_FORMAT: &str = "Invalid database format";

/// ISO-8601 timestamps with millisecond precision.
mod iso {
    use chrono::{DateTime, SecondsFormat, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(t: &DateTime<Utc>, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&t.to_rfc3339_opts(SecondsFormat::Millis, true))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<DateTime<Utc>, D::Error> {
        let s = String::deserialize(d)?;
        DateTime::parse_from_rfc3339(&s)
            .map(|t| t.with_timezone(&Utc))
            .map_err(serde::de::Error::custom)
    }

    pub mod option {
        use chrono::{DateTime, Utc};
        use serde::{Deserialize, Deserializer, Serializer};

        pub fn serialize<S: Serializer>(t: &Option<DateTime<Utc>>, s: S) -> Result<S::Ok, S::Error> {
            match t {
                Some(t) => super::serialize(t, s),
                None => s.serialize_none(),
            }
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(
            d: D,
        ) -> Result<Option<DateTime<Utc>>, D::Error> {
            match Option::<String>::deserialize(d)? {
                Some(s) => DateTime::parse_from_rfc3339(&s)
                    .map(|t| Some(t.with_timezone(&Utc)))
                    .map_err(serde::de::Error::custom),
                None => Ok(None),
            }
        }
    }
}

/// Serialized form of the whole database.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DatabaseDocument {
    pub faces: Vec<FaceRecord>,
    pub total_descriptors: usize,
    #[serde(with = "iso")]
    pub last_updated: DateTime<Utc>,
    #[serde(with = "iso")]
    pub exported_at: DateTime<Utc>,
}

/// Serialized form of one identity.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FaceRecord {
    pub id: String,
    pub name: String,
    pub descriptors: Vec<Embedding>,
    #[serde(with = "iso")]
    pub added_at: DateTime<Utc>,
    #[serde(
        default,
        with = "iso::option",
        skip_serializing_if = "Option::is_none"
    )]
    pub last_seen: Option<DateTime<Utc>>,
}

impl From<&Identity> for FaceRecord {
    fn from(ident: &Identity) -> Self {
        Self {
            id: ident.id.clone(),
            name: ident.display_name.clone(),
            descriptors: ident.embeddings.clone(),
            added_at: ident.created_at,
            last_seen: ident.last_seen_at,
        }
    }
}

impl FaceRecord {
    /// Rebuilds the identity. The key is re-derived from the name so that
    /// a hand-edited `id` cannot break the name → id mapping.
    fn into_identity(self) -> Result<Identity, String> {
        if self.name.trim().is_empty() {
            return Err("blank name".into());
        }
        let id = identity_id(&self.name);
        if self.descriptors.is_empty() {
            return Err("no descriptors".into());
        }
        for (i, d) in self.descriptors.iter().enumerate() {
            d.validate().map_err(|e| format!("descriptor {i}: {e}"))?;
        }
        if !self.id.is_empty() && self.id != id {
            tracing::debug!(stored = %self.id, derived = %id, "face id re-derived from name");
        }
        Ok(Identity {
            id,
            display_name: self.name,
            embeddings: self.descriptors,
            created_at: self.added_at,
            last_seen_at: self.last_seen,
        })
    }
}

impl DatabaseDocument {
    pub fn from_snapshot(snapshot: &StoreSnapshot) -> Self {
        Self {
            faces: snapshot.identities.iter().map(FaceRecord::from).collect(),
            total_descriptors: snapshot.total_embeddings,
            last_updated: snapshot.last_updated,
            exported_at: Utc::now(),
        }
    }
}

/// Result of [`PersistenceGateway::import`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImportOutcome {
    pub success: bool,
    pub message: String,
    pub faces_imported: usize,
    pub descriptors_imported: usize,
    /// Entries dropped because they could not be rebuilt.
    pub faces_skipped: usize,
}

impl ImportOutcome {
    fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            faces_imported: 0,
            descriptors_imported: 0,
            faces_skipped: 0,
        }
    }
}

/// Moves the database between a [`DescriptorStore`] and durable storage.
///
/// The whole database lives as one JSON document under a single key.
pub struct PersistenceGateway {
    storage: Arc<dyn KVStore>,
    key: String,
}

impl PersistenceGateway {
    pub fn new(storage: Arc<dyn KVStore>, key: impl Into<String>) -> Self {
        let key = key.into();
        let key = if key.is_empty() {
            DEFAULT_STORAGE_KEY.to_string()
        } else {
            key
        };
        Self { storage, key }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Serializes the current store contents.
    pub fn export(&self, store: &DescriptorStore) -> Result<String, FaceprintError> {
        let doc = DatabaseDocument::from_snapshot(&store.snapshot());
        Ok(serde_json::to_string_pretty(&doc)?)
    }

    /// Replaces the store contents with the document in `text`.
    ///
    /// A document without a `faces` array is refused before anything is
    /// touched. Otherwise the store is cleared and every entry that can be
    /// rebuilt is restored; the rest are skipped with a warning.
    pub fn import(&self, store: &DescriptorStore, text: &str) -> ImportOutcome {
        let value: serde_json::Value = match serde_json::from_str(text) {
            Ok(v) => v,
            Err(e) => {
                tracing::warn!(error = %e, "database import failed to parse");
                return ImportOutcome::failure(e.to_string());
            }
        };
        let Some(faces) = value.get("faces").and_then(|f| f.as_array()) else {
            tracing::warn!("database import refused: no faces collection");
            return ImportOutcome::failure(INVALID_FORMAT);
        };

        store.clear();

        let mut outcome = ImportOutcome {
            success: true,
            message: String::new(),
            faces_imported: 0,
            descriptors_imported: 0,
            faces_skipped: 0,
        };
        for (i, entry) in faces.iter().enumerate() {
            let rebuilt = serde_json::from_value::<FaceRecord>(entry.clone())
                .map_err(|e| e.to_string())
                .and_then(FaceRecord::into_identity);
            match rebuilt {
                Ok(identity) => {
                    outcome.descriptors_imported += store.restore(identity);
                    outcome.faces_imported += 1;
                }
                Err(reason) => {
                    tracing::warn!(index = i, reason = %reason, "skipping malformed face entry");
                    outcome.faces_skipped += 1;
                }
            }
        }

        outcome.message = format!(
            "imported {} face(s) with {} descriptor(s)",
            outcome.faces_imported, outcome.descriptors_imported
        );
        if outcome.faces_skipped > 0 {
            outcome.message += &format!(", skipped {} malformed", outcome.faces_skipped);
        }
        tracing::info!(
            faces = outcome.faces_imported,
            descriptors = outcome.descriptors_imported,
            skipped = outcome.faces_skipped,
            "database imported"
        );
        outcome
    }

    /// Writes the current store contents to durable storage.
    pub fn save(&self, store: &DescriptorStore) -> Result<(), FaceprintError> {
        let data = self.export(store)?;
        self.storage.set(&self.key, &data)?;
        tracing::debug!(key = %self.key, bytes = data.len(), "database saved");
        Ok(())
    }

    /// Loads the persisted database into `store`.
    ///
    /// Returns `None` if nothing has been persisted yet.
    pub fn load(&self, store: &DescriptorStore) -> Result<Option<ImportOutcome>, FaceprintError> {
        match self.storage.get(&self.key)? {
            Some(data) => Ok(Some(self.import(store, &data))),
            None => Ok(None),
        }
    }

    /// Deletes the persisted database.
    pub fn discard(&self) -> Result<(), FaceprintError> {
        self.storage.delete(&self.key)?;
        Ok(())
    }

    /// Size in bytes of the persisted database, 0 if there is none or it
    /// cannot be measured.
    pub fn storage_footprint(&self) -> u64 {
        match self.storage.size_of(&self.key) {
            Ok(size) => size.unwrap_or(0),
            Err(e) => {
                tracing::warn!(error = %e, "cannot measure database size");
                0
            }
        }
    }
}
