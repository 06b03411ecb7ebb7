use std::sync::Arc;

use faceprint_kv::{KVStore, MemoryStore};
use serde::{Deserialize, Serialize};

use crate::extractor::{BoundingBox, DescriptorExtractor, FaceDetector};
use crate::identity::identity_id;
use crate::matcher::{Decision, MatchResult, Matcher, MatcherConfig};
use crate::persistence::{ImportOutcome, PersistenceGateway, DEFAULT_STORAGE_KEY};
use crate::store::DescriptorStore;
use crate::training::{Progress, TrainingController, TrainingOutcome, ValidationReport};
use crate::view::{self, DatabaseStats, IdentityView};
use crate::{Embedding, FaceprintError};

/// Settings for [`FaceRecognizer`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecognizerConfig {
    pub matcher: MatcherConfig,

    /// Storage key holding the serialized database.
    pub storage_key: String,
}

impl Default for RecognizerConfig {
    fn default() -> Self {
        Self {
            matcher: MatcherConfig::default(),
            storage_key: DEFAULT_STORAGE_KEY.to_string(),
        }
    }
}

/// Face recognition over a persisted identity database.
///
/// The database is loaded when the recognizer is opened and written back
/// after every mutating call. Storage failures are logged and never undo
/// the in-memory change.
///
/// # Example
///
/// ```
/// use faceprint::{Embedding, FaceRecognizer};
///
/// let rec = FaceRecognizer::in_memory();
/// let samples: Vec<Embedding> = [0.10, 0.11, 0.12]
///     .iter()
///     .map(|x| Embedding::new(vec![*x, 0.2, 0.3, 0.4]))
///     .collect();
/// let outcome = rec.train("Jane Doe", &samples, None);
/// assert!(outcome.success);
///
/// let decision = rec.recognize(&[0.105, 0.2, 0.3, 0.4]).unwrap();
/// assert_eq!(decision.matched().unwrap().identity_name, "Jane Doe");
/// ```
pub struct FaceRecognizer {
    store: Arc<DescriptorStore>,
    matcher: Matcher,
    trainer: TrainingController,
    gateway: PersistenceGateway,
}

impl FaceRecognizer {
    /// Opens a recognizer on `storage`, loading any persisted database.
    ///
    /// A missing or unreadable database leaves the recognizer empty.
    pub fn open(storage: Arc<dyn KVStore>, cfg: RecognizerConfig) -> Self {
        let store = Arc::new(DescriptorStore::new());
        let gateway = PersistenceGateway::new(storage, cfg.storage_key);

        match gateway.load(&store) {
            Ok(Some(outcome)) if outcome.success => {
                tracing::info!(
                    faces = outcome.faces_imported,
                    descriptors = outcome.descriptors_imported,
                    "face database loaded"
                );
            }
            Ok(Some(outcome)) => {
                tracing::warn!(reason = %outcome.message, "persisted face database rejected");
            }
            Ok(None) => tracing::debug!("no persisted face database"),
            Err(e) => tracing::error!(error = %e, "failed to load face database"),
        }

        Self {
            trainer: TrainingController::new(store.clone()),
            matcher: Matcher::new(cfg.matcher),
            store,
            gateway,
        }
    }

    /// Opens a recognizer backed by a fresh in-memory store.
    pub fn in_memory() -> Self {
        Self::open(Arc::new(MemoryStore::new()), RecognizerConfig::default())
    }

    pub fn store(&self) -> &Arc<DescriptorStore> {
        &self.store
    }

    pub fn matcher_config(&self) -> MatcherConfig {
        self.matcher.config()
    }

    /// Replaces the matcher thresholds (clamped into range).
    pub fn set_matcher_config(&self, cfg: MatcherConfig) {
        self.matcher.set_config(cfg);
    }

    /// Recognizes a query embedding.
    ///
    /// A match refreshes the identity's last-seen time and saves the
    /// database.
    pub fn recognize(&self, query: &[f32]) -> Result<Decision, FaceprintError> {
        let decision = self.matcher.recognize(&self.store, query)?;
        if let Decision::Matched(m) = &decision {
            if self.store.touch(&m.identity_id) {
                self.persist();
            }
        }
        Ok(decision)
    }

    /// Returns the closest stored embedding within the distance limit.
    pub fn find_best_match(&self, query: &[f32]) -> Result<Option<MatchResult>, FaceprintError> {
        self.matcher.find_best_match(&self.store, query)
    }

    /// Trains `display_name` with the given embeddings, see
    /// [`TrainingController::train_identity`].
    pub fn train(
        &self,
        display_name: &str,
        embeddings: &[Embedding],
        progress: Option<Progress<'_>>,
    ) -> TrainingOutcome {
        let outcome = self.trainer.train_identity(display_name, embeddings, progress);
        if outcome.samples_added > 0 {
            self.persist();
        }
        outcome
    }

    /// Trains `display_name` from camera frames, see
    /// [`TrainingController::train_from_frames`].
    pub async fn train_from_frames<D: FaceDetector>(
        &self,
        display_name: &str,
        frames: &[(&D::Frame, BoundingBox)],
        extractor: &DescriptorExtractor<D>,
        progress: Option<Progress<'_>>,
    ) -> TrainingOutcome {
        let outcome = self
            .trainer
            .train_from_frames(display_name, frames, extractor, progress)
            .await;
        if outcome.samples_added > 0 {
            self.persist();
        }
        outcome
    }

    /// Adds one sample, ignoring the per-identity cap.
    pub fn add_sample(&self, display_name: &str, embedding: Embedding) -> bool {
        let added = self.trainer.add_single_sample(display_name, embedding);
        if added {
            self.persist();
        }
        added
    }

    pub fn validate_training(&self, display_name: &str) -> ValidationReport {
        self.trainer.validate_training(display_name)
    }

    /// Removes the identity named `display_name`. Returns whether it existed.
    pub fn remove_identity(&self, display_name: &str) -> bool {
        let removed = self.store.remove(&identity_id(display_name));
        if removed {
            tracing::info!(name = display_name, "identity removed");
            self.persist();
        }
        removed
    }

    /// Deletes every identity.
    pub fn clear_database(&self) {
        self.store.clear();
        tracing::info!("face database cleared");
        self.persist();
    }

    pub fn identity(&self, display_name: &str) -> Option<IdentityView> {
        view::find_identity(&self.store.snapshot(), display_name)
    }

    pub fn identities(&self) -> Vec<IdentityView> {
        view::project_identities(&self.store.snapshot())
    }

    pub fn stats(&self) -> DatabaseStats {
        view::database_stats(&self.store.snapshot(), self.gateway.storage_footprint())
    }

    /// Serializes the database, see [`PersistenceGateway::export`].
    pub fn export(&self) -> Result<String, FaceprintError> {
        self.gateway.export(&self.store)
    }

    /// Replaces the database with an exported document.
    pub fn import(&self, text: &str) -> ImportOutcome {
        let outcome = self.gateway.import(&self.store, text);
        if outcome.success {
            self.persist();
        }
        outcome
    }

    pub fn storage_footprint(&self) -> u64 {
        self.gateway.storage_footprint()
    }

    /// Writes the database to storage. Returns false (after logging) if
    /// the write failed.
    pub fn persist(&self) -> bool {
        match self.gateway.save(&self.store) {
            Ok(()) => true,
            Err(e) => {
                tracing::error!(error = %e, "failed to save face database");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use faceprint_kv::{KVError, KVResult};

    fn emb(v: &[f32]) -> Embedding {
        Embedding::from(v)
    }

    #[test]
    fn mutations_are_persisted() {
        let kv = MemoryStore::new();
        let rec = FaceRecognizer::open(Arc::new(kv.clone()), RecognizerConfig::default());
        assert!(kv.is_empty());

        rec.train("Jane Doe", &[emb(&[0.1, 0.2])], None);
        assert!(kv.get(DEFAULT_STORAGE_KEY).unwrap().is_some());
        assert!(rec.storage_footprint() > 0);

        let reopened = FaceRecognizer::open(Arc::new(kv.clone()), RecognizerConfig::default());
        assert_eq!(reopened.stats().total_embeddings, 1);

        assert!(rec.remove_identity("jane doe"));
        let reopened = FaceRecognizer::open(Arc::new(kv.clone()), RecognizerConfig::default());
        assert_eq!(reopened.stats().total_identities, 0);
    }

    #[test]
    fn custom_storage_key() {
        let kv = MemoryStore::new();
        let cfg = RecognizerConfig {
            storage_key: "faces:lab".into(),
            ..RecognizerConfig::default()
        };
        let rec = FaceRecognizer::open(Arc::new(kv.clone()), cfg);
        assert!(rec.add_sample("Bob", emb(&[0.3])));
        assert!(kv.get("faces:lab").unwrap().is_some());
        assert!(kv.get(DEFAULT_STORAGE_KEY).unwrap().is_none());
    }

    #[test]
    fn corrupt_persisted_data_starts_empty() {
        let kv = MemoryStore::new();
        kv.set(DEFAULT_STORAGE_KEY, "{\"nothing\": true}").unwrap();
        let rec = FaceRecognizer::open(Arc::new(kv), RecognizerConfig::default());
        assert_eq!(rec.stats().total_identities, 0);
    }

    #[test]
    fn recognize_touches_last_seen() {
        let rec = FaceRecognizer::in_memory();
        rec.train("Jane", &[emb(&[0.1, 0.2])], None);
        let before = rec.identity("Jane").unwrap().last_seen_at.unwrap();

        let d = rec.recognize(&[0.1, 0.2]).unwrap();
        assert!(d.is_match());
        assert!(rec.identity("Jane").unwrap().last_seen_at.unwrap() >= before);
    }

    #[test]
    fn recognized_last_seen_survives_reopen() {
        let kv = MemoryStore::new();
        let rec = FaceRecognizer::open(Arc::new(kv.clone()), RecognizerConfig::default());
        rec.train("Jane", &[emb(&[0.1, 0.2])], None);
        let trained = rec.identity("Jane").unwrap().last_seen_at.unwrap();
        let saved = kv.get(DEFAULT_STORAGE_KEY).unwrap();

        std::thread::sleep(std::time::Duration::from_millis(5));
        assert!(rec.recognize(&[0.1, 0.2]).unwrap().is_match());
        assert_ne!(kv.get(DEFAULT_STORAGE_KEY).unwrap(), saved);

        let reopened = FaceRecognizer::open(Arc::new(kv), RecognizerConfig::default());
        let seen = reopened.identity("Jane").unwrap().last_seen_at.unwrap();
        assert!(seen > trained, "{seen} <= {trained}");
    }

    #[test]
    fn unmatched_query_does_not_save() {
        let kv = MemoryStore::new();
        let rec = FaceRecognizer::open(Arc::new(kv.clone()), RecognizerConfig::default());
        rec.train("Jane", &[emb(&[0.1, 0.2])], None);
        let saved = kv.get(DEFAULT_STORAGE_KEY).unwrap();

        assert!(!rec.recognize(&[0.9, 0.9]).unwrap().is_match());
        assert_eq!(kv.get(DEFAULT_STORAGE_KEY).unwrap(), saved);
    }

    #[test]
    fn remove_unknown_leaves_stats() {
        let rec = FaceRecognizer::in_memory();
        rec.train("Jane", &[emb(&[0.1, 0.2])], None);
        let before = rec.stats();
        assert!(!rec.remove_identity("Nobody"));
        assert_eq!(rec.stats(), before);
    }

    #[test]
    fn failed_import_is_not_persisted() {
        let kv = MemoryStore::new();
        let rec = FaceRecognizer::open(Arc::new(kv.clone()), RecognizerConfig::default());
        rec.train("Jane", &[emb(&[0.1, 0.2])], None);
        let saved = kv.get(DEFAULT_STORAGE_KEY).unwrap();

        let out = rec.import("{\"people\": []}");
        assert!(!out.success);
        assert_eq!(kv.get(DEFAULT_STORAGE_KEY).unwrap(), saved);
        assert_eq!(rec.stats().total_identities, 1);
    }

    #[test]
    fn matcher_config_round_trip() {
        let rec = FaceRecognizer::in_memory();
        rec.set_matcher_config(MatcherConfig {
            max_distance: 9.0,
            ..MatcherConfig::default()
        });
        assert_eq!(rec.matcher_config().max_distance, 2.0);
    }

    struct ReadOnlyStore(MemoryStore);

    impl KVStore for ReadOnlyStore {
        fn get(&self, key: &str) -> KVResult<Option<String>> {
            self.0.get(key)
        }
        fn set(&self, _key: &str, _value: &str) -> KVResult<()> {
            Err(KVError::Storage("read-only".into()))
        }
        fn delete(&self, _key: &str) -> KVResult<()> {
            Err(KVError::Storage("read-only".into()))
        }
    }

    #[test]
    fn save_failure_keeps_memory_state() {
        let rec = FaceRecognizer::open(
            Arc::new(ReadOnlyStore(MemoryStore::new())),
            RecognizerConfig::default(),
        );
        let out = rec.train("Jane", &[emb(&[0.1]), emb(&[0.2])], None);
        assert!(out.success);
        assert_eq!(rec.stats().total_embeddings, 2);
        assert!(!rec.persist());
    }

    #[test]
    fn config_deserializes_with_defaults() {
        let cfg: RecognizerConfig =
            serde_json::from_str(r#"{"matcher": {"max_distance": 0.4}}"#).unwrap();
        assert_eq!(cfg.matcher.max_distance, 0.4);
        assert_eq!(cfg.matcher.min_confidence, 0.5);
        assert_eq!(cfg.storage_key, DEFAULT_STORAGE_KEY);
    }
}
