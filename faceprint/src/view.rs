//! Read-only projections over a [`StoreSnapshot`].
//!
//! Views are computed on demand from the authoritative store; there is no
//! second copy to keep in sync and nothing here can mutate the store.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::identity::{identity_id, Identity};
use crate::store::StoreSnapshot;
use crate::training::MIN_TRAINING_SAMPLES;

/// Consumer-facing summary of one identity.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IdentityView {
    pub id: String,
    pub name: String,
    pub sample_count: usize,
    /// Has at least [`MIN_TRAINING_SAMPLES`] embeddings.
    pub is_trained: bool,
    /// `sample_count / MIN_TRAINING_SAMPLES`, capped at 1.
    pub progress: f32,
    pub created_at: DateTime<Utc>,
    pub last_seen_at: Option<DateTime<Utc>>,
}

/// Database-wide counters.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DatabaseStats {
    pub total_identities: usize,
    pub total_embeddings: usize,
    pub trained_identities: usize,
    pub last_updated: DateTime<Utc>,
    /// Size of the persisted database in bytes.
    pub storage_bytes: u64,
}

pub fn training_progress(sample_count: usize) -> f32 {
    (sample_count as f32 / MIN_TRAINING_SAMPLES as f32).min(1.0)
}

pub fn project_identity(identity: &Identity) -> IdentityView {
    let n = identity.sample_count();
    IdentityView {
        id: identity.id.clone(),
        name: identity.display_name.clone(),
        sample_count: n,
        is_trained: n >= MIN_TRAINING_SAMPLES,
        progress: training_progress(n),
        created_at: identity.created_at,
        last_seen_at: identity.last_seen_at,
    }
}

/// Projects every identity, in store order.
pub fn project_identities(snapshot: &StoreSnapshot) -> Vec<IdentityView> {
    snapshot.identities.iter().map(project_identity).collect()
}

/// Looks up an identity by display name (normalized to its id).
pub fn find_identity(snapshot: &StoreSnapshot, display_name: &str) -> Option<IdentityView> {
    snapshot
        .get(&identity_id(display_name))
        .map(project_identity)
}

pub fn database_stats(snapshot: &StoreSnapshot, storage_bytes: u64) -> DatabaseStats {
    DatabaseStats {
        total_identities: snapshot.identities.len(),
        total_embeddings: snapshot.total_embeddings,
        trained_identities: snapshot
            .identities
            .iter()
            .filter(|i| i.sample_count() >= MIN_TRAINING_SAMPLES)
            .count(),
        last_updated: snapshot.last_updated,
        storage_bytes,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::DescriptorStore;
    use crate::Embedding;

    fn store() -> DescriptorStore {
        let store = DescriptorStore::new();
        for i in 0..4 {
            store.add("Jane Doe", Embedding::new(vec![i as f32])).unwrap();
        }
        store.add("Bob", Embedding::new(vec![1.0])).unwrap();
        store
    }

    #[test]
    fn identity_projection() {
        let snap = store().snapshot();
        let views = project_identities(&snap);
        assert_eq!(views.len(), 2);

        assert_eq!(views[0].name, "Jane Doe");
        assert_eq!(views[0].sample_count, 4);
        assert!(views[0].is_trained);
        assert_eq!(views[0].progress, 1.0);

        assert_eq!(views[1].id, "bob");
        assert!(!views[1].is_trained);
        assert!((views[1].progress - 1.0 / 3.0).abs() < 1e-6);
    }

    #[test]
    fn find_by_display_name() {
        let snap = store().snapshot();
        assert_eq!(find_identity(&snap, "jane doe").unwrap().id, "jane_doe");
        assert!(find_identity(&snap, "Nobody").is_none());
    }

    #[test]
    fn stats_projection() {
        let snap = store().snapshot();
        let stats = database_stats(&snap, 1234);
        assert_eq!(stats.total_identities, 2);
        assert_eq!(stats.total_embeddings, 5);
        assert_eq!(stats.trained_identities, 1);
        assert_eq!(stats.storage_bytes, 1234);
        assert_eq!(stats.last_updated, snap.last_updated);
    }

    #[test]
    fn views_reflect_latest_snapshot() {
        let store = store();
        let before = find_identity(&store.snapshot(), "Bob").unwrap();
        store.add("Bob", Embedding::new(vec![2.0])).unwrap();
        let after = find_identity(&store.snapshot(), "Bob").unwrap();
        assert_eq!(before.sample_count, 1);
        assert_eq!(after.sample_count, 2);
    }

    #[test]
    fn progress_is_capped() {
        assert_eq!(training_progress(0), 0.0);
        assert_eq!(training_progress(MIN_TRAINING_SAMPLES), 1.0);
        assert_eq!(training_progress(10), 1.0);
    }
}
