use std::collections::HashMap;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Serialize;

use crate::identity::{identity_id, Identity};
use crate::{Embedding, FaceprintError};

/// Counters reported by [`DescriptorStore::stats`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct StoreStats {
    pub total_identities: usize,
    pub total_embeddings: usize,
    pub last_updated: DateTime<Utc>,
}

/// Immutable copy of the store taken under a single lock.
#[derive(Debug, Clone)]
pub struct StoreSnapshot {
    /// Identities in insertion order.
    pub identities: Vec<Identity>,
    pub total_embeddings: usize,
    pub last_updated: DateTime<Utc>,
}

impl StoreSnapshot {
    pub fn get(&self, id: &str) -> Option<&Identity> {
        self.identities.iter().find(|i| i.id == id)
    }
}

struct StoreInner {
    identities: Vec<Identity>,
    index: HashMap<String, usize>,
    total_embeddings: usize,
    last_updated: DateTime<Utc>,
}

impl StoreInner {
    fn bump(&mut self) {
        self.last_updated = self.last_updated.max(Utc::now());
    }

    fn reindex(&mut self) {
        self.index = self
            .identities
            .iter()
            .enumerate()
            .map(|(i, ident)| (ident.id.clone(), i))
            .collect();
    }

    fn lookup(&self, id: &str) -> Option<&Identity> {
        self.index.get(id).map(|&i| &self.identities[i])
    }

    fn lookup_mut(&mut self, id: &str) -> Option<&mut Identity> {
        match self.index.get(id) {
            Some(&i) => Some(&mut self.identities[i]),
            None => None,
        }
    }
}

/// The authoritative map of identity → embeddings.
///
/// Every operation runs to completion under one mutex; the lock is never
/// exposed, so callers cannot hold it across an extraction step.
/// Identities iterate in insertion order.
pub struct DescriptorStore {
    inner: Mutex<StoreInner>,
}

impl DescriptorStore {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(StoreInner {
                identities: Vec::new(),
                index: HashMap::new(),
                total_embeddings: 0,
                last_updated: Utc::now(),
            }),
        }
    }

    /// Appends an embedding to the identity named `display_name`,
    /// creating the identity if needed.
    ///
    /// Returns the identity's embedding count after the append.
    /// No length check against other stored embeddings happens here.
    ///
    /// Only a blank name is refused. A name whose id normalizes to the
    /// empty string ("李雷", "!!!") is stored under that empty id, shared
    /// with every other such name.
    pub fn add(&self, display_name: &str, embedding: Embedding) -> Result<usize, FaceprintError> {
        embedding.validate()?;
        if display_name.trim().is_empty() {
            return Err(FaceprintError::InvalidName(display_name.to_string()));
        }
        let id = identity_id(display_name);

        let now = Utc::now();
        let mut inner = self.inner.lock();
        let count = match inner.lookup_mut(&id) {
            Some(ident) => {
                ident.embeddings.push(embedding);
                ident.last_seen_at = Some(now);
                ident.embeddings.len()
            }
            None => {
                tracing::debug!(id = %id, "creating identity");
                let idx = inner.identities.len();
                inner.identities.push(Identity {
                    id: id.clone(),
                    display_name: display_name.trim().to_string(),
                    embeddings: vec![embedding],
                    created_at: now,
                    last_seen_at: Some(now),
                });
                inner.index.insert(id, idx);
                1
            }
        };
        inner.total_embeddings += 1;
        inner.bump();
        Ok(count)
    }

    /// Deletes an identity. Returns whether it existed.
    pub fn remove(&self, id: &str) -> bool {
        let mut inner = self.inner.lock();
        let Some(idx) = inner.index.get(id).copied() else {
            return false;
        };
        let removed = inner.identities.remove(idx);
        inner.total_embeddings -= removed.embeddings.len();
        inner.reindex();
        inner.bump();
        true
    }

    pub fn get(&self, id: &str) -> Option<Identity> {
        self.inner.lock().lookup(id).cloned()
    }

    /// Returns the number of embeddings stored for `id`.
    pub fn embedding_count(&self, id: &str) -> Option<usize> {
        self.inner.lock().lookup(id).map(Identity::sample_count)
    }

    pub fn list_all(&self) -> Vec<Identity> {
        self.inner.lock().identities.clone()
    }

    /// Empties the store.
    pub fn clear(&self) {
        let mut inner = self.inner.lock();
        inner.identities.clear();
        inner.index.clear();
        inner.total_embeddings = 0;
        inner.bump();
    }

    /// Sets `last_seen_at` to now. Returns whether the identity exists.
    pub fn touch(&self, id: &str) -> bool {
        let mut inner = self.inner.lock();
        let Some(ident) = inner.lookup_mut(id) else {
            return false;
        };
        ident.last_seen_at = Some(Utc::now());
        inner.bump();
        true
    }

    /// Inserts a fully formed identity, keeping its timestamps.
    ///
    /// If an identity with the same id already exists, the embeddings are
    /// appended to it and the timestamps widened. Returns the number of
    /// embeddings added.
    pub fn restore(&self, identity: Identity) -> usize {
        let mut inner = self.inner.lock();
        let added = identity.embeddings.len();
        match inner.lookup_mut(&identity.id) {
            Some(existing) => {
                existing.embeddings.extend(identity.embeddings);
                existing.created_at = existing.created_at.min(identity.created_at);
                existing.last_seen_at = existing.last_seen_at.max(identity.last_seen_at);
            }
            None => {
                let idx = inner.identities.len();
                inner.index.insert(identity.id.clone(), idx);
                inner.identities.push(identity);
            }
        }
        inner.total_embeddings += added;
        inner.bump();
        added
    }

    pub fn stats(&self) -> StoreStats {
        let inner = self.inner.lock();
        StoreStats {
            total_identities: inner.identities.len(),
            total_embeddings: inner.total_embeddings,
            last_updated: inner.last_updated,
        }
    }

    pub fn snapshot(&self) -> StoreSnapshot {
        let inner = self.inner.lock();
        StoreSnapshot {
            identities: inner.identities.clone(),
            total_embeddings: inner.total_embeddings,
            last_updated: inner.last_updated,
        }
    }

    /// Runs `f` over the identities (insertion order) under the store lock.
    ///
    /// `f` must not call back into the store.
    pub fn with_identities<R>(&self, f: impl FnOnce(&[Identity]) -> R) -> R {
        let inner = self.inner.lock();
        f(&inner.identities)
    }

    /// Returns the number of identities.
    pub fn len(&self) -> usize {
        self.inner.lock().identities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for DescriptorStore {
    fn default() -> Self {
        Self::new()
    }
}
