use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::embedding::{confidence_from_distance, euclidean_distance};
use crate::store::DescriptorStore;
use crate::FaceprintError;

/// Controls matcher behavior. Values are clamped into range when applied.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatcherConfig {
    /// Largest Euclidean distance still considered a candidate. Range `[0, 2]`.
    /// Default: 0.6.
    pub max_distance: f32,

    /// Minimum confidence for a candidate to count as recognized. Range `[0, 1]`.
    /// Default: 0.5.
    pub min_confidence: f32,

    /// Exposed for callers; not consulted by the decision rule. Range `[0, 1]`.
    /// Default: 0.6.
    pub match_threshold: f32,
}

impl Default for MatcherConfig {
    fn default() -> Self {
        Self {
            max_distance: 0.6,
            min_confidence: 0.5,
            match_threshold: 0.6,
        }
    }
}

impl MatcherConfig {
    /// Returns a copy with every field clamped into its valid range.
    /// NaN falls back to the default for that field.
    pub fn clamped(self) -> Self {
        let d = Self::default();
        Self {
            max_distance: clamp_or(self.max_distance, 0.0, 2.0, d.max_distance),
            min_confidence: clamp_or(self.min_confidence, 0.0, 1.0, d.min_confidence),
            match_threshold: clamp_or(self.match_threshold, 0.0, 1.0, d.match_threshold),
        }
    }
}

fn clamp_or(v: f32, lo: f32, hi: f32, fallback: f32) -> f32 {
    if v.is_nan() { fallback } else { v.clamp(lo, hi) }
}

/// The closest stored embedding for a query.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchResult {
    /// Display name of the matched identity.
    pub identity_name: String,

    pub identity_id: String,

    /// Value in `[0, 1]`, see [`confidence_from_distance`].
    pub confidence: f32,

    /// Euclidean distance to the closest embedding.
    pub distance: f32,

    /// `"{identity_id}:{embedding_index}"` of the closest embedding.
    pub source_embedding_ref: String,
}

/// Outcome of [`Matcher::recognize`].
#[derive(Debug, Clone, PartialEq)]
pub enum Decision {
    Matched(MatchResult),

    /// No candidate passed the thresholds. `closest` carries the best
    /// candidate within `max_distance`, if any.
    Unmatched {
        confidence: f32,
        closest: Option<MatchResult>,
    },
}

impl Decision {
    pub fn is_match(&self) -> bool {
        matches!(self, Decision::Matched(_))
    }

    /// Confidence of the best candidate, 0 if there was none.
    pub fn confidence(&self) -> f32 {
        match self {
            Decision::Matched(m) => m.confidence,
            Decision::Unmatched { confidence, .. } => *confidence,
        }
    }

    /// The recognized identity, if any.
    pub fn matched(&self) -> Option<&MatchResult> {
        match self {
            Decision::Matched(m) => Some(m),
            Decision::Unmatched { .. } => None,
        }
    }
}

/// Nearest-neighbor search over a [`DescriptorStore`].
///
/// Linear scan of every stored embedding; meant for tens of identities
/// with a handful of samples each.
///
/// Thread-safe: the configuration can be replaced while queries run.
pub struct Matcher {
    cfg: RwLock<MatcherConfig>,
}

impl Matcher {
    pub fn new(cfg: MatcherConfig) -> Self {
        Self {
            cfg: RwLock::new(cfg.clamped()),
        }
    }

    pub fn config(&self) -> MatcherConfig {
        *self.cfg.read()
    }

    /// Replaces the configuration, clamping every field.
    pub fn set_config(&self, cfg: MatcherConfig) {
        *self.cfg.write() = cfg.clamped();
    }

    /// Adjusts the configuration in place; the result is clamped before
    /// it becomes visible to queries.
    pub fn update(&self, f: impl FnOnce(&mut MatcherConfig)) -> MatcherConfig {
        let mut cfg = self.cfg.write();
        let mut next = *cfg;
        f(&mut next);
        *cfg = next.clamped();
        *cfg
    }

    /// Finds the closest stored embedding within `max_distance`.
    ///
    /// Ties keep the first candidate in store order (identity insertion
    /// order, then capture order). Any stored embedding whose length differs
    /// from the query fails the whole query.
    pub fn find_best_match(
        &self,
        store: &DescriptorStore,
        query: &[f32],
    ) -> Result<Option<MatchResult>, FaceprintError> {
        find_best_match_with(&self.config(), store, query)
    }

    /// Classifies a query as matched or unmatched.
    ///
    /// Candidate search and the decision use the same configuration,
    /// read once.
    pub fn recognize(
        &self,
        store: &DescriptorStore,
        query: &[f32],
    ) -> Result<Decision, FaceprintError> {
        let cfg = self.config();
        let Some(best) = find_best_match_with(&cfg, store, query)? else {
            return Ok(Decision::Unmatched {
                confidence: 0.0,
                closest: None,
            });
        };

        if best.confidence >= cfg.min_confidence && best.distance <= cfg.max_distance {
            tracing::debug!(
                identity = %best.identity_id,
                distance = best.distance,
                confidence = best.confidence,
                "face matched"
            );
            return Ok(Decision::Matched(best));
        }
        Ok(Decision::Unmatched {
            confidence: best.confidence,
            closest: Some(best),
        })
    }
}

fn find_best_match_with(
    cfg: &MatcherConfig,
    store: &DescriptorStore,
    query: &[f32],
) -> Result<Option<MatchResult>, FaceprintError> {
    let max_distance = cfg.max_distance;

    store.with_identities(|identities| {
        let mut best: Option<(usize, usize, f32)> = None;
        let mut best_distance = f32::INFINITY;

        for (i, ident) in identities.iter().enumerate() {
            for (j, emb) in ident.embeddings.iter().enumerate() {
                let d = euclidean_distance(query, emb.as_slice())?;
                if d < best_distance && d <= max_distance {
                    best_distance = d;
                    best = Some((i, j, d));
                }
            }
        }

        Ok(best.map(|(i, j, distance)| {
            let ident = &identities[i];
            MatchResult {
                identity_name: ident.display_name.clone(),
                identity_id: ident.id.clone(),
                confidence: confidence_from_distance(distance),
                distance,
                source_embedding_ref: format!("{}:{}", ident.id, j),
            }
        }))
    })
}

impl Default for Matcher {
    fn default() -> Self {
        Self::new(MatcherConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Embedding;

    fn store_with(entries: &[(&str, &[f32])]) -> DescriptorStore {
        let store = DescriptorStore::new();
        for (name, v) in entries {
            store.add(name, Embedding::from(*v)).unwrap();
        }
        store
    }

    #[test]
    fn empty_store_has_no_match() {
        let m = Matcher::default();
        let store = DescriptorStore::new();
        assert!(m.find_best_match(&store, &[0.1, 0.2]).unwrap().is_none());

        let d = m.recognize(&store, &[0.1, 0.2]).unwrap();
        assert!(!d.is_match());
        assert_eq!(d.confidence(), 0.0);
    }

    #[test]
    fn exact_match_has_full_confidence() {
        let m = Matcher::default();
        let store = store_with(&[("Alice", &[0.1, 0.2, 0.3]), ("Bob", &[0.9, 0.8, 0.7])]);

        let best = m.find_best_match(&store, &[0.9, 0.8, 0.7]).unwrap().unwrap();
        assert_eq!(best.identity_name, "Bob");
        assert_eq!(best.identity_id, "bob");
        assert_eq!(best.distance, 0.0);
        assert_eq!(best.confidence, 1.0);
        assert_eq!(best.source_embedding_ref, "bob:0");
    }

    #[test]
    fn picks_closest_across_identities() {
        let m = Matcher::default();
        let store = store_with(&[
            ("Alice", &[0.0, 0.0]),
            ("Bob", &[0.5, 0.0]),
            ("Bob", &[0.2, 0.0]),
        ]);

        let best = m.find_best_match(&store, &[0.25, 0.0]).unwrap().unwrap();
        assert_eq!(best.identity_id, "bob");
        assert_eq!(best.source_embedding_ref, "bob:1");
        assert!((best.distance - 0.05).abs() < 1e-6);
    }

    #[test]
    fn ties_keep_first_candidate() {
        let m = Matcher::default();
        let store = store_with(&[("Alice", &[0.1, 0.0]), ("Bob", &[-0.1, 0.0])]);

        let best = m.find_best_match(&store, &[0.0, 0.0]).unwrap().unwrap();
        assert_eq!(best.identity_id, "alice");
    }

    #[test]
    fn candidates_beyond_max_distance_are_ignored() {
        let m = Matcher::default();
        let store = store_with(&[("Alice", &[1.0, 0.0])]);

        assert!(m.find_best_match(&store, &[0.0, 0.0]).unwrap().is_none());

        m.update(|c| c.max_distance = 1.0);
        let best = m.find_best_match(&store, &[0.0, 0.0]).unwrap().unwrap();
        assert_eq!(best.distance, 1.0);
    }

    #[test]
    fn low_confidence_is_unmatched_but_reported() {
        let m = Matcher::default();
        let store = store_with(&[("Alice", &[0.5, 0.0])]);

        // distance 0.5: within max_distance, confidence exp(-1) ≈ 0.37 < 0.5.
        let d = m.recognize(&store, &[0.0, 0.0]).unwrap();
        match d {
            Decision::Unmatched { confidence, closest } => {
                assert!((confidence - 0.3679).abs() < 1e-3, "got {confidence}");
                assert_eq!(closest.unwrap().identity_id, "alice");
            }
            Decision::Matched(_) => panic!("expected unmatched"),
        }
    }

    #[test]
    fn lowering_min_confidence_admits_match() {
        let m = Matcher::new(MatcherConfig {
            min_confidence: 0.3,
            ..MatcherConfig::default()
        });
        let store = store_with(&[("Alice", &[0.5, 0.0])]);
        let d = m.recognize(&store, &[0.0, 0.0]).unwrap();
        assert_eq!(d.matched().unwrap().identity_name, "Alice");
    }

    #[test]
    fn dimension_mismatch_fails_query() {
        let m = Matcher::default();
        let store = store_with(&[("Alice", &[0.1, 0.2, 0.3])]);
        let err = m.find_best_match(&store, &[0.1, 0.2]).unwrap_err();
        assert!(matches!(err, FaceprintError::DimensionMismatch { .. }));
        assert!(m.recognize(&store, &[0.1, 0.2]).is_err());
    }

    #[test]
    fn config_is_clamped() {
        let m = Matcher::new(MatcherConfig {
            max_distance: 5.0,
            min_confidence: -1.0,
            match_threshold: f32::NAN,
        });
        let cfg = m.config();
        assert_eq!(cfg.max_distance, 2.0);
        assert_eq!(cfg.min_confidence, 0.0);
        assert_eq!(cfg.match_threshold, 0.6);

        m.set_config(MatcherConfig {
            max_distance: -0.5,
            min_confidence: 3.0,
            match_threshold: 0.9,
        });
        let cfg = m.config();
        assert_eq!(cfg.max_distance, 0.0);
        assert_eq!(cfg.min_confidence, 1.0);
        assert_eq!(cfg.match_threshold, 0.9);
    }

    #[test]
    fn decision_uses_one_config_under_concurrent_updates() {
        use std::sync::atomic::{AtomicBool, Ordering};

        // Candidate at distance 1.0: absent under `narrow`, matched under `wide`.
        // Mixing the two would report an unmatched decision with a candidate.
        let narrow = MatcherConfig {
            max_distance: 0.6,
            min_confidence: 0.0,
            ..MatcherConfig::default()
        };
        let wide = MatcherConfig {
            max_distance: 2.0,
            ..narrow
        };
        let m = Matcher::new(narrow);
        let store = store_with(&[("Alice", &[1.0, 0.0])]);
        let done = AtomicBool::new(false);

        std::thread::scope(|s| {
            s.spawn(|| {
                let mut flip = false;
                while !done.load(Ordering::Relaxed) {
                    m.set_config(if flip { wide } else { narrow });
                    flip = !flip;
                }
            });
            for _ in 0..20_000 {
                match m.recognize(&store, &[0.0, 0.0]).unwrap() {
                    Decision::Matched(best) => assert_eq!(best.distance, 1.0),
                    Decision::Unmatched { closest, .. } => assert!(closest.is_none()),
                }
            }
            done.store(true, Ordering::Relaxed);
        });
    }

    #[test]
    fn match_threshold_does_not_gate_matches() {
        let m = Matcher::new(MatcherConfig {
            match_threshold: 1.0,
            ..MatcherConfig::default()
        });
        let store = store_with(&[("Alice", &[0.1, 0.2])]);
        assert!(m.recognize(&store, &[0.1, 0.21]).unwrap().is_match());
    }
}
