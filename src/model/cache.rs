//! Conditioning latents cache
//!
//! Computing conditioning latents is the expensive part of cloning a voice,
//! so they are kept per voice and reused by every generation. An entry is
//! only valid for the registration it was computed from; re-registering a
//! voice under the same id invalidates it.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::Serialize;

use crate::model::ConditioningLatents;

#[derive(Clone)]
struct CacheEntry {
    latents: Arc<ConditioningLatents>,
    /// Registration time of the voice the latents belong to
    registered_at: DateTime<Utc>,
    last_accessed: Instant,
}

/// Cache statistics
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct CacheStats {
    pub entries: usize,
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    pub hit_rate: f64,
}

/// Per-voice conditioning latents
pub struct ConditioningCache {
    entries: DashMap<String, CacheEntry>,
    max_entries: usize,
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
}

impl ConditioningCache {
    pub fn new(max_entries: usize) -> Self {
        Self {
            entries: DashMap::new(),
            max_entries: max_entries.max(1),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
        }
    }

    /// Cached latents for a voice registration, if any
    pub fn get(&self, voice_id: &str, registered_at: DateTime<Utc>) -> Option<Arc<ConditioningLatents>> {
        let hit = match self.entries.get_mut(voice_id) {
            Some(mut entry) if entry.registered_at == registered_at => {
                entry.last_accessed = Instant::now();
                Some(entry.latents.clone())
            }
            _ => None,
        };

        if hit.is_some() {
            self.hits.fetch_add(1, Ordering::Relaxed);
        } else {
            self.misses.fetch_add(1, Ordering::Relaxed);
        }
        hit
    }

    /// Store latents for a voice registration
    pub fn insert(
        &self,
        voice_id: &str,
        registered_at: DateTime<Utc>,
        latents: ConditioningLatents,
    ) -> Arc<ConditioningLatents> {
        if !self.entries.contains_key(voice_id) && self.entries.len() >= self.max_entries {
            self.evict_lru();
        }

        let latents = Arc::new(latents);
        self.entries.insert(
            voice_id.to_string(),
            CacheEntry {
                latents: latents.clone(),
                registered_at,
                last_accessed: Instant::now(),
            },
        );
        latents
    }

    /// Drop a voice's latents
    pub fn remove(&self, voice_id: &str) -> bool {
        self.entries.remove(voice_id).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn stats(&self) -> CacheStats {
        let hits = self.hits.load(Ordering::Relaxed);
        let misses = self.misses.load(Ordering::Relaxed);
        let total = hits + misses;
        CacheStats {
            entries: self.entries.len(),
            hits,
            misses,
            evictions: self.evictions.load(Ordering::Relaxed),
            hit_rate: if total > 0 { hits as f64 / total as f64 } else { 0.0 },
        }
    }

    fn evict_lru(&self) {
        let oldest = self
            .entries
            .iter()
            .min_by_key(|e| e.value().last_accessed)
            .map(|e| e.key().clone());

        if let Some(key) = oldest {
            self.entries.remove(&key);
            self.evictions.fetch_add(1, Ordering::Relaxed);
            tracing::debug!("Evicted conditioning latents for {}", key);
        }
    }
}

impl Default for ConditioningCache {
    fn default() -> Self {
        Self::new(64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn latents(byte: u8) -> ConditioningLatents {
        ConditioningLatents(vec![byte; 4])
    }

    #[test]
    fn test_hit_and_miss_counting() {
        let cache = ConditioningCache::new(8);
        let at = Utc::now();

        assert!(cache.get("v", at).is_none());
        cache.insert("v", at, latents(1));
        assert_eq!(cache.get("v", at).unwrap().0, vec![1; 4]);

        let stats = cache.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.entries, 1);
        assert!((stats.hit_rate - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_stale_registration_misses() {
        let cache = ConditioningCache::new(8);
        let first = Utc::now();
        let second = first + chrono::Duration::seconds(1);

        cache.insert("v", first, latents(1));
        assert!(cache.get("v", second).is_none());

        cache.insert("v", second, latents(2));
        assert_eq!(cache.get("v", second).unwrap().0, vec![2; 4]);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_evicts_least_recently_used() {
        let cache = ConditioningCache::new(2);
        let at = Utc::now();

        cache.insert("a", at, latents(1));
        std::thread::sleep(std::time::Duration::from_millis(2));
        cache.insert("b", at, latents(2));
        std::thread::sleep(std::time::Duration::from_millis(2));
        cache.get("a", at);
        cache.insert("c", at, latents(3));

        assert_eq!(cache.len(), 2);
        assert!(cache.get("b", at).is_none());
        assert!(cache.get("a", at).is_some());
        assert_eq!(cache.stats().evictions, 1);
    }

    #[test]
    fn test_remove() {
        let cache = ConditioningCache::default();
        cache.insert("v", Utc::now(), latents(1));
        assert!(cache.remove("v"));
        assert!(!cache.remove("v"));
        assert!(cache.is_empty());
    }
}
