//! In-memory LRU cache of decoded tiles.
//!
//! The cache is an explicit object owned by the `MapClient` — no ambient
//! globals. It is count-bounded and evicts least-recently-shown entries,
//! but never a tile in the caller-supplied protected set (the tiles the
//! current viewport needs).

use std::collections::BTreeSet;
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use lru::LruCache;

use tile_common::{FeatureCollection, TileCoord};

/// Statistics for the client's tile handling.
///
/// All fields are atomic for lock-free reads from the host application.
#[derive(Default)]
pub struct TileCacheStats {
    /// Needed tiles served from cache without a fetch.
    pub hits: AtomicU64,
    /// Needed tiles that required a fetch.
    pub misses: AtomicU64,
    /// Entries evicted over budget.
    pub evictions: AtomicU64,
    /// Fetches that failed at the transport level.
    pub fetch_failures: AtomicU64,
    /// Payloads that arrived but did not decode; degraded to empty tiles.
    pub decode_failures: AtomicU64,
    /// Fetches cancelled because their key left the needed set.
    pub cancelled_fetches: AtomicU64,
}

impl TileCacheStats {
    /// Cache hit rate as a percentage (0-100).
    pub fn hit_rate(&self) -> f64 {
        let hits = self.hits.load(Ordering::Relaxed);
        let misses = self.misses.load(Ordering::Relaxed);
        let total = hits + misses;
        if total == 0 {
            0.0
        } else {
            (hits as f64 / total as f64) * 100.0
        }
    }

    pub fn hits(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    pub fn misses(&self) -> u64 {
        self.misses.load(Ordering::Relaxed)
    }

    pub fn evictions(&self) -> u64 {
        self.evictions.load(Ordering::Relaxed)
    }

    pub fn fetch_failures(&self) -> u64 {
        self.fetch_failures.load(Ordering::Relaxed)
    }

    pub fn decode_failures(&self) -> u64 {
        self.decode_failures.load(Ordering::Relaxed)
    }

    pub fn cancelled_fetches(&self) -> u64 {
        self.cancelled_fetches.load(Ordering::Relaxed)
    }
}

/// Count-bounded LRU store of decoded tiles.
///
/// Not internally locked: the owning client serializes access together
/// with the rest of its per-key state, so cache and state transitions
/// stay atomic with respect to each other.
pub struct TileCache {
    entries: LruCache<TileCoord, Arc<FeatureCollection>>,
    max_tiles: usize,
    stats: Arc<TileCacheStats>,
}

impl TileCache {
    pub fn new(max_tiles: usize, stats: Arc<TileCacheStats>) -> Self {
        // The LruCache itself is effectively unbounded; eviction is driven
        // explicitly so protected tiles are never dropped behind our back.
        const LRU_CAPACITY: usize = 1_000_000;
        Self {
            entries: LruCache::new(NonZeroUsize::new(LRU_CAPACITY).expect("capacity must be > 0")),
            max_tiles,
            stats,
        }
    }

    /// Look up a tile, counting hit/miss and promoting it to
    /// most-recently-shown.
    pub fn get(&mut self, coord: &TileCoord) -> Option<Arc<FeatureCollection>> {
        match self.entries.get(coord) {
            Some(fc) => {
                self.stats.hits.fetch_add(1, Ordering::Relaxed);
                Some(Arc::clone(fc))
            }
            None => {
                self.stats.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    /// Promote a tile without touching hit/miss counters (a render pass
    /// re-reading what the viewport already accounted for).
    pub fn touch(&mut self, coord: &TileCoord) -> Option<Arc<FeatureCollection>> {
        self.entries.get(coord).map(Arc::clone)
    }

    pub fn insert(&mut self, coord: TileCoord, collection: Arc<FeatureCollection>) {
        self.entries.put(coord, collection);
    }

    pub fn contains(&self, coord: &TileCoord) -> bool {
        self.entries.contains(coord)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Evict least-recently-shown entries until the budget holds, never
    /// touching `protected` keys. Returns the evicted coordinates so the
    /// caller can reset their per-key state.
    ///
    /// If the protected set alone exceeds the budget, everything outside
    /// it is evicted and the cache stays over budget — correctness of the
    /// visible map wins over the bound.
    pub fn evict_over_budget(&mut self, protected: &BTreeSet<TileCoord>) -> Vec<TileCoord> {
        let mut evicted = Vec::new();
        let mut kept = Vec::new();

        while self.entries.len() + kept.len() > self.max_tiles {
            match self.entries.pop_lru() {
                Some((coord, fc)) => {
                    if protected.contains(&coord) {
                        kept.push((coord, fc));
                    } else {
                        evicted.push(coord);
                    }
                }
                None => break,
            }
        }

        // Reinsert protected entries in their original LRU order
        for (coord, fc) in kept {
            self.entries.put(coord, fc);
        }

        self.stats
            .evictions
            .fetch_add(evicted.len() as u64, Ordering::Relaxed);
        evicted
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tile_common::FeatureCollection;

    fn coord(x: u32) -> TileCoord {
        TileCoord::new(10, x, 0)
    }

    fn empty() -> Arc<FeatureCollection> {
        Arc::new(FeatureCollection::empty())
    }

    fn cache(max_tiles: usize) -> (TileCache, Arc<TileCacheStats>) {
        let stats = Arc::new(TileCacheStats::default());
        (TileCache::new(max_tiles, Arc::clone(&stats)), stats)
    }

    #[test]
    fn test_hit_miss_accounting() {
        let (mut cache, stats) = cache(10);

        assert!(cache.get(&coord(1)).is_none());
        cache.insert(coord(1), empty());
        assert!(cache.get(&coord(1)).is_some());

        assert_eq!(stats.hits(), 1);
        assert_eq!(stats.misses(), 1);
        assert_eq!(stats.hit_rate(), 50.0);
    }

    #[test]
    fn test_eviction_is_lru() {
        let (mut cache, stats) = cache(2);
        let protected = BTreeSet::new();

        cache.insert(coord(1), empty());
        cache.insert(coord(2), empty());
        cache.insert(coord(3), empty());
        cache.touch(&coord(1)); // 2 is now least recently shown

        let evicted = cache.evict_over_budget(&protected);
        assert_eq!(evicted, vec![coord(2)]);
        assert!(cache.contains(&coord(1)));
        assert!(cache.contains(&coord(3)));
        assert_eq!(stats.evictions(), 1);
    }

    #[test]
    fn test_protected_entries_survive_eviction() {
        let (mut cache, _) = cache(1);

        cache.insert(coord(1), empty());
        cache.insert(coord(2), empty());
        cache.insert(coord(3), empty());

        let protected: BTreeSet<TileCoord> = [coord(1), coord(2)].into_iter().collect();
        let evicted = cache.evict_over_budget(&protected);

        assert_eq!(evicted, vec![coord(3)]);
        // Still over budget: the whole protected set stays resident
        assert_eq!(cache.len(), 2);
        assert!(cache.contains(&coord(1)));
        assert!(cache.contains(&coord(2)));
    }

    #[test]
    fn test_clear() {
        let (mut cache, _) = cache(10);
        cache.insert(coord(1), empty());
        cache.clear();
        assert!(cache.is_empty());
    }
}
