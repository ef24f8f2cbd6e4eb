//! The viewport-driven client state machine.

use std::collections::{BTreeSet, HashMap};
use std::sync::atomic::Ordering;
use std::sync::Arc;

use tokio::sync::{watch, Mutex};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use tile_common::{decode_tile, FeatureCollection, TileCoord, Viewport};

use crate::cache::{TileCache, TileCacheStats};
use crate::fetch::TileFetcher;

/// Lifecycle of one tile key.
///
/// `NotRequested → Requested → {Loaded, Failed, Cancelled}`. A `Failed` or
/// `Cancelled` key goes back to `Requested` only when it re-enters the
/// needed set on a later viewport change; there is no background retry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TileState {
    NotRequested,
    Requested,
    Loaded,
    Failed,
    Cancelled,
}

struct ClientInner {
    cache: TileCache,
    states: HashMap<TileCoord, TileState>,
    inflight: HashMap<TileCoord, CancellationToken>,
    needed: BTreeSet<TileCoord>,
}

/// Long-lived, viewport-driven tile consumer.
///
/// All cache and per-key state lives behind one lock, so insert, lookup,
/// eviction, and state transitions are serialized; at most one fetch is
/// ever in flight per key, and a second need for that key attaches to the
/// existing fetch.
pub struct MapClient {
    fetcher: Arc<dyn TileFetcher>,
    inner: Arc<Mutex<ClientInner>>,
    stats: Arc<TileCacheStats>,
    revision: Arc<watch::Sender<u64>>,
}

impl MapClient {
    /// Create a client over a fetcher with a resident-tile budget.
    pub fn new(fetcher: Arc<dyn TileFetcher>, max_tiles: usize) -> Self {
        let stats = Arc::new(TileCacheStats::default());
        let (revision, _) = watch::channel(0u64);

        Self {
            fetcher,
            inner: Arc::new(Mutex::new(ClientInner {
                cache: TileCache::new(max_tiles, Arc::clone(&stats)),
                states: HashMap::new(),
                inflight: HashMap::new(),
                needed: BTreeSet::new(),
            })),
            stats,
            revision: Arc::new(revision),
        }
    }

    /// Reconcile the client against a new viewport.
    ///
    /// Cancels in-flight fetches for keys that left the needed set, evicts
    /// over-budget cached tiles that are no longer shown, and issues
    /// exactly one fetch per newly needed, uncached key. Rapid successive
    /// calls coalesce: each call reconciles against the latest set, and
    /// superseded fetches are cancelled rather than ignored.
    pub async fn set_viewport(&self, viewport: Viewport) {
        let needed = viewport.tile_coverage();
        let mut inner = self.inner.lock().await;
        let previous = std::mem::take(&mut inner.needed);

        // Cancel superseded fetches
        let stale: Vec<TileCoord> = inner
            .inflight
            .keys()
            .filter(|coord| !needed.contains(coord))
            .copied()
            .collect();
        for coord in stale {
            if let Some(token) = inner.inflight.remove(&coord) {
                token.cancel();
            }
            inner.states.insert(coord, TileState::Cancelled);
            self.stats.cancelled_fetches.fetch_add(1, Ordering::Relaxed);
            debug!(tile = %coord, "Cancelled fetch for tile leaving viewport");
        }

        for &coord in &needed {
            // Already in flight: attach to the existing fetch
            if inner.inflight.contains_key(&coord) {
                continue;
            }
            // Failed/Cancelled keys retry only after leaving the needed
            // set. Checked before the cache probe: these keys are never
            // cached, and probing would count a spurious miss each pass.
            let was_needed = previous.contains(&coord);
            if was_needed
                && matches!(
                    inner.states.get(&coord),
                    Some(TileState::Failed) | Some(TileState::Cancelled)
                )
            {
                continue;
            }
            // Cached: reuse without network work
            if inner.cache.get(&coord).is_some() {
                inner.states.insert(coord, TileState::Loaded);
                continue;
            }

            inner.states.insert(coord, TileState::Requested);
            let token = CancellationToken::new();
            inner.inflight.insert(coord, token.clone());
            debug!(tile = %coord, "Fetching tile");

            tokio::spawn(run_fetch(
                Arc::clone(&self.fetcher),
                Arc::clone(&self.inner),
                Arc::clone(&self.stats),
                Arc::clone(&self.revision),
                coord,
                token,
            ));
        }

        inner.needed = needed;

        // Evicted keys return to NotRequested so a later need refetches
        let ClientInner {
            cache,
            states,
            needed,
            ..
        } = &mut *inner;
        for coord in cache.evict_over_budget(needed) {
            states.remove(&coord);
        }

        // A viewport change always warrants a render pass
        self.revision.send_modify(|r| *r += 1);
    }

    /// Loaded features for the tiles the current viewport needs, promoting
    /// them as most recently shown. Tiles still in flight, failed, or
    /// absent contribute nothing.
    pub async fn visible_features(&self) -> Vec<(TileCoord, Arc<FeatureCollection>)> {
        let mut inner = self.inner.lock().await;
        let needed: Vec<TileCoord> = inner.needed.iter().copied().collect();
        needed
            .into_iter()
            .filter_map(|coord| inner.cache.touch(&coord).map(|fc| (coord, fc)))
            .collect()
    }

    /// Number of fetches currently in flight.
    pub async fn pending_count(&self) -> usize {
        self.inner.lock().await.inflight.len()
    }

    /// Current lifecycle state of a key.
    pub async fn tile_state(&self, coord: &TileCoord) -> TileState {
        self.inner
            .lock()
            .await
            .states
            .get(coord)
            .copied()
            .unwrap_or(TileState::NotRequested)
    }

    /// Number of resident cached tiles.
    pub async fn cached_tiles(&self) -> usize {
        self.inner.lock().await.cache.len()
    }

    pub fn stats(&self) -> Arc<TileCacheStats> {
        Arc::clone(&self.stats)
    }

    /// Receiver notified (with a monotonically increasing revision) after
    /// every viewport change and tile settlement; drive render passes off
    /// this.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.revision.subscribe()
    }

    /// Wait until no fetch is in flight.
    pub async fn settled(&self) {
        let mut rx = self.revision.subscribe();
        loop {
            if self.pending_count().await == 0 {
                return;
            }
            if rx.changed().await.is_err() {
                return;
            }
        }
    }

    /// Drop all state: cancel every in-flight fetch and clear the cache.
    /// Used when the client is pointed at a different tile tree.
    pub async fn clear(&self) {
        let mut inner = self.inner.lock().await;
        for (coord, token) in inner.inflight.drain() {
            token.cancel();
            debug!(tile = %coord, "Cancelled fetch on client reset");
        }
        inner.states.clear();
        inner.needed.clear();
        inner.cache.clear();
        self.revision.send_modify(|r| *r += 1);
    }
}

/// One cancellable fetch. Runs detached; every outcome is applied under
/// the client lock so it cannot race a viewport change.
async fn run_fetch(
    fetcher: Arc<dyn TileFetcher>,
    inner: Arc<Mutex<ClientInner>>,
    stats: Arc<TileCacheStats>,
    revision: Arc<watch::Sender<u64>>,
    coord: TileCoord,
    token: CancellationToken,
) {
    let result = tokio::select! {
        _ = token.cancelled() => return,
        result = fetcher.fetch(coord) => result,
    };

    let mut inner = inner.lock().await;

    // A cancellation that raced the response: the canceller already
    // transitioned the state, drop the result.
    if token.is_cancelled() || inner.inflight.remove(&coord).is_none() {
        return;
    }

    let collection = match result {
        Ok(Some(payload)) => match decode_tile(&payload) {
            Ok(fc) => Arc::new(fc),
            Err(e) => {
                warn!(tile = %coord, error = %e, "Malformed tile payload, treating as empty");
                stats.decode_failures.fetch_add(1, Ordering::Relaxed);
                Arc::new(FeatureCollection::empty())
            }
        },
        // Absent tile: zero records, fully resolved
        Ok(None) => Arc::new(FeatureCollection::empty()),
        Err(e) => {
            warn!(tile = %coord, error = %e, "Tile fetch failed");
            stats.fetch_failures.fetch_add(1, Ordering::Relaxed);
            inner.states.insert(coord, TileState::Failed);
            revision.send_modify(|r| *r += 1);
            return;
        }
    };

    debug!(tile = %coord, features = collection.len(), "Tile loaded");
    inner.cache.insert(coord, collection);
    inner.states.insert(coord, TileState::Loaded);

    let ClientInner {
        cache,
        states,
        needed,
        ..
    } = &mut *inner;
    for evicted in cache.evict_over_budget(needed) {
        states.remove(&evicted);
    }

    revision.send_modify(|r| *r += 1);
}
