//! Two-generation tile cache
//!
//! Page tiles live in two pools. The *active* pool holds tiles wanted by the
//! current scheduling pass; the *passive* pool holds the previous pass's
//! tiles, which stay reusable until evicted. Eviction always removes the
//! lowest cache order first, draining passive before touching active.
//!
//! Thumbnails are kept apart in a small FIFO pool behind their own lock.

use crate::config::CacheConfig;
use crate::tile::{Tile, TileKey};
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Statistics about cache usage
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Tiles in the active generation
    pub active: usize,

    /// Tiles in the passive generation
    pub passive: usize,

    /// Cached thumbnails
    pub thumbnails: usize,

    /// Lookups answered from either generation
    pub hits: u64,

    /// Lookups that found nothing
    pub misses: u64,

    /// Passive tiles moved back into the active generation
    pub promotions: u64,

    /// Tiles dropped to make room
    pub evictions: u64,
}

impl CacheStats {
    /// Calculate the cache hit rate (0.0 to 1.0)
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

/// Eviction position: cache order first, insertion sequence breaks ties
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
struct Slot {
    order: u64,
    seq: u64,
}

/// Tiles ordered for eviction, indexed by identity
#[derive(Default)]
struct Pool {
    entries: BTreeMap<Slot, Arc<Tile>>,
    index: HashMap<TileKey, Slot>,
}

impl Pool {
    fn len(&self) -> usize {
        self.entries.len()
    }

    fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn contains(&self, key: &TileKey) -> bool {
        self.index.contains_key(key)
    }

    fn insert(&mut self, slot: Slot, tile: Arc<Tile>) {
        self.index.insert(tile.key.clone(), slot);
        self.entries.insert(slot, tile);
    }

    fn remove(&mut self, key: &TileKey) -> Option<Arc<Tile>> {
        let slot = self.index.remove(key)?;
        self.entries.remove(&slot)
    }

    fn pop_lowest(&mut self) -> Option<Arc<Tile>> {
        let (_, tile) = self.entries.pop_first()?;
        self.index.remove(&tile.key);
        Some(tile)
    }

    fn absorb(&mut self, other: &mut Pool) {
        for (slot, tile) in std::mem::take(&mut other.entries) {
            self.insert(slot, tile);
        }
        other.index.clear();
    }

    fn clear(&mut self) {
        self.entries.clear();
        self.index.clear();
    }

    fn tiles(&self) -> impl Iterator<Item = &Arc<Tile>> {
        self.entries.values()
    }
}

/// Active and passive generations, guarded together
struct PoolState {
    active: Pool,
    passive: Pool,
    capacity: usize,
    next_seq: u64,
    stats: CacheStats,
}

impl PoolState {
    fn new(capacity: usize) -> Self {
        Self {
            active: Pool::default(),
            passive: Pool::default(),
            capacity: capacity.max(1),
            next_seq: 0,
            stats: CacheStats::default(),
        }
    }

    fn len(&self) -> usize {
        self.active.len() + self.passive.len()
    }

    fn slot(&mut self, order: u64) -> Slot {
        let seq = self.next_seq;
        self.next_seq += 1;
        Slot { order, seq }
    }

    /// Evict until one more tile fits
    fn make_room(&mut self) -> usize {
        let mut evicted = 0;
        while self.len() >= self.capacity && !self.passive.is_empty() {
            self.passive.pop_lowest();
            evicted += 1;
        }
        while self.len() >= self.capacity && !self.active.is_empty() {
            self.active.pop_lowest();
            evicted += 1;
        }
        self.stats.evictions += evicted as u64;
        evicted
    }
}

/// Thumbnails in insertion order
struct ThumbnailState {
    tiles: VecDeque<Arc<Tile>>,
    capacity: usize,
}

/// Bounded cache of rendered tiles
///
/// Cloning the cache yields another handle to the same storage. The
/// generation pools and the thumbnail pool use independent locks, and no
/// method holds both.
///
/// # Example
///
/// ```
/// use pageview_cache::{CacheConfig, RelativeBounds, Tile, TileCache, TileKey};
/// use image::RgbaImage;
///
/// let cache = TileCache::new(CacheConfig::default());
/// let key = TileKey::new(0, RelativeBounds::new(0.0, 0.0, 0.5, 0.5), false, "");
///
/// cache.insert(Tile::new(key.clone(), 1, RgbaImage::new(256, 256)));
///
/// // Next scheduling pass: the tile becomes passive but is still reusable
/// cache.begin_new_generation();
/// assert!(cache.lookup_and_promote(&key, 2));
/// ```
#[derive(Clone)]
pub struct TileCache {
    pools: Arc<Mutex<PoolState>>,
    thumbnails: Arc<Mutex<ThumbnailState>>,
}

impl TileCache {
    /// Create a cache with the given capacities
    pub fn new(config: CacheConfig) -> Self {
        Self {
            pools: Arc::new(Mutex::new(PoolState::new(config.capacity))),
            thumbnails: Arc::new(Mutex::new(ThumbnailState {
                tiles: VecDeque::new(),
                capacity: config.thumbnail_capacity.max(1),
            })),
        }
    }

    fn pools(&self) -> MutexGuard<'_, PoolState> {
        self.pools.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn thumbs(&self) -> MutexGuard<'_, ThumbnailState> {
        self.thumbnails.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Look a page tile up and move it into the active generation
    ///
    /// A passive hit is promoted with `order` as its new cache order. An
    /// active hit is left as is. Returns `false` only when neither
    /// generation holds the tile.
    pub fn lookup_and_promote(&self, key: &TileKey, order: u64) -> bool {
        let mut state = self.pools();

        if let Some(tile) = state.passive.remove(key) {
            let slot = state.slot(order);
            state.active.insert(slot, tile);
            state.stats.promotions += 1;
            state.stats.hits += 1;
            return true;
        }

        if state.active.contains(key) {
            state.stats.hits += 1;
            true
        } else {
            state.stats.misses += 1;
            false
        }
    }

    /// Check for a page tile in either generation without promoting it
    pub fn contains(&self, key: &TileKey) -> bool {
        let state = self.pools();
        state.active.contains(key) || state.passive.contains(key)
    }

    /// Store a page tile in the active generation
    ///
    /// A tile with the same identity is replaced. When the cache is full,
    /// the lowest-order passive tiles are evicted first, then active ones.
    pub fn insert(&self, tile: Tile) {
        let mut state = self.pools();

        if state.passive.remove(&tile.key).is_none() {
            state.active.remove(&tile.key);
        }

        let evicted = state.make_room();
        if evicted > 0 {
            log::debug!(
                "evicted {} tile(s) to cache page {} (order {})",
                evicted,
                tile.key.page,
                tile.cache_order
            );
        }

        let slot = state.slot(tile.cache_order);
        state.active.insert(slot, Arc::new(tile));
    }

    /// Retire the active generation
    ///
    /// Active tiles move to the passive pool, where they can still be
    /// promoted by the next pass or evicted under pressure.
    pub fn begin_new_generation(&self) {
        let mut state = self.pools();
        let PoolState {
            active, passive, ..
        } = &mut *state;
        passive.absorb(active);
    }

    /// Store a thumbnail
    ///
    /// Returns `false` and drops `tile` if an identical thumbnail is already
    /// cached. The oldest thumbnail is evicted when the pool is full.
    pub fn insert_thumbnail(&self, tile: Tile) -> bool {
        let mut thumbs = self.thumbs();

        if thumbs.tiles.iter().any(|t| t.key == tile.key) {
            return false;
        }
        while thumbs.tiles.len() >= thumbs.capacity {
            thumbs.tiles.pop_front();
        }
        thumbs.tiles.push_back(Arc::new(tile));
        true
    }

    /// Check for a thumbnail
    pub fn contains_thumbnail(&self, key: &TileKey) -> bool {
        self.thumbs().tiles.iter().any(|t| &t.key == key)
    }

    /// Release every cached tile and thumbnail
    pub fn clear(&self) {
        {
            let mut state = self.pools();
            state.active.clear();
            state.passive.clear();
        }
        self.thumbs().tiles.clear();
    }

    /// Page tiles in draw order
    ///
    /// Passive tiles come first, then active ones, each by ascending cache
    /// order, so fresher tiles paint over stale ones.
    pub fn page_tiles(&self) -> Vec<Arc<Tile>> {
        let state = self.pools();
        state
            .passive
            .tiles()
            .chain(state.active.tiles())
            .cloned()
            .collect()
    }

    /// Cached thumbnails, oldest first
    pub fn thumbnails(&self) -> Vec<Arc<Tile>> {
        self.thumbs().tiles.iter().cloned().collect()
    }

    /// Number of page tiles in both generations
    pub fn len(&self) -> usize {
        self.pools().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Maximum number of page tiles
    pub fn capacity(&self) -> usize {
        self.pools().capacity
    }

    pub fn stats(&self) -> CacheStats {
        let mut stats = {
            let state = self.pools();
            let mut stats = state.stats;
            stats.active = state.active.len();
            stats.passive = state.passive.len();
            stats
        };
        stats.thumbnails = self.thumbs().tiles.len();
        stats
    }
}

impl Default for TileCache {
    fn default() -> Self {
        Self::new(CacheConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tile::RelativeBounds;
    use image::RgbaImage;
    use rand::seq::SliceRandom;

    fn key(page: usize, index: usize) -> TileKey {
        let left = index as f32 / 1024.0;
        TileKey::new(page, RelativeBounds::new(left, 0.0, left + 0.001, 0.5), false, "")
    }

    fn tile(key: TileKey, order: u64) -> Tile {
        Tile::new(key, order, RgbaImage::new(4, 4))
    }

    #[test]
    fn test_insert_and_lookup() {
        let cache = TileCache::default();
        cache.insert(tile(key(0, 0), 1));

        assert!(cache.lookup_and_promote(&key(0, 0), 2));
        assert!(!cache.lookup_and_promote(&key(0, 1), 3));

        let stats = cache.stats();
        assert_eq!(stats.active, 1);
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.promotions, 0);
    }

    #[test]
    fn test_capacity_scenario() {
        let cache = TileCache::new(CacheConfig::default().with_capacity(120));
        for i in 0..130 {
            cache.insert(tile(key(0, i), i as u64 + 1));
        }

        assert_eq!(cache.len(), 120);
        for i in 0..10 {
            assert!(!cache.contains(&key(0, i)), "tile {} should be evicted", i);
        }
        for i in 10..130 {
            assert!(cache.contains(&key(0, i)), "tile {} should be cached", i);
        }
        assert_eq!(cache.stats().evictions, 10);
    }

    #[test]
    fn test_capacity_never_exceeded() {
        let cache = TileCache::new(CacheConfig::default().with_capacity(16));
        let mut orders: Vec<u64> = (0..200).collect();
        orders.shuffle(&mut rand::thread_rng());

        for (i, order) in orders.into_iter().enumerate() {
            cache.insert(tile(key(i % 5, i % 40), order));
            if i % 7 == 0 {
                cache.begin_new_generation();
            }
            assert!(cache.len() <= 16);
        }
    }

    #[test]
    fn test_passive_evicted_before_active() {
        let cache = TileCache::new(CacheConfig::default().with_capacity(3));
        cache.insert(tile(key(0, 0), 10));
        cache.insert(tile(key(0, 1), 11));
        cache.begin_new_generation();

        // Active tile has a lower order than both passive ones
        cache.insert(tile(key(0, 2), 1));
        cache.insert(tile(key(0, 3), 2));

        assert!(!cache.contains(&key(0, 0)));
        assert!(cache.contains(&key(0, 1)));
        assert!(cache.contains(&key(0, 2)));
        assert!(cache.contains(&key(0, 3)));
    }

    #[test]
    fn test_active_evicted_by_lowest_order() {
        let cache = TileCache::new(CacheConfig::default().with_capacity(2));
        cache.insert(tile(key(0, 0), 5));
        cache.insert(tile(key(0, 1), 3));
        cache.insert(tile(key(0, 2), 7));

        assert!(cache.contains(&key(0, 0)));
        assert!(!cache.contains(&key(0, 1)));
        assert!(cache.contains(&key(0, 2)));
    }

    #[test]
    fn test_generation_keeps_tiles_reusable() {
        let cache = TileCache::default();
        cache.insert(tile(key(1, 0), 1));
        cache.begin_new_generation();

        let stats = cache.stats();
        assert_eq!((stats.active, stats.passive), (0, 1));

        assert!(cache.lookup_and_promote(&key(1, 0), 9));
        let stats = cache.stats();
        assert_eq!((stats.active, stats.passive), (1, 0));
        assert_eq!(stats.promotions, 1);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_promoted_tile_outlives_older_active_tiles() {
        let cache = TileCache::new(CacheConfig::default().with_capacity(2));
        cache.insert(tile(key(0, 0), 1));
        cache.begin_new_generation();
        cache.insert(tile(key(0, 1), 2));

        // Promotion gives the passive tile the highest order
        assert!(cache.lookup_and_promote(&key(0, 0), 3));
        cache.insert(tile(key(0, 2), 4));

        assert!(cache.contains(&key(0, 0)));
        assert!(!cache.contains(&key(0, 1)));
    }

    #[test]
    fn test_reinsert_replaces_without_duplicate() {
        let cache = TileCache::default();
        cache.insert(tile(key(0, 0), 1));
        cache.begin_new_generation();
        cache.insert(tile(key(0, 0), 2));

        assert_eq!(cache.len(), 1);
        assert!(cache.lookup_and_promote(&key(0, 0), 3));
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.page_tiles()[0].cache_order, 2);
    }

    #[test]
    fn test_search_query_is_part_of_identity() {
        let cache = TileCache::default();
        let plain = TileKey::new(0, RelativeBounds::FULL, false, "");
        cache.insert(tile(plain, 1));

        let searched = TileKey::new(0, RelativeBounds::FULL, false, "angular");
        assert!(!cache.lookup_and_promote(&searched, 2));
    }

    #[test]
    fn test_page_tiles_draw_order() {
        let cache = TileCache::default();
        cache.insert(tile(key(0, 0), 5));
        cache.insert(tile(key(0, 1), 1));
        cache.begin_new_generation();
        cache.insert(tile(key(0, 2), 3));

        let orders: Vec<u64> = cache.page_tiles().iter().map(|t| t.cache_order).collect();
        assert_eq!(orders, vec![1, 5, 3]);
    }

    #[test]
    fn test_thumbnails_fifo_and_dedup() {
        let cache = TileCache::new(CacheConfig::default().with_thumbnail_capacity(2));

        assert!(cache.insert_thumbnail(tile(TileKey::thumbnail(0, ""), 0)));
        assert!(!cache.insert_thumbnail(tile(TileKey::thumbnail(0, ""), 0)));
        assert!(cache.insert_thumbnail(tile(TileKey::thumbnail(1, ""), 0)));
        assert!(cache.insert_thumbnail(tile(TileKey::thumbnail(2, ""), 0)));

        assert!(!cache.contains_thumbnail(&TileKey::thumbnail(0, "")));
        assert!(cache.contains_thumbnail(&TileKey::thumbnail(1, "")));
        assert!(cache.contains_thumbnail(&TileKey::thumbnail(2, "")));
        assert_eq!(cache.thumbnails().len(), 2);
        // Thumbnails never count against page tile capacity
        assert_eq!(cache.len(), 0);
    }

    #[test]
    fn test_clear_releases_everything() {
        let cache = TileCache::default();
        cache.insert(tile(key(0, 0), 1));
        cache.begin_new_generation();
        cache.insert(tile(key(0, 1), 2));
        cache.insert_thumbnail(tile(TileKey::thumbnail(0, ""), 0));

        let held = cache.page_tiles();
        cache.clear();

        assert!(cache.is_empty());
        assert!(cache.thumbnails().is_empty());
        // Only the snapshot keeps the buffers alive now
        assert!(held.iter().all(|t| Arc::strong_count(t) == 1));
    }

    #[test]
    fn test_shared_handle() {
        let cache = TileCache::default();
        let other = cache.clone();

        let writer = std::thread::spawn(move || {
            for i in 0..50 {
                other.insert(tile(key(0, i), i as u64));
            }
        });
        writer.join().unwrap();

        assert_eq!(cache.len(), 50);
    }
}
