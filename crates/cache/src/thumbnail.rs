//! Bounded thumbnail cache with LRU eviction
//!
//! In-memory store for rendered page thumbnails, bounded by both an entry
//! count and a total byte budget. When either budget is exceeded the least
//! recently used entries are evicted.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

/// A cache key that uniquely identifies a rendered thumbnail.
///
/// This is a u64 hash key derived from the page identity and the render
/// target size, never from the page's position in the collection.
pub type CacheKey = u64;

/// Default maximum number of resident thumbnails.
pub const DEFAULT_MAX_ENTRIES: usize = 200;

/// Default byte budget for resident thumbnails (64 MB).
pub const DEFAULT_MAX_BYTES: usize = 64 * 1024 * 1024;

/// Cached thumbnail data.
#[derive(Debug, Clone)]
pub struct CachedThumbnail {
    /// Cache key for this thumbnail
    pub key: CacheKey,

    /// Raw pixel data (RGBA format)
    pub pixels: Vec<u8>,

    /// Width in pixels
    pub width: u32,

    /// Height in pixels
    pub height: u32,
}

impl CachedThumbnail {
    /// Create a new cached thumbnail.
    pub fn new(key: CacheKey, pixels: Vec<u8>, width: u32, height: u32) -> Self {
        Self {
            key,
            pixels,
            width,
            height,
        }
    }

    /// Get the memory cost of this thumbnail in bytes.
    pub fn memory_size(&self) -> usize {
        self.pixels.len()
    }
}

/// Statistics about cache usage.
#[derive(Debug, Clone, Copy, Default)]
pub struct CacheStats {
    /// Number of thumbnails currently resident
    pub entry_count: usize,

    /// Total memory used by resident thumbnails (bytes)
    pub bytes_used: usize,

    /// Maximum number of entries allowed
    pub max_entries: usize,

    /// Maximum memory allowed (bytes)
    pub max_bytes: usize,

    /// Number of cache hits
    pub hits: u64,

    /// Number of cache misses
    pub misses: u64,

    /// Number of thumbnails evicted due to budget pressure
    pub evictions: u64,
}

impl CacheStats {
    /// Calculate the cache hit rate (0.0 to 1.0).
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

/// Internal cache state.
struct CacheState {
    /// Map from cache key to thumbnail data
    entries: HashMap<CacheKey, CachedThumbnail>,

    /// LRU queue (most recently used at back, least recently used at front)
    lru_queue: VecDeque<CacheKey>,

    /// Current memory usage in bytes
    bytes_used: usize,

    /// Entry count budget
    max_entries: usize,

    /// Byte budget
    max_bytes: usize,

    /// Statistics
    stats: CacheStats,
}

impl CacheState {
    fn new(max_entries: usize, max_bytes: usize) -> Self {
        Self {
            entries: HashMap::new(),
            lru_queue: VecDeque::new(),
            bytes_used: 0,
            max_entries: max_entries.max(1),
            max_bytes,
            stats: CacheStats {
                max_entries: max_entries.max(1),
                max_bytes,
                ..Default::default()
            },
        }
    }

    /// Move a key to the back of the LRU queue (mark as most recently used).
    fn touch(&mut self, key: CacheKey) {
        self.lru_queue.retain(|&k| k != key);
        self.lru_queue.push_back(key);
    }

    fn over_budget(&self) -> bool {
        self.entries.len() > self.max_entries || self.bytes_used > self.max_bytes
    }

    /// Evict the least recently used thumbnail.
    fn evict_lru(&mut self) -> bool {
        if let Some(key) = self.lru_queue.pop_front() {
            if let Some(entry) = self.entries.remove(&key) {
                self.bytes_used = self.bytes_used.saturating_sub(entry.memory_size());
                self.stats.evictions += 1;
                self.sync_stats();
                return true;
            }
        }
        false
    }

    /// Evict until both budgets hold, always keeping at least one entry.
    ///
    /// The one-entry floor is what lets a single thumbnail larger than the
    /// whole byte budget be accepted: everything else is evicted and the
    /// oversized entry stays resident.
    fn evict_to_budget(&mut self) {
        while self.over_budget() && self.entries.len() > 1 {
            if !self.evict_lru() {
                break;
            }
        }
    }

    fn sync_stats(&mut self) {
        self.stats.entry_count = self.entries.len();
        self.stats.bytes_used = self.bytes_used;
    }
}

/// Bounded thumbnail cache with LRU eviction.
///
/// Thread-safe store for rendered thumbnails, shared by all in-flight render
/// workers. Inserting past either budget evicts least recently used entries
/// until both budgets are satisfied; an insert is never rejected.
///
/// # Example
///
/// ```
/// use pdf_binder_cache::ThumbnailCache;
///
/// // 100 entries, 16MB
/// let cache = ThumbnailCache::new(100, 16 * 1024 * 1024);
///
/// let pixels = vec![0u8; 140 * 180 * 4];
/// cache.put(42, pixels, 140, 180);
///
/// if let Some(thumb) = cache.get(42) {
///     println!("hit: {}x{}", thumb.width, thumb.height);
/// }
/// ```
pub struct ThumbnailCache {
    state: Arc<Mutex<CacheState>>,
}

impl ThumbnailCache {
    /// Create a cache bounded by `max_entries` thumbnails and `max_bytes`
    /// total pixel bytes.
    pub fn new(max_entries: usize, max_bytes: usize) -> Self {
        Self {
            state: Arc::new(Mutex::new(CacheState::new(max_entries, max_bytes))),
        }
    }

    /// Store a thumbnail in the cache.
    ///
    /// Replaces any thumbnail already stored under `key`. If the insert
    /// pushes the cache past either budget, least recently used entries are
    /// evicted; the entry just inserted is only evicted once it is itself
    /// the least recently used of at least two entries.
    pub fn put(&self, key: CacheKey, pixels: Vec<u8>, width: u32, height: u32) {
        let mut state = self.state.lock().unwrap();

        let entry = CachedThumbnail::new(key, pixels, width, height);
        let cost = entry.memory_size();

        if let Some(old) = state.entries.remove(&key) {
            state.bytes_used = state.bytes_used.saturating_sub(old.memory_size());
            state.lru_queue.retain(|&k| k != key);
        }

        state.bytes_used += cost;
        state.entries.insert(key, entry);
        state.touch(key);

        state.evict_to_budget();
        state.sync_stats();
    }

    /// Retrieve a thumbnail, marking it as most recently used.
    ///
    /// Returns `None` on a miss.
    pub fn get(&self, key: CacheKey) -> Option<CachedThumbnail> {
        let mut state = self.state.lock().unwrap();

        if let Some(entry) = state.entries.get(&key).cloned() {
            state.touch(key);
            state.stats.hits += 1;
            Some(entry)
        } else {
            state.stats.misses += 1;
            None
        }
    }

    /// Check if a thumbnail is resident without updating LRU tracking.
    pub fn contains(&self, key: CacheKey) -> bool {
        self.state.lock().unwrap().entries.contains_key(&key)
    }

    /// Remove a thumbnail from the cache.
    ///
    /// Returns the removed thumbnail, or `None` if it was not resident.
    pub fn remove(&self, key: CacheKey) -> Option<CachedThumbnail> {
        let mut state = self.state.lock().unwrap();

        if let Some(entry) = state.entries.remove(&key) {
            state.bytes_used = state.bytes_used.saturating_sub(entry.memory_size());
            state.lru_queue.retain(|&k| k != key);
            state.sync_stats();
            Some(entry)
        } else {
            None
        }
    }

    /// Drop all entries unconditionally.
    pub fn clear(&self) {
        let mut state = self.state.lock().unwrap();
        state.entries.clear();
        state.lru_queue.clear();
        state.bytes_used = 0;
        state.sync_stats();
    }

    /// Shrink or grow the byte budget.
    ///
    /// Shrinking below current usage evicts entries immediately (down to the
    /// one-entry floor).
    pub fn set_max_bytes(&self, max_bytes: usize) {
        let mut state = self.state.lock().unwrap();
        state.max_bytes = max_bytes;
        state.stats.max_bytes = max_bytes;
        state.evict_to_budget();
        state.sync_stats();
    }

    /// Get current cache statistics.
    pub fn stats(&self) -> CacheStats {
        self.state.lock().unwrap().stats
    }

    /// Get the number of resident thumbnails.
    pub fn len(&self) -> usize {
        self.state.lock().unwrap().entries.len()
    }

    /// Check whether the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.state.lock().unwrap().entries.is_empty()
    }

    /// Get the current memory usage in bytes.
    pub fn bytes_used(&self) -> usize {
        self.state.lock().unwrap().bytes_used
    }

    /// Get the entry count budget.
    pub fn max_entries(&self) -> usize {
        self.state.lock().unwrap().max_entries
    }

    /// Get the byte budget.
    pub fn max_bytes(&self) -> usize {
        self.state.lock().unwrap().max_bytes
    }
}

impl Default for ThumbnailCache {
    /// Create a cache with the default budgets.
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ENTRIES, DEFAULT_MAX_BYTES)
    }
}
