//! PDF Binder Cache Library
//!
//! Bounded thumbnail store with entry-count and byte budgets and LRU eviction.

pub mod thumbnail;

pub use thumbnail::{
    CacheKey, CacheStats, CachedThumbnail, ThumbnailCache, DEFAULT_MAX_BYTES, DEFAULT_MAX_ENTRIES,
};
