//! In-memory LRU cache of online lyric resolutions.

use crate::lyrics::ResolvedLyrics;
use lru::LruCache;
use std::num::NonZeroUsize;
use std::sync::Arc;
use tracing::debug;

const LOG_TARGET: &str = "lyricsync::cache";

/// Default number of resolved tracks kept in memory
pub const DEFAULT_CACHE_CAPACITY: usize = 50;

/// Bounded least-recently-used store of resolved lyrics, keyed by track path.
///
/// Both reads and inserts count as an access. Inserting past capacity evicts
/// exactly the least recently accessed entry.
pub struct LyricsCache {
    entries: LruCache<String, Arc<ResolvedLyrics>>,
}

impl LyricsCache {
    /// Create a cache holding at most `capacity` entries (minimum 1)
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: LruCache::new(capacity),
        }
    }

    /// Look up a track and mark it most recently used
    pub fn get(&mut self, key: &str) -> Option<Arc<ResolvedLyrics>> {
        let hit = self.entries.get(key).cloned();
        debug!(
            target: LOG_TARGET,
            "Cache {} for {}",
            if hit.is_some() { "hit" } else { "miss" },
            key
        );
        hit
    }

    /// Insert or replace a track's lyrics.
    ///
    /// Returns the key of the entry evicted to make room, if any.
    pub fn insert(&mut self, key: impl Into<String>, value: Arc<ResolvedLyrics>) -> Option<String> {
        let key = key.into();
        match self.entries.push(key.clone(), value) {
            Some((old_key, _)) if old_key != key => {
                debug!(target: LOG_TARGET, "Evicted least recently used entry {}", old_key);
                Some(old_key)
            }
            _ => None,
        }
    }

    /// Remove a track's entry
    pub fn remove(&mut self, key: &str) -> Option<Arc<ResolvedLyrics>> {
        self.entries.pop(key)
    }

    /// Read an entry without touching its recency
    #[must_use]
    pub fn peek(&self, key: &str) -> Option<Arc<ResolvedLyrics>> {
        self.entries.peek(key).cloned()
    }

    /// Check for an entry without touching its recency
    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains(key)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.entries.cap().get()
    }
}

impl Default for LyricsCache {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_CAPACITY)
    }
}
