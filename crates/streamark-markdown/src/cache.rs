use crate::hash::SegmentHash;
use crate::segment::Segment;
use std::collections::HashMap;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub resets: u64,
}

/// Rendered output of closed segments, keyed by content hash.
///
/// The cache lives for one rendering session. Its only invalidation rule is
/// [`SegmentCache::reset_if_not_extension`]: when a new source does not start with the previous
/// one, the content was replaced rather than appended to and every entry is dropped.
#[derive(Clone, Debug)]
pub struct SegmentCache<T> {
    entries: HashMap<SegmentHash, T>,
    last_source: String,
    stats: CacheStats,
}

impl<T> Default for SegmentCache<T> {
    fn default() -> Self {
        Self {
            entries: HashMap::new(),
            last_source: String::new(),
            stats: CacheStats::default(),
        }
    }
}

impl<T> SegmentCache<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached output for a closed segment. Open segments always miss.
    pub fn lookup(&mut self, segment: &Segment) -> Option<&T> {
        let hit = if segment.closed {
            self.entries.get(&segment.hash)
        } else {
            None
        };
        if hit.is_some() {
            self.stats.hits += 1;
        } else {
            self.stats.misses += 1;
        }
        hit
    }

    /// Stores output for a closed segment, replacing any entry with the same hash.
    ///
    /// Returns `false` (and stores nothing) for open segments.
    pub fn store(&mut self, segment: &Segment, output: T) -> bool {
        if !segment.closed {
            tracing::debug!(hash = %segment.hash, "refusing to cache open segment");
            return false;
        }
        self.entries.insert(segment.hash, output);
        true
    }

    /// Clears every entry when `new_source` does not begin with the previously seen source.
    ///
    /// Returns `true` when the cache was cleared.
    pub fn reset_if_not_extension(&mut self, new_source: &str) -> bool {
        let replaced = !new_source.starts_with(self.last_source.as_str());
        if replaced {
            tracing::debug!(
                entries = self.entries.len(),
                "source replaced, clearing segment cache"
            );
            self.entries.clear();
            self.stats.resets += 1;
        }
        self.last_source.clear();
        self.last_source.push_str(new_source);
        replaced
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.last_source.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn stats(&self) -> CacheStats {
        self.stats
    }
}
