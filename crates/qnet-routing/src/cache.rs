//! Route cache for computed next hops
//!
//! The [`RouteCache`] keeps the result of recent shortest-path searches so
//! repeated requests toward the same destination skip the search.
//!
//! Entries are tagged with the topology generation they were computed
//! against. An entry from an older generation, or older than the stale
//! timeout, is treated as a miss. The first lookup after the topology
//! changes drops every entry from older generations.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use qnet_core::NodeAddress;

/// A cached next-hop decision
#[derive(Debug, Clone, PartialEq)]
pub struct CachedRoute {
    /// First hop from the source
    pub next_hop: NodeAddress,
    /// Total cost of the path
    pub cost: f64,
    /// Links on the path
    pub hop_count: usize,
    /// Topology generation the path was computed against
    pub generation: u64,
    /// When the entry was inserted
    pub inserted_at: DateTime<Utc>,
}

/// Next-hop cache keyed by (source, destination)
pub struct RouteCache {
    routes: DashMap<(NodeAddress, NodeAddress), CachedRoute>,
    stale_timeout: Duration,
    /// Generation the cache was last pruned for
    observed: AtomicU64,
}

impl RouteCache {
    /// Create a cache whose entries go stale after `stale_timeout`
    pub fn new(stale_timeout: Duration) -> Self {
        Self {
            routes: DashMap::new(),
            stale_timeout,
            observed: AtomicU64::new(0),
        }
    }

    /// Store a route computed against `generation`
    pub fn insert(
        &self,
        source: NodeAddress,
        destination: NodeAddress,
        next_hop: NodeAddress,
        cost: f64,
        hop_count: usize,
        generation: u64,
    ) {
        self.routes.insert(
            (source, destination),
            CachedRoute {
                next_hop,
                cost,
                hop_count,
                generation,
                inserted_at: Utc::now(),
            },
        );
    }

    /// Look up a route that is still valid for `generation`
    pub fn get(
        &self,
        source: NodeAddress,
        destination: NodeAddress,
        generation: u64,
    ) -> Option<CachedRoute> {
        let entry = self.routes.get(&(source, destination))?;
        if entry.generation != generation || self.is_expired(&entry) {
            return None;
        }
        Some(entry.clone())
    }

    /// Drop every entry that is stale or from a generation other than `generation`
    pub fn prune(&self, generation: u64) {
        let max_age = self.max_age();
        let now = Utc::now();
        self.routes
            .retain(|_, entry| entry.generation == generation && now - entry.inserted_at <= max_age);
    }

    /// Prune once whenever the topology moves to a new generation
    ///
    /// Returns `true` if this call pruned.
    pub fn observe_generation(&self, generation: u64) -> bool {
        if self.observed.swap(generation, Ordering::AcqRel) == generation {
            return false;
        }
        self.prune(generation);
        true
    }

    /// Remove every cached route
    pub fn clear(&self) {
        self.routes.clear();
    }

    /// Number of cached routes
    pub fn len(&self) -> usize {
        self.routes.len()
    }

    /// Check if the cache is empty
    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    fn is_expired(&self, entry: &CachedRoute) -> bool {
        Utc::now() - entry.inserted_at > self.max_age()
    }

    fn max_age(&self) -> chrono::Duration {
        chrono::Duration::from_std(self.stale_timeout).unwrap_or(chrono::Duration::MAX)
    }
}

impl Default for RouteCache {
    fn default() -> Self {
        // Default 5 minute stale timeout
        Self::new(Duration::from_secs(300))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(last: u8) -> NodeAddress {
        NodeAddress::new(10, 0, 0, last)
    }

    #[test]
    fn test_insert_and_get() {
        let cache = RouteCache::default();
        cache.insert(addr(1), addr(4), addr(3), 1.0, 2, 7);

        let hit = cache.get(addr(1), addr(4), 7).unwrap();
        assert_eq!(hit.next_hop, addr(3));
        assert_eq!(hit.hop_count, 2);
        assert!(cache.get(addr(2), addr(4), 7).is_none());
    }

    #[test]
    fn test_generation_mismatch_is_miss() {
        let cache = RouteCache::default();
        cache.insert(addr(1), addr(4), addr(3), 1.0, 2, 7);

        assert!(cache.get(addr(1), addr(4), 8).is_none());
        cache.prune(8);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_observe_generation_prunes_once_per_change() {
        let cache = RouteCache::default();
        cache.insert(addr(1), addr(4), addr(3), 1.0, 2, 0);
        assert!(!cache.observe_generation(0));
        assert_eq!(cache.len(), 1);

        cache.insert(addr(1), addr(5), addr(3), 2.0, 3, 1);
        assert!(cache.observe_generation(1));
        assert_eq!(cache.len(), 1);
        assert!(cache.get(addr(1), addr(5), 1).is_some());
        assert!(!cache.observe_generation(1));
    }

    #[test]
    fn test_staleness() {
        let cache = RouteCache::new(Duration::from_millis(10));
        cache.insert(addr(1), addr(4), addr(3), 1.0, 2, 1);
        assert!(cache.get(addr(1), addr(4), 1).is_some());

        std::thread::sleep(Duration::from_millis(20));

        assert!(cache.get(addr(1), addr(4), 1).is_none());
        cache.prune(1);
        assert_eq!(cache.len(), 0);
    }

    #[test]
    fn test_clear() {
        let cache = RouteCache::default();
        cache.insert(addr(1), addr(4), addr(3), 1.0, 2, 1);
        cache.insert(addr(1), addr(5), addr(3), 2.0, 3, 1);
        assert_eq!(cache.len(), 2);

        cache.clear();
        assert!(cache.is_empty());
    }
}
