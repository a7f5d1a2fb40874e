//! Link failure bookkeeping
//!
//! The network layer reports failed forwarding attempts through
//! `notify_link_failure`. The failures are only recorded here; nothing in
//! the routing decision reads them yet.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use qnet_core::NodeAddress;

/// Failure history for one neighbor
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailureRecord {
    /// Number of failures reported
    pub count: u64,
    /// First report
    pub first_seen: DateTime<Utc>,
    /// Most recent report
    pub last_seen: DateTime<Utc>,
}

/// Failures reported per neighbor
#[derive(Debug, Default)]
pub struct LinkFailureLog {
    records: DashMap<NodeAddress, FailureRecord>,
}

impl LinkFailureLog {
    /// Create an empty log
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one failure for `neighbor` and return its updated history
    pub fn record(&self, neighbor: NodeAddress) -> FailureRecord {
        let now = Utc::now();
        let mut entry = self.records.entry(neighbor).or_insert_with(|| FailureRecord {
            count: 0,
            first_seen: now,
            last_seen: now,
        });
        entry.count += 1;
        entry.last_seen = now;
        entry.clone()
    }

    /// Failure history of `neighbor`
    pub fn get(&self, neighbor: &NodeAddress) -> Option<FailureRecord> {
        self.records.get(neighbor).map(|r| r.clone())
    }

    /// Failures reported for `neighbor`
    pub fn count(&self, neighbor: &NodeAddress) -> u64 {
        self.records.get(neighbor).map(|r| r.count).unwrap_or(0)
    }

    /// Total failures across all neighbors
    pub fn total(&self) -> u64 {
        self.records.iter().map(|r| r.count).sum()
    }

    /// Neighbors with at least one failure, in address order
    pub fn neighbors(&self) -> Vec<NodeAddress> {
        let mut neighbors: Vec<_> = self.records.iter().map(|r| *r.key()).collect();
        neighbors.sort();
        neighbors
    }
}
