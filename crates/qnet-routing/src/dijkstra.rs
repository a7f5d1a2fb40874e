//! Shortest-path routing
//!
//! [`DijkstraRouting`] resolves next hops with Dijkstra's algorithm over the
//! shared [`TopologyStore`]. The link cost can encode any non-negative
//! quantity, for example `-log(P_success)` of an elementary link or its
//! physical length.
//!
//! ## Search
//!
//! 1. Start from the source with distance 0
//! 2. Pop the cheapest frontier entry; skip it if a better distance for
//!    that node was recorded after it was pushed (lazy deletion)
//! 3. Stop as soon as the destination is popped
//! 4. Otherwise relax every incident link with a strict `<`
//!
//! Frontier entries of equal cost pop in ascending address order, so the
//! chosen path is deterministic when several minimum-cost paths exist.

use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap};
use std::time::Duration;

use qnet_core::{NodeAddress, NodeContext, Route, RoutingError, RoutingProtocol, TopologyError};
use tracing::{debug, trace, warn};

use crate::cache::RouteCache;
use crate::failure::LinkFailureLog;
use crate::topology::{SharedTopology, TopologyStore};

/// Frontier entry ordered for a min-heap on (cost, address)
#[derive(Debug, Clone, Copy)]
struct FrontierEntry {
    cost: f64,
    node: NodeAddress,
}

impl PartialEq for FrontierEntry {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for FrontierEntry {}

impl PartialOrd for FrontierEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for FrontierEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        // BinaryHeap is a max heap; reverse so the cheapest, then lowest address, pops first
        other
            .cost
            .total_cmp(&self.cost)
            .then_with(|| other.node.cmp(&self.node))
    }
}

/// Minimum-cost path from `source` to `destination`
///
/// Returns `None` when the destination cannot be reached. A search from a
/// node to itself yields a zero-hop route.
pub fn shortest_path(
    topology: &TopologyStore,
    source: NodeAddress,
    destination: NodeAddress,
) -> Option<Route> {
    if source == destination {
        return Some(Route::new(vec![source], 0.0));
    }

    let mut dist: HashMap<NodeAddress, f64> = HashMap::new();
    let mut parent: HashMap<NodeAddress, NodeAddress> = HashMap::new();
    let mut frontier = BinaryHeap::new();

    dist.insert(source, 0.0);
    frontier.push(FrontierEntry {
        cost: 0.0,
        node: source,
    });

    let mut reached = false;
    while let Some(FrontierEntry { cost, node }) = frontier.pop() {
        if dist.get(&node).is_some_and(|best| cost > *best) {
            trace!(node = %node, cost, "Skipping stale frontier entry");
            continue;
        }
        if node == destination {
            reached = true;
            break;
        }

        for link in topology.neighbors(&node) {
            let candidate = cost + link.cost;
            if dist.get(&link.to).is_none_or(|best| candidate < *best) {
                dist.insert(link.to, candidate);
                parent.insert(link.to, node);
                frontier.push(FrontierEntry {
                    cost: candidate,
                    node: link.to,
                });
            }
        }
    }

    if !reached {
        return None;
    }

    // Walk the predecessor chain back to the source
    let mut hops = vec![destination];
    let mut current = destination;
    while current != source {
        current = *parent.get(&current)?;
        hops.push(current);
    }
    hops.reverse();

    Some(Route::new(hops, *dist.get(&destination)?))
}

/// Configuration for [`DijkstraRouting`]
#[derive(Debug, Clone)]
pub struct DijkstraConfig {
    /// Cache computed next hops per (source, destination)
    pub cache_routes: bool,
    /// Age after which a cached route is recomputed
    pub cache_stale_timeout: Duration,
}

impl Default for DijkstraConfig {
    fn default() -> Self {
        Self {
            cache_routes: true,
            cache_stale_timeout: Duration::from_secs(300),
        }
    }
}

impl DijkstraConfig {
    /// Disable the route cache
    pub fn without_cache(mut self) -> Self {
        self.cache_routes = false;
        self
    }

    /// Set the cache stale timeout
    pub fn with_cache_stale_timeout(mut self, timeout: Duration) -> Self {
        self.cache_stale_timeout = timeout;
        self
    }
}

/// Shortest-path routing over global topology knowledge
///
/// Each node gets its own instance, but instances built with
/// [`DijkstraRouting::with_topology`] share one topology: every node sees
/// every link, as a centralized link-state oracle would provide.
pub struct DijkstraRouting {
    /// Link topology, possibly shared with other nodes
    topology: SharedTopology,
    /// Node this instance routes for
    node: Option<NodeContext>,
    /// Computed next hops
    cache: RouteCache,
    /// Failures reported by the network layer
    failures: LinkFailureLog,
    config: DijkstraConfig,
}

impl DijkstraRouting {
    /// Create a routing instance with its own empty topology
    pub fn new() -> Self {
        Self::with_topology(TopologyStore::new().into_shared())
    }

    /// Create a routing instance over a shared topology
    pub fn with_topology(topology: SharedTopology) -> Self {
        Self::with_config(topology, DijkstraConfig::default())
    }

    /// Create a routing instance with custom configuration
    pub fn with_config(topology: SharedTopology, config: DijkstraConfig) -> Self {
        Self {
            topology,
            node: None,
            cache: RouteCache::new(config.cache_stale_timeout),
            failures: LinkFailureLog::new(),
            config,
        }
    }

    /// Add an undirected link to the topology
    pub fn add_link(&self, u: NodeAddress, v: NodeAddress, cost: f64) -> Result<(), TopologyError> {
        self.topology.write().add_link(u, v, cost)
    }

    /// Handle to the topology this instance reads
    pub fn topology(&self) -> &SharedTopology {
        &self.topology
    }

    /// Full minimum-cost path between two nodes
    pub fn shortest_path(&self, source: NodeAddress, destination: NodeAddress) -> Option<Route> {
        shortest_path(&self.topology.read(), source, destination)
    }

    /// Failures reported through [`RoutingProtocol::notify_link_failure`]
    pub fn failures(&self) -> &LinkFailureLog {
        &self.failures
    }

    /// Cached next hops
    pub fn cache(&self) -> &RouteCache {
        &self.cache
    }

    pub fn config(&self) -> &DijkstraConfig {
        &self.config
    }
}

impl Default for DijkstraRouting {
    fn default() -> Self {
        Self::new()
    }
}

impl RoutingProtocol for DijkstraRouting {
    fn bind(&mut self, node: NodeContext) {
        debug!(node = %node.address(), "Dijkstra routing bound to node");
        self.node = Some(node);
    }

    fn node(&self) -> Option<NodeContext> {
        self.node
    }

    fn next_hop(
        &self,
        source: NodeAddress,
        destination: NodeAddress,
    ) -> Result<NodeAddress, RoutingError> {
        if source == destination {
            return Ok(source);
        }

        let topology = self.topology.read();
        let generation = topology.generation();

        if self.config.cache_routes {
            if self.cache.observe_generation(generation) {
                trace!(generation, "Pruned routes from older topology generations");
            }
            if let Some(hit) = self.cache.get(source, destination, generation) {
                trace!(source = %source, dest = %destination, next_hop = %hit.next_hop, "Route cache hit");
                return Ok(hit.next_hop);
            }
        }

        let Some(route) = shortest_path(&topology, source, destination) else {
            warn!(source = %source, dest = %destination, "No path found");
            return Err(RoutingError::NoRoute { destination });
        };
        let next_hop = route.first_hop().ok_or(RoutingError::NoRoute { destination })?;

        debug!(
            source = %source,
            dest = %destination,
            next_hop = %next_hop,
            cost = route.cost,
            hops = route.hop_count(),
            "Resolved shortest path"
        );

        if self.config.cache_routes {
            self.cache.insert(
                source,
                destination,
                next_hop,
                route.cost,
                route.hop_count(),
                generation,
            );
        }

        Ok(next_hop)
    }

    fn notify_link_failure(&self, neighbor: NodeAddress) {
        let record = self.failures.record(neighbor);
        warn!(
            neighbor = %neighbor,
            failures = record.count,
            "Entanglement failure notified for neighbor"
        );
    }

    fn name(&self) -> &'static str {
        "dijkstra"
    }
}
