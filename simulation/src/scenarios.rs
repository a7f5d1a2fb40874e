//! Scenario runner
//!
//! A [`Scenario`] spins up one node runner per address in its topology,
//! issues a single entanglement request and waits for the flow to settle.
//! The control channel is in-memory, so every node can reach every other
//! node; only the topology decides which hops a request takes.

use std::collections::BTreeMap;
use std::fmt::{self, Display};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use qnet_core::{FlowId, MockNetwork, MockTransport, NodeAddress, Route};
use qnet_logging::spans;
use qnet_network::{
    Disposition, FlowSession, LayerConfig, LayerStats, NetworkError, NetworkLayer, NetworkResult,
    NodeHandle, NodeRunner,
};
use qnet_routing::{DijkstraRouting, TopologySpec, shortest_path};
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tracing::{Instrument, info, info_span, warn};

type SimLayer = NetworkLayer<DijkstraRouting, Arc<MockTransport>>;

/// One entanglement request across a topology
#[derive(Debug, Clone)]
pub struct Scenario {
    pub topology: TopologySpec,
    pub source: NodeAddress,
    pub destination: NodeAddress,
    pub flow_id: FlowId,
    /// Applied to every node
    pub layer_config: LayerConfig,
    /// How long to wait for the flow to settle before giving up
    pub settle_timeout: Duration,
}

impl Scenario {
    pub fn new(
        topology: TopologySpec,
        source: NodeAddress,
        destination: NodeAddress,
        flow_id: FlowId,
    ) -> Self {
        Self {
            topology,
            source,
            destination,
            flow_id,
            layer_config: LayerConfig::default(),
            settle_timeout: Duration::from_secs(5),
        }
    }

    pub fn with_layer_config(mut self, config: LayerConfig) -> Self {
        self.layer_config = config;
        self
    }

    pub fn with_settle_timeout(mut self, settle_timeout: Duration) -> Self {
        self.settle_timeout = settle_timeout;
        self
    }

    /// Every node that takes part, in address order
    ///
    /// The endpoints are included even when no link touches them.
    pub fn nodes(&self) -> Vec<NodeAddress> {
        let mut nodes = self.topology.nodes();
        nodes.extend([self.source, self.destination]);
        nodes.sort();
        nodes.dedup();
        nodes
    }

    /// Run the scenario to completion
    pub async fn run(&self) -> Result<ScenarioReport> {
        let span = info_span!(
            spans::SCENARIO,
            source = %self.source,
            dest = %self.destination,
            flow_id = self.flow_id,
        );
        self.run_inner().instrument(span).await
    }

    async fn run_inner(&self) -> Result<ScenarioReport> {
        let topology = self
            .topology
            .build()
            .context("invalid topology")?
            .into_shared();
        let route = shortest_path(&topology.read(), self.source, self.destination);
        match &route {
            Some(route) => info!(%route, "Expected route"),
            None => info!("No route between the endpoints"),
        }

        let nodes = self.nodes();
        let network = MockNetwork::with_nodes(nodes.iter().copied());
        let (shutdown, shutdown_rx) = watch::channel(false);

        let mut tasks: Vec<JoinHandle<NetworkResult<SimLayer>>> = Vec::with_capacity(nodes.len());
        let mut handles = BTreeMap::new();
        for &node in &nodes {
            let transport = network
                .transport(&node)
                .with_context(|| format!("no control channel for {node}"))?;
            let routing = DijkstraRouting::with_topology(topology.clone());
            let layer = NetworkLayer::with_config(routing, transport, self.layer_config.clone());
            let (task, handle) = NodeRunner::spawn(layer, shutdown_rx.clone());
            tasks.push(task);
            handles.insert(node, handle);
        }
        info!(nodes = nodes.len(), "Node runners started");

        let outcome = self.drive(&handles).await;

        shutdown.send_replace(true);
        let mut reports = Vec::with_capacity(tasks.len());
        for task in tasks {
            let layer = task.await??;
            reports.push(NodeReport::from_layer(&layer));
        }

        let (disposition, completed) = outcome?;
        info!(%disposition, completed, "Scenario finished");

        Ok(ScenarioReport {
            source: self.source,
            destination: self.destination,
            flow_id: self.flow_id,
            disposition,
            route,
            completed,
            nodes: reports,
        })
    }

    /// Issue the request and wait for it to settle
    async fn drive(&self, handles: &BTreeMap<NodeAddress, NodeHandle>) -> Result<(Disposition, bool)> {
        let source = handles
            .get(&self.source)
            .with_context(|| format!("no runner for source {}", self.source))?;
        let disposition = source
            .request_entanglement(self.destination, self.flow_id)
            .await?;

        if disposition.is_terminated() {
            info!("Request terminated at the source");
            return Ok((disposition, true));
        }
        if !disposition.is_forwarded() {
            warn!(%disposition, "Request was not sent");
            return Ok((disposition, false));
        }

        let completed = match timeout(self.settle_timeout, self.settle(handles)).await {
            Ok(Ok(())) => true,
            Ok(Err(e)) => {
                warn!(error = %e, "Runner stopped before the flow settled");
                false
            }
            Err(_) => {
                warn!(timeout = ?self.settle_timeout, "Flow did not settle in time");
                false
            }
        };
        Ok((disposition, completed))
    }

    /// Destination terminates the request; with replies enabled the source
    /// also has to consume the reply
    async fn settle(&self, handles: &BTreeMap<NodeAddress, NodeHandle>) -> Result<(), NetworkError> {
        if let Some(destination) = handles.get(&self.destination) {
            destination.wait_for_stats(|s| s.terminated > 0).await?;
        }
        if self.layer_config.reply_on_termination {
            if let Some(source) = handles.get(&self.source) {
                source.wait_for_stats(|s| s.terminated > 0).await?;
            }
        }
        Ok(())
    }
}

/// What one node did during a scenario
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeReport {
    pub address: NodeAddress,
    pub stats: LayerStats,
    /// Sessions in flow order
    pub sessions: Vec<FlowSession>,
    /// Neighbors the router was told had failed
    pub failed_neighbors: Vec<NodeAddress>,
}

impl NodeReport {
    fn from_layer(layer: &SimLayer) -> Self {
        let mut sessions: Vec<_> = layer.sessions().iter().cloned().collect();
        sessions.sort_by_key(|s| s.flow_id);
        Self {
            address: layer.address(),
            stats: layer.stats(),
            sessions,
            failed_neighbors: layer.routing().failures().neighbors(),
        }
    }
}

/// Outcome of a [`Scenario`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioReport {
    pub source: NodeAddress,
    pub destination: NodeAddress,
    pub flow_id: FlowId,
    /// What the source did with the request
    pub disposition: Disposition,
    /// Shortest path according to the shared topology
    pub route: Option<Route>,
    /// Whether the flow reached its destination (and the reply, if enabled,
    /// made it back) before the timeout
    pub completed: bool,
    /// Per-node results in address order
    pub nodes: Vec<NodeReport>,
}

impl ScenarioReport {
    /// Report for `address`, if it took part
    pub fn node(&self, address: NodeAddress) -> Option<&NodeReport> {
        self.nodes.iter().find(|n| n.address == address)
    }

    /// Nodes that relayed at least one message, in address order
    pub fn relays(&self) -> Vec<NodeAddress> {
        self.nodes
            .iter()
            .filter(|n| n.stats.relayed > 0)
            .map(|n| n.address)
            .collect()
    }
}

impl Display for ScenarioReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Flow {}: {} -> {}",
            self.flow_id, self.source, self.destination
        )?;
        match &self.route {
            Some(route) => writeln!(f, "  route:       {}", route)?,
            None => writeln!(f, "  route:       none")?,
        }
        writeln!(f, "  disposition: {}", self.disposition)?;
        writeln!(f, "  completed:   {}", self.completed)?;
        writeln!(f)?;
        writeln!(
            f,
            "  {:<15} {:>10} {:>7} {:>10} {:>7} {:>7}  sessions",
            "node", "originated", "relayed", "terminated", "replies", "dropped"
        )?;
        for node in &self.nodes {
            let roles: Vec<String> = node
                .sessions
                .iter()
                .map(|s| format!("{}:{}", s.flow_id, s.role))
                .collect();
            writeln!(
                f,
                "  {:<15} {:>10} {:>7} {:>10} {:>7} {:>7}  {}",
                node.address.to_string(),
                node.stats.originated,
                node.stats.relayed,
                node.stats.terminated,
                node.stats.replies_sent,
                node.stats.dropped,
                roles.join(", ")
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::topologies::{self, DIAMOND_NODES};
    use qnet_network::SessionRole;

    #[test]
    fn test_nodes_include_isolated_endpoints() {
        let stray = NodeAddress::new(192, 168, 0, 1);
        let scenario = Scenario::new(topologies::diamond(), DIAMOND_NODES[0], stray, 1);
        let nodes = scenario.nodes();
        assert_eq!(nodes.len(), 5);
        assert!(nodes.contains(&stray));
    }

    #[tokio::test]
    async fn test_diamond_takes_cheap_path() {
        let [a, _, c, d] = DIAMOND_NODES;
        let report = Scenario::new(topologies::diamond(), a, d, 101)
            .run()
            .await
            .unwrap();

        assert!(report.completed);
        assert_eq!(report.disposition, Disposition::Forwarded { next_hop: c });
        assert_eq!(report.route.as_ref().unwrap().cost, 1.0);
        assert_eq!(report.relays(), vec![c]);

        let terminating = report.node(d).unwrap();
        assert_eq!(terminating.sessions.len(), 1);
        assert_eq!(terminating.sessions[0].role, SessionRole::Terminating);
    }

    #[test]
    fn test_report_rendering() {
        let report = ScenarioReport {
            source: DIAMOND_NODES[0],
            destination: DIAMOND_NODES[3],
            flow_id: 7,
            disposition: Disposition::Terminated,
            route: None,
            completed: false,
            nodes: Vec::new(),
        };
        let text = report.to_string();
        assert!(text.starts_with("Flow 7: 10.1.1.1 -> 10.1.1.4"));
        assert!(text.contains("route:       none"));
    }
}
