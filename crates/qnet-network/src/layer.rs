//! Network layer service
//!
//! The [`NetworkLayer`] turns routing decisions into control traffic. For
//! every message it re-derives the node's part from the message's
//! destination:
//!
//! 1. **ORIGINATE**: `request_entanglement` builds an `EPR_GEN_REQUEST` and
//!    sends it to the first hop
//! 2. **RELAY**: a request for another node is re-sent unchanged to the
//!    next hop toward its destination
//! 3. **TERMINATE**: a request for this node ends here, including one a
//!    node addresses to itself
//!
//! A session is opened only once the message has been handed to the
//! transport, so the registry never holds a flow that was not sent.
//!
//! Each outgoing message goes to exactly one next hop. Nothing is ever
//! broadcast, retried, or timed out.

use std::fmt;

use qnet_core::{
    ControlMessage, FlowId, NodeAddress, NodeContext, OperationType, RoutingProtocol, Transport,
};
use qnet_logging::spans;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, info_span, trace, warn};

use crate::config::LayerConfig;
use crate::session::{FlowOutcome, SessionRegistry, SessionRole};

/// Why a message was not sent or forwarded
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DropReason {
    /// Routing has no path to the destination
    NoRoute,
    /// The inbound datagram was shorter than a control message
    Truncated,
    /// The transport refused the datagram
    SendFailed,
}

impl fmt::Display for DropReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DropReason::NoRoute => write!(f, "no route"),
            DropReason::Truncated => write!(f, "truncated"),
            DropReason::SendFailed => write!(f, "send failed"),
        }
    }
}

/// What the layer did with a request or an inbound message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Disposition {
    /// Sent on to the next hop
    Forwarded { next_hop: NodeAddress },
    /// This node was the destination
    Terminated,
    /// Discarded
    Dropped { reason: DropReason },
    /// Valid but not handled by this layer
    Ignored,
}

impl Disposition {
    /// Create a drop disposition
    pub fn drop(reason: DropReason) -> Self {
        Self::Dropped { reason }
    }

    /// Check if the message was sent on
    pub fn is_forwarded(&self) -> bool {
        matches!(self, Self::Forwarded { .. })
    }

    /// Check if the message ended here
    pub fn is_terminated(&self) -> bool {
        matches!(self, Self::Terminated)
    }

    /// Check if the message was dropped
    pub fn is_dropped(&self) -> bool {
        matches!(self, Self::Dropped { .. })
    }

    /// Next hop, if the message was sent on
    pub fn next_hop(&self) -> Option<NodeAddress> {
        match self {
            Self::Forwarded { next_hop } => Some(*next_hop),
            _ => None,
        }
    }
}

impl fmt::Display for Disposition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Disposition::Forwarded { next_hop } => write!(f, "forwarded to {}", next_hop),
            Disposition::Terminated => write!(f, "terminated"),
            Disposition::Dropped { reason } => write!(f, "dropped ({})", reason),
            Disposition::Ignored => write!(f, "ignored"),
        }
    }
}

/// Per-node counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayerStats {
    /// Requests originated here and handed to the transport
    pub originated: u64,
    /// Messages relayed toward another node
    pub relayed: u64,
    /// Messages whose destination was this node
    pub terminated: u64,
    /// Success or failure replies sent
    pub replies_sent: u64,
    /// Requests or messages dropped
    pub dropped: u64,
    /// Messages ignored
    pub ignored: u64,
}

/// Control-plane network layer of one node
pub struct NetworkLayer<R, T> {
    address: NodeAddress,
    routing: R,
    transport: T,
    config: LayerConfig,
    sessions: SessionRegistry,
    stats: LayerStats,
}

impl<R, T> NetworkLayer<R, T>
where
    R: RoutingProtocol,
    T: Transport,
{
    /// Create a layer for the node that owns `transport`
    ///
    /// `routing` is bound to that node.
    pub fn new(routing: R, transport: T) -> Self {
        Self::with_config(routing, transport, LayerConfig::default())
    }

    /// Create a layer with custom configuration
    pub fn with_config(mut routing: R, transport: T, config: LayerConfig) -> Self {
        let address = transport.local_address();
        routing.bind(NodeContext::new(address));
        debug!(node = %address, routing = routing.name(), "Network layer created");
        Self {
            address,
            routing,
            transport,
            config,
            sessions: SessionRegistry::new(),
            stats: LayerStats::default(),
        }
    }

    /// Address of this node
    pub fn address(&self) -> NodeAddress {
        self.address
    }

    pub fn routing(&self) -> &R {
        &self.routing
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn config(&self) -> &LayerConfig {
        &self.config
    }

    /// Flow sessions opened at this node
    pub fn sessions(&self) -> &SessionRegistry {
        &self.sessions
    }

    pub fn stats(&self) -> LayerStats {
        self.stats
    }

    /// Start an entanglement request toward `destination`
    pub fn request_entanglement(&mut self, destination: NodeAddress, flow_id: FlowId) -> Disposition {
        let span = info_span!(spans::REQUEST_ENTANGLEMENT, node = %self.address, flow_id, dest = %destination);
        let _entered = span.enter();

        // Zero-hop request: the next hop is this node, so it terminates here
        if destination == self.address {
            self.sessions
                .open(flow_id, self.address, destination, SessionRole::Terminating);
            self.stats.terminated += 1;
            if self.config.reply_on_termination {
                self.sessions.record_outcome(flow_id, FlowOutcome::Succeeded);
            }
            info!("Entanglement request terminated at the requesting node");
            return Disposition::Terminated;
        }

        let next_hop = match self.routing.route_output(destination) {
            Ok(hop) => hop,
            Err(e) => {
                warn!(error = %e, "No route for entanglement request");
                return self.dropped(DropReason::NoRoute);
            }
        };

        let message = ControlMessage::epr_request(self.address, destination, flow_id);
        if !self.send(next_hop, &message) {
            return self.dropped(DropReason::SendFailed);
        }

        self.sessions
            .open(flow_id, self.address, destination, SessionRole::Originating);
        self.stats.originated += 1;
        info!(next_hop = %next_hop, "Sent entanglement request");
        Disposition::Forwarded { next_hop }
    }

    /// Decode and handle a datagram received from `sender`
    pub fn handle_inbound(&mut self, sender: NodeAddress, data: &[u8]) -> Disposition {
        match ControlMessage::decode(data) {
            Ok(message) => {
                trace!(node = %self.address, sender = %sender, %message, "Control message received");
                self.handle_message(message)
            }
            Err(e) => {
                warn!(node = %self.address, sender = %sender, error = %e, "Discarding malformed control message");
                self.dropped(DropReason::Truncated)
            }
        }
    }

    /// Handle a decoded control message
    pub fn handle_message(&mut self, message: ControlMessage) -> Disposition {
        let span = info_span!(
            spans::HANDLE_CONTROL_MESSAGE,
            node = %self.address,
            flow_id = message.flow_id(),
            op = %message.op()
        );
        let _entered = span.enter();

        match message.op().kind() {
            Some(OperationType::EprGenRequest) => self.handle_request(message),
            Some(OperationType::EprGenSuccess) => self.handle_reply(message, FlowOutcome::Succeeded),
            Some(OperationType::EprGenFailure) => self.handle_reply(message, FlowOutcome::Failed),
            Some(op) => {
                debug!(op = op.name(), "Operation not handled by the network layer");
                self.ignored()
            }
            None => {
                warn!(code = message.op().0, "Unknown operation code");
                self.ignored()
            }
        }
    }

    fn handle_request(&mut self, message: ControlMessage) -> Disposition {
        let flow_id = message.flow_id();

        if message.destination() == self.address {
            self.sessions
                .open(flow_id, message.source(), message.destination(), SessionRole::Terminating);
            self.stats.terminated += 1;
            info!(source = %message.source(), "Entanglement request reached destination");

            if self.config.reply_on_termination {
                self.reply(&message, OperationType::EprGenSuccess);
            }
            return Disposition::Terminated;
        }

        match self.routing.route_output(message.destination()) {
            Ok(next_hop) => {
                let disposition = self.relay(next_hop, &message);
                if disposition.is_forwarded() {
                    self.sessions
                        .open(flow_id, message.source(), message.destination(), SessionRole::Relaying);
                }
                disposition
            }
            // No neighbor failed here, so routing is not notified
            Err(e) => {
                warn!(dest = %message.destination(), error = %e, "No route to relay entanglement request");
                if self.config.notify_source_on_drop {
                    self.reply(&message, OperationType::EprGenFailure);
                }
                self.dropped(DropReason::NoRoute)
            }
        }
    }

    fn handle_reply(&mut self, message: ControlMessage, outcome: FlowOutcome) -> Disposition {
        if message.destination() == self.address {
            let known = self.sessions.record_outcome(message.flow_id(), outcome);
            self.stats.terminated += 1;
            if known {
                info!(responder = %message.source(), ?outcome, "Flow outcome received");
            } else {
                warn!(responder = %message.source(), ?outcome, "Outcome for unknown flow");
            }
            return Disposition::Terminated;
        }

        match self.routing.route_output(message.destination()) {
            Ok(next_hop) => self.relay(next_hop, &message),
            Err(e) => {
                warn!(dest = %message.destination(), error = %e, "No route to relay reply");
                self.dropped(DropReason::NoRoute)
            }
        }
    }

    /// Re-send `message` unchanged to `next_hop`
    fn relay(&mut self, next_hop: NodeAddress, message: &ControlMessage) -> Disposition {
        if !self.send(next_hop, message) {
            return self.dropped(DropReason::SendFailed);
        }
        self.stats.relayed += 1;
        debug!(next_hop = %next_hop, dest = %message.destination(), "Relayed control message");
        Disposition::Forwarded { next_hop }
    }

    /// Route a reply from this node back to the source of `message`
    fn reply(&mut self, message: &ControlMessage, op: OperationType) {
        let response = message.reply(self.address, op);
        if response.destination() == self.address {
            return;
        }

        match self.routing.route_output(response.destination()) {
            Ok(next_hop) => {
                if self.send(next_hop, &response) {
                    self.stats.replies_sent += 1;
                    debug!(next_hop = %next_hop, op = op.name(), "Sent reply toward originator");
                }
            }
            Err(e) => {
                warn!(dest = %response.destination(), error = %e, "No route for reply");
            }
        }
    }

    /// Hand one encoded message to the transport
    fn send(&mut self, next_hop: NodeAddress, message: &ControlMessage) -> bool {
        match self.transport.send(next_hop, message.encode()) {
            Ok(()) => true,
            Err(e) => {
                warn!(next_hop = %next_hop, error = %e, "Transport refused control message");
                self.report_failure(next_hop);
                false
            }
        }
    }

    fn report_failure(&self, neighbor: NodeAddress) {
        if self.config.report_failures_to_routing {
            self.routing.notify_link_failure(neighbor);
        }
    }

    fn dropped(&mut self, reason: DropReason) -> Disposition {
        self.stats.dropped += 1;
        Disposition::drop(reason)
    }

    fn ignored(&mut self) -> Disposition {
        self.stats.ignored += 1;
        Disposition::Ignored
    }
}
