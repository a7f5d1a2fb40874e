//! Async driver for one node
//!
//! A [`NodeRunner`] owns a [`NetworkLayer`] and feeds it inbound datagrams
//! strictly in arrival order. Local entanglement requests reach it through
//! a [`NodeHandle`]. The runner stops when the shutdown signal flips to
//! `true`, when every handle is gone and the transport closes, or when the
//! transport reports its channel closed.

use qnet_core::{FlowId, NodeAddress, RoutingProtocol, Transport, TransportError};
use qnet_logging::{NodeContextGuard, spans};
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{Instrument, debug, info, info_span, warn};

use crate::error::{NetworkError, NetworkResult};
use crate::layer::{Disposition, LayerStats, NetworkLayer};

/// Command sent from a [`NodeHandle`] to its runner
#[derive(Debug)]
enum NodeCommand {
    RequestEntanglement {
        destination: NodeAddress,
        flow_id: FlowId,
        reply: oneshot::Sender<Disposition>,
    },
}

/// Handle for issuing requests to a running node
#[derive(Debug, Clone)]
pub struct NodeHandle {
    address: NodeAddress,
    commands: mpsc::UnboundedSender<NodeCommand>,
    stats: watch::Receiver<LayerStats>,
}

impl NodeHandle {
    /// Address of the node
    pub fn address(&self) -> NodeAddress {
        self.address
    }

    /// Start an entanglement request at the node
    pub async fn request_entanglement(
        &self,
        destination: NodeAddress,
        flow_id: FlowId,
    ) -> NetworkResult<Disposition> {
        let (reply, response) = oneshot::channel();
        self.commands
            .send(NodeCommand::RequestEntanglement {
                destination,
                flow_id,
                reply,
            })
            .map_err(|_| NetworkError::RunnerStopped)?;
        response.await.map_err(|_| NetworkError::RunnerStopped)
    }

    /// Latest counters published by the runner
    pub fn stats(&self) -> LayerStats {
        *self.stats.borrow()
    }

    /// Wait until the counters satisfy `predicate`
    pub async fn wait_for_stats(
        &self,
        predicate: impl FnMut(&LayerStats) -> bool,
    ) -> NetworkResult<LayerStats> {
        let mut stats = self.stats.clone();
        let current = stats
            .wait_for(predicate)
            .await
            .map_err(|_| NetworkError::RunnerStopped)?;
        Ok(*current)
    }
}

/// Event loop driving one [`NetworkLayer`]
pub struct NodeRunner<R, T> {
    layer: NetworkLayer<R, T>,
    commands: mpsc::UnboundedReceiver<NodeCommand>,
    stats: watch::Sender<LayerStats>,
    shutdown: watch::Receiver<bool>,
}

impl<R, T> NodeRunner<R, T>
where
    R: RoutingProtocol + 'static,
    T: Transport + 'static,
{
    /// Create a runner and the handle that talks to it
    pub fn new(layer: NetworkLayer<R, T>, shutdown: watch::Receiver<bool>) -> (Self, NodeHandle) {
        let (commands_tx, commands_rx) = mpsc::unbounded_channel();
        let (stats_tx, stats_rx) = watch::channel(layer.stats());
        let handle = NodeHandle {
            address: layer.address(),
            commands: commands_tx,
            stats: stats_rx,
        };
        let runner = Self {
            layer,
            commands: commands_rx,
            stats: stats_tx,
            shutdown,
        };
        (runner, handle)
    }

    /// Spawn the runner as a background task
    ///
    /// The task resolves to the layer so callers can inspect its sessions
    /// and counters after shutdown.
    pub fn spawn(
        layer: NetworkLayer<R, T>,
        shutdown: watch::Receiver<bool>,
    ) -> (JoinHandle<NetworkResult<NetworkLayer<R, T>>>, NodeHandle) {
        let (runner, handle) = Self::new(layer, shutdown);
        (tokio::spawn(runner.run()), handle)
    }

    /// Run until shutdown
    pub async fn run(self) -> NetworkResult<NetworkLayer<R, T>> {
        let span = info_span!(spans::NODE_RUNNER, node = %self.layer.address());
        self.run_loop().instrument(span).await
    }

    async fn run_loop(mut self) -> NetworkResult<NetworkLayer<R, T>> {
        let address = self.layer.address();
        info!("Node runner started");

        loop {
            if *self.shutdown.borrow() {
                break;
            }

            tokio::select! {
                biased;

                changed = self.shutdown.changed() => {
                    if changed.is_err() || *self.shutdown.borrow() {
                        break;
                    }
                }

                Some(command) = self.commands.recv() => {
                    let _ctx = NodeContextGuard::new(address);
                    self.handle_command(command);
                }

                received = self.layer.transport().recv() => {
                    match received {
                        Ok((sender, data)) => {
                            let _ctx = NodeContextGuard::new(address);
                            let disposition = self.layer.handle_inbound(sender, &data);
                            debug!(sender = %sender, %disposition, "Inbound control message handled");
                        }
                        Err(TransportError::ChannelClosed) => {
                            warn!("Control channel closed");
                            break;
                        }
                        Err(e) => {
                            warn!(error = %e, "Failed to receive control message");
                            continue;
                        }
                    }
                }
            }

            self.stats.send_replace(self.layer.stats());
        }

        info!(stats = ?self.layer.stats(), "Node runner stopped");
        Ok(self.layer)
    }

    fn handle_command(&mut self, command: NodeCommand) {
        match command {
            NodeCommand::RequestEntanglement {
                destination,
                flow_id,
                reply,
            } => {
                let disposition = self.layer.request_entanglement(destination, flow_id);
                // The requester may have stopped waiting
                let _ = reply.send(disposition);
            }
        }
    }
}
