//! qnet simulation
//!
//! Runs entanglement requests over built-in or file-based topologies and
//! reports how each node handled the flow.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand};
use qnet_core::{FlowId, NodeAddress};
use qnet_logging::{FileConfig, LogConfig, QnetSubscriberBuilder};
use qnet_network::LayerConfig;
use qnet_routing::TopologySpec;
use qnet_simulation::{Scenario, topologies};

#[derive(Parser)]
#[command(
    name = "qnet-sim",
    about = "Entanglement routing over an in-memory control channel",
    version
)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Print the report as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Send success replies back to the originator, and failure replies
    /// when a relay has no route
    #[arg(long, global = true)]
    replies: bool,

    /// Seconds to wait for a flow to settle
    #[arg(long, global = true, default_value = "5")]
    timeout: u64,

    /// Write JSONL logs to this directory
    #[arg(long, global = true)]
    log_dir: Option<PathBuf>,

    /// Load the logging configuration from a JSON file
    #[arg(long, global = true, conflicts_with = "log_dir")]
    log_config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Route across the four-node diamond (10.1.1.1 to 10.1.1.4)
    Diamond {
        #[arg(long, default_value = "101")]
        flow: FlowId,
    },

    /// Route from one end of a line of nodes to the other
    Chain {
        /// Number of nodes, starting at 10.0.0.1
        #[arg(short, long, default_value = "5")]
        nodes: u32,

        #[arg(long, default_value = "1")]
        flow: FlowId,
    },

    /// Route across a topology loaded from a JSON file
    Run {
        /// File of the form {"links": [{"a": "...", "b": "...", "cost": 1.0}]}
        #[arg(short, long)]
        topology: PathBuf,

        #[arg(long)]
        from: NodeAddress,

        #[arg(long)]
        to: NodeAddress,

        #[arg(long, default_value = "1")]
        flow: FlowId,
    },
}

impl Cli {
    fn log_config(&self) -> anyhow::Result<LogConfig> {
        if let Some(path) = &self.log_config {
            let json = std::fs::read_to_string(path)
                .with_context(|| format!("reading {}", path.display()))?;
            return LogConfig::from_json(&json).context("parsing log config");
        }

        let mut config = if self.verbose {
            LogConfig::development()
        } else {
            LogConfig::default()
        };
        // Keep stdout clean for the report
        if self.json && !self.verbose {
            config.console.enabled = false;
        }
        if let Some(directory) = &self.log_dir {
            config.file = Some(FileConfig {
                directory: directory.clone(),
                ..FileConfig::default()
            });
        }
        Ok(config)
    }

    fn scenario(&self) -> anyhow::Result<Scenario> {
        let scenario = match &self.command {
            Commands::Diamond { flow } => {
                let [source, .., destination] = topologies::DIAMOND_NODES;
                Scenario::new(topologies::diamond(), source, destination, *flow)
            }
            Commands::Chain { nodes, flow } => {
                anyhow::ensure!(*nodes >= 2, "a chain needs at least two nodes");
                Scenario::new(
                    topologies::chain(*nodes),
                    topologies::chain_node(0),
                    topologies::chain_node(nodes - 1),
                    *flow,
                )
            }
            Commands::Run {
                topology,
                from,
                to,
                flow,
            } => {
                let spec = TopologySpec::load(topology)
                    .with_context(|| format!("loading topology {}", topology.display()))?;
                Scenario::new(spec, *from, *to, *flow)
            }
        };

        let layer_config = if self.replies {
            LayerConfig::default().with_replies()
        } else {
            LayerConfig::default()
        };
        Ok(scenario
            .with_layer_config(layer_config)
            .with_settle_timeout(Duration::from_secs(self.timeout)))
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let _log_guard = QnetSubscriberBuilder::new()
        .with_config(cli.log_config()?)
        .init()?;

    let report = cli.scenario()?.run().await?;

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print!("{}", report);
    }

    Ok(())
}
