//! # qnet Simulation
//!
//! Runs entanglement requests across a whole topology in one process.
//!
//! Every node gets its own [`qnet_network::NodeRunner`] over an in-memory
//! control channel ([`qnet_core::MockNetwork`]) and a Dijkstra router that
//! shares one topology oracle with every other node. A scenario issues a
//! single request at the source, waits until the flow settles, stops every
//! runner and reports what each node did.
//!
//! ## Example
//!
//! ```rust,ignore
//! use qnet_simulation::{Scenario, topologies};
//!
//! let scenario = Scenario::new(topologies::diamond(), source, destination, 101);
//! let report = scenario.run().await?;
//! assert!(report.completed);
//! ```

pub mod scenarios;
pub mod topologies;

pub use scenarios::{NodeReport, Scenario, ScenarioReport};
