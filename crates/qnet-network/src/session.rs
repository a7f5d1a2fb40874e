//! Per-flow session bookkeeping
//!
//! A node keeps one [`FlowSession`] for every flow it has originated,
//! relayed, or terminated. Opening a session for a known flow overwrites
//! the old entry (last write wins).
//!
//! Sessions are never closed or expired. A long-running node therefore
//! grows its registry by one entry per distinct flow identifier it sees.

use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::fmt;

use chrono::{DateTime, Utc};
use qnet_core::{FlowId, NodeAddress};
use serde::{Deserialize, Serialize};

/// What this node did for a flow
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionRole {
    /// The request started here
    Originating,
    /// The request passed through here
    Relaying,
    /// The request ended here
    Terminating,
}

impl fmt::Display for SessionRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionRole::Originating => write!(f, "originating"),
            SessionRole::Relaying => write!(f, "relaying"),
            SessionRole::Terminating => write!(f, "terminating"),
        }
    }
}

/// Result reported back to the originator of a flow
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlowOutcome {
    /// The destination confirmed the request
    Succeeded,
    /// A relay reported that the request could not be forwarded
    Failed,
}

/// Record of one flow at this node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlowSession {
    pub flow_id: FlowId,
    /// Node that originated the request
    pub source: NodeAddress,
    /// Final destination of the request
    pub destination: NodeAddress,
    pub role: SessionRole,
    pub opened_at: DateTime<Utc>,
    /// Set when a success or failure reply for the flow arrives here
    pub outcome: Option<FlowOutcome>,
}

/// Flow sessions keyed by flow identifier
#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: HashMap<FlowId, FlowSession>,
}

impl SessionRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Open (or overwrite) the session for `flow_id`
    pub fn open(
        &mut self,
        flow_id: FlowId,
        source: NodeAddress,
        destination: NodeAddress,
        role: SessionRole,
    ) -> &FlowSession {
        let session = FlowSession {
            flow_id,
            source,
            destination,
            role,
            opened_at: Utc::now(),
            outcome: None,
        };
        match self.sessions.entry(flow_id) {
            Entry::Occupied(mut entry) => {
                entry.insert(session);
                entry.into_mut()
            }
            Entry::Vacant(entry) => entry.insert(session),
        }
    }

    /// Session for `flow_id`, if one was opened
    pub fn lookup(&self, flow_id: FlowId) -> Option<&FlowSession> {
        self.sessions.get(&flow_id)
    }

    /// Record the outcome of a known flow
    ///
    /// Returns `false` when no session exists for `flow_id`.
    pub fn record_outcome(&mut self, flow_id: FlowId, outcome: FlowOutcome) -> bool {
        match self.sessions.get_mut(&flow_id) {
            Some(session) => {
                session.outcome = Some(outcome);
                true
            }
            None => false,
        }
    }

    /// Number of sessions
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    /// Check if no session was opened
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// All sessions, in no particular order
    pub fn iter(&self) -> impl Iterator<Item = &FlowSession> {
        self.sessions.values()
    }

    /// Known flow identifiers, ascending
    pub fn flow_ids(&self) -> Vec<FlowId> {
        let mut ids: Vec<_> = self.sessions.keys().copied().collect();
        ids.sort_unstable();
        ids
    }
}
