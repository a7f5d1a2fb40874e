//! Standard field and span names
//!
//! Shared across crates so log queries can rely on one spelling.

/// Standard field names for structured logging
pub mod fields {
    pub const NODE: &str = "node";
    pub const INSTANCE_ID: &str = "instance_id";
    pub const FLOW_ID: &str = "flow_id";
    pub const SOURCE: &str = "source";
    pub const DESTINATION: &str = "dest";
    pub const NEXT_HOP: &str = "next_hop";
    pub const SENDER: &str = "sender";
    pub const OP: &str = "op";
    pub const COST: &str = "cost";
    pub const DISPOSITION: &str = "disposition";
    pub const REASON: &str = "reason";
}

/// Standard span names for consistency across crates
pub mod spans {
    // Network layer spans
    pub const NODE_RUNNER: &str = "node_runner";
    pub const REQUEST_ENTANGLEMENT: &str = "request_entanglement";
    pub const HANDLE_CONTROL_MESSAGE: &str = "handle_control_message";

    // Simulation spans
    pub const SCENARIO: &str = "scenario";
}
