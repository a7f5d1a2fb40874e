//! Configuration for the network layer

use serde::{Deserialize, Serialize};

/// Configuration for a [`NetworkLayer`](crate::NetworkLayer)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayerConfig {
    /// Send `EPR_GEN_SUCCESS` back to the originator when a request terminates here
    pub reply_on_termination: bool,
    /// Send `EPR_GEN_FAILURE` back to the originator when a relay has no route
    pub notify_source_on_drop: bool,
    /// Report neighbors the transport could not reach to the routing component
    pub report_failures_to_routing: bool,
}

impl Default for LayerConfig {
    fn default() -> Self {
        Self {
            reply_on_termination: false,
            notify_source_on_drop: false,
            report_failures_to_routing: true,
        }
    }
}

impl LayerConfig {
    /// Enable or disable success replies from the destination
    pub fn with_reply_on_termination(mut self, enabled: bool) -> Self {
        self.reply_on_termination = enabled;
        self
    }

    /// Enable or disable failure replies from relays
    pub fn with_notify_source_on_drop(mut self, enabled: bool) -> Self {
        self.notify_source_on_drop = enabled;
        self
    }

    /// Enable or disable failure reports to routing
    pub fn with_report_failures_to_routing(mut self, enabled: bool) -> Self {
        self.report_failures_to_routing = enabled;
        self
    }

    /// Enable both reply paths
    pub fn with_replies(self) -> Self {
        self.with_reply_on_termination(true)
            .with_notify_source_on_drop(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = LayerConfig::default();
        assert!(!config.reply_on_termination);
        assert!(!config.notify_source_on_drop);
        assert!(config.report_failures_to_routing);
    }

    #[test]
    fn test_builder() {
        let config = LayerConfig::default()
            .with_replies()
            .with_report_failures_to_routing(false);
        assert!(config.reply_on_termination);
        assert!(config.notify_source_on_drop);
        assert!(!config.report_failures_to_routing);
    }
}
