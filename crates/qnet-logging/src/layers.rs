//! Custom tracing layers for qnet
//!
//! This module provides the layer that attaches node context to spans and
//! the JSONL formatter used for file output.

use tracing::{Subscriber, span};
use tracing_subscriber::{
    fmt::{
        MakeWriter,
        format::{Format, Json, JsonFields},
    },
    layer::{Context, Layer},
    registry::LookupSpan,
};

use crate::config::JsonlConfig;
use crate::context::{NodeContextData, NodeContextGuard};

/// Layer that attaches the active node context to new spans
///
/// When a [`NodeContextGuard`] is active, every span created in its scope
/// gets a [`NodeContextExtension`]; child spans inherit their parent's.
///
/// The fmt and JSONL output layers do not read span extensions. Console and
/// file lines carry the node through the `node` field that the runner and
/// layer spans record. The extension is for layers that look spans up by id,
/// such as the attribution checks in this crate's tests.
#[derive(Debug, Clone, Copy, Default)]
pub struct NodeContextLayer;

impl NodeContextLayer {
    /// Create a new node context layer
    pub fn new() -> Self {
        Self
    }
}

/// Extension data stored on spans
#[derive(Debug, Clone)]
pub struct NodeContextExtension {
    pub data: NodeContextData,
}

impl<S> Layer<S> for NodeContextLayer
where
    S: Subscriber + for<'lookup> LookupSpan<'lookup>,
{
    fn on_new_span(&self, _attrs: &span::Attributes<'_>, id: &span::Id, ctx: Context<'_, S>) {
        let Some(span) = ctx.span(id) else {
            return;
        };

        // Explicit context wins; otherwise inherit from the parent span
        let data = NodeContextGuard::current().or_else(|| {
            let parent = span.parent()?;
            let extensions = parent.extensions();
            let inherited = extensions
                .get::<NodeContextExtension>()
                .map(|ext| ext.data.clone());
            inherited
        });

        if let Some(data) = data {
            span.extensions_mut().insert(NodeContextExtension { data });
        }
    }
}

/// Create a JSONL formatting layer for file output
pub fn jsonl_file_layer<S, W>(
    writer: W,
    config: &JsonlConfig,
) -> tracing_subscriber::fmt::Layer<S, JsonFields, Format<Json>, W>
where
    S: Subscriber + for<'lookup> LookupSpan<'lookup>,
    W: for<'writer> MakeWriter<'writer> + 'static,
{
    tracing_subscriber::fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(config.include_spans)
        .flatten_event(config.flatten_events)
        .with_file(config.include_location)
        .with_line_number(config.include_location)
        .with_thread_ids(config.include_thread_info)
        .with_thread_names(config.include_thread_info)
        .with_writer(writer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use qnet_core::NodeAddress;

    #[test]
    fn test_node_context_extension() {
        let node = NodeAddress::new(10, 0, 0, 1);
        let _guard = NodeContextGuard::new(node);

        let ctx = NodeContextGuard::current().unwrap();
        let ext = NodeContextExtension { data: ctx };
        assert_eq!(ext.data.address, node);
    }
}
