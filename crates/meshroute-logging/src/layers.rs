//! Custom tracing layers

use tracing::{Subscriber, span};
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::fmt::format::{Format, Json, JsonFields};
use tracing_subscriber::layer::{Context, Layer};
use tracing_subscriber::registry::LookupSpan;

use crate::config::JsonlConfig;
use crate::context::{NodeContextData, NodeContextGuard};

/// Layer that attaches the active node context to new spans
///
/// Spans opened while a [`NodeContextGuard`] is alive carry a
/// [`NodeContextExtension`], so later layers can tell which node they
/// belong to even when the span is entered from another thread.
#[derive(Debug, Default)]
pub struct NodeContextLayer;

impl NodeContextLayer {
    pub fn new() -> Self {
        Self
    }
}

/// Extension data stored on spans
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
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
        let mut inherited = None;
        if let Some(parent) = span.parent() {
            inherited = parent.extensions().get::<NodeContextExtension>().copied();
        }
        if let Some(ext) = NodeContextGuard::current()
            .map(|data| NodeContextExtension { data })
            .or(inherited)
        {
            span.extensions_mut().insert(ext);
        }
    }
}

/// JSONL formatting layer over any writer
pub fn jsonl_layer<S, W>(
    config: &JsonlConfig,
    writer: W,
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
