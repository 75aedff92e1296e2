//! Captures `courier.*` spans so tests can assert on which runs happened.

use std::sync::{Arc, Mutex, PoisonError};

use tracing::Dispatch;
use tracing::span::{Attributes, Id};
use tracing::Subscriber;
use tracing_subscriber::Layer;
use tracing_subscriber::Registry;
use tracing_subscriber::layer::{Context, SubscriberExt};
use tracing_subscriber::registry::LookupSpan;

const PREFIX: &str = "courier.";

/// A captured span.
#[derive(Debug, Clone)]
pub struct CapturedSpan {
    /// The span name, e.g. `courier.fetch`.
    pub name: String,
    /// Field values rendered as strings.
    pub fields: Vec<(String, String)>,
}

impl CapturedSpan {
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(field, _)| field == name)
            .map(|(_, value)| value.as_str())
    }
}

struct FieldVisitor(Vec<(String, String)>);

impl tracing::field::Visit for FieldVisitor {
    fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
        self.0.push((field.name().to_string(), format!("{value:?}")));
    }

    fn record_str(&mut self, field: &tracing::field::Field, value: &str) {
        self.0.push((field.name().to_string(), value.to_string()));
    }

    fn record_u64(&mut self, field: &tracing::field::Field, value: u64) {
        self.0.push((field.name().to_string(), value.to_string()));
    }
}

struct SpanCaptureLayer {
    spans: Arc<Mutex<Vec<CapturedSpan>>>,
}

impl<S> Layer<S> for SpanCaptureLayer
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    fn on_new_span(&self, attrs: &Attributes<'_>, _id: &Id, _ctx: Context<'_, S>) {
        let name = attrs.metadata().name();
        if !name.starts_with(PREFIX) {
            return;
        }

        let mut visitor = FieldVisitor(Vec::new());
        attrs.record(&mut visitor);
        self.spans
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(CapturedSpan {
                name: name.to_string(),
                fields: visitor.0,
            });
    }
}

/// Collector for captured spans.
///
/// Spans are only captured when created while [`dispatch`](Self::dispatch)
/// is the default subscriber. `EndpointCoordinator::run` creates the
/// `courier.fetch` span before spawning, so wrapping that call is enough.
#[derive(Clone)]
pub struct SpanCollector {
    spans: Arc<Mutex<Vec<CapturedSpan>>>,
    dispatch: Dispatch,
}

pub fn create_span_collector() -> SpanCollector {
    let spans = Arc::new(Mutex::new(Vec::new()));
    let layer = SpanCaptureLayer {
        spans: spans.clone(),
    };
    SpanCollector {
        spans,
        dispatch: Dispatch::new(Registry::default().with(layer)),
    }
}

impl SpanCollector {
    pub fn dispatch(&self) -> &Dispatch {
        &self.dispatch
    }

    pub fn spans(&self) -> Vec<CapturedSpan> {
        self.spans
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Captured spans named `name`, in creation order.
    pub fn named(&self, name: &str) -> Vec<CapturedSpan> {
        self.spans()
            .into_iter()
            .filter(|span| span.name == name)
            .collect()
    }
}
