// otlp2apm-model - Canonical APM event model
//
// This crate contains the pure output data model for the translation core:
// the APM event envelope, its context structs, and the downstream batch
// processor contract. No I/O, no async runtime dependencies beyond the
// processor trait itself.

use anyhow::Result;
use async_trait::async_trait;

pub mod context;
pub mod event;
pub mod labels;
pub mod url;

pub use context::{
    Agent, Client, Cloud, Container, Destination, Framework, Host, Http, HttpRequest,
    HttpResponse, Kubernetes, Language, Network, NetworkCarrier, NetworkConnection, Service,
    ServiceTarget, Session, Source, UserAgent,
};
pub use event::{
    ApmEvent, Db, DestinationService, Error, ErrorLog, Event, Exception, Histogram, Message,
    MetricType, Metricset, MetricsetSample, Outcome, ProcessorKind, Span, SpanLink,
    SummaryMetric, Trace, Transaction,
};
pub use labels::{Label, Labels, NumericLabel, NumericLabels};
pub use url::Url;

/// An ordered sequence of APM events, the unit handed to the downstream
/// processor. Ordering within a batch carries no meaning for consumers.
pub type Batch = Vec<ApmEvent>;

/// The downstream consumer of translated batches.
///
/// The translation core calls `process_batch` exactly once per consume call,
/// with a possibly empty batch. Ownership of the events transfers with the
/// call; errors are propagated verbatim to the upstream caller.
#[async_trait]
pub trait Processor: Send + Sync {
    async fn process_batch(&self, batch: Batch) -> Result<()>;
}
