// otlp2apm-core - OTLP to Elastic APM translation core
//
// A stateless, concurrency-bounded conversion engine: OTLP trace and metric
// export requests in, batches of canonical APM events out. The wire receiver
// in front and the batch processor behind are external collaborators; this
// crate owns only the translation between them.

pub mod consumer;
pub mod metrics;
pub mod traces;

mod common;
mod resource;
mod semconv;

pub use consumer::{Consumer, ConsumerConfig, Statistics};
