// The consumer: admission control and pipeline entry.
//
// One instance serves arbitrarily many concurrent ConsumeTraces /
// ConsumeMetrics calls; a shared weighted semaphore bounds how many are in
// flight, including their downstream process_batch awaits. The only other
// shared state is the dropped-metric counter.

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use tokio::sync::Semaphore;

use otlp2apm_model::Processor;

/// Configuration for a [`Consumer`], read-only after construction.
pub struct ConsumerConfig {
    /// The downstream consumer of translated batches.
    pub processor: Arc<dyn Processor>,
    /// Bounds concurrent consume calls; capacity is the caller's choice.
    pub semaphore: Arc<Semaphore>,
}

/// Translates OTLP telemetry into APM event batches and hands them to the
/// configured processor.
pub struct Consumer {
    pub(crate) processor: Arc<dyn Processor>,
    pub(crate) semaphore: Arc<Semaphore>,
    pub(crate) stats: ConsumerStats,
}

#[derive(Default)]
pub(crate) struct ConsumerStats {
    pub(crate) unsupported_metrics_dropped: AtomicI64,
}

/// A point-in-time snapshot of the consumer's counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Statistics {
    /// Number of datapoints dropped because their metric kind or value is
    /// unsupported. Monotonic over the consumer's lifetime.
    pub unsupported_metrics_dropped: i64,
}

impl Consumer {
    pub fn new(config: ConsumerConfig) -> Self {
        Consumer {
            processor: config.processor,
            semaphore: config.semaphore,
            stats: ConsumerStats::default(),
        }
    }

    pub fn stats(&self) -> Statistics {
        Statistics {
            unsupported_metrics_dropped: self
                .stats
                .unsupported_metrics_dropped
                .load(Ordering::Relaxed),
        }
    }
}

/// Server wall clock in nanoseconds since the Unix epoch, recorded once per
/// consume call as `event.received`.
pub(crate) fn now_nanos() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as i64)
        .unwrap_or_default()
}
