// Shared fixtures for the translator integration tests. Each suite uses a
// different subset of these helpers.
#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use anyhow::Result;
use async_trait::async_trait;
use tokio::sync::Semaphore;

use opentelemetry_proto::tonic::common::v1::{any_value, AnyValue, KeyValue};
use otlp2apm_core::{Consumer, ConsumerConfig};
use otlp2apm_model::{ApmEvent, Batch, Processor};

/// Captures every batch handed to it.
#[derive(Default)]
pub struct RecordingProcessor {
    batches: Mutex<Vec<Batch>>,
}

impl RecordingProcessor {
    pub fn events(&self) -> Vec<ApmEvent> {
        self.batches
            .lock()
            .unwrap()
            .iter()
            .flatten()
            .cloned()
            .collect()
    }

    pub fn batch_count(&self) -> usize {
        self.batches.lock().unwrap().len()
    }
}

#[async_trait]
impl Processor for RecordingProcessor {
    async fn process_batch(&self, batch: Batch) -> Result<()> {
        self.batches.lock().unwrap().push(batch);
        Ok(())
    }
}

/// Blocks inside process_batch until the gate receives a permit, signalling
/// entry through the `entered` semaphore. Used to hold the consumer's
/// admission permit open.
pub struct GatedProcessor {
    pub entered: Arc<Semaphore>,
    pub gate: Arc<Semaphore>,
}

#[async_trait]
impl Processor for GatedProcessor {
    async fn process_batch(&self, _batch: Batch) -> Result<()> {
        self.entered.add_permits(1);
        self.gate.acquire().await?.forget();
        Ok(())
    }
}

pub fn new_consumer(processor: Arc<dyn Processor>, capacity: usize) -> Consumer {
    Consumer::new(ConsumerConfig {
        processor,
        semaphore: Arc::new(Semaphore::new(capacity)),
    })
}

pub fn str_attr(key: &str, value: &str) -> KeyValue {
    KeyValue {
        key: key.to_owned(),
        value: Some(AnyValue {
            value: Some(any_value::Value::StringValue(value.to_owned())),
        }),
    }
}

pub fn int_attr(key: &str, value: i64) -> KeyValue {
    KeyValue {
        key: key.to_owned(),
        value: Some(AnyValue {
            value: Some(any_value::Value::IntValue(value)),
        }),
    }
}

pub fn double_attr(key: &str, value: f64) -> KeyValue {
    KeyValue {
        key: key.to_owned(),
        value: Some(AnyValue {
            value: Some(any_value::Value::DoubleValue(value)),
        }),
    }
}

pub fn bool_attr(key: &str, value: bool) -> KeyValue {
    KeyValue {
        key: key.to_owned(),
        value: Some(AnyValue {
            value: Some(any_value::Value::BoolValue(value)),
        }),
    }
}

/// Wall clock in nanoseconds, for receive-timestamp assertions.
pub fn now_nanos() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .as_nanos() as i64
}
