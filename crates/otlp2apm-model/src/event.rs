// The APM event envelope and its inner records.
//
// Exactly one inner record (transaction, span, error, metricset) is
// populated per event, consistent with the processor tag; log events carry
// none. Timestamps are integer nanoseconds since the Unix epoch.

use serde::Serialize;

use crate::context::{
    Agent, Client, Cloud, Container, Destination, Host, Http, Kubernetes, Network, Service,
    Session, Source, UserAgent,
};
use crate::labels::{Labels, NumericLabels};
use crate::url::Url;

/// The universal envelope produced by the translation core.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct ApmEvent {
    /// Wall time of the source span or datapoint, adjusted for clock skew.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub processor: Option<ProcessorKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trace: Option<Trace>,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub parent_id: String,
    /// Log message; set on log events derived from span events.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub message: String,
    #[serde(skip_serializing_if = "Labels::is_empty")]
    pub labels: Labels,
    #[serde(skip_serializing_if = "NumericLabels::is_empty")]
    pub numeric_labels: NumericLabels,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event: Option<Event>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transaction: Option<Transaction>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub span: Option<Span>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<Error>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metricset: Option<Metricset>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub http: Option<Http>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<Url>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service: Option<Service>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub agent: Option<Agent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client: Option<Client>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<Source>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub destination: Option<Destination>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session: Option<Session>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub network: Option<Network>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<UserAgent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host: Option<Host>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cloud: Option<Cloud>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub container: Option<Container>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kubernetes: Option<Kubernetes>,
}

/// Discriminates which inner record an event carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ProcessorKind {
    Transaction,
    Span,
    Error,
    Log,
    Metricset,
}

impl ProcessorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProcessorKind::Transaction => "transaction",
            ProcessorKind::Span => "span",
            ProcessorKind::Error => "error",
            ProcessorKind::Log => "log",
            ProcessorKind::Metricset => "metricset",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct Event {
    /// Server wall time at admission, shared by all events of one call.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub received: Option<i64>,
    /// Span duration in nanoseconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outcome: Option<Outcome>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Success,
    Failure,
    Unknown,
}

impl Outcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Outcome::Success => "success",
            Outcome::Failure => "failure",
            Outcome::Unknown => "unknown",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct Trace {
    pub id: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct Transaction {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub id: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub name: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub r#type: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub result: String,
    pub sampled: bool,
    pub representative_count: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<Message>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct Span {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub id: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub name: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub r#type: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub subtype: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub action: String,
    pub representative_count: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub db: Option<Db>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<Message>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub destination_service: Option<DestinationService>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub links: Vec<SpanLink>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct SpanLink {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub trace_id: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub span_id: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct Db {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub instance: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub statement: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub r#type: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub user_name: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct Message {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub queue_name: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct DestinationService {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub r#type: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub name: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub resource: String,
}

impl DestinationService {
    pub fn is_empty(&self) -> bool {
        self == &DestinationService::default()
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct Error {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exception: Option<Exception>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log: Option<ErrorLog>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct Exception {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub message: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub r#type: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub stacktrace: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub handled: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct ErrorLog {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct Metricset {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub name: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub samples: Vec<MetricsetSample>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MetricType {
    #[default]
    Unspecified,
    Gauge,
    Counter,
    Histogram,
    Summary,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct MetricsetSample {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub name: String,
    pub r#type: MetricType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub histogram: Option<Histogram>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<SummaryMetric>,
}

/// A reshaped histogram: one representative value per non-empty bucket.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct Histogram {
    pub values: Vec<f64>,
    pub counts: Vec<i64>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct SummaryMetric {
    pub count: i64,
    pub sum: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_label_maps_are_omitted() {
        let event = ApmEvent {
            processor: Some(ProcessorKind::Log),
            message: "hello".to_owned(),
            ..Default::default()
        };
        let json = serde_json::to_value(&event).unwrap();
        assert!(json.get("labels").is_none());
        assert!(json.get("numeric_labels").is_none());
        assert_eq!(json["processor"], "log");
        assert_eq!(json["message"], "hello");
    }

    #[test]
    fn one_inner_record_per_processor() {
        let event = ApmEvent {
            processor: Some(ProcessorKind::Transaction),
            transaction: Some(Transaction {
                id: "0123456789abcdef".to_owned(),
                sampled: true,
                representative_count: 1.0,
                ..Default::default()
            }),
            ..Default::default()
        };
        let json = serde_json::to_value(&event).unwrap();
        assert!(json.get("transaction").is_some());
        assert!(json.get("span").is_none());
        assert!(json.get("error").is_none());
        assert!(json.get("metricset").is_none());
    }
}
