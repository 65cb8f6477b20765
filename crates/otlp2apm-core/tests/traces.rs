// Integration tests for the trace translator: primary event selection,
// classification, destination derivation, sampling, and span events.

mod support;

use std::sync::Arc;

use opentelemetry_proto::tonic::collector::trace::v1::ExportTraceServiceRequest;
use opentelemetry_proto::tonic::common::v1::KeyValue;
use opentelemetry_proto::tonic::resource::v1::Resource;
use opentelemetry_proto::tonic::trace::v1::{span, status, ResourceSpans, ScopeSpans, Span, Status};

use otlp2apm_model::{ApmEvent, Label, NumericLabel, Outcome, ProcessorKind};

use support::{
    bool_attr, double_attr, int_attr, new_consumer, now_nanos, str_attr, RecordingProcessor,
};

const TRACE_ID: [u8; 16] = [0x11; 16];
const SPAN_ID: [u8; 8] = [0x22; 8];
const PARENT_SPAN_ID: [u8; 8] = [0x33; 8];

fn span_with(kind: span::SpanKind, attributes: Vec<KeyValue>) -> Span {
    Span {
        trace_id: TRACE_ID.to_vec(),
        span_id: SPAN_ID.to_vec(),
        name: "operation".to_owned(),
        kind: kind as i32,
        start_time_unix_nano: 1_000_000_000,
        end_time_unix_nano: 2_500_000_000,
        attributes,
        ..Default::default()
    }
}

fn child_span_with(kind: span::SpanKind, attributes: Vec<KeyValue>) -> Span {
    Span {
        parent_span_id: PARENT_SPAN_ID.to_vec(),
        ..span_with(kind, attributes)
    }
}

fn request_of(resource: Option<Resource>, spans: Vec<Span>) -> ExportTraceServiceRequest {
    ExportTraceServiceRequest {
        resource_spans: vec![ResourceSpans {
            resource,
            scope_spans: vec![ScopeSpans {
                spans,
                ..Default::default()
            }],
            ..Default::default()
        }],
    }
}

async fn transform(request: ExportTraceServiceRequest) -> Vec<ApmEvent> {
    let processor = Arc::new(RecordingProcessor::default());
    let consumer = new_consumer(processor.clone(), 1);
    consumer.consume_traces(request).await.unwrap();
    assert_eq!(processor.batch_count(), 1);

    let before = now_nanos();
    let events = processor.events();
    for event in &events {
        let received = event
            .event
            .as_ref()
            .and_then(|e| e.received)
            .expect("every event carries event.received");
        assert!((before - received).abs() < 5_000_000_000);
    }
    events
}

#[tokio::test]
async fn root_span_becomes_transaction() {
    let mut otel_span = span_with(span::SpanKind::Internal, vec![]);
    otel_span.status = Some(Status {
        code: status::StatusCode::Ok as i32,
        ..Default::default()
    });

    let events = transform(request_of(None, vec![otel_span])).await;
    assert_eq!(events.len(), 1);
    let event = &events[0];

    assert_eq!(event.processor, Some(ProcessorKind::Transaction));
    assert_eq!(event.trace.as_ref().unwrap().id, "11".repeat(16));
    assert_eq!(event.parent_id, "");
    assert_eq!(event.timestamp, Some(1_000_000_000));

    let transaction = event.transaction.as_ref().unwrap();
    assert_eq!(transaction.id, "22".repeat(8));
    assert_eq!(transaction.name, "operation");
    assert_eq!(transaction.r#type, "unknown");
    assert_eq!(transaction.result, "Success");
    assert!(transaction.sampled);
    assert_eq!(transaction.representative_count, 1.0);

    let ev = event.event.as_ref().unwrap();
    assert_eq!(ev.duration, Some(1_500_000_000));
    assert_eq!(ev.outcome, Some(Outcome::Success));
}

#[tokio::test]
async fn server_span_http_attributes() {
    let events = transform(request_of(
        None,
        vec![span_with(
            span::SpanKind::Server,
            vec![
                str_attr("http.method", "POST"),
                int_attr("http.status_code", 500),
                str_attr("http.target", "/search?q=1"),
                str_attr("http.scheme", "http"),
                str_attr("http.flavor", "1.1"),
                str_attr("net.host.name", "testing.invalid"),
                int_attr("net.host.port", 8080),
                str_attr("http.user_agent", "curl/8.0"),
            ],
        )],
    ))
    .await;
    let event = &events[0];

    let transaction = event.transaction.as_ref().unwrap();
    assert_eq!(transaction.r#type, "request");
    assert_eq!(transaction.result, "HTTP 5xx");
    assert_eq!(event.event.as_ref().unwrap().outcome, Some(Outcome::Failure));

    let http = event.http.as_ref().unwrap();
    assert_eq!(http.version, "1.1");
    assert_eq!(http.request.as_ref().unwrap().method, "POST");
    assert_eq!(http.response.as_ref().unwrap().status_code, Some(500));

    let url = event.url.as_ref().unwrap();
    assert_eq!(url.original, "/search?q=1");
    assert_eq!(url.full, "http://testing.invalid:8080/search?q=1");
    assert_eq!(url.domain, "testing.invalid");
    assert_eq!(url.port, Some(8080));
    assert_eq!(url.path, "/search");
    assert_eq!(url.query, "q=1");

    assert_eq!(event.user_agent.as_ref().unwrap().original, "curl/8.0");
}

#[tokio::test]
async fn client_http_span_destination() {
    let events = transform(request_of(
        None,
        vec![child_span_with(
            span::SpanKind::Client,
            vec![
                str_attr("http.url", "https://testing.invalid:443/foo?bar"),
                int_attr("http.status_code", 404),
            ],
        )],
    ))
    .await;
    let event = &events[0];

    assert_eq!(event.processor, Some(ProcessorKind::Span));
    assert_eq!(event.parent_id, "33".repeat(8));
    assert_eq!(event.event.as_ref().unwrap().outcome, Some(Outcome::Failure));

    let span_record = event.span.as_ref().unwrap();
    assert_eq!(span_record.r#type, "external");
    assert_eq!(span_record.subtype, "http");

    // The default port is stripped from the service name but kept in the
    // resource.
    let destination_service = span_record.destination_service.as_ref().unwrap();
    assert_eq!(destination_service.r#type, "external");
    assert_eq!(destination_service.name, "https://testing.invalid");
    assert_eq!(destination_service.resource, "testing.invalid:443");

    let destination = event.destination.as_ref().unwrap();
    assert_eq!(destination.address, "testing.invalid");
    assert_eq!(destination.port, Some(443));

    let target = event
        .service
        .as_ref()
        .unwrap()
        .target
        .as_ref()
        .unwrap();
    assert_eq!(target.r#type, "http");
    assert_eq!(target.name, "testing.invalid:443");

    assert_eq!(
        event.url.as_ref().unwrap().original,
        "https://testing.invalid:443/foo?bar"
    );
}

#[tokio::test]
async fn ipv6_http_span_destination() {
    let events = transform(request_of(
        None,
        vec![child_span_with(
            span::SpanKind::Client,
            vec![str_attr("http.url", "http://[::1]:8080/path")],
        )],
    ))
    .await;
    let event = &events[0];

    // destination.address holds the bare address; the service name and
    // resource keep the bracketed URL form.
    let destination = event.destination.as_ref().unwrap();
    assert_eq!(destination.address, "::1");
    assert_eq!(destination.port, Some(8080));

    let destination_service = event
        .span
        .as_ref()
        .unwrap()
        .destination_service
        .as_ref()
        .unwrap();
    assert_eq!(destination_service.name, "http://[::1]:8080");
    assert_eq!(destination_service.resource, "[::1]:8080");

    let target = event.service.as_ref().unwrap().target.as_ref().unwrap();
    assert_eq!(target.name, "[::1]:8080");
}

#[tokio::test]
async fn db_span_classification() {
    let events = transform(request_of(
        None,
        vec![child_span_with(
            span::SpanKind::Client,
            vec![
                str_attr("db.system", "mysql"),
                str_attr("db.name", "customers"),
                str_attr("db.statement", "SELECT * FROM orders"),
                str_attr("db.user", "readonly"),
                str_attr("net.peer.name", "db.testing.invalid"),
                int_attr("net.peer.port", 3306),
            ],
        )],
    ))
    .await;
    let event = &events[0];

    let span_record = event.span.as_ref().unwrap();
    assert_eq!(span_record.r#type, "db");
    assert_eq!(span_record.subtype, "mysql");

    let db = span_record.db.as_ref().unwrap();
    assert_eq!(db.r#type, "mysql");
    assert_eq!(db.instance, "customers");
    assert_eq!(db.statement, "SELECT * FROM orders");
    assert_eq!(db.user_name, "readonly");

    let destination_service = span_record.destination_service.as_ref().unwrap();
    assert_eq!(destination_service.name, "mysql");
    assert_eq!(destination_service.resource, "mysql");

    let destination = event.destination.as_ref().unwrap();
    assert_eq!(destination.address, "db.testing.invalid");
    assert_eq!(destination.port, Some(3306));

    let target = event.service.as_ref().unwrap().target.as_ref().unwrap();
    assert_eq!(target.r#type, "mysql");
    assert_eq!(target.name, "customers");
}

#[tokio::test]
async fn sql_query_defaults_db_type() {
    let events = transform(request_of(
        None,
        vec![child_span_with(
            span::SpanKind::Client,
            vec![str_attr("sql.query", "SELECT 1")],
        )],
    ))
    .await;
    let db = events[0].span.as_ref().unwrap().db.as_ref().unwrap();
    assert_eq!(db.r#type, "sql");
    assert_eq!(db.statement, "SELECT 1");
}

#[tokio::test]
async fn messaging_producer_span() {
    let events = transform(request_of(
        None,
        vec![child_span_with(
            span::SpanKind::Producer,
            vec![
                str_attr("messaging.system", "kafka"),
                str_attr("messaging.destination", "orders"),
            ],
        )],
    ))
    .await;
    let span_record = events[0].span.as_ref().unwrap();

    assert_eq!(span_record.r#type, "messaging");
    assert_eq!(span_record.subtype, "kafka");
    assert_eq!(span_record.action, "send");
    assert_eq!(span_record.message.as_ref().unwrap().queue_name, "orders");

    let destination_service = span_record.destination_service.as_ref().unwrap();
    assert_eq!(destination_service.name, "kafka");
    assert_eq!(destination_service.resource, "kafka/orders");

    let target = events[0]
        .service
        .as_ref()
        .unwrap()
        .target
        .as_ref()
        .unwrap();
    assert_eq!(target.r#type, "kafka");
    assert_eq!(target.name, "orders");
}

#[tokio::test]
async fn temporary_queue_is_not_a_service_target() {
    let events = transform(request_of(
        None,
        vec![child_span_with(
            span::SpanKind::Producer,
            vec![
                str_attr("messaging.system", "rabbitmq"),
                str_attr("messaging.destination", "reply-3fd1"),
                bool_attr("messaging.temp_destination", true),
            ],
        )],
    ))
    .await;
    let target = events[0].service.as_ref().unwrap().target.as_ref().unwrap();
    assert_eq!(target.r#type, "rabbitmq");
    assert_eq!(target.name, "");
}

#[tokio::test]
async fn rpc_span_destination() {
    let events = transform(request_of(
        None,
        vec![child_span_with(
            span::SpanKind::Client,
            vec![
                str_attr("rpc.system", "grpc"),
                str_attr("rpc.service", "inventory.Items"),
                str_attr("net.peer.name", "rpc.testing.invalid"),
                int_attr("net.peer.port", 50051),
            ],
        )],
    ))
    .await;
    let span_record = events[0].span.as_ref().unwrap();

    assert_eq!(span_record.r#type, "external");
    assert_eq!(span_record.subtype, "grpc");

    let destination_service = span_record.destination_service.as_ref().unwrap();
    assert_eq!(destination_service.name, "rpc.testing.invalid:50051");
    assert_eq!(destination_service.resource, "rpc.testing.invalid:50051");

    let target = events[0].service.as_ref().unwrap().target.as_ref().unwrap();
    assert_eq!(target.r#type, "grpc");
    assert_eq!(target.name, "inventory.Items");
}

#[tokio::test]
async fn grpc_transaction_result() {
    let events = transform(request_of(
        None,
        vec![span_with(
            span::SpanKind::Server,
            vec![int_attr("rpc.grpc.status_code", 5)],
        )],
    ))
    .await;
    let transaction = events[0].transaction.as_ref().unwrap();
    assert_eq!(transaction.r#type, "request");
    assert_eq!(transaction.result, "NotFound");
}

#[tokio::test]
async fn peer_service_overrides_destination_service() {
    let events = transform(request_of(
        None,
        vec![child_span_with(
            span::SpanKind::Client,
            vec![
                str_attr("peer.service", "billing"),
                str_attr("db.system", "postgresql"),
            ],
        )],
    ))
    .await;
    let span_record = events[0].span.as_ref().unwrap();
    let destination_service = span_record.destination_service.as_ref().unwrap();
    assert_eq!(destination_service.name, "billing");
    assert_eq!(destination_service.resource, "billing");
}

#[tokio::test]
async fn peer_address_with_port_is_not_a_hostname() {
    let events = transform(request_of(
        None,
        vec![child_span_with(
            span::SpanKind::Client,
            vec![str_attr("peer.address", "jdbc:mysql://10.0.0.1:3306")],
        )],
    ))
    .await;
    let event = &events[0];

    // The address never becomes destination.address, but it survives as the
    // destination service resource.
    assert!(event.destination.is_none());
    let destination_service = event
        .span
        .as_ref()
        .unwrap()
        .destination_service
        .as_ref()
        .unwrap();
    assert_eq!(destination_service.resource, "jdbc:mysql://10.0.0.1:3306");
}

#[tokio::test]
async fn plain_peer_address_is_destination() {
    let events = transform(request_of(
        None,
        vec![child_span_with(
            span::SpanKind::Client,
            vec![str_attr("peer.address", "10.0.0.1")],
        )],
    ))
    .await;
    assert_eq!(
        events[0].destination.as_ref().unwrap().address,
        "10.0.0.1"
    );
}

#[tokio::test]
async fn internal_span_defaults_to_app() {
    let events = transform(request_of(
        None,
        vec![child_span_with(span::SpanKind::Internal, vec![])],
    ))
    .await;
    let span_record = events[0].span.as_ref().unwrap();
    assert_eq!(span_record.r#type, "app");
    assert_eq!(span_record.subtype, "internal");
}

#[tokio::test]
async fn tracestate_p_value_sets_representative_count() {
    let mut with_p3 = child_span_with(span::SpanKind::Client, vec![]);
    with_p3.trace_state = "ot=p:3;other:x".to_owned();
    let mut with_p63 = child_span_with(span::SpanKind::Client, vec![]);
    with_p63.trace_state = "ot=p:63".to_owned();
    let without = child_span_with(span::SpanKind::Client, vec![]);

    let events = transform(request_of(None, vec![with_p3, with_p63, without])).await;
    let counts: Vec<f64> = events
        .iter()
        .map(|e| e.span.as_ref().unwrap().representative_count)
        .collect();
    assert_eq!(counts, vec![8.0, 0.0, 1.0]);
}

fn jaeger_resource() -> Resource {
    Resource {
        attributes: vec![
            str_attr("telemetry.sdk.name", "Jaeger"),
            str_attr("telemetry.sdk.language", "Go"),
        ],
        ..Default::default()
    }
}

#[tokio::test]
async fn jaeger_probabilistic_sampler_extrapolates() {
    let events = transform(request_of(
        Some(jaeger_resource()),
        vec![child_span_with(
            span::SpanKind::Client,
            vec![
                str_attr("sampler.type", "probabilistic"),
                double_attr("sampler.param", 0.25),
            ],
        )],
    ))
    .await;
    let event = &events[0];
    assert_eq!(event.agent.as_ref().unwrap().name, "Jaeger/Go");
    assert_eq!(event.span.as_ref().unwrap().representative_count, 4.0);
    assert!(event.labels.is_empty());
    assert!(event.numeric_labels.is_empty());
}

#[tokio::test]
async fn jaeger_other_sampler_keeps_attributes_as_labels() {
    let events = transform(request_of(
        Some(jaeger_resource()),
        vec![child_span_with(
            span::SpanKind::Client,
            vec![
                str_attr("sampler.type", "const"),
                double_attr("sampler.param", 1.0),
            ],
        )],
    ))
    .await;
    let event = &events[0];
    assert_eq!(event.span.as_ref().unwrap().representative_count, 0.0);
    assert_eq!(
        event.labels.get("sampler_type"),
        Some(&Label::value("const"))
    );
    assert_eq!(
        event.numeric_labels.get("sampler_param"),
        Some(&NumericLabel::value(1.0))
    );
}

#[tokio::test]
async fn exception_span_event_becomes_error() {
    let mut otel_span = span_with(span::SpanKind::Server, vec![]);
    otel_span.events = vec![span::Event {
        time_unix_nano: 1_200_000_000,
        name: "exception".to_owned(),
        attributes: vec![
            str_attr("exception.type", "E"),
            str_attr("exception.message", "m"),
            str_attr("exception.stacktrace", "at main"),
        ],
        ..Default::default()
    }];

    let events = transform(request_of(None, vec![otel_span])).await;
    assert_eq!(events.len(), 2);

    let primary = &events[0];
    let error_event = &events[1];
    assert_eq!(error_event.processor, Some(ProcessorKind::Error));
    assert_eq!(error_event.timestamp, Some(1_200_000_000));
    assert_eq!(
        error_event.trace.as_ref().unwrap().id,
        primary.trace.as_ref().unwrap().id
    );
    assert_eq!(
        error_event.parent_id,
        primary.transaction.as_ref().unwrap().id
    );
    assert!(error_event.transaction.is_none());
    assert!(error_event.span.is_none());

    let exception = error_event
        .error
        .as_ref()
        .unwrap()
        .exception
        .as_ref()
        .unwrap();
    assert_eq!(exception.r#type, "E");
    assert_eq!(exception.message, "m");
    assert_eq!(exception.stacktrace, "at main");
    assert_eq!(exception.handled, Some(true));

    // Secondary events carry only the receive timestamp of the parent's
    // event context.
    let ev = error_event.event.as_ref().unwrap();
    assert!(ev.duration.is_none());
    assert!(ev.outcome.is_none());
    assert_eq!(ev.received, primary.event.as_ref().unwrap().received);
}

#[tokio::test]
async fn escaped_exception_is_unhandled() {
    let mut otel_span = span_with(span::SpanKind::Server, vec![]);
    otel_span.events = vec![span::Event {
        name: "exception".to_owned(),
        attributes: vec![
            str_attr("exception.type", "E"),
            bool_attr("exception.escaped", true),
        ],
        ..Default::default()
    }];

    let events = transform(request_of(None, vec![otel_span])).await;
    let exception = events[1].error.as_ref().unwrap().exception.as_ref().unwrap();
    assert_eq!(exception.handled, Some(false));
}

#[tokio::test]
async fn exception_event_without_type_or_message_is_dropped() {
    let mut otel_span = span_with(span::SpanKind::Server, vec![]);
    otel_span.events = vec![span::Event {
        name: "exception".to_owned(),
        attributes: vec![str_attr("exception.stacktrace", "at main")],
        ..Default::default()
    }];

    let events = transform(request_of(None, vec![otel_span])).await;
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].processor, Some(ProcessorKind::Transaction));
}

#[tokio::test]
async fn span_event_becomes_log() {
    let resource = Resource {
        attributes: vec![str_attr("custom.team", "checkout")],
        ..Default::default()
    };
    let mut otel_span = child_span_with(
        span::SpanKind::Client,
        vec![str_attr("span.attr", "only-on-primary")],
    );
    otel_span.events = vec![span::Event {
        time_unix_nano: 1_300_000_000,
        name: "retrying request".to_owned(),
        attributes: vec![str_attr("attempt.outcome", "timeout")],
        ..Default::default()
    }];

    let events = transform(request_of(Some(resource), vec![otel_span])).await;
    assert_eq!(events.len(), 2);

    let primary = &events[0];
    assert_eq!(
        primary.labels.get("span_attr"),
        Some(&Label::value("only-on-primary"))
    );

    let log_event = &events[1];
    assert_eq!(log_event.processor, Some(ProcessorKind::Log));
    assert_eq!(log_event.message, "retrying request");
    assert_eq!(log_event.timestamp, Some(1_300_000_000));
    assert_eq!(log_event.parent_id, primary.span.as_ref().unwrap().id);
    assert!(log_event.error.is_none());
    assert!(log_event.span.is_none());
    assert!(log_event.transaction.is_none());

    // Resource labels and the event's own attributes survive; per-span
    // labels do not.
    assert_eq!(
        log_event.labels.get("custom_team"),
        Some(&Label::value("checkout"))
    );
    assert_eq!(
        log_event.labels.get("attempt_outcome"),
        Some(&Label::value("timeout"))
    );
    assert!(log_event.labels.get("span_attr").is_none());
}

#[tokio::test]
async fn jaeger_error_span_event() {
    let mut otel_span = span_with(span::SpanKind::Server, vec![]);
    otel_span.events = vec![span::Event {
        name: "error".to_owned(),
        attributes: vec![
            str_attr("error.object", "boom"),
            str_attr("error.kind", "ValueError"),
        ],
        ..Default::default()
    }];

    let events = transform(request_of(Some(jaeger_resource()), vec![otel_span])).await;
    assert_eq!(events.len(), 2);
    let error = events[1].error.as_ref().unwrap();
    let exception = error.exception.as_ref().unwrap();
    assert_eq!(exception.message, "boom");
    assert_eq!(exception.r#type, "ValueError");
}

#[tokio::test]
async fn span_links_survive_on_spans_only() {
    let link = span::Link {
        trace_id: vec![0x44; 16],
        span_id: vec![0x55; 8],
        ..Default::default()
    };
    let mut linked_span = child_span_with(span::SpanKind::Client, vec![]);
    linked_span.links = vec![link.clone()];
    let mut linked_transaction = span_with(span::SpanKind::Server, vec![]);
    linked_transaction.links = vec![link];

    let events = transform(request_of(None, vec![linked_span, linked_transaction])).await;

    let span_record = events[0].span.as_ref().unwrap();
    assert_eq!(span_record.links.len(), 1);
    assert_eq!(span_record.links[0].trace_id, "44".repeat(16));
    assert_eq!(span_record.links[0].span_id, "55".repeat(8));

    assert_eq!(events[1].processor, Some(ProcessorKind::Transaction));
    assert!(events[1].span.is_none());
}

#[tokio::test]
async fn string_attributes_and_names_are_truncated() {
    let long: String = "x".repeat(1025);
    let mut otel_span = child_span_with(
        span::SpanKind::Client,
        vec![str_attr("custom", &long)],
    );
    otel_span.name = long.clone();

    let events = transform(request_of(None, vec![otel_span])).await;
    let event = &events[0];
    assert_eq!(event.span.as_ref().unwrap().name.chars().count(), 1024);
    let label = event.labels.get("custom").unwrap();
    assert_eq!(label.value.as_ref().unwrap().chars().count(), 1024);
}

#[tokio::test]
async fn clock_skew_shifts_span_and_event_timestamps() {
    let export_timestamp = now_nanos() - 3_600_000_000_000;
    let resource = Resource {
        attributes: vec![int_attr(
            "telemetry.sdk.elastic_export_timestamp",
            export_timestamp,
        )],
        ..Default::default()
    };
    let mut otel_span = span_with(span::SpanKind::Server, vec![]);
    otel_span.start_time_unix_nano = (export_timestamp - 1_000_000_000) as u64;
    otel_span.end_time_unix_nano = export_timestamp as u64;

    let events = transform(request_of(Some(resource), vec![otel_span])).await;
    let event = &events[0];

    let received = event.event.as_ref().unwrap().received.unwrap();
    let adjusted = event.timestamp.unwrap();
    let drift = (received - 1_000_000_000 - adjusted).abs();
    assert!(drift < 1_000_000_000, "drift of {drift}ns");
    assert!(event.labels.is_empty());
    assert!(event.numeric_labels.is_empty());
}

#[tokio::test]
async fn event_total_matches_spans_plus_span_events() {
    let mut with_events = span_with(span::SpanKind::Server, vec![]);
    with_events.events = vec![
        span::Event {
            name: "exception".to_owned(),
            attributes: vec![str_attr("exception.message", "m")],
            ..Default::default()
        },
        span::Event {
            name: "note".to_owned(),
            ..Default::default()
        },
    ];
    let plain = child_span_with(span::SpanKind::Client, vec![]);

    let events = transform(request_of(None, vec![with_events, plain])).await;
    assert_eq!(events.len(), 2 + 2);
}

#[tokio::test]
async fn translation_is_idempotent() {
    let request = || {
        request_of(
            None,
            vec![
                span_with(
                    span::SpanKind::Server,
                    vec![str_attr("http.method", "GET"), int_attr("http.status_code", 200)],
                ),
                child_span_with(span::SpanKind::Client, vec![str_attr("db.system", "redis")]),
            ],
        )
    };

    let mut first = transform(request()).await;
    let mut second = transform(request()).await;
    for event in first.iter_mut().chain(second.iter_mut()) {
        if let Some(ev) = event.event.as_mut() {
            ev.received = None;
        }
    }
    assert_eq!(first, second);
}

#[tokio::test]
async fn parallel_calls_emit_the_same_events_as_sequential() {
    let server_request =
        || request_of(None, vec![span_with(span::SpanKind::Server, vec![])]);
    let client_request =
        || request_of(None, vec![child_span_with(span::SpanKind::Client, vec![])]);

    let sequential = Arc::new(RecordingProcessor::default());
    let consumer = new_consumer(sequential.clone(), 2);
    consumer.consume_traces(server_request()).await.unwrap();
    consumer.consume_traces(client_request()).await.unwrap();

    let parallel = Arc::new(RecordingProcessor::default());
    let consumer = Arc::new(new_consumer(parallel.clone(), 2));
    let a = {
        let consumer = consumer.clone();
        tokio::spawn(async move { consumer.consume_traces(server_request()).await })
    };
    let b = {
        let consumer = consumer.clone();
        tokio::spawn(async move { consumer.consume_traces(client_request()).await })
    };
    a.await.unwrap().unwrap();
    b.await.unwrap().unwrap();

    let normalize = |mut events: Vec<ApmEvent>| {
        for event in &mut events {
            if let Some(ev) = event.event.as_mut() {
                ev.received = None;
            }
        }
        events.sort_by_key(|e| serde_json::to_string(e).unwrap());
        events
    };
    assert_eq!(normalize(sequential.events()), normalize(parallel.events()));
}
