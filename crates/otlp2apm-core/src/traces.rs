// OTLP span translation.
//
// Every span becomes one primary event: a transaction when it is a root,
// SERVER, or CONSUMER span, otherwise a span. Span events become secondary
// error or log events pointing at the primary through parent_id. Attribute
// interpretation follows OpenTelemetry semantic conventions v1.5, with the
// OpenTracing/Jaeger spellings still honored.

use std::net::IpAddr;

use anyhow::Result;
use opentelemetry_proto::tonic::collector::trace::v1::ExportTraceServiceRequest;
use opentelemetry_proto::tonic::common::v1::{any_value, InstrumentationScope, KeyValue};
use opentelemetry_proto::tonic::trace::v1::{span, status, ResourceSpans, Span, Status};
use tracing::debug;

use otlp2apm_model::{
    ApmEvent, Batch, Client, Db, Destination, DestinationService, Error, ErrorLog, Event,
    Exception, Framework, Http, Label, Message, NetworkCarrier, NetworkConnection, Outcome,
    ProcessorKind, ServiceTarget, Session, SpanLink, Trace, Transaction, Url, UserAgent,
};

use crate::common::{
    export_timestamp, grpc_status_text, hex_id, join_host_port, replace_dots,
    representative_count_from_tracestate, set_label, truncate,
};
use crate::consumer::{now_nanos, Consumer};
use crate::resource::translate_resource_metadata;
use crate::semconv;

impl Consumer {
    /// Consume an OTLP trace export request, converting into APM events and
    /// handing the batch to the configured processor.
    pub async fn consume_traces(&self, traces: ExportTraceServiceRequest) -> Result<()> {
        let _permit = self.semaphore.acquire().await?;

        let receive_timestamp = now_nanos();
        let span_count: usize = traces
            .resource_spans
            .iter()
            .map(|rs| {
                rs.scope_spans
                    .iter()
                    .map(|ss| ss.spans.len())
                    .sum::<usize>()
            })
            .sum();
        debug!(
            resource_spans = traces.resource_spans.len(),
            spans = span_count,
            "consuming traces"
        );

        let mut batch = Batch::with_capacity(span_count);
        for resource_spans in &traces.resource_spans {
            self.convert_resource_spans(resource_spans, receive_timestamp, &mut batch);
        }
        self.processor.process_batch(batch).await
    }

    fn convert_resource_spans(
        &self,
        resource_spans: &ResourceSpans,
        receive_timestamp: i64,
        out: &mut Batch,
    ) {
        let mut base_event = ApmEvent {
            event: Some(Event {
                received: Some(receive_timestamp),
                ..Default::default()
            }),
            ..Default::default()
        };
        let resource = resource_spans.resource.as_ref();
        translate_resource_metadata(resource, &mut base_event);

        let time_delta = resource
            .and_then(|r| export_timestamp(&r.attributes))
            .map(|export_timestamp| receive_timestamp - export_timestamp)
            .unwrap_or(0);

        for scope_spans in &resource_spans.scope_spans {
            for otel_span in &scope_spans.spans {
                self.convert_span(
                    otel_span,
                    scope_spans.scope.as_ref(),
                    &base_event,
                    time_delta,
                    out,
                );
            }
        }
    }

    fn convert_span(
        &self,
        otel_span: &Span,
        scope: Option<&InstrumentationScope>,
        base_event: &ApmEvent,
        time_delta: i64,
        out: &mut Batch,
    ) {
        let parent_id = hex_id(&otel_span.parent_span_id);
        let root = parent_id.is_empty();

        let start_time = otel_span.start_time_unix_nano;
        let duration = otel_span.end_time_unix_nano.saturating_sub(start_time);

        let name = truncate(&otel_span.name).to_owned();
        let span_id = hex_id(&otel_span.span_id);
        let representative_count = representative_count_from_tracestate(&otel_span.trace_state);

        let mut event = base_event.clone();
        event.timestamp = Some(start_time as i64 + time_delta);
        let trace_id = hex_id(&otel_span.trace_id);
        if !trace_id.is_empty() {
            event.trace = Some(Trace { id: trace_id });
        }
        {
            let ev = event.event.get_or_insert_with(Event::default);
            ev.duration = Some(duration);
            ev.outcome = Some(span_status_outcome(otel_span.status.as_ref()));
        }
        event.parent_id = parent_id;

        let kind = span::SpanKind::try_from(otel_span.kind).unwrap_or(span::SpanKind::Unspecified);

        // Message consumption results in either a transaction or a span
        // based on whether the consumption is active or passive. OTLP spans
        // do not carry that distinction, so consumer spans are assumed
        // passive and start a transaction.
        if root || kind == span::SpanKind::Server || kind == span::SpanKind::Consumer {
            event.processor = Some(ProcessorKind::Transaction);
            event.transaction = Some(Transaction {
                id: span_id,
                name,
                sampled: true,
                representative_count,
                ..Default::default()
            });
            translate_transaction(&otel_span.attributes, otel_span.status.as_ref(), scope, &mut event);
        } else {
            event.processor = Some(ProcessorKind::Span);
            event.span = Some(otlp2apm_model::Span {
                id: span_id,
                name,
                representative_count,
                ..Default::default()
            });
            translate_span(kind, &otel_span.attributes, &mut event);
        }

        if !otel_span.links.is_empty() {
            if let Some(span_record) = event.span.as_mut() {
                span_record.links = otel_span
                    .links
                    .iter()
                    .map(|link| SpanLink {
                        trace_id: hex_id(&link.trace_id),
                        span_id: hex_id(&link.span_id),
                    })
                    .collect();
            }
        }

        if otel_span.events.is_empty() {
            out.push(event);
            return;
        }

        // Span events copy the resource-level labels only, and of the event
        // context only the receive timestamp.
        let mut parent = event.clone();
        out.push(event);
        parent.labels = base_event.labels.clone();
        parent.numeric_labels = base_event.numeric_labels.clone();
        parent.event = Some(Event {
            received: base_event.event.as_ref().and_then(|e| e.received),
            ..Default::default()
        });
        parent.destination = None;
        for span_event in &otel_span.events {
            if let Some(converted) = self.convert_span_event(span_event, &parent, time_delta) {
                out.push(converted);
            }
        }
    }

    fn convert_span_event(
        &self,
        span_event: &span::Event,
        parent: &ApmEvent, // the primary transaction or span event
        time_delta: i64,
    ) -> Option<ApmEvent> {
        let mut event = parent.clone();
        event.transaction = None;
        event.span = None;
        event.timestamp = Some(span_event.time_unix_nano as i64 + time_delta);

        let is_jaeger = parent
            .agent
            .as_ref()
            .is_some_and(|agent| agent.name.starts_with("Jaeger"));

        let mut error = None;
        if is_jaeger {
            error = self.convert_jaeger_error_span_event(span_event, &mut event);
        } else if span_event.name == "exception" {
            // Per OpenTelemetry semantic conventions the event name MUST be
            // "exception", and at least one of exception.type and
            // exception.message must be set; events with neither are dropped.
            let mut exception_escaped = false;
            let mut exception_message = String::new();
            let mut exception_stacktrace = String::new();
            let mut exception_type = String::new();
            for kv in &span_event.attributes {
                let Some(value) = kv.value.as_ref().and_then(|v| v.value.as_ref()) else {
                    continue;
                };
                match kv.key.as_str() {
                    semconv::EXCEPTION_MESSAGE => {
                        exception_message =
                            string_value_of(value).unwrap_or_default().to_owned();
                    }
                    semconv::EXCEPTION_STACKTRACE => {
                        exception_stacktrace =
                            string_value_of(value).unwrap_or_default().to_owned();
                    }
                    semconv::EXCEPTION_TYPE => {
                        exception_type = string_value_of(value).unwrap_or_default().to_owned();
                    }
                    semconv::EXCEPTION_ESCAPED => {
                        if let any_value::Value::BoolValue(escaped) = value {
                            exception_escaped = *escaped;
                        }
                    }
                    _ => set_label(replace_dots(&kv.key), &mut event, value),
                }
            }
            if exception_message.is_empty() && exception_type.is_empty() {
                debug!(
                    name = span_event.name.as_str(),
                    "dropping exception span event without type or message"
                );
                return None;
            }
            error = Some(Error {
                exception: Some(Exception {
                    message: exception_message,
                    r#type: exception_type,
                    stacktrace: exception_stacktrace,
                    handled: Some(!exception_escaped),
                }),
                log: None,
            });
        }

        match error {
            Some(error) => {
                event.processor = Some(ProcessorKind::Error);
                event.error = Some(error);
            }
            None => {
                event.processor = Some(ProcessorKind::Log);
                event.message = span_event.name.clone();
                for kv in &span_event.attributes {
                    let Some(value) = kv.value.as_ref().and_then(|v| v.value.as_ref()) else {
                        continue;
                    };
                    let key = replace_dots(&kv.key);
                    if is_jaeger && key == "message" {
                        event.message =
                            truncate(string_value_of(value).unwrap_or_default()).to_owned();
                        continue;
                    }
                    set_label(key, &mut event, value);
                }
            }
        }

        // Secondary events point up at the primary.
        if let Some(transaction) = parent.transaction.as_ref() {
            event.parent_id = transaction.id.clone();
        }
        if let Some(span_record) = parent.span.as_ref() {
            event.parent_id = span_record.id.clone();
        }
        Some(event)
    }

    fn convert_jaeger_error_span_event(
        &self,
        span_event: &span::Event,
        event: &mut ApmEvent,
    ) -> Option<Error> {
        let mut is_error = false;
        let mut exception_message = String::new();
        let mut exception_type = String::new();
        let mut log_message = String::new();

        let name = truncate(&span_event.name);
        if name == "error" {
            is_error = true; // according to the opentracing spec
        } else {
            // Jaeger seems to send the message in the 'event' field; a
            // 'message' attribute takes precedence when present.
            log_message = name.to_owned();
        }

        for kv in &span_event.attributes {
            let Some(value) = kv.value.as_ref().and_then(|v| v.value.as_ref()) else {
                continue;
            };
            let any_value::Value::StringValue(raw) = value else {
                continue;
            };
            let stringval = truncate(raw);
            match kv.key.as_str() {
                "error" | "error.object" => {
                    exception_message = stringval.to_owned();
                    is_error = true;
                }
                "error.kind" => {
                    exception_type = stringval.to_owned();
                    is_error = true;
                }
                "level" => is_error = stringval == "error",
                "message" => log_message = stringval.to_owned(),
                _ => set_label(replace_dots(&kv.key), event, value),
            }
        }
        if !is_error {
            return None;
        }
        if log_message.is_empty() && exception_message.is_empty() && exception_type.is_empty() {
            debug!(
                name = span_event.name.as_str(),
                "cannot convert span event into error"
            );
            return None;
        }
        let mut error = Error::default();
        if !log_message.is_empty() {
            error.log = Some(ErrorLog {
                message: log_message,
            });
        }
        if !exception_message.is_empty() || !exception_type.is_empty() {
            error.exception = Some(Exception {
                message: exception_message,
                r#type: exception_type,
                ..Default::default()
            });
        }
        Some(error)
    }
}

/// Interpret a server-side span's attributes onto its transaction event.
pub fn translate_transaction(
    attributes: &[KeyValue],
    span_status: Option<&Status>,
    scope: Option<&InstrumentationScope>,
    event: &mut ApmEvent,
) {
    let is_jaeger = event
        .agent
        .as_ref()
        .is_some_and(|agent| agent.name.starts_with("Jaeger"));

    let mut net_host_name = String::new();
    let mut net_host_port: i64 = 0;

    let mut http_scheme = String::new();
    let mut http_url = String::new();
    let mut http_server_name = String::new();
    let mut http_host = String::new();
    let mut http = Http::default();

    let mut is_http = false;
    let mut is_rpc = false;
    let mut is_messaging = false;
    let mut message = Message::default();

    let mut sampler_type: Option<&any_value::Value> = None;
    let mut sampler_param: Option<&any_value::Value> = None;

    for kv in attributes {
        let Some(value) = kv.value.as_ref().and_then(|v| v.value.as_ref()) else {
            continue;
        };
        if is_jaeger {
            match kv.key.as_str() {
                semconv::SAMPLER_TYPE => {
                    sampler_type = Some(value);
                    continue;
                }
                semconv::SAMPLER_PARAM => {
                    sampler_param = Some(value);
                    continue;
                }
                _ => {}
            }
        }

        let k = replace_dots(&kv.key);
        match value {
            any_value::Value::ArrayValue(_)
            | any_value::Value::BoolValue(_)
            | any_value::Value::DoubleValue(_) => set_label(k, event, value),
            any_value::Value::IntValue(intval) => match kv.key.as_str() {
                semconv::HTTP_STATUS_CODE => {
                    is_http = true;
                    http.response.get_or_insert_with(Default::default).status_code =
                        Some(*intval as i32);
                }
                semconv::NET_PEER_PORT => {
                    event.source.get_or_insert_with(Default::default).port =
                        Some(*intval as u32);
                }
                semconv::NET_HOST_PORT => net_host_port = *intval,
                semconv::RPC_GRPC_STATUS_CODE => {
                    is_rpc = true;
                    if let Some(transaction) = event.transaction.as_mut() {
                        transaction.result = grpc_status_text(*intval);
                    }
                }
                _ => set_label(k, event, value),
            },
            any_value::Value::StringValue(raw) => {
                let stringval = truncate(raw);
                match kv.key.as_str() {
                    // http.*
                    semconv::HTTP_METHOD => {
                        is_http = true;
                        http.request.get_or_insert_with(Default::default).method =
                            stringval.to_owned();
                    }
                    semconv::HTTP_URL | semconv::HTTP_TARGET | semconv::HTTP_PATH => {
                        is_http = true;
                        http_url = stringval.to_owned();
                    }
                    semconv::HTTP_HOST => {
                        is_http = true;
                        http_host = stringval.to_owned();
                    }
                    semconv::HTTP_SCHEME => {
                        is_http = true;
                        http_scheme = stringval.to_owned();
                    }
                    semconv::HTTP_STATUS_CODE => {
                        if let Ok(code) = stringval.parse::<i32>() {
                            is_http = true;
                            http.response.get_or_insert_with(Default::default).status_code =
                                Some(code);
                        }
                    }
                    semconv::HTTP_PROTOCOL => match stringval.strip_prefix("HTTP/") {
                        Some(version) => {
                            is_http = true;
                            http.version = version.to_owned();
                        }
                        // Unexpected, store in labels for debugging.
                        None => {
                            event.labels.insert(k, Label::value(stringval));
                        }
                    },
                    semconv::HTTP_FLAVOR => {
                        is_http = true;
                        http.version = stringval.to_owned();
                    }
                    semconv::HTTP_SERVER_NAME => {
                        is_http = true;
                        http_server_name = stringval.to_owned();
                    }
                    semconv::HTTP_CLIENT_IP => {
                        if let Ok(ip) = stringval.parse::<IpAddr>() {
                            event.client.get_or_insert_with(Default::default).ip =
                                ip.to_string();
                        }
                    }
                    semconv::HTTP_USER_AGENT => {
                        event.user_agent = Some(UserAgent {
                            original: stringval.to_owned(),
                        });
                    }

                    // net.*
                    semconv::NET_PEER_IP => {
                        let source = event.source.get_or_insert_with(Default::default);
                        if let Ok(ip) = stringval.parse::<IpAddr>() {
                            source.ip = ip.to_string();
                        }
                    }
                    semconv::NET_PEER_NAME => {
                        event.source.get_or_insert_with(Default::default).domain =
                            stringval.to_owned();
                    }
                    semconv::NET_HOST_NAME => net_host_name = stringval.to_owned(),
                    semconv::NET_HOST_CONNECTION_TYPE => {
                        network_connection(event).r#type = stringval.to_owned();
                    }
                    semconv::NET_HOST_CONNECTION_SUBTYPE => {
                        network_connection(event).subtype = stringval.to_owned();
                    }
                    semconv::NET_HOST_CARRIER_MCC => {
                        network_carrier(event).mcc = stringval.to_owned();
                    }
                    semconv::NET_HOST_CARRIER_MNC => {
                        network_carrier(event).mnc = stringval.to_owned();
                    }
                    semconv::NET_HOST_CARRIER_NAME => {
                        network_carrier(event).name = stringval.to_owned();
                    }
                    semconv::NET_HOST_CARRIER_ICC => {
                        network_carrier(event).icc = stringval.to_owned();
                    }

                    // messaging.*
                    semconv::MESSAGE_BUS_DESTINATION_LEGACY | semconv::MESSAGING_DESTINATION => {
                        is_messaging = true;
                        message.queue_name = stringval.to_owned();
                    }

                    // rpc.*
                    //
                    // The rpc fieldset has no counterpart downstream; the
                    // operation name carries the information instead.
                    semconv::RPC_SYSTEM => is_rpc = true,
                    semconv::RPC_GRPC_STATUS_CODE => is_rpc = true,
                    semconv::RPC_SERVICE => {}
                    semconv::RPC_METHOD => {}

                    // miscellaneous
                    semconv::TRANSACTION_TYPE_TAG => {
                        if let Some(transaction) = event.transaction.as_mut() {
                            transaction.r#type = stringval.to_owned();
                        }
                    }
                    semconv::SESSION_ID => {
                        event.session = Some(Session {
                            id: stringval.to_owned(),
                        });
                    }
                    // Sending service.version as a span tag is a deprecated
                    // agent behavior, still mapped for compatibility.
                    semconv::SERVICE_VERSION => {
                        event.service.get_or_insert_with(Default::default).version =
                            stringval.to_owned();
                    }
                    _ => {
                        event.labels.insert(k, Label::value(stringval));
                    }
                }
            }
            any_value::Value::KvlistValue(_) | any_value::Value::BytesValue(_) => {}
        }
    }

    if let Some(transaction) = event.transaction.as_mut() {
        if transaction.r#type.is_empty() {
            transaction.r#type = if is_messaging {
                "messaging".to_owned()
            } else if is_http || is_rpc {
                "request".to_owned()
            } else {
                "unknown".to_owned()
            };
        }
    }

    if is_http {
        let status_code = http
            .response
            .as_ref()
            .and_then(|response| response.status_code)
            .unwrap_or(0);
        if !http.is_empty() {
            event.http = Some(http);
        }

        // Outcome and result fall back to the HTTP status code.
        if status_code > 0 {
            if let Some(ev) = event.event.as_mut() {
                if ev.outcome == Some(Outcome::Unknown) {
                    ev.outcome = Some(server_http_status_outcome(status_code));
                }
            }
            if let Some(transaction) = event.transaction.as_mut() {
                if transaction.result.is_empty() {
                    transaction.result = http_status_code_result(status_code);
                }
            }
        }

        // Build the URL from http.{url,host,scheme}, with server-side host
        // fallbacks.
        let mut host = http_host;
        if host.is_empty() {
            host = http_server_name;
            if host.is_empty() {
                host = net_host_name;
                if host.is_empty() {
                    host = event
                        .host
                        .as_ref()
                        .map(|h| h.hostname.clone())
                        .unwrap_or_default();
                }
            }
            if !host.is_empty() && net_host_port > 0 {
                host = join_host_port(&host, net_host_port as u32);
            }
        }
        event.url = Some(Url::parse_from_parts(&http_url, &host, &http_scheme));
    }
    if is_messaging {
        if let Some(transaction) = event.transaction.as_mut() {
            transaction.message = Some(message);
        }
    }

    if let Some(source) = event.source.as_ref() {
        let client_ip_valid = event
            .client
            .as_ref()
            .is_some_and(|client| client.ip.parse::<IpAddr>().is_ok());
        if !client_ip_valid {
            event.client = Some(Client {
                ip: source.ip.clone(),
                port: source.port,
                domain: source.domain.clone(),
            });
        }
    }

    if let Some(sampler_type) = sampler_type {
        // The client reported its sampling rate; use it to extrapolate
        // transaction metrics.
        parse_sampler_attributes(sampler_type, sampler_param, event);
    }

    if let Some(transaction) = event.transaction.as_mut() {
        if transaction.result.is_empty() {
            transaction.result = span_status_result(span_status);
        }
    }

    if let Some(scope) = scope {
        if !scope.name.is_empty() {
            event.service.get_or_insert_with(Default::default).framework = Some(Framework {
                name: scope.name.clone(),
                version: scope.version.clone(),
            });
        }
    }
}

/// Interpret a client-side span's attributes onto its span event,
/// classifying it and deriving destination and service target.
pub fn translate_span(kind: span::SpanKind, attributes: &[KeyValue], event: &mut ApmEvent) {
    let is_jaeger = event
        .agent
        .as_ref()
        .is_some_and(|agent| agent.name.starts_with("Jaeger"));

    let mut net_peer_name = String::new();
    let mut net_peer_ip = String::new();
    let mut net_peer_port: i64 = 0;

    let mut peer_service = String::new();
    let mut peer_address = String::new();

    let mut http_url = String::new();
    let mut http_host = String::new();
    let mut http_target = String::new();
    let mut http_scheme = "http".to_owned();

    let mut message_system = String::new();
    let mut message_operation = String::new();
    let mut message_temp_destination = false;

    let mut rpc_system = String::new();
    let mut rpc_service = String::new();

    let mut http = Http::default();
    let mut message = Message::default();
    let mut db = Db::default();
    let mut destination_service = DestinationService::default();
    let mut service_target = ServiceTarget::default();

    let mut is_http = false;
    let mut is_database = false;
    let mut is_rpc = false;
    let mut is_messaging = false;

    let mut sampler_type: Option<&any_value::Value> = None;
    let mut sampler_param: Option<&any_value::Value> = None;

    for kv in attributes {
        let Some(value) = kv.value.as_ref().and_then(|v| v.value.as_ref()) else {
            continue;
        };
        if is_jaeger {
            match kv.key.as_str() {
                semconv::SAMPLER_TYPE => {
                    sampler_type = Some(value);
                    continue;
                }
                semconv::SAMPLER_PARAM => {
                    sampler_param = Some(value);
                    continue;
                }
                _ => {}
            }
        }

        let k = replace_dots(&kv.key);
        match value {
            any_value::Value::ArrayValue(_) | any_value::Value::DoubleValue(_) => {
                set_label(k, event, value)
            }
            any_value::Value::BoolValue(boolval) => {
                if kv.key == semconv::MESSAGING_TEMP_DESTINATION {
                    message_temp_destination = *boolval;
                }
                set_label(k, event, value);
            }
            any_value::Value::IntValue(intval) => match kv.key.as_str() {
                semconv::HTTP_STATUS_CODE => {
                    is_http = true;
                    http.response.get_or_insert_with(Default::default).status_code =
                        Some(*intval as i32);
                }
                semconv::NET_PEER_PORT | semconv::PEER_PORT => net_peer_port = *intval,
                semconv::RPC_GRPC_STATUS_CODE => {
                    is_rpc = true;
                    rpc_system = "grpc".to_owned();
                }
                _ => set_label(k, event, value),
            },
            any_value::Value::StringValue(raw) => {
                let stringval = truncate(raw);
                match kv.key.as_str() {
                    // http.*
                    semconv::HTTP_HOST => {
                        is_http = true;
                        http_host = stringval.to_owned();
                    }
                    semconv::HTTP_SCHEME => {
                        is_http = true;
                        http_scheme = stringval.to_owned();
                    }
                    semconv::HTTP_TARGET => {
                        is_http = true;
                        http_target = stringval.to_owned();
                    }
                    semconv::HTTP_URL => {
                        is_http = true;
                        http_url = stringval.to_owned();
                    }
                    semconv::HTTP_METHOD => {
                        is_http = true;
                        http.request.get_or_insert_with(Default::default).method =
                            stringval.to_owned();
                    }

                    // db.*
                    semconv::SQL_QUERY_LEGACY => {
                        if db.r#type.is_empty() {
                            db.r#type = "sql".to_owned();
                        }
                        // Statements are exempt from truncation.
                        db.statement = raw.clone();
                        is_database = true;
                    }
                    semconv::DB_STATEMENT => {
                        db.statement = raw.clone();
                        is_database = true;
                    }
                    semconv::DB_NAME | semconv::DB_INSTANCE_LEGACY => {
                        db.instance = stringval.to_owned();
                        is_database = true;
                    }
                    semconv::DB_SYSTEM | semconv::DB_TYPE_LEGACY => {
                        db.r#type = stringval.to_owned();
                        is_database = true;
                    }
                    semconv::DB_USER => {
                        db.user_name = stringval.to_owned();
                        is_database = true;
                    }

                    // net.*
                    semconv::NET_PEER_NAME | semconv::PEER_HOSTNAME => {
                        net_peer_name = stringval.to_owned();
                    }
                    semconv::NET_PEER_IP | semconv::PEER_IPV4 | semconv::PEER_IPV6 => {
                        net_peer_ip = stringval.to_owned();
                    }
                    semconv::PEER_ADDRESS => peer_address = stringval.to_owned(),
                    semconv::NET_HOST_CONNECTION_TYPE => {
                        network_connection(event).r#type = stringval.to_owned();
                    }
                    semconv::NET_HOST_CONNECTION_SUBTYPE => {
                        network_connection(event).subtype = stringval.to_owned();
                    }
                    semconv::NET_HOST_CARRIER_MCC => {
                        network_carrier(event).mcc = stringval.to_owned();
                    }
                    semconv::NET_HOST_CARRIER_MNC => {
                        network_carrier(event).mnc = stringval.to_owned();
                    }
                    semconv::NET_HOST_CARRIER_NAME => {
                        network_carrier(event).name = stringval.to_owned();
                    }
                    semconv::NET_HOST_CARRIER_ICC => {
                        network_carrier(event).icc = stringval.to_owned();
                    }

                    // session.*
                    semconv::SESSION_ID => {
                        event.session = Some(Session {
                            id: stringval.to_owned(),
                        });
                    }

                    // messaging.*
                    semconv::MESSAGE_BUS_DESTINATION_LEGACY | semconv::MESSAGING_DESTINATION => {
                        is_messaging = true;
                        message.queue_name = stringval.to_owned();
                    }
                    semconv::MESSAGING_OPERATION => {
                        is_messaging = true;
                        message_operation = stringval.to_owned();
                    }
                    semconv::MESSAGING_SYSTEM => {
                        is_messaging = true;
                        message_system = stringval.to_owned();
                    }

                    // rpc.*
                    semconv::RPC_SYSTEM => {
                        is_rpc = true;
                        rpc_system = stringval.to_owned();
                    }
                    semconv::RPC_SERVICE => {
                        is_rpc = true;
                        rpc_service = stringval.to_owned();
                    }
                    semconv::RPC_GRPC_STATUS_CODE => {
                        is_rpc = true;
                        rpc_system = "grpc".to_owned();
                    }
                    semconv::RPC_METHOD => {}

                    // miscellaneous
                    semconv::SPAN_KIND_TAG => {} // filter out
                    semconv::PEER_SERVICE => peer_service = stringval.to_owned(),
                    _ => {
                        event.labels.insert(k, Label::value(stringval));
                    }
                }
            }
            any_value::Value::KvlistValue(_) | any_value::Value::BytesValue(_) => {}
        }
    }

    // peer.address is not necessarily a hostname or IP address; it could be
    // something like a JDBC connection string or ip:port. Ignore values
    // containing colons, except for IPv6.
    if net_peer_name.is_empty()
        && (!peer_address.contains(':') || peer_address.parse::<IpAddr>().is_ok())
    {
        net_peer_name = peer_address.clone();
    }

    let mut dest_port: u32 = if net_peer_port > 0 {
        net_peer_port as u32
    } else {
        0
    };
    let mut dest_addr = if net_peer_name.is_empty() {
        net_peer_ip.clone()
    } else {
        net_peer_name.clone()
    };

    let mut full_url = None;
    if !http_url.is_empty() {
        full_url = url::Url::parse(&http_url).ok();
    } else if !http_target.is_empty() {
        // Build http.url from http.scheme, http.target, etc.
        let mut host = http_host.clone();
        if host.is_empty() {
            // Set host from net.peer.*
            host = dest_addr.clone();
            if dest_port > 0 {
                host = join_host_port(&host, dest_port);
            }
        }
        if !host.is_empty() {
            let assembled = format!("{http_scheme}://{host}{http_target}");
            if let Ok(parsed) = url::Url::parse(&assembled) {
                http_url = parsed.to_string();
                full_url = Some(parsed);
            }
        }
    }
    if let Some(u) = full_url.as_ref() {
        // Set destination.{address,port} from the HTTP URL, replacing
        // peer.* based values to ensure consistency.
        let hostname = url_hostname(u);
        dest_addr = truncate(&hostname).to_owned();
        if let Some(port) = u.port_or_known_default() {
            dest_port = port as u32;
        }
    }

    service_target.name = peer_service.clone();
    destination_service.name = peer_service.clone();
    destination_service.resource = peer_service.clone();
    if !peer_address.is_empty() {
        destination_service.resource = peer_address.clone();
    }

    if is_http {
        let status_code = http
            .response
            .as_ref()
            .and_then(|response| response.status_code)
            .unwrap_or(0);
        if status_code > 0 {
            if let Some(ev) = event.event.as_mut() {
                if ev.outcome == Some(Outcome::Unknown) {
                    ev.outcome = Some(client_http_status_outcome(status_code));
                }
            }
        }
        if !http.is_empty() {
            event.http = Some(http);
        }
        event.url = Some(Url {
            original: http_url.clone(),
            ..Default::default()
        });
    }

    let Some(span_record) = event.span.as_mut() else {
        return;
    };
    if is_database {
        span_record.db = Some(db.clone());
    }
    if is_messaging {
        span_record.message = Some(message.clone());
    }

    if is_database {
        span_record.r#type = "db".to_owned();
        span_record.subtype = db.r#type.clone();
        service_target.r#type = span_record.r#type.clone();
        if !span_record.subtype.is_empty() {
            service_target.r#type = span_record.subtype.clone();
            if destination_service.name.is_empty() {
                // Database requests are identified by db.system alone.
                destination_service.name = span_record.subtype.clone();
                destination_service.resource = span_record.subtype.clone();
            }
        }
        if !db.instance.is_empty() {
            service_target.name = db.instance.clone();
        }
    } else if is_messaging {
        span_record.r#type = "messaging".to_owned();
        span_record.subtype = message_system.clone();
        if message_operation.is_empty() && kind == span::SpanKind::Producer {
            message_operation = "send".to_owned();
        }
        span_record.action = message_operation;
        service_target.r#type = span_record.r#type.clone();
        if !span_record.subtype.is_empty() {
            service_target.r#type = span_record.subtype.clone();
            if destination_service.name.is_empty() {
                destination_service.name = span_record.subtype.clone();
                destination_service.resource = span_record.subtype.clone();
            }
        }
        if !destination_service.resource.is_empty() && !message.queue_name.is_empty() {
            destination_service.resource =
                format!("{}/{}", destination_service.resource, message.queue_name);
        }
        if !message.queue_name.is_empty() && !message_temp_destination {
            service_target.name = message.queue_name.clone();
        }
    } else if is_rpc {
        span_record.r#type = "external".to_owned();
        span_record.subtype = rpc_system.clone();
        service_target.r#type = span_record.r#type.clone();
        if !span_record.subtype.is_empty() {
            service_target.r#type = span_record.subtype.clone();
        }
        // Set destination.service.* from the peer address, unless
        // peer.service was specified.
        if destination_service.name.is_empty() {
            let dest_host_port = join_host_port(&dest_addr, dest_port);
            destination_service.name = dest_host_port.clone();
            destination_service.resource = dest_host_port;
        }
        if !rpc_service.is_empty() {
            service_target.name = rpc_service;
        }
    } else if is_http {
        span_record.r#type = "external".to_owned();
        span_record.subtype = "http".to_owned();
        service_target.r#type = span_record.subtype.clone();
        if let Some(u) = full_url.as_ref() {
            // join_host_port re-adds IPv6 brackets, so it must be fed the
            // bare hostname; the bracketed host_str form is only correct
            // where the host renders without a port.
            let hostname = url_hostname(u);
            let bracketed = u.host_str().unwrap_or_default();
            // The resource keeps the port even when it is the scheme
            // default; the name keeps it only when it is not.
            let resource = if dest_port > 0 {
                join_host_port(&hostname, dest_port)
            } else {
                bracketed.to_owned()
            };
            let name = match u.port() {
                Some(port) => {
                    format!("{}://{}", u.scheme(), join_host_port(&hostname, port as u32))
                }
                None => format!("{}://{}", u.scheme(), bracketed),
            };

            service_target.name = resource.clone();
            if destination_service.name.is_empty() {
                destination_service.name = name;
                destination_service.resource = resource;
            }
        }
    } else if span_record.r#type.is_empty() {
        match kind {
            span::SpanKind::Internal => {
                span_record.r#type = "app".to_owned();
                span_record.subtype = "internal".to_owned();
            }
            _ => span_record.r#type = "unknown".to_owned(),
        }
    }

    if !destination_service.is_empty() {
        if destination_service.r#type.is_empty() {
            destination_service.r#type = span_record.r#type.clone();
        }
        span_record.destination_service = Some(destination_service);
    }

    if !dest_addr.is_empty() {
        event.destination = Some(Destination {
            address: dest_addr,
            port: if dest_port > 0 { Some(dest_port) } else { None },
        });
    }

    if service_target != ServiceTarget::default() {
        event
            .service
            .get_or_insert_with(Default::default)
            .target = Some(service_target);
    }

    if let Some(sampler_type) = sampler_type {
        // The client reported its sampling rate; use it to extrapolate span
        // metrics.
        parse_sampler_attributes(sampler_type, sampler_param, event);
    }
}

fn parse_sampler_attributes(
    sampler_type: &any_value::Value,
    sampler_param: Option<&any_value::Value>,
    event: &mut ApmEvent,
) {
    let type_name = match sampler_type {
        any_value::Value::StringValue(s) => s.as_str(),
        _ => "",
    };
    if type_name == "probabilistic" {
        let probability = match sampler_param {
            Some(any_value::Value::DoubleValue(p)) => *p,
            _ => 0.0,
        };
        if probability > 0.0 && probability <= 1.0 {
            if let Some(span_record) = event.span.as_mut() {
                span_record.representative_count = 1.0 / probability;
            }
            if let Some(transaction) = event.transaction.as_mut() {
                transaction.representative_count = 1.0 / probability;
            }
        }
    } else {
        if let Some(span_record) = event.span.as_mut() {
            span_record.representative_count = 0.0;
        }
        if let Some(transaction) = event.transaction.as_mut() {
            transaction.representative_count = 0.0;
        }
        event
            .labels
            .insert("sampler_type".to_owned(), Label::value(type_name));
        match sampler_param {
            Some(any_value::Value::BoolValue(b)) => {
                event
                    .labels
                    .insert("sampler_param".to_owned(), Label::value(b.to_string()));
            }
            Some(any_value::Value::DoubleValue(d)) => {
                event.numeric_labels.insert(
                    "sampler_param".to_owned(),
                    otlp2apm_model::NumericLabel::value(*d),
                );
            }
            _ => {}
        }
    }
}

fn string_value_of(value: &any_value::Value) -> Option<&str> {
    match value {
        any_value::Value::StringValue(s) => Some(s.as_str()),
        _ => None,
    }
}

/// The URL's host with IPv6 brackets stripped, like destination.address
/// expects. host_str keeps the brackets URL serialization requires.
fn url_hostname(u: &url::Url) -> String {
    match u.host() {
        Some(url::Host::Ipv6(addr)) => addr.to_string(),
        Some(host) => host.to_string(),
        None => String::new(),
    }
}

fn network_connection(event: &mut ApmEvent) -> &mut NetworkConnection {
    event
        .network
        .get_or_insert_with(Default::default)
        .connection
        .get_or_insert_with(NetworkConnection::default)
}

fn network_carrier(event: &mut ApmEvent) -> &mut NetworkCarrier {
    event
        .network
        .get_or_insert_with(Default::default)
        .carrier
        .get_or_insert_with(NetworkCarrier::default)
}

/// Outcome for transactions and spans from the OTLP span status.
fn span_status_outcome(status: Option<&Status>) -> Outcome {
    match status.map(|s| s.code()) {
        Some(status::StatusCode::Ok) => Outcome::Success,
        Some(status::StatusCode::Error) => Outcome::Failure,
        _ => Outcome::Unknown,
    }
}

/// Transaction result from the OTLP span status; unset statuses yield an
/// empty result.
fn span_status_result(status: Option<&Status>) -> String {
    match status.map(|s| s.code()) {
        Some(status::StatusCode::Ok) => "Success".to_owned(),
        Some(status::StatusCode::Error) => "Error".to_owned(),
        _ => String::new(),
    }
}

const STANDARD_STATUS_CODE_RESULTS: [&str; 5] =
    ["HTTP 1xx", "HTTP 2xx", "HTTP 3xx", "HTTP 4xx", "HTTP 5xx"];

/// Transaction result for an HTTP status code.
fn http_status_code_result(status_code: i32) -> String {
    match status_code / 100 {
        class @ 1..=5 => STANDARD_STATUS_CODE_RESULTS[class as usize - 1].to_owned(),
        _ => format!("HTTP {status_code}"),
    }
}

/// Server-side outcome for an HTTP status code.
fn server_http_status_outcome(status_code: i32) -> Outcome {
    if status_code >= 500 {
        Outcome::Failure
    } else {
        Outcome::Success
    }
}

/// Client-side outcome for an HTTP status code.
fn client_http_status_outcome(status_code: i32) -> Outcome {
    if status_code >= 400 {
        Outcome::Failure
    } else {
        Outcome::Success
    }
}
