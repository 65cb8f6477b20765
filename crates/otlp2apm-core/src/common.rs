// Pure helpers shared by the trace and metric translators: attribute
// coercion into labels, keyword truncation, hex id encoding, tracestate
// sampling extraction, and export-timestamp lookup.

use opentelemetry_proto::tonic::common::v1::{any_value, ArrayValue, KeyValue};
use otlp2apm_model::{ApmEvent, Label, NumericLabel};

use crate::semconv;

/// Keyword fields are capped at this many Unicode code points.
pub(crate) const KEYWORD_LENGTH: usize = 1024;

/// Truncate `s` to at most [`KEYWORD_LENGTH`] code points, never splitting
/// a character.
pub(crate) fn truncate(s: &str) -> &str {
    match s.char_indices().nth(KEYWORD_LENGTH) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

pub(crate) fn replace_dots(s: &str) -> String {
    s.replace('.', "_")
}

/// Lowercase hex encoding of a span or trace id. All-zero (or absent) ids
/// encode as the empty string so the field is omitted downstream.
pub(crate) fn hex_id(id: &[u8]) -> String {
    if id.iter().all(|&b| b == 0) {
        return String::new();
    }
    hex::encode(id)
}

/// Store one attribute on the event as a string or numeric label. The key
/// must already have dots replaced; string scalars are truncated.
pub(crate) fn set_label(key: String, event: &mut ApmEvent, value: &any_value::Value) {
    match value {
        any_value::Value::StringValue(s) => {
            event.labels.insert(key, Label::value(truncate(s)));
        }
        any_value::Value::BoolValue(b) => {
            event.labels.insert(key, Label::value(b.to_string()));
        }
        any_value::Value::IntValue(i) => {
            event.numeric_labels.insert(key, NumericLabel::value(*i as f64));
        }
        any_value::Value::DoubleValue(d) => {
            event.numeric_labels.insert(key, NumericLabel::value(*d));
        }
        any_value::Value::ArrayValue(array) => set_slice_label(key, event, array),
        // Nested maps and raw bytes have no label representation.
        any_value::Value::KvlistValue(_) | any_value::Value::BytesValue(_) => {}
    }
}

fn set_slice_label(key: String, event: &mut ApmEvent, array: &ArrayValue) {
    let mut numeric = Vec::new();
    let mut text = Vec::new();
    for item in &array.values {
        match item.value.as_ref() {
            Some(any_value::Value::IntValue(i)) => numeric.push(*i as f64),
            Some(any_value::Value::DoubleValue(d)) => numeric.push(*d),
            Some(value) => text.push(as_string(value)),
            None => {}
        }
    }
    if !text.is_empty() {
        // A mixed slice degrades entirely to strings.
        for n in numeric {
            text.push(n.to_string());
        }
        event.labels.insert(key, Label::values(text));
    } else if !numeric.is_empty() {
        event.numeric_labels.insert(key, NumericLabel::values(numeric));
    }
}

/// Canonical string rendering of an attribute value, used for metricset
/// grouping signatures and slice label elements.
pub(crate) fn as_string(value: &any_value::Value) -> String {
    match value {
        any_value::Value::StringValue(s) => s.clone(),
        any_value::Value::BoolValue(b) => b.to_string(),
        any_value::Value::IntValue(i) => i.to_string(),
        any_value::Value::DoubleValue(d) => d.to_string(),
        any_value::Value::ArrayValue(array) => {
            let items: Vec<String> = array
                .values
                .iter()
                .filter_map(|v| v.value.as_ref().map(as_string))
                .collect();
            format!("[{}]", items.join(","))
        }
        any_value::Value::KvlistValue(kvlist) => {
            let items: Vec<String> = kvlist
                .values
                .iter()
                .map(|kv| {
                    let v = kv.value.as_ref().and_then(|v| v.value.as_ref());
                    format!("{}:{}", kv.key, v.map(as_string).unwrap_or_default())
                })
                .collect();
            format!("{{{}}}", items.join(","))
        }
        any_value::Value::BytesValue(bytes) => hex::encode(bytes),
    }
}

/// Look up the export wall clock the agent stamped on the resource, in
/// nanoseconds since the epoch.
pub(crate) fn export_timestamp(attributes: &[KeyValue]) -> Option<i64> {
    let value = attributes
        .iter()
        .find(|kv| kv.key == semconv::ELASTIC_EXPORT_TIMESTAMP)?
        .value
        .as_ref()?;
    match value.value.as_ref()? {
        any_value::Value::IntValue(nanos) => Some(*nanos),
        _ => None,
    }
}

/// Extract the representative count from the W3C tracestate header's `ot`
/// vendor section. The `p` value encodes a power-of-two sampling rate; a
/// probability too small to represent (p > 62) yields 0. Absent or invalid
/// p-values mean the item was not downsampled, so the count is 1.
pub(crate) fn representative_count_from_tracestate(tracestate: &str) -> f64 {
    let mut p: u64 = 0;
    if let Some(ot) = value_for_key(tracestate, "ot", ',', '=') {
        if let Some(p_value) = value_for_key(ot, "p", ';', ':') {
            // Values outside six bits are ignored, keeping the default.
            if let Ok(parsed) = p_value.parse::<u64>() {
                if parsed < 64 {
                    p = parsed;
                }
            }
        }
    }
    if p > 62 {
        return 0.0;
    }
    f64::powi(2.0, p as i32)
}

fn value_for_key<'a>(s: &'a str, key: &str, separator: char, assign: char) -> Option<&'a str> {
    for entry in s.split(separator) {
        let entry = entry.trim();
        if let Some((k, v)) = entry.split_once(assign) {
            if k == key {
                return Some(v);
            }
        }
    }
    None
}

/// Canonical text for a gRPC status code, used as the transaction result.
pub(crate) fn grpc_status_text(code: i64) -> String {
    let text = match code {
        0 => "OK",
        1 => "Canceled",
        2 => "Unknown",
        3 => "InvalidArgument",
        4 => "DeadlineExceeded",
        5 => "NotFound",
        6 => "AlreadyExists",
        7 => "PermissionDenied",
        8 => "ResourceExhausted",
        9 => "FailedPrecondition",
        10 => "Aborted",
        11 => "OutOfRange",
        12 => "Unimplemented",
        13 => "Internal",
        14 => "Unavailable",
        15 => "DataLoss",
        16 => "Unauthenticated",
        _ => return format!("Code({code})"),
    };
    text.to_owned()
}

/// `host:port` with IPv6 bracketing, as destination service resources
/// expect.
pub(crate) fn join_host_port(host: &str, port: u32) -> String {
    if host.contains(':') {
        format!("[{host}]:{port}")
    } else {
        format!("{host}:{port}")
    }
}
