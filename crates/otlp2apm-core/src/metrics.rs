// OTLP metric translation.
//
// Datapoints are grouped per scope into metricsets keyed by timestamp and
// attribute signature; each metricset becomes one event. Histograms are
// reshaped into (value, count) pairs, one per non-empty bucket. Datapoints
// the model cannot represent are dropped and counted.

use std::collections::BTreeMap;
use std::sync::atomic::Ordering;

use anyhow::Result;
use opentelemetry_proto::tonic::collector::metrics::v1::ExportMetricsServiceRequest;
use opentelemetry_proto::tonic::common::v1::KeyValue;
use opentelemetry_proto::tonic::metrics::v1::{
    metric, number_data_point, Metric, NumberDataPoint, ResourceMetrics, ScopeMetrics,
    SummaryDataPoint,
};
use tracing::debug;

use otlp2apm_model::{
    ApmEvent, Batch, Event, Histogram, MetricType, Metricset, MetricsetSample, ProcessorKind,
    SummaryMetric,
};

use crate::common::{as_string, export_timestamp, replace_dots, set_label};
use crate::consumer::{now_nanos, Consumer};
use crate::resource::translate_resource_metadata;

impl Consumer {
    /// Consume an OTLP metrics export request, converting into APM
    /// metricset events and handing the batch to the configured processor.
    pub async fn consume_metrics(&self, metrics: ExportMetricsServiceRequest) -> Result<()> {
        let _permit = self.semaphore.acquire().await?;

        let receive_timestamp = now_nanos();
        debug!(
            resource_metrics = metrics.resource_metrics.len(),
            "consuming metrics"
        );

        let mut batch = Batch::new();
        for resource_metrics in &metrics.resource_metrics {
            self.convert_resource_metrics(resource_metrics, receive_timestamp, &mut batch);
        }
        self.processor.process_batch(batch).await
    }

    fn convert_resource_metrics(
        &self,
        resource_metrics: &ResourceMetrics,
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
        let resource = resource_metrics.resource.as_ref();
        translate_resource_metadata(resource, &mut base_event);

        let time_delta = resource
            .and_then(|r| export_timestamp(&r.attributes))
            .map(|export_timestamp| receive_timestamp - export_timestamp)
            .unwrap_or(0);

        for scope_metrics in &resource_metrics.scope_metrics {
            self.convert_scope_metrics(scope_metrics, &base_event, time_delta, out);
        }
    }

    fn convert_scope_metrics(
        &self,
        scope_metrics: &ScopeMetrics,
        base_event: &ApmEvent,
        time_delta: i64,
        out: &mut Batch,
    ) {
        let mut metricsets = Metricsets::default();
        let mut unsupported: i64 = 0;
        for metric in &scope_metrics.metrics {
            add_metric(metric, &mut metricsets, &mut unsupported);
        }

        for (key, group) in metricsets.groups {
            let mut event = base_event.clone();
            event.processor = Some(ProcessorKind::Metricset);
            event.timestamp = Some(key.timestamp as i64 + time_delta);
            event.metricset = Some(Metricset {
                name: "app".to_owned(),
                samples: group.samples.into_values().collect(),
            });
            for kv in &group.attributes {
                if let Some(value) = kv.value.as_ref().and_then(|v| v.value.as_ref()) {
                    set_label(replace_dots(&kv.key), &mut event, value);
                }
            }
            out.push(event);
        }

        if unsupported > 0 {
            self.stats
                .unsupported_metrics_dropped
                .fetch_add(unsupported, Ordering::Relaxed);
            debug!(dropped = unsupported, "dropped unsupported metric datapoints");
        }
    }
}

fn add_metric(metric: &Metric, metricsets: &mut Metricsets, unsupported: &mut i64) {
    match metric.data.as_ref() {
        Some(metric::Data::Gauge(gauge)) => {
            for dp in &gauge.data_points {
                match number_sample(dp, MetricType::Gauge) {
                    Some(mut sample) => {
                        sample.name = metric.name.clone();
                        metricsets.upsert(dp.time_unix_nano, &dp.attributes, sample);
                    }
                    None => *unsupported += 1,
                }
            }
        }
        Some(metric::Data::Sum(sum)) => {
            for dp in &sum.data_points {
                match number_sample(dp, MetricType::Counter) {
                    Some(mut sample) => {
                        sample.name = metric.name.clone();
                        metricsets.upsert(dp.time_unix_nano, &dp.attributes, sample);
                    }
                    None => *unsupported += 1,
                }
            }
        }
        Some(metric::Data::Histogram(histogram)) => {
            for dp in &histogram.data_points {
                match histogram_sample(&dp.bucket_counts, &dp.explicit_bounds) {
                    Some(mut sample) => {
                        sample.name = metric.name.clone();
                        metricsets.upsert(dp.time_unix_nano, &dp.attributes, sample);
                    }
                    None => *unsupported += 1,
                }
            }
        }
        Some(metric::Data::Summary(summary)) => {
            for dp in &summary.data_points {
                let mut sample = summary_sample(dp);
                sample.name = metric.name.clone();
                metricsets.upsert(dp.time_unix_nano, &dp.attributes, sample);
            }
        }
        // Exponential histograms have no downstream representation yet.
        Some(metric::Data::ExponentialHistogram(histogram)) => {
            *unsupported += histogram.data_points.len() as i64;
        }
        None => *unsupported += 1,
    }
}

fn number_sample(dp: &NumberDataPoint, metric_type: MetricType) -> Option<MetricsetSample> {
    let value = match dp.value.as_ref()? {
        number_data_point::Value::AsInt(intval) => *intval as f64,
        number_data_point::Value::AsDouble(doubleval) => {
            if doubleval.is_nan() || doubleval.is_infinite() {
                return None;
            }
            *doubleval
        }
    };
    Some(MetricsetSample {
        r#type: metric_type,
        value: Some(value),
        ..Default::default()
    })
}

fn summary_sample(dp: &SummaryDataPoint) -> MetricsetSample {
    // Quantile values are discarded; only count and sum survive.
    MetricsetSample {
        r#type: MetricType::Summary,
        summary: Some(SummaryMetric {
            count: dp.count as i64,
            sum: dp.sum,
        }),
        ..Default::default()
    }
}

fn histogram_sample(bucket_counts: &[u64], explicit_bounds: &[f64]) -> Option<MetricsetSample> {
    // N explicit bounds define N+1 buckets:
    //   (-infinity, bounds[0]] for the first,
    //   (bounds[i-1], bounds[i]] in between,
    //   (bounds[N-1], +infinity) for the last.
    if bucket_counts.len() != explicit_bounds.len() + 1 || explicit_bounds.is_empty() {
        return None;
    }

    // Representative values follow the interpolation of Prometheus's
    // histogram_quantile so percentile aggregation stays consistent: the
    // lowest bucket maps to half its upper bound when that bound is
    // positive (otherwise the bound itself), the highest bucket to the
    // next-to-last bound, interior buckets to their midpoint.
    let mut values = Vec::with_capacity(bucket_counts.len());
    let mut counts = Vec::with_capacity(bucket_counts.len());
    for (i, &count) in bucket_counts.iter().enumerate() {
        if count == 0 {
            continue;
        }

        let value = if i == 0 {
            let bound = explicit_bounds[0];
            if bound > 0.0 {
                bound / 2.0
            } else {
                bound
            }
        } else if i == bucket_counts.len() - 1 {
            explicit_bounds[explicit_bounds.len() - 1]
        } else {
            explicit_bounds[i - 1] + (explicit_bounds[i] - explicit_bounds[i - 1]) / 2.0
        };

        counts.push(count as i64);
        values.push(value);
    }
    Some(MetricsetSample {
        r#type: MetricType::Histogram,
        histogram: Some(Histogram { values, counts }),
        ..Default::default()
    })
}

/// Metricsets accumulated for one instrumentation scope, keyed by datapoint
/// timestamp and attribute signature. Within a group, samples are keyed by
/// metric name, last writer wins.
#[derive(Default)]
struct Metricsets {
    groups: BTreeMap<MetricsetKey, MetricsetGroup>,
}

#[derive(Debug, PartialEq, Eq, PartialOrd, Ord)]
struct MetricsetKey {
    timestamp: u64,
    signature: String,
}

struct MetricsetGroup {
    attributes: Vec<KeyValue>,
    samples: BTreeMap<String, MetricsetSample>,
}

impl Metricsets {
    fn upsert(&mut self, timestamp: u64, attributes: &[KeyValue], sample: MetricsetSample) {
        let mut signature = String::new();
        for kv in attributes {
            signature.push_str(&kv.key);
            if let Some(value) = kv.value.as_ref().and_then(|v| v.value.as_ref()) {
                signature.push_str(&as_string(value));
            }
        }
        let key = MetricsetKey {
            timestamp,
            signature,
        };
        let group = self.groups.entry(key).or_insert_with(|| MetricsetGroup {
            attributes: attributes.to_vec(),
            samples: BTreeMap::new(),
        });
        group.samples.insert(sample.name.clone(), sample);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn histogram_midpoints() {
        let sample = histogram_sample(&[1, 1, 2, 3], &[-1.0, 2.0, 3.5]).unwrap();
        let histogram = sample.histogram.unwrap();
        assert_eq!(histogram.values, vec![-1.0, 0.5, 2.75, 3.5]);
        assert_eq!(histogram.counts, vec![1, 1, 2, 3]);
    }

    #[test]
    fn histogram_first_bucket_halves_positive_bound() {
        let sample = histogram_sample(&[4, 0], &[10.0]).unwrap();
        let histogram = sample.histogram.unwrap();
        assert_eq!(histogram.values, vec![5.0]);
        assert_eq!(histogram.counts, vec![4]);
    }

    #[test]
    fn histogram_empty_buckets_are_omitted() {
        let sample = histogram_sample(&[0, 2, 0], &[1.0, 2.0]).unwrap();
        let histogram = sample.histogram.unwrap();
        assert_eq!(histogram.values, vec![1.5]);
        assert_eq!(histogram.counts, vec![2]);
    }

    #[test]
    fn malformed_histograms_are_rejected() {
        // One more bucket count than bounds is required.
        assert!(histogram_sample(&[1, 2, 3], &[1.0, 2.0, 3.0]).is_none());
        // Bounds must be non-empty.
        assert!(histogram_sample(&[1], &[]).is_none());
    }

    #[test]
    fn non_finite_doubles_are_rejected() {
        for value in [f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
            let dp = NumberDataPoint {
                value: Some(number_data_point::Value::AsDouble(value)),
                ..Default::default()
            };
            assert!(number_sample(&dp, MetricType::Gauge).is_none());
        }
    }

    #[test]
    fn int_values_pass_through() {
        let dp = NumberDataPoint {
            value: Some(number_data_point::Value::AsInt(42)),
            ..Default::default()
        };
        let sample = number_sample(&dp, MetricType::Counter).unwrap();
        assert_eq!(sample.value, Some(42.0));
        assert_eq!(sample.r#type, MetricType::Counter);
    }

    #[test]
    fn valueless_datapoints_are_rejected() {
        let dp = NumberDataPoint::default();
        assert!(number_sample(&dp, MetricType::Gauge).is_none());
    }
}
