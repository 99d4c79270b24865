//! Local aggregation processor.
//!
//! Runs when the shard can aggregate locally: its duration is an integer
//! number of group-by buckets, so no bucket straddles a shard boundary.
//! Points are folded into per-series, per-bucket accumulators; results
//! stream out on close.

use super::{QueryProcessor, ResponseSender};
use crate::protocol::{FieldValue, Point, Response, Series, Value};
use crate::query::{AggregateFn, SelectQuery};
use async_trait::async_trait;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy)]
struct Accumulator {
    count: u64,
    sum: f64,
    min: f64,
    max: f64,
}

impl Accumulator {
    fn new() -> Self {
        Self {
            count: 0,
            sum: 0.0,
            min: f64::INFINITY,
            max: f64::NEG_INFINITY,
        }
    }

    fn observe(&mut self, value: f64) {
        self.count += 1;
        self.sum += value;
        self.min = self.min.min(value);
        self.max = self.max.max(value);
    }

    fn result(&self, function: AggregateFn) -> FieldValue {
        if self.count == 0 {
            return match function {
                AggregateFn::Count => FieldValue::int64(0),
                _ => FieldValue::null(),
            };
        }
        match function {
            AggregateFn::Count => FieldValue::int64(self.count as i64),
            AggregateFn::Sum => FieldValue::double(self.sum),
            AggregateFn::Min => FieldValue::double(self.min),
            AggregateFn::Max => FieldValue::double(self.max),
            AggregateFn::Mean => FieldValue::double(self.sum / self.count as f64),
        }
    }
}

/// Buckets are keyed by window start; points without a timestamp (or
/// queries without grouping) land in the `None` bucket.
type Buckets = BTreeMap<Option<i64>, Vec<Accumulator>>;

pub struct AggregateProcessor {
    response: ResponseSender,
    select: SelectQuery,
    interval_micros: Option<i64>,
    series: BTreeMap<String, Buckets>,
    closed: bool,
}

impl AggregateProcessor {
    pub fn new(select: SelectQuery, response: ResponseSender) -> Self {
        let interval_micros = select
            .group_by_interval
            .map(|d| d.as_micros() as i64)
            .filter(|&micros| micros > 0);
        Self {
            response,
            select,
            interval_micros,
            series: BTreeMap::new(),
            closed: false,
        }
    }

    fn bucket_for(&self, timestamp: Option<i64>) -> Option<i64> {
        match (self.interval_micros, timestamp) {
            (Some(interval), Some(ts)) => Some(ts.div_euclid(interval) * interval),
            _ => None,
        }
    }

    fn output_fields(&self) -> Vec<String> {
        self.select
            .aggregates
            .iter()
            .map(|a| format!("{}({})", a.function.name(), a.field))
            .collect()
    }
}

#[async_trait]
impl QueryProcessor for AggregateProcessor {
    async fn yield_point(
        &mut self,
        series_name: &str,
        column_names: &[String],
        point: Point,
    ) -> bool {
        let bucket = self.bucket_for(point.timestamp);
        let aggregate_count = self.select.aggregates.len();
        let accumulators = self
            .series
            .entry(series_name.to_string())
            .or_default()
            .entry(bucket)
            .or_insert_with(|| vec![Accumulator::new(); aggregate_count]);

        for (slot, aggregate) in self.select.aggregates.iter().enumerate() {
            let Some(index) = column_names.iter().position(|c| c == &aggregate.field) else {
                continue;
            };
            let value = match point.field_value(index) {
                Some(Value::Double(v)) => v,
                Some(Value::Int64(v)) => v as f64,
                _ => continue,
            };
            accumulators[slot].observe(value);
        }
        true
    }

    async fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;

        let fields = self.output_fields();
        for (name, buckets) in std::mem::take(&mut self.series) {
            let points = buckets
                .into_iter()
                .map(|(bucket, accumulators)| Point {
                    timestamp: bucket,
                    sequence_number: None,
                    values: self
                        .select
                        .aggregates
                        .iter()
                        .zip(&accumulators)
                        .map(|(aggregate, acc)| acc.result(aggregate.function))
                        .collect(),
                })
                .collect();
            let series = Series {
                name,
                fields: fields.clone(),
                points,
            };
            if self.response.send(Response::query(series)).await.is_err() {
                break;
            }
        }
        let _ = self.response.send(Response::end_stream()).await;
    }
}
