//! Pass-through processor.
//!
//! Forwards points unchanged, batched into series fragments of at most
//! `max_batch` points so a large scan does not produce one response per
//! point.

use super::{QueryProcessor, ResponseSender};
use crate::protocol::{Point, Response, Series};
use async_trait::async_trait;

/// Batches yielded points per (series, columns) and forwards them as
/// QUERY responses.
pub struct PassthroughProcessor {
    response: ResponseSender,
    batch: Option<Series>,
    max_batch: usize,
    /// Optional total cap on forwarded points; once reached, the source is
    /// told to stop.
    point_limit: Option<usize>,
    forwarded: usize,
    closed: bool,
}

impl PassthroughProcessor {
    pub fn new(response: ResponseSender, max_batch: usize) -> Self {
        Self {
            response,
            batch: None,
            max_batch,
            point_limit: None,
            forwarded: 0,
            closed: false,
        }
    }

    /// Cap the total number of forwarded points.
    pub fn with_point_limit(mut self, limit: usize) -> Self {
        self.point_limit = Some(limit);
        self
    }

    async fn flush(&mut self) -> bool {
        let Some(batch) = self.batch.take() else {
            return true;
        };
        if batch.points.is_empty() {
            return true;
        }
        self.response.send(Response::query(batch)).await.is_ok()
    }
}

#[async_trait]
impl QueryProcessor for PassthroughProcessor {
    async fn yield_point(
        &mut self,
        series_name: &str,
        column_names: &[String],
        point: Point,
    ) -> bool {
        if let Some(limit) = self.point_limit {
            if self.forwarded >= limit {
                return false;
            }
        }

        let same_batch = self
            .batch
            .as_ref()
            .is_some_and(|b| b.name == series_name && b.fields == column_names);
        if !same_batch && !self.flush().await {
            return false;
        }

        let batch = self.batch.get_or_insert_with(|| Series {
            name: series_name.to_string(),
            fields: column_names.to_vec(),
            points: Vec::new(),
        });
        batch.points.push(point);
        self.forwarded += 1;

        if batch.points.len() >= self.max_batch {
            return self.flush().await;
        }
        true
    }

    async fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        self.flush().await;
        let _ = self.response.send(Response::end_stream()).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{FieldValue, ResponseKind};
    use tokio::sync::mpsc;

    fn point(ts: i64) -> Point {
        Point {
            timestamp: Some(ts),
            sequence_number: None,
            values: vec![FieldValue::double(1.0)],
        }
    }

    fn columns() -> Vec<String> {
        vec!["value".to_string()]
    }

    #[tokio::test]
    async fn batches_until_cap_then_flushes() {
        let (tx, mut rx) = mpsc::channel(16);
        let mut processor = PassthroughProcessor::new(tx, 2);
        assert!(processor.yield_point("cpu", &columns(), point(1)).await);
        assert!(processor.yield_point("cpu", &columns(), point(2)).await);
        assert!(processor.yield_point("cpu", &columns(), point(3)).await);
        processor.close().await;
        drop(processor);

        let first = rx.recv().await.unwrap();
        assert_eq!(first.kind, ResponseKind::Query);
        assert_eq!(first.series.as_ref().unwrap().points.len(), 2);

        let second = rx.recv().await.unwrap();
        assert_eq!(second.series.as_ref().unwrap().points.len(), 1);

        let last = rx.recv().await.unwrap();
        assert!(last.is_end_stream());
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn series_change_starts_a_new_batch() {
        let (tx, mut rx) = mpsc::channel(16);
        let mut processor = PassthroughProcessor::new(tx, 100);
        assert!(processor.yield_point("cpu", &columns(), point(1)).await);
        assert!(processor.yield_point("disk", &columns(), point(2)).await);
        processor.close().await;

        let first = rx.recv().await.unwrap();
        assert_eq!(first.series.as_ref().unwrap().name, "cpu");
        let second = rx.recv().await.unwrap();
        assert_eq!(second.series.as_ref().unwrap().name, "disk");
        assert!(rx.recv().await.unwrap().is_end_stream());
    }

    #[tokio::test]
    async fn point_limit_stops_the_source() {
        let (tx, _rx) = mpsc::channel(16);
        let mut processor = PassthroughProcessor::new(tx, 100).with_point_limit(2);
        assert!(processor.yield_point("cpu", &columns(), point(1)).await);
        assert!(processor.yield_point("cpu", &columns(), point(2)).await);
        assert!(!processor.yield_point("cpu", &columns(), point(3)).await);
    }

    #[tokio::test]
    async fn close_is_idempotent() {
        let (tx, mut rx) = mpsc::channel(16);
        let mut processor = PassthroughProcessor::new(tx, 100);
        processor.close().await;
        processor.close().await;
        drop(processor);

        assert!(rx.recv().await.unwrap().is_end_stream());
        assert!(rx.recv().await.is_none());
    }
}
