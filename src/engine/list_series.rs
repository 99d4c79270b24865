//! List-series processor.
//!
//! The local store yields one point per stored series for a list-series
//! query; this processor turns each into a response carrying just the
//! series name, deduplicating names already emitted.

use super::{QueryProcessor, ResponseSender};
use crate::protocol::{Point, Response, Series};
use async_trait::async_trait;
use std::collections::HashSet;

pub struct ListSeriesProcessor {
    response: ResponseSender,
    seen: HashSet<String>,
    closed: bool,
}

impl ListSeriesProcessor {
    pub fn new(response: ResponseSender) -> Self {
        Self {
            response,
            seen: HashSet::new(),
            closed: false,
        }
    }
}

#[async_trait]
impl QueryProcessor for ListSeriesProcessor {
    async fn yield_point(
        &mut self,
        series_name: &str,
        _column_names: &[String],
        _point: Point,
    ) -> bool {
        if !self.seen.insert(series_name.to_string()) {
            return true;
        }
        let series = Series {
            name: series_name.to_string(),
            fields: Vec::new(),
            points: Vec::new(),
        };
        self.response.send(Response::query(series)).await.is_ok()
    }

    async fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        let _ = self.response.send(Response::end_stream()).await;
    }
}
