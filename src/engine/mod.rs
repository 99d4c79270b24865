//! Streaming query processors.
//!
//! The local store drives a [`QueryProcessor`] point by point; the
//! processor batches, filters or aggregates and feeds the caller's
//! response channel. Closing a processor terminates the stream with
//! exactly one END_STREAM sentinel.

mod aggregate;
mod list_series;
mod passthrough;

pub use aggregate::AggregateProcessor;
pub use list_series::ListSeriesProcessor;
pub use passthrough::PassthroughProcessor;

use crate::protocol::Response;
use async_trait::async_trait;
use tokio::sync::mpsc;

/// Sending half of a response stream. Bounded; sends observe downstream
/// backpressure.
pub type ResponseSender = mpsc::Sender<Response>;

/// Receiving half of a response stream.
pub type ResponseReceiver = mpsc::Receiver<Response>;

/// A streaming consumer of points emitted by the local engine.
#[async_trait]
pub trait QueryProcessor: Send {
    /// Consume one point. Returns false when the source should stop
    /// yielding, e.g. a limit was hit or the consumer went away.
    async fn yield_point(
        &mut self,
        series_name: &str,
        column_names: &[String],
        point: crate::protocol::Point,
    ) -> bool;

    /// Flush buffered output and emit END_STREAM downstream exactly once.
    /// Idempotent.
    async fn close(&mut self);
}
