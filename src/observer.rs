//! Injectable per-stage observability hooks.

use crate::stage::StopReason;
use crate::Value;

/// Hook notified by a stage as values move through it.
///
/// Every method has an empty default, so implementors only override the
/// events they care about. Stages receive the hook as
/// `Arc<dyn StageObserver>` and never log on their own.
pub trait StageObserver: Send + Sync {
    /// A stage took a value from its inbound link
    fn on_received(&self, _stage: &str, _value: Value) {}

    /// A stage handed a value to its outbound link
    fn on_forwarded(&self, _stage: &str, _value: Value) {}

    /// A filter rejected a value
    fn on_discarded(&self, _stage: &str, _value: Value) {}

    /// The buffering stage stored a value
    fn on_buffered(&self, _stage: &str, _value: Value) {}

    /// The buffering stage drained its buffer on a timer tick
    fn on_flushed(&self, _stage: &str, _values: &[Value]) {}

    /// The source skipped a line that is not an integer
    fn on_rejected(&self, _stage: &str, _line: &str) {}

    /// The source read the sentinel and fired cancellation
    fn on_sentinel(&self, _stage: &str) {}

    /// A stage left its run loop
    fn on_stopped(&self, _stage: &str, _reason: StopReason) {}
}

/// Observer that ignores every event
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl StageObserver for NoopObserver {}

/// Observer that reports events through `tracing`
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl StageObserver for TracingObserver {
    fn on_received(&self, stage: &str, value: Value) {
        tracing::trace!(stage, value, "received");
    }

    fn on_forwarded(&self, stage: &str, value: Value) {
        tracing::debug!(stage, value, "forwarded");
    }

    fn on_discarded(&self, stage: &str, value: Value) {
        tracing::debug!(stage, value, "discarded");
    }

    fn on_buffered(&self, stage: &str, value: Value) {
        tracing::debug!(stage, value, "buffered");
    }

    fn on_flushed(&self, stage: &str, values: &[Value]) {
        tracing::debug!(stage, count = values.len(), ?values, "flushed");
    }

    fn on_rejected(&self, stage: &str, line: &str) {
        tracing::warn!(stage, line, "not an integer, skipped");
    }

    fn on_sentinel(&self, stage: &str) {
        tracing::info!(stage, "sentinel received, cancelling pipeline");
    }

    fn on_stopped(&self, stage: &str, reason: StopReason) {
        tracing::info!(stage, ?reason, "stage stopped");
    }
}
