use crate::buffer::RingBuffer;
use crate::metrics::StageMetrics;
use crate::observer::StageObserver;
use crate::stage::{StageLinks, StopReason};
use crate::Value;
use crossbeam::channel::{after, never, select};
use std::sync::Arc;
use std::time::Duration;

enum Event {
    Value(Value),
    InputClosed,
    Tick,
}

/// Collects upstream values and releases them downstream on a fixed period.
///
/// The flush timer is restarted only after it fires, so the cadence does
/// not depend on how fast values arrive. Cancellation stops the stage
/// without flushing: anything still buffered is lost.
#[derive(Debug)]
pub struct BufferingStage {
    name: String,
    buffer: RingBuffer<Value>,
    interval: Duration,
}

impl BufferingStage {
    pub fn new(name: impl Into<String>, capacity: usize, interval: Duration) -> Self {
        Self {
            name: name.into(),
            buffer: RingBuffer::new(capacity),
            interval,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn buffer(&self) -> &RingBuffer<Value> {
        &self.buffer
    }

    /// Run until cancelled or until the outbound link closes.
    ///
    /// A closed inbound link does not stop the stage: it keeps ticking,
    /// so whatever is still buffered goes out on the next flush.
    pub fn run(
        &self,
        links: &StageLinks,
        metrics: &StageMetrics,
        observer: &Arc<dyn StageObserver>,
    ) -> StopReason {
        let reason = self.run_loop(links, metrics, observer.as_ref());
        observer.on_stopped(&self.name, reason);
        reason
    }

    fn run_loop(
        &self,
        links: &StageLinks,
        metrics: &StageMetrics,
        observer: &dyn StageObserver,
    ) -> StopReason {
        let mut input = links.input.clone();
        let mut ticker = after(self.interval);

        loop {
            let event = select! {
                recv(input) -> msg => msg.map_or(Event::InputClosed, Event::Value),
                recv(ticker) -> _ => Event::Tick,
                recv(links.cancel.receiver()) -> _ => return StopReason::Cancelled,
            };

            match event {
                Event::Value(value) => {
                    metrics.record_received();
                    self.buffer.push(value);
                    metrics.set_overwritten(self.buffer.overwritten_count());
                    observer.on_buffered(&self.name, value);
                }
                Event::InputClosed => input = never(),
                Event::Tick => {
                    if let Err(reason) = self.flush(links, metrics, observer) {
                        return reason;
                    }
                    ticker = after(self.interval);
                }
            }
        }
    }

    fn flush(
        &self,
        links: &StageLinks,
        metrics: &StageMetrics,
        observer: &dyn StageObserver,
    ) -> Result<(), StopReason> {
        let values = self.buffer.drain();
        metrics.record_flush();
        observer.on_flushed(&self.name, &values);

        for value in values {
            links.forward(value)?;
            metrics.record_forwarded();
            observer.on_forwarded(&self.name, value);
        }
        Ok(())
    }
}
