use crate::cancel::CancellationSignal;
use crate::metrics::StageMetrics;
use crate::observer::StageObserver;
use crate::Value;
use crossbeam::channel::{select, Receiver, Sender};
use std::sync::Arc;

/// Why a stage left its run loop. None of these are failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// The cancellation signal fired
    Cancelled,
    /// Every sender on the inbound link is gone
    UpstreamClosed,
    /// The receiver on the outbound link is gone
    DownstreamClosed,
}

/// Trait for a per-value processing stage in the pipeline
pub trait Stage: Send + 'static {
    /// Process one value. `Some` is forwarded downstream, `None` is dropped.
    fn process(&mut self, value: Value) -> Option<Value>;

    /// Get a human-readable name for this stage
    fn name(&self) -> &str {
        "stage"
    }
}

/// The two links and the shutdown signal a stage is wired to
#[derive(Debug, Clone)]
pub struct StageLinks {
    pub input: Receiver<Value>,
    pub output: Sender<Value>,
    pub cancel: CancellationSignal,
}

impl StageLinks {
    /// Hand `value` downstream, giving up if cancellation fires first.
    ///
    /// The signal is checked before the send so a stage that has already
    /// been cancelled never forwards another value.
    pub fn forward(&self, value: Value) -> Result<(), StopReason> {
        if self.cancel.is_cancelled() {
            return Err(StopReason::Cancelled);
        }
        select! {
            send(self.output, value) -> res => res.map_err(|_| StopReason::DownstreamClosed),
            recv(self.cancel.receiver()) -> _ => Err(StopReason::Cancelled),
        }
    }
}

/// Runs a [`Stage`] by pulling from its inbound link and pushing survivors downstream
pub struct StageRunner {
    links: StageLinks,
    metrics: StageMetrics,
    observer: Arc<dyn StageObserver>,
}

impl StageRunner {
    /// Create a new stage runner
    pub fn new(links: StageLinks, observer: Arc<dyn StageObserver>) -> Self {
        Self {
            links,
            metrics: StageMetrics::new(),
            observer,
        }
    }

    /// Report into an existing metrics collector instead of a private one
    pub fn with_metrics(mut self, metrics: StageMetrics) -> Self {
        self.metrics = metrics;
        self
    }

    /// Get a reference to the metrics
    pub fn metrics(&self) -> &StageMetrics {
        &self.metrics
    }

    /// Run the stage until cancellation or until a neighbouring link closes
    pub fn run(&mut self, mut stage: Box<dyn Stage>) -> StopReason {
        let reason = self.run_loop(stage.as_mut());
        self.observer.on_stopped(stage.name(), reason);
        reason
    }

    fn run_loop(&mut self, stage: &mut dyn Stage) -> StopReason {
        loop {
            let value = select! {
                recv(self.links.input) -> msg => match msg {
                    Ok(value) => value,
                    Err(_) => return StopReason::UpstreamClosed,
                },
                recv(self.links.cancel.receiver()) -> _ => return StopReason::Cancelled,
            };

            self.metrics.record_received();
            self.observer.on_received(stage.name(), value);

            match stage.process(value) {
                Some(out) => {
                    if let Err(reason) = self.links.forward(out) {
                        return reason;
                    }
                    self.metrics.record_forwarded();
                    self.observer.on_forwarded(stage.name(), out);
                }
                None => {
                    self.metrics.record_discarded();
                    self.observer.on_discarded(stage.name(), value);
                }
            }
        }
    }
}

/// Predicate signature used by the built-in filters
pub type Predicate = fn(Value) -> bool;

/// True for strictly positive values
pub fn is_positive(value: Value) -> bool {
    value > 0
}

/// True for non-zero multiples of three
pub fn is_nonzero_multiple_of_three(value: Value) -> bool {
    value != 0 && value % 3 == 0
}

/// A filtering stage that passes through values matching a predicate
#[derive(Debug)]
pub struct FilterStage<F>
where
    F: Fn(Value) -> bool + Send + 'static,
{
    name: String,
    predicate: F,
}

impl<F> FilterStage<F>
where
    F: Fn(Value) -> bool + Send + 'static,
{
    /// Create a new filter stage
    pub fn new(name: impl Into<String>, predicate: F) -> Self {
        Self {
            name: name.into(),
            predicate,
        }
    }
}

impl FilterStage<Predicate> {
    /// Drops zero and negative values
    pub fn positive() -> Self {
        Self::new("positive-filter", is_positive)
    }

    /// Drops zero and anything not divisible by three
    pub fn multiple_of_three() -> Self {
        Self::new("multiple-of-three-filter", is_nonzero_multiple_of_three)
    }
}

impl<F> Stage for FilterStage<F>
where
    F: Fn(Value) -> bool + Send + 'static,
{
    fn process(&mut self, value: Value) -> Option<Value> {
        (self.predicate)(value).then_some(value)
    }

    fn name(&self) -> &str {
        &self.name
    }
}
