use crate::buffering::BufferingStage;
use crate::cancel::CancellationSignal;
use crate::error::{PipelineError, Result};
use crate::metrics::StageMetrics;
use crate::observer::{StageObserver, TracingObserver};
use crate::source::{LineSource, SourceOutcome};
use crate::stage::{FilterStage, StageLinks, StageRunner, StopReason};
use crate::Value;
use crossbeam::channel::{bounded, select, Receiver, Sender};
use std::io::{BufRead, Write};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Buffer capacity used when none is configured
pub const DEFAULT_BUFFER_CAPACITY: usize = 10;
/// Flush period used when none is configured
pub const DEFAULT_FLUSH_INTERVAL: Duration = Duration::from_secs(5);

const POSITIVE_STAGE: &str = "positive-filter";
const MULTIPLE_OF_THREE_STAGE: &str = "multiple-of-three-filter";
const BUFFERING_STAGE: &str = "buffering";

/// Builder for the fixed filter/filter/buffer chain
pub struct PipelineBuilder {
    buffer_capacity: usize,
    flush_interval: Duration,
    observer: Arc<dyn StageObserver>,
}

impl PipelineBuilder {
    /// Create a builder with the default capacity, interval and a tracing observer
    pub fn new() -> Self {
        Self {
            buffer_capacity: DEFAULT_BUFFER_CAPACITY,
            flush_interval: DEFAULT_FLUSH_INTERVAL,
            observer: Arc::new(TracingObserver),
        }
    }

    /// Set the capacity of the buffering stage's ring buffer
    pub fn buffer_capacity(mut self, capacity: usize) -> Self {
        self.buffer_capacity = capacity;
        self
    }

    /// Set the period between buffer flushes
    pub fn flush_interval(mut self, interval: Duration) -> Self {
        self.flush_interval = interval;
        self
    }

    /// Replace the observer handed to every stage
    pub fn observer(mut self, observer: Arc<dyn StageObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// Build the pipeline
    pub fn build(self) -> Result<Pipeline> {
        if self.buffer_capacity == 0 {
            return Err(PipelineError::ConfigError(
                "buffer capacity must be at least 1".into(),
            ));
        }
        if self.flush_interval.is_zero() {
            return Err(PipelineError::ConfigError(
                "flush interval must be non-zero".into(),
            ));
        }

        Ok(Pipeline {
            buffer_capacity: self.buffer_capacity,
            flush_interval: self.flush_interval,
            observer: self.observer,
            cancel: CancellationSignal::new(),
        })
    }
}

impl Default for PipelineBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A configured, not yet running pipeline
pub struct Pipeline {
    buffer_capacity: usize,
    flush_interval: Duration,
    observer: Arc<dyn StageObserver>,
    cancel: CancellationSignal,
}

impl Pipeline {
    pub fn buffer_capacity(&self) -> usize {
        self.buffer_capacity
    }

    pub fn flush_interval(&self) -> Duration {
        self.flush_interval
    }

    /// The signal every stage of this pipeline will observe
    pub fn cancellation(&self) -> CancellationSignal {
        self.cancel.clone()
    }

    /// Wire the links and spawn one thread per stage
    pub fn start(self) -> Result<RunningPipeline> {
        let (input, positive_rx) = bounded(0);
        let (positive_tx, multiple_rx) = bounded(0);
        let (multiple_tx, buffering_rx) = bounded(0);
        let (buffering_tx, output) = bounded(0);

        let mut running = RunningPipeline {
            input: Some(input),
            output,
            cancel: self.cancel.clone(),
            observer: Arc::clone(&self.observer),
            handles: Vec::new(),
            source: None,
            metrics: Vec::new(),
            sink_metrics: StageMetrics::new(),
        };

        for (name, rx, tx, stage) in [
            (POSITIVE_STAGE, positive_rx, positive_tx, FilterStage::positive()),
            (
                MULTIPLE_OF_THREE_STAGE,
                multiple_rx,
                multiple_tx,
                FilterStage::multiple_of_three(),
            ),
        ] {
            let links = self.links(rx, tx);
            let metrics = StageMetrics::new();
            let mut runner = StageRunner::new(links, Arc::clone(&self.observer))
                .with_metrics(metrics.clone());
            let handle = spawn_stage(name, move || runner.run(Box::new(stage)));
            running.register(name, handle, metrics)?;
        }

        let links = self.links(buffering_rx, buffering_tx);
        let metrics = StageMetrics::new();
        let stage_metrics = metrics.clone();
        let observer = Arc::clone(&self.observer);
        let stage = BufferingStage::new(BUFFERING_STAGE, self.buffer_capacity, self.flush_interval);
        let handle = spawn_stage(BUFFERING_STAGE, move || {
            stage.run(&links, &stage_metrics, &observer)
        });
        running.register(BUFFERING_STAGE, handle, metrics)?;

        tracing::info!(
            capacity = self.buffer_capacity,
            interval = ?self.flush_interval,
            "pipeline started"
        );
        Ok(running)
    }

    fn links(&self, input: Receiver<Value>, output: Sender<Value>) -> StageLinks {
        StageLinks {
            input,
            output,
            cancel: self.cancel.clone(),
        }
    }
}

fn spawn_stage<F>(name: &str, body: F) -> std::io::Result<JoinHandle<StopReason>>
where
    F: FnOnce() -> StopReason + Send + 'static,
{
    thread::Builder::new().name(name.to_string()).spawn(body)
}

/// A running pipeline: the head link, the tail link and the stage threads
pub struct RunningPipeline {
    input: Option<Sender<Value>>,
    output: Receiver<Value>,
    cancel: CancellationSignal,
    observer: Arc<dyn StageObserver>,
    handles: Vec<(String, JoinHandle<StopReason>)>,
    source: Option<JoinHandle<Result<SourceOutcome>>>,
    metrics: Vec<(String, StageMetrics)>,
    sink_metrics: StageMetrics,
}

impl RunningPipeline {
    fn register(
        &mut self,
        name: &str,
        handle: std::io::Result<JoinHandle<StopReason>>,
        metrics: StageMetrics,
    ) -> Result<()> {
        match handle {
            Ok(handle) => {
                self.handles.push((name.to_string(), handle));
                self.metrics.push((name.to_string(), metrics));
                Ok(())
            }
            Err(e) => {
                // Stages already spawned must not outlive a failed start.
                self.cancel.fire();
                Err(PipelineError::ThreadError(format!(
                    "failed to spawn {name}: {e}"
                )))
            }
        }
    }

    /// Take the sender for the head of the chain.
    ///
    /// Dropping every clone of it stops both filters. The buffering stage
    /// and the sink keep running until cancellation.
    pub fn take_input(&mut self) -> Option<Sender<Value>> {
        self.input.take()
    }

    /// Feed the chain from a line reader on its own thread.
    ///
    /// Shutdown joins the source thread only if it already finished. A
    /// reader blocked on a terminal cannot be interrupted.
    pub fn spawn_source<R, W>(&mut self, reader: R, console: W) -> Result<()>
    where
        R: BufRead + Send + 'static,
        W: Write + Send + 'static,
    {
        let input = self.take_input().ok_or(PipelineError::AlreadyStarted)?;
        let cancel = self.cancel.clone();
        let source = LineSource::new(reader, console, Arc::clone(&self.observer));
        let handle = thread::Builder::new()
            .name("source".to_string())
            .spawn(move || source.run(input, &cancel))
            .map_err(|e| PipelineError::ThreadError(format!("failed to spawn source: {e}")))?;
        self.source = Some(handle);
        Ok(())
    }

    /// The shared cancellation signal
    pub fn cancellation(&self) -> CancellationSignal {
        self.cancel.clone()
    }

    /// Metrics of a stage by name
    pub fn stage_metrics(&self, name: &str) -> Option<&StageMetrics> {
        self.metrics
            .iter()
            .find(|(stage, _)| stage == name)
            .map(|(_, metrics)| metrics)
    }

    /// Metrics of the sink loop
    pub fn sink_metrics(&self) -> &StageMetrics {
        &self.sink_metrics
    }

    /// Consume the tail of the chain, writing one line per value.
    ///
    /// Returns the number of values written once cancellation fires. The
    /// buffering stage holds the last link open until then, so the end of
    /// the input alone does not end the sink.
    pub fn run_sink<W: Write>(&self, mut writer: W) -> Result<u64> {
        let mut written = 0;
        loop {
            let next = select! {
                recv(self.output) -> msg => msg.ok(),
                recv(self.cancel.receiver()) -> _ => None,
            };
            let Some(value) = next else {
                break;
            };
            if self.cancel.is_cancelled() {
                break;
            }
            self.sink_metrics.record_received();
            writeln!(writer, "Received data: {value}")?;
            writer.flush()?;
            self.sink_metrics.record_forwarded();
            written += 1;
        }
        Ok(written)
    }

    /// Fire cancellation and join every stage
    pub fn shutdown(self) -> Result<Vec<(String, StopReason)>> {
        self.cancel.fire();
        self.join_all()
    }

    fn join_all(mut self) -> Result<Vec<(String, StopReason)>> {
        let mut reasons = Vec::with_capacity(self.handles.len());
        for (name, handle) in self.handles.drain(..) {
            match handle.join() {
                Ok(reason) => reasons.push((name, reason)),
                Err(_) => {
                    return Err(PipelineError::ThreadError(format!("{name} panicked")))
                }
            }
        }

        if let Some(source) = self.source.take() {
            if source.is_finished() {
                match source.join() {
                    Ok(outcome) => tracing::info!(?outcome, "source finished"),
                    Err(_) => return Err(PipelineError::ThreadError("source panicked".into())),
                }
            }
        }

        Ok(reasons)
    }

    /// Get a summary of all metrics
    pub fn metrics_summary(&self) -> String {
        let mut summary = String::from("Pipeline Metrics Summary:\n");
        for (name, metrics) in &self.metrics {
            summary.push_str(&format!("  {}: {}\n", name, metrics.snapshot().format()));
        }
        summary.push_str(&format!("  sink: {}\n", self.sink_metrics.snapshot().format()));
        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observer::NoopObserver;

    fn quiet() -> PipelineBuilder {
        PipelineBuilder::new().observer(Arc::new(NoopObserver))
    }

    #[test]
    fn test_builder_defaults() {
        let pipeline = quiet().build().unwrap();
        assert_eq!(pipeline.buffer_capacity(), DEFAULT_BUFFER_CAPACITY);
        assert_eq!(pipeline.flush_interval(), DEFAULT_FLUSH_INTERVAL);
        assert!(!pipeline.cancellation().is_cancelled());
    }

    #[test]
    fn test_zero_capacity_rejected() {
        let result = quiet().buffer_capacity(0).build();
        assert!(matches!(result, Err(PipelineError::ConfigError(_))));
    }

    #[test]
    fn test_zero_interval_rejected() {
        let result = quiet().flush_interval(Duration::ZERO).build();
        assert!(matches!(result, Err(PipelineError::ConfigError(_))));
    }

    #[test]
    fn test_shutdown_stops_every_stage() {
        let running = quiet().build().unwrap().start().unwrap();
        let reasons = running.shutdown().unwrap();
        assert_eq!(reasons.len(), 3);
        // The head link stays open until join, so the first filter can only
        // have seen the signal. Later stages may see their upstream close first.
        assert_eq!(reasons[0], (POSITIVE_STAGE.to_string(), StopReason::Cancelled));
        assert!(reasons
            .iter()
            .all(|(_, reason)| *reason != StopReason::DownstreamClosed));
    }

    #[test]
    fn test_source_can_only_be_attached_once() {
        let mut running = quiet().build().unwrap().start().unwrap();
        running
            .spawn_source(std::io::Cursor::new(""), std::io::sink())
            .unwrap();
        let again = running.spawn_source(std::io::Cursor::new(""), std::io::sink());
        assert!(matches!(again, Err(PipelineError::AlreadyStarted)));
        running.shutdown().unwrap();
    }

    #[test]
    fn test_stage_metrics_lookup() {
        let running = quiet().build().unwrap().start().unwrap();
        assert!(running.stage_metrics(POSITIVE_STAGE).is_some());
        assert!(running.stage_metrics(MULTIPLE_OF_THREE_STAGE).is_some());
        assert!(running.stage_metrics(BUFFERING_STAGE).is_some());
        assert!(running.stage_metrics("missing").is_none());
        assert!(running.metrics_summary().contains("sink"));
        running.shutdown().unwrap();
    }
}
