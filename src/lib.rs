//! A fixed, linear integer pipeline with a timed flush buffer.
//!
//! Values enter at the head, pass a positive filter and a non-zero
//! multiple-of-three filter, and collect in a buffering stage that releases
//! them downstream on a fixed period. Every stage runs on its own thread and
//! the links between stages are rendezvous channels, so a slow consumer
//! stalls its producer.
//!
//! # Features
//!
//! - Rendezvous links and `select!`-based stages using crossbeam channels
//! - A lock-protected ring buffer that restarts from the beginning when full
//! - One-shot broadcast cancellation observed by every stage
//! - Injectable per-stage observers, with a `tracing` implementation by default
//! - Per-stage metrics: received, forwarded, discarded, flushes, overwritten
//!
//! # Example
//!
//! ```ignore
//! use flush_pipeline::PipelineBuilder;
//! use std::io::BufReader;
//! use std::time::Duration;
//!
//! let mut running = PipelineBuilder::new()
//!     .flush_interval(Duration::from_secs(5))
//!     .build()?
//!     .start()?;
//!
//! running.spawn_source(BufReader::new(std::io::stdin()), std::io::stdout())?;
//! running.run_sink(std::io::stdout())?;
//! running.shutdown()?;
//! ```

pub mod buffer;
pub mod buffering;
pub mod cancel;
pub mod error;
pub mod metrics;
pub mod observer;
pub mod pipeline;
pub mod source;
pub mod stage;

/// The only payload carried between stages
pub type Value = i64;

// Re-exports for convenience
pub use buffer::RingBuffer;
pub use buffering::BufferingStage;
pub use cancel::CancellationSignal;
pub use error::{PipelineError, Result};
pub use metrics::{MetricsSnapshot, StageMetrics};
pub use observer::{NoopObserver, StageObserver, TracingObserver};
pub use pipeline::{
    Pipeline, PipelineBuilder, RunningPipeline, DEFAULT_BUFFER_CAPACITY, DEFAULT_FLUSH_INTERVAL,
};
pub use source::{parse_line, LineSource, SourceLine, SourceOutcome};
pub use stage::{FilterStage, Stage, StageLinks, StageRunner, StopReason};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
