use flush_pipeline::PipelineBuilder;
use std::io::BufReader;
use std::process::ExitCode;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn main() -> ExitCode {
    // Logs go to stderr so stdout carries only prompts and results.
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("pipeline failed: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run() -> flush_pipeline::Result<()> {
    let mut running = PipelineBuilder::new().build()?.start()?;
    running.spawn_source(BufReader::new(std::io::stdin()), std::io::stdout())?;

    let written = running.run_sink(std::io::stdout())?;
    tracing::info!(written, "sink finished");
    tracing::info!("{}", running.metrics_summary());

    running.shutdown()?;
    Ok(())
}
