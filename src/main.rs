use std::future::Future;
use std::io::{self, Write};
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use cpu_burn::limits::{MAX_CONCURRENCY, MAX_DURATION_SECS};
use cpu_burn::{LoadGenerator, LoadHandle, LoadLimits, LoadResult};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

const PROGRESS_TICK: Duration = Duration::from_millis(100);

/// Burn CPU on this machine for a bounded time. Ctrl-C stops early.
#[derive(Debug, Parser)]
#[command(name = "cpu-burn", version)]
struct Args {
    /// Seconds to burn; clamped to [1, --max-duration], default 10
    #[arg(short, long, allow_hyphen_values = true)]
    duration: Option<String>,

    /// Worker threads; clamped to [1, --max-concurrency], default one per core
    #[arg(short, long, allow_hyphen_values = true)]
    intensity: Option<String>,

    #[arg(long, default_value_t = MAX_DURATION_SECS)]
    max_duration: u64,

    #[arg(long, default_value_t = MAX_CONCURRENCY)]
    max_concurrency: usize,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with_writer(io::stderr)
        .init();

    let args = Args::parse();
    let limits = LoadLimits::new(args.max_duration, args.max_concurrency);
    let request = limits.clamp_raw(args.duration.as_deref(), args.intensity.as_deref());

    info!(
        workers = request.concurrency(),
        duration_secs = request.duration_secs(),
        "starting CPU stress test"
    );

    let handle = LoadGenerator::new().start(&request)?;
    let result = drive(handle, tokio::signal::ctrl_c(), PROGRESS_TICK).await?;

    eprintln!();
    info!(
        workers = result.worker_count,
        elapsed_secs = result.actual_elapsed.as_secs_f64(),
        iterations = result.total_iterations,
        stopped_early = result.stopped_early,
        "CPU stress test completed"
    );
    println!("{}", result.summary());
    Ok(())
}

/// Redraw progress every `tick` until the run joins. `interrupt` is polled
/// for the whole run and stops the workers the first time it resolves.
async fn drive<F>(handle: LoadHandle, interrupt: F, tick: Duration) -> Result<LoadResult>
where
    F: Future<Output = io::Result<()>>,
{
    let monitor = handle.monitor();
    let mut join = tokio::task::spawn_blocking(move || handle.join());
    let mut ticker = tokio::time::interval(tick);
    tokio::pin!(interrupt);
    let mut interrupted = false;

    let result = loop {
        tokio::select! {
            joined = &mut join => break joined??,
            signal = &mut interrupt, if !interrupted => {
                interrupted = true;
                signal?;
                warn!("interrupt received, stopping workers");
                monitor.stop();
            }
            _ = ticker.tick() => render_progress(monitor.progress())?,
        }
    };

    render_progress(if result.stopped_early { monitor.progress() } else { 100.0 })?;
    Ok(result)
}

fn render_progress(percent: f64) -> io::Result<()> {
    const WIDTH: usize = 40;
    let filled = ((percent / 100.0) * WIDTH as f64).round() as usize;
    let mut err = io::stderr().lock();
    write!(
        err,
        "\r[{}{}] {:>3.0}%",
        "#".repeat(filled.min(WIDTH)),
        "-".repeat(WIDTH - filled.min(WIDTH)),
        percent
    )?;
    err.flush()
}
