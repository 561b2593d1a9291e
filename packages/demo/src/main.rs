//! Command-line driver that starts an archive job and polls it to completion.
//!
//! Usage: `archive-demo [KEY] [TIMEOUT_MS]`
//!
//! The job is cancelled on Ctrl-C, or once `TIMEOUT_MS` elapses when given.
//! A second Ctrl-C exits without waiting for the job to notice.
//! Step latency comes from `ARCHIVER_MAX_STEP_DELAY_MS` (default 5000).

use std::time::Duration;

use archiver::{Archiver, ArchiverConfig, CancelContext};
use tracing_subscriber::EnvFilter;

const POLL_INTERVAL: Duration = Duration::from_millis(500);

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let mut args = std::env::args().skip(1);
    let key = args.next().unwrap_or_else(|| "demo-user".to_string());
    let timeout_ms = args.next().map(|s| s.parse::<u64>()).transpose()?;

    let archiver = Archiver::new(ArchiverConfig::from_env()?);
    let max_step_delay_ms =
        u64::try_from(archiver.config().max_step_delay.as_millis()).unwrap_or(u64::MAX);
    tracing::info!(max_step_delay_ms, "Starting archiver");

    let ctx = match timeout_ms {
        Some(ms) => CancelContext::background().with_timeout(Duration::from_millis(ms)),
        None => CancelContext::background(),
    };

    let job = archiver.start(&ctx, key.clone());
    tracing::info!("Started job {} for {}", job.id(), key);

    let mut ticker = tokio::time::interval(POLL_INTERVAL);
    let mut interrupt = Box::pin(tokio::signal::ctrl_c());
    loop {
        tokio::select! {
            _ = job.wait() => break,
            _ = ticker.tick() => {
                let snapshot = job.snapshot();
                tracing::info!(
                    "Job {} is {} ({:.0}%)",
                    snapshot.id,
                    snapshot.status,
                    snapshot.fraction() * 100.0
                );
            }
            signal = &mut interrupt => {
                signal?;
                if ctx.is_cancelled() {
                    return Err(format!("interrupted again, abandoning job {}", job.id()).into());
                }
                tracing::warn!("Interrupted, cancelling job {} (Ctrl-C again to exit)", job.id());
                ctx.cancel();
                interrupt = Box::pin(tokio::signal::ctrl_c());
            }
        }
    }

    let job = archiver
        .lookup(&key)
        .ok_or_else(|| format!("no archive job for {}", key))?;
    println!("{}", serde_json::to_string_pretty(&job.snapshot())?);

    if let Some(error) = job.error() {
        tracing::warn!("Archive did not complete: {}", error);
    }
    Ok(())
}
