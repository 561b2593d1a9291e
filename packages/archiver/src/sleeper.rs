//! Injectable delay used between archive steps.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

/// Future returned by a [`Sleeper`].
pub type SleepFuture = Pin<Box<dyn Future<Output = ()> + Send>>;

/// Suspends a job for the simulated latency of one step.
///
/// Production code uses [`TokioSleeper`]; tests swap in doubles that return
/// immediately and count calls.
pub trait Sleeper: Send + Sync + 'static {
    fn sleep(&self, duration: Duration) -> SleepFuture;
}

/// Real-time sleeper backed by the tokio timer.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper;

impl Sleeper for TokioSleeper {
    fn sleep(&self, duration: Duration) -> SleepFuture {
        Box::pin(tokio::time::sleep(duration))
    }
}

/// A function-based sleeper.
pub struct FnSleeper<F>
where
    F: Fn(Duration) -> SleepFuture + Send + Sync + 'static,
{
    sleep: F,
}

impl<F> FnSleeper<F>
where
    F: Fn(Duration) -> SleepFuture + Send + Sync + 'static,
{
    /// Create a sleeper from a closure.
    pub fn new(sleep: F) -> Self {
        Self { sleep }
    }
}

impl<F> Sleeper for FnSleeper<F>
where
    F: Fn(Duration) -> SleepFuture + Send + Sync + 'static,
{
    fn sleep(&self, duration: Duration) -> SleepFuture {
        (self.sleep)(duration)
    }
}
