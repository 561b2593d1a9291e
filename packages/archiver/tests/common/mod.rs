#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use archiver::{SleepFuture, Sleeper};
use tokio::sync::Semaphore;

/// Returns immediately and counts how often it was asked to sleep.
#[derive(Clone, Default)]
pub struct CountingSleeper {
    calls: Arc<AtomicUsize>,
}

impl CountingSleeper {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Sleeper for CountingSleeper {
    fn sleep(&self, _duration: Duration) -> SleepFuture {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Box::pin(async {})
    }
}

/// Blocks every step until the test releases it.
#[derive(Clone)]
pub struct GatedSleeper {
    gate: Arc<Semaphore>,
    entered: Arc<AtomicUsize>,
}

impl GatedSleeper {
    pub fn new() -> Self {
        Self {
            gate: Arc::new(Semaphore::new(0)),
            entered: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Wait until jobs have started `steps` sleeps in total.
    pub async fn entered(&self, steps: usize) {
        while self.entered.load(Ordering::SeqCst) < steps {
            tokio::task::yield_now().await;
        }
    }

    /// Let `steps` more steps finish sleeping.
    pub fn release(&self, steps: usize) {
        self.gate.add_permits(steps);
    }
}

impl Sleeper for GatedSleeper {
    fn sleep(&self, _duration: Duration) -> SleepFuture {
        self.entered.fetch_add(1, Ordering::SeqCst);
        let gate = self.gate.clone();
        Box::pin(async move {
            if let Ok(permit) = gate.acquire().await {
                permit.forget();
            }
        })
    }
}
