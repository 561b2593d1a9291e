//! Runtime configuration for the archiver.

use std::time::Duration;

use thiserror::Error;

/// Errors raised while reading configuration from the environment.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value {value:?} for {var}")]
    Invalid { var: &'static str, value: String },
}

/// Archiver configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiverConfig {
    /// Upper bound (exclusive) of the simulated latency of one step.
    pub max_step_delay: Duration,
    /// Capacity of the job event broadcast channel.
    pub event_capacity: usize,
}

impl Default for ArchiverConfig {
    fn default() -> Self {
        Self {
            max_step_delay: Duration::from_secs(5),
            event_capacity: 256,
        }
    }
}

impl ArchiverConfig {
    /// Create a config whose steps take no time.
    pub fn instant() -> Self {
        Self {
            max_step_delay: Duration::ZERO,
            ..Default::default()
        }
    }

    /// Set the maximum per-step delay.
    pub fn with_max_step_delay(mut self, max_step_delay: Duration) -> Self {
        self.max_step_delay = max_step_delay;
        self
    }

    /// Build a config from environment variables.
    ///
    /// - `ARCHIVER_MAX_STEP_DELAY_MS` (default: 5000)
    /// - `ARCHIVER_EVENT_CAPACITY` (default: 256, must be non-zero)
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(value) = lookup("ARCHIVER_MAX_STEP_DELAY_MS") {
            let ms = parse_var::<u64>("ARCHIVER_MAX_STEP_DELAY_MS", &value)?;
            config.max_step_delay = Duration::from_millis(ms);
        }

        if let Some(value) = lookup("ARCHIVER_EVENT_CAPACITY") {
            let capacity = parse_var::<usize>("ARCHIVER_EVENT_CAPACITY", &value)?;
            if capacity == 0 {
                return Err(ConfigError::Invalid {
                    var: "ARCHIVER_EVENT_CAPACITY",
                    value,
                });
            }
            config.event_capacity = capacity;
        }

        Ok(config)
    }
}

fn parse_var<T: std::str::FromStr>(var: &'static str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::Invalid {
        var,
        value: value.to_string(),
    })
}
