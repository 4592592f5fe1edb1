//! Recorder configuration and validation.

use std::time::Duration;

use thiserror::Error;

/// Configuration for a [`MotionRecorder`](crate::MotionRecorder).
///
/// [`validate()`](RecorderConfig::validate) is called by the recorder
/// constructor; an invalid config never spawns a thread.
#[derive(Clone, Debug)]
pub struct RecorderConfig {
    /// Name of the delivery thread. Default: `"kairos-recorder"`.
    pub thread_name: String,
    /// How long the delivery thread blocks on an empty queue before
    /// re-checking the shutdown flag. Default: 10ms.
    pub poll_interval: Duration,
    /// How long `shutdown` waits for the delivery thread before
    /// detaching it. Default: 500ms.
    pub join_timeout: Duration,
}

impl Default for RecorderConfig {
    fn default() -> Self {
        Self {
            thread_name: "kairos-recorder".into(),
            poll_interval: Duration::from_millis(10),
            join_timeout: Duration::from_millis(500),
        }
    }
}

impl RecorderConfig {
    /// Check structural invariants.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.thread_name.trim().is_empty() {
            return Err(ConfigError::EmptyThreadName);
        }
        if self.poll_interval.is_zero() {
            return Err(ConfigError::ZeroPollInterval);
        }
        if self.join_timeout.is_zero() {
            return Err(ConfigError::ZeroJoinTimeout);
        }
        Ok(())
    }
}

/// Rejected [`RecorderConfig`].
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// `thread_name` is empty or whitespace.
    #[error("delivery thread name must not be empty")]
    EmptyThreadName,
    /// `poll_interval` is zero, which would busy-spin.
    #[error("poll interval must be non-zero")]
    ZeroPollInterval,
    /// `join_timeout` is zero, which would never join.
    #[error("join timeout must be non-zero")]
    ZeroJoinTimeout,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_valid() {
        assert!(RecorderConfig::default().validate().is_ok());
    }

    #[test]
    fn rejects_blank_thread_name() {
        let cfg = RecorderConfig {
            thread_name: "  ".into(),
            ..Default::default()
        };
        assert_eq!(cfg.validate(), Err(ConfigError::EmptyThreadName));
    }

    #[test]
    fn rejects_zero_durations() {
        let cfg = RecorderConfig {
            poll_interval: Duration::ZERO,
            ..Default::default()
        };
        assert_eq!(cfg.validate(), Err(ConfigError::ZeroPollInterval));

        let cfg = RecorderConfig {
            join_timeout: Duration::ZERO,
            ..Default::default()
        };
        assert_eq!(cfg.validate(), Err(ConfigError::ZeroJoinTimeout));
    }
}
