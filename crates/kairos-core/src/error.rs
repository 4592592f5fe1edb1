//! Error types shared by every crate that drives timers.

use thiserror::Error;

use crate::id::{ModelId, TimerId};

/// Errors from creating, resetting, or looking up a timer.
#[derive(Clone, Debug, PartialEq, Error)]
pub enum TimerError {
    /// The first firing would lie in the past.
    #[error("timer offset must be non-negative, got {offset}")]
    NegativeOffset {
        /// The rejected offset in seconds.
        offset: f64,
    },
    /// The offset is NaN or infinite.
    #[error("timer offset must be finite, got {offset}")]
    NonFiniteOffset {
        /// The rejected offset in seconds.
        offset: f64,
    },
    /// The owner has no timer with this id.
    #[error("model {owner} has no timer {timer}")]
    UnknownTimer {
        /// Entity that was asked.
        owner: ModelId,
        /// The missing timer.
        timer: TimerId,
    },
}

impl TimerError {
    /// Reject offsets that would schedule into the past or nowhere.
    pub fn check_offset(offset: f64) -> Result<(), TimerError> {
        if !offset.is_finite() {
            return Err(Self::NonFiniteOffset { offset });
        }
        if offset < 0.0 {
            return Err(Self::NegativeOffset { offset });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn offset_validation() {
        assert!(TimerError::check_offset(0.0).is_ok());
        assert!(TimerError::check_offset(2.5).is_ok());
        assert_eq!(
            TimerError::check_offset(-0.1),
            Err(TimerError::NegativeOffset { offset: -0.1 })
        );
        assert!(matches!(
            TimerError::check_offset(f64::INFINITY),
            Err(TimerError::NonFiniteOffset { .. })
        ));
    }

    #[test]
    fn messages_name_the_timer() {
        let e = TimerError::UnknownTimer {
            owner: ModelId(3),
            timer: TimerId(9),
        };
        assert_eq!(e.to_string(), "model 3 has no timer 9");
    }
}
