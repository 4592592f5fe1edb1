//! Errors from linking aggregators.

use thiserror::Error;

/// Why a parent link was refused.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum AggregatorError {
    /// The aggregator already forwards to a parent.
    #[error("aggregator '{name}' already has a parent")]
    ParentAlreadySet {
        /// The child that was asked.
        name: String,
    },
    /// The link would make the aggregator its own ancestor.
    #[error("linking '{child}' under '{parent}' would create a cycle")]
    Cycle {
        /// The would-be child.
        child: String,
        /// The would-be parent.
        parent: String,
    },
}
