//! Hierarchical metric accumulation for Kairos models.
//!
//! An [`Aggregator`] keeps a running total per key and an itemized
//! breakdown per key. Aggregators can be chained: every
//! [`add_value`](Aggregator::add_value) on a child is replayed on its
//! parent, so a vehicle-level aggregator can sum what its actuators
//! report while each actuator still sees only its own share.
//!
//! ```
//! use std::sync::Arc;
//! use kairos_aggregate::Aggregator;
//!
//! let vehicle = Arc::new(Aggregator::new("vehicle"));
//! let wheel = Aggregator::new("wheel");
//! wheel.set_parent(&vehicle).unwrap();
//!
//! wheel.add_value("energy", "actuation", 5.0);
//! wheel.add_value("energy", "friction", 1.5);
//! assert_eq!(vehicle.aggregate_value("energy"), 6.5);
//! assert_eq!(wheel.itemized_value("energy", "friction"), 1.5);
//! ```

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod aggregator;
pub mod error;

pub use aggregator::{Aggregator, DEFAULT_ITEM};
pub use error::AggregatorError;
