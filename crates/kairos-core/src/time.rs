//! Simulated timestamps with tie-break priority.

use std::cmp::Ordering;
use std::fmt;
use std::time::Duration;

/// An immutable point in simulated time.
///
/// Ordered by `time` first and `priority` second, both ascending. Two
/// values with equal `time` and `priority` compare equal; the scheduler
/// is free to break that tie however it likes as long as it is
/// consistent within one run.
///
/// `time` is compared with [`f64::total_cmp`], so the order is total
/// even in the presence of NaN. `-0.0` is stored as `0.0`, so the two
/// zeros are the same instant and only priority separates them.
#[derive(Clone, Copy, Debug)]
pub struct SimTime {
    time: f64,
    priority: i32,
}

impl SimTime {
    /// The start of simulated time, at default priority.
    pub const ZERO: SimTime = SimTime {
        time: 0.0,
        priority: 0,
    };

    /// Create a timestamp at `time` seconds with the given priority.
    pub const fn new(time: f64, priority: i32) -> Self {
        // Adding positive zero maps -0.0 to 0.0 and leaves everything else.
        Self {
            time: time + 0.0,
            priority,
        }
    }

    /// Simulated seconds.
    pub fn time(&self) -> f64 {
        self.time
    }

    /// Tie-break priority; lower values are processed first.
    pub fn priority(&self) -> i32 {
        self.priority
    }

    /// A new timestamp `secs` later, keeping this priority.
    #[must_use]
    pub fn plus_secs(&self, secs: f64) -> Self {
        Self::new(self.time + secs, self.priority)
    }

    /// A new timestamp `d` later, keeping this priority.
    #[must_use]
    pub fn plus_duration(&self, d: Duration) -> Self {
        self.plus_secs(d.as_secs_f64())
    }

    /// The same instant at a different priority.
    #[must_use]
    pub fn with_priority(&self, priority: i32) -> Self {
        Self::new(self.time, priority)
    }
}

impl Default for SimTime {
    fn default() -> Self {
        Self::ZERO
    }
}

impl PartialEq for SimTime {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for SimTime {}

impl PartialOrd for SimTime {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for SimTime {
    fn cmp(&self, other: &Self) -> Ordering {
        self.time
            .total_cmp(&other.time)
            .then(self.priority.cmp(&other.priority))
    }
}

impl fmt::Display for SimTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.9}s@{}", self.time, self.priority)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn time_dominates_priority() {
        let early = SimTime::new(1.0, 100);
        let late = SimTime::new(2.0, -100);
        assert!(early < late);
    }

    #[test]
    fn priority_breaks_ties() {
        let a = SimTime::new(1.0, 0);
        let b = SimTime::new(1.0, 1);
        assert!(a < b);
        assert_eq!(a, SimTime::new(1.0, 0));
    }

    #[test]
    fn derived_times_keep_priority() {
        let base = SimTime::new(3.0, 7);
        let next = base.plus_secs(5.0);
        assert_eq!(next, SimTime::new(8.0, 7));
        assert_eq!(base, SimTime::new(3.0, 7));

        let d = base.plus_duration(Duration::from_millis(500));
        assert_eq!(d.time(), 3.5);
        assert_eq!(d.priority(), 7);
    }

    #[test]
    fn nan_is_still_ordered() {
        let nan = SimTime::new(f64::NAN, 0);
        assert_eq!(nan, nan);
        assert!(SimTime::new(f64::INFINITY, 0) < nan);
    }

    #[test]
    fn signed_zeros_are_the_same_instant() {
        let neg = SimTime::new(-0.0, 5);
        let pos = SimTime::new(0.0, 0);
        assert_eq!(neg.cmp(&pos), Ordering::Greater);
        assert_eq!(SimTime::new(-0.0, 0), SimTime::ZERO);
        assert!(neg.time().is_sign_positive());
        assert!(SimTime::new(-1.0, 0).plus_secs(1.0).time().is_sign_positive());
        assert_eq!(SimTime::ZERO.plus_secs(-0.0).with_priority(3), SimTime::new(-0.0, 3));
    }

    #[test]
    fn display_includes_priority() {
        assert_eq!(SimTime::new(1.5, 2).to_string(), "1.500000000s@2");
    }

    fn arb_time() -> impl Strategy<Value = SimTime> {
        (-1.0e6f64..1.0e6, -8i32..8).prop_map(|(t, p)| SimTime::new(t, p))
    }

    proptest! {
        #[test]
        fn distinct_times_ignore_priority(a in arb_time(), b in arb_time()) {
            prop_assume!(a.time() != b.time());
            prop_assert_eq!(a.cmp(&b), a.time().partial_cmp(&b.time()).unwrap());
        }

        #[test]
        fn equal_times_order_by_priority(
            t in -1.0e6f64..1.0e6,
            p in -8i32..8,
            q in -8i32..8,
            flip in any::<bool>(),
        ) {
            let a = SimTime::new(t, p);
            // IEEE-equal spelling of the same instant (only differs at zero).
            let u = if flip && t == 0.0 { -t } else { t };
            let b = SimTime::new(u, q);
            prop_assert_eq!(a.cmp(&b), p.cmp(&q));
        }

        #[test]
        fn order_is_transitive(a in arb_time(), b in arb_time(), c in arb_time()) {
            if a <= b && b <= c {
                prop_assert!(a <= c);
            }
        }
    }
}
