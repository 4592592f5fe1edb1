//! One-shot and periodic timers layered on the external scheduler.
//!
//! A [`Timer`] is a small state machine around at most one outstanding
//! scheduler handle:
//!
//! ```text
//! Idle ──create/reset──▶ Scheduled ──fire──▶ Scheduled (periodic)
//!                                      └───▶ Idle      (one-shot)
//! any ──cancel──▶ Canceled ──reset──▶ Scheduled
//! ```
//!
//! Every arm gets a fresh sequence number that travels inside the
//! [`TimerFired`] event, so a firing from an arm that was replaced or
//! canceled is recognised as stale and dropped.

use std::time::Duration;

use indexmap::IndexMap;
use kairos_core::{Event, EventHandle, ModelId, Scheduler, SimTime, TimerError, TimerFired, TimerId};
use tracing::trace;

use crate::context::ModelContext;
use crate::error::HandlerResult;

/// Callback run when a timer fires. Receives the owning model, a context
/// for scheduling follow-up work, and the firing time.
pub type TimerCallback<M> =
    Box<dyn FnMut(&mut M, &mut ModelContext<'_, M>, SimTime) -> HandlerResult + Send>;

/// Observable timer state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TimerState {
    /// Not armed: a one-shot that already fired.
    Idle,
    /// A firing is pending in the scheduler.
    Scheduled,
    /// Canceled; stays here until `reset`.
    Canceled,
}

/// Refers to a timer owned by a specific entity.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TimerHandle {
    owner: ModelId,
    timer: TimerId,
}

impl TimerHandle {
    /// The owning entity.
    pub fn owner(&self) -> ModelId {
        self.owner
    }

    /// The timer within the owner.
    pub fn timer(&self) -> TimerId {
        self.timer
    }
}

/// Scheduling state of one timer.
#[derive(Clone, Debug)]
pub struct Timer {
    id: TimerId,
    owner: ModelId,
    last_fired: Option<SimTime>,
    next_firing: Option<SimTime>,
    period_ns: u64,
    canceled: bool,
    pending: Option<EventHandle>,
    seq: u64,
}

impl Timer {
    /// Arm a new timer to first fire `offset` seconds after `now`.
    ///
    /// A zero `period` makes a one-shot timer.
    pub fn create(
        owner: ModelId,
        id: TimerId,
        now: SimTime,
        offset: f64,
        period: Duration,
        scheduler: &mut dyn Scheduler,
    ) -> Result<Self, TimerError> {
        TimerError::check_offset(offset)?;
        let mut timer = Self {
            id,
            owner,
            last_fired: None,
            next_firing: None,
            period_ns: duration_nanos(period),
            canceled: false,
            pending: None,
            seq: 0,
        };
        timer.schedule_next_firing(now.plus_secs(offset), scheduler);
        Ok(timer)
    }

    /// Record a firing at `now` and, for a periodic timer that is not
    /// canceled, arm the next one at `now + period`.
    ///
    /// Returns `true` if a new firing was scheduled.
    pub fn fire(&mut self, now: SimTime, scheduler: &mut dyn Scheduler) -> bool {
        self.pending = None;
        self.next_firing = None;
        self.complete_fire(now, scheduler)
    }

    /// Drop any pending firing, adopt `period`, and arm a firing
    /// `offset` seconds after `now`. Clears the canceled flag.
    pub fn reset(
        &mut self,
        now: SimTime,
        offset: f64,
        period: Duration,
        scheduler: &mut dyn Scheduler,
    ) -> Result<(), TimerError> {
        TimerError::check_offset(offset)?;
        self.period_ns = duration_nanos(period);
        self.canceled = false;
        self.schedule_next_firing(now.plus_secs(offset), scheduler);
        Ok(())
    }

    /// Retire the pending firing, if any. Idempotent.
    pub fn cancel(&mut self, scheduler: &mut dyn Scheduler) {
        if let Some(handle) = self.pending.take() {
            scheduler.cancel_event(handle);
            trace!(owner = %self.owner, timer = %self.id, "timer canceled");
        }
        self.next_firing = None;
        self.canceled = true;
    }

    /// The timer's id within its owner.
    pub fn id(&self) -> TimerId {
        self.id
    }

    /// The owning entity.
    pub fn owner(&self) -> ModelId {
        self.owner
    }

    /// When the timer last fired.
    pub fn last_fired(&self) -> Option<SimTime> {
        self.last_fired
    }

    /// When the pending firing is due.
    pub fn next_firing(&self) -> Option<SimTime> {
        self.next_firing
    }

    /// Repeat interval; zero for one-shot timers.
    pub fn period(&self) -> Duration {
        Duration::from_nanos(self.period_ns)
    }

    /// Whether `cancel` was called since the last arm.
    pub fn is_canceled(&self) -> bool {
        self.canceled
    }

    /// Whether a firing is outstanding in the scheduler.
    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// The scheduler handle of the outstanding firing.
    pub fn pending_handle(&self) -> Option<EventHandle> {
        self.pending
    }

    /// Current state-machine state.
    pub fn state(&self) -> TimerState {
        if self.canceled {
            TimerState::Canceled
        } else if self.pending.is_some() {
            TimerState::Scheduled
        } else {
            TimerState::Idle
        }
    }

    /// Consume the outstanding firing if `seq` names the current arm.
    pub(crate) fn take_delivery(&mut self, seq: u64) -> bool {
        if self.pending.is_none() || seq != self.seq {
            return false;
        }
        self.pending = None;
        self.next_firing = None;
        true
    }

    /// Post-callback half of a firing. A callback that re-armed the
    /// timer itself leaves `pending` set, which suppresses the
    /// automatic reschedule.
    pub(crate) fn complete_fire(&mut self, now: SimTime, scheduler: &mut dyn Scheduler) -> bool {
        self.last_fired = Some(now);
        if self.period_ns > 0 && !self.canceled && self.pending.is_none() {
            let next = now.plus_duration(self.period());
            self.schedule_next_firing(next, scheduler);
            return true;
        }
        false
    }

    fn schedule_next_firing(&mut self, at: SimTime, scheduler: &mut dyn Scheduler) {
        if let Some(handle) = self.pending.take() {
            scheduler.cancel_event(handle);
        }
        self.seq += 1;
        let event = Event::TimerFired(TimerFired {
            owner: self.owner,
            timer: self.id,
            seq: self.seq,
        });
        let handle = scheduler.schedule_event(self.owner, at, event);
        self.pending = Some(handle);
        self.next_firing = Some(at);
        trace!(owner = %self.owner, timer = %self.id, at = %at, "timer armed");
    }
}

fn duration_nanos(d: Duration) -> u64 {
    u64::try_from(d.as_nanos()).unwrap_or(u64::MAX)
}

// ── TimerSet ────────────────────────────────────────────────────

struct TimerEntry<M> {
    timer: Timer,
    /// `None` only while the callback is running.
    callback: Option<TimerCallback<M>>,
}

/// Timers owned by one entity, with their callbacks.
pub struct TimerSet<M> {
    owner: ModelId,
    next_id: u32,
    entries: IndexMap<TimerId, TimerEntry<M>>,
}

impl<M: 'static> TimerSet<M> {
    pub(crate) fn new(owner: ModelId) -> Self {
        Self {
            owner,
            next_id: 0,
            entries: IndexMap::new(),
        }
    }

    /// Number of timers ever created by this entity.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the entity owns no timers.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Look up a timer by id.
    pub fn get(&self, timer: TimerId) -> Option<&Timer> {
        self.entries.get(&timer).map(|e| &e.timer)
    }

    /// All timers in creation order.
    pub fn iter(&self) -> impl Iterator<Item = &Timer> {
        self.entries.values().map(|e| &e.timer)
    }

    /// Cancel every pending timer. Used when the owner finishes.
    pub(crate) fn cancel_all(&mut self, scheduler: &mut dyn Scheduler) {
        for entry in self.entries.values_mut() {
            if entry.timer.is_pending() {
                entry.timer.cancel(scheduler);
            }
        }
    }

    /// First half of a firing: validate the delivery and lend out the
    /// callback. `Ok(None)` means the firing is stale.
    pub(crate) fn begin_fire(&mut self, fired: &TimerFired) -> Result<Option<TimerCallback<M>>, TimerError> {
        let entry = self
            .entries
            .get_mut(&fired.timer)
            .ok_or(TimerError::UnknownTimer {
                owner: self.owner,
                timer: fired.timer,
            })?;
        if !entry.timer.take_delivery(fired.seq) {
            trace!(owner = %self.owner, timer = %fired.timer, seq = fired.seq, "stale timer firing dropped");
            return Ok(None);
        }
        Ok(entry.callback.take())
    }

    /// Second half of a firing: return the callback and reschedule.
    pub(crate) fn end_fire(
        &mut self,
        timer: TimerId,
        callback: TimerCallback<M>,
        now: SimTime,
        scheduler: &mut dyn Scheduler,
    ) {
        if let Some(entry) = self.entries.get_mut(&timer) {
            entry.callback = Some(callback);
            entry.timer.complete_fire(now, scheduler);
        }
    }

    fn entry_mut(&mut self, handle: TimerHandle) -> Result<&mut TimerEntry<M>, TimerError> {
        let unknown = TimerError::UnknownTimer {
            owner: handle.owner,
            timer: handle.timer,
        };
        if handle.owner != self.owner {
            return Err(unknown);
        }
        self.entries.get_mut(&handle.timer).ok_or(unknown)
    }
}

/// Timer operations reachable from a [`ModelContext`]. Implemented by
/// [`TimerSet`] and by the adapter that lets inherited handlers create
/// timers on a projected model type.
pub(crate) trait TimerSink<M> {
    fn create(
        &mut self,
        scheduler: &mut dyn Scheduler,
        now: SimTime,
        callback: TimerCallback<M>,
        offset: f64,
        period: Duration,
    ) -> Result<TimerHandle, TimerError>;

    fn cancel(&mut self, scheduler: &mut dyn Scheduler, handle: TimerHandle) -> Result<(), TimerError>;

    fn reset(
        &mut self,
        scheduler: &mut dyn Scheduler,
        handle: TimerHandle,
        now: SimTime,
        offset: f64,
        period: Duration,
    ) -> Result<(), TimerError>;

    fn lookup(&self, handle: TimerHandle) -> Option<&Timer>;
}

impl<M: 'static> TimerSink<M> for TimerSet<M> {
    fn create(
        &mut self,
        scheduler: &mut dyn Scheduler,
        now: SimTime,
        callback: TimerCallback<M>,
        offset: f64,
        period: Duration,
    ) -> Result<TimerHandle, TimerError> {
        let id = TimerId(self.next_id);
        let timer = Timer::create(self.owner, id, now, offset, period, scheduler)?;
        self.next_id += 1;
        self.entries.insert(
            id,
            TimerEntry {
                timer,
                callback: Some(callback),
            },
        );
        Ok(TimerHandle {
            owner: self.owner,
            timer: id,
        })
    }

    fn cancel(&mut self, scheduler: &mut dyn Scheduler, handle: TimerHandle) -> Result<(), TimerError> {
        self.entry_mut(handle)?.timer.cancel(scheduler);
        Ok(())
    }

    fn reset(
        &mut self,
        scheduler: &mut dyn Scheduler,
        handle: TimerHandle,
        now: SimTime,
        offset: f64,
        period: Duration,
    ) -> Result<(), TimerError> {
        self.entry_mut(handle)?
            .timer
            .reset(now, offset, period, scheduler)
    }

    fn lookup(&self, handle: TimerHandle) -> Option<&Timer> {
        if handle.owner != self.owner {
            return None;
        }
        self.get(handle.timer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kairos_test_utils::MockScheduler;

    const OWNER: ModelId = ModelId(1);

    fn one_shot(sched: &mut MockScheduler, now: SimTime, offset: f64) -> Timer {
        Timer::create(OWNER, TimerId(0), now, offset, Duration::ZERO, sched).unwrap()
    }

    #[test]
    fn create_schedules_at_offset() {
        let mut sched = MockScheduler::new();
        let timer = one_shot(&mut sched, SimTime::new(2.0, 3), 1.5);
        assert_eq!(timer.next_firing(), Some(SimTime::new(3.5, 3)));
        assert_eq!(timer.state(), TimerState::Scheduled);
        assert_eq!(sched.scheduled_count(), 1);
        assert_eq!(sched.live_count(), 1);
    }

    #[test]
    fn negative_offset_schedules_nothing() {
        let mut sched = MockScheduler::new();
        let err = Timer::create(OWNER, TimerId(0), SimTime::ZERO, -1.0, Duration::ZERO, &mut sched)
            .unwrap_err();
        assert_eq!(err, TimerError::NegativeOffset { offset: -1.0 });
        assert_eq!(sched.scheduled_count(), 0);
    }

    #[test]
    fn one_shot_goes_idle_after_fire() {
        let mut sched = MockScheduler::new();
        let mut timer = one_shot(&mut sched, SimTime::ZERO, 1.0);
        let rescheduled = timer.fire(SimTime::new(1.0, 0), &mut sched);
        assert!(!rescheduled);
        assert_eq!(timer.state(), TimerState::Idle);
        assert_eq!(timer.last_fired(), Some(SimTime::new(1.0, 0)));
        assert_eq!(timer.next_firing(), None);
    }

    #[test]
    fn periodic_reschedules_after_fire() {
        let mut sched = MockScheduler::new();
        let mut timer = Timer::create(
            OWNER,
            TimerId(0),
            SimTime::ZERO,
            0.5,
            Duration::from_millis(250),
            &mut sched,
        )
        .unwrap();
        assert!(timer.fire(SimTime::new(0.5, 0), &mut sched));
        assert_eq!(timer.next_firing(), Some(SimTime::new(0.75, 0)));
        assert_eq!(timer.state(), TimerState::Scheduled);
        assert_eq!(sched.scheduled_count(), 2);
    }

    #[test]
    fn cancel_is_idempotent() {
        let mut sched = MockScheduler::new();
        let mut timer = one_shot(&mut sched, SimTime::ZERO, 4.0);

        timer.cancel(&mut sched);
        let after_first = (timer.state(), timer.next_firing(), timer.pending_handle());
        assert_eq!(sched.cancel_count(), 1);

        timer.cancel(&mut sched);
        let after_second = (timer.state(), timer.next_firing(), timer.pending_handle());
        assert_eq!(sched.cancel_count(), 1);
        assert_eq!(after_first, after_second);
        assert_eq!(after_second.0, TimerState::Canceled);
    }

    #[test]
    fn canceled_periodic_does_not_reschedule() {
        let mut sched = MockScheduler::new();
        let mut timer = Timer::create(
            OWNER,
            TimerId(0),
            SimTime::ZERO,
            1.0,
            Duration::from_secs(1),
            &mut sched,
        )
        .unwrap();
        timer.cancel(&mut sched);
        assert!(!timer.fire(SimTime::new(1.0, 0), &mut sched));
        assert_eq!(timer.state(), TimerState::Canceled);
        assert_eq!(timer.period(), Duration::from_secs(1));
    }

    #[test]
    fn reset_after_fire_uses_new_offset() {
        let mut sched = MockScheduler::new();
        let mut timer = one_shot(&mut sched, SimTime::ZERO, 3.0);
        timer.fire(SimTime::new(3.0, 0), &mut sched);

        let now = SimTime::new(7.0, 0);
        timer
            .reset(now, 5.0, Duration::from_secs(10), &mut sched)
            .unwrap();
        assert_eq!(timer.next_firing(), Some(SimTime::new(12.0, 0)));
        assert_eq!(timer.period(), Duration::from_secs(10));
        assert_eq!(timer.last_fired(), Some(SimTime::new(3.0, 0)));
    }

    #[test]
    fn reset_replaces_pending_handle() {
        let mut sched = MockScheduler::new();
        let mut timer = one_shot(&mut sched, SimTime::ZERO, 3.0);
        let first = timer.pending_handle();

        timer
            .reset(SimTime::new(1.0, 0), 1.0, Duration::ZERO, &mut sched)
            .unwrap();
        assert_ne!(timer.pending_handle(), first);
        assert_eq!(sched.cancel_count(), 1);
        assert_eq!(sched.live_count(), 1);
    }

    #[test]
    fn reset_clears_cancel_and_rejects_negative() {
        let mut sched = MockScheduler::new();
        let mut timer = one_shot(&mut sched, SimTime::ZERO, 3.0);
        timer.cancel(&mut sched);

        let scheduled_before = sched.scheduled_count();
        assert!(timer
            .reset(SimTime::new(1.0, 0), -2.0, Duration::ZERO, &mut sched)
            .is_err());
        assert_eq!(sched.scheduled_count(), scheduled_before);
        assert_eq!(timer.state(), TimerState::Canceled);

        timer
            .reset(SimTime::new(1.0, 0), 0.0, Duration::ZERO, &mut sched)
            .unwrap();
        assert_eq!(timer.state(), TimerState::Scheduled);
    }

    #[test]
    fn stale_delivery_is_rejected() {
        let mut sched = MockScheduler::new();
        let mut timer = one_shot(&mut sched, SimTime::ZERO, 3.0);
        timer
            .reset(SimTime::ZERO, 1.0, Duration::ZERO, &mut sched)
            .unwrap();
        assert!(!timer.take_delivery(1));
        assert!(timer.take_delivery(2));
        assert!(!timer.take_delivery(2));
    }
}
