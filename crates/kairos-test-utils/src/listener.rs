//! Reusable recorder listeners.
//!
//! - [`RecordingListener`] keeps every notification in arrival order.
//! - [`FailingListener`] records like `RecordingListener` but errors
//!   (or panics) on chosen state updates.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};

use kairos_core::{ObjectId, Quat, Vec3};
use kairos_recorder::{Listener, ListenerError, MetaUpdate, Shape};

/// One observed listener call.
#[derive(Clone, Debug, PartialEq)]
pub enum Notification {
    Init { id: ObjectId, shape: Shape },
    State { id: ObjectId, position: Vec3, orientation: Quat },
    Meta { id: ObjectId, meta: MetaUpdate },
}

impl Notification {
    pub fn id(&self) -> ObjectId {
        match self {
            Self::Init { id, .. } | Self::State { id, .. } | Self::Meta { id, .. } => *id,
        }
    }
}

/// Records every notification it receives.
#[derive(Default)]
pub struct RecordingListener {
    seen: Mutex<Vec<Notification>>,
}

impl RecordingListener {
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything received so far.
    pub fn notifications(&self) -> Vec<Notification> {
        self.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Positions received for `id`, in order.
    pub fn positions_of(&self, id: ObjectId) -> Vec<Vec3> {
        self.lock()
            .iter()
            .filter_map(|n| match n {
                Notification::State { id: got, position, .. } if *got == id => Some(*position),
                _ => None,
            })
            .collect()
    }

    /// Number of `init_object` calls received for `id`.
    pub fn init_count(&self, id: ObjectId) -> usize {
        self.lock()
            .iter()
            .filter(|n| matches!(n, Notification::Init { id: got, .. } if *got == id))
            .count()
    }

    fn record(&self, n: Notification) {
        self.lock().push(n);
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<Notification>> {
        self.seen.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Listener for RecordingListener {
    fn init_object(&self, id: ObjectId, shape: &Shape) -> Result<(), ListenerError> {
        self.record(Notification::Init {
            id,
            shape: shape.clone(),
        });
        Ok(())
    }

    fn state_update(&self, id: ObjectId, position: Vec3, orientation: Quat) -> Result<(), ListenerError> {
        self.record(Notification::State {
            id,
            position,
            orientation,
        });
        Ok(())
    }

    fn meta_update(&self, id: ObjectId, meta: &MetaUpdate) -> Result<(), ListenerError> {
        self.record(Notification::Meta {
            id,
            meta: meta.clone(),
        });
        Ok(())
    }
}

/// How a [`FailingListener`] fails.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FailureMode {
    /// Return an error.
    Error,
    /// Panic.
    Panic,
}

/// Fails on the listed 1-based state-update numbers and records the rest.
pub struct FailingListener {
    inner: RecordingListener,
    fail_on: Vec<u64>,
    mode: FailureMode,
    state_calls: AtomicU64,
}

impl FailingListener {
    /// Return an error from the given state updates.
    pub fn erroring_on(fail_on: impl Into<Vec<u64>>) -> Self {
        Self::new(fail_on.into(), FailureMode::Error)
    }

    /// Panic inside the given state updates.
    pub fn panicking_on(fail_on: impl Into<Vec<u64>>) -> Self {
        Self::new(fail_on.into(), FailureMode::Panic)
    }

    fn new(fail_on: Vec<u64>, mode: FailureMode) -> Self {
        Self {
            inner: RecordingListener::new(),
            fail_on,
            mode,
            state_calls: AtomicU64::new(0),
        }
    }

    /// Notifications that were accepted (not failed).
    pub fn recorded(&self) -> &RecordingListener {
        &self.inner
    }

    /// State updates attempted, failed ones included.
    pub fn state_calls(&self) -> u64 {
        self.state_calls.load(Ordering::SeqCst)
    }
}

impl Listener for FailingListener {
    fn init_object(&self, id: ObjectId, shape: &Shape) -> Result<(), ListenerError> {
        self.inner.init_object(id, shape)
    }

    fn state_update(&self, id: ObjectId, position: Vec3, orientation: Quat) -> Result<(), ListenerError> {
        let n = self.state_calls.fetch_add(1, Ordering::SeqCst) + 1;
        if self.fail_on.contains(&n) {
            return match self.mode {
                FailureMode::Error => Err(format!("injected failure on update {n}").into()),
                FailureMode::Panic => panic!("injected panic on update {n}"),
            };
        }
        self.inner.state_update(id, position, orientation)
    }

    fn meta_update(&self, id: ObjectId, meta: &MetaUpdate) -> Result<(), ListenerError> {
        self.inner.meta_update(id, meta)
    }
}
