//! State shared between producers and the delivery thread, and the
//! delivery thread's main loop.
//!
//! The loop blocks on the update queue with a timeout so it can notice
//! the shutdown flag without being woken. Each popped update is fanned
//! out under the delivery lock to a snapshot of the listener set.
//! Every listener call is isolated: an error is logged at `warn`, a
//! panic is caught and logged at `error`, and delivery moves on to the
//! next listener.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};
use indexmap::IndexMap;
use kairos_core::{ListenerId, ObjectId};
use tracing::{error, trace, warn};

use crate::listener::{Listener, ListenerError};
use crate::metrics::Counters;
use crate::update::{Shape, Update};

/// Copy-on-write listener set. Writers swap in a new `Arc`; readers
/// iterate whatever snapshot they cloned.
pub(crate) type ListenerSet = Arc<Vec<(ListenerId, Arc<dyn Listener>)>>;

pub(crate) fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

pub(crate) struct Shared {
    pub(crate) listeners: Mutex<ListenerSet>,
    /// Serializes every call into listeners.
    pub(crate) delivery_lock: Mutex<()>,
    /// Initialized objects. Written only while holding `delivery_lock`.
    pub(crate) objects: RwLock<IndexMap<ObjectId, Shape>>,
    pub(crate) shutdown: AtomicBool,
    pub(crate) counters: Counters,
}

impl Shared {
    pub(crate) fn new() -> Self {
        Self {
            listeners: Mutex::new(Arc::new(Vec::new())),
            delivery_lock: Mutex::new(()),
            objects: RwLock::new(IndexMap::new()),
            shutdown: AtomicBool::new(false),
            counters: Counters::default(),
        }
    }

    pub(crate) fn is_shut_down(&self) -> bool {
        self.shutdown.load(Ordering::SeqCst)
    }

    pub(crate) fn snapshot(&self) -> ListenerSet {
        Arc::clone(&lock(&self.listeners))
    }

    pub(crate) fn objects(&self) -> RwLockReadGuard<'_, IndexMap<ObjectId, Shape>> {
        self.objects.read().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn objects_mut(&self) -> RwLockWriteGuard<'_, IndexMap<ObjectId, Shape>> {
        self.objects.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Fan one update out to the current listeners.
    pub(crate) fn deliver(&self, update: &Update) {
        let _serial = lock(&self.delivery_lock);
        self.fan_out(update);
        // Counted last so `wait_idle` returns only after listeners ran.
        Counters::bump(&self.counters.delivered);
    }

    fn fan_out(&self, update: &Update) {
        let id = update.id();
        if !self.objects().contains_key(&id) {
            trace!(object = %id, "update for removed object skipped");
            return;
        }

        for (listener_id, listener) in self.snapshot().iter() {
            match update {
                Update::State {
                    position,
                    orientation,
                    ..
                } => self.notify(*listener_id, "state_update", || {
                    listener.state_update(id, *position, *orientation)
                }),
                Update::Meta { meta, .. } => {
                    self.notify(*listener_id, "meta_update", || listener.meta_update(id, meta))
                }
            }
        }
    }

    /// Run one listener call, containing its failure.
    pub(crate) fn notify<F>(&self, listener: ListenerId, call: &'static str, f: F)
    where
        F: FnOnce() -> Result<(), ListenerError>,
    {
        match catch_unwind(AssertUnwindSafe(f)) {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                Counters::bump(&self.counters.listener_errors);
                warn!(listener = %listener, call, error = %e, "listener returned an error");
            }
            Err(_) => {
                Counters::bump(&self.counters.listener_panics);
                error!(listener = %listener, call, "listener panicked");
            }
        }
    }
}

/// The delivery thread's state.
pub(crate) struct DeliveryLoop {
    pub(crate) shared: Arc<Shared>,
    pub(crate) rx: Receiver<Update>,
    pub(crate) done: Sender<()>,
    pub(crate) poll_interval: Duration,
}

impl DeliveryLoop {
    /// Runs until the shutdown flag is set or every sender is gone.
    pub(crate) fn run(self) {
        loop {
            if self.shared.is_shut_down() {
                break;
            }
            match self.rx.recv_timeout(self.poll_interval) {
                Ok(update) => {
                    if self.shared.is_shut_down() {
                        Counters::bump(&self.shared.counters.discarded);
                        break;
                    }
                    self.shared.deliver(&update);
                }
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => break,
            }
        }
        trace!("delivery loop stopped");
        // Best-effort: shutdown may already have stopped waiting.
        let _ = self.done.send(());
    }
}
