//! The user-facing [`MotionRecorder`] and its shutdown sequence.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};
use kairos_core::{ListenerId, ObjectId, Quat, Vec3};
use tracing::{debug, warn};

use crate::config::RecorderConfig;
use crate::delivery::{lock, DeliveryLoop, Shared};
use crate::error::RecorderError;
use crate::listener::Listener;
use crate::metrics::{Counters, RecorderMetrics};
use crate::update::{MetaUpdate, Shape, Update};

// ── ShutdownReport ──────────────────────────────────────────────

/// Outcome of [`MotionRecorder::shutdown`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ShutdownReport {
    /// Whether the delivery thread stopped within the join timeout.
    /// `false` means it was detached, most likely inside a slow
    /// listener call.
    pub joined: bool,
    /// Updates that were still queued and were dropped.
    pub discarded: u64,
    /// Wall-clock time the shutdown took.
    pub elapsed: Duration,
}

struct Worker {
    handle: JoinHandle<()>,
    done: Receiver<()>,
}

// ── MotionRecorder ──────────────────────────────────────────────

/// Ordered fan-out of object state from the simulation to observers.
///
/// Producers call [`update_state`](Self::update_state) and
/// [`update_metadata`](Self::update_metadata), which only enqueue. A
/// dedicated delivery thread pops updates in FIFO order and notifies
/// every registered [`Listener`]. [`init_object`](Self::init_object) is
/// the one blocking call: it describes an object to every listener
/// before returning, under the same lock the delivery thread uses, so
/// no listener ever sees an update for an object it has not been told
/// about.
///
/// Listener registration methods must not be called from inside a
/// listener callback.
pub struct MotionRecorder {
    shared: Arc<Shared>,
    tx: Sender<Update>,
    /// Kept to count and drop leftovers on shutdown.
    rx: Receiver<Update>,
    next_listener: AtomicU64,
    worker: Mutex<Option<Worker>>,
    config: RecorderConfig,
}

impl MotionRecorder {
    /// Validate `config` and start the delivery thread.
    pub fn new(config: RecorderConfig) -> Result<Self, RecorderError> {
        config.validate()?;

        let (tx, rx) = crossbeam_channel::unbounded();
        let (done_tx, done_rx) = crossbeam_channel::bounded(1);
        let shared = Arc::new(Shared::new());

        let delivery = DeliveryLoop {
            shared: Arc::clone(&shared),
            rx: rx.clone(),
            done: done_tx,
            poll_interval: config.poll_interval,
        };
        let handle = thread::Builder::new()
            .name(config.thread_name.clone())
            .spawn(move || delivery.run())
            .map_err(RecorderError::Spawn)?;
        debug!(thread = %config.thread_name, "motion recorder started");

        Ok(Self {
            shared,
            tx,
            rx,
            next_listener: AtomicU64::new(1),
            worker: Mutex::new(Some(Worker {
                handle,
                done: done_rx,
            })),
            config,
        })
    }

    /// A recorder with [`RecorderConfig::default`].
    pub fn with_defaults() -> Result<Self, RecorderError> {
        Self::new(RecorderConfig::default())
    }

    /// The active configuration.
    pub fn config(&self) -> &RecorderConfig {
        &self.config
    }

    /// Whether [`shutdown`](Self::shutdown) has run.
    pub fn is_shut_down(&self) -> bool {
        self.shared.is_shut_down()
    }

    // ── listeners ───────────────────────────────────────────────

    /// Register a listener.
    ///
    /// Objects initialized before this call are replayed to the new
    /// listener through `init_object` before it can see any update.
    pub fn add_listener(&self, listener: Arc<dyn Listener>) -> Result<ListenerId, RecorderError> {
        if self.is_shut_down() {
            return Err(RecorderError::ShutDown);
        }
        let id = ListenerId(self.next_listener.fetch_add(1, Ordering::Relaxed));

        let _serial = lock(&self.shared.delivery_lock);
        for (object, shape) in self.shared.objects().iter() {
            self.shared
                .notify(id, "init_object", || listener.init_object(*object, shape));
        }
        let mut set = lock(&self.shared.listeners);
        let mut next = Vec::with_capacity(set.len() + 1);
        next.extend(set.iter().cloned());
        next.push((id, listener));
        *set = Arc::new(next);
        debug!(listener = %id, "listener added");
        Ok(id)
    }

    /// Unregister a listener. Returns `false` if it was not registered.
    ///
    /// A delivery already in flight may still reach it once.
    pub fn remove_listener(&self, id: ListenerId) -> bool {
        let mut set = lock(&self.shared.listeners);
        if !set.iter().any(|(l, _)| *l == id) {
            return false;
        }
        let next: Vec<_> = set.iter().filter(|(l, _)| *l != id).cloned().collect();
        *set = Arc::new(next);
        debug!(listener = %id, "listener removed");
        true
    }

    /// Number of registered listeners.
    pub fn listener_count(&self) -> usize {
        lock(&self.shared.listeners).len()
    }

    // ── producers ───────────────────────────────────────────────

    /// Describe a new object to every listener. Blocks until all have
    /// been called.
    pub fn init_object(&self, id: ObjectId, shape: Shape) -> Result<(), RecorderError> {
        if self.is_shut_down() {
            return Err(RecorderError::ShutDown);
        }
        let _serial = lock(&self.shared.delivery_lock);
        {
            let mut objects = self.shared.objects_mut();
            if objects.contains_key(&id) {
                return Err(RecorderError::AlreadyInitialized { id });
            }
            objects.insert(id, shape.clone());
        }
        for (listener_id, listener) in self.shared.snapshot().iter() {
            self.shared
                .notify(*listener_id, "init_object", || listener.init_object(id, &shape));
        }
        Counters::bump(&self.shared.counters.objects_initialized);
        Ok(())
    }

    /// Queue a pose update. Never blocks on listeners.
    pub fn update_state(&self, id: ObjectId, position: Vec3, orientation: Quat) -> Result<(), RecorderError> {
        self.enqueue(Update::State {
            id,
            position,
            orientation,
        })
    }

    /// Queue a presentation update. Never blocks on listeners.
    pub fn update_metadata(&self, id: ObjectId, meta: MetaUpdate) -> Result<(), RecorderError> {
        self.enqueue(Update::Meta { id, meta })
    }

    /// Forget an object. Updates for it still queued are skipped, and
    /// the id may be initialized again. Returns `false` if unknown.
    pub fn remove_object(&self, id: ObjectId) -> bool {
        let _serial = lock(&self.shared.delivery_lock);
        self.shared.objects_mut().shift_remove(&id).is_some()
    }

    /// Whether `id` has been initialized and not removed.
    pub fn is_initialized(&self, id: ObjectId) -> bool {
        self.shared.objects().contains_key(&id)
    }

    /// Number of initialized objects.
    pub fn object_count(&self) -> usize {
        self.shared.objects().len()
    }

    fn enqueue(&self, update: Update) -> Result<(), RecorderError> {
        if self.is_shut_down() {
            return Err(RecorderError::ShutDown);
        }
        let id = update.id();
        if !self.is_initialized(id) {
            return Err(RecorderError::NotInitialized { id });
        }
        Counters::bump(&self.shared.counters.enqueued);
        self.tx.send(update).map_err(|_| RecorderError::ShutDown)?;
        // Shutdown may have drained the queue between the check above and
        // the send; account for whatever landed after it.
        if self.is_shut_down() {
            self.discard_queued();
            return Err(RecorderError::ShutDown);
        }
        Ok(())
    }

    /// Drop everything still queued and count it as discarded.
    fn discard_queued(&self) -> u64 {
        let mut discarded = 0;
        while self.rx.try_recv().is_ok() {
            discarded += 1;
        }
        self.shared
            .counters
            .discarded
            .fetch_add(discarded, Ordering::Relaxed);
        discarded
    }

    // ── observation ─────────────────────────────────────────────

    /// Current counters.
    pub fn metrics(&self) -> RecorderMetrics {
        self.shared.counters.snapshot()
    }

    /// Updates waiting for the delivery thread.
    pub fn queue_len(&self) -> usize {
        self.rx.len()
    }

    /// Block until every update enqueued so far has been taken off the
    /// queue, or `timeout` elapses. Returns whether the queue drained.
    pub fn wait_idle(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        loop {
            let m = self.metrics();
            if m.delivered + m.discarded >= m.enqueued {
                return true;
            }
            if self.is_shut_down() || Instant::now() >= deadline {
                return false;
            }
            thread::sleep(Duration::from_millis(1));
        }
    }

    // ── shutdown ────────────────────────────────────────────────

    /// Stop the delivery thread and clear listeners.
    ///
    /// Queued updates are discarded. Waits at most
    /// [`join_timeout`](RecorderConfig::join_timeout) for the delivery
    /// thread; a thread stuck in a listener call is detached. Calling
    /// this again is a no-op.
    pub fn shutdown(&self) -> ShutdownReport {
        let start = Instant::now();
        if self.shared.shutdown.swap(true, Ordering::SeqCst) {
            return ShutdownReport {
                joined: true,
                discarded: 0,
                elapsed: Duration::ZERO,
            };
        }

        *lock(&self.shared.listeners) = Arc::new(Vec::new());

        let joined = match lock(&self.worker).take() {
            Some(worker) => match worker.done.recv_timeout(self.config.join_timeout) {
                Ok(()) | Err(RecvTimeoutError::Disconnected) => worker.handle.join().is_ok(),
                Err(RecvTimeoutError::Timeout) => {
                    warn!(
                        thread = %self.config.thread_name,
                        timeout_ms = self.config.join_timeout.as_millis() as u64,
                        "delivery thread did not stop in time; detaching"
                    );
                    false
                }
            },
            None => true,
        };

        let discarded = self.discard_queued();

        let report = ShutdownReport {
            joined,
            discarded,
            elapsed: start.elapsed(),
        };
        debug!(joined, discarded, "motion recorder shut down");
        report
    }
}

impl Drop for MotionRecorder {
    fn drop(&mut self) {
        if !self.is_shut_down() {
            self.shutdown();
        }
    }
}

// Compile-time assertion: producers share the recorder across threads.
const _: fn() = || {
    fn assert<T: Send + Sync>() {}
    assert::<MotionRecorder>();
};
