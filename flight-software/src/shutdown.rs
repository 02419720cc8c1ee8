//! Cooperative shutdown and readiness signalling between periodic tasks.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex};

/// Process-wide cancellation flag.
///
/// Handed to every periodic task at construction and polled once per loop
/// iteration. On observing it, a task finalizes (flushes its log, zeroes
/// actuator outputs) and returns; there is no forced preemption.
#[derive(Debug, Clone, Default)]
pub struct ShutdownToken {
    flag: Arc<AtomicBool>,
}

impl ShutdownToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request shutdown. Idempotent; callable from any task.
    pub fn request(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    /// True once shutdown has been requested.
    pub fn is_requested(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

/// One-shot readiness gate.
///
/// Replaces busy-wait polling for cross-task startup ordering: the control
/// task blocks in [`wait`] until the sensor task has published its first
/// estimate and calls [`signal`].
///
/// [`wait`]: Readiness::wait
/// [`signal`]: Readiness::signal
#[derive(Debug, Clone, Default)]
pub struct Readiness {
    inner: Arc<(Mutex<bool>, Condvar)>,
}

impl Readiness {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark ready and wake all waiters. Idempotent.
    pub fn signal(&self) {
        let (lock, cvar) = &*self.inner;
        let mut ready = lock.lock().unwrap();
        *ready = true;
        cvar.notify_all();
    }

    /// Block until [`signal`] has been called.
    ///
    /// [`signal`]: Readiness::signal
    pub fn wait(&self) {
        let (lock, cvar) = &*self.inner;
        let mut ready = lock.lock().unwrap();
        while !*ready {
            ready = cvar.wait(ready).unwrap();
        }
    }
}
