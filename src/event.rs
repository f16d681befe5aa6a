use parking_lot::{Condvar, Mutex};
use std::time::{Duration, Instant};

/// Manually signalled flag that stays set once raised.
#[derive(Debug, Default)]
pub struct Event {
    set: Mutex<bool>,
    cond: Condvar,
}

impl Event {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self) {
        let mut set = self.set.lock();
        *set = true;
        self.cond.notify_all();
    }

    pub fn is_set(&self) -> bool {
        *self.set.lock()
    }

    pub fn wait(&self) {
        let mut set = self.set.lock();
        while !*set {
            self.cond.wait(&mut set);
        }
    }

    /// Returns `true` if the event was raised before `timeout` elapsed.
    pub fn wait_for(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut set = self.set.lock();
        while !*set {
            if self.cond.wait_until(&mut set, deadline).timed_out() {
                break;
            }
        }
        *set
    }
}
