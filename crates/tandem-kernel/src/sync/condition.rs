use super::{Lock, WaitQueue};
use crate::error::SyncError;
use crate::interrupt::AtomicitySection;
use crate::thread;
use log::debug;

/// Mesa-style condition variable.
///
/// `signal` and `broadcast` only make waiters ready; a woken thread competes
/// for the lock like any other acquirer, so it must re-check its predicate
/// in a loop once `wait` returns.
pub struct Condition {
    name: String,
    waiters: WaitQueue,
}

impl Condition {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            waiters: WaitQueue::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn waiting(&self) -> usize {
        self.waiters.len()
    }

    /// Releases `lock`, sleeps until signalled and re-acquires `lock`.
    ///
    /// # Panics
    ///
    /// Panics if the calling thread does not hold `lock`.
    pub fn wait(&self, lock: &Lock) {
        if let Err(err) = self.try_wait(lock) {
            panic!("{}", err);
        }
    }

    pub fn try_wait(&self, lock: &Lock) -> Result<(), SyncError> {
        // Enqueue, release and sleep form one step so a signal issued right
        // after the release cannot be lost.
        let _section = AtomicitySection::enter();

        if !lock.is_held_by_current_thread() {
            return Err(SyncError::ProtocolViolation {
                primitive: "condition",
                name: self.name.clone(),
                reason: "wait without holding the associated lock",
            });
        }

        self.waiters.push(thread::current());
        lock.release();
        thread::sleep();
        lock.acquire();
        Ok(())
    }

    /// Wakes the oldest waiter. `lock` should be held by the caller.
    pub fn signal(&self, _lock: &Lock) {
        let _section = AtomicitySection::enter();

        if let Some(woken) = self.waiters.wake_one() {
            debug!("condition '{}': signals {}", self.name, woken);
        }
    }

    /// Wakes every waiter. `lock` should be held by the caller.
    pub fn broadcast(&self, _lock: &Lock) {
        let _section = AtomicitySection::enter();

        let woken = self.waiters.wake_all();
        if woken > 0 {
            debug!("condition '{}': broadcast wakes {}", self.name, woken);
        }
    }
}
