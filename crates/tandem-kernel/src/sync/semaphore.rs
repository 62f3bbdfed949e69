use super::{SpinLock, WaitQueue};
use crate::interrupt::AtomicitySection;
use crate::thread;
use log::debug;

/// Counting semaphore.
///
/// `p` waits until the value is positive and decrements it; `v` wakes the
/// oldest waiter, if any, and increments the value. A woken thread re-checks
/// the value before consuming it, so a `v` on an idle semaphore simply banks
/// a unit for a future `p`.
///
/// Dropping a semaphore while threads wait on it leaves them blocked forever.
pub struct Semaphore {
    name: String,
    value: SpinLock<u32>,
    waiters: WaitQueue,
}

impl Semaphore {
    pub fn new(name: impl Into<String>, initial: u32) -> Self {
        Self {
            name: name.into(),
            value: SpinLock::new(initial),
            waiters: WaitQueue::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn value(&self) -> u32 {
        *self.value.lock()
    }

    /// Threads currently blocked in `p`.
    pub fn waiting(&self) -> usize {
        self.waiters.len()
    }

    pub fn p(&self) {
        let _section = AtomicitySection::enter();

        loop {
            {
                let mut value = self.value.lock();
                if *value > 0 {
                    *value -= 1;
                    return;
                }
            }

            let me = thread::current();
            debug!("semaphore '{}': {} waits", self.name, me);
            self.waiters.push(me);
            thread::sleep();
        }
    }

    pub fn v(&self) {
        let _section = AtomicitySection::enter();

        if let Some(woken) = self.waiters.wake_one() {
            debug!("semaphore '{}': wakes {}", self.name, woken);
        }
        *self.value.lock() += 1;
    }
}
