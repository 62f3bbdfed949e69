use super::{Condition, Lock, SpinLock, SpinLockGuard};
use core::ops::{Deref, DerefMut};

/// Shared state that can only be reached while its lock is held.
///
/// A monitor pairs a [`Lock`] and a [`Condition`] with the data they protect.
/// [`Monitor::lock`] acquires the lock and returns a guard that dereferences
/// to the data; the guard releases the lock when dropped.
///
/// ```ignore
/// let mut state = monitor.lock();
/// state.wait_while(|s| s.items == 0);
/// state.items -= 1;
/// state.broadcast();
/// ```
pub struct Monitor<T> {
    lock: Lock,
    condition: Condition,
    data: SpinLock<T>,
}

impl<T> Monitor<T> {
    pub fn new(name: &str, data: T) -> Self {
        Self {
            lock: Lock::new(format!("{name} lock")),
            condition: Condition::new(format!("{name} condition")),
            data: SpinLock::new(data),
        }
    }

    pub fn lock(&self) -> MonitorGuard<'_, T> {
        self.lock.acquire();
        MonitorGuard {
            monitor: self,
            data: Some(self.data.lock()),
        }
    }

    /// Reads the data without the kernel lock.
    ///
    /// Only meaningful once no kernel thread can touch the monitor anymore,
    /// typically after [`Kernel::run`](crate::Kernel::run) returned.
    pub fn inspect<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.data.lock())
    }
}

pub struct MonitorGuard<'a, T> {
    monitor: &'a Monitor<T>,
    data: Option<SpinLockGuard<'a, T>>,
}

impl<T> MonitorGuard<'_, T> {
    /// Waits on the monitor's condition. The data is unreachable while the
    /// thread sleeps and may have changed when this returns.
    pub fn wait(&mut self) {
        self.data = None;
        self.monitor.condition.wait(&self.monitor.lock);
        self.data = Some(self.monitor.data.lock());
    }

    /// Waits until `blocked` returns false.
    pub fn wait_while(&mut self, mut blocked: impl FnMut(&T) -> bool) {
        while blocked(&**self) {
            self.wait();
        }
    }

    pub fn signal(&self) {
        self.monitor.condition.signal(&self.monitor.lock);
    }

    pub fn broadcast(&self) {
        self.monitor.condition.broadcast(&self.monitor.lock);
    }
}

impl<T> Deref for MonitorGuard<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        self.data.as_deref().expect("monitor data is held outside wait")
    }
}

impl<T> DerefMut for MonitorGuard<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        self.data
            .as_deref_mut()
            .expect("monitor data is held outside wait")
    }
}

impl<T> Drop for MonitorGuard<'_, T> {
    fn drop(&mut self) {
        self.data = None;
        self.monitor.lock.release();
    }
}
