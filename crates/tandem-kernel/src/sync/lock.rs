use super::{Semaphore, SpinLock};
use crate::error::SyncError;
use crate::interrupt::AtomicitySection;
use crate::thread;
use crate::thread::ThreadHandle;

/// Non-reentrant mutual exclusion lock.
///
/// Built from a binary semaphore plus the handle of the holder. Acquirers
/// are served in FIFO order. Only the holder may release; a holder that
/// acquires again blocks forever.
pub struct Lock {
    name: String,
    semaphore: Semaphore,
    holder: SpinLock<Option<ThreadHandle>>,
}

impl Lock {
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            semaphore: Semaphore::new(name.clone(), 1),
            name,
            holder: SpinLock::new(None),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn holder(&self) -> Option<ThreadHandle> {
        *self.holder.lock()
    }

    pub fn acquire(&self) {
        let _section = AtomicitySection::enter();

        self.semaphore.p();
        *self.holder.lock() = Some(thread::current());
    }

    /// Releases the lock.
    ///
    /// # Panics
    ///
    /// Panics if the calling thread does not hold the lock.
    pub fn release(&self) {
        if let Err(err) = self.try_release() {
            panic!("{}", err);
        }
    }

    /// Releases the lock, reporting a caller that does not hold it instead
    /// of panicking.
    pub fn try_release(&self) -> Result<(), SyncError> {
        let _section = AtomicitySection::enter();

        if !self.is_held_by_current_thread() {
            return Err(SyncError::ProtocolViolation {
                primitive: "lock",
                name: self.name.clone(),
                reason: "released by a thread that does not hold it",
            });
        }

        // The holder is cleared before the next acquirer can run.
        *self.holder.lock() = None;
        self.semaphore.v();
        Ok(())
    }

    pub fn is_held_by_current_thread(&self) -> bool {
        *self.holder.lock() == Some(thread::current())
    }
}
