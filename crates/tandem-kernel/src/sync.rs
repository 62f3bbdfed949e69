//! Blocking synchronization primitives for kernel threads.
//!
//! Everything here is built on [`AtomicitySection`](crate::interrupt::AtomicitySection):
//! check-and-update sequences, including the enqueue that precedes a sleep,
//! run with preemption disabled.
//!
//! - [`Semaphore`]: counting semaphore with a FIFO wait queue.
//! - [`Lock`]: non-reentrant mutual exclusion with holder tracking.
//! - [`Condition`]: Mesa-style condition variable bound to a [`Lock`] per call.
//! - [`Monitor`]: data that is only reachable while its lock is held.

mod condition;
mod lock;
mod monitor;
mod semaphore;
mod spinlock;
mod wait_queue;

pub use condition::Condition;
pub use lock::Lock;
pub use monitor::{Monitor, MonitorGuard};
pub use semaphore::Semaphore;
pub use spinlock::{SpinLock, SpinLockGuard};
pub use wait_queue::WaitQueue;
