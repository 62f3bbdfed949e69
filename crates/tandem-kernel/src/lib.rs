//! A cooperative, single-processor thread kernel and the blocking
//! primitives built on it.
//!
//! Threads are forked onto a [`Kernel`] and run one at a time in FIFO order
//! until they yield, block or finish. An optional timer preempts the running
//! thread while preemption is enabled, which makes races observable while
//! keeping every run reproducible for a given seed.

pub mod error;
pub mod interrupt;
mod machine;
pub mod sync;
pub mod thread;
pub mod time;

pub use error::{KernelError, SyncError};
pub use thread::ThreadHandle;

use crate::machine::Processor;
use crate::time::Clock;
use log::info;
use std::sync::Arc;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KernelConfig {
    /// Preempt the running thread every this many ticks.
    pub timer_interval: Option<u64>,
    /// Randomize the timer period from this seed. Without an interval the
    /// default period is used.
    pub random_seed: Option<u64>,
}

/// Statistics of a run that halted with every thread finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    pub ticks: u64,
    pub threads: usize,
    pub context_switches: u64,
}

pub struct Kernel {
    processor: Arc<Processor>,
}

impl Default for Kernel {
    fn default() -> Self {
        Self::new(KernelConfig::default())
    }
}

impl Kernel {
    pub fn new(config: KernelConfig) -> Self {
        Self {
            processor: Processor::new(Clock::new(config.timer_interval, config.random_seed)),
        }
    }

    /// Creates a thread that will run `entry` once the kernel runs.
    pub fn fork<F>(&self, name: impl Into<String>, entry: F) -> Result<ThreadHandle, KernelError>
    where
        F: FnOnce() + Send + 'static,
    {
        self.processor.fork(name.into(), Box::new(entry))
    }

    /// Runs threads until none is ready.
    ///
    /// Returns [`KernelError::Deadlock`] when threads are still blocked at
    /// that point and [`KernelError::ThreadPanicked`] when a thread panicked.
    /// Threads left blocked by either outcome are never resumed.
    pub fn run(self) -> Result<RunSummary, KernelError> {
        let summary = self.processor.run()?;
        info!(
            "kernel halted: {} threads, {} ticks, {} context switches",
            summary.threads, summary.ticks, summary.context_switches
        );
        Ok(summary)
    }
}

impl Drop for Kernel {
    fn drop(&mut self) {
        self.processor.abandon();
    }
}
