//! Workers incrementing a shared counter with a yield between the read and
//! the write, optionally guarded by a semaphore or a lock.

use crate::RuntimeError;
use log::info;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tandem_kernel::sync::{Lock, Semaphore, SpinLock};
use tandem_kernel::{thread, Kernel};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Guard {
    None,
    #[default]
    Semaphore,
    Lock,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CounterConfig {
    pub threads: usize,
    pub iterations: usize,
    pub guard: Guard,
}

impl Default for CounterConfig {
    fn default() -> Self {
        Self {
            threads: 4,
            iterations: 5,
            guard: Guard::default(),
        }
    }
}

/// A value read by a worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Observation {
    pub worker: usize,
    pub value: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CounterReport {
    pub final_value: usize,
    pub expected: usize,
    /// Values read inside the increment loop, in execution order.
    pub observations: Vec<Observation>,
    /// Values each worker saw once done, after the barrier when guarded.
    pub finals: Vec<Observation>,
    pub ticks: u64,
}

impl CounterReport {
    pub fn lost_updates(&self) -> usize {
        self.expected.saturating_sub(self.final_value)
    }
}

struct Shared {
    // Plain loads and stores only: atomicity comes from the guard, if any.
    counter: AtomicUsize,
    mutex: Semaphore,
    lock: Lock,
    barrier: Semaphore,
    expected: usize,
    observations: SpinLock<Vec<Observation>>,
    finals: SpinLock<Vec<Observation>>,
}

impl Shared {
    fn enter(&self, guard: Guard) {
        match guard {
            Guard::None => {}
            Guard::Semaphore => self.mutex.p(),
            Guard::Lock => self.lock.acquire(),
        }
    }

    fn leave(&self, guard: Guard) {
        match guard {
            Guard::None => {}
            Guard::Semaphore => self.mutex.v(),
            Guard::Lock => self.lock.release(),
        }
    }
}

fn worker(shared: &Shared, id: usize, iterations: usize, guard: Guard) {
    for _ in 0..iterations {
        shared.enter(guard);
        let value = shared.counter.load(Ordering::Relaxed);
        info!("*** thread {id} sees value {value}");
        shared.observations.lock().push(Observation { worker: id, value });
        thread::yield_now();
        shared.counter.store(value + 1, Ordering::Relaxed);
        shared.leave(guard);
        thread::yield_now();
    }

    if guard != Guard::None {
        if shared.counter.load(Ordering::Relaxed) == shared.expected {
            shared.barrier.v();
        }
        shared.barrier.p();
        shared.barrier.v();
    }

    let value = shared.counter.load(Ordering::Relaxed);
    info!("Thread {id} sees final value {value}");
    shared.finals.lock().push(Observation { worker: id, value });
}

pub struct CounterTest {
    config: CounterConfig,
}

impl CounterTest {
    pub fn new(config: CounterConfig) -> Result<Self, RuntimeError> {
        if config.threads == 0 {
            return Err(RuntimeError::InvalidConfig(
                "the counter test needs at least one thread".to_string(),
            ));
        }
        Ok(Self { config })
    }

    pub fn config(&self) -> &CounterConfig {
        &self.config
    }

    pub fn run(self, kernel: Kernel) -> Result<CounterReport, RuntimeError> {
        let CounterConfig {
            threads,
            iterations,
            guard,
        } = self.config;
        let shared = Arc::new(Shared {
            counter: AtomicUsize::new(0),
            mutex: Semaphore::new("counter mutex", 1),
            lock: Lock::new("counter lock"),
            barrier: Semaphore::new("barrier", 0),
            expected: threads * iterations,
            observations: SpinLock::new(Vec::new()),
            finals: SpinLock::new(Vec::new()),
        });

        for id in 0..threads {
            let shared = Arc::clone(&shared);
            kernel.fork(format!("worker {id}"), move || {
                worker(&shared, id, iterations, guard)
            })?;
        }

        let summary = kernel.run()?;
        let final_value = shared.counter.load(Ordering::Relaxed);
        info!("counter finished at {final_value} of {}", shared.expected);

        let observations = shared.observations.lock().clone();
        let finals = shared.finals.lock().clone();
        Ok(CounterReport {
            final_value,
            expected: shared.expected,
            observations,
            finals,
            ticks: summary.ticks,
        })
    }
}
