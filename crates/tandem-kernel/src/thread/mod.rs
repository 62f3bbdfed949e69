//! Kernel threads.
//!
//! The free functions in this module act on the kernel thread that calls
//! them; calling them from a host thread that was not forked by a
//! [`Kernel`](crate::Kernel) panics.

pub mod scheduler;
pub mod tcb;

use crate::error::KernelError;
use crate::interrupt::AtomicitySection;
use crate::machine::context;
use crate::time::{SimulatedInstant, USER_TICK};
use scheduler::{RoundRobinScheduler, Scheduler};
use std::collections::HashMap;
pub use tcb::ThreadHandle;
use tcb::{ThreadControlBlock, ThreadState};

pub struct ThreadManager {
    pub threads: HashMap<ThreadHandle, ThreadControlBlock>,
    pub scheduler: Box<dyn Scheduler>,
    pub current_thread: Option<ThreadHandle>,
    pub next_handle: u32,
}

impl Default for ThreadManager {
    fn default() -> Self {
        Self::new()
    }
}

impl ThreadManager {
    pub fn new() -> Self {
        Self {
            threads: HashMap::new(),
            scheduler: Box::new(RoundRobinScheduler::new()),
            current_thread: None,
            next_handle: 1,
        }
    }

    pub fn allocate_handle(&mut self) -> ThreadHandle {
        let handle = ThreadHandle::from_raw(self.next_handle).expect("thread handles start at 1");
        self.next_handle += 1;
        handle
    }

    pub fn create_thread(&mut self, handle: ThreadHandle, name: String) {
        self.threads
            .insert(handle, ThreadControlBlock::new(handle, name));
        self.scheduler.enqueue(handle);
    }

    /// Moves the running thread to the back of the ready queue and picks the
    /// next one, which may be the same thread if nothing else is ready.
    pub fn yield_thread(&mut self) -> bool {
        if let Some(current) = self.current_thread {
            if let Some(tcb) = self.threads.get_mut(&current) {
                // Blocked or terminated threads are not requeued.
                if tcb.state == ThreadState::Running {
                    tcb.state = ThreadState::Ready;
                    self.scheduler.enqueue(current);
                }
            }
        }

        self.switch_to_next()
    }

    /// Pick next thread; returns false when no thread is ready.
    pub fn switch_to_next(&mut self) -> bool {
        match self.scheduler.schedule() {
            Some(next) => {
                self.current_thread = Some(next);
                if let Some(tcb) = self.threads.get_mut(&next) {
                    tcb.state = ThreadState::Running;
                }
                true
            }
            None => {
                self.current_thread = None;
                false
            }
        }
    }

    pub fn exit_current_thread(&mut self) {
        if let Some(current) = self.current_thread {
            if let Some(tcb) = self.threads.get_mut(&current) {
                tcb.state = ThreadState::Terminated;
            }
        }
    }

    pub fn block_current_thread(&mut self) {
        if let Some(current) = self.current_thread {
            if let Some(tcb) = self.threads.get_mut(&current) {
                tcb.state = ThreadState::Blocked;
            }
        }
    }

    pub fn wake_thread(&mut self, handle: ThreadHandle) {
        if let Some(tcb) = self.threads.get_mut(&handle) {
            if tcb.state == ThreadState::Blocked {
                tcb.state = ThreadState::Ready;
                self.scheduler.enqueue(handle);
            }
        }
    }

    pub fn state(&self, handle: ThreadHandle) -> Option<ThreadState> {
        self.threads.get(&handle).map(|tcb| tcb.state)
    }

    pub fn current_label(&self) -> String {
        self.current_thread
            .and_then(|handle| self.threads.get(&handle))
            .map(ThreadControlBlock::label)
            .unwrap_or_else(|| "<idle>".to_string())
    }

    /// Labels of blocked threads, in creation order.
    pub fn blocked_labels(&self) -> Vec<String> {
        let mut blocked: Vec<&ThreadControlBlock> = self
            .threads
            .values()
            .filter(|tcb| tcb.state == ThreadState::Blocked)
            .collect();
        blocked.sort_by_key(|tcb| tcb.handle);
        blocked.into_iter().map(ThreadControlBlock::label).collect()
    }
}

/// Handle of the calling kernel thread.
pub fn current() -> ThreadHandle {
    context().handle
}

/// Creates a new kernel thread that becomes ready behind the threads already
/// waiting to run.
pub fn fork<F>(name: impl Into<String>, entry: F) -> Result<ThreadHandle, KernelError>
where
    F: FnOnce() + Send + 'static,
{
    context().processor.fork(name.into(), Box::new(entry))
}

/// Gives up the processor, staying ready. Returns immediately when no other
/// thread is ready.
pub fn yield_now() {
    let ctx = context();
    let _section = AtomicitySection::enter();
    ctx.processor.yield_current(ctx.handle);
}

/// Blocks the calling thread until some other thread makes it ready.
///
/// Preemption must be disabled, and the caller must already have recorded
/// its handle somewhere a waker will find it.
pub fn sleep() {
    let ctx = context();
    ctx.processor.sleep_current(ctx.handle);
}

/// Moves a blocked thread back to the ready queue. Preemption must be
/// disabled.
pub fn ready(handle: ThreadHandle) {
    context().processor.ready(handle);
}

/// Simulated work: advances the clock by `ticks` user ticks without
/// blocking. With the timer configured the caller may be preempted.
pub fn delay(ticks: u64) {
    let ctx = context();
    for _ in 0..ticks {
        ctx.processor.advance(ctx.handle, USER_TICK);
    }
}

/// Current simulated time.
pub fn now() -> SimulatedInstant {
    context().processor.machine().clock.now()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manager_with(count: u32) -> (ThreadManager, Vec<ThreadHandle>) {
        let mut manager = ThreadManager::new();
        let handles = (0..count)
            .map(|i| {
                let handle = manager.allocate_handle();
                manager.create_thread(handle, format!("t{i}"));
                handle
            })
            .collect();
        (manager, handles)
    }

    #[test]
    fn handles_are_sequential_and_non_zero() {
        let (_, handles) = manager_with(3);
        let ids: Vec<u32> = handles.iter().map(|handle| handle.id()).collect();
        assert_eq!(ids, [1, 2, 3]);
    }

    #[test]
    fn yield_rotates_ready_threads() {
        let (mut manager, handles) = manager_with(2);
        assert!(manager.switch_to_next());
        assert_eq!(manager.current_thread, Some(handles[0]));

        assert!(manager.yield_thread());
        assert_eq!(manager.current_thread, Some(handles[1]));
        assert_eq!(manager.state(handles[0]), Some(ThreadState::Ready));
        assert_eq!(manager.state(handles[1]), Some(ThreadState::Running));

        assert!(manager.yield_thread());
        assert_eq!(manager.current_thread, Some(handles[0]));
    }

    #[test]
    fn lone_thread_yield_keeps_running() {
        let (mut manager, handles) = manager_with(1);
        manager.switch_to_next();
        assert!(manager.yield_thread());
        assert_eq!(manager.current_thread, Some(handles[0]));
    }

    #[test]
    fn blocked_thread_is_skipped_until_woken() {
        let (mut manager, handles) = manager_with(2);
        manager.switch_to_next();

        manager.block_current_thread();
        assert!(manager.switch_to_next());
        assert_eq!(manager.current_thread, Some(handles[1]));
        assert_eq!(manager.blocked_labels(), ["t0 #1"]);

        manager.exit_current_thread();
        assert!(!manager.switch_to_next());
        assert_eq!(manager.current_thread, None);

        manager.wake_thread(handles[0]);
        assert!(manager.blocked_labels().is_empty());
        assert!(manager.switch_to_next());
        assert_eq!(manager.current_thread, Some(handles[0]));
    }

    #[test]
    fn waking_a_ready_thread_does_not_enqueue_it_twice() {
        let (mut manager, handles) = manager_with(2);
        manager.switch_to_next();
        manager.wake_thread(handles[1]);
        assert_eq!(manager.scheduler.len(), 1);
    }
}
