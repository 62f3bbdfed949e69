use super::tcb::ThreadHandle;
use std::collections::VecDeque;

/// Policy deciding which ready thread gets the processor next.
///
/// The scheduler only sees handles of ready threads; the thread manager
/// keeps the running thread out of it and requeues it on a yield.
pub trait Scheduler: Send {
    /// Removes and returns the thread to dispatch, if any is ready.
    fn schedule(&mut self) -> Option<ThreadHandle>;

    /// Marks `thread` as ready to run.
    fn enqueue(&mut self, thread: ThreadHandle);

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Dispatches threads in the order they became ready, so a thread that
/// yields runs again only after every other ready thread had a turn.
#[derive(Default)]
pub struct RoundRobinScheduler {
    queue: VecDeque<ThreadHandle>,
}

impl RoundRobinScheduler {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Scheduler for RoundRobinScheduler {
    fn schedule(&mut self) -> Option<ThreadHandle> {
        self.queue.pop_front()
    }

    fn enqueue(&mut self, thread: ThreadHandle) {
        debug_assert!(!self.queue.contains(&thread), "{thread} enqueued twice");
        self.queue.push_back(thread);
    }

    fn len(&self) -> usize {
        self.queue.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn handle(id: u32) -> ThreadHandle {
        ThreadHandle::from_raw(id).unwrap()
    }

    #[test]
    fn schedules_in_arrival_order() {
        let mut scheduler = RoundRobinScheduler::new();
        assert!(scheduler.is_empty());

        for id in 1..=3 {
            scheduler.enqueue(handle(id));
        }
        assert_eq!(scheduler.len(), 3);

        assert_eq!(scheduler.schedule(), Some(handle(1)));
        scheduler.enqueue(handle(1));
        assert_eq!(scheduler.schedule(), Some(handle(2)));
        assert_eq!(scheduler.schedule(), Some(handle(3)));
        assert_eq!(scheduler.schedule(), Some(handle(1)));
        assert_eq!(scheduler.schedule(), None);
    }
}
