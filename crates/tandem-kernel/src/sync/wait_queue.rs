use super::SpinLock;
use crate::thread;
use crate::thread::ThreadHandle;
use std::collections::VecDeque;

/// Threads blocked on a primitive, woken oldest first.
///
/// Callers mutate the queue with preemption disabled; the queue itself only
/// stores handles and asks the kernel to make them ready.
#[derive(Default)]
pub struct WaitQueue {
    waiters: SpinLock<VecDeque<ThreadHandle>>,
}

impl WaitQueue {
    pub const fn new() -> Self {
        Self {
            waiters: SpinLock::new(VecDeque::new()),
        }
    }

    pub fn push(&self, handle: ThreadHandle) {
        self.waiters.lock().push_back(handle);
    }

    pub fn pop(&self) -> Option<ThreadHandle> {
        self.waiters.lock().pop_front()
    }

    /// Makes the oldest waiter ready.
    pub fn wake_one(&self) -> Option<ThreadHandle> {
        let next = self.pop();
        if let Some(handle) = next {
            thread::ready(handle);
        }
        next
    }

    /// Makes every waiter ready, oldest first. Returns how many were woken.
    pub fn wake_all(&self) -> usize {
        let mut woken = 0;
        while self.wake_one().is_some() {
            woken += 1;
        }
        woken
    }

    pub fn len(&self) -> usize {
        self.waiters.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.waiters.lock().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pops_in_insertion_order() {
        let queue = WaitQueue::new();
        assert!(queue.is_empty());

        for id in [3, 1, 2] {
            queue.push(ThreadHandle::from_raw(id).unwrap());
        }
        assert_eq!(queue.len(), 3);

        let order: Vec<u32> = std::iter::from_fn(|| queue.pop())
            .map(|handle| handle.id())
            .collect();
        assert_eq!(order, [3, 1, 2]);
        assert!(queue.is_empty());
    }
}
