#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use tandem_kernel::{KernelError, RunSummary};

pub fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Ordered record of what the kernel threads did, shared with the test.
#[derive(Clone, Default)]
pub struct Trace(Arc<Mutex<Vec<String>>>);

impl Trace {
    pub fn push(&self, entry: impl Into<String>) {
        self.0.lock().unwrap().push(entry.into());
    }

    pub fn entries(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }
}

pub fn expect_deadlock(result: Result<RunSummary, KernelError>) -> Vec<String> {
    match result {
        Err(KernelError::Deadlock { blocked, .. }) => blocked,
        other => panic!("expected a deadlock, got {:?}", other),
    }
}

pub fn expect_panic(result: Result<RunSummary, KernelError>) -> (String, String) {
    match result {
        Err(KernelError::ThreadPanicked { thread, message }) => (thread, message),
        other => panic!("expected a thread panic, got {:?}", other),
    }
}
