//! The simulated processor.
//!
//! Every kernel thread is backed by a host thread, but only the host thread
//! whose handle is `current_thread` is allowed to run; all others are parked
//! on a condition variable until the scheduler hands the processor to them.
//! Context switches therefore happen only at the points where a thread gives
//! the processor away: yields, sleeps, thread exit and timer preemption.

use crate::error::KernelError;
use crate::interrupt::IntLevel;
use crate::thread::ThreadManager;
use crate::time::{Clock, SYSTEM_TICK};
use crate::thread::ThreadHandle;
use crate::RunSummary;
use log::{debug, warn};
use std::any::Any;
use std::cell::RefCell;
use std::panic::{self, AssertUnwindSafe};
use parking_lot::{Condvar, Mutex, MutexGuard};
use std::sync::Arc;
use std::thread::JoinHandle;

pub(crate) type Entry = Box<dyn FnOnce() + Send + 'static>;

pub(crate) enum Halt {
    Finished,
    Deadlock(Vec<String>),
    Panicked { thread: String, message: String },
}

pub(crate) struct Machine {
    pub threads: ThreadManager,
    pub level: IntLevel,
    pub clock: Clock,
    pub yield_on_return: bool,
    pub context_switches: u64,
    pub halt: Option<Halt>,
    pub started: bool,
    pub abandoned: bool,
    pub hosts: Vec<JoinHandle<()>>,
}

pub(crate) struct Processor {
    machine: Mutex<Machine>,
    turn: Condvar,
}

#[derive(Clone)]
pub(crate) struct Context {
    pub processor: Arc<Processor>,
    pub handle: ThreadHandle,
}

thread_local! {
    static CURRENT: RefCell<Option<Context>> = const { RefCell::new(None) };
}

/// The kernel thread running on this host thread.
pub(crate) fn context() -> Context {
    CURRENT
        .with(|current| current.borrow().clone())
        .unwrap_or_else(|| panic!("kernel operation called outside of a kernel thread"))
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

impl Processor {
    pub fn new(clock: Clock) -> Arc<Self> {
        Arc::new(Self {
            machine: Mutex::new(Machine {
                threads: ThreadManager::new(),
                level: IntLevel::Off,
                clock,
                yield_on_return: false,
                context_switches: 0,
                halt: None,
                started: false,
                abandoned: false,
                hosts: Vec::new(),
            }),
            turn: Condvar::new(),
        })
    }

    pub fn machine(&self) -> MutexGuard<'_, Machine> {
        self.machine.lock()
    }

    pub fn fork(self: &Arc<Self>, name: String, entry: Entry) -> Result<ThreadHandle, KernelError> {
        let mut machine = self.machine();
        let handle = machine.threads.allocate_handle();

        let processor = Arc::clone(self);
        let host = std::thread::Builder::new()
            .name(name.clone())
            .spawn(move || processor.host_main(handle, entry))
            .map_err(|source| KernelError::Spawn {
                name: name.clone(),
                source,
            })?;

        debug!("fork: {} {}", name, handle);
        machine.threads.create_thread(handle, name);
        machine.hosts.push(host);
        Ok(handle)
    }

    /// Body of every host thread: wait for the first dispatch, run the entry
    /// point, then hand the processor to the next ready thread.
    fn host_main(self: Arc<Self>, handle: ThreadHandle, entry: Entry) {
        CURRENT.with(|current| {
            *current.borrow_mut() = Some(Context {
                processor: Arc::clone(&self),
                handle,
            })
        });

        {
            let mut machine = self.machine();
            loop {
                if machine.threads.current_thread == Some(handle) {
                    break;
                }
                if machine.abandoned || machine.halt.is_some() {
                    return;
                }
                self.turn.wait(&mut machine);
            }
            // New threads start with preemption enabled.
            machine.level = IntLevel::On;
        }

        let outcome = panic::catch_unwind(AssertUnwindSafe(entry));

        let mut machine = self.machine();
        match outcome {
            Ok(()) => {
                debug!("exit: {}", machine.threads.current_label());
                machine.level = IntLevel::Off;
                machine.threads.exit_current_thread();
                if machine.threads.switch_to_next() {
                    machine.context_switches += 1;
                } else {
                    Self::halt_idle(&mut machine);
                }
            }
            Err(payload) => {
                let thread = machine.threads.current_label();
                let message = panic_message(payload.as_ref());
                warn!("thread '{}' panicked: {}", thread, message);
                machine.halt = Some(Halt::Panicked { thread, message });
            }
        }
        drop(machine);
        self.turn.notify_all();
    }

    fn halt_idle(machine: &mut Machine) {
        let blocked = machine.threads.blocked_labels();
        if blocked.is_empty() {
            debug!("all threads finished");
            machine.halt = Some(Halt::Finished);
        } else {
            warn!(
                "no runnable thread, {} blocked: {}",
                blocked.len(),
                blocked.join(", ")
            );
            machine.halt = Some(Halt::Deadlock(blocked));
        }
    }

    /// Dispatches the first ready thread and waits until the machine halts.
    pub fn run(&self) -> Result<RunSummary, KernelError> {
        let mut machine = self.machine();
        machine.started = true;

        if machine.threads.switch_to_next() {
            self.turn.notify_all();
            while machine.halt.is_none() {
                self.turn.wait(&mut machine);
            }
        } else {
            machine.halt = Some(Halt::Finished);
        }

        let summary = RunSummary {
            ticks: machine.clock.now().ticks(),
            threads: machine.threads.threads.len(),
            context_switches: machine.context_switches,
        };
        let halt = machine.halt.take();
        let hosts = std::mem::take(&mut machine.hosts);
        drop(machine);

        match halt {
            Some(Halt::Deadlock(blocked)) => Err(KernelError::Deadlock {
                blocked,
                ticks: summary.ticks,
            }),
            Some(Halt::Panicked { thread, message }) => {
                Err(KernelError::ThreadPanicked { thread, message })
            }
            Some(Halt::Finished) | None => {
                for host in hosts {
                    // Entry panics are caught inside the host thread.
                    let _ = host.join();
                }
                Ok(summary)
            }
        }
    }

    /// Releases host threads that were forked but never dispatched.
    pub fn abandon(&self) {
        let mut machine = self.machine();
        if !machine.started {
            machine.abandoned = true;
            drop(machine);
            self.turn.notify_all();
        }
    }

    /// Gives up the processor until `me` is scheduled again.
    fn park(&self, machine: &mut MutexGuard<'_, Machine>, me: ThreadHandle) {
        if machine.threads.current_thread == Some(me) {
            return;
        }

        machine.context_switches += 1;
        self.turn.notify_all();
        while machine.threads.current_thread != Some(me) {
            self.turn.wait(machine);
        }
    }

    pub fn yield_current(&self, me: ThreadHandle) {
        let mut machine = self.machine();
        machine.threads.yield_thread();
        self.park(&mut machine, me);
    }

    pub fn sleep_current(&self, me: ThreadHandle) {
        let mut machine = self.machine();
        if machine.level != IntLevel::Off {
            drop(machine);
            panic!("thread {} tried to sleep with preemption enabled", me);
        }

        machine.threads.block_current_thread();
        if !machine.threads.switch_to_next() {
            Self::halt_idle(&mut machine);
            self.turn.notify_all();
        }
        self.park(&mut machine, me);
    }

    pub fn ready(&self, handle: ThreadHandle) {
        let mut machine = self.machine();
        if machine.level != IntLevel::Off {
            drop(machine);
            panic!("thread {} made ready with preemption enabled", handle);
        }
        machine.threads.wake_thread(handle);
    }

    pub fn level(&self) -> IntLevel {
        self.machine().level
    }

    /// Switches the preemption level, charging a system tick when preemption
    /// comes back on. A timer that expired meanwhile preempts the caller.
    pub fn set_level(&self, me: ThreadHandle, level: IntLevel) -> IntLevel {
        let mut machine = self.machine();
        let previous = std::mem::replace(&mut machine.level, level);
        if previous == IntLevel::Off
            && level == IntLevel::On
            && Self::tick(&mut machine, SYSTEM_TICK)
        {
            self.preempt(machine, me);
        }
        previous
    }

    /// Restores a level without advancing time, for use while unwinding.
    pub fn restore_level(&self, level: IntLevel) {
        self.machine().level = level;
    }

    pub fn advance(&self, me: ThreadHandle, ticks: u64) {
        let mut machine = self.machine();
        if Self::tick(&mut machine, ticks) {
            self.preempt(machine, me);
        }
    }

    /// Charges `ticks` to the clock; true if the caller must yield now.
    fn tick(machine: &mut Machine, ticks: u64) -> bool {
        if machine.clock.advance(ticks) {
            machine.yield_on_return = true;
        }

        if machine.level == IntLevel::On && machine.yield_on_return {
            machine.yield_on_return = false;
            true
        } else {
            false
        }
    }

    fn preempt(&self, mut machine: MutexGuard<'_, Machine>, me: ThreadHandle) {
        debug!("timer preempts {}", me);
        machine.level = IntLevel::Off;
        machine.threads.yield_thread();
        self.park(&mut machine, me);
        machine.level = IntLevel::On;
    }
}
