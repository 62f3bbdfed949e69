//! Preemption control.
//!
//! The simulated machine has a single processor, so a region that runs with
//! preemption disabled cannot interleave with any other kernel thread. This
//! is the only atomicity mechanism the synchronization primitives rely on.

use crate::machine::context;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntLevel {
    /// Preemption disabled.
    Off,
    /// Preemption enabled.
    On,
}

/// Current preemption level.
pub fn level() -> IntLevel {
    context().processor.level()
}

/// Sets the preemption level and returns the previous one.
pub fn set_level(level: IntLevel) -> IntLevel {
    let ctx = context();
    ctx.processor.set_level(ctx.handle, level)
}

/// A region that runs with preemption disabled.
///
/// Dropping the section (or calling [`exit`](Self::exit)) restores the level
/// that was in effect on entry, so nested sections leave preemption disabled
/// until the outermost one exits.
#[must_use = "preemption is restored as soon as the section is dropped"]
pub struct AtomicitySection {
    previous: IntLevel,
}

impl AtomicitySection {
    pub fn enter() -> Self {
        Self {
            previous: set_level(IntLevel::Off),
        }
    }

    /// Level that will be restored on exit.
    pub fn previous(&self) -> IntLevel {
        self.previous
    }

    pub fn exit(self) {}
}

impl Drop for AtomicitySection {
    fn drop(&mut self) {
        if std::thread::panicking() {
            context().processor.restore_level(self.previous);
        } else {
            set_level(self.previous);
        }
    }
}
