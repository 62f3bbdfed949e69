use core::fmt;
use core::num::NonZeroU32;

/// Identifies a kernel thread for the lifetime of its [`Kernel`](crate::Kernel).
/// Handles are handed out in fork order starting at 1.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct ThreadHandle(NonZeroU32);

impl ThreadHandle {
    pub fn from_raw(id: u32) -> Option<Self> {
        NonZeroU32::new(id).map(Self)
    }

    pub fn id(self) -> u32 {
        self.0.get()
    }
}

impl fmt::Display for ThreadHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThreadState {
    Ready,
    Running,
    Blocked,
    Terminated,
}

pub struct ThreadControlBlock {
    pub handle: ThreadHandle,
    pub name: String,
    pub state: ThreadState,
}

impl ThreadControlBlock {
    pub fn new(handle: ThreadHandle, name: String) -> Self {
        Self {
            handle,
            name,
            state: ThreadState::Ready,
        }
    }

    /// Name plus handle, for diagnostics.
    pub fn label(&self) -> String {
        format!("{} {}", self.name, self.handle)
    }
}
