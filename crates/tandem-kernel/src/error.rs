use thiserror::Error;

#[derive(Debug, Error)]
pub enum KernelError {
    #[error("deadlock after {ticks} ticks: no runnable thread, blocked: {}", .blocked.join(", "))]
    Deadlock { blocked: Vec<String>, ticks: u64 },

    #[error("thread '{thread}' panicked: {message}")]
    ThreadPanicked { thread: String, message: String },

    #[error("failed to spawn host thread for '{name}': {source}")]
    Spawn {
        name: String,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SyncError {
    #[error("protocol violation on {primitive} '{name}': {reason}")]
    ProtocolViolation {
        primitive: &'static str,
        name: String,
        reason: &'static str,
    },
}
