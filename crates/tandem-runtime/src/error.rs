use tandem_kernel::KernelError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("invalid request '{0}': expected FROM:TO")]
    InvalidRequest(String),

    #[error("request from floor {from} to floor {to} is outside floors 1..={floors}")]
    FloorOutOfRange {
        from: usize,
        to: usize,
        floors: usize,
    },

    #[error("kernel error: {0}")]
    Kernel(#[from] KernelError),
}
