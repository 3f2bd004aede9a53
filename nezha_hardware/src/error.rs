use thiserror::Error;

#[derive(Debug, Error)]
pub enum HwError {
    #[error("i2c error: {0}")]
    I2c(String),
    #[error("short read: expected {expected} bytes, got {got}")]
    ShortRead { expected: usize, got: usize },
    #[error("short write: expected {expected} bytes, wrote {wrote}")]
    ShortWrite { expected: usize, wrote: usize },
    #[error("malformed frame ({0} bytes)")]
    BadFrame(usize),
    #[error("read without a pending request")]
    NoPendingRequest,
    #[error("injected bus fault")]
    Injected,
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, HwError>;
