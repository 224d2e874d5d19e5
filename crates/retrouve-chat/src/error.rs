use thiserror::Error;

/// Errors produced while assembling views.
#[derive(Error, Debug)]
pub enum AssembleError {
    /// Underlying store failure.
    #[error("Store error: {0}")]
    Store(#[from] retrouve_store::StoreError),
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, AssembleError>;
