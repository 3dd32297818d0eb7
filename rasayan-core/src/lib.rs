pub mod directory;
pub mod payment;

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Validation failed: {0}")]
    ValidationError(String),
    #[error("Internal service error: {0}")]
    InternalError(String),
    #[error("Unknown payee account: {0}")]
    UnknownPayee(String),
}

pub type CoreResult<T> = Result<T, CoreError>;
