use thiserror::Error;

#[derive(Debug, Error)]
pub enum DomainError {
    #[error("unknown meter: {0}")]
    UnknownMeter(String),
    #[error("validation failed: {0}")]
    Validation(String),
    #[error("serialization error: {0}")]
    Serialization(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl DomainError {
    pub fn validation<T: Into<String>>(message: T) -> Self {
        Self::Validation(message.into())
    }
}
