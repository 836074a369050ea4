use lehra_domain::DomainError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("unknown meter: {0}")]
    UnknownMeter(String),
    #[error("transport could not schedule its timers: {0}")]
    SchedulingFailure(String),
    #[error(transparent)]
    Domain(DomainError),
}

impl From<DomainError> for EngineError {
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::UnknownMeter(id) => EngineError::UnknownMeter(id),
            other => EngineError::Domain(other),
        }
    }
}
