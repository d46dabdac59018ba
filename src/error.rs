use thiserror::Error;

#[derive(Debug, Error)]
pub enum SamplingError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("empty range for randrange()")]
    EmptyRange,
    #[error("zero step for randrange()")]
    ZeroStep,
    #[error("cannot choose from an empty sequence")]
    EmptyCollection,
    #[error("hardware entropy unavailable: {0}")]
    HardwareUnavailable(String),
}
