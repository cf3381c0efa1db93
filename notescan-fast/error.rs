use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum FastError {
    #[error("invalid threshold: {0} (must be 1-127)")]
    InvalidThreshold(u8),

    #[error("invalid arc length: {0} (must be 9-16)")]
    InvalidArcLength(usize),

    #[error("patch size {0} must be odd and at least 3")]
    InvalidPatchSize(usize),
}

pub type FastResult<T> = Result<T, FastError>;

impl From<FastError> for notescan_core::Error {
    fn from(err: FastError) -> Self {
        notescan_core::Error::InvalidConfig(err.to_string())
    }
}
