use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("missing {0} capability")]
    MissingCapability(&'static str),

    #[error("keypoint/descriptor count mismatch: {keypoints} keypoints, {descriptors} descriptors")]
    FeatureMismatch { keypoints: usize, descriptors: usize },

    #[error("image has no pixels ({width}x{height})")]
    EmptyImage { width: u32, height: u32 },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("{stage} failed: {message}")]
    Capability { stage: &'static str, message: String },
}

pub type Result<T> = std::result::Result<T, Error>;
