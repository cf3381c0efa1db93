//! Oriented FAST keypoint detection, the default [`KeypointDetector`] of the
//! notescan workspace.
//!
//! [`KeypointDetector`]: notescan_core::KeypointDetector

pub mod config;
pub mod detector;
pub mod error;
pub mod refinement;
pub mod types;
pub mod utils;

pub use config::FastConfig;
pub use detector::FastDetector;
pub use error::{FastError, FastResult};
pub use types::ScoredKeypoint;
