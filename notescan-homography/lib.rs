//! Homography estimation for the notescan workspace: Hartley-normalised DLT
//! wrapped in a seeded RANSAC loop, exposed as the default
//! [`HomographyEstimator`](notescan_core::HomographyEstimator).

pub mod dlt;
pub mod ransac;

pub use dlt::{estimate_homography_dlt, project, reprojection_error, HomographyError};
pub use ransac::{RansacConfig, RansacEstimator};
