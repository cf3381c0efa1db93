//! Shared types for banknote detection: keypoints, descriptors, paired
//! feature sets, geometry and the capability traits the detection core
//! consumes.

pub mod capability;
pub mod config;
pub mod error;
pub mod geometry;

pub use capability::{DescriptorExtractor, DescriptorMatcher, HomographyEstimator, KeypointDetector};
pub use config::ScanConfig;
pub use error::{Error, Result};
pub use geometry::{polygon_contains, Homography, HomographyFit, Point, PointPair, Quad};

/// 8-bit grayscale image, as decoded by the `image` crate
pub type GrayImage = image::GrayImage;

/// Key-point ≙ corner location (subpixel) + orientation (radians)
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Keypoint {
    pub x: f32,
    pub y: f32,
    pub angle: f32,
}

impl Keypoint {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y, angle: 0.0 }
    }

    /// Location of the keypoint in image coordinates
    pub fn point(&self) -> Point {
        Point::new(self.x, self.y)
    }
}

/// 256-bit binary descriptor = 32 bytes
pub type Descriptor = [u8; 32];

/// Nearest-neighbour correspondence between a query (template) descriptor
/// and a train (scene) descriptor.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Match {
    pub query_idx: usize,
    pub train_idx: usize,
    pub distance: f32,
}

impl Match {
    pub fn new(query_idx: usize, train_idx: usize, distance: f32) -> Self {
        Self {
            query_idx,
            train_idx,
            distance,
        }
    }
}

/// Keypoints and their descriptors, one descriptor row per keypoint.
///
/// The two vectors can only be built together and only shrink together,
/// so `keypoints().len() == descriptors().len()` always holds.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeatureSet {
    keypoints: Vec<Keypoint>,
    descriptors: Vec<Descriptor>,
}

impl FeatureSet {
    pub fn new(keypoints: Vec<Keypoint>, descriptors: Vec<Descriptor>) -> Result<Self> {
        if keypoints.len() != descriptors.len() {
            return Err(Error::FeatureMismatch {
                keypoints: keypoints.len(),
                descriptors: descriptors.len(),
            });
        }
        Ok(Self {
            keypoints,
            descriptors,
        })
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.keypoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keypoints.is_empty()
    }

    pub fn keypoints(&self) -> &[Keypoint] {
        &self.keypoints
    }

    pub fn descriptors(&self) -> &[Descriptor] {
        &self.descriptors
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Keypoint, &Descriptor)> {
        self.keypoints.iter().zip(self.descriptors.iter())
    }

    /// Keep only the rows whose keypoint satisfies `keep`, returning how many
    /// rows were dropped. Keypoints and descriptors are filtered together.
    pub fn retain<F>(&mut self, mut keep: F) -> usize
    where
        F: FnMut(&Keypoint) -> bool,
    {
        let before = self.len();
        let (keypoints, descriptors): (Vec<Keypoint>, Vec<Descriptor>) = self
            .keypoints
            .iter()
            .zip(self.descriptors.iter())
            .filter(|(kp, _)| keep(kp))
            .map(|(kp, d)| (*kp, *d))
            .unzip();
        self.keypoints = keypoints;
        self.descriptors = descriptors;
        before - self.len()
    }

    pub fn into_parts(self) -> (Vec<Keypoint>, Vec<Descriptor>) {
        (self.keypoints, self.descriptors)
    }
}
