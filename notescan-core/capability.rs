//! Vision primitives the detection core consumes.
//!
//! The core never depends on a concrete detector, extractor, matcher or
//! estimator. Implementations must be shareable across threads so one
//! template library can serve several scans at once.

use crate::{Descriptor, FeatureSet, GrayImage, HomographyFit, Keypoint, Match, PointPair, Result};

/// Finds distinctive locations in an image
pub trait KeypointDetector: Send + Sync {
    fn detect(&self, img: &GrayImage) -> Result<Vec<Keypoint>>;
}

/// Computes one descriptor per keypoint.
///
/// An extractor may drop keypoints it cannot describe (too close to the
/// border, for instance); the returned set holds only the keypoints that
/// received a descriptor.
pub trait DescriptorExtractor: Send + Sync {
    fn extract(&self, img: &GrayImage, keypoints: &[Keypoint]) -> Result<FeatureSet>;
}

/// Nearest-neighbour descriptor matching.
///
/// Returns exactly one correspondence per query descriptor when `train` is
/// non-empty, pointing at the closest train descriptor.
pub trait DescriptorMatcher: Send + Sync {
    fn best_matches(&self, query: &[Descriptor], train: &[Descriptor]) -> Vec<Match>;
}

/// Outlier-robust homography fitting over point correspondences
pub trait HomographyEstimator: Send + Sync {
    /// Returns `None` when no transform could be fitted.
    fn estimate(&self, pairs: &[PointPair]) -> Option<HomographyFit>;
}

impl<T: KeypointDetector + ?Sized> KeypointDetector for Box<T> {
    fn detect(&self, img: &GrayImage) -> Result<Vec<Keypoint>> {
        (**self).detect(img)
    }
}

impl<T: DescriptorExtractor + ?Sized> DescriptorExtractor for Box<T> {
    fn extract(&self, img: &GrayImage, keypoints: &[Keypoint]) -> Result<FeatureSet> {
        (**self).extract(img, keypoints)
    }
}

impl<T: DescriptorMatcher + ?Sized> DescriptorMatcher for Box<T> {
    fn best_matches(&self, query: &[Descriptor], train: &[Descriptor]) -> Vec<Match> {
        (**self).best_matches(query, train)
    }
}

impl<T: HomographyEstimator + ?Sized> HomographyEstimator for Box<T> {
    fn estimate(&self, pairs: &[PointPair]) -> Option<HomographyFit> {
        (**self).estimate(pairs)
    }
}
