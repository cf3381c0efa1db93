//! Geometric verification of filtered correspondences.

use std::fmt;

use notescan_core::{FeatureSet, Homography, HomographyEstimator, Match, PointPair, Quad, ScanConfig};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Why a template's scan stopped. These are ordinary outcomes, not errors.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Rejection {
    NoLiveFeatures,
    TooFewCorrespondences { needed: usize, found: usize },
    EstimationFailed,
    InsufficientInliers { needed: usize, found: usize },
    DegenerateProjection,
    InlierOutsideFootprint { x: f32, y: f32 },
    NothingConsumed,
    InstanceLimit { limit: usize },
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rejection::NoLiveFeatures => write!(f, "no live scene features left"),
            Rejection::TooFewCorrespondences { needed, found } => {
                write!(f, "too few good matches ({found} < {needed})")
            }
            Rejection::EstimationFailed => write!(f, "homography estimation failed"),
            Rejection::InsufficientInliers { needed, found } => {
                write!(f, "too few inliers ({found} < {needed})")
            }
            Rejection::DegenerateProjection => write!(f, "template corners project to infinity"),
            Rejection::InlierOutsideFootprint { x, y } => {
                write!(f, "inlier ({x:.1}, {y:.1}) lies outside the projected outline")
            }
            Rejection::NothingConsumed => write!(f, "accepted outline removed no keypoints"),
            Rejection::InstanceLimit { limit } => write!(f, "instance limit of {limit} reached"),
        }
    }
}

/// Accepted detection: projected outline and the correspondences supporting it
#[derive(Debug, Clone, PartialEq)]
pub struct Verified {
    pub quad: Quad,
    pub homography: Homography,
    pub inliers: Vec<PointPair>,
}

/// Turn matches into template/scene point pairs.
///
/// `query_idx` indexes the template features, `train_idx` the scene's live
/// features. Indices out of range are skipped.
pub fn correspondences(template: &FeatureSet, scene: &FeatureSet, matches: &[Match]) -> Vec<PointPair> {
    let (tk, sk) = (template.keypoints(), scene.keypoints());
    matches
        .iter()
        .filter_map(|m| Some(PointPair::new(tk.get(m.query_idx)?.point(), sk.get(m.train_idx)?.point())))
        .collect()
}

/// Fit a homography to `pairs`, project `corners` and check that every inlier
/// lands on or inside the projected outline.
///
/// The inlier count is only checked when `cfg.min_inliers` is non-zero.
pub fn verify<H>(pairs: &[PointPair], corners: &Quad, estimator: &H, cfg: &ScanConfig) -> Result<Verified, Rejection>
where
    H: HomographyEstimator + ?Sized,
{
    if pairs.len() < cfg.min_correspondences {
        return Err(Rejection::TooFewCorrespondences {
            needed: cfg.min_correspondences,
            found: pairs.len(),
        });
    }

    let fit = estimator.estimate(pairs).ok_or(Rejection::EstimationFailed)?;
    if fit.inliers.len() != pairs.len() {
        return Err(Rejection::EstimationFailed);
    }

    let inliers: Vec<PointPair> = pairs
        .iter()
        .zip(&fit.inliers)
        .filter(|(_, &inlier)| inlier)
        .map(|(p, _)| *p)
        .collect();
    if inliers.len() < cfg.min_inliers {
        return Err(Rejection::InsufficientInliers {
            needed: cfg.min_inliers,
            found: inliers.len(),
        });
    }

    let quad = fit
        .homography
        .project_quad(corners)
        .ok_or(Rejection::DegenerateProjection)?;

    if let Some(outside) = inliers.iter().find(|p| !quad.contains(p.scene)) {
        return Err(Rejection::InlierOutsideFootprint {
            x: outside.scene.x,
            y: outside.scene.y,
        });
    }

    Ok(Verified {
        quad,
        homography: fit.homography,
        inliers,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::Matrix3;
    use notescan_core::{HomographyFit, Keypoint, Point};

    /// Returns the same transform for any input, flagging pairs by `mask`
    struct Fixed {
        matrix: Matrix3<f64>,
        mask: Option<Vec<bool>>,
    }

    impl Fixed {
        fn translation(dx: f64, dy: f64) -> Self {
            Self {
                matrix: Matrix3::new(1.0, 0.0, dx, 0.0, 1.0, dy, 0.0, 0.0, 1.0),
                mask: None,
            }
        }
    }

    impl HomographyEstimator for Fixed {
        fn estimate(&self, pairs: &[PointPair]) -> Option<HomographyFit> {
            Some(HomographyFit {
                homography: Homography::new(self.matrix),
                inliers: self.mask.clone().unwrap_or_else(|| vec![true; pairs.len()]),
            })
        }
    }

    struct Failing;

    impl HomographyEstimator for Failing {
        fn estimate(&self, _pairs: &[PointPair]) -> Option<HomographyFit> {
            None
        }
    }

    fn shifted_pairs(points: &[(f32, f32)], dx: f32, dy: f32) -> Vec<PointPair> {
        points
            .iter()
            .map(|&(x, y)| PointPair::new(Point::new(x, y), Point::new(x + dx, y + dy)))
            .collect()
    }

    const CORNERS: [(f32, f32); 5] = [(5.0, 5.0), (35.0, 4.0), (6.0, 25.0), (34.0, 26.0), (20.0, 15.0)];

    fn cfg() -> ScanConfig {
        ScanConfig::default()
    }

    fn outline() -> Quad {
        Quad::from_rect(0.0, 0.0, 40.0, 30.0)
    }

    #[test]
    fn test_accepts_consistent_translation() {
        let pairs = shifted_pairs(&CORNERS, 100.0, 50.0);
        let v = verify(&pairs, &outline(), &Fixed::translation(100.0, 50.0), &cfg()).unwrap();

        assert_eq!(v.quad, Quad::from_rect(100.0, 50.0, 140.0, 80.0));
        assert_eq!(v.inliers.len(), 5);
    }

    #[test]
    fn test_too_few_correspondences() {
        let pairs = shifted_pairs(&CORNERS[..3], 0.0, 0.0);
        assert_eq!(
            verify(&pairs, &outline(), &Fixed::translation(0.0, 0.0), &cfg()),
            Err(Rejection::TooFewCorrespondences { needed: 4, found: 3 })
        );
    }

    #[test]
    fn test_estimation_failure() {
        let pairs = shifted_pairs(&CORNERS, 0.0, 0.0);
        assert_eq!(verify(&pairs, &outline(), &Failing, &cfg()), Err(Rejection::EstimationFailed));
    }

    #[test]
    fn test_few_inliers_accepted_by_default() {
        let pairs = shifted_pairs(&CORNERS, 0.0, 0.0);
        let estimator = Fixed {
            mask: Some(vec![true, false, true, false, true]),
            ..Fixed::translation(0.0, 0.0)
        };
        let v = verify(&pairs, &outline(), &estimator, &cfg()).unwrap();
        assert_eq!(v.inliers.len(), 3);
    }

    #[test]
    fn test_insufficient_inliers_when_required() {
        let pairs = shifted_pairs(&CORNERS, 0.0, 0.0);
        let estimator = Fixed {
            mask: Some(vec![true, false, true, false, true]),
            ..Fixed::translation(0.0, 0.0)
        };
        let strict = ScanConfig {
            min_inliers: 4,
            ..ScanConfig::default()
        };
        assert_eq!(
            verify(&pairs, &outline(), &estimator, &strict),
            Err(Rejection::InsufficientInliers { needed: 4, found: 3 })
        );
    }

    #[test]
    fn test_projection_to_infinity() {
        // Third row zeroes w at x = 40
        let estimator = Fixed {
            matrix: Matrix3::new(1.0, 0.0, 0.0, 0.0, 1.0, 0.0, -0.025, 0.0, 1.0),
            mask: None,
        };
        let pairs = shifted_pairs(&CORNERS, 0.0, 0.0);
        assert_eq!(
            verify(&pairs, &outline(), &estimator, &cfg()),
            Err(Rejection::DegenerateProjection)
        );
    }

    #[test]
    fn test_inlier_outside_outline() {
        let mut pairs = shifted_pairs(&CORNERS, 0.0, 0.0);
        pairs.push(PointPair::new(Point::new(20.0, 15.0), Point::new(100.0, 100.0)));

        assert_eq!(
            verify(&pairs, &outline(), &Fixed::translation(0.0, 0.0), &cfg()),
            Err(Rejection::InlierOutsideFootprint { x: 100.0, y: 100.0 })
        );
    }

    #[test]
    fn test_inlier_on_outline_edge_is_accepted() {
        let mut pairs = shifted_pairs(&CORNERS, 0.0, 0.0);
        pairs.push(PointPair::new(Point::new(40.0, 10.0), Point::new(40.0, 10.0)));
        assert!(verify(&pairs, &outline(), &Fixed::translation(0.0, 0.0), &cfg()).is_ok());
    }

    #[test]
    fn test_correspondences_skip_bad_indices() {
        let template = FeatureSet::new(vec![Keypoint::new(1.0, 2.0)], vec![[0; 32]]).unwrap();
        let scene = FeatureSet::new(vec![Keypoint::new(3.0, 4.0)], vec![[0; 32]]).unwrap();
        let pairs = correspondences(&template, &scene, &[Match::new(0, 0, 0.0), Match::new(0, 7, 0.0)]);

        assert_eq!(pairs, [PointPair::new(Point::new(1.0, 2.0), Point::new(3.0, 4.0))]);
    }
}
