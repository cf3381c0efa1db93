use crate::dlt::{estimate_homography_dlt, reprojection_error};
use nalgebra::Matrix3;
use notescan_core::{Error, Homography, HomographyEstimator, HomographyFit, Point, PointPair, Result};
use rand::rngs::StdRng;
use rand::SeedableRng;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

const SAMPLE_SIZE: usize = 4;

/// RANSAC configuration for homography fitting.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct RansacConfig {
    /// Maximum re-projection error (pixels) for a pair to count as inlier
    pub reprojection_threshold: f64,
    /// Hard cap on the number of sampled models
    pub max_iters: usize,
    /// Desired probability that one sample was outlier-free
    pub confidence: f64,
    /// Seed for the sampler, so repeated scans agree
    pub seed: u64,
}

impl Default for RansacConfig {
    fn default() -> Self {
        Self {
            reprojection_threshold: 3.0,
            max_iters: 2000,
            confidence: 0.995,
            seed: 0,
        }
    }
}

impl RansacConfig {
    pub fn validate(&self) -> Result<()> {
        if !(self.reprojection_threshold > 0.0) {
            return Err(Error::InvalidConfig(format!(
                "reprojection_threshold must be positive, got {}",
                self.reprojection_threshold
            )));
        }
        if self.max_iters == 0 {
            return Err(Error::InvalidConfig("max_iters must be at least 1".to_string()));
        }
        if !(self.confidence > 0.0 && self.confidence < 1.0) {
            return Err(Error::InvalidConfig(format!(
                "confidence must be in (0, 1), got {}",
                self.confidence
            )));
        }
        Ok(())
    }
}

/// Homography estimator: 4-point DLT hypotheses scored by inlier count,
/// refitted on the consensus set.
#[derive(Debug, Clone)]
pub struct RansacEstimator {
    cfg: RansacConfig,
}

impl RansacEstimator {
    pub fn new(cfg: RansacConfig) -> Result<Self> {
        cfg.validate()?;
        Ok(Self { cfg })
    }

    pub fn config(&self) -> &RansacConfig {
        &self.cfg
    }

    fn inlier_mask(&self, h: &Matrix3<f64>, pairs: &[PointPair]) -> (Vec<bool>, usize) {
        let mask: Vec<bool> = pairs
            .iter()
            .map(|p| reprojection_error(h, p) <= self.cfg.reprojection_threshold)
            .collect();
        let count = mask.iter().filter(|&&b| b).count();
        (mask, count)
    }

    /// Iterations needed to draw one all-inlier sample with the configured confidence
    fn required_iterations(&self, inlier_ratio: f64) -> usize {
        let p_good = inlier_ratio.powi(SAMPLE_SIZE as i32);
        if p_good >= 1.0 {
            return 1;
        }
        if p_good <= f64::EPSILON {
            return self.cfg.max_iters;
        }
        let needed = (1.0 - self.cfg.confidence).ln() / (1.0 - p_good).ln();
        (needed.ceil() as usize).clamp(1, self.cfg.max_iters)
    }
}

fn collinear(a: Point, b: Point, c: Point) -> bool {
    let (ax, ay) = (a.x as f64, a.y as f64);
    let cross = (b.x as f64 - ax) * (c.y as f64 - ay) - (b.y as f64 - ay) * (c.x as f64 - ax);
    cross.abs() < 1e-6
}

/// Three collinear points on either side make the 4-point DLT ill-posed
fn is_degenerate(sample: &[PointPair]) -> bool {
    const TRIPLES: [(usize, usize, usize); 4] = [(0, 1, 2), (0, 1, 3), (0, 2, 3), (1, 2, 3)];
    TRIPLES.iter().any(|&(a, b, c)| {
        collinear(sample[a].template, sample[b].template, sample[c].template)
            || collinear(sample[a].scene, sample[b].scene, sample[c].scene)
    })
}

impl HomographyEstimator for RansacEstimator {
    fn estimate(&self, pairs: &[PointPair]) -> Option<HomographyFit> {
        let n = pairs.len();
        if n < SAMPLE_SIZE {
            return None;
        }

        let mut rng = StdRng::seed_from_u64(self.cfg.seed);
        let mut best: Option<(Matrix3<f64>, usize)> = None;
        let mut iter_limit = self.cfg.max_iters;
        let mut iter = 0;

        while iter < iter_limit {
            iter += 1;

            let sample: Vec<PointPair> = rand::seq::index::sample(&mut rng, n, SAMPLE_SIZE)
                .iter()
                .map(|i| pairs[i])
                .collect();
            if is_degenerate(&sample) {
                continue;
            }

            let h = match estimate_homography_dlt(&sample) {
                Ok(h) => h,
                Err(_) => continue,
            };

            let (_, count) = self.inlier_mask(&h, pairs);
            if best.map_or(true, |(_, c)| count > c) {
                best = Some((h, count));
                iter_limit = iter_limit.min(self.required_iterations(count as f64 / n as f64));
            }
        }

        let (best_h, best_count) = best?;
        if best_count < SAMPLE_SIZE {
            log::debug!("RANSAC: best model has only {} inliers of {}", best_count, n);
            return None;
        }

        // Refit on the consensus set and keep whichever model explains more pairs
        let (best_mask, _) = self.inlier_mask(&best_h, pairs);
        let consensus: Vec<PointPair> = pairs
            .iter()
            .zip(&best_mask)
            .filter(|(_, &inlier)| inlier)
            .map(|(p, _)| *p)
            .collect();

        let (h, mask) = match estimate_homography_dlt(&consensus) {
            Ok(refit) => {
                let (refit_mask, refit_count) = self.inlier_mask(&refit, pairs);
                if refit_count >= best_count {
                    (refit, refit_mask)
                } else {
                    (best_h, best_mask)
                }
            }
            Err(_) => (best_h, best_mask),
        };

        log::trace!("RANSAC: {} iterations, {} inliers of {}", iter, best_count, n);
        Some(HomographyFit {
            homography: Homography::new(h),
            inliers: mask,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dlt::project;
    use rand::Rng;

    fn perspective() -> Matrix3<f64> {
        Matrix3::new(
            1.2, 0.15, 60.0,
            -0.1, 1.1, 35.0,
            0.0003, 0.0001, 1.0,
        )
    }

    fn pair_through(h: &Matrix3<f64>, x: f64, y: f64) -> PointPair {
        let d = project(h, x, y);
        PointPair::new(
            Point::new(x as f32, y as f32),
            Point::new(d[0] as f32, d[1] as f32),
        )
    }

    #[test]
    fn test_exact_four_points() {
        let h_true = perspective();
        let pairs: Vec<_> = [(0.0, 0.0), (80.0, 0.0), (80.0, 50.0), (0.0, 50.0)]
            .iter()
            .map(|&(x, y)| pair_through(&h_true, x, y))
            .collect();

        let fit = RansacEstimator::new(RansacConfig::default())
            .unwrap()
            .estimate(&pairs)
            .unwrap();
        assert_eq!(fit.inlier_count(), 4);
    }

    #[test]
    fn test_ransac_with_outliers() {
        let h_true = perspective();
        let mut rng = StdRng::seed_from_u64(42);

        let mut pairs = Vec::new();
        for i in 0..20 {
            let p = pair_through(&h_true, (i % 5) as f64 * 30.0, (i / 5) as f64 * 30.0);
            pairs.push(PointPair::new(
                p.template,
                Point::new(
                    p.scene.x + rng.gen_range(-0.5..0.5),
                    p.scene.y + rng.gen_range(-0.5..0.5),
                ),
            ));
        }
        for _ in 0..8 {
            pairs.push(PointPair::new(
                Point::new(rng.gen_range(0.0..120.0), rng.gen_range(0.0..90.0)),
                Point::new(rng.gen_range(0.0..640.0), rng.gen_range(0.0..480.0)),
            ));
        }

        let fit = RansacEstimator::new(RansacConfig::default())
            .unwrap()
            .estimate(&pairs)
            .unwrap();

        assert!(fit.inlier_count() >= 18, "only {} inliers", fit.inlier_count());
        assert_eq!(fit.inliers.len(), pairs.len());
        for (i, p) in pairs.iter().take(20).enumerate() {
            let err = reprojection_error(fit.homography.matrix(), p);
            assert!(err < 3.0, "inlier {} has error {}", i, err);
        }
    }

    #[test]
    fn test_same_seed_same_fit() {
        let h_true = perspective();
        let mut pairs: Vec<_> = (0..12)
            .map(|i| pair_through(&h_true, (i % 4) as f64 * 25.0, (i / 4) as f64 * 25.0))
            .collect();
        pairs.push(PointPair::new(Point::new(10.0, 10.0), Point::new(400.0, 2.0)));

        let estimator = RansacEstimator::new(RansacConfig::default()).unwrap();
        assert_eq!(estimator.estimate(&pairs), estimator.estimate(&pairs));
    }

    #[test]
    fn test_too_few_pairs() {
        let estimator = RansacEstimator::new(RansacConfig::default()).unwrap();
        let pairs = vec![PointPair::new(Point::new(0.0, 0.0), Point::new(0.0, 0.0)); 3];
        assert!(estimator.estimate(&pairs).is_none());
    }

    #[test]
    fn test_collinear_pairs_fail() {
        let estimator = RansacEstimator::new(RansacConfig {
            max_iters: 50,
            ..RansacConfig::default()
        })
        .unwrap();
        let pairs: Vec<_> = (0..6)
            .map(|i| PointPair::new(Point::new(i as f32, 0.0), Point::new(i as f32 * 2.0, 5.0)))
            .collect();
        assert!(estimator.estimate(&pairs).is_none());
    }

    #[test]
    fn test_invalid_config() {
        let cfg = RansacConfig {
            confidence: 1.0,
            ..RansacConfig::default()
        };
        assert!(RansacEstimator::new(cfg).is_err());
    }
}
