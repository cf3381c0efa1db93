use crate::error::{Error, Result};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Tuning of the match filter and the geometric verifier
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct ScanConfig {
    /// Good matches satisfy `distance < match_ratio * min_distance`
    pub match_ratio: f32,
    /// Stands in for `min_distance` when it is zero, so exact duplicates
    /// do not collapse the threshold to zero
    pub distance_floor: f32,
    /// Good matches needed before a homography is estimated
    pub min_correspondences: usize,
    /// Estimator inliers required to accept a homography; 0 disables the check
    pub min_inliers: usize,
    /// Upper bound on instances of a single template in one scene
    pub max_instances_per_template: usize,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            match_ratio: 3.0,
            distance_floor: 1.0,
            min_correspondences: 4,
            min_inliers: 0,
            max_instances_per_template: 64,
        }
    }
}

impl ScanConfig {
    pub fn validate(&self) -> Result<()> {
        if !(self.match_ratio > 0.0) || !self.match_ratio.is_finite() {
            return Err(Error::InvalidConfig(format!(
                "match_ratio must be positive, got {}",
                self.match_ratio
            )));
        }
        if !(self.distance_floor >= 0.0) || !self.distance_floor.is_finite() {
            return Err(Error::InvalidConfig(format!(
                "distance_floor must be non-negative, got {}",
                self.distance_floor
            )));
        }
        // A homography has eight degrees of freedom
        if self.min_correspondences < 4 {
            return Err(Error::InvalidConfig(format!(
                "min_correspondences must be at least 4, got {}",
                self.min_correspondences
            )));
        }
        if self.max_instances_per_template == 0 {
            return Err(Error::InvalidConfig(
                "max_instances_per_template must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        let cfg = ScanConfig::default();
        assert!(cfg.validate().is_ok());
        assert_eq!(cfg.match_ratio, 3.0);
        assert_eq!(cfg.min_correspondences, 4);
        assert_eq!(cfg.min_inliers, 0);
    }

    #[test]
    fn test_rejects_bad_values() {
        let cfg = ScanConfig {
            match_ratio: 0.0,
            ..ScanConfig::default()
        };
        assert!(matches!(cfg.validate(), Err(Error::InvalidConfig(_))));

        let cfg = ScanConfig {
            min_correspondences: 3,
            ..ScanConfig::default()
        };
        assert!(matches!(cfg.validate(), Err(Error::InvalidConfig(_))));

        let cfg = ScanConfig {
            distance_floor: f32::NAN,
            ..ScanConfig::default()
        };
        assert!(cfg.validate().is_err());
    }
}
