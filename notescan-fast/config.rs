use crate::error::{FastError, FastResult};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// FAST detector settings
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct FastConfig {
    /// Intensity difference a circle pixel needs to count as brighter/darker
    pub threshold: u8,
    /// Contiguous circle pixels required (FAST-N)
    pub arc_length: usize,
    /// Minimum distance between surviving keypoints after NMS
    pub nms_distance: f32,
    /// Side of the square patch used for the intensity-centroid orientation
    pub patch_size: usize,
    /// Keep only the strongest keypoints
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    pub max_keypoints: Option<usize>,
}

impl Default for FastConfig {
    fn default() -> Self {
        Self {
            threshold: 20,
            arc_length: 12,
            nms_distance: 3.0,
            patch_size: 31,
            max_keypoints: Some(2000),
        }
    }
}

impl FastConfig {
    /// Validate configuration parameters
    pub fn validate(&self) -> FastResult<()> {
        if self.threshold == 0 || self.threshold > 127 {
            return Err(FastError::InvalidThreshold(self.threshold));
        }
        if !(9..=16).contains(&self.arc_length) {
            return Err(FastError::InvalidArcLength(self.arc_length));
        }
        if self.patch_size % 2 == 0 || self.patch_size < 3 {
            return Err(FastError::InvalidPatchSize(self.patch_size));
        }
        Ok(())
    }

    /// Generate human-readable summary
    pub fn summary(&self) -> String {
        format!(
            "FAST-{} threshold={} nms={:.1} patch={} max={}",
            self.arc_length,
            self.threshold,
            self.nms_distance,
            self.patch_size,
            self.max_keypoints
                .map(|m| m.to_string())
                .unwrap_or_else(|| "unbounded".to_string())
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        assert!(FastConfig::default().validate().is_ok());
    }

    #[test]
    fn test_invalid_threshold() {
        let mut cfg = FastConfig::default();
        cfg.threshold = 0;
        assert_eq!(cfg.validate(), Err(FastError::InvalidThreshold(0)));
        cfg.threshold = 200;
        assert_eq!(cfg.validate(), Err(FastError::InvalidThreshold(200)));
    }

    #[test]
    fn test_invalid_patch_and_arc() {
        let cfg = FastConfig {
            patch_size: 16,
            ..FastConfig::default()
        };
        assert_eq!(cfg.validate(), Err(FastError::InvalidPatchSize(16)));

        let cfg = FastConfig {
            arc_length: 8,
            ..FastConfig::default()
        };
        assert_eq!(cfg.validate(), Err(FastError::InvalidArcLength(8)));
    }

    #[test]
    fn test_summary_mentions_variant() {
        let s = FastConfig::default().summary();
        assert!(s.contains("FAST-12"));
        assert!(s.contains("max=2000"));
    }
}
