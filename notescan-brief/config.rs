use notescan_core::{Error, Result};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Steered BRIEF settings
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct BriefConfig {
    /// Side of the square patch the test pairs are drawn from
    pub patch_size: usize,
    /// Gaussian smoothing applied before sampling
    pub smoothing_sigma: f32,
    /// Seed for the test-pair pattern; templates and scenes must share it
    pub seed: u64,
}

impl Default for BriefConfig {
    fn default() -> Self {
        Self {
            patch_size: 31,
            smoothing_sigma: 2.0,
            seed: 0x5eed_b41e,
        }
    }
}

impl BriefConfig {
    pub fn validate(&self) -> Result<()> {
        if self.patch_size % 2 == 0 || self.patch_size < 5 {
            return Err(Error::InvalidConfig(format!(
                "BRIEF patch size must be odd and at least 5, got {}",
                self.patch_size
            )));
        }
        if !(self.smoothing_sigma > 0.0) {
            return Err(Error::InvalidConfig(format!(
                "BRIEF smoothing sigma must be positive, got {}",
                self.smoothing_sigma
            )));
        }
        Ok(())
    }
}
