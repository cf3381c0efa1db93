//! Steered BRIEF descriptors and brute-force Hamming matching, the default
//! extractor and matcher of the notescan workspace.

pub mod config;
pub mod matcher;

pub use config::BriefConfig;
pub use matcher::{hamming_distance, HammingMatcher};

use notescan_core::{Descriptor, DescriptorExtractor, FeatureSet, GrayImage, Keypoint, Result};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;

const DESCRIPTOR_SIZE: usize = 32;
const TEST_PAIRS: usize = DESCRIPTOR_SIZE * 8;

/// Steered BRIEF extractor: 256 intensity comparisons inside a patch rotated
/// by the keypoint angle.
#[derive(Debug, Clone)]
pub struct BriefExtractor {
    cfg: BriefConfig,
    pairs: Vec<(f32, f32, f32, f32)>,
    margin: f32,
}

impl BriefExtractor {
    pub fn new(cfg: BriefConfig) -> Result<Self> {
        cfg.validate()?;

        let half = (cfg.patch_size / 2) as i32;
        let mut rng = StdRng::seed_from_u64(cfg.seed);
        let pairs = (0..TEST_PAIRS)
            .map(|_| {
                (
                    rng.gen_range(-half..=half) as f32,
                    rng.gen_range(-half..=half) as f32,
                    rng.gen_range(-half..=half) as f32,
                    rng.gen_range(-half..=half) as f32,
                )
            })
            .collect();

        // Any rotation of the patch stays within half * sqrt(2) of the center
        let margin = (half as f32 * std::f32::consts::SQRT_2).ceil() + 1.0;

        Ok(Self { cfg, pairs, margin })
    }

    pub fn config(&self) -> &BriefConfig {
        &self.cfg
    }

    /// Whether a keypoint is far enough from the border to be described
    pub fn can_describe(&self, img: &GrayImage, kp: &Keypoint) -> bool {
        let (w, h) = (img.width() as f32, img.height() as f32);
        kp.x >= self.margin && kp.y >= self.margin && kp.x < w - self.margin && kp.y < h - self.margin
    }

    pub fn generate_descriptors(&self, img: &GrayImage, kps: &[Keypoint]) -> Vec<Descriptor> {
        if kps.is_empty() {
            return Vec::new();
        }
        let smoothed = imageproc::filter::gaussian_blur_f32(img, self.cfg.smoothing_sigma);

        kps.par_iter()
            .map(|kp| {
                let (s, c) = kp.angle.sin_cos();
                let (cx, cy) = (kp.x, kp.y);
                let mut d = [0u8; DESCRIPTOR_SIZE];

                for (i, &(dx1, dy1, dx2, dy2)) in self.pairs.iter().enumerate() {
                    let (rx1, ry1) = (cx + c * dx1 - s * dy1, cy + s * dx1 + c * dy1);
                    let (rx2, ry2) = (cx + c * dx2 - s * dy2, cy + s * dx2 + c * dy2);

                    let val1 = bilinear_sample(&smoothed, rx1, ry1);
                    let val2 = bilinear_sample(&smoothed, rx2, ry2);

                    let bit = (val1 < val2) as u8;
                    d[i / 8] |= bit << (i % 8);
                }
                d
            })
            .collect()
    }
}

impl DescriptorExtractor for BriefExtractor {
    fn extract(&self, img: &GrayImage, keypoints: &[Keypoint]) -> Result<FeatureSet> {
        let kept: Vec<Keypoint> = keypoints
            .iter()
            .filter(|kp| self.can_describe(img, kp))
            .copied()
            .collect();
        if kept.len() < keypoints.len() {
            log::debug!(
                "BRIEF: dropped {} keypoints too close to the border",
                keypoints.len() - kept.len()
            );
        }
        let descriptors = self.generate_descriptors(img, &kept);
        FeatureSet::new(kept, descriptors)
    }
}

/// Bilinear interpolation for subpixel sampling, clamped to the image
fn bilinear_sample(img: &GrayImage, x: f32, y: f32) -> f32 {
    let (w, h) = (img.width(), img.height());
    let raw = img.as_raw();
    let x = x.clamp(0.0, (w - 1) as f32);
    let y = y.clamp(0.0, (h - 1) as f32);

    let x0 = x.floor() as u32;
    let y0 = y.floor() as u32;
    let x1 = (x0 + 1).min(w - 1);
    let y1 = (y0 + 1).min(h - 1);
    let dx = x - x0 as f32;
    let dy = y - y0 as f32;

    let at = |xx: u32, yy: u32| raw[(yy * w + xx) as usize] as f32;
    let top = at(x0, y0) * (1.0 - dx) + at(x1, y0) * dx;
    let bottom = at(x0, y1) * (1.0 - dx) + at(x1, y1) * dx;

    top * (1.0 - dy) + bottom * dy
}
