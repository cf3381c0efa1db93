use crate::config::FastConfig;
use crate::error::FastResult;
use crate::refinement::KeypointRefinement;
use crate::types::{CornerType, ScoredKeypoint};
use crate::utils::{has_consecutive_bits, CIRCLE_OFFSETS};
use notescan_core::{GrayImage, Keypoint, KeypointDetector};
use rayon::prelude::*;

/// Below 7x7 there is no pixel with a full 3-pixel circle, so nothing is detected
const MIN_SIZE: u32 = 7;

/// Oriented FAST corner detector
#[derive(Debug, Clone)]
pub struct FastDetector {
    cfg: FastConfig,
}

impl FastDetector {
    /// Creates a new FAST detector with validation
    pub fn new(cfg: FastConfig) -> FastResult<Self> {
        cfg.validate()?;
        Ok(Self { cfg })
    }

    /// Get detector configuration
    pub fn config(&self) -> &FastConfig {
        &self.cfg
    }

    /// Detect keypoints: segment test, NMS, orientation
    pub fn detect_keypoints(&self, img: &GrayImage) -> FastResult<Vec<Keypoint>> {
        let scored = self.detect_keypoints_with_response(img)?;
        let suppressed = KeypointRefinement::non_maximum_suppression(
            &scored,
            self.cfg.nms_distance,
            self.cfg.max_keypoints,
        );

        let keypoints = suppressed
            .into_iter()
            .map(|sk| {
                let angle = KeypointRefinement::compute_orientation(
                    img,
                    sk.keypoint.x as u32,
                    sk.keypoint.y as u32,
                    self.cfg.patch_size,
                );
                Keypoint { angle, ..sk.keypoint }
            })
            .collect::<Vec<_>>();

        log::debug!(
            "FAST: {} candidates, {} keypoints after NMS ({}x{})",
            scored.len(),
            keypoints.len(),
            img.width(),
            img.height()
        );
        Ok(keypoints)
    }

    /// Run the segment test on every interior pixel, one rayon task per row
    pub fn detect_keypoints_with_response(&self, img: &GrayImage) -> FastResult<Vec<ScoredKeypoint>> {
        let (w, h) = img.dimensions();
        if w < MIN_SIZE || h < MIN_SIZE {
            log::debug!("FAST: {}x{} image has no room for the segment test", w, h);
            return Ok(Vec::new());
        }

        let keypoints = (3..h - 3)
            .into_par_iter()
            .flat_map_iter(|y| {
                let mut row = Vec::new();
                for x in 3..w - 3 {
                    if let Some(sk) = self.test_pixel(img, x, y) {
                        row.push(sk);
                    }
                }
                row
            })
            .collect();

        Ok(keypoints)
    }

    #[inline]
    fn test_pixel(&self, img: &GrayImage, x: u32, y: u32) -> Option<ScoredKeypoint> {
        let raw = img.as_raw();
        let w = img.width() as i32;
        let p = raw[(y as i32 * w + x as i32) as usize];
        let t = self.cfg.threshold;

        let mut bright_mask = 0u16;
        let mut dark_mask = 0u16;
        let mut bright_sum = 0i32;
        let mut dark_sum = 0i32;

        for (i, &(dx, dy)) in CIRCLE_OFFSETS.iter().enumerate() {
            let q = raw[((y as i32 + dy) * w + x as i32 + dx) as usize];
            if q >= p.saturating_add(t) {
                bright_mask |= 1 << i;
                bright_sum += q as i32 - p as i32;
            } else if q.saturating_add(t) <= p {
                dark_mask |= 1 << i;
                dark_sum += p as i32 - q as i32;
            }
        }

        let corner = if has_consecutive_bits(bright_mask, self.cfg.arc_length) {
            CornerType::Bright
        } else if has_consecutive_bits(dark_mask, self.cfg.arc_length) {
            CornerType::Dark
        } else {
            return None;
        };

        // Mean contrast over the pixels that passed on the winning side
        let response = match corner {
            CornerType::Bright => bright_sum as f32 / bright_mask.count_ones() as f32,
            CornerType::Dark => dark_sum as f32 / dark_mask.count_ones() as f32,
        };

        Some(ScoredKeypoint {
            keypoint: Keypoint::new(x as f32, y as f32),
            response,
        })
    }
}

impl KeypointDetector for FastDetector {
    fn detect(&self, img: &GrayImage) -> notescan_core::Result<Vec<Keypoint>> {
        Ok(self.detect_keypoints(img)?)
    }
}
