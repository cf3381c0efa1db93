use crate::types::ScoredKeypoint;
use notescan_core::GrayImage;
use std::cmp::Ordering;

/// Post-processing of raw FAST responses
pub struct KeypointRefinement;

impl KeypointRefinement {
    /// Greedy non-maximum suppression: strongest response first, drop anything
    /// closer than `min_distance` to an accepted keypoint.
    ///
    /// Ties are broken by position so the output does not depend on the
    /// order in which rows were scanned. Stops early once `limit` keypoints
    /// have been accepted.
    pub fn non_maximum_suppression(
        keypoints: &[ScoredKeypoint],
        min_distance: f32,
        limit: Option<usize>,
    ) -> Vec<ScoredKeypoint> {
        if keypoints.is_empty() {
            return Vec::new();
        }

        let mut sorted_keypoints = keypoints.to_vec();
        sorted_keypoints.sort_by(Self::response_order);

        let limit = limit.unwrap_or(usize::MAX);
        let min_distance_sq = min_distance * min_distance;
        let mut suppressed: Vec<ScoredKeypoint> = Vec::new();

        for candidate in sorted_keypoints {
            if suppressed.len() >= limit {
                break;
            }

            let is_local_max = suppressed.iter().all(|existing| {
                let dx = candidate.keypoint.x - existing.keypoint.x;
                let dy = candidate.keypoint.y - existing.keypoint.y;
                dx * dx + dy * dy >= min_distance_sq
            });

            if is_local_max {
                suppressed.push(candidate);
            }
        }

        suppressed
    }

    /// Orientation by the intensity-centroid method over a square patch.
    ///
    /// Keypoints whose patch does not fit inside the image get angle 0.
    pub fn compute_orientation(img: &GrayImage, x: u32, y: u32, patch_size: usize) -> f32 {
        let half = (patch_size / 2) as i64;
        let (w, h) = (img.width() as i64, img.height() as i64);
        let (cx, cy) = (x as i64, y as i64);

        if cx - half < 0 || cy - half < 0 || cx + half >= w || cy + half >= h {
            return 0.0;
        }

        let raw = img.as_raw();
        let mut m10 = 0i64;
        let mut m01 = 0i64;
        for dy in -half..=half {
            let row = ((cy + dy) * w) as usize;
            for dx in -half..=half {
                let val = raw[row + (cx + dx) as usize] as i64;
                m10 += dx * val;
                m01 += dy * val;
            }
        }

        if m10 == 0 && m01 == 0 {
            0.0
        } else {
            (m01 as f32).atan2(m10 as f32)
        }
    }

    /// Strongest response first, then row-major position
    pub fn response_order(a: &ScoredKeypoint, b: &ScoredKeypoint) -> Ordering {
        b.response
            .total_cmp(&a.response)
            .then_with(|| a.keypoint.y.total_cmp(&b.keypoint.y))
            .then_with(|| a.keypoint.x.total_cmp(&b.keypoint.x))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use notescan_core::Keypoint;

    fn scored(x: f32, y: f32, response: f32) -> ScoredKeypoint {
        ScoredKeypoint {
            keypoint: Keypoint::new(x, y),
            response,
        }
    }

    #[test]
    fn test_nms_keeps_strongest_in_neighbourhood() {
        let kps = vec![
            scored(10.0, 10.0, 5.0),
            scored(11.0, 10.0, 9.0),
            scored(30.0, 30.0, 1.0),
        ];
        let out = KeypointRefinement::non_maximum_suppression(&kps, 3.0, None);
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].keypoint.x, 11.0);
        assert_eq!(out[1].keypoint.x, 30.0);
    }

    #[test]
    fn test_nms_respects_limit() {
        let kps: Vec<_> = (0..10).map(|i| scored(i as f32 * 10.0, 0.0, i as f32)).collect();
        let out = KeypointRefinement::non_maximum_suppression(&kps, 3.0, Some(4));
        assert_eq!(out.len(), 4);
        assert_eq!(out[0].response, 9.0);
    }

    #[test]
    fn test_nms_minimum_spacing() {
        let kps: Vec<_> = (0..50)
            .map(|i| scored((i % 10) as f32, (i / 10) as f32, ((i * 7) % 13) as f32))
            .collect();
        let out = KeypointRefinement::non_maximum_suppression(&kps, 2.5, None);
        for (i, a) in out.iter().enumerate() {
            for b in &out[i + 1..] {
                let dx = a.keypoint.x - b.keypoint.x;
                let dy = a.keypoint.y - b.keypoint.y;
                assert!((dx * dx + dy * dy).sqrt() >= 2.5);
            }
        }
    }

    #[test]
    fn test_orientation_points_towards_bright_side() {
        let mut img = GrayImage::new(21, 21);
        for y in 0..21 {
            for x in 11..21 {
                img.put_pixel(x, y, image::Luma([255]));
            }
        }
        let angle = KeypointRefinement::compute_orientation(&img, 10, 10, 7);
        assert!(angle.abs() < 1e-3, "angle = {}", angle);
    }

    #[test]
    fn test_orientation_near_border_is_zero() {
        let img = GrayImage::from_pixel(20, 20, image::Luma([100]));
        assert_eq!(KeypointRefinement::compute_orientation(&img, 1, 1, 7), 0.0);
    }
}
