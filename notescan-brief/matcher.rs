use notescan_core::{Descriptor, DescriptorMatcher, Match};
use rayon::prelude::*;

/// Number of differing bits between two binary descriptors
#[inline]
pub fn hamming_distance(a: &Descriptor, b: &Descriptor) -> u32 {
    a.iter().zip(b.iter()).map(|(x, y)| (x ^ y).count_ones()).sum()
}

/// Brute-force nearest neighbour under the Hamming distance.
///
/// Ties go to the lowest train index, so results are reproducible.
#[derive(Debug, Clone, Copy, Default)]
pub struct HammingMatcher;

impl HammingMatcher {
    pub fn new() -> Self {
        Self
    }
}

impl DescriptorMatcher for HammingMatcher {
    fn best_matches(&self, query: &[Descriptor], train: &[Descriptor]) -> Vec<Match> {
        if train.is_empty() {
            return Vec::new();
        }

        query
            .par_iter()
            .enumerate()
            .map(|(qi, q)| {
                let (best_idx, best_dist) = train
                    .iter()
                    .enumerate()
                    .map(|(ti, t)| (ti, hamming_distance(q, t)))
                    .fold((0, u32::MAX), |best, cur| if cur.1 < best.1 { cur } else { best });
                Match::new(qi, best_idx, best_dist as f32)
            })
            .collect()
    }
}
