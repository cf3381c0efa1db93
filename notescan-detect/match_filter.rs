use notescan_core::{Match, ScanConfig};

/// Correspondences that passed the adaptive distance filter
#[derive(Debug, Clone, PartialEq)]
pub struct FilteredMatches {
    pub good: Vec<Match>,
    /// Smallest distance among all input correspondences
    pub min_distance: Option<f32>,
    /// Exclusive upper bound that was applied
    pub threshold: f32,
}

/// Keep matches with `distance < match_ratio * min_distance`.
///
/// A zero minimum (an exact duplicate) is replaced by `distance_floor`.
pub fn filter_matches(matches: &[Match], cfg: &ScanConfig) -> FilteredMatches {
    let min_distance = matches
        .iter()
        .map(|m| m.distance)
        .min_by(|a, b| a.total_cmp(b));

    let Some(min) = min_distance else {
        return FilteredMatches {
            good: Vec::new(),
            min_distance: None,
            threshold: 0.0,
        };
    };

    let effective = if min > 0.0 { min } else { cfg.distance_floor };
    let threshold = cfg.match_ratio * effective;
    FilteredMatches {
        good: retain_below(matches, threshold),
        min_distance,
        threshold,
    }
}

/// Matches strictly closer than `threshold`, in input order
pub fn retain_below(matches: &[Match], threshold: f32) -> Vec<Match> {
    matches.iter().filter(|m| m.distance < threshold).copied().collect()
}
