use notescan_core::Keypoint;

/// Keypoint with corner response score for NMS
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoredKeypoint {
    pub keypoint: Keypoint,
    pub response: f32,
}

/// Which side of the segment test a pixel passed on
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) enum CornerType {
    Bright,
    Dark,
}
