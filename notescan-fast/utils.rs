//! Segment-test helpers for the 16-pixel Bresenham circle

/// Circle offsets, clockwise from 12 o'clock
pub const CIRCLE_OFFSETS: [(i32, i32); 16] = [
    (0, -3), (1, -3), (2, -2), (3, -1),
    (3, 0), (3, 1), (2, 2), (1, 3),
    (0, 3), (-1, 3), (-2, 2), (-3, 1),
    (-3, 0), (-3, -1), (-2, -2), (-1, -3),
];

/// Check for a run of at least `min_count` set bits in a circular 16-bit mask
pub fn has_consecutive_bits(mask: u16, min_count: usize) -> bool {
    if min_count > 16 || min_count == 0 {
        return false;
    }
    if mask == u16::MAX {
        return true;
    }

    // AND the mask with its rotations; a surviving bit marks the end of a long enough run
    let mut test_mask = mask;
    for i in 1..min_count as u32 {
        test_mask &= mask.rotate_left(i);
        if test_mask == 0 {
            return false;
        }
    }

    test_mask != 0
}

/// Straightforward run counter over two laps of the circle
pub fn has_consecutive_bits_scan(mask: u16, min_count: usize) -> bool {
    if min_count > 16 || min_count == 0 {
        return false;
    }

    let mut current = 0;
    for i in 0..32 {
        if mask & (1 << (i % 16)) != 0 {
            current += 1;
            if current >= min_count {
                return true;
            }
        } else {
            current = 0;
        }
    }

    false
}
