use nalgebra::{Matrix3, Vector3};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Tolerance used when deciding whether a point lies on a polygon edge
const EDGE_TOLERANCE: f64 = 1e-6;

/// 2D point in image coordinates
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

/// Boundary-inclusive point-in-polygon test.
///
/// Points lying on an edge or a vertex count as inside. Works for any simple
/// or self-intersecting polygon using the even-odd rule.
pub fn polygon_contains(polygon: &[Point], p: Point) -> bool {
    if polygon.is_empty() {
        return false;
    }

    let (px, py) = (p.x as f64, p.y as f64);
    let mut inside = false;
    let mut j = polygon.len() - 1;

    for i in 0..polygon.len() {
        let (xi, yi) = (polygon[i].x as f64, polygon[i].y as f64);
        let (xj, yj) = (polygon[j].x as f64, polygon[j].y as f64);

        if on_segment((xj, yj), (xi, yi), (px, py)) {
            return true;
        }

        if (yi > py) != (yj > py) {
            let x_cross = xi + (py - yi) * (xj - xi) / (yj - yi);
            if px < x_cross {
                inside = !inside;
            }
        }
        j = i;
    }

    inside
}

fn on_segment(a: (f64, f64), b: (f64, f64), p: (f64, f64)) -> bool {
    let (dx, dy) = (b.0 - a.0, b.1 - a.1);
    let cross = dx * (p.1 - a.1) - dy * (p.0 - a.0);
    let len = (dx * dx + dy * dy).sqrt();
    if cross.abs() > EDGE_TOLERANCE * len.max(1.0) {
        return false;
    }
    p.0 >= a.0.min(b.0) - EDGE_TOLERANCE
        && p.0 <= a.0.max(b.0) + EDGE_TOLERANCE
        && p.1 >= a.1.min(b.1) - EDGE_TOLERANCE
        && p.1 <= a.1.max(b.1) + EDGE_TOLERANCE
}

/// Quadrilateral given by four corners in drawing order.
///
/// Used both for regions of interest on a reference image and for the
/// projected outline of a template inside a scene.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Quad(pub [Point; 4]);

impl Quad {
    pub fn new(corners: [Point; 4]) -> Self {
        Self(corners)
    }

    /// Axis-aligned rectangle, corners listed clockwise from `(x0, y0)`
    pub fn from_rect(x0: f32, y0: f32, x1: f32, y1: f32) -> Self {
        Self([
            Point::new(x0, y0),
            Point::new(x1, y0),
            Point::new(x1, y1),
            Point::new(x0, y1),
        ])
    }

    /// Outline of a `width` x `height` image
    pub fn image_bounds(width: u32, height: u32) -> Self {
        Self::from_rect(0.0, 0.0, width as f32, height as f32)
    }

    pub fn corners(&self) -> &[Point; 4] {
        &self.0
    }

    pub fn contains(&self, p: Point) -> bool {
        polygon_contains(&self.0, p)
    }

    pub fn is_finite(&self) -> bool {
        self.0.iter().all(Point::is_finite)
    }

    /// Axis-aligned bounding box as `(min, max)`
    pub fn bounding_box(&self) -> (Point, Point) {
        let mut min = Point::new(f32::INFINITY, f32::INFINITY);
        let mut max = Point::new(f32::NEG_INFINITY, f32::NEG_INFINITY);
        for c in &self.0 {
            min.x = min.x.min(c.x);
            min.y = min.y.min(c.y);
            max.x = max.x.max(c.x);
            max.y = max.y.max(c.y);
        }
        (min, max)
    }

    pub fn centroid(&self) -> Point {
        let (sx, sy) = self
            .0
            .iter()
            .fold((0.0f32, 0.0f32), |(sx, sy), c| (sx + c.x, sy + c.y));
        Point::new(sx / 4.0, sy / 4.0)
    }
}

/// Projective transform from the template plane to the scene plane
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Homography(Matrix3<f64>);

impl Homography {
    pub fn new(matrix: Matrix3<f64>) -> Self {
        Self(matrix)
    }

    pub fn identity() -> Self {
        Self(Matrix3::identity())
    }

    pub fn matrix(&self) -> &Matrix3<f64> {
        &self.0
    }

    /// Map a point through the transform. Returns `None` when the point
    /// lands on the line at infinity.
    pub fn project(&self, p: Point) -> Option<Point> {
        let v = self.0 * Vector3::new(p.x as f64, p.y as f64, 1.0);
        if v[2].abs() < 1e-12 {
            return None;
        }
        let out = Point::new((v[0] / v[2]) as f32, (v[1] / v[2]) as f32);
        out.is_finite().then_some(out)
    }

    pub fn project_quad(&self, quad: &Quad) -> Option<Quad> {
        let [a, b, c, d] = quad.0;
        Some(Quad([
            self.project(a)?,
            self.project(b)?,
            self.project(c)?,
            self.project(d)?,
        ]))
    }
}

/// Template-plane point and the scene-plane point it was matched to
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PointPair {
    pub template: Point,
    pub scene: Point,
}

impl PointPair {
    pub fn new(template: Point, scene: Point) -> Self {
        Self { template, scene }
    }
}

/// Estimated homography plus one inlier flag per input pair
#[derive(Debug, Clone, PartialEq)]
pub struct HomographyFit {
    pub homography: Homography,
    pub inliers: Vec<bool>,
}

impl HomographyFit {
    pub fn inlier_count(&self) -> usize {
        self.inliers.iter().filter(|&&b| b).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_rect_corners_are_clockwise() {
        let q = Quad::from_rect(1.0, 2.0, 5.0, 7.0);
        assert_eq!(q.corners()[0], Point::new(1.0, 2.0));
        assert_eq!(q.corners()[1], Point::new(5.0, 2.0));
        assert_eq!(q.corners()[2], Point::new(5.0, 7.0));
        assert_eq!(q.corners()[3], Point::new(1.0, 7.0));
    }

    #[test]
    fn test_contains_interior_and_exterior() {
        let q = Quad::from_rect(0.0, 0.0, 10.0, 10.0);
        assert!(q.contains(Point::new(5.0, 5.0)));
        assert!(!q.contains(Point::new(10.5, 5.0)));
        assert!(!q.contains(Point::new(-0.1, 3.0)));
    }

    #[test]
    fn test_contains_is_boundary_inclusive() {
        let q = Quad::from_rect(0.0, 0.0, 10.0, 10.0);
        assert!(q.contains(Point::new(0.0, 0.0)));
        assert!(q.contains(Point::new(10.0, 10.0)));
        assert!(q.contains(Point::new(10.0, 4.0)));
        assert!(q.contains(Point::new(3.0, 0.0)));
    }

    #[test]
    fn test_contains_rotated_quad() {
        let diamond = Quad::new([
            Point::new(5.0, 0.0),
            Point::new(10.0, 5.0),
            Point::new(5.0, 10.0),
            Point::new(0.0, 5.0),
        ]);
        assert!(diamond.contains(Point::new(5.0, 5.0)));
        assert!(diamond.contains(Point::new(7.5, 2.5)));
        assert!(!diamond.contains(Point::new(1.0, 1.0)));
    }

    #[test]
    fn test_project_identity_and_translation() {
        let p = Point::new(3.0, 4.0);
        assert_eq!(Homography::identity().project(p), Some(p));

        let t = Homography::new(Matrix3::new(1.0, 0.0, 10.0, 0.0, 1.0, -2.0, 0.0, 0.0, 1.0));
        let q = t.project_quad(&Quad::from_rect(0.0, 0.0, 2.0, 2.0)).unwrap();
        assert_eq!(q.corners()[0], Point::new(10.0, -2.0));
        assert_eq!(q.corners()[2], Point::new(12.0, 0.0));
    }

    #[test]
    fn test_project_at_infinity() {
        let h = Homography::new(Matrix3::new(1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 1.0, 0.0, 0.0));
        assert_eq!(h.project(Point::new(0.0, 3.0)), None);
    }

    #[test]
    fn test_bounding_box_and_centroid() {
        let q = Quad::from_rect(2.0, 4.0, 6.0, 8.0);
        let (min, max) = q.bounding_box();
        assert_eq!(min, Point::new(2.0, 4.0));
        assert_eq!(max, Point::new(6.0, 8.0));
        assert_eq!(q.centroid(), Point::new(4.0, 6.0));
    }

    proptest! {
        #[test]
        fn prop_rect_contains_matches_bounds(
            x0 in -50.0f32..50.0, y0 in -50.0f32..50.0,
            w in 1.0f32..40.0, h in 1.0f32..40.0,
            px in -100.0f32..100.0, py in -100.0f32..100.0,
        ) {
            let q = Quad::from_rect(x0, y0, x0 + w, y0 + h);
            let expected = px >= x0 && px <= x0 + w && py >= y0 && py <= y0 + h;
            prop_assert_eq!(q.contains(Point::new(px, py)), expected);
        }
    }
}
