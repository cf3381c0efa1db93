//! Plane-to-plane homography via the Direct Linear Transform with Hartley
//! normalization.

use nalgebra::{DMatrix, Matrix3, SymmetricEigen, Vector3};
use notescan_core::PointPair;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum HomographyError {
    #[error("too few points: need {needed}, got {got}")]
    TooFewPoints { needed: usize, got: usize },

    #[error("numerical failure: {0}")]
    NumericalFailure(String),
}

/// Project `(x, y)` through `h`; NaN when the point maps to infinity
pub fn project(h: &Matrix3<f64>, x: f64, y: f64) -> [f64; 2] {
    let p = h * Vector3::new(x, y, 1.0);
    if p[2].abs() < 1e-15 {
        return [f64::NAN, f64::NAN];
    }
    [p[0] / p[2], p[1] / p[2]]
}

/// Euclidean distance between `project(h, src)` and `dst`
pub fn reprojection_error(h: &Matrix3<f64>, pair: &PointPair) -> f64 {
    let p = project(h, pair.template.x as f64, pair.template.y as f64);
    let dx = p[0] - pair.scene.x as f64;
    let dy = p[1] - pair.scene.y as f64;
    (dx * dx + dy * dy).sqrt()
}

/// Translate centroid to origin and scale the mean distance to sqrt(2)
fn normalize_points(pts: &[[f64; 2]]) -> (Matrix3<f64>, Vec<[f64; 2]>) {
    let n = pts.len() as f64;
    let cx: f64 = pts.iter().map(|p| p[0]).sum::<f64>() / n;
    let cy: f64 = pts.iter().map(|p| p[1]).sum::<f64>() / n;

    let mean_dist: f64 = pts
        .iter()
        .map(|p| ((p[0] - cx).powi(2) + (p[1] - cy).powi(2)).sqrt())
        .sum::<f64>()
        / n;

    let s = if mean_dist > 1e-15 {
        std::f64::consts::SQRT_2 / mean_dist
    } else {
        1.0
    };

    let t = Matrix3::new(s, 0.0, -s * cx, 0.0, s, -s * cy, 0.0, 0.0, 1.0);
    let normalized = pts.iter().map(|p| [s * (p[0] - cx), s * (p[1] - cy)]).collect();

    (t, normalized)
}

/// Estimate the homography mapping template points onto scene points from
/// four or more correspondences.
pub fn estimate_homography_dlt(pairs: &[PointPair]) -> Result<Matrix3<f64>, HomographyError> {
    let n = pairs.len();
    if n < 4 {
        return Err(HomographyError::TooFewPoints { needed: 4, got: n });
    }

    let src: Vec<[f64; 2]> = pairs
        .iter()
        .map(|p| [p.template.x as f64, p.template.y as f64])
        .collect();
    let dst: Vec<[f64; 2]> = pairs
        .iter()
        .map(|p| [p.scene.x as f64, p.scene.y as f64])
        .collect();

    let (t_src, src_n) = normalize_points(&src);
    let (t_dst, dst_n) = normalize_points(&dst);

    let mut a = DMatrix::zeros(2 * n, 9);
    for i in 0..n {
        let (sx, sy) = (src_n[i][0], src_n[i][1]);
        let (dx, dy) = (dst_n[i][0], dst_n[i][1]);

        // Row 2i:   [  0  0  0 | -sx -sy -1 | dy*sx  dy*sy  dy ]
        a[(2 * i, 3)] = -sx;
        a[(2 * i, 4)] = -sy;
        a[(2 * i, 5)] = -1.0;
        a[(2 * i, 6)] = dy * sx;
        a[(2 * i, 7)] = dy * sy;
        a[(2 * i, 8)] = dy;

        // Row 2i+1: [ sx  sy  1 |  0  0  0 | -dx*sx -dx*sy -dx ]
        a[(2 * i + 1, 0)] = sx;
        a[(2 * i + 1, 1)] = sy;
        a[(2 * i + 1, 2)] = 1.0;
        a[(2 * i + 1, 6)] = -dx * sx;
        a[(2 * i + 1, 7)] = -dx * sy;
        a[(2 * i + 1, 8)] = -dx;
    }

    // h is the eigenvector of A^T A with the smallest eigenvalue
    let eig = SymmetricEigen::new(a.transpose() * &a);
    let min_idx = (0..9)
        .min_by(|&i, &j| eig.eigenvalues[i].abs().total_cmp(&eig.eigenvalues[j].abs()))
        .unwrap_or(0);
    let h = eig.eigenvectors.column(min_idx);
    let h_norm = Matrix3::new(h[0], h[1], h[2], h[3], h[4], h[5], h[6], h[7], h[8]);

    // Denormalize: H = T_dst^-1 * H_norm * T_src
    let t_dst_inv = t_dst
        .try_inverse()
        .ok_or_else(|| HomographyError::NumericalFailure("T_dst not invertible".into()))?;
    let h = t_dst_inv * h_norm * t_src;

    let scale = h[(2, 2)];
    let h = if scale.abs() < 1e-15 { h } else { h / scale };
    if h.iter().any(|v| !v.is_finite()) {
        return Err(HomographyError::NumericalFailure("non-finite homography".into()));
    }
    Ok(h)
}
