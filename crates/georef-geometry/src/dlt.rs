use glam::{DMat3, DVec2, DVec3};

use crate::homography::HomographyError;

/// Estimate a homography `dst ~ H * src` with the normalized DLT.
///
/// Accepts any `n >= 4` correspondences; the overdetermined system is
/// solved in the least-squares sense. Points are normalized to zero mean
/// and average distance sqrt(2) before building the design matrix, which
/// keeps the SVD well conditioned for pixel-scale coordinates.
///
/// # Errors
///
/// Fails with [`HomographyError::Degenerate`] when the points collapse to
/// a single location or the solved matrix is singular.
pub fn homography_dlt(src: &[DVec2], dst: &[DVec2]) -> Result<DMat3, HomographyError> {
    let n = src.len();
    if n != dst.len() {
        return Err(HomographyError::MismatchedLengths {
            left: n,
            right: dst.len(),
        });
    }
    if n < 4 {
        return Err(HomographyError::InsufficientCorrespondences {
            required: 4,
            actual: n,
        });
    }

    let (src_n, t_src) = normalize_points(src).ok_or(HomographyError::Degenerate)?;
    let (dst_n, t_dst) = normalize_points(dst).ok_or(HomographyError::Degenerate)?;

    // Build the 2n x 9 design matrix for dst x (H * src) = 0.
    let mut mat_a = faer::Mat::<f64>::zeros(2 * n, 9);
    for i in 0..n {
        let (s, d) = (src_n[i], dst_n[i]);

        mat_a.write(2 * i, 0, s.x);
        mat_a.write(2 * i, 1, s.y);
        mat_a.write(2 * i, 2, 1.0);
        mat_a.write(2 * i, 6, -d.x * s.x);
        mat_a.write(2 * i, 7, -d.x * s.y);
        mat_a.write(2 * i, 8, -d.x);

        mat_a.write(2 * i + 1, 3, s.x);
        mat_a.write(2 * i + 1, 4, s.y);
        mat_a.write(2 * i + 1, 5, 1.0);
        mat_a.write(2 * i + 1, 6, -d.y * s.x);
        mat_a.write(2 * i + 1, 7, -d.y * s.y);
        mat_a.write(2 * i + 1, 8, -d.y);
    }

    // Solution is the right singular vector of the smallest singular value.
    let svd = mat_a.svd();
    let h = svd.v().col(8);

    let h_norm = DMat3::from_cols(
        DVec3::new(h[0], h[3], h[6]),
        DVec3::new(h[1], h[4], h[7]),
        DVec3::new(h[2], h[5], h[8]),
    );

    // Undo the normalization: H = T_dst^-1 * H_n * T_src.
    let mut h_mat = t_dst.inverse() * h_norm * t_src;

    let h22 = h_mat.z_axis.z;
    if h22.abs() > f64::EPSILON {
        h_mat *= 1.0 / h22;
    }

    if h_mat.determinant().abs() < 1e-8 {
        return Err(HomographyError::Degenerate);
    }

    Ok(h_mat)
}

/// Hartley normalization: zero mean, average distance sqrt(2).
///
/// Returns the normalized points and the similarity transform that produced
/// them; `None` when the points are (numerically) all coincident.
fn normalize_points(pts: &[DVec2]) -> Option<(Vec<DVec2>, DMat3)> {
    let n = pts.len() as f64;

    let mut centroid = DVec2::ZERO;
    for p in pts {
        centroid += *p;
    }
    centroid /= n;

    let mut mean_dist = 0.0;
    for p in pts {
        mean_dist += (*p - centroid).length();
    }
    mean_dist /= n;

    if mean_dist < 1e-12 {
        return None;
    }
    let scale = std::f64::consts::SQRT_2 / mean_dist;

    let normalized = pts.iter().map(|p| (*p - centroid) * scale).collect();

    // Similarity transform T = [[s, 0, -s*cx], [0, s, -s*cy], [0, 0, 1]].
    let t = DMat3::from_cols(
        DVec3::new(scale, 0.0, 0.0),
        DVec3::new(0.0, scale, 0.0),
        DVec3::new(-scale * centroid.x, -scale * centroid.y, 1.0),
    );

    Some((normalized, t))
}
