use glam::{DMat3, DVec2, DVec3};
use log::debug;
use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::dlt::homography_dlt;
use crate::homography::{Homography, HomographyError, SecondaryToReference};

/// Minimum number of putative correspondences required before a robust fit
/// is even attempted. Fewer than this is a hard failure, never a
/// best-effort estimate.
pub const MIN_MATCH_COUNT: usize = 10;

/// Parameters for RANSAC homography estimation.
#[derive(Debug, Clone)]
pub struct RansacParams {
    /// Maximum number of RANSAC iterations; the loop never exceeds this
    /// regardless of the adaptive stopping criterion.
    pub max_iterations: usize,
    /// Pixel reprojection error below which a correspondence supports a
    /// candidate model.
    pub reproj_threshold: f64,
    /// Desired probability that at least one sample set is outlier-free;
    /// drives the adaptive iteration bound.
    pub confidence: f64,
    /// A model must be supported by at least this many inliers, otherwise
    /// the fit is rejected as unstable.
    pub min_inliers: usize,
    /// Optional fixed seed for reproducible sampling.
    pub random_seed: Option<u64>,
    /// Whether to refit on all inliers with the full DLT after the search.
    pub refine: bool,
}

impl Default for RansacParams {
    fn default() -> Self {
        Self {
            max_iterations: 2000,
            reproj_threshold: 5.0,
            confidence: 0.995,
            min_inliers: MIN_MATCH_COUNT,
            random_seed: None,
            refine: true,
        }
    }
}

/// A robustly estimated homography with its consensus set.
#[derive(Debug, Clone)]
pub struct RansacHomography {
    /// The fitted secondary→reference transform.
    pub homography: Homography<SecondaryToReference>,
    /// Per-correspondence inlier mask.
    pub inliers: Vec<bool>,
    /// Total inlier count.
    pub inlier_count: usize,
    /// Sum of squared inlier reprojection errors (lower is better).
    pub score: f64,
}

/// Robustly estimate the homography mapping secondary-image pixels into
/// reference-image pixel space.
///
/// `secondary` and `reference` are the matched pixel positions of the same
/// correspondences in the two images. The fitted direction is fixed:
/// projecting `secondary[i]` through the result lands on `reference[i]`
/// for every inlier, which is exactly the mapping the coordinate projector
/// consumes; use [`Homography::inverse`] for the opposite direction.
///
/// # Errors
///
/// * [`HomographyError::InsufficientCorrespondences`] below
///   [`MIN_MATCH_COUNT`] input correspondences.
/// * [`HomographyError::NoConsensus`] when no sampled model reaches
///   `min_inliers` support.
/// * [`HomographyError::Degenerate`] when the winning model is singular.
pub fn estimate_homography(
    secondary: &[DVec2],
    reference: &[DVec2],
    params: &RansacParams,
) -> Result<RansacHomography, HomographyError> {
    let n = secondary.len();
    if n != reference.len() {
        return Err(HomographyError::MismatchedLengths {
            left: n,
            right: reference.len(),
        });
    }
    if n < MIN_MATCH_COUNT {
        return Err(HomographyError::InsufficientCorrespondences {
            required: MIN_MATCH_COUNT,
            actual: n,
        });
    }

    let mut rng = match params.random_seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => {
            let mut tr = rand::rng();
            StdRng::from_rng(&mut tr)
        }
    };

    let thresh2 = params.reproj_threshold * params.reproj_threshold;

    let mut best_model: Option<DMat3> = None;
    let mut best_inliers = Vec::new();
    let mut best_count = 0usize;
    let mut best_score = f64::INFINITY;

    let mut iter = 0usize;
    let mut required_iters = params.max_iterations;

    while iter < required_iters {
        iter += 1;

        let sample = rand::seq::index::sample(&mut rng, n, 4);
        let mut s_sec = [DVec2::ZERO; 4];
        let mut s_ref = [DVec2::ZERO; 4];
        for (k, idx) in sample.iter().enumerate() {
            s_sec[k] = secondary[idx];
            s_ref[k] = reference[idx];
        }

        // A sample with three collinear points pins down no perspective.
        if sample_is_degenerate(&s_sec) || sample_is_degenerate(&s_ref) {
            continue;
        }

        let model = match homography_dlt(&s_sec, &s_ref) {
            Ok(model) => model,
            Err(_) => continue,
        };

        let (inliers, count, score) = classify_inliers(&model, secondary, reference, thresh2);

        if count > best_count || (count == best_count && score < best_score) {
            best_model = Some(model);
            best_inliers = inliers;
            best_count = count;
            best_score = score;

            // Shrink the iteration bound from the observed inlier ratio.
            if best_count >= 4 {
                let w = best_count as f64 / n as f64;
                let ws = w.powi(4);
                if ws > 1e-12 && ws < 1.0 - 1e-12 {
                    let log_conf = (1.0 - params.confidence).max(1e-12).ln();
                    let est = (log_conf / (1.0 - ws).ln()).ceil();
                    if est.is_finite() && est > 0.0 {
                        required_iters = required_iters.min(est as usize);
                    }
                } else if w >= 0.95 {
                    required_iters = iter;
                }
            }
        }
    }

    debug!("ransac homography: {best_count}/{n} inliers after {iter} iterations");

    let best_model = match best_model {
        Some(model) if best_count >= params.min_inliers => model,
        _ => return Err(HomographyError::NoConsensus),
    };

    let mut final_model = best_model;
    if params.refine && best_count > 4 {
        let mut sec_in = Vec::with_capacity(best_count);
        let mut ref_in = Vec::with_capacity(best_count);
        for (i, &is_inlier) in best_inliers.iter().enumerate() {
            if is_inlier {
                sec_in.push(secondary[i]);
                ref_in.push(reference[i]);
            }
        }

        match homography_dlt(&sec_in, &ref_in) {
            Ok(refined) => {
                let (inliers, count, score) =
                    classify_inliers(&refined, secondary, reference, thresh2);
                // Only adopt the refit when it does not lose support.
                if count >= best_count {
                    final_model = refined;
                    best_inliers = inliers;
                    best_count = count;
                    best_score = score;
                }
            }
            Err(err) => {
                debug!("inlier refit failed, keeping minimal-sample model: {err}");
            }
        }
    }

    let homography = Homography::from_matrix(final_model)?;

    Ok(RansacHomography {
        homography,
        inliers: best_inliers,
        inlier_count: best_count,
        score: best_score,
    })
}

/// Squared reprojection error of one correspondence under a candidate model.
fn reproj_error2(model: &DMat3, sec: &DVec2, refp: &DVec2) -> f64 {
    let hp = *model * DVec3::new(sec.x, sec.y, 1.0);
    if hp.z.abs() < 1e-12 {
        return f64::INFINITY;
    }
    let du = hp.x / hp.z - refp.x;
    let dv = hp.y / hp.z - refp.y;
    du * du + dv * dv
}

fn classify_inliers(
    model: &DMat3,
    secondary: &[DVec2],
    reference: &[DVec2],
    thresh2: f64,
) -> (Vec<bool>, usize, f64) {
    let mut inliers = vec![false; secondary.len()];
    let mut count = 0usize;
    let mut score = 0.0f64;

    for (i, (sec, refp)) in secondary.iter().zip(reference.iter()).enumerate() {
        let err2 = reproj_error2(model, sec, refp);
        if err2 <= thresh2 {
            inliers[i] = true;
            count += 1;
            score += err2;
        }
    }

    (inliers, count, score)
}

/// True when any three of the four sample points are (nearly) collinear.
fn sample_is_degenerate(pts: &[DVec2; 4]) -> bool {
    const TRIPLES: [[usize; 3]; 4] = [[0, 1, 2], [0, 1, 3], [0, 2, 3], [1, 2, 3]];
    TRIPLES.iter().any(|&[a, b, c]| {
        let area = (pts[b] - pts[a]).perp_dot(pts[c] - pts[a]);
        area.abs() < 1e-9
    })
}
