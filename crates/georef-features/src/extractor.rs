use georef_image::{GridError, GridScalar, GridSize, SampleGrid};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::fast::{detect_corners, Corner};
use crate::pyramid::{build_pyramid, gaussian_blur};

/// Number of bytes in a packed binary descriptor (256 bits).
pub const DESCRIPTOR_BYTES: usize = 32;

/// A packed 256-bit binary descriptor.
pub type Descriptor = [u8; DESCRIPTOR_BYTES];

/// Half-width of the square patch the descriptor samples from.
const PATCH_RADIUS: i32 = 13;

/// Diameter of the disc used for the intensity-centroid orientation.
const ORIENTATION_DIAMETER: usize = 31; // NOTE: must be uneven

/// Keypoints closer than this to a level border are discarded; covers the
/// orientation disc and the rotated descriptor patch.
const EDGE_THRESHOLD: i32 = 19;

/// A detected interest point in level-0 pixel coordinates.
///
/// `angle` and `scale` describe the local frame the descriptor was sampled
/// in; downstream stages treat them as opaque metadata.
#[derive(Clone, Copy, Debug)]
pub struct Keypoint {
    /// Sub-pixel column in the full-resolution image.
    pub x: f32,
    /// Sub-pixel row in the full-resolution image.
    pub y: f32,
    /// Detector response; higher is more distinctive.
    pub response: f32,
    /// Dominant orientation in radians.
    pub angle: f32,
    /// Pyramid scale the keypoint was detected at (1.0 = full resolution).
    pub scale: f32,
}

/// Configuration for [`KeypointExtractor`].
#[derive(Clone, Copy, Debug)]
pub struct ExtractorConfig {
    /// Keep at most this many keypoints, strongest response first.
    pub max_keypoints: usize,
    /// FAST contrast threshold in normalized intensity units.
    pub fast_threshold: f32,
    /// FAST arc length (9 for FAST-9).
    pub fast_arc: u8,
    /// Number of pyramid levels.
    pub n_levels: usize,
    /// Scale ratio between consecutive pyramid levels.
    pub downscale: f32,
    /// Seed for the descriptor sampling pattern. Must be identical for any
    /// two images whose descriptors are compared.
    pub pattern_seed: u64,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            max_keypoints: 500,
            fast_threshold: 20.0 / 255.0,
            fast_arc: 9,
            n_levels: 8,
            downscale: 1.2,
            pattern_seed: 0x5eed_cafe,
        }
    }
}

/// Scale- and rotation-invariant keypoint detector and descriptor extractor.
///
/// Detects FAST corners over a Gaussian scale pyramid, assigns each corner
/// an intensity-centroid orientation, and samples a steered 256-bit binary
/// descriptor around it. Untextured grids legitimately produce zero
/// keypoints; callers decide whether that aborts their pipeline.
pub struct KeypointExtractor {
    config: ExtractorConfig,
    pattern: [[i8; 4]; 256],
}

impl Default for KeypointExtractor {
    fn default() -> Self {
        Self::new(ExtractorConfig::default())
    }
}

impl KeypointExtractor {
    /// Create an extractor, deriving the sampling pattern from the config seed.
    pub fn new(config: ExtractorConfig) -> Self {
        Self {
            pattern: sampling_pattern(config.pattern_seed),
            config,
        }
    }

    /// The configuration this extractor was built with.
    pub fn config(&self) -> &ExtractorConfig {
        &self.config
    }

    /// Detect keypoints and compute their descriptors in one pass.
    ///
    /// Returns index-aligned keypoint and descriptor vectors, truncated to
    /// the `max_keypoints` strongest responses across all pyramid levels.
    pub fn detect_and_compute<T: GridScalar>(
        &self,
        grid: &SampleGrid<T>,
    ) -> Result<(Vec<Keypoint>, Vec<Descriptor>), GridError> {
        let img = grid.to_f32();
        let pyramid = build_pyramid(&img, self.config.n_levels, self.config.downscale)?;

        let mut keypoints = Vec::new();
        let mut descriptors = Vec::new();

        for (level, level_img) in pyramid.iter().enumerate() {
            let corners = detect_corners(level_img, self.config.fast_threshold, self.config.fast_arc);
            if corners.is_empty() {
                continue;
            }

            let corners: Vec<Corner> = corners
                .into_iter()
                .filter(|c| inside_border(level_img.size(), c, EDGE_THRESHOLD))
                .collect();
            if corners.is_empty() {
                continue;
            }

            let orientations = corner_orientations(level_img, &corners);

            // Descriptors are sampled from a smoothed copy so single-pixel
            // noise does not flip bits.
            let blurred = gaussian_blur(level_img, 3, 2.0)?;

            let scale = self.config.downscale.powi(level as i32);
            for (corner, &angle) in corners.iter().zip(orientations.iter()) {
                descriptors.push(steered_descriptor(&blurred, corner, angle, &self.pattern));
                keypoints.push(Keypoint {
                    x: corner.x as f32 * scale,
                    y: corner.y as f32 * scale,
                    response: corner.score,
                    angle,
                    scale,
                });
            }
        }

        if keypoints.len() > self.config.max_keypoints {
            let mut indices: Vec<usize> = (0..keypoints.len()).collect();
            indices.sort_unstable_by(|&i, &j| {
                keypoints[j].response.total_cmp(&keypoints[i].response)
            });
            indices.truncate(self.config.max_keypoints);

            let best_keypoints = indices.iter().map(|&i| keypoints[i]).collect();
            let best_descriptors = indices.iter().map(|&i| descriptors[i]).collect();
            keypoints = best_keypoints;
            descriptors = best_descriptors;
        }

        Ok((keypoints, descriptors))
    }
}

fn inside_border(size: GridSize, corner: &Corner, distance: i32) -> bool {
    let max_col = size.width as i32 - distance;
    let max_row = size.height as i32 - distance;
    let x = corner.x as i32;
    let y = corner.y as i32;

    x >= distance && x < max_col && y >= distance && y < max_row
}

/// Intensity-centroid orientation over a disc around each corner.
fn corner_orientations(src: &SampleGrid<f32>, corners: &[Corner]) -> Vec<f32> {
    let src_slice = src.as_slice();

    let radius = (ORIENTATION_DIAMETER as i32 - 1) / 2;
    let radius2 = radius * radius;

    let height = src.height() as i32;
    let width = src.width() as i32;

    let mut orientations = Vec::with_capacity(corners.len());

    for corner in corners {
        let mut m01 = 0.0f32;
        let mut m10 = 0.0f32;

        for dr in -radius..=radius {
            let mut m01_tmp = 0.0f32;

            for dc in -radius..=radius {
                if dr * dr + dc * dc > radius2 {
                    continue;
                }

                let rr = corner.y as i32 + dr;
                let cc = corner.x as i32 + dc;
                if rr >= 0 && rr < height && cc >= 0 && cc < width {
                    let curr_pixel = src_slice[src.size().index(rr as usize, cc as usize)];
                    m10 += curr_pixel * dc as f32;
                    m01_tmp += curr_pixel;
                }
            }

            m01 += m01_tmp * dr as f32;
        }

        orientations.push(m01.atan2(m10));
    }

    orientations
}

/// Sample a steered binary descriptor, packing 8 comparisons per byte.
fn steered_descriptor(
    src: &SampleGrid<f32>,
    corner: &Corner,
    angle: f32,
    pattern: &[[i8; 4]; 256],
) -> Descriptor {
    let sin_a = angle.sin();
    let cos_a = angle.cos();

    let height = src.height() as i32;
    let width = src.width() as i32;
    let src_slice = src.as_slice();

    let kx = corner.x as i32;
    let ky = corner.y as i32;

    let mut descriptor = [0u8; DESCRIPTOR_BYTES];
    for (byte_idx, byte) in descriptor.iter_mut().enumerate() {
        let mut byte_val = 0u8;
        for bit_idx in 0..8 {
            let [dx0, dy0, dx1, dy1] = pattern[byte_idx * 8 + bit_idx];

            let (rx0, ry0) = rotate(dx0 as f32, dy0 as f32, sin_a, cos_a);
            let (rx1, ry1) = rotate(dx1 as f32, dy1 as f32, sin_a, cos_a);

            let x0 = kx + rx0;
            let y0 = ky + ry0;
            let x1 = kx + rx1;
            let y1 = ky + ry1;

            if x0 >= 0
                && x0 < width
                && y0 >= 0
                && y0 < height
                && x1 >= 0
                && x1 < width
                && y1 >= 0
                && y1 < height
            {
                let v0 = src_slice[src.size().index(y0 as usize, x0 as usize)];
                let v1 = src_slice[src.size().index(y1 as usize, x1 as usize)];
                if v0 < v1 {
                    byte_val |= 1 << bit_idx;
                }
            }
        }
        *byte = byte_val;
    }

    descriptor
}

#[inline]
fn rotate(dx: f32, dy: f32, sin_a: f32, cos_a: f32) -> (i32, i32) {
    let rx = (cos_a * dx - sin_a * dy).round() as i32;
    let ry = (sin_a * dx + cos_a * dy).round() as i32;
    (rx, ry)
}

/// Reproducible descriptor sampling pairs inside the patch disc.
///
/// The pairs are drawn from a seeded generator so that descriptors computed
/// by two extractors with the same seed are directly comparable.
fn sampling_pattern(seed: u64) -> [[i8; 4]; 256] {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut pattern = [[0i8; 4]; 256];

    for pair in pattern.iter_mut() {
        *pair = loop {
            let dx0 = rng.random_range(-PATCH_RADIUS..=PATCH_RADIUS);
            let dy0 = rng.random_range(-PATCH_RADIUS..=PATCH_RADIUS);
            let dx1 = rng.random_range(-PATCH_RADIUS..=PATCH_RADIUS);
            let dy1 = rng.random_range(-PATCH_RADIUS..=PATCH_RADIUS);

            let inside = dx0 * dx0 + dy0 * dy0 <= PATCH_RADIUS * PATCH_RADIUS
                && dx1 * dx1 + dy1 * dy1 <= PATCH_RADIUS * PATCH_RADIUS;
            let distinct = (dx0, dy0) != (dx1, dy1);

            if inside && distinct {
                break [dx0 as i8, dy0 as i8, dx1 as i8, dy1 as i8];
            }
        };
    }

    pattern
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_gradient_x(size: usize) -> SampleGrid<f32> {
        let denom = (size - 1).max(1) as f32;
        let data = (0..size * size)
            .map(|i| (i % size) as f32 / denom)
            .collect();
        SampleGrid::new([size, size].into(), data).unwrap()
    }

    fn make_gradient_y(size: usize) -> SampleGrid<f32> {
        let denom = (size - 1).max(1) as f32;
        let data = (0..size * size)
            .map(|i| (i / size) as f32 / denom)
            .collect();
        SampleGrid::new([size, size].into(), data).unwrap()
    }

    fn make_noise(size: usize, seed: u64) -> SampleGrid<u8> {
        let mut rng = StdRng::seed_from_u64(seed);
        let data = (0..size * size).map(|_| rng.random::<u8>()).collect();
        SampleGrid::new([size, size].into(), data).unwrap()
    }

    #[test]
    fn test_corner_orientations_gradient() {
        let size = 31;
        let center = Corner {
            x: size / 2,
            y: size / 2,
            score: 0.0,
        };

        let img_x = make_gradient_x(size);
        let ori_x = corner_orientations(&img_x, &[center])[0];
        assert!(ori_x.abs() < 0.1, "expected ~0 rad, got {ori_x}");

        let img_y = make_gradient_y(size);
        let ori_y = corner_orientations(&img_y, &[center])[0].abs();
        let expected = std::f32::consts::FRAC_PI_2;
        assert!(
            (ori_y - expected).abs() < 0.1,
            "expected ~pi/2 rad, got {ori_y}"
        );
    }

    #[test]
    fn test_pattern_is_reproducible_and_bounded() {
        let a = sampling_pattern(7);
        let b = sampling_pattern(7);
        assert_eq!(a, b);
        assert_ne!(a, sampling_pattern(8));

        for [dx0, dy0, dx1, dy1] in a {
            for (dx, dy) in [(dx0, dy0), (dx1, dy1)] {
                let r2 = dx as i32 * dx as i32 + dy as i32 * dy as i32;
                assert!(r2 <= PATCH_RADIUS * PATCH_RADIUS);
            }
        }
    }

    #[test]
    fn test_detect_and_compute_on_texture() -> Result<(), GridError> {
        let grid = make_noise(128, 42);
        let extractor = KeypointExtractor::default();
        let (keypoints, descriptors) = extractor.detect_and_compute(&grid)?;

        assert!(!keypoints.is_empty(), "textured grid should yield keypoints");
        assert_eq!(keypoints.len(), descriptors.len());
        assert!(keypoints.len() <= extractor.config().max_keypoints);

        for kp in &keypoints {
            assert!(kp.x >= 0.0 && (kp.x as usize) < grid.width());
            assert!(kp.y >= 0.0 && (kp.y as usize) < grid.height());
        }
        Ok(())
    }

    #[test]
    fn test_detect_and_compute_is_deterministic() -> Result<(), GridError> {
        let grid = make_noise(96, 3);
        let extractor = KeypointExtractor::default();

        let (kps_a, descs_a) = extractor.detect_and_compute(&grid)?;
        let (kps_b, descs_b) = extractor.detect_and_compute(&grid)?;

        assert_eq!(kps_a.len(), kps_b.len());
        assert_eq!(descs_a, descs_b);
        for (a, b) in kps_a.iter().zip(kps_b.iter()) {
            assert_eq!((a.x, a.y, a.angle), (b.x, b.y, b.angle));
        }
        Ok(())
    }

    #[test]
    fn test_flat_grid_yields_no_keypoints() -> Result<(), GridError> {
        let grid = SampleGrid::from_size_val([64, 64].into(), 128u8)?;
        let extractor = KeypointExtractor::default();
        let (keypoints, descriptors) = extractor.detect_and_compute(&grid)?;
        assert!(keypoints.is_empty());
        assert!(descriptors.is_empty());
        Ok(())
    }
}
