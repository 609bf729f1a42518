use georef_image::SampleGrid;
use rayon::prelude::*;
use std::cmp::Ordering;
use std::collections::BinaryHeap;

/// A corner candidate with its position and response score.
#[derive(Clone, Copy, Debug)]
pub struct Corner {
    /// Column of the corner in pixels.
    pub x: usize,
    /// Row of the corner in pixels.
    pub y: usize,
    /// Sum-of-absolute-differences response over the contiguous arc.
    pub score: f32,
}

// Wrapper to order corners by score inside the NMS heap.
#[derive(Copy, Clone)]
struct RankedCorner(Corner);

impl Ord for RankedCorner {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.score.total_cmp(&other.0.score)
    }
}

impl PartialOrd for RankedCorner {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for RankedCorner {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for RankedCorner {}

/// Offsets of the 16-pixel Bresenham circle of radius 3 for a row stride.
fn circle_offsets(cols: i32) -> [i32; 16] {
    [
        -3 * cols,     // 1
        -3 * cols + 1, // 2
        -2 * cols + 2, // 3
        -cols + 3,     // 4
        3,             // 5
        cols + 3,      // 6
        2 * cols + 2,  // 7
        3 * cols + 1,  // 8
        3 * cols,      // 9
        3 * cols - 1,  // 10
        2 * cols - 2,  // 11
        cols - 3,      // 12
        -3,            // 13
        -cols - 3,     // 14
        -2 * cols - 2, // 15
        -3 * cols - 1, // 16
    ]
}

/// FAST segment test with a sum-of-absolute-differences score.
///
/// Returns `Some(score)` when `arc_length` consecutive circle pixels are all
/// brighter or all darker than the center by more than `threshold`.
fn corner_score(
    src: &[f32],
    pixel_idx: i32,
    offsets: &[i32; 16],
    threshold: f32,
    arc_length: u8,
) -> Option<f32> {
    let center = src[pixel_idx as usize];
    let lower = center - threshold;
    let upper = center + threshold;

    let pixel_at = |off_idx: usize| src[(pixel_idx + offsets[off_idx]) as usize];

    // High-speed rejection on the four compass points: a passing arc of
    // length >= 9 must cover at least three of them.
    let p1 = pixel_at(0);
    let p5 = pixel_at(4);
    let p9 = pixel_at(8);
    let p13 = pixel_at(12);

    let brighter =
        (p1 > upper) as u8 + (p5 > upper) as u8 + (p9 > upper) as u8 + (p13 > upper) as u8;
    let darker = (p1 < lower) as u8 + (p5 < lower) as u8 + (p9 < lower) as u8 + (p13 < lower) as u8;

    if brighter < 3 && darker < 3 {
        return None;
    }

    let pixels = [
        p1,
        pixel_at(1),
        pixel_at(2),
        pixel_at(3),
        p5,
        pixel_at(5),
        pixel_at(6),
        pixel_at(7),
        p9,
        pixel_at(9),
        pixel_at(10),
        pixel_at(11),
        p13,
        pixel_at(13),
        pixel_at(14),
        pixel_at(15),
    ];

    let mut bright_bitmask = 0u16;
    let mut dark_bitmask = 0u16;
    for (i, &val) in pixels.iter().enumerate() {
        if val > upper {
            bright_bitmask |= 1 << i;
        }
        if val < lower {
            dark_bitmask |= 1 << i;
        }
    }

    // Slide a window of arc_length bits around the circle; a window fully
    // covered by either bitmask is a contiguous passing arc.
    let window_mask = (1u16 << arc_length) - 1;

    let mut arc_start = None;
    for shift in 0..16u32 {
        let curr_window = window_mask.rotate_left(shift);
        if (bright_bitmask & curr_window).count_ones() >= arc_length as u32
            || (dark_bitmask & curr_window).count_ones() >= arc_length as u32
        {
            arc_start = Some(shift as usize);
            break;
        }
    }

    let arc_start = arc_start?;

    // Sum of absolute differences over the arc, less the threshold margin.
    let mut score = 0.0f32;
    for offset in arc_start..arc_start + arc_length as usize {
        let curr_idx = offset.rem_euclid(16);
        score += (center - pixels[curr_idx]).abs() - threshold;
    }

    Some(score)
}

/// Detect FAST corners with non-maximum suppression.
///
/// # Arguments
///
/// * `src` - The source grid with normalized samples.
/// * `threshold` - Contrast threshold in normalized intensity units.
/// * `arc_length` - Number of consecutive circle pixels that must all be
///   brighter or darker than the center (9 for FAST-9, at most 15).
///
/// # Returns
///
/// Corners sorted implicitly by suppression order, each with its SAD score.
pub fn detect_corners(src: &SampleGrid<f32>, threshold: f32, arc_length: u8) -> Vec<Corner> {
    let (cols, rows) = (src.cols() as i32, src.rows() as i32);
    if cols < 7 || rows < 7 {
        return Vec::new();
    }

    let offsets = circle_offsets(cols);

    // Process rows in parallel.
    let candidates: Vec<Corner> = (3..rows - 3)
        .into_par_iter()
        .flat_map(|y| {
            let row_start_idx = y * cols;
            let mut row_corners = Vec::new();

            for x in 3..cols - 3 {
                if let Some(score) =
                    corner_score(src.as_slice(), row_start_idx + x, &offsets, threshold, arc_length)
                {
                    row_corners.push(Corner {
                        x: x as usize,
                        y: y as usize,
                        score,
                    });
                }
            }

            row_corners
        })
        .collect();

    // Non-maximum suppression over 3x3 neighborhoods, strongest first.
    let mut heap = BinaryHeap::with_capacity(candidates.len());
    for corner in candidates {
        heap.push(RankedCorner(corner));
    }

    let mut ignore_map = vec![false; (rows * cols) as usize];
    let mut corners = Vec::new();
    while let Some(RankedCorner(corner)) = heap.pop() {
        let idx = corner.y * cols as usize + corner.x;
        if ignore_map[idx] {
            continue;
        }

        corners.push(corner);

        for dy in -1i32..=1 {
            for dx in -1i32..=1 {
                if dx == 0 && dy == 0 {
                    continue;
                }
                let nx = corner.x as i32 + dx;
                let ny = corner.y as i32 + dy;
                ignore_map[(ny * cols + nx) as usize] = true;
            }
        }
    }

    corners
}
