use georef_image::{GridError, GridSize, SampleGrid};

/// Normalized 1-D Gaussian kernel; radius 0 derives the radius from sigma.
fn gaussian_kernel(radius: usize, sigma: f32) -> Vec<f32> {
    let radius = if radius == 0 {
        (3.0 * sigma).ceil() as usize
    } else {
        radius
    };

    let mut kernel = Vec::with_capacity(2 * radius + 1);
    let denom = 2.0 * sigma * sigma;
    for i in 0..=2 * radius {
        let d = i as f32 - radius as f32;
        kernel.push((-d * d / denom).exp());
    }

    let sum: f32 = kernel.iter().sum();
    kernel.iter_mut().for_each(|k| *k /= sum);
    kernel
}

/// Separable Gaussian blur with clamped borders.
pub(crate) fn gaussian_blur(
    src: &SampleGrid<f32>,
    radius: usize,
    sigma: f32,
) -> Result<SampleGrid<f32>, GridError> {
    let kernel = gaussian_kernel(radius, sigma);
    let radius = kernel.len() / 2;
    let (cols, rows) = (src.cols(), src.rows());
    let src_slice = src.as_slice();

    // Horizontal pass.
    let mut tmp = vec![0.0f32; cols * rows];
    for y in 0..rows {
        for x in 0..cols {
            let mut acc = 0.0f32;
            for (i, &k) in kernel.iter().enumerate() {
                let sx = (x as i64 + i as i64 - radius as i64).clamp(0, cols as i64 - 1) as usize;
                acc += k * src_slice[y * cols + sx];
            }
            tmp[y * cols + x] = acc;
        }
    }

    // Vertical pass.
    let mut out = vec![0.0f32; cols * rows];
    for y in 0..rows {
        for x in 0..cols {
            let mut acc = 0.0f32;
            for (i, &k) in kernel.iter().enumerate() {
                let sy = (y as i64 + i as i64 - radius as i64).clamp(0, rows as i64 - 1) as usize;
                acc += k * tmp[sy * cols + x];
            }
            out[y * cols + x] = acc;
        }
    }

    SampleGrid::new(src.size(), out)
}

/// Bilinear resize with center-aligned sample positions.
fn resize_bilinear(src: &SampleGrid<f32>, new_size: GridSize) -> Result<SampleGrid<f32>, GridError> {
    let (src_cols, src_rows) = (src.cols(), src.rows());
    let (dst_cols, dst_rows) = (new_size.width, new_size.height);
    let src_slice = src.as_slice();

    let scale_x = src_cols as f32 / dst_cols as f32;
    let scale_y = src_rows as f32 / dst_rows as f32;

    let mut out = vec![0.0f32; dst_cols * dst_rows];
    for y in 0..dst_rows {
        let sy = ((y as f32 + 0.5) * scale_y - 0.5).clamp(0.0, src_rows as f32 - 1.0);
        let y0 = sy.floor() as usize;
        let y1 = (y0 + 1).min(src_rows - 1);
        let fy = sy - y0 as f32;

        for x in 0..dst_cols {
            let sx = ((x as f32 + 0.5) * scale_x - 0.5).clamp(0.0, src_cols as f32 - 1.0);
            let x0 = sx.floor() as usize;
            let x1 = (x0 + 1).min(src_cols - 1);
            let fx = sx - x0 as f32;

            let top = src_slice[y0 * src_cols + x0] * (1.0 - fx) + src_slice[y0 * src_cols + x1] * fx;
            let bottom =
                src_slice[y1 * src_cols + x0] * (1.0 - fx) + src_slice[y1 * src_cols + x1] * fx;
            out[y * dst_cols + x] = top * (1.0 - fy) + bottom * fy;
        }
    }

    SampleGrid::new(new_size, out)
}

/// One pyramid level down: anti-alias blur followed by a bilinear resize.
fn pyramid_reduce(src: &SampleGrid<f32>, downscale: f32) -> Result<SampleGrid<f32>, GridError> {
    let sigma = 2.0 * downscale / 6.0;
    let smoothed = gaussian_blur(src, 0, sigma)?;

    let new_h = (smoothed.height() as f32 / downscale).ceil() as usize;
    let new_w = (smoothed.width() as f32 / downscale).ceil() as usize;

    resize_bilinear(
        &smoothed,
        GridSize {
            width: new_w.max(1),
            height: new_h.max(1),
        },
    )
}

/// Build a scale pyramid; stops early once a level no longer shrinks.
pub(crate) fn build_pyramid(
    src: &SampleGrid<f32>,
    n_levels: usize,
    downscale: f32,
) -> Result<Vec<SampleGrid<f32>>, GridError> {
    let mut pyramid = Vec::with_capacity(n_levels);
    pyramid.push(src.clone());

    for _ in 1..n_levels {
        let current = pyramid.last().filter(|img| img.cols() >= 7 && img.rows() >= 7);
        let current = match current {
            Some(img) => img,
            None => break,
        };

        let next = pyramid_reduce(current, downscale)?;
        if next.size() == current.size() {
            break;
        }
        pyramid.push(next);
    }

    Ok(pyramid)
}
