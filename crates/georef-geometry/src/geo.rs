/// Error type for geographic transform construction.
#[derive(thiserror::Error, Debug)]
pub enum GeoTransformError {
    /// Error when a pixel axis has zero extent.
    #[error("pixel size must be non-zero, got width {0} and height {1}")]
    DegenerateAxis(f64, f64),
}

/// Affine transform from raster pixel indices to world coordinates.
///
/// The six coefficients follow the GDAL convention:
///
/// ```text
/// world_x = origin_x + col * pixel_width  + row * row_rotation
/// world_y = origin_y + col * col_rotation + row * pixel_height
/// ```
///
/// For a north-up raster both rotation terms are zero and `pixel_height`
/// is negative (world y decreases as rows grow downward).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GeoTransform {
    origin_x: f64,
    pixel_width: f64,
    row_rotation: f64,
    origin_y: f64,
    col_rotation: f64,
    pixel_height: f64,
}

impl GeoTransform {
    /// Create a transform from its six coefficients.
    ///
    /// # Errors
    ///
    /// Returns [`GeoTransformError::DegenerateAxis`] when either pixel
    /// dimension is zero; such a transform collapses the raster onto a line.
    pub fn new(
        origin_x: f64,
        pixel_width: f64,
        row_rotation: f64,
        origin_y: f64,
        col_rotation: f64,
        pixel_height: f64,
    ) -> Result<Self, GeoTransformError> {
        if pixel_width == 0.0 || pixel_height == 0.0 {
            return Err(GeoTransformError::DegenerateAxis(pixel_width, pixel_height));
        }
        Ok(Self {
            origin_x,
            pixel_width,
            row_rotation,
            origin_y,
            col_rotation,
            pixel_height,
        })
    }

    /// Create a transform from coefficients in GDAL `GetGeoTransform` order:
    /// `[origin_x, pixel_width, row_rotation, origin_y, col_rotation, pixel_height]`.
    pub fn from_gdal(coefficients: [f64; 6]) -> Result<Self, GeoTransformError> {
        Self::new(
            coefficients[0],
            coefficients[1],
            coefficients[2],
            coefficients[3],
            coefficients[4],
            coefficients[5],
        )
    }

    /// Map a (possibly sub-pixel) raster position to world coordinates.
    ///
    /// `col` counts along x, `row` along y; returns `(world_x, world_y)`.
    pub fn apply(&self, col: f64, row: f64) -> (f64, f64) {
        (
            self.origin_x + col * self.pixel_width + row * self.row_rotation,
            self.origin_y + col * self.col_rotation + row * self.pixel_height,
        )
    }

    /// World x of the raster origin.
    pub fn origin_x(&self) -> f64 {
        self.origin_x
    }

    /// World y of the raster origin.
    pub fn origin_y(&self) -> f64 {
        self.origin_y
    }

    /// World extent of one pixel along x.
    pub fn pixel_width(&self) -> f64 {
        self.pixel_width
    }

    /// World extent of one pixel along y.
    pub fn pixel_height(&self) -> f64 {
        self.pixel_height
    }
}

/// A geographic coordinate, the terminal output of the pipeline.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GeoPoint {
    /// Latitude in decimal degrees.
    pub latitude: f64,
    /// Longitude in decimal degrees.
    pub longitude: f64,
}

impl std::fmt::Display for GeoPoint {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(
            f,
            "Latitude: {:.6}, Longitude: {:.6}",
            self.latitude, self.longitude
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn geo_transform_rejects_zero_pixel_size() {
        assert!(matches!(
            GeoTransform::new(0.0, 0.0, 0.0, 0.0, 0.0, -1.0),
            Err(GeoTransformError::DegenerateAxis(_, _))
        ));
        assert!(GeoTransform::new(0.0, 1.0, 0.0, 0.0, 0.0, -1.0).is_ok());
    }

    #[test]
    fn geo_transform_origin_maps_to_origin() -> Result<(), GeoTransformError> {
        let gt = GeoTransform::from_gdal([30.5, 0.001, 0.0, 50.25, 0.0, -0.001])?;
        let (x, y) = gt.apply(0.0, 0.0);
        assert_eq!(x, 30.5);
        assert_eq!(y, 50.25);
        Ok(())
    }

    #[test]
    fn geo_transform_applies_rotation_terms() -> Result<(), GeoTransformError> {
        let gt = GeoTransform::new(10.0, 2.0, 0.5, 20.0, -0.25, -2.0)?;
        let (x, y) = gt.apply(3.0, 4.0);
        assert_relative_eq!(x, 10.0 + 3.0 * 2.0 + 4.0 * 0.5);
        assert_relative_eq!(y, 20.0 + 3.0 * -0.25 + 4.0 * -2.0);
        Ok(())
    }

    #[test]
    fn geo_transform_longitude_is_linear_in_column() -> Result<(), GeoTransformError> {
        let gt = GeoTransform::from_gdal([8.0, 0.01, 0.0, 47.0, 0.0, -0.01])?;
        let (x0, _) = gt.apply(100.0, 40.0);
        for k in 1..10 {
            let (xk, _) = gt.apply(100.0 + k as f64, 40.0);
            assert_relative_eq!(xk - x0, k as f64 * gt.pixel_width(), epsilon = 1e-12);
        }
        Ok(())
    }

    #[test]
    fn geo_point_displays_six_decimals() {
        let p = GeoPoint {
            latitude: 50.123456789,
            longitude: -8.5,
        };
        assert_eq!(p.to_string(), "Latitude: 50.123457, Longitude: -8.500000");
    }
}
