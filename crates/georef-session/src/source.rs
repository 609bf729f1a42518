use std::path::Path;

use georef_geometry::GeoTransform;
use georef_image::SampleGrid;

/// Loader seam for raster decoding, which this workspace deliberately
/// excludes.
///
/// Implement this trait with the raster library of your choice (GDAL
/// bindings, a TIFF reader plus a world file, a test fixture) and feed the
/// resulting grids into an
/// [`ImagePairSession`](crate::ImagePairSession). The pipeline itself only
/// ever sees in-memory grids.
pub trait RasterSource {
    /// Error type produced by the underlying driver.
    type Error;

    /// Load the georeferenced reference raster: a grayscale sample grid
    /// and its affine geotransform.
    fn load_reference(&mut self, path: &Path)
        -> Result<(SampleGrid<u8>, GeoTransform), Self::Error>;

    /// Load an ungeoreferenced secondary image as a grayscale grid.
    fn load_secondary(&mut self, path: &Path) -> Result<SampleGrid<u8>, Self::Error>;
}
