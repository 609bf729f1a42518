use glam::DVec2;

use crate::geo::{GeoPoint, GeoTransform};
use crate::homography::{Homography, SecondaryToReference};

/// Project a secondary-image pixel to a geographic coordinate.
///
/// The pixel is first mapped into reference-image pixel space through the
/// homography, then through the reference raster's geotransform. The
/// direction marker on the homography guarantees the two stages compose in
/// the right order. Pure function of its inputs: the same pixel with the
/// same transforms always yields a bit-identical result.
///
/// Returns `None` when the pixel maps to the line at infinity under the
/// homography, which cannot correspond to a location on the ground.
pub fn project_pixel(
    homography: &Homography<SecondaryToReference>,
    geo_transform: &GeoTransform,
    pixel: DVec2,
) -> Option<GeoPoint> {
    let reference_pixel = homography.project(pixel)?;
    let (world_x, world_y) = geo_transform.apply(reference_pixel.x, reference_pixel.y);
    Some(GeoPoint {
        latitude: world_y,
        longitude: world_x,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use glam::{DMat3, DVec3};

    #[test]
    fn identity_homography_maps_origin_to_geotransform_origin() {
        let h = Homography::identity();
        let gt = GeoTransform::from_gdal([8.55, 0.0005, 0.0, 47.37, 0.0, -0.0005]).unwrap();

        let point = project_pixel(&h, &gt, DVec2::new(0.0, 0.0)).unwrap();
        assert_eq!(point.longitude, gt.origin_x());
        assert_eq!(point.latitude, gt.origin_y());
    }

    #[test]
    fn longitude_moves_by_pixel_width_per_column() {
        let h = Homography::identity();
        let gt = GeoTransform::from_gdal([8.0, 0.01, 0.0, 47.0, 0.0, -0.01]).unwrap();

        let base = project_pixel(&h, &gt, DVec2::new(100.0, 40.0)).unwrap();
        for k in 1..8 {
            let p = project_pixel(&h, &gt, DVec2::new(100.0 + k as f64, 40.0)).unwrap();
            assert_relative_eq!(
                p.longitude - base.longitude,
                k as f64 * gt.pixel_width(),
                epsilon = 1e-12
            );
            assert_relative_eq!(p.latitude, base.latitude, epsilon = 1e-12);
        }
    }

    #[test]
    fn translation_homography_offsets_the_lookup() {
        // Secondary pixels sit 10 columns and 5 rows away from their
        // reference counterparts.
        let mat = DMat3::from_cols(
            DVec3::new(1.0, 0.0, 0.0),
            DVec3::new(0.0, 1.0, 0.0),
            DVec3::new(10.0, 5.0, 1.0),
        );
        let h: Homography<SecondaryToReference> = Homography::from_matrix(mat).unwrap();
        let gt = GeoTransform::from_gdal([100.0, 2.0, 0.0, 200.0, 0.0, -2.0]).unwrap();

        let point = project_pixel(&h, &gt, DVec2::new(3.0, 4.0)).unwrap();
        // Reference pixel (13, 9).
        assert_eq!(point.longitude, 100.0 + 13.0 * 2.0);
        assert_eq!(point.latitude, 200.0 - 9.0 * 2.0);
    }

    #[test]
    fn projection_is_bit_identical_across_calls() {
        let mat = DMat3::from_cols(
            DVec3::new(1.01, 0.003, 1e-5),
            DVec3::new(-0.002, 0.99, 2e-5),
            DVec3::new(7.5, -3.25, 1.0),
        );
        let h: Homography<SecondaryToReference> = Homography::from_matrix(mat).unwrap();
        let gt = GeoTransform::from_gdal([8.55, 0.0005, 0.0, 47.37, 0.0, -0.0005]).unwrap();

        let a = project_pixel(&h, &gt, DVec2::new(123.0, 456.0)).unwrap();
        let b = project_pixel(&h, &gt, DVec2::new(123.0, 456.0)).unwrap();
        assert_eq!(a.latitude.to_bits(), b.latitude.to_bits());
        assert_eq!(a.longitude.to_bits(), b.longitude.to_bits());
    }
}
