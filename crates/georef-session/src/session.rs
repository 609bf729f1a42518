use georef_features::{
    match_descriptors, Correspondence, Descriptor, ExtractorConfig, Keypoint, KeypointExtractor,
    RATIO_THRESHOLD,
};
use georef_geometry::{
    estimate_homography, project_pixel, GeoPoint, GeoTransform, RansacHomography, RansacParams,
    MIN_MATCH_COUNT,
};
use georef_image::{GridScalar, SampleGrid};
use glam::DVec2;
use log::debug;

use crate::error::{GeorefError, ImageRole};

/// Minimum keypoints an image must contribute.
///
/// An image with fewer keypoints than the correspondence floor can never
/// produce enough matches, so the pipeline aborts before matching.
pub const MIN_KEYPOINT_COUNT: usize = MIN_MATCH_COUNT;

/// Derivation stage of an [`ImagePairSession`].
///
/// The stages advance strictly in order; typed failures leave the session
/// at the last stage it completed, and replacing an image resets it to
/// [`Stage::Uninitialized`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Stage {
    /// No derived state exists yet.
    Uninitialized,
    /// Keypoints and descriptors are cached for both images.
    KeypointsExtracted,
    /// Ratio-test correspondences are cached.
    Matched,
    /// A validated homography is cached; projections can be served.
    Ready,
}

/// Tunables for the whole pipeline of a session.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Keypoint extraction settings, shared by both images.
    pub extractor: ExtractorConfig,
    /// Nearest-neighbor ratio for descriptor matching.
    pub ratio_threshold: f32,
    /// Robust estimation settings for the homography fit.
    pub ransac: RansacParams,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            extractor: ExtractorConfig::default(),
            ratio_threshold: RATIO_THRESHOLD,
            ransac: RansacParams::default(),
        }
    }
}

/// Cached per-image derived state.
struct Features {
    keypoints: Vec<Keypoint>,
    descriptors: Vec<Descriptor>,
}

/// One reference/secondary image pair and everything derived from it.
///
/// The session owns the derivation state machine: keypoints, matches and
/// the homography are computed once, cached, and served to any number of
/// [`project`](Self::project) calls. Replacing either image invalidates all
/// derived state. Several sessions can coexist, each with its own pair.
pub struct ImagePairSession<T: GridScalar = u8> {
    reference: SampleGrid<T>,
    geo_transform: GeoTransform,
    secondary: Option<SampleGrid<T>>,

    extractor: KeypointExtractor,
    ratio_threshold: f32,
    ransac: RansacParams,

    stage: Stage,
    reference_features: Option<Features>,
    secondary_features: Option<Features>,
    matches: Option<Vec<Correspondence>>,
    homography: Option<RansacHomography>,
}

impl<T: GridScalar> ImagePairSession<T> {
    /// Create a session for a georeferenced reference raster.
    pub fn new(reference: SampleGrid<T>, geo_transform: GeoTransform, config: SessionConfig) -> Self {
        Self {
            reference,
            geo_transform,
            secondary: None,
            extractor: KeypointExtractor::new(config.extractor),
            ratio_threshold: config.ratio_threshold,
            ransac: config.ransac,
            stage: Stage::Uninitialized,
            reference_features: None,
            secondary_features: None,
            matches: None,
            homography: None,
        }
    }

    /// Load or replace the secondary image, invalidating all derived state.
    pub fn set_secondary(&mut self, grid: SampleGrid<T>) {
        self.secondary = Some(grid);
        self.invalidate();
    }

    /// Replace the reference raster, invalidating all derived state.
    pub fn set_reference(&mut self, grid: SampleGrid<T>, geo_transform: GeoTransform) {
        self.reference = grid;
        self.geo_transform = geo_transform;
        self.invalidate();
    }

    fn invalidate(&mut self) {
        self.stage = Stage::Uninitialized;
        self.reference_features = None;
        self.secondary_features = None;
        self.matches = None;
        self.homography = None;
    }

    /// The current derivation stage.
    pub fn stage(&self) -> Stage {
        self.stage
    }

    /// The reference raster's geotransform.
    pub fn geo_transform(&self) -> &GeoTransform {
        &self.geo_transform
    }

    /// The cached homography fit, once the session is [`Stage::Ready`].
    pub fn homography(&self) -> Option<&RansacHomography> {
        self.homography.as_ref()
    }

    /// The cached ratio-test correspondences, once matching has run.
    pub fn correspondences(&self) -> Option<&[Correspondence]> {
        self.matches.as_deref()
    }

    /// Derive everything needed to serve projections, caching each stage.
    ///
    /// Idempotent: once the session is [`Stage::Ready`] this returns
    /// immediately without recomputing anything.
    pub fn prepare(&mut self) -> Result<(), GeorefError> {
        if self.stage == Stage::Ready {
            return Ok(());
        }
        if self.secondary.is_none() {
            return Err(GeorefError::NoSecondaryImage);
        }

        if self.reference_features.is_none() {
            self.reference_features = Some(self.extract(ImageRole::Reference)?);
        }
        if self.secondary_features.is_none() {
            self.secondary_features = Some(self.extract(ImageRole::Secondary)?);
        }
        self.stage = Stage::KeypointsExtracted;

        // Borrow the caches back; they were stored just above.
        let (reference_features, secondary_features) =
            match (&self.reference_features, &self.secondary_features) {
                (Some(r), Some(s)) => (r, s),
                _ => return Err(GeorefError::NoSecondaryImage),
            };

        // Each secondary keypoint queries the reference descriptor pool.
        let matches = match_descriptors(
            &secondary_features.descriptors,
            &reference_features.descriptors,
            self.ratio_threshold,
        );
        debug!("{} correspondences survived the ratio test", matches.len());
        self.stage = Stage::Matched;

        if matches.len() < MIN_MATCH_COUNT {
            let actual = matches.len();
            self.matches = Some(matches);
            return Err(GeorefError::InsufficientCorrespondences {
                required: MIN_MATCH_COUNT,
                actual,
            });
        }

        let secondary_points: Vec<DVec2> = matches
            .iter()
            .map(|m| keypoint_position(&secondary_features.keypoints[m.query_idx]))
            .collect();
        let reference_points: Vec<DVec2> = matches
            .iter()
            .map(|m| keypoint_position(&reference_features.keypoints[m.train_idx]))
            .collect();
        self.matches = Some(matches);

        let fit = estimate_homography(&secondary_points, &reference_points, &self.ransac)?;
        debug!(
            "homography fit supported by {}/{} correspondences",
            fit.inlier_count,
            secondary_points.len()
        );

        self.homography = Some(fit);
        self.stage = Stage::Ready;
        Ok(())
    }

    /// Project a pixel selected in the secondary image to a geographic
    /// coordinate.
    ///
    /// Derives and caches the homography on first use; later calls reuse
    /// the cached fit and return bit-identical results for the same pixel.
    pub fn project(&mut self, x: u32, y: u32) -> Result<GeoPoint, GeorefError> {
        let (width, height) = match &self.secondary {
            Some(grid) => (grid.width(), grid.height()),
            None => return Err(GeorefError::NoSecondaryImage),
        };
        if x as usize >= width || y as usize >= height {
            return Err(GeorefError::OutOfBounds {
                x,
                y,
                width,
                height,
            });
        }

        self.prepare()?;

        let fit = match &self.homography {
            Some(fit) => fit,
            None => return Err(GeorefError::DegenerateHomography),
        };

        let pixel = DVec2::new(x as f64, y as f64);
        project_pixel(&fit.homography, &self.geo_transform, pixel)
            .ok_or(GeorefError::DegenerateHomography)
    }

    /// The sample under a secondary-image pixel, if one is loaded.
    pub fn secondary_sample(&self, x: u32, y: u32) -> Option<T> {
        self.secondary
            .as_ref()
            .and_then(|grid| grid.get(x as usize, y as usize))
    }

    fn extract(&self, image: ImageRole) -> Result<Features, GeorefError> {
        let grid = match image {
            ImageRole::Reference => &self.reference,
            // Checked by the caller before extraction starts.
            ImageRole::Secondary => match &self.secondary {
                Some(grid) => grid,
                None => return Err(GeorefError::NoSecondaryImage),
            },
        };

        let (keypoints, descriptors) = self.extractor.detect_and_compute(grid)?;
        debug!("{image} image: {} keypoints", keypoints.len());

        if keypoints.len() < MIN_KEYPOINT_COUNT {
            return Err(GeorefError::InsufficientKeypoints {
                image,
                found: keypoints.len(),
                required: MIN_KEYPOINT_COUNT,
            });
        }

        Ok(Features {
            keypoints,
            descriptors,
        })
    }
}

fn keypoint_position(kp: &Keypoint) -> DVec2 {
    DVec2::new(kp.x as f64, kp.y as f64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use georef_image::GridError;

    fn flat_grid(size: usize) -> SampleGrid<u8> {
        SampleGrid::from_size_val([size, size].into(), 127u8).unwrap()
    }

    fn geo() -> GeoTransform {
        GeoTransform::from_gdal([30.0, 0.001, 0.0, 50.0, 0.0, -0.001]).unwrap()
    }

    #[test]
    fn project_without_secondary_fails() {
        let mut session = ImagePairSession::new(flat_grid(64), geo(), SessionConfig::default());
        assert!(matches!(
            session.project(0, 0),
            Err(GeorefError::NoSecondaryImage)
        ));
    }

    #[test]
    fn out_of_bounds_is_reported_before_any_derivation() {
        let mut session = ImagePairSession::new(flat_grid(64), geo(), SessionConfig::default());
        session.set_secondary(flat_grid(32));

        // A flat pair can never be georeferenced, but the bounds check must
        // fire first and leave the state machine untouched.
        assert!(matches!(
            session.project(32, 0),
            Err(GeorefError::OutOfBounds {
                x: 32,
                y: 0,
                width: 32,
                height: 32,
            })
        ));
        assert_eq!(session.stage(), Stage::Uninitialized);
    }

    #[test]
    fn flat_images_fail_with_insufficient_keypoints() {
        let mut session = ImagePairSession::new(flat_grid(64), geo(), SessionConfig::default());
        session.set_secondary(flat_grid(64));

        match session.project(10, 10) {
            Err(GeorefError::InsufficientKeypoints {
                image: ImageRole::Reference,
                found: 0,
                required,
            }) => assert_eq!(required, MIN_KEYPOINT_COUNT),
            other => panic!("expected InsufficientKeypoints, got {other:?}"),
        }
        assert_eq!(session.stage(), Stage::Uninitialized);
    }

    #[test]
    fn replacing_the_secondary_resets_the_stage() -> Result<(), GridError> {
        let mut session = ImagePairSession::new(flat_grid(64), geo(), SessionConfig::default());
        session.set_secondary(flat_grid(64));
        let _ = session.project(1, 1);

        session.set_secondary(flat_grid(48));
        assert_eq!(session.stage(), Stage::Uninitialized);
        assert!(session.homography().is_none());
        assert!(session.correspondences().is_none());
        Ok(())
    }

    #[test]
    fn secondary_sample_reads_the_clicked_pixel() -> Result<(), GridError> {
        let mut session = ImagePairSession::new(flat_grid(16), geo(), SessionConfig::default());
        assert_eq!(session.secondary_sample(0, 0), None);

        let grid = SampleGrid::new([2, 2].into(), vec![9u8, 8, 7, 6])?;
        session.set_secondary(grid);
        assert_eq!(session.secondary_sample(1, 0), Some(8));
        assert_eq!(session.secondary_sample(0, 1), Some(7));
        assert_eq!(session.secondary_sample(2, 0), None);
        Ok(())
    }
}
