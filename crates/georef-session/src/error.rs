use georef_geometry::HomographyError;
use georef_image::GridError;

/// Which image of the pair an error refers to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ImageRole {
    /// The georeferenced reference raster.
    Reference,
    /// The ungeoreferenced secondary image.
    Secondary,
}

impl std::fmt::Display for ImageRole {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            ImageRole::Reference => write!(f, "reference"),
            ImageRole::Secondary => write!(f, "secondary"),
        }
    }
}

/// Failures of the georeferencing pipeline.
///
/// Every stage either produces a valid result or one of these; no stage
/// falls back to a default transform, because a silently wrong coordinate
/// is strictly worse than an explicit failure. Callers should surface the
/// variants distinctly rather than collapsing them into "no result".
#[derive(thiserror::Error, Debug)]
pub enum GeorefError {
    /// An image did not yield enough usable keypoints.
    #[error("the {image} image yielded {found} keypoints, need at least {required}")]
    InsufficientKeypoints {
        /// Which image fell short.
        image: ImageRole,
        /// Number of keypoints found.
        found: usize,
        /// Minimum required for matching to be able to succeed.
        required: usize,
    },

    /// Too few correspondences survived the ratio test.
    #[error("only {actual} correspondences survived the ratio test, need at least {required}")]
    InsufficientCorrespondences {
        /// Minimum required correspondences.
        required: usize,
        /// Actual ratio-test survivors.
        actual: usize,
    },

    /// No stable homography could be fit between the image pair.
    #[error("could not fit a stable homography between the image pair")]
    DegenerateHomography,

    /// The query pixel lies outside the secondary image.
    #[error("pixel ({x}, {y}) lies outside the secondary image extent {width}x{height}")]
    OutOfBounds {
        /// Query column.
        x: u32,
        /// Query row.
        y: u32,
        /// Secondary image width.
        width: usize,
        /// Secondary image height.
        height: usize,
    },

    /// The session has no secondary image to project from.
    #[error("no secondary image has been loaded into the session")]
    NoSecondaryImage,

    /// A working grid could not be constructed.
    #[error(transparent)]
    Grid(#[from] GridError),
}

impl From<HomographyError> for GeorefError {
    fn from(err: HomographyError) -> Self {
        match err {
            HomographyError::InsufficientCorrespondences { required, actual } => {
                Self::InsufficientCorrespondences { required, actual }
            }
            HomographyError::MismatchedLengths { .. }
            | HomographyError::Degenerate
            | HomographyError::NoConsensus => Self::DegenerateHomography,
        }
    }
}
