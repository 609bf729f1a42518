#![deny(missing_docs)]
#![doc = env!("CARGO_PKG_DESCRIPTION")]

/// direct linear transform solver module.
mod dlt;
pub use dlt::homography_dlt;

/// geographic transform module.
mod geo;
pub use geo::{GeoPoint, GeoTransform, GeoTransformError};

/// planar projective transform module.
mod homography;
pub use homography::{
    Direction, Homography, HomographyError, ReferenceToSecondary, SecondaryToReference,
};

/// coordinate projection module.
mod projector;
pub use projector::project_pixel;

/// robust estimation module.
mod ransac;
pub use ransac::{estimate_homography, RansacHomography, RansacParams, MIN_MATCH_COUNT};
