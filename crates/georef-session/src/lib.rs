#![deny(missing_docs)]
#![doc = env!("CARGO_PKG_DESCRIPTION")]

/// error taxonomy module.
mod error;
pub use error::{GeorefError, ImageRole};

/// image pair session module.
mod session;
pub use session::{ImagePairSession, SessionConfig, Stage, MIN_KEYPOINT_COUNT};

/// raster loading seam module.
mod source;
pub use source::RasterSource;
