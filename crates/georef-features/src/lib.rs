#![deny(missing_docs)]
#![doc = env!("CARGO_PKG_DESCRIPTION")]

/// FAST corner detection module.
pub mod fast;

/// image pyramid and smoothing utilities.
mod pyramid;

/// keypoint extraction module.
mod extractor;
pub use extractor::{
    Descriptor, ExtractorConfig, Keypoint, KeypointExtractor, DESCRIPTOR_BYTES,
};

/// descriptor matching module.
mod matcher;
pub use matcher::{match_descriptors, Correspondence, RATIO_THRESHOLD};
