#![doc = env!("CARGO_PKG_DESCRIPTION")]

#[doc(inline)]
pub use georef_image as image;

#[doc(inline)]
pub use georef_features as features;

#[doc(inline)]
pub use georef_geometry as geometry;

#[doc(inline)]
pub use georef_session as session;
