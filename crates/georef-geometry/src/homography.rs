use std::marker::PhantomData;

use glam::{DMat3, DVec2, DVec3};

/// Error types for homography estimation.
#[derive(thiserror::Error, Debug)]
pub enum HomographyError {
    /// Fewer correspondences than the estimator requires.
    #[error("homography estimation requires at least {required} correspondences, got {actual}")]
    InsufficientCorrespondences {
        /// Minimum number of correspondences required.
        required: usize,
        /// Actual number of correspondences provided.
        actual: usize,
    },

    /// Input slices have different lengths.
    #[error("mismatched correspondence lengths: {left} != {right}")]
    MismatchedLengths {
        /// Length of the source slice.
        left: usize,
        /// Length of the destination slice.
        right: usize,
    },

    /// The fitted transform is singular or numerically unstable.
    #[error("estimated homography is degenerate")]
    Degenerate,

    /// Random sampling never found a sufficiently supported model.
    #[error("random sampling found no consensus set")]
    NoConsensus,
}

/// Marker trait for the direction a [`Homography`] maps in.
///
/// Using the pixel space as part of the type makes it impossible to feed a
/// reference→secondary transform to a consumer expecting the opposite
/// mapping; the mix-up is a compile error instead of silently wrong
/// coordinates.
pub trait Direction: Copy + std::fmt::Debug {
    /// Marker of the inverse mapping.
    type Opposite: Direction;
    /// Human-readable direction name.
    const NAME: &'static str;
}

/// Maps secondary-image pixels into reference-image pixel space.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SecondaryToReference;

/// Maps reference-image pixels into secondary-image pixel space.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ReferenceToSecondary;

impl Direction for SecondaryToReference {
    type Opposite = ReferenceToSecondary;
    const NAME: &'static str = "secondary->reference";
}

impl Direction for ReferenceToSecondary {
    type Opposite = SecondaryToReference;
    const NAME: &'static str = "reference->secondary";
}

/// A planar projective transform between two pixel spaces, up to scale.
///
/// The matrix is stored normalized so that `h[2][2] == 1`, and is
/// guaranteed non-singular: construction through [`Homography::from_matrix`]
/// rejects degenerate matrices, and inversion preserves the invariant.
#[derive(Clone, Copy, PartialEq)]
pub struct Homography<D: Direction> {
    mat: DMat3,
    _direction: PhantomData<D>,
}

impl<D: Direction> std::fmt::Debug for Homography<D> {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.debug_struct("Homography")
            .field("direction", &D::NAME)
            .field("mat", &self.mat)
            .finish()
    }
}

impl<D: Direction> Homography<D> {
    /// Determinant magnitude below which a matrix is treated as singular.
    pub const MIN_DETERMINANT: f64 = 1e-8;

    /// The identity transform.
    pub fn identity() -> Self {
        Self {
            mat: DMat3::IDENTITY,
            _direction: PhantomData,
        }
    }

    /// Wrap a raw matrix, normalizing its scale and validating it.
    ///
    /// # Errors
    ///
    /// Returns [`HomographyError::Degenerate`] when the matrix cannot be
    /// scale-normalized or its determinant is too small to invert reliably.
    pub fn from_matrix(mat: DMat3) -> Result<Self, HomographyError> {
        let h22 = mat.z_axis.z;
        if h22.abs() < 1e-12 {
            return Err(HomographyError::Degenerate);
        }

        let mat = mat * (1.0 / h22);
        if mat.determinant().abs() < Self::MIN_DETERMINANT {
            return Err(HomographyError::Degenerate);
        }

        Ok(Self {
            mat,
            _direction: PhantomData,
        })
    }

    /// Borrow the normalized 3x3 matrix.
    pub fn matrix(&self) -> &DMat3 {
        &self.mat
    }

    /// Apply the transform to a pixel position.
    ///
    /// Returns `None` when the homogeneous scale collapses, i.e. the point
    /// maps to the line at infinity.
    pub fn project(&self, p: DVec2) -> Option<DVec2> {
        let hp = self.mat * DVec3::new(p.x, p.y, 1.0);
        if hp.z.abs() < 1e-12 {
            return None;
        }
        Some(DVec2::new(hp.x / hp.z, hp.y / hp.z))
    }

    /// The inverse transform, mapping in the opposite direction.
    pub fn inverse(&self) -> Homography<D::Opposite> {
        // Non-singular by construction, so the inverse exists; the scale
        // normalization is re-applied for the new matrix.
        let inv = self.mat.inverse();
        let h22 = inv.z_axis.z;
        let mat = if h22.abs() < 1e-12 { inv } else { inv * (1.0 / h22) };
        Homography {
            mat,
            _direction: PhantomData,
        }
    }
}
