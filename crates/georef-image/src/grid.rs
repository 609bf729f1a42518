use num_traits::Bounded;

use crate::error::GridError;

/// Grid size in pixels
///
/// A struct to represent the size of a sample grid in pixels.
///
/// # Examples
///
/// ```
/// use georef_image::GridSize;
///
/// let grid_size = GridSize {
///   width: 10,
///   height: 20,
/// };
///
/// assert_eq!(grid_size.width, 10);
/// assert_eq!(grid_size.height, 20);
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GridSize {
    /// Width of the grid in pixels
    pub width: usize,
    /// Height of the grid in pixels
    pub height: usize,
}

impl GridSize {
    /// Linear index of the sample at `(row, col)` in row-major storage.
    #[inline]
    pub fn index(&self, row: usize, col: usize) -> usize {
        row * self.width + col
    }
}

impl std::fmt::Display for GridSize {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(
            f,
            "GridSize {{ width: {}, height: {} }}",
            self.width, self.height
        )
    }
}

impl From<[usize; 2]> for GridSize {
    fn from(size: [usize; 2]) -> Self {
        GridSize {
            width: size[0],
            height: size[1],
        }
    }
}

/// Trait for the scalar sample types a grid can hold.
///
/// `to_f32` maps the sample into the normalized `[0, 1]` range the feature
/// pipeline operates on, so that detector thresholds are independent of the
/// source bit depth.
pub trait GridScalar: Copy + Default + PartialOrd + Send + Sync + Bounded + Into<f32> {
    /// Convert the sample to a normalized f32 in `[0, 1]`.
    fn to_f32(self) -> f32 {
        self.into() / Self::max_value().into()
    }
}

impl GridScalar for u8 {}

impl GridScalar for u16 {}

impl GridScalar for f32 {
    // f32 grids are assumed to already be normalized.
    fn to_f32(self) -> f32 {
        self
    }
}

/// A single-channel, row-major grid of intensity samples.
///
/// The grid is immutable once constructed; the pipeline only ever borrows
/// read-only access to the sample data. Loading samples from a raster file
/// is the caller's concern.
///
/// # Examples
///
/// ```
/// use georef_image::{GridSize, SampleGrid};
///
/// let grid = SampleGrid::<u8>::new(
///     GridSize {
///         width: 4,
///         height: 2,
///     },
///     vec![0u8; 4 * 2],
/// )
/// .unwrap();
///
/// assert_eq!(grid.width(), 4);
/// assert_eq!(grid.height(), 2);
/// ```
#[derive(Clone, Debug)]
pub struct SampleGrid<T: GridScalar> {
    size: GridSize,
    data: Vec<T>,
}

impl<T: GridScalar> SampleGrid<T> {
    /// Create a new grid from sample data.
    ///
    /// # Errors
    ///
    /// Returns [`GridError::InvalidLength`] if the data length does not
    /// match `size.width * size.height`, and [`GridError::ZeroDimension`]
    /// if either dimension is zero.
    pub fn new(size: GridSize, data: Vec<T>) -> Result<Self, GridError> {
        if size.width == 0 || size.height == 0 {
            return Err(GridError::ZeroDimension(size.width, size.height));
        }
        if data.len() != size.width * size.height {
            return Err(GridError::InvalidLength(
                data.len(),
                size.width * size.height,
            ));
        }
        Ok(Self { size, data })
    }

    /// Create a grid filled with a constant value.
    pub fn from_size_val(size: GridSize, val: T) -> Result<Self, GridError> {
        Self::new(size, vec![val; size.width * size.height])
    }

    /// The size of the grid in pixels.
    #[inline]
    pub fn size(&self) -> GridSize {
        self.size
    }

    /// Width of the grid in pixels.
    #[inline]
    pub fn width(&self) -> usize {
        self.size.width
    }

    /// Height of the grid in pixels.
    #[inline]
    pub fn height(&self) -> usize {
        self.size.height
    }

    /// Number of rows, alias for [`Self::height`].
    #[inline]
    pub fn rows(&self) -> usize {
        self.size.height
    }

    /// Number of columns, alias for [`Self::width`].
    #[inline]
    pub fn cols(&self) -> usize {
        self.size.width
    }

    /// Borrow the sample data as a row-major slice.
    #[inline]
    pub fn as_slice(&self) -> &[T] {
        &self.data
    }

    /// The sample at pixel `(x, y)`, where `x` is the column.
    ///
    /// Returns `None` when the pixel lies outside the grid.
    pub fn get(&self, x: usize, y: usize) -> Option<T> {
        if x >= self.size.width || y >= self.size.height {
            return None;
        }
        Some(self.data[self.size.index(y, x)])
    }

    /// Convert the grid to normalized f32 samples in `[0, 1]`.
    pub fn to_f32(&self) -> SampleGrid<f32> {
        SampleGrid {
            size: self.size,
            data: self.data.iter().map(|&v| v.to_f32()).collect(),
        }
    }
}
