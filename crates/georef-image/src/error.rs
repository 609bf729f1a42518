/// An error type for sample grid construction and access.
#[derive(thiserror::Error, Debug)]
pub enum GridError {
    /// Error when the sample data length does not match the grid size.
    #[error("Data length ({0}) does not match the grid size ({1})")]
    InvalidLength(usize, usize),

    /// Error when a grid dimension is zero.
    #[error("Grid dimensions must be non-zero, got {0}x{1}")]
    ZeroDimension(usize, usize),
}
