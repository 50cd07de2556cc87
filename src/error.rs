use std::fmt::Display;

use thiserror::Error;

/// Errors that can occur when accessing or mutating point containers.
///
/// All of these indicate a programming error on the caller side and are never retried internally. An operation
/// that fails leaves the container in the state it had before the call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// Bounds-checked access with an index that is not smaller than the current length
    #[error("index {index} is out of range for a container with {len} points")]
    OutOfRange { index: usize, len: usize },

    /// 2D access on a grid that has no row structure
    #[error("can't use 2D indexing with an unorganized point grid (height is {height})")]
    UnorganizedAccess { height: usize },

    /// A length-changing operation on a buffer that borrows external memory
    #[error("can't change the length of a borrowed buffer from {capacity} to {requested} points")]
    CapacityViolation { requested: usize, capacity: usize },

    /// External memory is shorter than the requested grid dimensions
    #[error("external memory holds {available} points, but {required} are required")]
    StorageTooSmall { required: usize, available: usize },

    /// Explicit shape that does not match the number of points
    #[error("shape {width}x{height} does not match the point count {len}")]
    ShapeMismatch {
        width: usize,
        height: usize,
        len: usize,
    },

    /// Parameters of a matrix view that can't be expressed over the point records
    #[error("invalid matrix view (dim {dim}, stride {stride}, offset {offset}): {reason}")]
    InvalidMatrixView {
        dim: usize,
        stride: usize,
        offset: usize,
        reason: String,
    },
}

pub type Result<T> = std::result::Result<T, Error>;

/// Non-fatal outcome of a width-qualified assignment. The assignment itself always succeeds, but the grid falls back
/// to an unorganized shape (`height == 1`, `width == len`) if the requested width can't be honored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShapeDiagnostic {
    /// The requested width was zero
    ZeroWidth { size: usize },
    /// The requested width does not divide the number of assigned points
    WidthMismatch { width: usize, size: usize },
}

impl Display for ShapeDiagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ShapeDiagnostic::ZeroWidth { size } => write!(
                f,
                "Assignment with width equal to 0, setting width to the size of the grid ({}) and height to 1",
                size
            ),
            ShapeDiagnostic::WidthMismatch { width, size } => write!(
                f,
                "Mismatch in assignment. Requested width ({}) doesn't divide provided size ({}) cleanly. Setting height to 1",
                width, size
            ),
        }
    }
}
