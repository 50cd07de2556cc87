//! Containers for point records.
//!
//! # Memory ownership
//!
//! All containers in this module store their points in a [`HybridBuffer`], which either owns its memory (like a
//! `Vec<T>`) or borrows external memory mutably (like a `&mut [T]`). The second mode allows wrapping memory of
//! another library (e.g. a sensor driver or a GPU mapping) without copying. Reading and writing points works the
//! same in both modes, but a borrowing buffer can never change its length, since it can't reallocate memory it does
//! not own. Length-changing operations on a borrowing buffer fail with [`crate::Error::CapacityViolation`] and leave
//! the buffer untouched.
//!
//! # Grids
//!
//! A [`PointGrid`] adds a 2D image structure (`width` and `height`) and acquisition metadata to a buffer of points.
//! Grids can be concatenated (see [`concatenate`]) and subsets of a grid can be copied by index (see
//! [`PointGrid::from_indices`]).
//!
//! # Matrix views
//!
//! The scalar fields of a range of points can be viewed as a strided `nalgebra` matrix without copying, see
//! [`matrix_view`] and [`MatrixViewParams`]. This requires the point type to implement
//! [`crate::layout::PointRecord`].

mod hybrid_buffer;
pub use self::hybrid_buffer::*;

mod point_grid;
pub use self::point_grid::*;

mod concatenation;
pub use self::concatenation::*;

mod matrix_view;
pub use self::matrix_view::*;
