#![warn(clippy::all)]

//! Point cloud containers that either own their point memory or borrow it from an external producer
//!
//! The central type is [`PointGrid`](crate::containers::PointGrid), a (possibly organized) 2D grid of point records
//! that sits on top of a [`HybridBuffer`](crate::containers::HybridBuffer). A `HybridBuffer` either owns a growable
//! `Vec<T>` or wraps a fixed-length `&mut [T]` handed in by a sensor driver, a memory-mapped file or any other
//! foreign array, without copying it. On top of that, the point records can be viewed as a strided `nalgebra`
//! matrix of their scalar fields, again without copying.
//!
//! Start with the [containers](crate::containers) module for an overview.

pub extern crate nalgebra;

pub mod containers;
mod error;
pub use self::error::*;
/// Describes point record types that can be reinterpreted as scalar data
pub mod layout;
/// Frame metadata attached to point grids
pub mod meta;

#[cfg(test)]
pub(crate) mod test_utils;
