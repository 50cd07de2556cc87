use std::{
    ops::{Index, IndexMut, Range},
    sync::Arc,
};

use log::warn;
use nalgebra::{UnitQuaternion, Vector4};
use static_assertions::assert_impl_all;

use crate::{meta::Header, Error, Result, ShapeDiagnostic};

use super::{BufferMode, HybridBuffer};

/// A collection of point records with an optional 2D image structure, stored in a [`HybridBuffer`].
///
/// A grid with `height > 1` is *organized*: its points are arranged in rows of `width` points each, like the pixels
/// of a depth image, and can be addressed by `(column, row)`. A grid with `height == 1` (or `0` when it was cleared)
/// is an unorganized, flat list of points.
///
/// # Shape invariant
///
/// After every mutating method of this type, `width * height == len`. Single-dimension operations (`resize`, `push`,
/// `insert`, `erase`, `assign` etc.) keep the current shape if it still matches the new length and collapse the grid
/// into an unorganized one (`width = len`, `height = 1`) otherwise. Two-dimension operations (`resize_2d`,
/// `assign_2d`) set the requested shape.
///
/// For batched edits, [`PointGrid::transient`] gives direct access to the underlying buffer. Mutations through it do
/// not touch `width` and `height`. Call [`PointGrid::reconcile_shape`] or [`PointGrid::reshape`] once done.
///
/// # Memory
///
/// The points either live in memory owned by the grid or in external memory borrowed for the lifetime `'a`, see
/// [`PointGrid::from_slice`]. Grids over borrowed memory can't change their number of points.
#[derive(Debug, Clone, PartialEq)]
pub struct PointGrid<'a, T> {
    /// Acquisition metadata of the points
    pub header: Header,
    points: HybridBuffer<'a, T>,
    width: usize,
    height: usize,
    /// `true` if no point contains invalid (NaN or Inf) values. This is a hint maintained by the caller, it is never
    /// checked against the actual points
    pub is_dense: bool,
    /// Sensor acquisition pose (origin/translation)
    pub sensor_origin: Vector4<f32>,
    /// Sensor acquisition pose (rotation)
    pub sensor_orientation: UnitQuaternion<f32>,
}

assert_impl_all!(PointGrid<'static, [f32; 4]>: Send, Sync);

impl<'a, T> PointGrid<'a, T> {
    /// Creates an empty grid with `width == height == 0` that is dense and has an identity sensor pose
    pub fn new() -> Self {
        Self::with_points(HybridBuffer::new(), 0, 0)
    }

    /// Creates an unorganized grid (`height == 1`) from the given buffer
    pub fn from_buffer(points: HybridBuffer<'a, T>) -> Self {
        let width = points.len();
        Self::with_points(points, width, 1)
    }

    /// Creates a grid of `width * height` points over external memory, without copying. Points beyond
    /// `width * height` in `data` are not part of the grid. Mutating the points of the grid mutates `data`.
    ///
    /// ```
    /// # use cloud_span::containers::PointGrid;
    /// let mut depth_image = vec![0.0f32; 640 * 480];
    /// let mut grid = PointGrid::from_slice(&mut depth_image, 640, 480).unwrap();
    /// assert!(grid.is_organized());
    /// *grid.at_mut(10, 2).unwrap() = 1.5;
    /// drop(grid);
    /// assert_eq!(1.5, depth_image[2 * 640 + 10]);
    /// ```
    ///
    /// # Errors
    ///
    /// Returns [`Error::StorageTooSmall`] if `data` holds less than `width * height` points. A shape whose product
    /// overflows `usize` is reported as requiring `usize::MAX` points
    pub fn from_slice(data: &'a mut [T], width: usize, height: usize) -> Result<Self> {
        let required = match shape_len(width, height) {
            Some(required) if required <= data.len() => required,
            required => {
                return Err(Error::StorageTooSmall {
                    required: required.unwrap_or(usize::MAX),
                    available: data.len(),
                })
            }
        };
        Ok(Self::with_points(
            HybridBuffer::borrowed(&mut data[..required]),
            width,
            height,
        ))
    }

    /// Creates a grid of `width * height` points starting at `data`, without copying
    ///
    /// # Safety
    ///
    /// `data` must be valid for `width * height` points for the lifetime `'a`, see [`HybridBuffer::from_raw_parts`]
    ///
    /// # Panics
    ///
    /// If `width * height` overflows `usize`
    pub unsafe fn from_raw_parts(data: *mut T, width: usize, height: usize) -> Self {
        let len = shape_len_or_panic(width, height);
        Self::with_points(HybridBuffer::from_raw_parts(data, len), width, height)
    }

    fn with_points(points: HybridBuffer<'a, T>, width: usize, height: usize) -> Self {
        Self {
            header: Header::default(),
            points,
            width,
            height,
            is_dense: true,
            sensor_origin: Vector4::zeros(),
            sensor_orientation: UnitQuaternion::identity(),
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// Returns `true` if this grid is arranged in rows, i.e. `height > 1`
    pub fn is_organized(&self) -> bool {
        self.height > 1
    }

    /// Returns `true` if `width * height` equals the number of points. This can only be `false` after mutations
    /// through [`PointGrid::transient`]
    pub fn is_consistent(&self) -> bool {
        shape_len(self.width, self.height) == Some(self.points.len())
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Returns whether the points are owned by this grid or borrowed from external memory
    pub fn mode(&self) -> BufferMode {
        self.points.mode()
    }

    /// Returns the underlying buffer
    pub fn points(&self) -> &HybridBuffer<'a, T> {
        &self.points
    }

    pub fn as_slice(&self) -> &[T] {
        self.points.as_slice()
    }

    pub fn as_mut_slice(&mut self) -> &mut [T] {
        self.points.as_mut_slice()
    }

    /// Raw pointer to the first point. Invalidated by every reallocation, see [`HybridBuffer`]
    pub fn as_ptr(&self) -> *const T {
        self.points.as_ptr()
    }

    pub fn as_mut_ptr(&mut self) -> *mut T {
        self.points.as_mut_ptr()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.points.iter()
    }

    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, T> {
        self.points.iter_mut()
    }

    pub fn first(&self) -> Option<&T> {
        self.points.first()
    }

    pub fn first_mut(&mut self) -> Option<&mut T> {
        self.points.first_mut()
    }

    pub fn last(&self) -> Option<&T> {
        self.points.last()
    }

    pub fn last_mut(&mut self) -> Option<&mut T> {
        self.points.last_mut()
    }

    /// Bounds-checked access by linear index
    pub fn get(&self, index: usize) -> Result<&T> {
        self.points.get(index)
    }

    pub fn get_mut(&mut self, index: usize) -> Result<&mut T> {
        self.points.get_mut(index)
    }

    /// Returns the point at `(column, row)`. Only works on organized grids
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnorganizedAccess`] if `height <= 1` and [`Error::OutOfRange`] if `row * width + column` is
    /// not a valid index
    pub fn at(&self, column: usize, row: usize) -> Result<&T> {
        let index = self.checked_index_2d(column, row)?;
        self.points.get(index)
    }

    /// Mutable version of [`PointGrid::at`]
    pub fn at_mut(&mut self, column: usize, row: usize) -> Result<&mut T> {
        let index = self.checked_index_2d(column, row)?;
        self.points.get_mut(index)
    }

    /// Returns the points of the given `row` of an organized grid
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnorganizedAccess`] if `height <= 1` and [`Error::OutOfRange`] if `row >= height`
    pub fn row(&self, row: usize) -> Result<&[T]> {
        if !self.is_organized() {
            return Err(Error::UnorganizedAccess {
                height: self.height,
            });
        }
        let out_of_range = Error::OutOfRange {
            index: row,
            len: self.height,
        };
        let start = match row.checked_mul(self.width) {
            Some(start) => start,
            None => return Err(out_of_range),
        };
        let end = match start.checked_add(self.width) {
            Some(end) => end,
            None => return Err(out_of_range),
        };
        self.as_slice().get(start..end).ok_or(out_of_range)
    }

    fn checked_index_2d(&self, column: usize, row: usize) -> Result<usize> {
        if !self.is_organized() {
            return Err(Error::UnorganizedAccess {
                height: self.height,
            });
        }
        row.checked_mul(self.width)
            .and_then(|offset| offset.checked_add(column))
            .ok_or(Error::OutOfRange {
                index: usize::MAX,
                len: self.len(),
            })
    }

    /// Gives direct access to the buffer for batched mutations. Changes through the returned buffer do **not** update
    /// `width` and `height`, call [`PointGrid::reconcile_shape`] or [`PointGrid::reshape`] afterwards
    ///
    /// ```
    /// # use cloud_span::containers::PointGrid;
    /// let mut grid = PointGrid::<f32>::new();
    /// for value in 0..6 {
    ///     grid.transient().push(value as f32).unwrap();
    /// }
    /// assert_eq!(0, grid.width());
    /// grid.reshape(3, 2).unwrap();
    /// assert!(grid.is_organized());
    /// ```
    pub fn transient(&mut self) -> &mut HybridBuffer<'a, T> {
        &mut self.points
    }

    /// Restores `width * height == len` after transient mutations. Keeps the current shape if it still matches the
    /// number of points, otherwise the grid becomes unorganized with `width = len` and `height = 1`
    pub fn reconcile_shape(&mut self) {
        if !self.is_consistent() {
            self.collapse();
        }
    }

    /// Sets an explicit shape for the current points
    ///
    /// # Errors
    ///
    /// Returns [`Error::ShapeMismatch`] if `width * height != len`. The shape is left unchanged in that case
    pub fn reshape(&mut self, width: usize, height: usize) -> Result<()> {
        if shape_len(width, height) != Some(self.len()) {
            return Err(Error::ShapeMismatch {
                width,
                height,
                len: self.len(),
            });
        }
        self.width = width;
        self.height = height;
        Ok(())
    }

    /// Number of points of a `width x height` grid. An overflowing shape can never fit into borrowed memory, for owned
    /// memory it is as fatal as any other allocation beyond `usize::MAX`
    fn checked_shape_len(&self, width: usize, height: usize) -> Result<usize> {
        match shape_len(width, height) {
            Some(len) => Ok(len),
            None if self.points.is_borrowing() => Err(Error::CapacityViolation {
                requested: usize::MAX,
                capacity: self.len(),
            }),
            None => Ok(shape_len_or_panic(width, height)),
        }
    }

    pub(super) fn collapse(&mut self) {
        self.width = self.points.len();
        self.height = 1;
    }

    /// Appends `point` to the end of the grid
    ///
    /// # Errors
    ///
    /// Returns [`Error::CapacityViolation`] if the points are borrowed
    pub fn push(&mut self, point: T) -> Result<()> {
        self.points.push(point)?;
        self.reconcile_shape();
        Ok(())
    }

    /// Appends `point` to the end of the grid and returns a reference to it
    pub fn emplace_back(&mut self, point: T) -> Result<&mut T> {
        let new_len = self.points.len() + 1;
        let point = self.points.emplace_back(point)?;
        if shape_len(self.width, self.height) != Some(new_len) {
            self.width = new_len;
            self.height = 1;
        }
        Ok(point)
    }

    /// Inserts `point` before `position`, see [`HybridBuffer::insert`]
    pub fn insert(&mut self, position: usize, point: T) -> Result<usize> {
        let position = self.points.insert(position, point)?;
        self.reconcile_shape();
        Ok(position)
    }

    /// Inserts `point` before `position` and returns a reference to it
    pub fn emplace(&mut self, position: usize, point: T) -> Result<&mut T> {
        let new_len = self.points.len() + 1;
        let point = self.points.emplace(position, point)?;
        if shape_len(self.width, self.height) != Some(new_len) {
            self.width = new_len;
            self.height = 1;
        }
        Ok(point)
    }

    /// Inserts all points of `iter` before `position`, see [`HybridBuffer::insert_iter`]
    pub fn insert_iter<I: IntoIterator<Item = T>>(
        &mut self,
        position: usize,
        iter: I,
    ) -> Result<usize> {
        let position = self.points.insert_iter(position, iter)?;
        self.reconcile_shape();
        Ok(position)
    }

    /// Removes the point at `position`, see [`HybridBuffer::erase`]
    pub fn erase(&mut self, position: usize) -> Result<usize> {
        let position = self.points.erase(position)?;
        self.reconcile_shape();
        Ok(position)
    }

    /// Removes all points in `range`, see [`HybridBuffer::erase_range`]
    pub fn erase_range(&mut self, range: Range<usize>) -> Result<usize> {
        let position = self.points.erase_range(range)?;
        self.reconcile_shape();
        Ok(position)
    }

    /// Replaces all points with those of `iter`, see [`HybridBuffer::assign_iter`]
    pub fn assign_iter<I: IntoIterator<Item = T>>(&mut self, iter: I) -> Result<()> {
        self.points.assign_iter(iter)?;
        self.reconcile_shape();
        Ok(())
    }

    /// Replaces all points with those of `iter` and arranges them in rows of `width` points. If `width` is zero or
    /// does not divide the number of points, the grid becomes unorganized instead. This is not an error, the
    /// returned [`ShapeDiagnostic`] describes what happened and is also logged as a warning.
    ///
    /// # Errors
    ///
    /// Returns [`Error::CapacityViolation`] if the points are borrowed and their number would change
    pub fn assign_iter_with_width<I: IntoIterator<Item = T>>(
        &mut self,
        iter: I,
        width: usize,
    ) -> Result<Option<ShapeDiagnostic>> {
        self.points.assign_iter(iter)?;
        let size = self.points.len();
        let diagnostic = if width == 0 {
            Some(ShapeDiagnostic::ZeroWidth { size })
        } else if size % width != 0 {
            Some(ShapeDiagnostic::WidthMismatch { width, size })
        } else {
            None
        };
        match diagnostic {
            Some(diagnostic) => {
                warn!("{}", diagnostic);
                self.collapse();
            }
            None => {
                self.width = width;
                self.height = size / width;
            }
        }
        Ok(diagnostic)
    }

    /// Exchanges all contents of two grids, including metadata
    pub fn swap(&mut self, other: &mut Self) {
        std::mem::swap(self, other);
    }

    /// Removes all points and sets `width` and `height` to zero
    ///
    /// # Errors
    ///
    /// Returns [`Error::CapacityViolation`] if the points are borrowed and the grid is not empty
    pub fn clear(&mut self) -> Result<()> {
        self.points.clear()?;
        self.width = 0;
        self.height = 0;
        Ok(())
    }

    /// Consumes the grid and returns its points
    pub fn into_points(self) -> HybridBuffer<'a, T> {
        self.points
    }
}

impl<'a, T: Clone> PointGrid<'a, T> {
    /// Creates an owning, organized grid of `width * height` copies of `value`
    ///
    /// # Panics
    ///
    /// If `width * height` overflows `usize`
    pub fn filled(width: usize, height: usize, value: T) -> Self {
        let len = shape_len_or_panic(width, height);
        Self::with_points(HybridBuffer::from_elem(len, value), width, height)
    }

    /// Resizes the grid to `count` points, appending copies of `value`. Keeps the shape if `width * height == count`,
    /// otherwise the grid becomes unorganized
    pub fn resize_with_value(&mut self, count: usize, value: T) -> Result<()> {
        self.points.resize_with_value(count, value)?;
        self.reconcile_shape();
        Ok(())
    }

    /// Resizes the grid to `width * height` points, appending copies of `value`, and sets the given shape
    ///
    /// # Errors
    ///
    /// Returns [`Error::CapacityViolation`] if the points are borrowed and `width * height != len`
    ///
    /// # Panics
    ///
    /// If the points are owned and `width * height` overflows `usize`
    pub fn resize_2d_with_value(&mut self, width: usize, height: usize, value: T) -> Result<()> {
        let len = self.checked_shape_len(width, height)?;
        self.points.resize_with_value(len, value)?;
        self.width = width;
        self.height = height;
        Ok(())
    }

    /// Inserts `count` copies of `point` before `position`
    pub fn insert_n(&mut self, position: usize, count: usize, point: T) -> Result<usize> {
        let position = self.points.insert_n(position, count, point)?;
        self.reconcile_shape();
        Ok(position)
    }

    /// Replaces all points with `count` copies of `value`
    pub fn assign(&mut self, count: usize, value: T) -> Result<()> {
        self.points.assign(count, value)?;
        self.reconcile_shape();
        Ok(())
    }

    /// Replaces all points with `width * height` copies of `value` and sets the given shape
    ///
    /// # Errors
    ///
    /// Returns [`Error::CapacityViolation`] if the points are borrowed and `width * height != len`
    ///
    /// # Panics
    ///
    /// If the points are owned and `width * height` overflows `usize`
    pub fn assign_2d(&mut self, width: usize, height: usize, value: T) -> Result<()> {
        let len = self.checked_shape_len(width, height)?;
        self.points.assign(len, value)?;
        self.width = width;
        self.height = height;
        Ok(())
    }

    /// Returns an owning deep copy of this grid, including all metadata
    pub fn to_owned_grid(&self) -> PointGrid<'static, T>
    where
        T: 'static,
    {
        PointGrid {
            header: self.header.clone(),
            points: self.points.to_owned_buffer(),
            width: self.width,
            height: self.height,
            is_dense: self.is_dense,
            sensor_origin: self.sensor_origin,
            sensor_orientation: self.sensor_orientation,
        }
    }

    /// Copies this grid into shared ownership. Changes to the copy are not mirrored back to this grid
    pub fn make_shared(&self) -> Arc<PointGrid<'static, T>>
    where
        T: 'static,
    {
        Arc::new(self.to_owned_grid())
    }
}

impl<'a, T: Clone + Default> PointGrid<'a, T> {
    /// Resizes the grid to `count` points, appending default points. Keeps the shape if `width * height == count`,
    /// otherwise the grid becomes unorganized
    pub fn resize(&mut self, count: usize) -> Result<()> {
        self.resize_with_value(count, T::default())
    }

    /// Resizes the grid to `width * height` points, appending default points, and sets the given shape
    pub fn resize_2d(&mut self, width: usize, height: usize) -> Result<()> {
        self.resize_2d_with_value(width, height, T::default())
    }
}

fn shape_len(width: usize, height: usize) -> Option<usize> {
    width.checked_mul(height)
}

/// `usize::MAX` is never a valid index, so slice indexing panics for overflowing offsets
fn linear_index_or_max(width: usize, column: usize, row: usize) -> usize {
    row.checked_mul(width)
        .and_then(|offset| offset.checked_add(column))
        .unwrap_or(usize::MAX)
}

fn shape_len_or_panic(width: usize, height: usize) -> usize {
    match shape_len(width, height) {
        Some(len) => len,
        None => panic!("Grid shape {}x{} overflows usize", width, height),
    }
}

impl<'a, T> Default for PointGrid<'a, T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a, T> From<Vec<T>> for PointGrid<'a, T> {
    fn from(points: Vec<T>) -> Self {
        Self::from_buffer(points.into())
    }
}

impl<'a, T> FromIterator<T> for PointGrid<'a, T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Self::from_buffer(iter.into_iter().collect())
    }
}

impl<'a, T> Index<usize> for PointGrid<'a, T> {
    type Output = T;

    fn index(&self, index: usize) -> &Self::Output {
        &self.points[index]
    }
}

impl<'a, T> IndexMut<usize> for PointGrid<'a, T> {
    fn index_mut(&mut self, index: usize) -> &mut Self::Output {
        &mut self.points[index]
    }
}

/// Unchecked 2D access by `(column, row)`. Does not check whether the grid is organized, but panics if
/// `row * width + column` is out of bounds or overflows
impl<'a, T> Index<(usize, usize)> for PointGrid<'a, T> {
    type Output = T;

    fn index(&self, (column, row): (usize, usize)) -> &Self::Output {
        &self.points[linear_index_or_max(self.width, column, row)]
    }
}

impl<'a, T> IndexMut<(usize, usize)> for PointGrid<'a, T> {
    fn index_mut(&mut self, (column, row): (usize, usize)) -> &mut Self::Output {
        let index = linear_index_or_max(self.width, column, row);
        &mut self.points[index]
    }
}

impl<'a, 'b, T> IntoIterator for &'b PointGrid<'a, T> {
    type Item = &'b T;
    type IntoIter = std::slice::Iter<'b, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<'a, 'b, T> IntoIterator for &'b mut PointGrid<'a, T> {
    type Item = &'b mut T;
    type IntoIter = std::slice::IterMut<'b, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter_mut()
    }
}
