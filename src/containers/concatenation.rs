use std::ops::Add;

use crate::{Error, Result};

use super::{HybridBuffer, PointGrid};

impl<'a, T: Clone> PointGrid<'a, T> {
    /// Appends copies of all points of `other` to this grid. The result is unorganized (`width = len`, `height = 1`),
    /// keeps the newer of both header stamps and is dense only if both grids are dense. All other metadata of `self`
    /// is kept.
    ///
    /// # Errors
    ///
    /// Returns [`Error::CapacityViolation`] if the points of this grid are borrowed and `other` is not empty. This
    /// grid is unchanged in that case
    pub fn append(&mut self, other: &PointGrid<'_, T>) -> Result<()> {
        let end = self.len();
        self.transient().insert_iter(end, other.iter().cloned())?;
        self.merge_metadata(other);
        self.collapse();
        Ok(())
    }

    fn merge_metadata(&mut self, other: &PointGrid<'_, T>) {
        self.header.stamp = self.header.stamp.max(other.header.stamp);
        self.is_dense = self.is_dense && other.is_dense;
    }

    /// Copies the points at `indices` of `source` into a new, unorganized grid. Indices may repeat and appear in any
    /// order. Header, density flag and sensor pose are copied from `source`.
    ///
    /// ```
    /// # use cloud_span::containers::PointGrid;
    /// let source: PointGrid<u8> = vec![10, 20, 30].into();
    /// let subset = PointGrid::from_indices(&source, &[2, 0, 2]).unwrap();
    /// assert_eq!(&[30, 10, 30], subset.as_slice());
    /// ```
    ///
    /// # Errors
    ///
    /// Returns [`Error::OutOfRange`] for the first index that is not smaller than `source.len()`
    pub fn from_indices(source: &PointGrid<'_, T>, indices: &[usize]) -> Result<PointGrid<'static, T>>
    where
        T: 'static,
    {
        let len = source.len();
        if let Some(&index) = indices.iter().find(|&&index| index >= len) {
            return Err(Error::OutOfRange { index, len });
        }
        let points: HybridBuffer<'static, T> = indices
            .iter()
            .map(|&index| source[index].clone())
            .collect();
        let mut subset = PointGrid::from_buffer(points);
        subset.header = source.header.clone();
        subset.is_dense = source.is_dense;
        subset.sensor_origin = source.sensor_origin;
        subset.sensor_orientation = source.sensor_orientation;
        Ok(subset)
    }
}

/// Concatenates the points of `a` and `b` into a new, owning and unorganized grid. The header stamp of the result is
/// the newer of both stamps and the result is dense only if both inputs are dense. All other metadata is taken from
/// `a`.
pub fn concatenate<T: Clone + 'static>(
    a: &PointGrid<'_, T>,
    b: &PointGrid<'_, T>,
) -> PointGrid<'static, T> {
    let points: HybridBuffer<'static, T> = a.iter().chain(b.iter()).cloned().collect();
    let mut result = PointGrid::from_buffer(points);
    result.header = a.header.clone();
    result.is_dense = a.is_dense;
    result.sensor_origin = a.sensor_origin;
    result.sensor_orientation = a.sensor_orientation;
    result.merge_metadata(b);
    result
}

/// Like [`concatenate`], but writes the result to `out`. The previous contents of `out` are dropped, afterwards `out`
/// owns its points even if it borrowed them before
pub fn concatenate_into<T: Clone + 'static>(
    a: &PointGrid<'_, T>,
    b: &PointGrid<'_, T>,
    out: &mut PointGrid<'_, T>,
) {
    *out = concatenate(a, b);
}

impl<'a, 'b, T: Clone + 'static> Add<&PointGrid<'b, T>> for &PointGrid<'a, T> {
    type Output = PointGrid<'static, T>;

    fn add(self, rhs: &PointGrid<'b, T>) -> Self::Output {
        concatenate(self, rhs)
    }
}
