use nalgebra::{Dyn, MatrixView, MatrixViewMut};

use crate::{
    layout::{scalars_of, scalars_of_mut, PointRecord},
    Error, Result,
};

use super::{HybridBuffer, PointGrid};

/// Strided matrix view over the scalar fields of a range of point records. Borrows the point memory, so it can't
/// outlive the container it was created from, and the container can't reallocate while the view exists
pub type PointMatrixView<'b, S> = MatrixView<'b, S, Dyn, Dyn, Dyn, Dyn>;
/// Mutable version of [`PointMatrixView`]. Writing to an entry of the view writes to the point record
pub type PointMatrixViewMut<'b, S> = MatrixViewMut<'b, S, Dyn, Dyn, Dyn, Dyn>;

/// Logical axis order of a point matrix view. The memory that the view aliases is the same in both cases, only the
/// meaning of rows and columns differs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum MatrixOrder {
    /// One column per point, `dim x point_count`. This is the natural shape for `nalgebra`, which stores matrices in
    /// column-major order
    #[default]
    ColumnMajor,
    /// One row per point, `point_count x dim`
    RowMajor,
}

/// Describes which scalars of each point record a matrix view covers. All values are given in units of the scalar type
/// of the record (e.g. `f32`), not in bytes.
///
/// For a record storing `x`, `y`, `z` and one padding value, `MatrixViewParams::new(3, 4, 0)` selects the coordinates
/// of every point. In general, `stride = offset + dim + x`, where `x` is the number of trailing scalars that are
/// skipped in every record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MatrixViewParams {
    /// Number of consecutive scalars read per point
    pub dim: usize,
    /// Number of scalars between the start of two consecutive points
    pub stride: usize,
    /// Number of scalars skipped at the start of each point
    pub offset: usize,
    pub order: MatrixOrder,
}

impl MatrixViewParams {
    /// Creates new parameters with the default [`MatrixOrder`]
    pub fn new(dim: usize, stride: usize, offset: usize) -> Self {
        Self {
            dim,
            stride,
            offset,
            order: MatrixOrder::default(),
        }
    }

    /// Parameters that cover every scalar of the record type `T`, padding included
    pub fn whole_record<T: PointRecord>() -> Self {
        Self::new(T::SCALAR_COUNT, T::SCALAR_COUNT, 0)
    }

    pub fn with_order(self, order: MatrixOrder) -> Self {
        Self { order, ..self }
    }

    fn invalid(&self, reason: impl Into<String>) -> Error {
        Error::InvalidMatrixView {
            dim: self.dim,
            stride: self.stride,
            offset: self.offset,
            reason: reason.into(),
        }
    }

    /// Checks that a view with these parameters over `point_count` points fits into `scalar_count` scalars
    fn validate(&self, point_count: usize, scalar_count: usize) -> Result<()> {
        if self.dim == 0 {
            return Err(self.invalid("dim must not be zero"));
        }
        if self.stride == 0 {
            return Err(self.invalid("stride must not be zero"));
        }
        let record_end = self
            .offset
            .checked_add(self.dim)
            .ok_or_else(|| self.invalid("view size overflows"))?;
        if record_end > self.stride {
            return Err(self.invalid("offset + dim exceeds the stride"));
        }
        if point_count == 0 {
            return Ok(());
        }
        let required = (point_count - 1)
            .checked_mul(self.stride)
            .and_then(|span| span.checked_add(record_end))
            .ok_or_else(|| self.invalid("view size overflows"))?;
        if required > scalar_count {
            return Err(self.invalid(format!(
                "view requires {} scalars, but the points only contain {}",
                required, scalar_count
            )));
        }
        Ok(())
    }

    /// Returns `(nrows, ncols, rstride, cstride)` of a view over `point_count` points
    fn shape(&self, point_count: usize) -> (Dyn, Dyn, Dyn, Dyn) {
        match self.order {
            MatrixOrder::ColumnMajor => (Dyn(self.dim), Dyn(point_count), Dyn(1), Dyn(self.stride)),
            MatrixOrder::RowMajor => (Dyn(point_count), Dyn(self.dim), Dyn(self.stride), Dyn(1)),
        }
    }
}

/// Creates a matrix view over the scalar fields of `points`
///
/// # Errors
///
/// Returns [`Error::InvalidMatrixView`] if the parameters are inconsistent (zero `dim` or `stride`,
/// `offset + dim > stride`), if the view would reach past the end of `points`, or if `T` can't be reinterpreted as
/// a sequence of its scalars
pub fn matrix_view<T: PointRecord>(
    points: &[T],
    params: MatrixViewParams,
) -> Result<PointMatrixView<'_, T::Scalar>> {
    let scalars = scalars_of(points).map_err(|reason| params.invalid(reason))?;
    params.validate(points.len(), scalars.len())?;
    let start = params.offset.min(scalars.len());
    let (nrows, ncols, rstride, cstride) = params.shape(points.len());
    Ok(PointMatrixView::from_slice_with_strides_generic(
        &scalars[start..],
        nrows,
        ncols,
        rstride,
        cstride,
    ))
}

/// Mutable version of [`matrix_view`]
pub fn matrix_view_mut<T: PointRecord>(
    points: &mut [T],
    params: MatrixViewParams,
) -> Result<PointMatrixViewMut<'_, T::Scalar>> {
    let point_count = points.len();
    let scalars = scalars_of_mut(points).map_err(|reason| params.invalid(reason))?;
    params.validate(point_count, scalars.len())?;
    let start = params.offset.min(scalars.len());
    let (nrows, ncols, rstride, cstride) = params.shape(point_count);
    Ok(PointMatrixViewMut::from_slice_with_strides_generic(
        &mut scalars[start..],
        nrows,
        ncols,
        rstride,
        cstride,
    ))
}

impl<'a, T: PointRecord> HybridBuffer<'a, T> {
    /// Matrix view over the scalar fields of all points in this buffer, see [`matrix_view`]
    pub fn matrix_view(&self, params: MatrixViewParams) -> Result<PointMatrixView<'_, T::Scalar>> {
        matrix_view(self.as_slice(), params)
    }

    /// Mutable matrix view over the scalar fields of all points in this buffer, see [`matrix_view_mut`]
    pub fn matrix_view_mut(
        &mut self,
        params: MatrixViewParams,
    ) -> Result<PointMatrixViewMut<'_, T::Scalar>> {
        matrix_view_mut(self.as_mut_slice(), params)
    }
}

impl<'a, T: PointRecord> PointGrid<'a, T> {
    /// Matrix view over the scalar fields of all points in this grid. The view ignores the 2D structure of the grid,
    /// point `(column, row)` corresponds to the view column (or row, depending on [`MatrixOrder`])
    /// `row * width + column`
    ///
    /// ```
    /// # use cloud_span::{containers::{MatrixViewParams, PointGrid}, layout::PointRecord};
    /// # use bytemuck::{Pod, Zeroable};
    /// #[repr(C)]
    /// #[derive(Clone, Copy, Default, Pod, Zeroable)]
    /// struct PointXYZ {
    ///     x: f32,
    ///     y: f32,
    ///     z: f32,
    ///     _padding: f32,
    /// }
    ///
    /// impl PointRecord for PointXYZ {
    ///     type Scalar = f32;
    /// }
    ///
    /// let mut grid = PointGrid::filled(2, 2, PointXYZ::default());
    /// grid[(1, 1)].y = 2.0;
    /// let coordinates = grid.matrix_view(MatrixViewParams::new(3, 4, 0)).unwrap();
    /// assert_eq!((3, 4), coordinates.shape());
    /// assert_eq!(2.0, coordinates[(1, 3)]);
    /// ```
    pub fn matrix_view(&self, params: MatrixViewParams) -> Result<PointMatrixView<'_, T::Scalar>> {
        matrix_view(self.as_slice(), params)
    }

    /// Mutable version of [`PointGrid::matrix_view`]
    pub fn matrix_view_mut(
        &mut self,
        params: MatrixViewParams,
    ) -> Result<PointMatrixViewMut<'_, T::Scalar>> {
        matrix_view_mut(self.as_mut_slice(), params)
    }

    /// Matrix view over every scalar of every point, padding included
    pub fn full_matrix_view(&self, order: MatrixOrder) -> Result<PointMatrixView<'_, T::Scalar>> {
        self.matrix_view(MatrixViewParams::whole_record::<T>().with_order(order))
    }

    /// Mutable version of [`PointGrid::full_matrix_view`]
    pub fn full_matrix_view_mut(
        &mut self,
        order: MatrixOrder,
    ) -> Result<PointMatrixViewMut<'_, T::Scalar>> {
        self.matrix_view_mut(MatrixViewParams::whole_record::<T>().with_order(order))
    }
}
