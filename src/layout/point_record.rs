use bytemuck::Pod;
use num_traits::Float;

/// Trait that marks a Rust type as a point record whose memory can be reinterpreted as a packed sequence of
/// floating-point scalars. This is what makes the zero-copy matrix views of a [`PointGrid`](crate::containers::PointGrid)
/// possible.
///
/// Point records from sensor pipelines are usually padded for alignment, e.g. a point with `x`, `y` and `z` fields
/// is stored as four `f32` values, the last one being padding. `SCALAR_COUNT` includes this padding, so it is the
/// number of scalars that separate the start of one record from the start of the next one in memory.
///
/// ```
/// # use cloud_span::layout::PointRecord;
/// #[derive(Copy, Clone, Default, bytemuck::Pod, bytemuck::Zeroable)]
/// #[repr(C)]
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
/// assert_eq!(4, PointXYZ::SCALAR_COUNT);
/// ```
pub trait PointRecord: Pod {
    /// The floating-point type that all fields of this record are stored as
    type Scalar: nalgebra::Scalar + Pod + Float;
    /// The number of scalars in a single record, including padding
    const SCALAR_COUNT: usize = std::mem::size_of::<Self>() / std::mem::size_of::<Self::Scalar>();
}

/// Reinterprets the given points as a slice of their scalar fields. Returns a description of the failure if `T`
/// can't be expressed as a whole number of correctly aligned scalars.
pub(crate) fn scalars_of<T: PointRecord>(points: &[T]) -> Result<&[T::Scalar], String> {
    bytemuck::try_cast_slice(points).map_err(|e| format!("{:?}", e))
}

/// Mutable version of [`scalars_of`]
pub(crate) fn scalars_of_mut<T: PointRecord>(points: &mut [T]) -> Result<&mut [T::Scalar], String> {
    bytemuck::try_cast_slice_mut(points).map_err(|e| format!("{:?}", e))
}
