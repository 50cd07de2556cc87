use std::{
    iter::FromIterator,
    ops::{Index, IndexMut, Range},
};

use itertools::Itertools;
use log::trace;
use static_assertions::assert_impl_all;

use crate::{Error, Result};

/// Factor by which the capacity of an owning buffer grows once it runs out of space
pub const GROWTH_FACTOR: usize = 2;
/// Smallest capacity that an owning buffer allocates when it has to grow
pub const MIN_NON_ZERO_CAPACITY: usize = 4;

/// Who owns the memory of a [`HybridBuffer`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BufferMode {
    /// The buffer allocated its memory and may grow, shrink and free it
    Owning,
    /// The buffer wraps external memory of fixed length that it never reallocates or frees
    Borrowing,
}

#[derive(Debug)]
enum Storage<'a, T> {
    Owning(Vec<T>),
    Borrowing(&'a mut [T]),
}

/// A sequence container for point records that either owns its memory (like a `Vec<T>`) or borrows a fixed-length
/// region of external memory (like a `&mut [T]`), behind one interface.
///
/// In [`BufferMode::Owning`] mode, the buffer behaves like a vector: it can grow and shrink, growing its capacity by
/// [`GROWTH_FACTOR`] whenever it runs out of space. In [`BufferMode::Borrowing`] mode, length and capacity are fixed
/// to the length of the borrowed memory. Only in-place mutation is possible, every call that would change the length
/// fails with [`Error::CapacityViolation`] and leaves the buffer untouched. The buffer never silently copies borrowed
/// memory into an allocation of its own.
///
/// # Aliasing
///
/// Every reallocation moves the points to a new memory region. All references, slices and matrix views obtained from
/// the buffer are invalidated by that, which the borrow checker enforces because all growing operations take
/// `&mut self`. Raw pointers obtained through [`HybridBuffer::as_ptr`] or [`HybridBuffer::as_mut_ptr`] are **not**
/// tracked and must not be used after a reallocation. [`HybridBuffer::generation`] changes on every reallocation and
/// can be used to detect stale raw pointers.
///
/// ```
/// # use cloud_span::containers::*;
/// let mut external = [1.0f32, 2.0, 3.0];
/// let mut buffer = HybridBuffer::borrowed(&mut external);
/// buffer[0] = 10.0;
/// assert!(buffer.push(4.0).is_err());
/// drop(buffer);
/// assert_eq!(10.0, external[0]);
/// ```
#[derive(Debug)]
pub struct HybridBuffer<'a, T> {
    storage: Storage<'a, T>,
    generation: u64,
}

assert_impl_all!(HybridBuffer<'static, [f32; 4]>: Send, Sync);

impl<'a, T> HybridBuffer<'a, T> {
    /// Creates a new empty buffer in owning mode. Does not allocate
    pub fn new() -> Self {
        Self {
            storage: Storage::Owning(Vec::new()),
            generation: 0,
        }
    }

    /// Creates a new empty owning buffer that can hold at least `capacity` points without reallocating
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            storage: Storage::Owning(Vec::with_capacity(capacity)),
            generation: 0,
        }
    }

    /// Creates a buffer in borrowing mode over the given external memory. No memory is allocated or copied
    pub fn borrowed(points: &'a mut [T]) -> Self {
        Self {
            storage: Storage::Borrowing(points),
            generation: 0,
        }
    }

    /// Creates a buffer in borrowing mode over `len` points starting at `data`. This is the entry point for memory
    /// that comes from outside of Rust, e.g. a sensor driver or a foreign array.
    ///
    /// # Safety
    ///
    /// Has the same requirements as [`std::slice::from_raw_parts_mut`]: `data` must be valid and properly aligned for
    /// `len` initialized values of `T`, and the memory must neither be accessed through any other pointer nor be freed
    /// or moved for the lifetime `'a`. If `len` is zero, `data` is never dereferenced and may be null.
    pub unsafe fn from_raw_parts(data: *mut T, len: usize) -> Self {
        if len == 0 {
            return Self::borrowed(&mut []);
        }
        Self::borrowed(std::slice::from_raw_parts_mut(data, len))
    }

    /// Returns the ownership mode of this buffer
    pub fn mode(&self) -> BufferMode {
        match &self.storage {
            Storage::Owning(_) => BufferMode::Owning,
            Storage::Borrowing(_) => BufferMode::Borrowing,
        }
    }

    pub fn is_borrowing(&self) -> bool {
        self.mode() == BufferMode::Borrowing
    }

    /// Returns the number of points in this buffer
    pub fn len(&self) -> usize {
        self.as_slice().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the number of points this buffer can hold without reallocating. For borrowing buffers, this is always
    /// equal to `len()`
    pub fn capacity(&self) -> usize {
        match &self.storage {
            Storage::Owning(points) => points.capacity(),
            Storage::Borrowing(points) => points.len(),
        }
    }

    /// Returns a counter that is incremented whenever the memory of this buffer is reallocated. Two equal values
    /// guarantee that raw pointers obtained in between still point to the current memory
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn as_slice(&self) -> &[T] {
        match &self.storage {
            Storage::Owning(points) => points.as_slice(),
            Storage::Borrowing(points) => &**points,
        }
    }

    pub fn as_mut_slice(&mut self) -> &mut [T] {
        match &mut self.storage {
            Storage::Owning(points) => points.as_mut_slice(),
            Storage::Borrowing(points) => &mut **points,
        }
    }

    /// Returns a raw pointer to the first point. See the type-level documentation for the aliasing rules
    pub fn as_ptr(&self) -> *const T {
        self.as_slice().as_ptr()
    }

    /// Returns a mutable raw pointer to the first point. See the type-level documentation for the aliasing rules
    pub fn as_mut_ptr(&mut self) -> *mut T {
        self.as_mut_slice().as_mut_ptr()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.as_slice().iter()
    }

    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, T> {
        self.as_mut_slice().iter_mut()
    }

    pub fn first(&self) -> Option<&T> {
        self.as_slice().first()
    }

    pub fn first_mut(&mut self) -> Option<&mut T> {
        self.as_mut_slice().first_mut()
    }

    pub fn last(&self) -> Option<&T> {
        self.as_slice().last()
    }

    pub fn last_mut(&mut self) -> Option<&mut T> {
        self.as_mut_slice().last_mut()
    }

    /// Bounds-checked access to the point at `index`
    ///
    /// # Errors
    ///
    /// Returns [`Error::OutOfRange`] if `index >= self.len()`
    pub fn get(&self, index: usize) -> Result<&T> {
        let len = self.len();
        self.as_slice()
            .get(index)
            .ok_or(Error::OutOfRange { index, len })
    }

    /// Mutable version of [`HybridBuffer::get`]
    pub fn get_mut(&mut self, index: usize) -> Result<&mut T> {
        let len = self.len();
        self.as_mut_slice()
            .get_mut(index)
            .ok_or(Error::OutOfRange { index, len })
    }

    /// Appends `point` to the end of this buffer
    ///
    /// # Errors
    ///
    /// Returns [`Error::CapacityViolation`] if this buffer is borrowing
    pub fn push(&mut self, point: T) -> Result<()> {
        self.emplace_back(point).map(|_| ())
    }

    /// Appends `point` to the end of this buffer and returns a reference to it
    ///
    /// # Errors
    ///
    /// Returns [`Error::CapacityViolation`] if this buffer is borrowing
    pub fn emplace_back(&mut self, point: T) -> Result<&mut T> {
        let new_len = self.len() + 1;
        let points = self.owning_storage_for(new_len)?;
        let index = points.len();
        points.push(point);
        Ok(&mut points[index])
    }

    /// Inserts `point` before `position`, shifting all following points back. Returns the position of the inserted
    /// point
    ///
    /// # Errors
    ///
    /// Returns [`Error::OutOfRange`] if `position > self.len()` and [`Error::CapacityViolation`] if this buffer is
    /// borrowing
    pub fn insert(&mut self, position: usize, point: T) -> Result<usize> {
        self.emplace(position, point).map(|_| position)
    }

    /// Like [`HybridBuffer::insert`], but returns a reference to the inserted point
    pub fn emplace(&mut self, position: usize, point: T) -> Result<&mut T> {
        self.check_position(position)?;
        let new_len = self.len() + 1;
        let points = self.owning_storage_for(new_len)?;
        points.insert(position, point);
        Ok(&mut points[position])
    }

    /// Inserts all points of `iter` before `position`, keeping their order. Returns `position`
    ///
    /// # Errors
    ///
    /// Returns [`Error::OutOfRange`] if `position > self.len()` and [`Error::CapacityViolation`] if this buffer is
    /// borrowing and `iter` is not empty
    pub fn insert_iter<I: IntoIterator<Item = T>>(
        &mut self,
        position: usize,
        iter: I,
    ) -> Result<usize> {
        self.check_position(position)?;
        let new_points = iter.into_iter().collect_vec();
        if new_points.is_empty() {
            return Ok(position);
        }
        let new_len = self.len() + new_points.len();
        let points = self.owning_storage_for(new_len)?;
        points.splice(position..position, new_points);
        Ok(position)
    }

    /// Removes the point at `position`, shifting all following points to the front. Returns `position`, which is now
    /// the position of the point that followed the removed one
    ///
    /// # Errors
    ///
    /// Returns [`Error::OutOfRange`] if `position >= self.len()` and [`Error::CapacityViolation`] if this buffer is
    /// borrowing
    pub fn erase(&mut self, position: usize) -> Result<usize> {
        let len = self.len();
        if position >= len {
            return Err(Error::OutOfRange {
                index: position,
                len,
            });
        }
        let points = self.owning_storage_for(len - 1)?;
        points.remove(position);
        Ok(position)
    }

    /// Removes all points in `range`. Returns `range.start`
    ///
    /// # Errors
    ///
    /// Returns [`Error::OutOfRange`] if `range` is not within `0..self.len()` and [`Error::CapacityViolation`] if this
    /// buffer is borrowing and `range` is not empty
    pub fn erase_range(&mut self, range: Range<usize>) -> Result<usize> {
        let len = self.len();
        if range.start > range.end || range.end > len {
            return Err(Error::OutOfRange {
                index: range.end.max(range.start),
                len,
            });
        }
        if range.is_empty() {
            return Ok(range.start);
        }
        let points = self.owning_storage_for(len - range.len())?;
        points.drain(range.clone());
        Ok(range.start)
    }

    /// Replaces the contents of this buffer with the points of `iter`. A borrowing buffer accepts this only if `iter`
    /// yields exactly `self.len()` points, in which case the points are overwritten in place
    ///
    /// # Errors
    ///
    /// Returns [`Error::CapacityViolation`] if this buffer is borrowing and the number of points would change
    pub fn assign_iter<I: IntoIterator<Item = T>>(&mut self, iter: I) -> Result<()> {
        let new_points = iter.into_iter().collect_vec();
        if let Storage::Borrowing(points) = &mut self.storage {
            if points.len() == new_points.len() {
                for (dst, src) in points.iter_mut().zip(new_points) {
                    *dst = src;
                }
                return Ok(());
            }
        }
        let points = self.owning_storage_for(new_points.len())?;
        points.clear();
        points.extend(new_points);
        Ok(())
    }

    /// Makes sure that this buffer can hold at least `capacity` points without reallocating
    ///
    /// # Errors
    ///
    /// Returns [`Error::CapacityViolation`] if this buffer is borrowing and `capacity > self.len()`
    pub fn reserve(&mut self, capacity: usize) -> Result<()> {
        match &mut self.storage {
            Storage::Owning(points) => {
                if capacity > points.capacity() {
                    points.reserve_exact(capacity - points.len());
                    self.generation += 1;
                }
                Ok(())
            }
            Storage::Borrowing(points) if capacity > points.len() => Err(Error::CapacityViolation {
                requested: capacity,
                capacity: points.len(),
            }),
            Storage::Borrowing(_) => Ok(()),
        }
    }

    /// Releases unused capacity of an owning buffer. Does nothing for borrowing buffers
    pub fn shrink_to_fit(&mut self) {
        if let Storage::Owning(points) = &mut self.storage {
            if points.capacity() > points.len() {
                points.shrink_to_fit();
                self.generation += 1;
            }
        }
    }

    /// Removes all points from this buffer, keeping its capacity
    ///
    /// # Errors
    ///
    /// Returns [`Error::CapacityViolation`] if this buffer is borrowing and not empty
    pub fn clear(&mut self) -> Result<()> {
        if self.is_empty() {
            return Ok(());
        }
        self.owning_storage_for(0)?.clear();
        Ok(())
    }

    /// Swaps the contents (and ownership modes) of two buffers
    pub fn swap(&mut self, other: &mut Self) {
        std::mem::swap(self, other);
    }

    fn check_position(&self, position: usize) -> Result<()> {
        let len = self.len();
        if position > len {
            return Err(Error::OutOfRange {
                index: position,
                len,
            });
        }
        Ok(())
    }

    /// Returns the owned storage, prepared to hold `new_len` points. Borrowing buffers can't change their length, so
    /// this fails for them
    fn owning_storage_for(&mut self, new_len: usize) -> Result<&mut Vec<T>> {
        let points = match &mut self.storage {
            Storage::Owning(points) => points,
            Storage::Borrowing(points) => {
                return Err(Error::CapacityViolation {
                    requested: new_len,
                    capacity: points.len(),
                })
            }
        };
        if new_len > points.capacity() {
            let new_capacity = new_len
                .max(points.capacity() * GROWTH_FACTOR)
                .max(MIN_NON_ZERO_CAPACITY);
            trace!(
                "Reallocating point buffer from capacity {} to {}",
                points.capacity(),
                new_capacity
            );
            points.reserve_exact(new_capacity - points.len());
            self.generation += 1;
        }
        Ok(points)
    }
}

impl<'a, T: Clone> HybridBuffer<'a, T> {
    /// Creates an owning buffer with `len` copies of `value`
    pub fn from_elem(len: usize, value: T) -> Self {
        Self {
            storage: Storage::Owning(vec![value; len]),
            generation: 0,
        }
    }

    /// Resizes this buffer to `new_len` points. Surplus points are dropped from the end, missing points are appended
    /// as copies of `value`
    ///
    /// # Errors
    ///
    /// Returns [`Error::CapacityViolation`] if this buffer is borrowing and `new_len != self.len()`
    pub fn resize_with_value(&mut self, new_len: usize, value: T) -> Result<()> {
        if new_len == self.len() {
            return Ok(());
        }
        self.owning_storage_for(new_len)?.resize(new_len, value);
        Ok(())
    }

    /// Inserts `count` copies of `point` before `position`. Returns `position`
    ///
    /// # Errors
    ///
    /// Returns [`Error::OutOfRange`] if `position > self.len()` and [`Error::CapacityViolation`] if this buffer is
    /// borrowing and `count > 0`
    pub fn insert_n(&mut self, position: usize, count: usize, point: T) -> Result<usize> {
        self.insert_iter(position, std::iter::repeat(point).take(count))
    }

    /// Replaces the contents of this buffer with `count` copies of `value`
    ///
    /// # Errors
    ///
    /// Returns [`Error::CapacityViolation`] if this buffer is borrowing and `count != self.len()`
    pub fn assign(&mut self, count: usize, value: T) -> Result<()> {
        if let Storage::Borrowing(points) = &mut self.storage {
            if points.len() == count {
                points.fill(value);
                return Ok(());
            }
        }
        let points = self.owning_storage_for(count)?;
        points.clear();
        points.resize(count, value);
        Ok(())
    }

    /// Returns an owning deep copy of this buffer. The copy does not alias the memory of `self`, even if `self` is
    /// borrowing
    pub fn to_owned_buffer(&self) -> HybridBuffer<'static, T>
    where
        T: 'static,
    {
        HybridBuffer {
            storage: Storage::Owning(self.as_slice().to_vec()),
            generation: 0,
        }
    }

    /// Converts this buffer into a `Vec<T>`. Owned memory is moved, borrowed memory is copied
    pub fn into_vec(self) -> Vec<T> {
        match self.storage {
            Storage::Owning(points) => points,
            Storage::Borrowing(points) => points.to_vec(),
        }
    }
}

impl<'a, T: Clone + Default> HybridBuffer<'a, T> {
    /// Resizes this buffer to `new_len` points, appending default values if it grows
    ///
    /// # Errors
    ///
    /// Returns [`Error::CapacityViolation`] if this buffer is borrowing and `new_len != self.len()`
    pub fn resize(&mut self, new_len: usize) -> Result<()> {
        self.resize_with_value(new_len, T::default())
    }
}

impl<'a, T> Default for HybridBuffer<'a, T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Cloning always yields an owning buffer, so a clone of a borrowing buffer is detached from the external memory
impl<'a, T: Clone> Clone for HybridBuffer<'a, T> {
    fn clone(&self) -> Self {
        Self {
            storage: Storage::Owning(self.as_slice().to_vec()),
            generation: 0,
        }
    }
}

impl<'a, 'b, T: PartialEq> PartialEq<HybridBuffer<'b, T>> for HybridBuffer<'a, T> {
    fn eq(&self, other: &HybridBuffer<'b, T>) -> bool {
        self.as_slice() == other.as_slice()
    }
}

impl<'a, T> Index<usize> for HybridBuffer<'a, T> {
    type Output = T;

    /// Unchecked access by the container contract: panics if `index` is out of bounds
    fn index(&self, index: usize) -> &Self::Output {
        &self.as_slice()[index]
    }
}

impl<'a, T> IndexMut<usize> for HybridBuffer<'a, T> {
    fn index_mut(&mut self, index: usize) -> &mut Self::Output {
        &mut self.as_mut_slice()[index]
    }
}

impl<'a, T> FromIterator<T> for HybridBuffer<'a, T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Self {
            storage: Storage::Owning(iter.into_iter().collect()),
            generation: 0,
        }
    }
}

impl<'a, T> From<Vec<T>> for HybridBuffer<'a, T> {
    fn from(points: Vec<T>) -> Self {
        Self {
            storage: Storage::Owning(points),
            generation: 0,
        }
    }
}

impl<'a, T> From<&'a mut [T]> for HybridBuffer<'a, T> {
    fn from(points: &'a mut [T]) -> Self {
        Self::borrowed(points)
    }
}

impl<'a, 'b, T> IntoIterator for &'b HybridBuffer<'a, T> {
    type Item = &'b T;
    type IntoIter = std::slice::Iter<'b, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<'a, 'b, T> IntoIterator for &'b mut HybridBuffer<'a, T> {
    type Item = &'b mut T;
    type IntoIter = std::slice::IterMut<'b, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter_mut()
    }
}

#[cfg(test)]
mod tests {
    use itertools::Itertools;
    use rand::{thread_rng, Rng};

    use crate::test_utils::{indexed_points, DefaultPointDistribution, PointXYZ};

    use super::*;

    #[test]
    fn test_owning_buffer_grows() {
        const COUNT: usize = 64;
        let test_data: Vec<PointXYZ> = thread_rng()
            .sample_iter(DefaultPointDistribution)
            .take(COUNT)
            .collect();

        let mut buffer = HybridBuffer::new();
        assert_eq!(BufferMode::Owning, buffer.mode());
        assert!(buffer.is_empty());

        for (idx, point) in test_data.iter().enumerate() {
            buffer.push(*point).unwrap();
            assert_eq!(idx + 1, buffer.len());
            assert_eq!(point, buffer.get(idx).unwrap());
        }
        assert_eq!(test_data.as_slice(), buffer.as_slice());
        assert_eq!(test_data, buffer.iter().copied().collect_vec());
    }

    #[test]
    fn test_growth_is_amortized() {
        let mut buffer = HybridBuffer::new();
        for value in 0..1024u32 {
            buffer.push(value).unwrap();
        }
        // 4, 8, 16, ..., 1024
        assert_eq!(9, buffer.generation());
        assert!(buffer.capacity() >= 1024);
    }

    #[test]
    fn test_generation_changes_only_on_reallocation() {
        let mut buffer = HybridBuffer::with_capacity(8);
        let generation = buffer.generation();
        for value in 0..8u32 {
            buffer.push(value).unwrap();
        }
        assert_eq!(generation, buffer.generation());
        buffer.push(8).unwrap();
        assert_ne!(generation, buffer.generation());

        let generation = buffer.generation();
        buffer.erase(0).unwrap();
        buffer.resize(2).unwrap();
        assert_eq!(generation, buffer.generation());
    }

    #[test]
    fn test_get_out_of_range() {
        let buffer = HybridBuffer::from_elem(3, PointXYZ::default());
        assert_eq!(
            Err(Error::OutOfRange { index: 3, len: 3 }),
            buffer.get(3).map(|_| ())
        );
    }

    #[test]
    #[should_panic]
    fn test_index_out_of_range_panics() {
        let buffer: HybridBuffer<PointXYZ> = HybridBuffer::new();
        let _ = buffer[0];
    }

    #[test]
    fn test_resize_truncates_and_grows() {
        let test_data = indexed_points(8);
        let mut buffer = test_data.iter().copied().collect::<HybridBuffer<_>>();

        buffer.resize(5).unwrap();
        assert_eq!(&test_data[..5], buffer.as_slice());

        let fill = PointXYZ::new(-1.0, -1.0, -1.0);
        buffer.resize_with_value(7, fill).unwrap();
        assert_eq!(&test_data[..5], &buffer.as_slice()[..5]);
        assert_eq!(&[fill, fill], &buffer.as_slice()[5..]);

        buffer.resize(9).unwrap();
        assert_eq!(PointXYZ::default(), buffer[8]);
    }

    #[test]
    fn test_insert_and_erase() {
        let mut buffer = indexed_points(4).into_iter().collect::<HybridBuffer<_>>();
        let new_point = PointXYZ::new(42.0, 42.0, 42.0);

        assert_eq!(1, buffer.insert(1, new_point).unwrap());
        assert_eq!(5, buffer.len());
        assert_eq!(new_point, buffer[1]);
        assert_eq!(indexed_points(4)[1], buffer[2]);

        assert_eq!(1, buffer.erase(1).unwrap());
        assert_eq!(indexed_points(4).as_slice(), buffer.as_slice());

        buffer.insert_n(4, 2, new_point).unwrap();
        assert_eq!(&[new_point, new_point], &buffer.as_slice()[4..]);

        buffer.insert_iter(0, indexed_points(2)).unwrap();
        assert_eq!(8, buffer.len());
        assert_eq!(&indexed_points(2)[..], &buffer.as_slice()[..2]);

        assert_eq!(0, buffer.erase_range(0..2).unwrap());
        assert_eq!(&indexed_points(4)[..], &buffer.as_slice()[..4]);

        *buffer.emplace(0, new_point).unwrap() = PointXYZ::new(7.0, 7.0, 7.0);
        assert_eq!(PointXYZ::new(7.0, 7.0, 7.0), buffer[0]);

        *buffer.emplace_back(new_point).unwrap() = PointXYZ::new(8.0, 8.0, 8.0);
        assert_eq!(Some(&PointXYZ::new(8.0, 8.0, 8.0)), buffer.last());
    }

    #[test]
    fn test_insert_erase_positions_are_checked() {
        let mut buffer = indexed_points(2).into_iter().collect::<HybridBuffer<_>>();
        assert_eq!(
            Err(Error::OutOfRange { index: 3, len: 2 }),
            buffer.insert(3, PointXYZ::default())
        );
        assert_eq!(
            Err(Error::OutOfRange { index: 2, len: 2 }),
            buffer.erase(2)
        );
        assert_eq!(
            Err(Error::OutOfRange { index: 3, len: 2 }),
            buffer.erase_range(1..3)
        );
        assert_eq!(indexed_points(2).as_slice(), buffer.as_slice());
    }

    #[test]
    fn test_assign() {
        let mut buffer = indexed_points(3).into_iter().collect::<HybridBuffer<_>>();
        let value = PointXYZ::new(1.0, 2.0, 3.0);
        buffer.assign(5, value).unwrap();
        assert_eq!(vec![value; 5], buffer.as_slice());

        buffer.assign_iter(indexed_points(2)).unwrap();
        assert_eq!(indexed_points(2).as_slice(), buffer.as_slice());
    }

    #[test]
    fn test_borrowed_buffer_aliases_external_memory() {
        let mut external = indexed_points(4);
        let external_ptr = external.as_ptr();
        {
            let mut buffer = HybridBuffer::borrowed(&mut external);
            assert_eq!(BufferMode::Borrowing, buffer.mode());
            assert_eq!(4, buffer.capacity());
            assert_eq!(external_ptr, buffer.as_ptr());

            buffer[2] = PointXYZ::new(-2.0, -2.0, -2.0);
            buffer.get_mut(3).unwrap().x = 99.0;
        }
        assert_eq!(PointXYZ::new(-2.0, -2.0, -2.0), external[2]);
        assert_eq!(99.0, external[3].x);
    }

    #[test]
    fn test_borrowed_buffer_rejects_length_changes() {
        let mut external = indexed_points(4);
        let mut buffer = HybridBuffer::borrowed(&mut external);
        let point = PointXYZ::default();
        let violation = |requested| Error::CapacityViolation {
            requested,
            capacity: 4,
        };

        assert_eq!(Err(violation(5)), buffer.push(point));
        assert_eq!(Err(violation(5)), buffer.emplace_back(point).map(|_| ()));
        assert_eq!(Err(violation(5)), buffer.insert(0, point));
        assert_eq!(Err(violation(6)), buffer.insert_n(0, 2, point));
        assert_eq!(Err(violation(5)), buffer.insert_iter(4, vec![point]));
        assert_eq!(Err(violation(3)), buffer.erase(0));
        assert_eq!(Err(violation(2)), buffer.erase_range(0..2));
        assert_eq!(Err(violation(8)), buffer.resize(8));
        assert_eq!(Err(violation(2)), buffer.resize(2));
        assert_eq!(Err(violation(1)), buffer.assign(1, point));
        assert_eq!(Err(violation(5)), buffer.assign_iter(indexed_points(5)));
        assert_eq!(Err(violation(16)), buffer.reserve(16));
        assert_eq!(Err(violation(0)), buffer.clear());

        assert_eq!(4, buffer.len());
        assert_eq!(indexed_points(4).as_slice(), buffer.as_slice());
        assert_eq!(0, buffer.generation());
    }

    #[test]
    fn test_borrowed_buffer_allows_length_preserving_operations() {
        let mut external = indexed_points(3);
        let mut buffer = HybridBuffer::borrowed(&mut external);
        let value = PointXYZ::new(5.0, 5.0, 5.0);

        buffer.resize(3).unwrap();
        buffer.reserve(2).unwrap();
        buffer.insert_iter(1, vec![]).unwrap();
        buffer.erase_range(1..1).unwrap();
        buffer.assign_iter(indexed_points(3).into_iter().rev()).unwrap();
        assert_eq!(indexed_points(3)[2], buffer[0]);

        buffer.assign(3, value).unwrap();
        drop(buffer);
        assert_eq!(vec![value; 3], external);
    }

    #[test]
    fn test_raw_parts_buffer() {
        let mut external = indexed_points(5);
        let mut buffer = unsafe { HybridBuffer::from_raw_parts(external.as_mut_ptr(), 5) };
        assert!(buffer.is_borrowing());
        buffer[0].z = -1.0;
        drop(buffer);
        assert_eq!(-1.0, external[0].z);

        let empty: HybridBuffer<PointXYZ> =
            unsafe { HybridBuffer::from_raw_parts(std::ptr::null_mut(), 0) };
        assert!(empty.is_empty());
    }

    #[test]
    fn test_clone_detaches_from_external_memory() {
        let mut external = indexed_points(3);
        let buffer = HybridBuffer::borrowed(&mut external);
        let mut copy = buffer.clone();
        assert_eq!(BufferMode::Owning, copy.mode());
        assert_eq!(buffer, copy);
        assert_ne!(buffer.as_ptr(), copy.as_ptr());

        copy.push(PointXYZ::default()).unwrap();
        copy[0].x = 1000.0;
        drop(copy);
        drop(buffer);
        assert_eq!(indexed_points(3), external);
    }

    #[test]
    fn test_swap_exchanges_modes() {
        let mut external = indexed_points(2);
        let mut borrowed = HybridBuffer::borrowed(&mut external);
        let mut owned = indexed_points(5).into_iter().collect::<HybridBuffer<_>>();
        borrowed.swap(&mut owned);
        assert_eq!(BufferMode::Owning, borrowed.mode());
        assert_eq!(5, borrowed.len());
        assert_eq!(BufferMode::Borrowing, owned.mode());
        assert_eq!(2, owned.len());
    }

    #[test]
    fn test_into_vec() {
        let mut external = indexed_points(2);
        let borrowed = HybridBuffer::borrowed(&mut external);
        assert_eq!(indexed_points(2), borrowed.into_vec());
    }
}
