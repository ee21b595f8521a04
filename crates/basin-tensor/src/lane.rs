use std::ops::{Index, IndexMut};

use crate::tensor::TensorError;

/// Validates that a lane of `len` elements with step `stride` starting at `offset`
/// fits in a buffer of `size` elements.
fn check_lane_bounds(
    size: usize,
    offset: usize,
    stride: usize,
    len: usize,
) -> Result<(), TensorError> {
    if len == 0 {
        return if offset <= size {
            Ok(())
        } else {
            Err(TensorError::index_out_of_bounds(offset, size))
        };
    }
    let last = (len - 1)
        .checked_mul(stride)
        .and_then(|span| span.checked_add(offset))
        .ok_or(TensorError::index_out_of_bounds(usize::MAX, size))?;
    if last >= size {
        return Err(TensorError::index_out_of_bounds(last, size));
    }
    Ok(())
}

/// A read-only strided view of `len` elements of a flat buffer.
///
/// Element `i` of the lane lives at `offset + i * stride` in the underlying buffer.
/// Every access is bounds-checked against the lane length, so callers index the
/// lane with plain positions along the axis.
///
/// # Examples
///
/// ```rust
/// use basin_tensor::Lane;
///
/// let data = [0, 1, 2, 3, 4, 5];
/// let lane = Lane::new(&data, 1, 2, 3).unwrap();
/// assert_eq!(lane.to_vec(), vec![1, 3, 5]);
/// assert_eq!(lane[2], 5);
/// assert_eq!(lane.get(3), None);
/// ```
#[derive(Debug, Clone, Copy)]
pub struct Lane<'a, T> {
    data: &'a [T],
    stride: usize,
    len: usize,
}

impl<'a, T> Lane<'a, T> {
    /// Creates a lane over `data`.
    ///
    /// # Errors
    ///
    /// Returns [`TensorError::IndexOutOfBounds`] if the last element of the lane
    /// falls outside `data`.
    pub fn new(data: &'a [T], offset: usize, stride: usize, len: usize) -> Result<Self, TensorError> {
        check_lane_bounds(data.len(), offset, stride, len)?;
        Ok(Self {
            data: &data[offset.min(data.len())..],
            stride,
            len,
        })
    }

    /// Creates a contiguous lane covering the whole slice.
    pub fn contiguous(data: &'a [T]) -> Self {
        Self {
            data,
            stride: 1,
            len: data.len(),
        }
    }

    /// Returns the number of elements in the lane.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns true if the lane has no elements.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Returns the step between consecutive lane elements in the underlying buffer.
    #[inline]
    pub fn stride(&self) -> usize {
        self.stride
    }

    /// Returns a reference to element `i`, or `None` if `i >= len`.
    #[inline]
    pub fn get(&self, i: usize) -> Option<&'a T> {
        let data: &'a [T] = self.data;
        if i < self.len {
            data.get(i * self.stride)
        } else {
            None
        }
    }

    /// Returns an iterator over the lane elements.
    pub fn iter(&self) -> impl Iterator<Item = &'a T> {
        let data: &'a [T] = self.data;
        let stride = self.stride;
        (0..self.len).map(move |i| &data[i * stride])
    }

    /// Copies the lane into a new vector.
    pub fn to_vec(&self) -> Vec<T>
    where
        T: Clone,
    {
        self.iter().cloned().collect()
    }
}

impl<T> Index<usize> for Lane<'_, T> {
    type Output = T;

    fn index(&self, i: usize) -> &T {
        assert!(i < self.len, "lane index {i} out of bounds for length {}", self.len);
        &self.data[i * self.stride]
    }
}

/// A mutable strided view of `len` elements of a flat buffer.
///
/// The mutable counterpart of [`Lane`].
#[derive(Debug)]
pub struct LaneMut<'a, T> {
    data: &'a mut [T],
    stride: usize,
    len: usize,
}

impl<'a, T> LaneMut<'a, T> {
    /// Creates a mutable lane over `data`.
    ///
    /// # Errors
    ///
    /// Returns [`TensorError::IndexOutOfBounds`] if the last element of the lane
    /// falls outside `data`.
    pub fn new(
        data: &'a mut [T],
        offset: usize,
        stride: usize,
        len: usize,
    ) -> Result<Self, TensorError> {
        check_lane_bounds(data.len(), offset, stride, len)?;
        let start = offset.min(data.len());
        Ok(Self {
            data: &mut data[start..],
            stride,
            len,
        })
    }

    /// Creates a contiguous mutable lane covering the whole slice.
    pub fn contiguous(data: &'a mut [T]) -> Self {
        let len = data.len();
        Self {
            data,
            stride: 1,
            len,
        }
    }

    /// Returns the number of elements in the lane.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns true if the lane has no elements.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Returns a reference to element `i`, or `None` if `i >= len`.
    #[inline]
    pub fn get(&self, i: usize) -> Option<&T> {
        if i < self.len {
            self.data.get(i * self.stride)
        } else {
            None
        }
    }

    /// Returns a mutable reference to element `i`, or `None` if `i >= len`.
    #[inline]
    pub fn get_mut(&mut self, i: usize) -> Option<&mut T> {
        if i < self.len {
            self.data.get_mut(i * self.stride)
        } else {
            None
        }
    }

    /// Reborrows the lane as a read-only [`Lane`].
    pub fn as_lane(&self) -> Lane<'_, T> {
        Lane {
            data: &*self.data,
            stride: self.stride,
            len: self.len,
        }
    }

    /// Sets every element of the lane to `value`.
    pub fn fill(&mut self, value: T)
    where
        T: Clone,
    {
        for i in 0..self.len {
            self.data[i * self.stride] = value.clone();
        }
    }

    /// Copies `src` into the lane.
    ///
    /// # Panics
    ///
    /// Panics if `src` and the lane have different lengths.
    pub fn copy_from_slice(&mut self, src: &[T])
    where
        T: Copy,
    {
        assert_eq!(
            src.len(),
            self.len,
            "source slice length does not match the lane length"
        );
        for (i, value) in src.iter().enumerate() {
            self.data[i * self.stride] = *value;
        }
    }
}

impl<T> Index<usize> for LaneMut<'_, T> {
    type Output = T;

    fn index(&self, i: usize) -> &T {
        assert!(i < self.len, "lane index {i} out of bounds for length {}", self.len);
        &self.data[i * self.stride]
    }
}

impl<T> IndexMut<usize> for LaneMut<'_, T> {
    fn index_mut(&mut self, i: usize) -> &mut T {
        assert!(i < self.len, "lane index {i} out of bounds for length {}", self.len);
        &mut self.data[i * self.stride]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lane_strided() -> Result<(), TensorError> {
        let data = [10, 11, 12, 13, 14, 15, 16];
        let lane = Lane::new(&data, 2, 3, 2)?;
        assert_eq!(lane.len(), 2);
        assert_eq!(lane.stride(), 3);
        assert_eq!(lane.to_vec(), vec![12, 15]);
        assert_eq!(lane.get(1), Some(&15));
        assert_eq!(lane.get(2), None);
        Ok(())
    }

    #[test]
    fn test_lane_out_of_bounds() {
        let data = [0; 6];
        let res = Lane::new(&data, 1, 2, 4);
        assert_eq!(res.unwrap_err(), TensorError::index_out_of_bounds(7, 6));
    }

    #[test]
    fn test_lane_empty() -> Result<(), TensorError> {
        let data: [f32; 0] = [];
        let lane = Lane::new(&data, 0, 1, 0)?;
        assert!(lane.is_empty());
        assert_eq!(lane.iter().count(), 0);
        Ok(())
    }

    #[test]
    #[should_panic]
    fn test_lane_index_panics() {
        let data = [0, 1, 2, 3];
        let lane = Lane::new(&data, 0, 2, 2).unwrap();
        let _ = lane[2];
    }

    #[test]
    fn test_lane_mut() -> Result<(), TensorError> {
        let mut data = [0; 6];
        {
            let mut lane = LaneMut::new(&mut data, 1, 2, 3)?;
            lane.copy_from_slice(&[1, 2, 3]);
            lane[0] += 10;
            *lane.get_mut(2).unwrap() = 9;
            assert_eq!(lane.get_mut(3), None);
            assert_eq!(lane.as_lane().to_vec(), vec![11, 2, 9]);
        }
        assert_eq!(data, [0, 11, 0, 2, 0, 9]);

        LaneMut::contiguous(&mut data[..2]).fill(5);
        assert_eq!(data, [5, 5, 0, 2, 0, 9]);
        Ok(())
    }
}
