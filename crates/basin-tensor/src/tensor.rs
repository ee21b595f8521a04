use thiserror::Error;

use crate::lane::{Lane, LaneMut};

/// An error type for tensor operations.
#[derive(Error, Debug, PartialEq)]
pub enum TensorError {
    /// Tensor shape does not match the provided data.
    ///
    /// The product of the shape dimensions must equal the number of elements.
    #[error("Shape mismatch: expected {expected} elements for shape, but got {actual} elements in data")]
    InvalidShape {
        /// Expected number of elements based on shape
        expected: usize,
        /// Actual number of elements in the data
        actual: usize,
    },

    /// The dynamic shape has the wrong number of dimensions.
    #[error("Rank mismatch: expected a {expected}-dimensional shape, got {actual} dimensions")]
    InvalidRank {
        /// Rank required by the tensor type
        expected: usize,
        /// Rank of the provided shape
        actual: usize,
    },

    /// Index exceeds tensor bounds.
    #[error("Index {index} out of bounds for dimension of size {size}")]
    IndexOutOfBounds {
        /// The invalid index that was attempted
        index: usize,
        /// The size of the dimension being indexed
        size: usize,
    },

    /// The product of the shape dimensions overflows `usize`.
    #[error("Shape {0:?} has more elements than can be addressed")]
    CapacityOverflow(Vec<usize>),
}

impl TensorError {
    /// Creates an InvalidShape error with clear context.
    pub fn invalid_shape(expected: usize, actual: usize) -> Self {
        Self::InvalidShape { expected, actual }
    }

    /// Creates an IndexOutOfBounds error with clear context.
    pub fn index_out_of_bounds(index: usize, size: usize) -> Self {
        Self::IndexOutOfBounds { index, size }
    }
}

/// Computes the strides for a row-major (C-contiguous) tensor layout.
///
/// The rightmost dimension has stride 1, and each dimension's stride is the
/// product of all dimensions to its right.
///
/// # Examples
///
/// ```rust
/// use basin_tensor::get_strides_from_shape;
///
/// let strides = get_strides_from_shape([2, 3, 4]);
/// assert_eq!(strides, [12, 4, 1]);
/// ```
pub fn get_strides_from_shape<const N: usize>(shape: [usize; N]) -> [usize; N] {
    let mut strides: [usize; N] = [0; N];
    let mut stride = 1;
    for i in (0..shape.len()).rev() {
        strides[i] = stride;
        stride *= shape[i];
    }
    strides
}

/// Number of elements described by `shape`, or an error if it overflows `usize`.
pub(crate) fn checked_numel(shape: &[usize]) -> Result<usize, TensorError> {
    shape
        .iter()
        .try_fold(1usize, |acc, &d| acc.checked_mul(d))
        .ok_or_else(|| TensorError::CapacityOverflow(shape.to_vec()))
}

/// A multi-dimensional array with owned, contiguous, row-major data.
///
/// # Type Parameters
///
/// * `T` - The element type stored in the tensor
/// * `N` - The number of dimensions (const generic, checked at compile time)
///
/// # Examples
///
/// ```rust
/// use basin_tensor::Tensor2;
///
/// let t = Tensor2::from_shape_vec([2, 2], vec![1u8, 2, 3, 4]).unwrap();
/// assert_eq!(t.shape, [2, 2]);
/// assert_eq!(t.get([1, 0]), Some(&3));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Tensor<T, const N: usize> {
    /// The storage of the tensor.
    pub storage: Vec<T>,
    /// The shape of the tensor.
    pub shape: [usize; N],
    /// The strides of the tensor data in memory.
    pub strides: [usize; N],
}

impl<T, const N: usize> Tensor<T, N> {
    /// Creates a new tensor with the given shape and data.
    ///
    /// # Errors
    ///
    /// Returns [`TensorError::InvalidShape`] if the number of elements in the data
    /// does not match the shape, or [`TensorError::CapacityOverflow`] if the shape
    /// cannot be addressed.
    pub fn from_shape_vec(shape: [usize; N], data: Vec<T>) -> Result<Self, TensorError> {
        let numel = checked_numel(&shape)?;
        if numel != data.len() {
            return Err(TensorError::invalid_shape(numel, data.len()));
        }
        Ok(Self {
            storage: data,
            shape,
            strides: get_strides_from_shape(shape),
        })
    }

    /// Creates a new tensor from a shape known only at runtime.
    ///
    /// # Errors
    ///
    /// Returns [`TensorError::InvalidRank`] if `shape` does not have `N` dimensions,
    /// otherwise the same errors as [`Tensor::from_shape_vec`].
    ///
    /// # Examples
    ///
    /// ```rust
    /// use basin_tensor::{Tensor3, TensorError};
    ///
    /// let err = Tensor3::<f32>::from_dyn_shape_vec(&[4], vec![0.0; 4]).unwrap_err();
    /// assert_eq!(err, TensorError::InvalidRank { expected: 3, actual: 1 });
    /// ```
    pub fn from_dyn_shape_vec(shape: &[usize], data: Vec<T>) -> Result<Self, TensorError> {
        let shape: [usize; N] = shape.try_into().map_err(|_| TensorError::InvalidRank {
            expected: N,
            actual: shape.len(),
        })?;
        Self::from_shape_vec(shape, data)
    }

    /// Creates a new tensor filled with `value`.
    ///
    /// # Errors
    ///
    /// Returns [`TensorError::CapacityOverflow`] if the shape cannot be addressed.
    pub fn from_shape_val(shape: [usize; N], value: T) -> Result<Self, TensorError>
    where
        T: Clone,
    {
        let numel = checked_numel(&shape)?;
        Ok(Self {
            storage: vec![value; numel],
            shape,
            strides: get_strides_from_shape(shape),
        })
    }

    /// Creates a new tensor filled with zeros.
    ///
    /// # Errors
    ///
    /// Returns [`TensorError::CapacityOverflow`] if the shape cannot be addressed.
    pub fn zeros(shape: [usize; N]) -> Result<Self, TensorError>
    where
        T: num_traits::Zero + Clone,
    {
        Self::from_shape_val(shape, T::zero())
    }

    /// Creates a new tensor by evaluating `f` at every multi-dimensional index.
    ///
    /// # Errors
    ///
    /// Returns [`TensorError::CapacityOverflow`] if the shape cannot be addressed.
    pub fn from_shape_fn<F>(shape: [usize; N], mut f: F) -> Result<Self, TensorError>
    where
        F: FnMut([usize; N]) -> T,
    {
        let strides = get_strides_from_shape(shape);
        let numel = checked_numel(&shape)?;
        let storage = (0..numel)
            .map(|i| {
                let mut index = [0; N];
                let mut rem = i;
                for (dim, stride) in strides.iter().enumerate() {
                    index[dim] = rem / stride;
                    rem %= stride;
                }
                f(index)
            })
            .collect();
        Ok(Self {
            storage,
            shape,
            strides,
        })
    }

    /// Returns the number of elements in the tensor.
    #[inline]
    pub fn numel(&self) -> usize {
        self.storage.len()
    }

    /// Returns the tensor data as a slice.
    #[inline]
    pub fn as_slice(&self) -> &[T] {
        &self.storage
    }

    /// Returns the tensor data as a mutable slice.
    #[inline]
    pub fn as_slice_mut(&mut self) -> &mut [T] {
        &mut self.storage
    }

    /// Consumes the tensor and returns the underlying vector.
    #[inline]
    pub fn into_vec(self) -> Vec<T> {
        self.storage
    }

    /// Returns the flat offset of `index`, or `None` if any coordinate is out of bounds.
    pub fn offset_of(&self, index: [usize; N]) -> Option<usize> {
        if index.iter().zip(self.shape.iter()).any(|(i, s)| i >= s) {
            return None;
        }
        Some(
            index
                .iter()
                .zip(self.strides.iter())
                .fold(0, |acc, (i, s)| acc + i * s),
        )
    }

    /// Returns a reference to the element at `index`, or `None` if out of bounds.
    pub fn get(&self, index: [usize; N]) -> Option<&T> {
        self.offset_of(index).and_then(|offset| self.storage.get(offset))
    }

    /// Returns a reference to the element at `index` without checking the
    /// individual coordinates.
    ///
    /// # Panics
    ///
    /// Panics if the computed flat offset lies outside the storage.
    pub fn get_unchecked(&self, index: [usize; N]) -> &T {
        let offset = index
            .iter()
            .zip(self.strides.iter())
            .fold(0, |acc, (i, s)| acc + i * s);
        &self.storage[offset]
    }
}

impl<T> Tensor<T, 3> {
    /// Returns the lane along the middle axis at `(i0, i2)`.
    ///
    /// # Errors
    ///
    /// Returns [`TensorError::IndexOutOfBounds`] if `i0` or `i2` is out of bounds.
    pub fn lane(&self, i0: usize, i2: usize) -> Result<Lane<'_, T>, TensorError> {
        let [dim0, dim1, dim2] = self.shape;
        check_lane_index(i0, i2, dim0, dim2)?;
        Lane::new(&self.storage, i0 * dim1 * dim2 + i2, dim2, dim1)
    }

    /// Returns the mutable lane along the middle axis at `(i0, i2)`.
    ///
    /// # Errors
    ///
    /// Returns [`TensorError::IndexOutOfBounds`] if `i0` or `i2` is out of bounds.
    pub fn lane_mut(&mut self, i0: usize, i2: usize) -> Result<LaneMut<'_, T>, TensorError> {
        let [dim0, dim1, dim2] = self.shape;
        check_lane_index(i0, i2, dim0, dim2)?;
        LaneMut::new(&mut self.storage, i0 * dim1 * dim2 + i2, dim2, dim1)
    }
}

fn check_lane_index(i0: usize, i2: usize, dim0: usize, dim2: usize) -> Result<(), TensorError> {
    if i0 >= dim0 {
        return Err(TensorError::index_out_of_bounds(i0, dim0));
    }
    if i2 >= dim2 {
        return Err(TensorError::index_out_of_bounds(i2, dim2));
    }
    Ok(())
}
