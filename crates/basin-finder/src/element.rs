use num_traits::{Float, PrimInt};

/// A real-valued sample type the transform can run on.
///
/// Implemented for `f32` and `f64`.
pub trait Sample: Float + Send + Sync + std::fmt::Debug + 'static {
    /// Converts an axis position into the sample type.
    fn from_position(position: usize) -> Self;
}

macro_rules! impl_sample {
    ($($t:ty),*) => {
        $(
            impl Sample for $t {
                #[inline]
                fn from_position(position: usize) -> Self {
                    position as $t
                }
            }
        )*
    };
}

impl_sample!(f32, f64);

/// An integer type used to store apex and basin positions.
///
/// `MAX_INDEX` is the largest position representable by the type; the operator
/// refuses tensors whose element count exceeds it.
pub trait BasinIndex: PrimInt + Send + Sync + std::fmt::Debug + 'static {
    /// Largest position that fits in the type.
    const MAX_INDEX: usize;

    /// Converts an axis position into the index type.
    ///
    /// The position must not exceed [`BasinIndex::MAX_INDEX`].
    fn from_index(index: usize) -> Self;

    /// Converts the stored value back into an axis position.
    fn to_index(self) -> usize;
}

macro_rules! impl_basin_index {
    ($($t:ty),*) => {
        $(
            impl BasinIndex for $t {
                const MAX_INDEX: usize = if (<$t>::MAX as u128) > (usize::MAX as u128) {
                    usize::MAX
                } else {
                    <$t>::MAX as usize
                };

                #[inline]
                fn from_index(index: usize) -> Self {
                    debug_assert!(index <= Self::MAX_INDEX);
                    index as $t
                }

                #[inline]
                fn to_index(self) -> usize {
                    self as usize
                }
            }
        )*
    };
}

impl_basin_index!(i32, u32, i64, u64, usize);
