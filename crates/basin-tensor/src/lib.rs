#![deny(missing_docs)]
#![doc = env!("CARGO_PKG_DESCRIPTION")]
//!
//! # Overview
//!
//! `basin-tensor` holds the data containers shared by the basin finder: an owned,
//! row-major [`Tensor`] with const-generic rank, and the strided [`Lane`] /
//! [`LaneMut`] views used to walk a single axis of a flat buffer without doing
//! stride arithmetic at every call site.
//!
//! # Quick Start
//!
//! ```rust
//! use basin_tensor::Tensor3;
//!
//! // a [2, 3, 2] tensor, dim2 is the fastest varying axis
//! let t = Tensor3::from_shape_fn([2, 3, 2], |[i0, i1, i2]| (i0 * 100 + i1 * 10 + i2) as f32).unwrap();
//!
//! // the lane along dim1 at (i0, i2) = (1, 1)
//! let lane = t.lane(1, 1).unwrap();
//! assert_eq!(lane.to_vec(), vec![101.0, 111.0, 121.0]);
//! ```

/// Strided lane views over flat buffers.
///
/// This module provides [`Lane`] and [`LaneMut`], the bounds-checked views of one
/// axis of a row-major buffer.
pub mod lane;

/// Serde module for JSON/other format serialization and deserialization.
///
/// Tensors serialize as `{ "shape": [..], "data": [..] }` when the `serde` feature
/// is enabled.
#[cfg(feature = "serde")]
pub mod serde;

/// Tensor module containing the owned tensor implementation and error types.
pub mod tensor;

pub use crate::lane::{Lane, LaneMut};
pub use crate::tensor::{get_strides_from_shape, Tensor, TensorError};

/// Type alias for a 1-dimensional tensor.
pub type Tensor1<T> = Tensor<T, 1>;

/// Type alias for a 2-dimensional tensor.
pub type Tensor2<T> = Tensor<T, 2>;

/// Type alias for a 3-dimensional tensor.
pub type Tensor3<T> = Tensor<T, 3>;
