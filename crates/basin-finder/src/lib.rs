#![deny(missing_docs)]
#![doc = env!("CARGO_PKG_DESCRIPTION")]
//!
//! # Overview
//!
//! The input is a `[dim0, dim1, dim2]` tensor of samples. Every lane along `dim1`
//! is transformed independently: each position `q` receives
//! `min_p (q - p)^2 + f(p)` together with the minimizing position `p` (its basin).
//! The breakpoints and apex positions of each lane's lower envelope can be
//! exported as well.
//!
//! ```rust
//! use basin_finder::{basin_transform, BasinOutputs};
//! use basin_tensor::Tensor3;
//!
//! let src = Tensor3::from_shape_vec([1, 4, 1], vec![0.0f32, 5.0, 5.0, 1.0]).unwrap();
//! let outputs: BasinOutputs<f32, i32> = basin_transform(&src).unwrap();
//!
//! assert_eq!(outputs.distances.as_slice(), &[0.0, 1.0, 2.0, 1.0]);
//! assert_eq!(outputs.basins.as_slice(), &[0, 0, 3, 3]);
//! ```

/// Sample and index element traits.
pub mod element;

/// Lower envelope of parabolas for a single lane.
pub mod envelope;

/// Error types for the basin finder.
pub mod error;

/// module containing parallelization utilities.
pub mod parallel;

/// Brute-force reference implementation.
pub mod reference;

/// The basin finder operator and its configuration.
pub mod transform;

pub use element::{BasinIndex, Sample};
pub use envelope::{transform_1d, Envelope};
pub use error::BasinFinderError;
pub use parallel::{ExecutionStrategy, ParallelError};
pub use transform::{
    basin_transform, validate_shape, BasinFinder, BasinFinderConfig, BasinOutputs,
    EnvelopeOutputs,
};
