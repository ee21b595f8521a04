use basin_tensor::TensorError;
use thiserror::Error;

use crate::parallel::ParallelError;

/// An error type for the basin finder operator.
///
/// Every variant is raised while validating the call, before any lane is
/// transformed, so an error never leaves the outputs partially written.
#[derive(Error, Debug, PartialEq)]
pub enum BasinFinderError {
    /// The transform axis has no samples.
    #[error("The transform axis (dim1) must not be empty, got shape {0:?}")]
    EmptyTransformAxis([usize; 3]),

    /// The tensor has more elements than the index type can address.
    #[error("Too many elements in tensor: {numel} exceeds the index capacity of {max}")]
    CapacityExceeded {
        /// Number of elements in the input tensor
        numel: usize,
        /// Largest value representable by the index type
        max: usize,
    },

    /// A pre-allocated output does not have the expected shape.
    #[error("Shape mismatch for {name}: expected {expected:?}, got {actual:?}")]
    ShapeMismatch {
        /// Name of the output buffer
        name: &'static str,
        /// Shape derived from the input tensor
        expected: [usize; 3],
        /// Shape of the provided buffer
        actual: [usize; 3],
    },

    /// The envelope buffers were requested but the outputs do not hold them.
    #[error("Envelope outputs were requested but no breakpoint/apex buffers were allocated")]
    MissingEnvelopeOutputs,

    /// Tensor error
    #[error("Error with the tensor: {0}")]
    TensorError(#[from] TensorError),

    /// Parallel execution error
    #[error(transparent)]
    ParallelError(#[from] ParallelError),
}
