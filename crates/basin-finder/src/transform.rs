use basin_tensor::{Tensor3, TensorError};

use crate::element::{BasinIndex, Sample};
use crate::error::BasinFinderError;
use crate::parallel::{self, ExecutionStrategy, LaneBuffers};

/// Configuration of the [`BasinFinder`] operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BasinFinderConfig {
    /// Whether the breakpoint (`z`) and apex (`v`) buffers are produced.
    ///
    /// When `false` they only live in per-worker scratch and are discarded.
    pub expose_envelope: bool,
    /// How the lanes are distributed over threads.
    pub strategy: ExecutionStrategy,
}

impl Default for BasinFinderConfig {
    fn default() -> Self {
        Self {
            expose_envelope: true,
            strategy: ExecutionStrategy::default(),
        }
    }
}

/// The lower-envelope bookkeeping of every lane.
#[derive(Debug, Clone, PartialEq)]
pub struct EnvelopeOutputs<T, S> {
    /// Breakpoints `z`, shaped `[dim0, dim1 + 1, dim2]`.
    pub breakpoints: Tensor3<T>,
    /// Apex positions `v`, shaped `[dim0, dim1, dim2]`.
    pub apexes: Tensor3<S>,
}

/// The outputs of one [`BasinFinder`] invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct BasinOutputs<T, S> {
    /// Transformed distances, same shape as the input.
    pub distances: Tensor3<T>,
    /// Position of the apex achieving the minimum, same shape as the input.
    pub basins: Tensor3<S>,
    /// Breakpoints and apexes, present when the envelope is exposed.
    pub envelope: Option<EnvelopeOutputs<T, S>>,
}

impl<T: Sample, S: BasinIndex> BasinOutputs<T, S> {
    /// Allocates zeroed outputs for an input of shape `shape`.
    ///
    /// # Arguments
    ///
    /// * `shape` - The `[dim0, dim1, dim2]` shape of the input.
    /// * `expose_envelope` - Whether to allocate the breakpoint and apex buffers.
    ///
    /// # Errors
    ///
    /// Returns [`TensorError::CapacityOverflow`] if one of the buffers cannot be
    /// addressed, including the `dim1 + 1` breakpoint axis.
    pub fn allocate(shape: [usize; 3], expose_envelope: bool) -> Result<Self, TensorError> {
        let envelope = if expose_envelope {
            let [dim0, dim1, dim2] = shape;
            let z_dim1 = dim1
                .checked_add(1)
                .ok_or_else(|| TensorError::CapacityOverflow(shape.to_vec()))?;
            Some(EnvelopeOutputs {
                breakpoints: Tensor3::zeros([dim0, z_dim1, dim2])?,
                apexes: Tensor3::zeros(shape)?,
            })
        } else {
            None
        };
        Ok(Self {
            distances: Tensor3::zeros(shape)?,
            basins: Tensor3::zeros(shape)?,
            envelope,
        })
    }

    /// The shape of the input these outputs were computed for.
    pub fn shape(&self) -> [usize; 3] {
        self.distances.shape
    }
}

/// Checks that a tensor of shape `shape` can be transformed with index type `S`.
///
/// # Errors
///
/// * [`BasinFinderError::EmptyTransformAxis`] if `dim1 == 0`.
/// * [`BasinFinderError::TensorError`] if the breakpoint buffer cannot be addressed.
/// * [`BasinFinderError::CapacityExceeded`] if the element count exceeds `S::MAX_INDEX`.
pub fn validate_shape<S: BasinIndex>(shape: [usize; 3]) -> Result<(), BasinFinderError> {
    let [dim0, dim1, dim2] = shape;
    if dim1 == 0 {
        return Err(BasinFinderError::EmptyTransformAxis(shape));
    }

    let numel = dim0
        .checked_mul(dim1 + 1)
        .and_then(|n| n.checked_mul(dim2))
        .map(|_| dim0 * dim1 * dim2)
        .ok_or_else(|| TensorError::CapacityOverflow(vec![dim0, dim1 + 1, dim2]))?;

    if numel > S::MAX_INDEX {
        return Err(BasinFinderError::CapacityExceeded {
            numel,
            max: S::MAX_INDEX,
        });
    }
    Ok(())
}

fn check_shape(
    name: &'static str,
    expected: [usize; 3],
    actual: [usize; 3],
) -> Result<(), BasinFinderError> {
    if expected != actual {
        return Err(BasinFinderError::ShapeMismatch {
            name,
            expected,
            actual,
        });
    }
    Ok(())
}

/// Squared Euclidean distance transform along the middle axis of a 3-d tensor.
///
/// For every lane `f` at a fixed `(i0, i2)` the operator computes
/// `out[q] = min_p (q - p)^2 + f[p]` and the position `p` achieving it, using the
/// lower envelope of parabolas of Felzenszwalb and Huttenlocher in `O(dim1)` per lane.
///
/// # Examples
///
/// ```rust
/// use basin_finder::{BasinFinder, BasinFinderConfig, BasinOutputs};
/// use basin_tensor::Tensor3;
///
/// let src = Tensor3::from_shape_vec([1, 5, 1], vec![10.0f32, 0.0, 10.0, 10.0, 10.0]).unwrap();
/// let finder = BasinFinder::new(BasinFinderConfig::default());
/// let outputs: BasinOutputs<f32, i32> = finder.compute(&src).unwrap();
///
/// assert_eq!(outputs.distances.as_slice(), &[1.0, 0.0, 1.0, 4.0, 9.0]);
/// assert_eq!(outputs.basins.as_slice(), &[1, 1, 1, 1, 1]);
/// ```
#[derive(Debug, Clone, Default)]
pub struct BasinFinder {
    config: BasinFinderConfig,
}

impl BasinFinder {
    /// Creates a new operator with the given configuration.
    pub fn new(config: BasinFinderConfig) -> Self {
        Self { config }
    }

    /// Returns the operator configuration.
    pub fn config(&self) -> &BasinFinderConfig {
        &self.config
    }

    /// Transforms `src` into freshly allocated outputs.
    ///
    /// # Errors
    ///
    /// See [`validate_shape`] and [`BasinFinder::compute_into`].
    pub fn compute<T: Sample, S: BasinIndex>(
        &self,
        src: &Tensor3<T>,
    ) -> Result<BasinOutputs<T, S>, BasinFinderError> {
        validate_shape::<S>(src.shape)?;
        let mut outputs = BasinOutputs::allocate(src.shape, self.config.expose_envelope)?;
        self.compute_into(src, &mut outputs)?;
        Ok(outputs)
    }

    /// Transforms `src` into pre-allocated outputs.
    ///
    /// Every slot of `distances` and `basins` is overwritten. The envelope buffers
    /// are overwritten when `expose_envelope` is set and left untouched otherwise.
    ///
    /// # Errors
    ///
    /// * The errors of [`validate_shape`].
    /// * [`BasinFinderError::ShapeMismatch`] if an output has the wrong shape.
    /// * [`BasinFinderError::MissingEnvelopeOutputs`] if the envelope is exposed but
    ///   `outputs.envelope` is `None`.
    /// * [`BasinFinderError::ParallelError`] if the thread pool cannot be built.
    pub fn compute_into<T: Sample, S: BasinIndex>(
        &self,
        src: &Tensor3<T>,
        outputs: &mut BasinOutputs<T, S>,
    ) -> Result<(), BasinFinderError> {
        let shape = src.shape;
        let [dim0, dim1, dim2] = shape;
        validate_shape::<S>(shape)?;

        check_shape("distances", shape, outputs.distances.shape)?;
        check_shape("basins", shape, outputs.basins.shape)?;

        let internals = if self.config.expose_envelope {
            let envelope = outputs
                .envelope
                .as_mut()
                .ok_or(BasinFinderError::MissingEnvelopeOutputs)?;
            check_shape(
                "breakpoints",
                [dim0, dim1 + 1, dim2],
                envelope.breakpoints.shape,
            )?;
            check_shape("apexes", shape, envelope.apexes.shape)?;
            Some((
                envelope.breakpoints.as_slice_mut(),
                envelope.apexes.as_slice_mut(),
            ))
        } else {
            None
        };

        log::debug!(
            "basin finder: shape {:?}, strategy {:?}, expose_envelope {}",
            shape,
            self.config.strategy,
            self.config.expose_envelope
        );

        if src.numel() == 0 {
            return Ok(());
        }

        let now = std::time::Instant::now();
        parallel::run(
            self.config.strategy,
            shape,
            LaneBuffers {
                src: src.as_slice(),
                out: outputs.distances.as_slice_mut(),
                basins: outputs.basins.as_slice_mut(),
                internals,
            },
        )?;
        log::debug!("basin finder: {} lanes in {:?}", dim0 * dim2, now.elapsed());

        Ok(())
    }
}

/// Transforms `src` with the default configuration.
///
/// Convenience wrapper around [`BasinFinder::compute`].
pub fn basin_transform<T: Sample, S: BasinIndex>(
    src: &Tensor3<T>,
) -> Result<BasinOutputs<T, S>, BasinFinderError> {
    BasinFinder::default().compute(src)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_shape() {
        assert_eq!(validate_shape::<i32>([2, 3, 4]), Ok(()));
        assert_eq!(
            validate_shape::<i32>([2, 0, 4]),
            Err(BasinFinderError::EmptyTransformAxis([2, 0, 4]))
        );
        assert_eq!(
            validate_shape::<i32>([1, 1 << 16, 1 << 16]),
            Err(BasinFinderError::CapacityExceeded {
                numel: 1 << 32,
                max: i32::MAX as usize,
            })
        );
        assert_eq!(validate_shape::<u64>([1, 1 << 16, 1 << 16]), Ok(()));
        assert!(matches!(
            validate_shape::<u64>([usize::MAX, 2, 1]),
            Err(BasinFinderError::TensorError(TensorError::CapacityOverflow(_)))
        ));
    }

    #[test]
    fn test_allocate() -> Result<(), TensorError> {
        let outputs = BasinOutputs::<f32, u32>::allocate([2, 3, 4], true)?;
        assert_eq!(outputs.shape(), [2, 3, 4]);
        let envelope = outputs.envelope.expect("envelope outputs");
        assert_eq!(envelope.breakpoints.shape, [2, 4, 4]);
        assert_eq!(envelope.apexes.shape, [2, 3, 4]);

        let outputs = BasinOutputs::<f64, i64>::allocate([2, 3, 4], false)?;
        assert!(outputs.envelope.is_none());
        Ok(())
    }

    #[test]
    fn test_allocate_overflowing_shape() {
        assert_eq!(
            BasinOutputs::<f32, u64>::allocate([usize::MAX, 2, 1], false),
            Err(TensorError::CapacityOverflow(vec![usize::MAX, 2, 1]))
        );
        // the breakpoint axis overflows before anything is allocated
        assert_eq!(
            BasinOutputs::<f32, u64>::allocate([1, usize::MAX, 1], true),
            Err(TensorError::CapacityOverflow(vec![1, usize::MAX, 1]))
        );
    }

    #[test]
    fn test_compute_into_shape_mismatch() -> Result<(), TensorError> {
        let src = Tensor3::from_shape_vec([1, 3, 2], vec![0.0f32; 6])?;
        let finder = BasinFinder::default();

        let mut outputs = BasinOutputs::<f32, i32>::allocate([1, 3, 2], true)?;
        outputs.basins = Tensor3::zeros([1, 2, 3])?;
        assert_eq!(
            finder.compute_into(&src, &mut outputs),
            Err(BasinFinderError::ShapeMismatch {
                name: "basins",
                expected: [1, 3, 2],
                actual: [1, 2, 3],
            })
        );

        let mut outputs = BasinOutputs::<f32, i32>::allocate([1, 3, 2], true)?;
        if let Some(envelope) = outputs.envelope.as_mut() {
            envelope.breakpoints = Tensor3::zeros([1, 3, 2])?;
        }
        assert_eq!(
            finder.compute_into(&src, &mut outputs),
            Err(BasinFinderError::ShapeMismatch {
                name: "breakpoints",
                expected: [1, 4, 2],
                actual: [1, 3, 2],
            })
        );

        let mut outputs = BasinOutputs::<f32, i32>::allocate([1, 3, 2], false)?;
        assert_eq!(
            finder.compute_into(&src, &mut outputs),
            Err(BasinFinderError::MissingEnvelopeOutputs)
        );
        Ok(())
    }

    #[test]
    fn test_hidden_envelope_leaves_buffers_untouched() -> Result<(), BasinFinderError> {
        let src = Tensor3::from_shape_vec([1, 3, 1], vec![1.0f64, 0.0, 1.0])?;
        let finder = BasinFinder::new(BasinFinderConfig {
            expose_envelope: false,
            strategy: ExecutionStrategy::Serial,
        });

        let mut outputs = BasinOutputs::<f64, u32>::allocate([1, 3, 1], true)?;
        finder.compute_into(&src, &mut outputs)?;
        assert_eq!(outputs.distances.as_slice(), &[1.0, 0.0, 1.0]);
        let envelope = outputs.envelope.expect("envelope outputs");
        assert!(envelope.breakpoints.as_slice().iter().all(|z| *z == 0.0));

        let outputs: BasinOutputs<f64, u32> = finder.compute(&src)?;
        assert!(outputs.envelope.is_none());
        Ok(())
    }

    #[test]
    fn test_empty_outer_dims() -> Result<(), BasinFinderError> {
        let src = Tensor3::from_shape_vec([0, 4, 3], Vec::<f32>::new())?;
        let outputs: BasinOutputs<f32, i32> = basin_transform(&src)?;
        assert_eq!(outputs.distances.numel(), 0);
        let envelope = outputs.envelope.expect("envelope outputs");
        assert_eq!(envelope.breakpoints.shape, [0, 5, 3]);
        Ok(())
    }
}
