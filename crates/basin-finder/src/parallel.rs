use rayon::prelude::*;
use thiserror::Error;

use basin_tensor::{Lane, LaneMut, TensorError};

use crate::element::{BasinIndex, Sample};
use crate::envelope::{transform_lane, transform_slab, Envelope};

/// Errors that can occur during parallel execution.
#[derive(Error, Debug, PartialEq)]
pub enum ParallelError {
    /// The thread pool failed to build.
    #[error("failed to build thread pool: {0}")]
    BuildError(String),

    /// The requested thread count is invalid.
    #[error("thread count must be > 0, got {0}")]
    InvalidThreadCount(usize),
}

/// Controls how the lanes of a tensor are distributed over threads.
///
/// Every lane is independent, so all strategies produce bit-identical outputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExecutionStrategy {
    /// Run sequentially on the current thread.
    ///
    /// Useful for small tensors, debugging, or when the caller already
    /// parallelizes at a coarser level.
    Serial,

    /// Use the global Rayon thread pool to process `dim0` slabs in parallel.
    ///
    /// Writes straight into the outputs, but cannot use more than `dim0` threads.
    ParallelSlabs,

    /// Use the global Rayon thread pool to process every lane in parallel.
    ///
    /// Lanes are computed into contiguous scratch buffers and scattered into the
    /// outputs afterwards. When `dim2 == 1` the lanes are already contiguous and
    /// this is the same as [`ExecutionStrategy::ParallelSlabs`].
    #[default]
    ParallelRows,

    /// Run [`ExecutionStrategy::ParallelRows`] on a local thread pool with `n` threads.
    ///
    /// # Warning
    /// Creates a new thread pool on every call, which has significant overhead.
    /// Use this primarily for benchmarking or specific isolation needs.
    Fixed(usize),
}

/// Flat buffers of one invocation, shaped `[dim0, dim1, dim2]` except the
/// breakpoints which are `[dim0, dim1 + 1, dim2]`.
pub(crate) struct LaneBuffers<'a, T, S> {
    pub src: &'a [T],
    pub out: &'a mut [T],
    pub basins: &'a mut [S],
    pub internals: Option<(&'a mut [T], &'a mut [S])>,
}

/// Runs the transform over every lane with the requested strategy.
///
/// The shape must have been validated and hold at least one element.
pub(crate) fn run<T: Sample, S: BasinIndex>(
    strategy: ExecutionStrategy,
    shape: [usize; 3],
    buffers: LaneBuffers<'_, T, S>,
) -> Result<(), crate::BasinFinderError> {
    match strategy {
        ExecutionStrategy::Serial => for_each_slab(shape, buffers)?,
        ExecutionStrategy::ParallelSlabs => par_for_each_slab(shape, buffers)?,
        ExecutionStrategy::ParallelRows => par_for_each_row(shape, buffers)?,
        ExecutionStrategy::Fixed(n) => {
            if n == 0 {
                return Err(ParallelError::InvalidThreadCount(n).into());
            }
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(n)
                .build()
                .map_err(|e| ParallelError::BuildError(e.to_string()))?;

            pool.install(|| par_for_each_row(shape, buffers))?;
        }
    }
    Ok(())
}

fn for_each_slab<T: Sample, S: BasinIndex>(
    [dim0, dim1, dim2]: [usize; 3],
    buffers: LaneBuffers<'_, T, S>,
) -> Result<(), TensorError> {
    let LaneBuffers {
        src,
        out,
        basins,
        mut internals,
    } = buffers;
    let slab = dim1 * dim2;
    let z_slab = (dim1 + 1) * dim2;

    let mut envelope = Envelope::with_capacity(dim1);
    for i0 in 0..dim0 {
        let range = i0 * slab..(i0 + 1) * slab;
        log::trace!("transforming slab {i0}/{dim0}");
        transform_slab(
            &mut envelope,
            &src[range.clone()],
            [dim1, dim2],
            &mut out[range.clone()],
            &mut basins[range.clone()],
            internals
                .as_mut()
                .map(|(z, v)| (&mut z[i0 * z_slab..(i0 + 1) * z_slab], &mut v[range.clone()])),
        )?;
    }
    Ok(())
}

fn par_for_each_slab<T: Sample, S: BasinIndex>(
    [_, dim1, dim2]: [usize; 3],
    buffers: LaneBuffers<'_, T, S>,
) -> Result<(), TensorError> {
    let LaneBuffers {
        src,
        out,
        basins,
        internals,
    } = buffers;
    let slab = dim1 * dim2;
    let z_slab = (dim1 + 1) * dim2;

    let slabs = src
        .par_chunks(slab)
        .zip(out.par_chunks_mut(slab))
        .zip(basins.par_chunks_mut(slab));

    match internals {
        Some((z, v)) => slabs
            .zip(z.par_chunks_mut(z_slab).zip(v.par_chunks_mut(slab)))
            .try_for_each_init(
                || Envelope::with_capacity(dim1),
                |envelope, (((f, o), b), (z, v))| {
                    transform_slab(envelope, f, [dim1, dim2], o, b, Some((z, v)))
                },
            ),
        None => slabs.try_for_each_init(
            || Envelope::with_capacity(dim1),
            |envelope, ((f, o), b)| transform_slab(envelope, f, [dim1, dim2], o, b, None),
        ),
    }
}

fn par_for_each_row<T: Sample, S: BasinIndex>(
    shape: [usize; 3],
    buffers: LaneBuffers<'_, T, S>,
) -> Result<(), TensorError> {
    let [dim0, dim1, dim2] = shape;
    if dim2 == 1 {
        return par_for_each_slab(shape, buffers);
    }

    let LaneBuffers {
        src,
        out,
        basins,
        internals,
    } = buffers;
    let numel = dim0 * dim1 * dim2;

    // lane-major scratch, shaped [dim0, dim2, dim1]
    let mut out_rows = vec![T::zero(); numel];
    let mut basin_rows = vec![S::zero(); numel];
    let mut internal_rows = internals
        .is_some()
        .then(|| (vec![T::zero(); dim0 * dim2 * (dim1 + 1)], vec![S::zero(); numel]));

    let lane_of = |r: usize| Lane::new(src, (r / dim2) * dim1 * dim2 + r % dim2, dim2, dim1);

    let rows = out_rows
        .par_chunks_mut(dim1)
        .zip(basin_rows.par_chunks_mut(dim1))
        .enumerate();

    match internal_rows.as_mut() {
        Some((z_rows, v_rows)) => rows
            .zip(z_rows.par_chunks_mut(dim1 + 1).zip(v_rows.par_chunks_mut(dim1)))
            .try_for_each_init(
                || Envelope::with_capacity(dim1),
                |envelope, ((r, (o, b)), (z, v))| {
                    transform_lane(
                        envelope,
                        lane_of(r)?,
                        LaneMut::contiguous(o),
                        LaneMut::contiguous(b),
                        Some((LaneMut::contiguous(z), LaneMut::contiguous(v))),
                    );
                    Ok::<(), TensorError>(())
                },
            )?,
        None => rows.try_for_each_init(
            || Envelope::with_capacity(dim1),
            |envelope, (r, (o, b))| {
                transform_lane(
                    envelope,
                    lane_of(r)?,
                    LaneMut::contiguous(o),
                    LaneMut::contiguous(b),
                    None,
                );
                Ok::<(), TensorError>(())
            },
        )?,
    }

    scatter_lanes(&out_rows, out, dim1, dim2);
    scatter_lanes(&basin_rows, basins, dim1, dim2);
    if let (Some((z_rows, v_rows)), Some((z, v))) = (internal_rows, internals) {
        scatter_lanes(&z_rows, z, dim1 + 1, dim2);
        scatter_lanes(&v_rows, v, dim1, dim2);
    }
    Ok(())
}

/// Writes lane-major rows `[.., dim2, lane_len]` into the axis layout `[.., lane_len, dim2]`.
fn scatter_lanes<U: Copy + Send + Sync>(rows: &[U], dst: &mut [U], lane_len: usize, dim2: usize) {
    dst.par_chunks_mut(lane_len * dim2)
        .zip(rows.par_chunks(lane_len * dim2))
        .for_each(|(dst_slab, row_slab)| {
            for (i2, row) in row_slab.chunks_exact(lane_len).enumerate() {
                for (i1, value) in row.iter().enumerate() {
                    dst_slab[i1 * dim2 + i2] = *value;
                }
            }
        });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scatter_lanes() {
        // one slab, two lanes of length 3
        let rows = vec![1, 2, 3, 4, 5, 6];
        let mut dst = vec![0; 6];
        scatter_lanes(&rows, &mut dst, 3, 2);
        assert_eq!(dst, vec![1, 4, 2, 5, 3, 6]);
    }

    #[test]
    fn test_strategies_agree() -> Result<(), crate::BasinFinderError> {
        let shape = [3, 4, 2];
        let src = (0..24)
            .map(|i| ((i * 7) % 11) as f32)
            .collect::<Vec<_>>();

        let mut expected = None;
        for strategy in [
            ExecutionStrategy::Serial,
            ExecutionStrategy::ParallelSlabs,
            ExecutionStrategy::ParallelRows,
            ExecutionStrategy::Fixed(2),
        ] {
            let mut out = vec![0.0f32; 24];
            let mut basins = vec![0u32; 24];
            let mut z = vec![0.0f32; 30];
            let mut v = vec![0u32; 24];
            run(
                strategy,
                shape,
                LaneBuffers {
                    src: &src,
                    out: &mut out,
                    basins: &mut basins,
                    internals: Some((&mut z, &mut v)),
                },
            )?;
            let result = (out, basins, z, v);
            match &expected {
                None => expected = Some(result),
                Some(expected) => assert_eq!(expected, &result, "{strategy:?}"),
            }
        }
        Ok(())
    }

    #[test]
    fn test_fixed_zero_threads() {
        let src = [0.0f32; 2];
        let mut out = [0.0f32; 2];
        let mut basins = [0u32; 2];
        let res = run(
            ExecutionStrategy::Fixed(0),
            [1, 2, 1],
            LaneBuffers {
                src: &src,
                out: &mut out,
                basins: &mut basins,
                internals: None,
            },
        );
        assert_eq!(
            res.unwrap_err(),
            crate::BasinFinderError::ParallelError(ParallelError::InvalidThreadCount(0))
        );
    }
}
