use basin_tensor::{Lane, LaneMut, TensorError};

use crate::element::{BasinIndex, Sample};

/// Abscissa where the unit parabola rooted at `q` meets the one rooted at `p`.
#[inline]
fn intersection<T: Sample>(f: &Lane<'_, T>, q: usize, p: usize) -> T {
    let qf = T::from_position(q);
    let pf = T::from_position(p);
    ((f[q] + qf * qf) - (f[p] + pf * pf)) / (qf + qf - (pf + pf))
}

/// Lower envelope of the parabolas `(x - p)^2 + f(p)` of a single lane.
///
/// The envelope owns the apex array `v` (one slot per lane position) and the
/// breakpoint array `z` (one extra slot). Only the first [`Envelope::num_apexes`]
/// apexes and the first `num_apexes + 1` breakpoints describe the envelope; the
/// remaining slots hold whatever the last build left behind (zero, or a value from
/// an apex that was later popped), which is what [`Envelope::export`] writes out.
///
/// An `Envelope` is meant to be reused across lanes of the same length so that a
/// worker allocates its scratch once.
///
/// # Examples
///
/// ```rust
/// use basin_finder::envelope::Envelope;
/// use basin_tensor::Lane;
///
/// let f = [10.0f32, 0.0, 10.0, 10.0, 10.0];
/// let mut envelope = Envelope::new();
/// envelope.build(Lane::contiguous(&f));
///
/// assert_eq!(envelope.apexes(), &[0, 1, 4]);
/// assert_eq!(envelope.breakpoints().len(), 4);
/// ```
#[derive(Debug, Clone, Default)]
pub struct Envelope<T> {
    apexes: Vec<usize>,
    breakpoints: Vec<T>,
    last: usize,
}

impl<T: Sample> Envelope<T> {
    /// Creates an empty envelope.
    pub fn new() -> Self {
        Self {
            apexes: Vec::new(),
            breakpoints: Vec::new(),
            last: 0,
        }
    }

    /// Creates an empty envelope with scratch space for lanes of length `len`.
    pub fn with_capacity(len: usize) -> Self {
        Self {
            apexes: Vec::with_capacity(len),
            breakpoints: Vec::with_capacity(len + 1),
            last: 0,
        }
    }

    /// Length of the lane the envelope was last built from.
    pub fn len(&self) -> usize {
        self.apexes.len()
    }

    /// Returns true if the envelope was never built or was built from an empty lane.
    pub fn is_empty(&self) -> bool {
        self.apexes.is_empty()
    }

    /// Number of parabolas retained in the lower envelope.
    pub fn num_apexes(&self) -> usize {
        if self.apexes.is_empty() {
            0
        } else {
            self.last + 1
        }
    }

    /// The retained apex positions, strictly increasing.
    pub fn apexes(&self) -> &[usize] {
        &self.apexes[..self.num_apexes()]
    }

    /// The active breakpoints: `-inf`, one boundary per apex change, then `+inf`.
    pub fn breakpoints(&self) -> &[T] {
        if self.apexes.is_empty() {
            return &[];
        }
        &self.breakpoints[..self.last + 2]
    }

    /// Builds the lower envelope of the lane `f` in a single left-to-right sweep.
    ///
    /// A candidate apex pops the rightmost retained parabola while their
    /// intersection lies at or before that parabola's left breakpoint, so on an
    /// exact tie the later apex wins.
    pub fn build(&mut self, f: Lane<'_, T>) {
        let n = f.len();

        self.apexes.clear();
        self.apexes.resize(n, 0);
        self.breakpoints.clear();
        self.breakpoints.resize(n + 1, T::zero());
        self.last = 0;

        if n == 0 {
            return;
        }

        let mut k = 0;
        self.breakpoints[0] = T::neg_infinity();
        self.breakpoints[1] = T::infinity();

        for q in 1..n {
            let mut s = intersection(&f, q, self.apexes[k]);
            // the first slot is -inf, popping past it is impossible for finite samples
            while k > 0 && s <= self.breakpoints[k] {
                k -= 1;
                s = intersection(&f, q, self.apexes[k]);
            }
            k += 1;
            self.apexes[k] = q;
            self.breakpoints[k] = s;
            self.breakpoints[k + 1] = T::infinity();
        }

        self.last = k;
    }

    /// Evaluates the envelope at every lane position.
    ///
    /// Writes the squared distance to the nearest apex plus its sample value into
    /// `out`, and the apex position into `basins`.
    ///
    /// # Panics
    ///
    /// Panics if `f`, `out` or `basins` do not have the length the envelope was
    /// built with.
    pub fn evaluate<S: BasinIndex>(
        &self,
        f: Lane<'_, T>,
        out: &mut LaneMut<'_, T>,
        basins: &mut LaneMut<'_, S>,
    ) {
        let n = self.len();
        assert_eq!(f.len(), n, "sample lane length does not match the envelope");
        assert_eq!(out.len(), n, "output lane length does not match the envelope");
        assert_eq!(basins.len(), n, "basin lane length does not match the envelope");

        let mut k = 0;
        for q in 0..n {
            let qf = T::from_position(q);
            while self.breakpoints[k + 1] < qf {
                k += 1;
            }
            let p = self.apexes[k];
            let d = T::from_position(q.abs_diff(p));
            basins[q] = S::from_index(p);
            out[q] = d * d + f[p];
        }
    }

    /// Copies the full breakpoint and apex arrays into `z` and `v`.
    ///
    /// # Panics
    ///
    /// Panics if `z` is not one slot longer than the lane or `v` is not as long as
    /// the lane.
    pub fn export<S: BasinIndex>(&self, z: &mut LaneMut<'_, T>, v: &mut LaneMut<'_, S>) {
        assert_eq!(z.len(), self.breakpoints.len(), "breakpoint lane length mismatch");
        assert_eq!(v.len(), self.apexes.len(), "apex lane length mismatch");
        z.copy_from_slice(&self.breakpoints);
        for (i, &apex) in self.apexes.iter().enumerate() {
            v[i] = S::from_index(apex);
        }
    }

    /// Builds the envelope of `f` and evaluates it into `out` and `basins`.
    pub fn transform<S: BasinIndex>(
        &mut self,
        f: Lane<'_, T>,
        out: &mut LaneMut<'_, T>,
        basins: &mut LaneMut<'_, S>,
    ) {
        self.build(f);
        self.evaluate(f, out, basins);
    }
}

/// Transforms one lane and, when given, exports its bookkeeping arrays.
pub(crate) fn transform_lane<T: Sample, S: BasinIndex>(
    envelope: &mut Envelope<T>,
    f: Lane<'_, T>,
    mut out: LaneMut<'_, T>,
    mut basins: LaneMut<'_, S>,
    internals: Option<(LaneMut<'_, T>, LaneMut<'_, S>)>,
) {
    envelope.transform(f, &mut out, &mut basins);
    if let Some((mut z, mut v)) = internals {
        envelope.export(&mut z, &mut v);
    }
}

/// Transforms every lane of one `[dim1, dim2]` slab.
///
/// `internals` holds the slab's `[dim1 + 1, dim2]` breakpoint and `[dim1, dim2]`
/// apex buffers.
pub(crate) fn transform_slab<T: Sample, S: BasinIndex>(
    envelope: &mut Envelope<T>,
    src: &[T],
    [dim1, dim2]: [usize; 2],
    out: &mut [T],
    basins: &mut [S],
    mut internals: Option<(&mut [T], &mut [S])>,
) -> Result<(), TensorError> {
    for i2 in 0..dim2 {
        let lanes = match internals.as_mut() {
            Some((z, v)) => Some((
                LaneMut::new(z, i2, dim2, dim1 + 1)?,
                LaneMut::new(v, i2, dim2, dim1)?,
            )),
            None => None,
        };
        transform_lane(
            envelope,
            Lane::new(src, i2, dim2, dim1)?,
            LaneMut::new(out, i2, dim2, dim1)?,
            LaneMut::new(basins, i2, dim2, dim1)?,
            lanes,
        );
    }
    Ok(())
}

/// Transforms a single contiguous row.
///
/// Returns the distances and the basin of every position.
///
/// # Examples
///
/// ```rust
/// use basin_finder::envelope::transform_1d;
///
/// let (out, basins) = transform_1d(&[10.0f32, 0.0, 10.0, 10.0, 10.0]);
/// assert_eq!(out, vec![1.0, 0.0, 1.0, 4.0, 9.0]);
/// assert_eq!(basins, vec![1, 1, 1, 1, 1]);
/// ```
pub fn transform_1d<T: Sample>(f: &[T]) -> (Vec<T>, Vec<usize>) {
    let mut out = vec![T::zero(); f.len()];
    let mut basins = vec![0usize; f.len()];
    let mut envelope = Envelope::with_capacity(f.len());
    envelope.transform(
        Lane::contiguous(f),
        &mut LaneMut::contiguous(&mut out),
        &mut LaneMut::contiguous(&mut basins),
    );
    (out, basins)
}
