use basin_tensor::{Tensor3, TensorError};

use crate::element::Sample;

// NOTE: only for testing, quadratic in dim1
/// Brute-force transform of every lane, comparing each position against every sample.
///
/// Ties are broken toward the smaller apex position.
pub fn basins_vanilla<T: Sample>(
    src: &Tensor3<T>,
) -> Result<(Tensor3<T>, Tensor3<usize>), TensorError> {
    let [dim0, dim1, dim2] = src.shape;
    let mut out = Tensor3::from_shape_val(src.shape, T::zero())?;
    let mut basins = Tensor3::from_shape_val(src.shape, 0usize)?;

    for i0 in 0..dim0 {
        for i2 in 0..dim2 {
            for q in 0..dim1 {
                let mut best = (T::infinity(), 0);
                for p in 0..dim1 {
                    let d = T::from_position(q.abs_diff(p));
                    let value = d * d + *src.get_unchecked([i0, p, i2]);
                    if value < best.0 {
                        best = (value, p);
                    }
                }
                let offset = (i0 * dim1 + q) * dim2 + i2;
                out.as_slice_mut()[offset] = best.0;
                basins.as_slice_mut()[offset] = best.1;
            }
        }
    }

    Ok((out, basins))
}
