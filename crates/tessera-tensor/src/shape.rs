//! Row-major shape arithmetic shared by every storage kind.

use crate::error::TensorError;

/// Validates a shape: at least one dimension, every dimension strictly positive,
/// and an element count that fits in `usize`.
pub fn validate_shape(shape: &[usize]) -> Result<(), TensorError> {
    if shape.is_empty() || shape.contains(&0) || checked_numel(shape).is_none() {
        return Err(TensorError::invalid_shape(shape));
    }
    Ok(())
}

/// Number of elements addressed by `shape`, or `None` on overflow.
pub fn checked_numel(shape: &[usize]) -> Option<usize> {
    shape.iter().try_fold(1usize, |acc, &dim| acc.checked_mul(dim))
}

/// Number of elements addressed by a shape that passed [`validate_shape`].
pub fn numel(shape: &[usize]) -> usize {
    shape.iter().product()
}

/// Computes the strides for a row-major (C-contiguous) layout.
///
/// The rightmost dimension has stride 1 and each dimension's stride is the
/// product of all dimensions to its right.
///
/// ```rust
/// use tessera_tensor::shape::get_strides_from_shape;
///
/// assert_eq!(get_strides_from_shape(&[2, 3]), vec![3, 1]);
/// assert_eq!(get_strides_from_shape(&[2, 3, 4]), vec![12, 4, 1]);
/// ```
pub fn get_strides_from_shape(shape: &[usize]) -> Vec<usize> {
    let mut strides = vec![0; shape.len()];
    let mut stride: usize = 1;
    for i in (0..shape.len()).rev() {
        strides[i] = stride;
        stride = stride.saturating_mul(shape[i]);
    }
    strides
}

/// Checks an index vector against a shape.
pub fn check_index(shape: &[usize], index: &[usize]) -> Result<(), TensorError> {
    if index.len() != shape.len() {
        return Err(TensorError::RankMismatch {
            expected: shape.len(),
            actual: index.len(),
        });
    }
    for (dim, (&idx, &size)) in index.iter().zip(shape).enumerate() {
        if idx >= size {
            return Err(TensorError::IndexOutOfBounds {
                index: idx,
                dim,
                size,
            });
        }
    }
    Ok(())
}

/// Flat offset of an index without bounds checks.
pub fn ravel_index_unchecked(strides: &[usize], index: &[usize]) -> usize {
    index
        .iter()
        .zip(strides)
        .fold(0, |acc, (&idx, &stride)| acc + idx * stride)
}

/// Flat offset of an index, checking rank and bounds.
pub fn ravel_index(shape: &[usize], strides: &[usize], index: &[usize]) -> Result<usize, TensorError> {
    check_index(shape, index)?;
    Ok(ravel_index_unchecked(strides, index))
}

/// Multi-dimensional index of a flat offset. The reverse of [`ravel_index_unchecked`].
pub fn unravel_index(strides: &[usize], offset: usize) -> Vec<usize> {
    let mut index = Vec::with_capacity(strides.len());
    let mut rem = offset;
    for &s in strides {
        index.push(rem / s);
        rem %= s;
    }
    index
}

/// Validates right-aligned broadcasting from `from` to `to`.
pub fn check_broadcast(from: &[usize], to: &[usize]) -> Result<(), TensorError> {
    validate_shape(to)?;
    let err = || TensorError::BroadcastMismatch {
        from: from.to_vec(),
        to: to.to_vec(),
    };
    if to.len() < from.len() {
        return Err(err());
    }
    let offset = to.len() - from.len();
    for (i, &src) in from.iter().enumerate() {
        if src != to[i + offset] && src != 1 {
            return Err(err());
        }
    }
    Ok(())
}

/// Validates that `perm` is a bijection on `0..rank`.
pub fn check_permutation(perm: &[usize], rank: usize) -> Result<(), TensorError> {
    let mut seen = vec![false; rank];
    let valid = perm.len() == rank
        && perm.iter().all(|&axis| {
            if axis >= rank || seen[axis] {
                return false;
            }
            seen[axis] = true;
            true
        });
    if !valid {
        return Err(TensorError::InvalidPermutation {
            permutation: perm.to_vec(),
            rank,
        });
    }
    Ok(())
}

/// Validates slice bounds and returns the shape of the sliced box.
pub fn check_slice(shape: &[usize], starts: &[usize], sizes: &[usize]) -> Result<Vec<usize>, TensorError> {
    for args in [starts, sizes] {
        if args.len() != shape.len() {
            return Err(TensorError::RankMismatch {
                expected: shape.len(),
                actual: args.len(),
            });
        }
    }
    for (dim, ((&start, &len), &size)) in starts.iter().zip(sizes).zip(shape).enumerate() {
        if len == 0 || start > size || len > size - start {
            return Err(TensorError::SliceOutOfBounds {
                dim,
                start,
                len,
                size,
            });
        }
    }
    Ok(sizes.to_vec())
}

/// Iterator over every index of a shape in row-major order.
pub struct IndexIter {
    shape: Vec<usize>,
    next: Option<Vec<usize>>,
}

impl IndexIter {
    /// Creates an iterator over all indices of `shape`.
    pub fn new(shape: &[usize]) -> Self {
        let next = (!shape.is_empty() && !shape.contains(&0)).then(|| vec![0; shape.len()]);
        Self {
            shape: shape.to_vec(),
            next,
        }
    }
}

impl Iterator for IndexIter {
    type Item = Vec<usize>;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next.take()?;
        let mut following = current.clone();
        for dim in (0..self.shape.len()).rev() {
            following[dim] += 1;
            if following[dim] < self.shape[dim] {
                self.next = Some(following);
                break;
            }
            following[dim] = 0;
        }
        Some(current)
    }
}
