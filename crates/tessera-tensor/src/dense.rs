use std::borrow::Cow;

use rayon::prelude::*;

use crate::{
    config::AlgebraConfig,
    error::TensorError,
    ring::RingRef,
    shape::{
        check_broadcast, check_permutation, check_slice, get_strides_from_shape, numel,
        ravel_index, ravel_index_unchecked, validate_shape, IndexIter,
    },
    sparse::SparseTensor,
    tensor::{check_operands, BoxTensor, Scalar, StorageKind, Tensor},
};

/// A tensor storing every element in a contiguous row-major buffer.
///
/// Binary operations require identical shapes. A non-dense operand is read
/// through [`Tensor::to_vec`] first.
#[derive(Clone, Debug)]
pub struct DenseTensor<T> {
    data: Vec<T>,
    shape: Vec<usize>,
    strides: Vec<usize>,
    zero: T,
    ring: RingRef<T>,
    config: AlgebraConfig,
}

impl<T: Scalar> DenseTensor<T> {
    /// Creates a tensor filled with the ring's zero.
    pub fn zeros(shape: &[usize], ring: RingRef<T>) -> Result<Self, TensorError> {
        let zero = ring.zero();
        Self::from_shape_val(shape, zero, ring)
    }

    /// Creates a tensor with every element set to `value`.
    pub fn from_shape_val(shape: &[usize], value: T, ring: RingRef<T>) -> Result<Self, TensorError> {
        validate_shape(shape)?;
        let data = vec![value; numel(shape)];
        Ok(Self::from_parts(
            shape.to_vec(),
            data,
            ring.zero(),
            ring,
            AlgebraConfig::default(),
        ))
    }

    /// Creates a tensor from row-major data.
    ///
    /// # Errors
    ///
    /// Fails on an invalid shape or if `data.len()` differs from the number of elements.
    pub fn from_shape_vec(shape: &[usize], data: Vec<T>, ring: RingRef<T>) -> Result<Self, TensorError> {
        validate_shape(shape)?;
        let expected = numel(shape);
        if data.len() != expected {
            return Err(TensorError::SizeMismatch {
                expected,
                actual: data.len(),
            });
        }
        let zero = ring.zero();
        Ok(Self::from_parts(shape.to_vec(), data, zero, ring, AlgebraConfig::default()))
    }

    /// Assembles a tensor from a pre-validated shape and buffer.
    pub(crate) fn from_parts(
        shape: Vec<usize>,
        data: Vec<T>,
        zero: T,
        ring: RingRef<T>,
        config: AlgebraConfig,
    ) -> Self {
        Self {
            data,
            strides: get_strides_from_shape(&shape),
            shape,
            zero,
            ring,
            config,
        }
    }

    /// Replaces the algebra config. Derived tensors inherit it.
    pub fn with_config(mut self, config: AlgebraConfig) -> Self {
        self.config = config;
        self
    }

    /// The row-major buffer.
    pub fn as_slice(&self) -> &[T] {
        &self.data
    }

    /// Row-major strides of the tensor.
    pub fn strides(&self) -> &[usize] {
        &self.strides
    }

    /// Sparse copy of this tensor.
    pub fn to_sparse(&self) -> SparseTensor<T> {
        let data = self
            .data
            .iter()
            .enumerate()
            .filter(|(_, value)| !self.is_zero(value))
            .map(|(key, value)| (key, value.clone()))
            .collect();
        SparseTensor::from_parts(
            self.shape.clone(),
            data,
            self.zero.clone(),
            self.ring.clone(),
            self.config,
        )
    }

    #[inline]
    fn is_zero(&self, value: &T) -> bool {
        self.ring.equals(value, &self.zero)
    }

    fn derived(&self, shape: Vec<usize>, data: Vec<T>) -> Self {
        Self::from_parts(shape, data, self.zero.clone(), self.ring.clone(), self.config)
    }

    /// Applies `op` element-wise against a same-shaped operand.
    fn element_wise_op<F>(
        &self,
        operation: &'static str,
        other: &dyn Tensor<T>,
        op: F,
    ) -> Result<Self, TensorError>
    where
        F: Fn(&T, &T) -> T + Sync + Send,
    {
        check_operands(operation, self, other)?;
        let rhs: Cow<'_, [T]> = match other.as_dense() {
            Some(dense) => Cow::Borrowed(&dense.data),
            None => Cow::Owned(other.to_vec()),
        };
        let data = if self.config.use_parallel(self.data.len()) {
            self.data
                .par_iter()
                .zip(rhs.par_iter())
                .map(|(a, b)| op(a, b))
                .collect()
        } else {
            self.data.iter().zip(rhs.iter()).map(|(a, b)| op(a, b)).collect()
        };
        Ok(self.derived(self.shape.clone(), data))
    }

    /// Builds a tensor of `shape` whose element at each index is read from `source_index`.
    fn gather<F>(&self, shape: Vec<usize>, source_index: F) -> Self
    where
        F: Fn(&[usize]) -> Vec<usize>,
    {
        let data = IndexIter::new(&shape)
            .map(|index| {
                let src = source_index(&index);
                self.data[ravel_index_unchecked(&self.strides, &src)].clone()
            })
            .collect();
        self.derived(shape, data)
    }
}

impl<T: Scalar> Tensor<T> for DenseTensor<T> {
    fn storage_kind(&self) -> StorageKind {
        StorageKind::Dense
    }

    fn dims(&self) -> &[usize] {
        &self.shape
    }

    fn zero(&self) -> &T {
        &self.zero
    }

    fn ring(&self) -> &RingRef<T> {
        &self.ring
    }

    fn config(&self) -> AlgebraConfig {
        self.config
    }

    fn size(&self) -> usize {
        self.data.len()
    }

    fn nnz(&self) -> usize {
        self.data.iter().filter(|v| !self.is_zero(v)).count()
    }

    fn get(&self, index: &[usize]) -> Result<T, TensorError> {
        let offset = ravel_index(&self.shape, &self.strides, index)?;
        Ok(self.data[offset].clone())
    }

    fn set(&mut self, value: T, index: &[usize]) -> Result<(), TensorError> {
        let offset = ravel_index(&self.shape, &self.strides, index)?;
        self.data[offset] = value;
        Ok(())
    }

    fn add(&self, other: &dyn Tensor<T>) -> Result<BoxTensor<T>, TensorError> {
        let ring = &self.ring;
        Ok(Box::new(self.element_wise_op("add", other, |a, b| ring.add(a, b))?))
    }

    fn subtract(&self, other: &dyn Tensor<T>) -> Result<BoxTensor<T>, TensorError> {
        let ring = &self.ring;
        Ok(Box::new(self.element_wise_op("subtract", other, |a, b| {
            ring.subtract(a, b)
        })?))
    }

    fn multiply(&self, other: &dyn Tensor<T>) -> Result<BoxTensor<T>, TensorError> {
        let ring = &self.ring;
        Ok(Box::new(self.element_wise_op("multiply", other, |a, b| {
            ring.multiply(a, b)
        })?))
    }

    fn scale(&self, scalar: &T) -> BoxTensor<T> {
        let ring = &self.ring;
        let data = if self.config.use_parallel(self.data.len()) {
            self.data.par_iter().map(|v| ring.multiply(v, scalar)).collect()
        } else {
            self.data.iter().map(|v| ring.multiply(v, scalar)).collect()
        };
        Box::new(self.derived(self.shape.clone(), data))
    }

    fn reshape(&self, shape: &[usize]) -> Result<BoxTensor<T>, TensorError> {
        validate_shape(shape)?;
        let size = numel(shape);
        if size != self.data.len() {
            return Err(TensorError::SizeMismatch {
                expected: self.data.len(),
                actual: size,
            });
        }
        Ok(Box::new(self.derived(shape.to_vec(), self.data.clone())))
    }

    fn broadcast(&self, shape: &[usize]) -> Result<BoxTensor<T>, TensorError> {
        check_broadcast(&self.shape, shape)?;
        let offset = shape.len() - self.shape.len();
        Ok(Box::new(self.gather(shape.to_vec(), |index| {
            self.shape
                .iter()
                .enumerate()
                .map(|(dim, &size)| if size == 1 { 0 } else { index[dim + offset] })
                .collect()
        })))
    }

    fn slice(&self, starts: &[usize], sizes: &[usize]) -> Result<BoxTensor<T>, TensorError> {
        let shape = check_slice(&self.shape, starts, sizes)?;
        Ok(Box::new(self.gather(shape, |index| {
            index.iter().zip(starts).map(|(i, s)| i + s).collect()
        })))
    }

    fn transpose(&self, perm: &[usize]) -> Result<BoxTensor<T>, TensorError> {
        check_permutation(perm, self.shape.len())?;
        let shape: Vec<usize> = perm.iter().map(|&axis| self.shape[axis]).collect();
        Ok(Box::new(self.gather(shape, |index| {
            let mut src = vec![0; index.len()];
            for (i, &axis) in perm.iter().enumerate() {
                src[axis] = index[i];
            }
            src
        })))
    }

    fn sum(&self) -> T {
        let ring = &self.ring;
        self.data
            .iter()
            .fold(self.zero.clone(), |acc, v| ring.add(&acc, v))
    }

    fn sum_axis(&self, axis: usize) -> Result<BoxTensor<T>, TensorError> {
        let rank = self.shape.len();
        if axis >= rank {
            return Err(TensorError::AxisOutOfBounds { axis, rank });
        }
        let mut shape = self.shape.clone();
        shape.remove(axis);
        if shape.is_empty() {
            shape.push(1);
        }
        let out_strides = get_strides_from_shape(&shape);
        let mut data = vec![self.zero.clone(); numel(&shape)];
        for (index, value) in IndexIter::new(&self.shape).zip(&self.data) {
            let mut out_index = index;
            out_index.remove(axis);
            let agg = &mut data[ravel_index_unchecked(&out_strides, &out_index)];
            *agg = self.ring.add(agg, value);
        }
        Ok(Box::new(self.derived(shape, data)))
    }

    fn copy(&self) -> BoxTensor<T> {
        Box::new(self.clone())
    }

    fn iter_nonzero(&self) -> Box<dyn Iterator<Item = (Vec<usize>, T)> + '_> {
        Box::new(
            IndexIter::new(&self.shape)
                .zip(&self.data)
                .filter(|(_, value)| !self.is_zero(value))
                .map(|(index, value)| (index, value.clone())),
        )
    }

    fn as_dense(&self) -> Option<&DenseTensor<T>> {
        Some(self)
    }

    fn to_vec(&self) -> Vec<T> {
        self.data.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ring::ring_of;

    #[test]
    fn from_shape_vec_checks_size() {
        let res = DenseTensor::from_shape_vec(&[2, 2], vec![1, 2, 3], ring_of::<i32>());
        assert_eq!(
            res.unwrap_err(),
            TensorError::SizeMismatch {
                expected: 4,
                actual: 3
            }
        );
    }

    #[test]
    fn element_wise() -> Result<(), TensorError> {
        let a = DenseTensor::from_shape_vec(&[2, 2], vec![1, 2, 3, 4], ring_of::<i32>())?;
        let b = DenseTensor::from_shape_vec(&[2, 2], vec![4, 3, 2, 1], ring_of::<i32>())?;
        assert_eq!(a.add(&b)?.to_vec(), vec![5, 5, 5, 5]);
        assert_eq!(a.subtract(&b)?.to_vec(), vec![-3, -1, 1, 3]);
        assert_eq!(a.multiply(&b)?.to_vec(), vec![4, 6, 6, 4]);
        assert_eq!(a.scale(&2).to_vec(), vec![2, 4, 6, 8]);
        Ok(())
    }

    #[test]
    fn sparse_operand() -> Result<(), TensorError> {
        let a = DenseTensor::from_shape_vec(&[3], vec![1, 2, 3], ring_of::<i32>())?;
        let b = SparseTensor::from_shape_vec(&[3], vec![0, 5, 0], ring_of::<i32>())?;
        let c = a.add(&b)?;
        assert_eq!(c.storage_kind(), StorageKind::Dense);
        assert_eq!(c.to_vec(), vec![1, 7, 3]);
        Ok(())
    }

    #[test]
    fn shape_transforms() -> Result<(), TensorError> {
        let a = DenseTensor::from_shape_vec(&[2, 3], vec![1, 2, 3, 4, 5, 6], ring_of::<i32>())?;
        assert_eq!(a.transpose(&[1, 0])?.to_vec(), vec![1, 4, 2, 5, 3, 6]);
        assert_eq!(a.slice(&[0, 1], &[2, 2])?.to_vec(), vec![2, 3, 5, 6]);
        assert_eq!(a.reshape(&[3, 2])?.get(&[2, 0])?, 5);
        let row = DenseTensor::from_shape_vec(&[1, 3], vec![1, 2, 3], ring_of::<i32>())?;
        assert_eq!(row.broadcast(&[2, 2, 3])?.to_vec(), [1, 2, 3].repeat(4));
        assert!(a
            .slice(&[usize::MAX, 0], &[2, 1])
            .is_err_and(|e| e.is_index_error()));
        Ok(())
    }

    #[test]
    fn row_major_strides() -> Result<(), TensorError> {
        let a = DenseTensor::from_shape_val(&[2, 3, 4], 1u8, ring_of::<u8>())?;
        assert_eq!(a.strides(), &[12, 4, 1]);
        let flat = DenseTensor::from_shape_vec(&[6], vec![1, 2, 3, 4, 5, 6], ring_of::<i32>())?;
        assert_eq!(flat.strides(), &[1]);
        Ok(())
    }

    #[test]
    fn oversized_shapes_are_rejected() -> Result<(), TensorError> {
        let err = DenseTensor::zeros(&[usize::MAX, 2], ring_of::<i32>()).unwrap_err();
        assert_eq!(
            err,
            TensorError::InvalidShape {
                shape: vec![usize::MAX, 2]
            }
        );
        let a = DenseTensor::from_shape_vec(&[2], vec![1, 2], ring_of::<i32>())?;
        assert!(a.reshape(&[usize::MAX, 2]).is_err_and(|e| e.is_shape_error()));
        Ok(())
    }

    #[test]
    fn reductions() -> Result<(), TensorError> {
        let a = DenseTensor::from_shape_vec(&[2, 3], vec![1, 2, 3, 4, 5, 6], ring_of::<i32>())?;
        assert_eq!(a.sum(), 21);
        assert_eq!(a.sum_axis(0)?.to_vec(), vec![5, 7, 9]);
        assert_eq!(a.sum_axis(1)?.to_vec(), vec![6, 15]);
        Ok(())
    }

    #[test]
    fn sparse_round_trip() -> Result<(), TensorError> {
        let a = DenseTensor::from_shape_vec(&[2, 2], vec![0.0, 1.5, 0.0, 2.5], ring_of::<f64>())?;
        let sparse = a.to_sparse();
        assert_eq!(sparse.nnz(), 2);
        assert_eq!(sparse.to_dense().as_slice(), a.as_slice());
        Ok(())
    }

    #[test]
    fn float_parallel_scale() -> Result<(), TensorError> {
        let data: Vec<f32> = (0..2048).map(|i| i as f32 * 0.1).collect();
        let a = DenseTensor::from_shape_vec(&[32, 64], data, ring_of::<f32>())?
            .with_config(AlgebraConfig::with_parallel_threshold(16));
        let scaled = a.scale(&0.5);
        assert_eq!(scaled.config(), a.config());
        approx::assert_relative_eq!(scaled.get(&[31, 63])?, 2047.0 * 0.05, epsilon = 1e-3);
        approx::assert_relative_eq!(scaled.sum(), a.sum() * 0.5, max_relative = 1e-5);
        Ok(())
    }
}
