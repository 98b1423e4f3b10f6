use std::borrow::Cow;
use std::collections::HashMap;

use rayon::prelude::*;

use crate::{
    config::AlgebraConfig,
    dense::DenseTensor,
    error::TensorError,
    ring::RingRef,
    shape::{
        check_broadcast, check_permutation, check_slice, get_strides_from_shape, numel,
        ravel_index, ravel_index_unchecked, unravel_index, validate_shape, IndexIter,
    },
    tensor::{check_operands, BoxTensor, Scalar, StorageKind, Tensor},
};

/// A tensor storing only its non-zero elements.
///
/// Elements live in a hash map keyed by their row-major flat index. The map
/// never holds a value equal to the zero sentinel: writing zero removes the
/// key and every algebra result is pruned.
///
/// Binary algebra and scaling run on the rayon pool once the driving operand
/// holds at least [`AlgebraConfig::parallel_threshold`] entries. Both paths
/// produce the same entries.
///
/// When the other operand of `add`, `subtract` or `multiply` is not sparse,
/// its elements are read through [`Tensor::iter_nonzero`] and the result is
/// still sparse.
///
/// # Examples
///
/// ```rust
/// use tessera_tensor::{ring_of, SparseTensor, Tensor};
///
/// let mut t = SparseTensor::new(&[2, 2], ring_of::<f64>()).unwrap();
/// t.set(5.0, &[0, 1]).unwrap();
/// assert_eq!(t.get(&[0, 1]).unwrap(), 5.0);
/// assert_eq!(t.get(&[1, 1]).unwrap(), 0.0);
/// assert_eq!(t.nnz(), 1);
/// ```
#[derive(Clone, Debug)]
pub struct SparseTensor<T> {
    data: HashMap<usize, T>,
    shape: Vec<usize>,
    strides: Vec<usize>,
    size: usize,
    zero: T,
    ring: RingRef<T>,
    config: AlgebraConfig,
}

impl<T: Scalar> SparseTensor<T> {
    /// Creates an empty tensor whose zero sentinel is the ring's zero.
    ///
    /// # Errors
    ///
    /// Fails if the shape is empty or has a zero-sized dimension.
    pub fn new(shape: &[usize], ring: RingRef<T>) -> Result<Self, TensorError> {
        let zero = ring.zero();
        Self::with_zero(shape, zero, ring)
    }

    /// Creates an empty tensor with an explicit zero sentinel.
    pub fn with_zero(shape: &[usize], zero: T, ring: RingRef<T>) -> Result<Self, TensorError> {
        validate_shape(shape)?;
        Ok(Self {
            data: HashMap::new(),
            shape: shape.to_vec(),
            strides: get_strides_from_shape(shape),
            size: numel(shape),
            zero,
            ring,
            config: AlgebraConfig::default(),
        })
    }

    /// Creates a tensor from a flat-index map. Zero values are dropped.
    ///
    /// # Errors
    ///
    /// Fails on an invalid shape or a key outside `0..size`.
    pub fn from_map(
        shape: &[usize],
        data: HashMap<usize, T>,
        ring: RingRef<T>,
    ) -> Result<Self, TensorError> {
        let mut tensor = Self::new(shape, ring)?;
        for (key, value) in data {
            if key >= tensor.size {
                return Err(TensorError::IndexOutOfBounds {
                    index: key,
                    dim: 0,
                    size: tensor.size,
                });
            }
            if !tensor.is_zero(&value) {
                tensor.data.insert(key, value);
            }
        }
        Ok(tensor)
    }

    /// Creates a tensor from row-major data, keeping only the non-zero elements.
    ///
    /// # Errors
    ///
    /// Fails if `data.len()` differs from the number of elements of `shape`.
    pub fn from_shape_vec(shape: &[usize], data: Vec<T>, ring: RingRef<T>) -> Result<Self, TensorError> {
        let mut tensor = Self::new(shape, ring)?;
        if data.len() != tensor.size {
            return Err(TensorError::SizeMismatch {
                expected: tensor.size,
                actual: data.len(),
            });
        }
        for (key, value) in data.into_iter().enumerate() {
            if !tensor.is_zero(&value) {
                tensor.data.insert(key, value);
            }
        }
        Ok(tensor)
    }

    /// Creates a tensor with every element set to `value`.
    pub fn from_shape_val(shape: &[usize], value: T, ring: RingRef<T>) -> Result<Self, TensorError> {
        let mut tensor = Self::new(shape, ring)?;
        if !tensor.is_zero(&value) {
            tensor.data = (0..tensor.size).map(|key| (key, value.clone())).collect();
        }
        Ok(tensor)
    }

    /// Replaces the algebra config. Derived tensors inherit it.
    pub fn with_config(mut self, config: AlgebraConfig) -> Self {
        self.config = config;
        self
    }

    /// Row-major strides of the tensor.
    pub fn strides(&self) -> &[usize] {
        &self.strides
    }

    /// Iterates the stored `(flat index, value)` pairs.
    pub fn entries(&self) -> impl Iterator<Item = (usize, &T)> {
        self.data.iter().map(|(&key, value)| (key, value))
    }

    /// Dense copy of this tensor.
    pub fn to_dense(&self) -> DenseTensor<T> {
        let data = Tensor::to_vec(self);
        DenseTensor::from_parts(
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

    /// Assembles a tensor from a pre-validated shape and zero-free entries.
    pub(crate) fn from_parts(
        shape: Vec<usize>,
        data: HashMap<usize, T>,
        zero: T,
        ring: RingRef<T>,
        config: AlgebraConfig,
    ) -> Self {
        Self {
            data,
            strides: get_strides_from_shape(&shape),
            size: numel(&shape),
            shape,
            zero,
            ring,
            config,
        }
    }

    /// Tensor sharing zero, ring and config with `self`.
    fn derived(&self, shape: Vec<usize>, data: HashMap<usize, T>) -> Self {
        Self::from_parts(shape, data, self.zero.clone(), self.ring.clone(), self.config)
    }

    fn empty_like(&self, shape: Vec<usize>) -> Self {
        self.derived(shape, HashMap::new())
    }

    /// Entries of a same-shaped operand keyed by this tensor's flat indices.
    fn operand_entries<'a>(&self, other: &'a dyn Tensor<T>) -> Cow<'a, HashMap<usize, T>> {
        match other.as_sparse() {
            Some(sparse) => Cow::Borrowed(&sparse.data),
            None => Cow::Owned(
                other
                    .iter_nonzero()
                    .map(|(index, value)| (ravel_index_unchecked(&self.strides, &index), value))
                    .collect(),
            ),
        }
    }

    /// Combines every entry of `other` into a copy of this tensor's entries.
    ///
    /// `op` receives the receiver's value at the key (if stored) and the
    /// operand's value. Results equal to zero are removed.
    fn merge<F>(&self, other: &HashMap<usize, T>, op: F) -> HashMap<usize, T>
    where
        F: Fn(Option<&T>, &T) -> T + Sync,
    {
        let updates: HashMap<usize, T> = if self.config.use_parallel(other.len()) {
            log::trace!("merging {} sparse entries on the rayon pool", other.len());
            other
                .par_iter()
                .fold(HashMap::new, |mut acc, (&key, value)| {
                    acc.insert(key, op(self.data.get(&key), value));
                    acc
                })
                .reduce(HashMap::new, |mut lhs, rhs| {
                    lhs.extend(rhs);
                    lhs
                })
        } else {
            other
                .iter()
                .map(|(&key, value)| (key, op(self.data.get(&key), value)))
                .collect()
        };

        let mut result = self.data.clone();
        for (key, value) in updates {
            if self.is_zero(&value) {
                result.remove(&key);
            } else {
                result.insert(key, value);
            }
        }
        result
    }

    /// Maps every stored entry, keeping the non-zero results.
    fn map_entries<F>(&self, op: F) -> HashMap<usize, T>
    where
        F: Fn(usize, &T) -> T + Sync,
    {
        if self.config.use_parallel(self.data.len()) {
            self.data
                .par_iter()
                .filter_map(|(&key, value)| {
                    let out = op(key, value);
                    (!self.is_zero(&out)).then_some((key, out))
                })
                .collect()
        } else {
            self.data
                .iter()
                .filter_map(|(&key, value)| {
                    let out = op(key, value);
                    (!self.is_zero(&out)).then_some((key, out))
                })
                .collect()
        }
    }

    /// Element-wise sum. See [`Tensor::add`].
    pub fn add(&self, other: &dyn Tensor<T>) -> Result<Self, TensorError> {
        check_operands("add", self, other)?;
        let entries = self.operand_entries(other);
        let ring = &self.ring;
        let data = self.merge(&entries, |lhs, rhs| match lhs {
            Some(lhs) => ring.add(lhs, rhs),
            None => rhs.clone(),
        });
        Ok(self.derived(self.shape.clone(), data))
    }

    /// Element-wise difference. See [`Tensor::subtract`].
    pub fn subtract(&self, other: &dyn Tensor<T>) -> Result<Self, TensorError> {
        check_operands("subtract", self, other)?;
        let entries = self.operand_entries(other);
        let ring = &self.ring;
        let zero = &self.zero;
        let data = self.merge(&entries, |lhs, rhs| ring.subtract(lhs.unwrap_or(zero), rhs));
        Ok(self.derived(self.shape.clone(), data))
    }

    /// Hadamard product. Only the receiver's stored entries are visited.
    pub fn multiply(&self, other: &dyn Tensor<T>) -> Result<Self, TensorError> {
        check_operands("multiply", self, other)?;
        let entries = self.operand_entries(other);
        let ring = &self.ring;
        let zero = &self.zero;
        let data = self.map_entries(|key, value| {
            ring.multiply(value, entries.get(&key).unwrap_or(zero))
        });
        Ok(self.derived(self.shape.clone(), data))
    }

    /// Multiplies every stored entry by `scalar`; a zero scalar yields an empty tensor.
    pub fn scale(&self, scalar: &T) -> Self {
        if self.is_zero(scalar) {
            return self.empty_like(self.shape.clone());
        }
        let ring = &self.ring;
        let data = self.map_entries(|_, value| ring.multiply(value, scalar));
        self.derived(self.shape.clone(), data)
    }

    /// Reinterprets the entries under a new shape with the same number of elements.
    ///
    /// Flat indices are invariant under a row-major reshape, so the key set is
    /// reused unchanged.
    pub fn reshape(&self, shape: &[usize]) -> Result<Self, TensorError> {
        validate_shape(shape)?;
        let size = numel(shape);
        if size != self.size {
            return Err(TensorError::SizeMismatch {
                expected: self.size,
                actual: size,
            });
        }
        Ok(self.derived(shape.to_vec(), self.data.clone()))
    }

    /// Replicates the entries into `shape` following right-aligned broadcasting.
    ///
    /// This materialises every replicated entry: the cost is
    /// O(nnz × expansion factor), not a no-copy view.
    pub fn broadcast(&self, shape: &[usize]) -> Result<Self, TensorError> {
        check_broadcast(&self.shape, shape)?;
        let offset = shape.len() - self.shape.len();
        let expanded: Vec<bool> = (0..shape.len())
            .map(|dim| dim < offset || (self.shape[dim - offset] == 1 && shape[dim] > 1))
            .collect();
        // dimensions that are replicated iterate the full target range, the rest a single slot
        let fan_out: Vec<usize> = shape
            .iter()
            .zip(&expanded)
            .map(|(&size, &exp)| if exp { size } else { 1 })
            .collect();

        let mut result = self.empty_like(shape.to_vec());
        for (&key, value) in &self.data {
            let source = unravel_index(&self.strides, key);
            for choice in IndexIter::new(&fan_out) {
                let target: Vec<usize> = (0..shape.len())
                    .map(|dim| {
                        if expanded[dim] {
                            choice[dim]
                        } else {
                            source[dim - offset]
                        }
                    })
                    .collect();
                result
                    .data
                    .insert(ravel_index_unchecked(&result.strides, &target), value.clone());
            }
        }
        Ok(result)
    }

    /// Extracts the box `starts[i]..starts[i] + sizes[i]`, rebased to the origin.
    pub fn slice(&self, starts: &[usize], sizes: &[usize]) -> Result<Self, TensorError> {
        let shape = check_slice(&self.shape, starts, sizes)?;
        let mut result = self.empty_like(shape);
        for (&key, value) in &self.data {
            let index = unravel_index(&self.strides, key);
            let inside = index
                .iter()
                .zip(starts.iter().zip(sizes))
                .all(|(&i, (&start, &len))| i >= start && i < start + len);
            if inside {
                let rebased: Vec<usize> = index.iter().zip(starts).map(|(i, s)| i - s).collect();
                result
                    .data
                    .insert(ravel_index_unchecked(&result.strides, &rebased), value.clone());
            }
        }
        Ok(result)
    }

    /// Permutes the axes: output axis `i` is input axis `perm[i]`.
    pub fn transpose(&self, perm: &[usize]) -> Result<Self, TensorError> {
        check_permutation(perm, self.rank())?;
        let shape: Vec<usize> = perm.iter().map(|&axis| self.shape[axis]).collect();
        let mut result = self.empty_like(shape);
        for (&key, value) in &self.data {
            let index = unravel_index(&self.strides, key);
            let permuted: Vec<usize> = perm.iter().map(|&axis| index[axis]).collect();
            result
                .data
                .insert(ravel_index_unchecked(&result.strides, &permuted), value.clone());
        }
        Ok(result)
    }

    /// Ring sum of the stored entries.
    pub fn sum(&self) -> T {
        let ring = &self.ring;
        if self.config.use_parallel(self.data.len()) {
            self.data
                .par_iter()
                .map(|(_, value)| value.clone())
                .reduce(|| self.zero.clone(), |lhs, rhs| ring.add(&lhs, &rhs))
        } else {
            self.data
                .values()
                .fold(self.zero.clone(), |acc, value| ring.add(&acc, value))
        }
    }

    /// Reduces `axis`, accumulating entries that share every other coordinate.
    pub fn sum_axis(&self, axis: usize) -> Result<Self, TensorError> {
        let rank = self.rank();
        if axis >= rank {
            return Err(TensorError::AxisOutOfBounds { axis, rank });
        }
        let mut shape: Vec<usize> = self.shape.clone();
        shape.remove(axis);
        if shape.is_empty() {
            shape.push(1);
        }

        let mut result = self.empty_like(shape);
        for (&key, value) in &self.data {
            let mut index = unravel_index(&self.strides, key);
            index.remove(axis);
            if index.is_empty() {
                index.push(0);
            }
            let target = ravel_index_unchecked(&result.strides, &index);
            result
                .data
                .entry(target)
                .and_modify(|acc| *acc = self.ring.add(acc, value))
                .or_insert_with(|| value.clone());
        }
        let ring = &self.ring;
        let zero = &self.zero;
        result.data.retain(|_, value| !ring.equals(value, zero));
        Ok(result)
    }
}

impl<T: Scalar> Tensor<T> for SparseTensor<T> {
    fn storage_kind(&self) -> StorageKind {
        StorageKind::Sparse
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
        self.size
    }

    fn nnz(&self) -> usize {
        self.data.len()
    }

    fn get(&self, index: &[usize]) -> Result<T, TensorError> {
        let key = ravel_index(&self.shape, &self.strides, index)?;
        Ok(self.data.get(&key).cloned().unwrap_or_else(|| self.zero.clone()))
    }

    fn set(&mut self, value: T, index: &[usize]) -> Result<(), TensorError> {
        let key = ravel_index(&self.shape, &self.strides, index)?;
        if self.is_zero(&value) {
            self.data.remove(&key);
        } else {
            self.data.insert(key, value);
        }
        Ok(())
    }

    fn add(&self, other: &dyn Tensor<T>) -> Result<BoxTensor<T>, TensorError> {
        Ok(Box::new(SparseTensor::add(self, other)?))
    }

    fn subtract(&self, other: &dyn Tensor<T>) -> Result<BoxTensor<T>, TensorError> {
        Ok(Box::new(SparseTensor::subtract(self, other)?))
    }

    fn multiply(&self, other: &dyn Tensor<T>) -> Result<BoxTensor<T>, TensorError> {
        Ok(Box::new(SparseTensor::multiply(self, other)?))
    }

    fn scale(&self, scalar: &T) -> BoxTensor<T> {
        Box::new(SparseTensor::scale(self, scalar))
    }

    fn reshape(&self, shape: &[usize]) -> Result<BoxTensor<T>, TensorError> {
        Ok(Box::new(SparseTensor::reshape(self, shape)?))
    }

    fn broadcast(&self, shape: &[usize]) -> Result<BoxTensor<T>, TensorError> {
        Ok(Box::new(SparseTensor::broadcast(self, shape)?))
    }

    fn slice(&self, starts: &[usize], sizes: &[usize]) -> Result<BoxTensor<T>, TensorError> {
        Ok(Box::new(SparseTensor::slice(self, starts, sizes)?))
    }

    fn transpose(&self, perm: &[usize]) -> Result<BoxTensor<T>, TensorError> {
        Ok(Box::new(SparseTensor::transpose(self, perm)?))
    }

    fn sum(&self) -> T {
        SparseTensor::sum(self)
    }

    fn sum_axis(&self, axis: usize) -> Result<BoxTensor<T>, TensorError> {
        Ok(Box::new(SparseTensor::sum_axis(self, axis)?))
    }

    fn copy(&self) -> BoxTensor<T> {
        Box::new(self.clone())
    }

    fn iter_nonzero(&self) -> Box<dyn Iterator<Item = (Vec<usize>, T)> + '_> {
        Box::new(
            self.data
                .iter()
                .map(|(&key, value)| (unravel_index(&self.strides, key), value.clone())),
        )
    }

    fn as_sparse(&self) -> Option<&SparseTensor<T>> {
        Some(self)
    }
}

impl<T: PartialEq> PartialEq for SparseTensor<T> {
    fn eq(&self, other: &Self) -> bool {
        self.shape == other.shape && self.zero == other.zero && self.data == other.data
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::ring::ring_of;

    fn vector(values: &[f64]) -> Result<SparseTensor<f64>, TensorError> {
        SparseTensor::from_shape_vec(&[values.len()], values.to_vec(), ring_of::<f64>())
    }

    #[test]
    fn set_get_scenario() -> Result<(), TensorError> {
        let mut t = SparseTensor::new(&[2, 2], ring_of::<f64>())?;
        t.set(5.0, &[0, 1])?;
        assert_eq!(t.get(&[0, 1])?, 5.0);
        assert_eq!(t.get(&[1, 1])?, 0.0);
        assert_eq!(t.nnz(), 1);
        Ok(())
    }

    #[test]
    fn set_zero_removes_entry() -> Result<(), TensorError> {
        let mut t = SparseTensor::new(&[3], ring_of::<i32>())?;
        t.set(4, &[2])?;
        t.set(0, &[2])?;
        assert_eq!(t.nnz(), 0);
        Ok(())
    }

    #[test]
    fn bounds_are_checked() -> Result<(), TensorError> {
        let mut t = SparseTensor::new(&[2, 3], ring_of::<i32>())?;
        assert!(t.get(&[2, 0]).is_err_and(|e| e.is_index_error()));
        assert!(t.get(&[0]).is_err_and(|e| e.is_index_error()));
        assert!(t.set(1, &[0, 3]).is_err_and(|e| e.is_index_error()));
        Ok(())
    }

    #[test]
    fn empty_shape_rejected() {
        assert!(SparseTensor::new(&[], ring_of::<i32>()).is_err());
        assert!(SparseTensor::new(&[2, 0], ring_of::<i32>()).is_err());
    }

    #[test]
    fn from_map_prunes_zeros() -> Result<(), TensorError> {
        let data = HashMap::from([(0, 1), (1, 0), (3, 7)]);
        let t = SparseTensor::from_map(&[2, 2], data, ring_of::<i32>())?;
        assert_eq!(t.nnz(), 2);
        assert_eq!(t.get(&[1, 1])?, 7);
        let bad = HashMap::from([(4, 1)]);
        assert!(SparseTensor::from_map(&[2, 2], bad, ring_of::<i32>()).is_err());
        Ok(())
    }

    #[test]
    fn add_scenario() -> Result<(), TensorError> {
        let a = vector(&[1.0, 0.0, 3.0])?;
        let b = vector(&[0.0, 2.0, 3.0])?;
        let c = a.add(&b)?;
        assert_eq!(Tensor::to_vec(&c), vec![1.0, 2.0, 6.0]);
        assert_eq!(c.nnz(), 3);
        Ok(())
    }

    #[test]
    fn add_prunes_cancellation() -> Result<(), TensorError> {
        let a = vector(&[1.0, 2.0])?;
        let b = vector(&[-1.0, 2.0])?;
        let c = a.add(&b)?;
        assert_eq!(c.nnz(), 1);
        assert_eq!(Tensor::to_vec(&c), vec![0.0, 4.0]);
        Ok(())
    }

    #[test]
    fn subtract_prunes_and_negates() -> Result<(), TensorError> {
        let a = vector(&[1.0, 2.0, 0.0])?;
        let b = vector(&[1.0, 0.0, 5.0])?;
        let c = a.subtract(&b)?;
        assert_eq!(Tensor::to_vec(&c), vec![0.0, 2.0, -5.0]);
        assert_eq!(c.nnz(), 2);
        Ok(())
    }

    #[test]
    fn multiply_scenario() -> Result<(), TensorError> {
        let a = vector(&[4.0, 0.0, 0.0, 2.0])?;
        let b = vector(&[0.0, 5.0, 0.0, 2.0])?;
        let c = a.multiply(&b)?;
        assert_eq!(Tensor::to_vec(&c), vec![0.0, 0.0, 0.0, 4.0]);
        assert_eq!(c.nnz(), 1);
        Ok(())
    }

    #[test]
    fn binary_ops_check_shape_and_zero() -> Result<(), TensorError> {
        let a = vector(&[1.0, 2.0])?;
        let b = vector(&[1.0, 2.0, 3.0])?;
        assert!(a.add(&b).is_err_and(|e| e.is_shape_error()));
        let c = SparseTensor::with_zero(&[2], 1.0, ring_of::<f64>())?;
        assert_eq!(
            a.multiply(&c).unwrap_err(),
            TensorError::ZeroMismatch {
                operation: "multiply"
            }
        );
        Ok(())
    }

    #[test]
    fn dense_operand_is_converted() -> Result<(), TensorError> {
        let a = vector(&[1.0, 0.0, 3.0])?;
        let b = DenseTensor::from_shape_vec(&[3], vec![0.0, 2.0, -3.0], ring_of::<f64>())?;
        let c = a.add(&b)?;
        assert_eq!(Tensor::to_vec(&c), vec![1.0, 2.0, 0.0]);
        assert_eq!(c.nnz(), 2);
        let d = a.multiply(&b)?;
        assert_eq!(Tensor::to_vec(&d), vec![0.0, 0.0, -9.0]);
        Ok(())
    }

    #[test]
    fn scale_by_zero_is_empty() -> Result<(), TensorError> {
        let a = vector(&[1.0, 2.0])?;
        assert_eq!(a.scale(&0.0).nnz(), 0);
        assert_eq!(Tensor::to_vec(&a.scale(&2.0)), vec![2.0, 4.0]);
        Ok(())
    }

    #[test]
    fn reshape_reuses_keys() -> Result<(), TensorError> {
        let a = SparseTensor::from_shape_vec(&[6], vec![0, 1, 0, 2, 0, 3], ring_of::<i32>())?;
        let b = a.reshape(&[2, 3])?;
        assert_eq!(b.strides(), &[3, 1]);
        assert_eq!(b.get(&[1, 0])?, 2);
        assert_eq!(b.get(&[1, 2])?, 3);
        assert!(a.reshape(&[4, 2]).is_err_and(|e| e.is_shape_error()));
        Ok(())
    }

    #[test]
    fn broadcast_replicates() -> Result<(), TensorError> {
        let a = SparseTensor::from_shape_vec(&[1], vec![7], ring_of::<i32>())?;
        let b = a.broadcast(&[4])?;
        assert_eq!(Tensor::to_vec(&b), vec![7, 7, 7, 7]);

        let row = SparseTensor::from_shape_vec(&[3], vec![1, 0, 2], ring_of::<i32>())?;
        let grid = row.broadcast(&[2, 3])?;
        assert_eq!(Tensor::to_vec(&grid), vec![1, 0, 2, 1, 0, 2]);
        assert_eq!(grid.nnz(), 4);

        let column = SparseTensor::from_shape_vec(&[2, 1], vec![5, 0], ring_of::<i32>())?;
        let wide = column.broadcast(&[2, 3])?;
        assert_eq!(Tensor::to_vec(&wide), vec![5, 5, 5, 0, 0, 0]);

        assert!(row.broadcast(&[2, 4]).is_err_and(|e| e.is_shape_error()));
        Ok(())
    }

    #[test]
    fn slice_scenario() -> Result<(), TensorError> {
        let a = SparseTensor::from_shape_vec(&[4], vec![10, 20, 30, 40], ring_of::<i32>())?;
        let b = a.slice(&[1], &[2])?;
        assert_eq!(b.shape(), vec![2]);
        assert_eq!(Tensor::to_vec(&b), vec![20, 30]);
        assert!(a.slice(&[3], &[2]).is_err_and(|e| e.is_index_error()));
        assert_eq!(
            a.slice(&[usize::MAX], &[2]).unwrap_err(),
            TensorError::SliceOutOfBounds {
                dim: 0,
                start: usize::MAX,
                len: 2,
                size: 4
            }
        );
        Ok(())
    }

    #[test]
    fn oversized_shapes_are_rejected() -> Result<(), TensorError> {
        let err = SparseTensor::new(&[usize::MAX, 2], ring_of::<i32>()).unwrap_err();
        assert!(err.is_shape_error());
        let a = SparseTensor::from_shape_vec(&[2], vec![1, 2], ring_of::<i32>())?;
        assert!(a.reshape(&[usize::MAX, 2]).is_err_and(|e| e.is_shape_error()));
        assert!(a.broadcast(&[usize::MAX, 2]).is_err_and(|e| e.is_shape_error()));
        Ok(())
    }

    #[test]
    fn slice_2d_rebases() -> Result<(), TensorError> {
        let a = SparseTensor::from_shape_vec(&[3, 3], (1..=9).collect(), ring_of::<i32>())?;
        let b = a.slice(&[1, 1], &[2, 2])?;
        assert_eq!(Tensor::to_vec(&b), vec![5, 6, 8, 9]);
        Ok(())
    }

    #[test]
    fn transpose_2d() -> Result<(), TensorError> {
        let a = SparseTensor::from_shape_vec(&[2, 3], vec![1, 2, 0, 0, 5, 6], ring_of::<i32>())?;
        let b = a.transpose(&[1, 0])?;
        assert_eq!(b.shape(), vec![3, 2]);
        assert_eq!(Tensor::to_vec(&b), vec![1, 0, 2, 5, 0, 6]);
        assert!(a.transpose(&[0, 0]).is_err_and(|e| e.is_shape_error()));
        Ok(())
    }

    #[test]
    fn sums() -> Result<(), TensorError> {
        let a = SparseTensor::from_shape_vec(&[2, 3], vec![1, 2, 0, -1, 5, 6], ring_of::<i32>())?;
        assert_eq!(a.sum(), 13);
        let rows = a.sum_axis(1)?;
        assert_eq!(rows.shape(), vec![2]);
        assert_eq!(Tensor::to_vec(&rows), vec![3, 10]);
        let cols = a.sum_axis(0)?;
        assert_eq!(Tensor::to_vec(&cols), vec![0, 7, 6]);
        // the cancelled column is pruned
        assert_eq!(cols.nnz(), 2);
        assert!(a.sum_axis(2).is_err_and(|e| e.is_index_error()));
        Ok(())
    }

    #[test]
    fn sum_axis_rank1_keeps_one_dim() -> Result<(), TensorError> {
        let a = SparseTensor::from_shape_vec(&[3], vec![1, 2, 3], ring_of::<i32>())?;
        let s = a.sum_axis(0)?;
        assert_eq!(s.shape(), vec![1]);
        assert_eq!(s.get(&[0])?, 6);
        Ok(())
    }

    #[test]
    fn copy_is_independent() -> Result<(), TensorError> {
        let mut a = SparseTensor::from_shape_vec(&[2], vec![1, 2], ring_of::<i32>())?;
        let b = Tensor::copy(&a);
        a.set(9, &[0])?;
        assert_eq!(b.get(&[0])?, 1);
        Ok(())
    }

    #[test]
    fn to_array_fills_zeros() -> Result<(), TensorError> {
        let mut a = SparseTensor::new(&[2, 2], ring_of::<i32>())?;
        a.set(3, &[1, 0])?;
        let rows = a.to_array().to_rows();
        assert_eq!(rows, Some(vec![vec![0, 0], vec![3, 0]]));
        Ok(())
    }

    #[test]
    fn parallel_matches_sequential() -> Result<(), TensorError> {
        let n = 4096;
        let lhs: Vec<i64> = (0..n).map(|i| if i % 3 == 0 { 0 } else { i }).collect();
        let rhs: Vec<i64> = (0..n).map(|i| if i % 2 == 0 { -i } else { 0 }).collect();
        let ring = ring_of::<i64>();

        let seq_a = SparseTensor::from_shape_vec(&[64, 64], lhs.clone(), ring.clone())?
            .with_config(AlgebraConfig::sequential());
        let seq_b = SparseTensor::from_shape_vec(&[64, 64], rhs.clone(), ring.clone())?;
        let par_a = SparseTensor::from_shape_vec(&[64, 64], lhs, ring.clone())?
            .with_config(AlgebraConfig::with_parallel_threshold(1));
        let par_b = SparseTensor::from_shape_vec(&[64, 64], rhs, ring)?;

        assert_eq!(seq_a.add(&seq_b)?, par_a.add(&par_b)?);
        assert_eq!(seq_a.subtract(&seq_b)?, par_a.subtract(&par_b)?);
        assert_eq!(seq_a.multiply(&seq_b)?, par_a.multiply(&par_b)?);
        assert_eq!(seq_a.scale(&3), par_a.scale(&3));
        assert_eq!(seq_a.sum(), par_a.sum());
        Ok(())
    }

    #[test]
    fn config_is_inherited() -> Result<(), TensorError> {
        let config = AlgebraConfig::with_parallel_threshold(7);
        let a = SparseTensor::new(&[2, 2], ring_of::<i32>())?.with_config(config);
        assert_eq!(Tensor::config(&a.transpose(&[1, 0])?), config);
        assert_eq!(Tensor::config(&a.scale(&2)), config);
        Ok(())
    }
}
