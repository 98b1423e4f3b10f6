use std::fmt;

use crate::{
    config::AlgebraConfig,
    dense::DenseTensor,
    error::TensorError,
    ring::RingRef,
    shape::{get_strides_from_shape, ravel_index_unchecked},
    sparse::SparseTensor,
};

/// Bound shared by every tensor element type.
pub trait Scalar: Clone + fmt::Debug + Send + Sync + 'static {}

impl<T: Clone + fmt::Debug + Send + Sync + 'static> Scalar for T {}

/// Owned, type-erased tensor as returned by the [`Tensor`] contract.
pub type BoxTensor<T> = Box<dyn Tensor<T>>;

/// Concrete storage strategy of a tensor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StorageKind {
    /// Only non-zero entries are stored, keyed by flat index.
    Sparse,
    /// Every element is stored in a contiguous row-major buffer.
    Dense,
}

impl fmt::Display for StorageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageKind::Sparse => write!(f, "sparse"),
            StorageKind::Dense => write!(f, "dense"),
        }
    }
}

/// The operation set every tensor storage strategy implements identically.
///
/// All operations except [`Tensor::set`] leave the receiver untouched and
/// return a new, independent tensor. Element arithmetic goes through the
/// tensor's [`crate::Ring`]; the zero sentinel returned by [`Tensor::zero`]
/// is carried through every derived tensor.
pub trait Tensor<T: Scalar>: fmt::Debug + Send + Sync {
    /// The storage strategy backing this tensor.
    fn storage_kind(&self) -> StorageKind;

    /// Borrowed view of the shape.
    fn dims(&self) -> &[usize];

    /// The zero sentinel of this tensor.
    fn zero(&self) -> &T;

    /// The ring used for element arithmetic.
    fn ring(&self) -> &RingRef<T>;

    /// The algebra config inherited by derived tensors.
    fn config(&self) -> AlgebraConfig;

    /// Copy of the shape.
    fn shape(&self) -> Vec<usize> {
        self.dims().to_vec()
    }

    /// Number of dimensions.
    fn rank(&self) -> usize {
        self.dims().len()
    }

    /// Number of addressable elements.
    fn size(&self) -> usize {
        self.dims().iter().product()
    }

    /// Number of elements different from the zero sentinel.
    fn nnz(&self) -> usize;

    /// Returns the element at `index`, or the zero sentinel if none is stored.
    ///
    /// # Errors
    ///
    /// Fails if `index` does not have one in-bounds component per dimension.
    fn get(&self, index: &[usize]) -> Result<T, TensorError>;

    /// Writes `value` at `index` in place.
    ///
    /// # Errors
    ///
    /// Same bounds contract as [`Tensor::get`].
    fn set(&mut self, value: T, index: &[usize]) -> Result<(), TensorError>;

    /// Element-wise sum.
    fn add(&self, other: &dyn Tensor<T>) -> Result<BoxTensor<T>, TensorError>;

    /// Element-wise difference.
    fn subtract(&self, other: &dyn Tensor<T>) -> Result<BoxTensor<T>, TensorError>;

    /// Hadamard (element-wise) product.
    fn multiply(&self, other: &dyn Tensor<T>) -> Result<BoxTensor<T>, TensorError>;

    /// Multiplies every element by `scalar`.
    fn scale(&self, scalar: &T) -> BoxTensor<T>;

    /// Same elements laid out under a shape with the same number of elements.
    fn reshape(&self, shape: &[usize]) -> Result<BoxTensor<T>, TensorError>;

    /// Expands to `shape` following right-aligned broadcasting rules.
    ///
    /// The result is materialised, not a view.
    fn broadcast(&self, shape: &[usize]) -> Result<BoxTensor<T>, TensorError>;

    /// Extracts the axis-aligned box `starts[i]..starts[i] + sizes[i]`.
    fn slice(&self, starts: &[usize], sizes: &[usize]) -> Result<BoxTensor<T>, TensorError>;

    /// Permutes the axes: output axis `i` is input axis `perm[i]`.
    fn transpose(&self, perm: &[usize]) -> Result<BoxTensor<T>, TensorError>;

    /// Ring sum of all elements.
    fn sum(&self) -> T;

    /// Reduces one axis. A rank-1 tensor reduces to shape `[1]`.
    fn sum_axis(&self, axis: usize) -> Result<BoxTensor<T>, TensorError>;

    /// Independent deep copy.
    fn copy(&self) -> BoxTensor<T>;

    /// Iterates `(index, value)` for every element different from zero, in unspecified order.
    fn iter_nonzero(&self) -> Box<dyn Iterator<Item = (Vec<usize>, T)> + '_>;

    /// Downcast to a sparse tensor.
    fn as_sparse(&self) -> Option<&SparseTensor<T>> {
        None
    }

    /// Downcast to a dense tensor.
    fn as_dense(&self) -> Option<&DenseTensor<T>> {
        None
    }

    /// Dense row-major copy of all elements, zeros included.
    fn to_vec(&self) -> Vec<T> {
        let strides = get_strides_from_shape(self.dims());
        let mut flat = vec![self.zero().clone(); self.size()];
        for (index, value) in self.iter_nonzero() {
            flat[ravel_index_unchecked(&strides, &index)] = value;
        }
        flat
    }

    /// Materialises the full dense nested representation.
    ///
    /// Meant for interop and debugging, not for hot paths.
    fn to_array(&self) -> NdArray<T> {
        NdArray::from_flat(self.dims(), self.to_vec())
    }
}

/// Validates that two operands of an element-wise operation are compatible.
pub(crate) fn check_operands<T: Scalar>(
    operation: &'static str,
    lhs: &dyn Tensor<T>,
    rhs: &dyn Tensor<T>,
) -> Result<(), TensorError> {
    if lhs.dims() != rhs.dims() {
        return Err(TensorError::shape_mismatch(operation, lhs.dims(), rhs.dims()));
    }
    if !lhs.ring().equals(lhs.zero(), rhs.zero()) {
        return Err(TensorError::ZeroMismatch { operation });
    }
    Ok(())
}

/// Dense nested array produced by [`Tensor::to_array`].
#[derive(Debug, Clone, PartialEq)]
pub enum NdArray<T> {
    /// A single element.
    Scalar(T),
    /// One level of nesting.
    Array(Vec<NdArray<T>>),
}

impl<T: Clone> NdArray<T> {
    /// Nests row-major `data` according to `shape`.
    pub fn from_flat(shape: &[usize], data: Vec<T>) -> Self {
        match shape {
            [] | [_] => NdArray::Array(data.into_iter().map(NdArray::Scalar).collect()),
            [_, inner @ ..] => {
                let step = inner.iter().product::<usize>().max(1);
                NdArray::Array(
                    data.chunks(step)
                        .map(|chunk| NdArray::from_flat(inner, chunk.to_vec()))
                        .collect(),
                )
            }
        }
    }

    /// Flattens back to row-major order.
    pub fn flatten(&self) -> Vec<T> {
        match self {
            NdArray::Scalar(v) => vec![v.clone()],
            NdArray::Array(items) => items.iter().flat_map(NdArray::flatten).collect(),
        }
    }

    /// Rows of a rank-2 array, the export format consumed by matrix code.
    pub fn to_rows(&self) -> Option<Vec<Vec<T>>> {
        let NdArray::Array(rows) = self else {
            return None;
        };
        rows.iter()
            .map(|row| match row {
                NdArray::Array(cells) => cells
                    .iter()
                    .map(|cell| match cell {
                        NdArray::Scalar(v) => Some(v.clone()),
                        NdArray::Array(_) => None,
                    })
                    .collect(),
                NdArray::Scalar(_) => None,
            })
            .collect()
    }
}
