use thiserror::Error;

/// Error type for tensor operations.
///
/// Variants fall into the families reported by [`TensorError::is_shape_error`]
/// and [`TensorError::is_index_error`], plus zero-sentinel and storage-kind
/// incompatibilities.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TensorError {
    /// The shape is empty or contains a zero-sized dimension.
    ///
    /// Tensors of rank 0 are not representable; every dimension must be
    /// strictly positive.
    #[error("Invalid shape {shape:?}: shapes must be non-empty with strictly positive dimensions")]
    InvalidShape {
        /// The rejected shape
        shape: Vec<usize>,
    },

    /// The number of elements does not match the product of the shape.
    ///
    /// Raised by reshape and by constructors taking flat data.
    #[error("Size mismatch: expected {expected} elements, but got {actual}")]
    SizeMismatch {
        /// Expected number of elements
        expected: usize,
        /// Actual number of elements
        actual: usize,
    },

    /// Two operands of an element-wise operation have different shapes.
    #[error("Shape mismatch in {operation}: {left:?} vs {right:?}")]
    ShapeMismatch {
        /// Name of the operation that failed
        operation: &'static str,
        /// Shape of the receiver
        left: Vec<usize>,
        /// Shape of the other operand
        right: Vec<usize>,
    },

    /// A tensor cannot be broadcast to the requested shape.
    #[error("Cannot broadcast shape {from:?} to {to:?}")]
    BroadcastMismatch {
        /// Source shape
        from: Vec<usize>,
        /// Target shape
        to: Vec<usize>,
    },

    /// The axes given to a transpose are not a permutation of `0..rank`.
    #[error("Invalid permutation {permutation:?} for a tensor of rank {rank}")]
    InvalidPermutation {
        /// The rejected permutation
        permutation: Vec<usize>,
        /// Rank of the tensor
        rank: usize,
    },

    /// An index vector has the wrong number of components.
    #[error("Rank mismatch: expected {expected} indices, but got {actual}")]
    RankMismatch {
        /// Rank of the tensor
        expected: usize,
        /// Number of indices given
        actual: usize,
    },

    /// An index component exceeds the size of its dimension.
    #[error("Index {index} out of bounds for dimension {dim} of size {size}")]
    IndexOutOfBounds {
        /// The invalid index
        index: usize,
        /// The dimension being indexed
        dim: usize,
        /// The size of that dimension
        size: usize,
    },

    /// A slice box does not fit inside the tensor.
    #[error("Slice out of bounds on dimension {dim}: start {start} + size {len} exceeds {size}")]
    SliceOutOfBounds {
        /// The dimension being sliced
        dim: usize,
        /// Start of the box along `dim`
        start: usize,
        /// Length of the box along `dim`
        len: usize,
        /// Size of the dimension
        size: usize,
    },

    /// A reduction axis is not smaller than the rank.
    #[error("Axis {axis} out of bounds for a tensor of rank {rank}")]
    AxisOutOfBounds {
        /// The rejected axis
        axis: usize,
        /// Rank of the tensor
        rank: usize,
    },

    /// Operands carry different zero sentinels.
    #[error("Zero sentinel mismatch in {operation}: operands disagree on the additive identity")]
    ZeroMismatch {
        /// Name of the operation that failed
        operation: &'static str,
    },

    /// Operation not supported between these storage kinds.
    #[error("Unsupported operation: {operation} - {reason}")]
    UnsupportedOperation {
        /// Name of the operation that failed
        operation: String,
        /// Reason why the operation is not supported
        reason: String,
    },
}

impl TensorError {
    /// Creates an InvalidShape error.
    pub fn invalid_shape(shape: &[usize]) -> Self {
        Self::InvalidShape {
            shape: shape.to_vec(),
        }
    }

    /// Creates a ShapeMismatch error for a binary operation.
    pub fn shape_mismatch(operation: &'static str, left: &[usize], right: &[usize]) -> Self {
        Self::ShapeMismatch {
            operation,
            left: left.to_vec(),
            right: right.to_vec(),
        }
    }

    /// Creates an UnsupportedOperation error with context.
    pub fn unsupported_operation(operation: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::UnsupportedOperation {
            operation: operation.into(),
            reason: reason.into(),
        }
    }

    /// Returns true for rank/size mismatches on reshape, broadcast, transpose or binary algebra.
    pub fn is_shape_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidShape { .. }
                | Self::SizeMismatch { .. }
                | Self::ShapeMismatch { .. }
                | Self::BroadcastMismatch { .. }
                | Self::InvalidPermutation { .. }
        )
    }

    /// Returns true for out-of-bounds coordinates, malformed slices and wrong-length index vectors.
    pub fn is_index_error(&self) -> bool {
        matches!(
            self,
            Self::RankMismatch { .. }
                | Self::IndexOutOfBounds { .. }
                | Self::SliceOutOfBounds { .. }
                | Self::AxisOutOfBounds { .. }
        )
    }

    /// Returns a user-friendly suggestion for resolving the error.
    pub fn suggestion(&self) -> &str {
        match self {
            Self::InvalidShape { .. } => "Use at least one dimension and make every dimension > 0",
            Self::SizeMismatch { .. } => {
                "Ensure the product of shape dimensions equals the number of elements"
            }
            Self::ShapeMismatch { .. } => {
                "Element-wise operations need identical shapes. Consider broadcasting first."
            }
            Self::BroadcastMismatch { .. } => {
                "Trailing dimensions must be equal or 1 in the source shape"
            }
            Self::InvalidPermutation { .. } => "Pass every axis in 0..rank exactly once",
            Self::RankMismatch { .. } => "Pass exactly one index per dimension",
            Self::IndexOutOfBounds { .. } => {
                "Verify indices are within bounds (0 <= index < dimension_size)"
            }
            Self::SliceOutOfBounds { .. } => "Keep start + size within each dimension",
            Self::AxisOutOfBounds { .. } => "Use an axis smaller than the tensor rank",
            Self::ZeroMismatch { .. } => "Combine tensors created with the same zero value",
            Self::UnsupportedOperation { .. } => {
                "Convert the operand to a supported storage kind first"
            }
        }
    }
}
