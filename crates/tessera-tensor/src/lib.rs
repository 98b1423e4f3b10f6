#![deny(missing_docs)]
#![doc = env!("CARGO_PKG_DESCRIPTION")]
//!
//! # Overview
//!
//! `tessera-tensor` provides N-dimensional tensors whose element arithmetic
//! is delegated to a [`Ring`] capability object instead of a fixed numeric
//! type. Two storage strategies implement the same [`Tensor`] contract:
//!
//! - [`SparseTensor`]: stores only the elements that differ from the zero
//!   sentinel, in a hash map keyed by row-major flat index
//! - [`DenseTensor`]: stores every element in a contiguous row-major buffer
//!
//! Every operation except [`Tensor::set`] returns a new tensor. Element-wise
//! algebra switches to the rayon thread pool once the number of driving
//! entries reaches [`AlgebraConfig::parallel_threshold`].
//!
//! # Quick Start
//!
//! ```rust
//! use tessera_tensor::{ring_of, SparseTensor, Tensor};
//!
//! let a = SparseTensor::from_shape_vec(&[3], vec![1.0, 0.0, 3.0], ring_of::<f64>()).unwrap();
//! let b = SparseTensor::from_shape_vec(&[3], vec![0.0, 2.0, 3.0], ring_of::<f64>()).unwrap();
//!
//! let c = a.add(&b).unwrap();
//! assert_eq!(c.to_vec(), vec![1.0, 2.0, 6.0]);
//! assert_eq!(c.nnz(), 3);
//!
//! let t = c.reshape(&[3, 1]).unwrap().transpose(&[1, 0]).unwrap();
//! assert_eq!(t.shape(), vec![1, 3]);
//! ```
//!
//! Custom element types plug in through their own [`Ring`]:
//!
//! ```rust
//! use std::sync::Arc;
//! use tessera_tensor::{Ring, RingRef, SparseTensor, Tensor};
//!
//! #[derive(Debug)]
//! struct Boolean;
//!
//! impl Ring<bool> for Boolean {
//!     fn name(&self) -> &str { "bool" }
//!     fn zero(&self) -> bool { false }
//!     fn one(&self) -> bool { true }
//!     fn add(&self, a: &bool, b: &bool) -> bool { *a || *b }
//!     fn subtract(&self, a: &bool, b: &bool) -> bool { *a && !*b }
//!     fn multiply(&self, a: &bool, b: &bool) -> bool { *a && *b }
//!     fn equals(&self, a: &bool, b: &bool) -> bool { a == b }
//! }
//!
//! let ring: RingRef<bool> = Arc::new(Boolean);
//! let mut t = SparseTensor::new(&[4], ring).unwrap();
//! t.set(true, &[2]).unwrap();
//! assert!(t.sum());
//! ```

/// Algebra configuration carried by every tensor.
pub mod config;

/// Dense tensor storage.
pub mod dense;

/// Error types for tensor operations.
pub mod error;

/// Element rings and the [`Element`] trait for primitive numbers.
pub mod ring;

/// Shape, stride and index arithmetic.
pub mod shape;

/// Sparse tensor storage keyed by flat index.
///
/// This module provides [`sparse::SparseTensor`], the default tensor
/// implementation of the workspace.
pub mod sparse;

/// The [`Tensor`] contract and related types.
pub mod tensor;

pub use crate::config::AlgebraConfig;
pub use crate::dense::DenseTensor;
pub use crate::error::TensorError;
pub use crate::ring::{ring_of, Element, NumRing, Ring, RingRef};
pub use crate::sparse::SparseTensor;
pub use crate::tensor::{BoxTensor, NdArray, Scalar, StorageKind, Tensor};
