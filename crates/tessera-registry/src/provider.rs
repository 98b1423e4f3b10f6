//! Provider abstraction for tensor and matrix construction.
//!
//! A provider is a backend that knows how to build tensors of one storage
//! kind. Tensor providers are generic over the element type; matrix
//! providers are described by the rings and layouts they support.

use std::fmt;
use std::sync::Arc;

use tessera_tensor::{
    AlgebraConfig, BoxTensor, DenseTensor, RingRef, Scalar, SparseTensor, StorageKind, Tensor,
    TensorError,
};

/// Shared handle to a tensor provider.
pub type TensorProviderRef<T> = Arc<dyn TensorProvider<T>>;

/// Shared handle to a matrix provider.
pub type MatrixProviderRef = Arc<dyn MatrixProvider>;

/// Tensor provider trait defining tensor construction.
///
/// Each backend (sparse CPU, dense CPU, ...) implements this trait for the
/// element types it can serve.
///
/// # Thread Safety
///
/// Implementations must be `Send + Sync` so a single instance can be shared
/// through the registry.
pub trait TensorProvider<T: Scalar>: Send + Sync {
    /// Unique provider name used by name lookups.
    fn name(&self) -> &str;

    /// Storage kind of the tensors this provider builds.
    fn storage(&self) -> StorageKind;

    /// Selection priority. Higher wins; ties keep discovery order.
    fn priority(&self) -> i32 {
        0
    }

    /// Creates a tensor filled with the ring's zero.
    fn zeros(&self, ring: RingRef<T>, shape: &[usize]) -> Result<BoxTensor<T>, TensorError>;

    /// Creates a tensor filled with the ring's one.
    fn ones(&self, ring: RingRef<T>, shape: &[usize]) -> Result<BoxTensor<T>, TensorError>;

    /// Creates a tensor from row-major data.
    ///
    /// # Errors
    ///
    /// Returns an error if `data.len()` differs from the number of elements of `shape`.
    fn create(
        &self,
        ring: RingRef<T>,
        data: Vec<T>,
        shape: &[usize],
    ) -> Result<BoxTensor<T>, TensorError>;
}

/// Builds [`SparseTensor`]s. The registry's retained default provider.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SparseTensorProvider {
    config: AlgebraConfig,
}

impl SparseTensorProvider {
    /// Name of the provider.
    pub const NAME: &'static str = "cpu-sparse";

    /// Priority of the provider.
    pub const PRIORITY: i32 = 10;

    /// Creates a provider whose tensors use the default [`AlgebraConfig`].
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a provider whose tensors carry `config`.
    pub fn with_config(config: AlgebraConfig) -> Self {
        Self { config }
    }
}

impl<T: Scalar> TensorProvider<T> for SparseTensorProvider {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn storage(&self) -> StorageKind {
        StorageKind::Sparse
    }

    fn priority(&self) -> i32 {
        Self::PRIORITY
    }

    fn zeros(&self, ring: RingRef<T>, shape: &[usize]) -> Result<BoxTensor<T>, TensorError> {
        Ok(Box::new(
            SparseTensor::new(shape, ring)?.with_config(self.config),
        ))
    }

    fn ones(&self, ring: RingRef<T>, shape: &[usize]) -> Result<BoxTensor<T>, TensorError> {
        let one = ring.one();
        Ok(Box::new(
            SparseTensor::from_shape_val(shape, one, ring)?.with_config(self.config),
        ))
    }

    fn create(
        &self,
        ring: RingRef<T>,
        data: Vec<T>,
        shape: &[usize],
    ) -> Result<BoxTensor<T>, TensorError> {
        Ok(Box::new(
            SparseTensor::from_shape_vec(shape, data, ring)?.with_config(self.config),
        ))
    }
}

/// Builds [`DenseTensor`]s.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DenseTensorProvider {
    config: AlgebraConfig,
}

impl DenseTensorProvider {
    /// Name of the provider.
    pub const NAME: &'static str = "cpu-dense";

    /// Priority of the provider.
    pub const PRIORITY: i32 = 0;

    /// Creates a provider whose tensors use the default [`AlgebraConfig`].
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a provider whose tensors carry `config`.
    pub fn with_config(config: AlgebraConfig) -> Self {
        Self { config }
    }
}

impl<T: Scalar> TensorProvider<T> for DenseTensorProvider {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn storage(&self) -> StorageKind {
        StorageKind::Dense
    }

    fn priority(&self) -> i32 {
        Self::PRIORITY
    }

    fn zeros(&self, ring: RingRef<T>, shape: &[usize]) -> Result<BoxTensor<T>, TensorError> {
        Ok(Box::new(DenseTensor::zeros(shape, ring)?.with_config(self.config)))
    }

    fn ones(&self, ring: RingRef<T>, shape: &[usize]) -> Result<BoxTensor<T>, TensorError> {
        let one = ring.one();
        Ok(Box::new(
            DenseTensor::from_shape_val(shape, one, ring)?.with_config(self.config),
        ))
    }

    fn create(
        &self,
        ring: RingRef<T>,
        data: Vec<T>,
        shape: &[usize],
    ) -> Result<BoxTensor<T>, TensorError> {
        Ok(Box::new(
            DenseTensor::from_shape_vec(shape, data, ring)?.with_config(self.config),
        ))
    }
}

/// Declared capabilities of a matrix provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderCapabilities {
    /// Ring names served, e.g. `"f64"`. `"*"` matches every ring.
    pub rings: Vec<String>,
    /// Storage layouts the provider operates on.
    pub layouts: Vec<StorageKind>,
    /// Selection priority. Higher wins; ties keep discovery order.
    pub priority: i32,
}

impl ProviderCapabilities {
    /// Wildcard ring name.
    pub const ANY_RING: &'static str = "*";

    /// Returns true if `ring` is listed or the wildcard is present.
    pub fn supports_ring(&self, ring: &str) -> bool {
        self.rings.iter().any(|r| r == ring || r == Self::ANY_RING)
    }

    /// Returns true if `layout` is listed.
    pub fn supports_layout(&self, layout: StorageKind) -> bool {
        self.layouts.contains(&layout)
    }
}

/// Matrix provider trait describing a linear-algebra backend.
///
/// The registry never calls into a matrix provider beyond these methods; it
/// only selects one by capability.
pub trait MatrixProvider: fmt::Debug + Send + Sync {
    /// Unique provider name.
    fn name(&self) -> &str;

    /// Rings, layouts and priority served by this provider.
    fn capabilities(&self) -> ProviderCapabilities;

    /// Whether the backend can run in this process.
    fn is_available(&self) -> bool {
        true
    }
}

/// Generic CPU matrix provider parameterised over a ring name. Always available.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CpuMatrixProvider {
    name: String,
    ring: String,
}

impl CpuMatrixProvider {
    /// Creates the CPU provider for `ring`.
    pub fn new(ring: impl Into<String>) -> Self {
        let ring = ring.into();
        Self {
            name: format!("cpu-matrix-{ring}"),
            ring,
        }
    }

    /// The ring this provider was built for.
    pub fn ring(&self) -> &str {
        &self.ring
    }

    /// Multiplies two rank-2 tensors, returning a dense `[m, n]` result.
    ///
    /// # Errors
    ///
    /// Fails if either operand is not rank 2, if the operands use a ring other
    /// than the provider's or disagree on the zero sentinel, or if the inner
    /// dimensions differ.
    pub fn matmul<T: Scalar>(
        &self,
        lhs: &dyn Tensor<T>,
        rhs: &dyn Tensor<T>,
    ) -> Result<DenseTensor<T>, TensorError> {
        for operand in [lhs, rhs] {
            if operand.rank() != 2 {
                return Err(TensorError::RankMismatch {
                    expected: 2,
                    actual: operand.rank(),
                });
            }
            if operand.ring().name() != self.ring {
                return Err(TensorError::unsupported_operation(
                    "matmul",
                    format!(
                        "provider serves ring '{}', operand uses '{}'",
                        self.ring,
                        operand.ring().name()
                    ),
                ));
            }
        }
        if !lhs.ring().equals(lhs.zero(), rhs.zero()) {
            return Err(TensorError::ZeroMismatch { operation: "matmul" });
        }
        let (m, k) = (lhs.dims()[0], lhs.dims()[1]);
        let n = rhs.dims()[1];
        if rhs.dims()[0] != k {
            return Err(TensorError::shape_mismatch("matmul", lhs.dims(), rhs.dims()));
        }

        let ring = lhs.ring().clone();
        let a = lhs.to_vec();
        let b = rhs.to_vec();
        let mut out = Vec::with_capacity(m * n);
        for i in 0..m {
            for j in 0..n {
                let cell = (0..k).fold(lhs.zero().clone(), |acc, p| {
                    ring.add(&acc, &ring.multiply(&a[i * k + p], &b[p * n + j]))
                });
                out.push(cell);
            }
        }
        Ok(DenseTensor::from_shape_vec(&[m, n], out, ring)?.with_config(lhs.config()))
    }
}

impl MatrixProvider for CpuMatrixProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn capabilities(&self) -> ProviderCapabilities {
        ProviderCapabilities {
            rings: vec![self.ring.clone()],
            layouts: vec![StorageKind::Dense, StorageKind::Sparse],
            priority: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tessera_tensor::ring_of;

    #[test]
    fn sparse_provider_builds_sparse() -> Result<(), TensorError> {
        let provider = SparseTensorProvider::new();
        let ones = TensorProvider::<f64>::ones(&provider, ring_of(), &[2, 2])?;
        assert_eq!(ones.storage_kind(), StorageKind::Sparse);
        assert_eq!(ones.nnz(), 4);
        let zeros = TensorProvider::<f64>::zeros(&provider, ring_of(), &[3])?;
        assert_eq!(zeros.nnz(), 0);
        let t = provider.create(ring_of::<i32>(), vec![0, 2, 0], &[3])?;
        assert_eq!(t.nnz(), 1);
        assert!(provider.create(ring_of::<i32>(), vec![1], &[2]).is_err());
        Ok(())
    }

    #[test]
    fn dense_provider_builds_dense() -> Result<(), TensorError> {
        let provider = DenseTensorProvider::with_config(AlgebraConfig::sequential());
        let t = provider.create(ring_of::<i64>(), vec![1, 0, 3, 0], &[2, 2])?;
        assert_eq!(t.storage_kind(), StorageKind::Dense);
        assert_eq!(t.config(), AlgebraConfig::sequential());
        assert_eq!(TensorProvider::<i64>::name(&provider), "cpu-dense");
        Ok(())
    }

    #[test]
    fn capabilities_match() {
        let cpu = CpuMatrixProvider::new("f64");
        let caps = cpu.capabilities();
        assert!(caps.supports_ring("f64"));
        assert!(!caps.supports_ring("f32"));
        assert!(caps.supports_layout(StorageKind::Sparse));
        assert_eq!(cpu.name(), "cpu-matrix-f64");

        let any = ProviderCapabilities {
            rings: vec!["*".into()],
            layouts: vec![],
            priority: 0,
        };
        assert!(any.supports_ring("complex"));
    }

    #[test]
    fn cpu_matmul() -> Result<(), TensorError> {
        let cpu = CpuMatrixProvider::new("i32");
        let a = SparseTensor::from_shape_vec(&[2, 3], vec![1, 0, 2, 0, 3, 0], ring_of::<i32>())?;
        let b = DenseTensor::from_shape_vec(&[3, 2], vec![1, 2, 3, 4, 5, 6], ring_of::<i32>())?;
        let c = cpu.matmul(&a, &b)?;
        assert_eq!(c.as_slice(), &[11, 14, 9, 12]);

        assert!(cpu.matmul(&b, &b).is_err_and(|e| e.is_shape_error()));
        let f = DenseTensor::from_shape_vec(&[1, 1], vec![1.0], ring_of::<f64>())?;
        assert!(matches!(
            CpuMatrixProvider::new("f32").matmul(&f, &f),
            Err(TensorError::UnsupportedOperation { .. })
        ));
        Ok(())
    }

    #[test]
    fn matmul_requires_shared_zero() -> Result<(), TensorError> {
        let cpu = CpuMatrixProvider::new("i32");
        let shifted = SparseTensor::with_zero(&[2, 2], 1, ring_of::<i32>())?;
        let b = DenseTensor::from_shape_vec(&[2, 2], vec![1, 2, 3, 4], ring_of::<i32>())?;
        assert_eq!(
            cpu.matmul(&shifted, &b).unwrap_err(),
            TensorError::ZeroMismatch { operation: "matmul" }
        );
        assert_eq!(
            cpu.matmul(&b, &shifted).unwrap_err(),
            TensorError::ZeroMismatch { operation: "matmul" }
        );
        Ok(())
    }
}
