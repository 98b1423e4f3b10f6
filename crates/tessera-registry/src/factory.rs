use std::fmt;

use tessera_tensor::{
    shape::{numel, validate_shape},
    BoxTensor, RingRef, Scalar, StorageKind, TensorError,
};

use crate::{error::ProviderError, provider::TensorProviderRef, registry::ProviderRegistry};

/// Storage hint passed to the [`TensorFactory`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Storage {
    /// Let the factory decide. See [`TensorFactory`] for the policy.
    #[default]
    Auto,
    /// Require a dense provider.
    Dense,
    /// Require a sparse provider.
    Sparse,
}

impl fmt::Display for Storage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Storage::Auto => write!(f, "auto"),
            Storage::Dense => write!(f, "dense"),
            Storage::Sparse => write!(f, "sparse"),
        }
    }
}

/// Tuning knobs for [`Storage::Auto`] selection.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FactoryConfig {
    /// Highest non-zero density for which [`TensorFactory::of`] prefers sparse storage.
    pub sparse_density_threshold: f64,
}

impl FactoryConfig {
    /// Default value of [`FactoryConfig::sparse_density_threshold`].
    pub const DEFAULT_SPARSE_DENSITY_THRESHOLD: f64 = 0.25;
}

impl Default for FactoryConfig {
    fn default() -> Self {
        Self {
            sparse_density_threshold: Self::DEFAULT_SPARSE_DENSITY_THRESHOLD,
        }
    }
}

/// Convenience construction API on top of the provider registry.
///
/// With [`Storage::Auto`]:
///
/// - `zeros` and `ones` use the registry's active provider for `T`
/// - `of` measures the non-zero density of the data; at or below
///   [`FactoryConfig::sparse_density_threshold`] it prefers a sparse provider,
///   above it a dense one, and falls back to the active provider when no
///   provider of the preferred kind is registered
///
/// # Examples
///
/// ```rust
/// use tessera_registry::{Storage, TensorFactory};
/// use tessera_tensor::{ring_of, StorageKind};
///
/// let factory = TensorFactory::new();
/// let t = factory.of(ring_of::<f64>(), vec![0.0, 0.0, 0.0, 4.0], &[2, 2], Storage::Auto).unwrap();
/// assert_eq!(t.storage_kind(), StorageKind::Sparse);
/// assert_eq!(t.get(&[1, 1]).unwrap(), 4.0);
/// ```
#[derive(Debug, Clone, Copy)]
pub struct TensorFactory<'a> {
    registry: &'a ProviderRegistry,
    config: FactoryConfig,
}

impl TensorFactory<'static> {
    /// Creates a factory backed by [`ProviderRegistry::global`].
    pub fn new() -> Self {
        Self::with_registry(ProviderRegistry::global())
    }
}

impl Default for TensorFactory<'static> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a> TensorFactory<'a> {
    /// Creates a factory backed by an explicit registry.
    pub fn with_registry(registry: &'a ProviderRegistry) -> Self {
        Self {
            registry,
            config: FactoryConfig::default(),
        }
    }

    /// Replaces the factory config.
    pub fn with_config(mut self, config: FactoryConfig) -> Self {
        self.config = config;
        self
    }

    /// The factory config.
    pub fn config(&self) -> FactoryConfig {
        self.config
    }

    /// Creates a tensor filled with the ring's zero.
    ///
    /// # Errors
    ///
    /// Fails on an invalid shape or when no provider matches a `Dense` hint.
    pub fn zeros<T: Scalar>(
        &self,
        ring: RingRef<T>,
        shape: &[usize],
        storage: Storage,
    ) -> Result<BoxTensor<T>, ProviderError> {
        let provider = self.provider::<T>(storage)?;
        Ok(provider.zeros(ring, shape)?)
    }

    /// Creates a tensor filled with the ring's one.
    ///
    /// # Errors
    ///
    /// Fails on an invalid shape or when no provider matches a `Dense` hint.
    pub fn ones<T: Scalar>(
        &self,
        ring: RingRef<T>,
        shape: &[usize],
        storage: Storage,
    ) -> Result<BoxTensor<T>, ProviderError> {
        let provider = self.provider::<T>(storage)?;
        Ok(provider.ones(ring, shape)?)
    }

    /// Creates a tensor from row-major data.
    ///
    /// # Errors
    ///
    /// Fails on an invalid shape, if `data.len()` differs from the number of
    /// elements of `shape`, or when no provider matches a `Dense` hint.
    pub fn of<T: Scalar>(
        &self,
        ring: RingRef<T>,
        data: Vec<T>,
        shape: &[usize],
        storage: Storage,
    ) -> Result<BoxTensor<T>, ProviderError> {
        validate_shape(shape)?;
        let expected = numel(shape);
        if data.len() != expected {
            return Err(TensorError::SizeMismatch {
                expected,
                actual: data.len(),
            }
            .into());
        }

        let provider = match storage {
            Storage::Auto => {
                let preferred = self.preferred_storage(&ring, &data);
                self.registry
                    .tensor_provider_for::<T>(preferred)
                    .unwrap_or_else(|_| self.registry.tensor_provider::<T>())
            }
            hint => self.provider::<T>(hint)?,
        };
        log::trace!(
            "factory building a {} tensor of shape {:?} with '{}'",
            provider.storage(),
            shape,
            provider.name()
        );
        Ok(provider.create(ring, data, shape)?)
    }

    /// Storage kind `of` prefers for `data` under [`Storage::Auto`].
    pub fn preferred_storage<T: Scalar>(&self, ring: &RingRef<T>, data: &[T]) -> StorageKind {
        let zero = ring.zero();
        let nonzero = data.iter().filter(|v| !ring.equals(v, &zero)).count();
        let density = if data.is_empty() {
            0.0
        } else {
            nonzero as f64 / data.len() as f64
        };
        if density <= self.config.sparse_density_threshold {
            StorageKind::Sparse
        } else {
            StorageKind::Dense
        }
    }

    fn provider<T: Scalar>(&self, storage: Storage) -> Result<TensorProviderRef<T>, ProviderError> {
        match storage {
            Storage::Auto => Ok(self.registry.tensor_provider::<T>()),
            Storage::Dense => self.registry.tensor_provider_for::<T>(StorageKind::Dense),
            Storage::Sparse => self.registry.tensor_provider_for::<T>(StorageKind::Sparse),
        }
    }
}
