#![deny(missing_docs)]
#![doc = env!("CARGO_PKG_DESCRIPTION")]
//!
//! # Overview
//!
//! Backends reach application code in three steps:
//!
//! 1. a [`ProviderPlugin`] adds matrix and tensor providers to a [`PluginSink`]
//! 2. the [`ProviderRegistry`] runs every plugin during discovery and keeps
//!    the providers, sorted out by priority at lookup time
//! 3. the [`TensorFactory`] asks the registry for a provider and builds the tensor
//!
//! A [`SparseTensorProvider`] is retained by every registry, so tensor
//! lookups succeed even when discovery finds nothing.
//!
//! # Plugins
//!
//! ```rust
//! use std::sync::Arc;
//! use tessera_registry::{
//!     register_plugin, DenseTensorProvider, PluginSink, ProviderError, ProviderPlugin,
//!     ProviderRegistry,
//! };
//!
//! struct DenseU8;
//!
//! impl ProviderPlugin for DenseU8 {
//!     fn name(&self) -> &str {
//!         "dense-u8"
//!     }
//!
//!     fn register(&self, sink: &mut PluginSink) -> Result<(), ProviderError> {
//!         sink.add_tensor_provider::<u8>(Arc::new(DenseTensorProvider::new()));
//!         Ok(())
//!     }
//! }
//!
//! register_plugin(Arc::new(DenseU8));
//! let registry = ProviderRegistry::new();
//! assert!(registry.tensor_provider_by_name::<u8>("cpu-dense").is_ok());
//! ```

/// Error types for provider lookup and discovery.
pub mod error;

/// Tensor factory with storage hints.
pub mod factory;

/// Plugin trait, process-wide plugin table and the built-in plugin.
pub mod plugin;

/// Tensor and matrix provider traits and the CPU providers.
pub mod provider;

/// The provider registry.
pub mod registry;

pub use crate::error::ProviderError;
pub use crate::factory::{FactoryConfig, Storage, TensorFactory};
pub use crate::plugin::{
    clear_plugins, discoverable_plugins, register_plugin, BuiltinPlugin, PluginSink,
    ProviderPlugin,
};
pub use crate::provider::{
    CpuMatrixProvider, DenseTensorProvider, MatrixProvider, MatrixProviderRef,
    ProviderCapabilities, SparseTensorProvider, TensorProvider, TensorProviderRef,
};
pub use crate::registry::{DiscoveryReport, ProviderInfo, ProviderRegistry};
