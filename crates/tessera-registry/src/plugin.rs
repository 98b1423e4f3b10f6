//! Plugin discovery.
//!
//! Providers reach the registry through plugins. The process-wide plugin
//! table is populated at start-up by whoever links a backend in, and can be
//! changed at run time; the next [`crate::ProviderRegistry::reload`] picks
//! the change up.

use std::sync::Arc;

use once_cell::sync::OnceCell;
use parking_lot::RwLock;
use tessera_tensor::Scalar;

use crate::{
    error::ProviderError,
    provider::{CpuMatrixProvider, DenseTensorProvider, MatrixProviderRef, TensorProviderRef},
    registry::TensorEntry,
};

/// A unit of discovery contributing providers to a registry.
pub trait ProviderPlugin: Send + Sync {
    /// Plugin name, reported in [`crate::DiscoveryReport`].
    fn name(&self) -> &str;

    /// Adds this plugin's providers to `sink`.
    ///
    /// # Errors
    ///
    /// A failing plugin is skipped by discovery; whatever it added to `sink`
    /// before failing is discarded.
    fn register(&self, sink: &mut PluginSink) -> Result<(), ProviderError>;
}

/// Collects the providers registered by one plugin.
#[derive(Default)]
pub struct PluginSink {
    pub(crate) matrix: Vec<MatrixProviderRef>,
    pub(crate) tensor: Vec<TensorEntry>,
}

impl PluginSink {
    /// Adds a matrix provider.
    pub fn add_matrix_provider(&mut self, provider: MatrixProviderRef) {
        self.matrix.push(provider);
    }

    /// Adds a tensor provider serving element type `T`.
    pub fn add_tensor_provider<T: Scalar>(&mut self, provider: TensorProviderRef<T>) {
        self.tensor.push(TensorEntry::typed(provider));
    }

    /// Number of providers added so far.
    pub fn len(&self) -> usize {
        self.matrix.len() + self.tensor.len()
    }

    /// Returns true if nothing was added.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn plugin_table() -> &'static RwLock<Vec<Arc<dyn ProviderPlugin>>> {
    static PLUGINS: OnceCell<RwLock<Vec<Arc<dyn ProviderPlugin>>>> = OnceCell::new();
    PLUGINS.get_or_init(|| RwLock::new(Vec::new()))
}

/// Adds a plugin to the process-wide plugin table.
///
/// Registries built with [`crate::ProviderRegistry::new`] see it on their
/// next reload.
pub fn register_plugin(plugin: Arc<dyn ProviderPlugin>) {
    log::debug!("registering provider plugin '{}'", plugin.name());
    plugin_table().write().push(plugin);
}

/// Removes every plugin added with [`register_plugin`]. The built-in plugin stays.
pub fn clear_plugins() {
    plugin_table().write().clear();
}

/// The plugins discovery runs for a global registry: the built-in plugin first,
/// then the plugin table in registration order.
pub fn discoverable_plugins() -> Vec<Arc<dyn ProviderPlugin>> {
    let mut plugins: Vec<Arc<dyn ProviderPlugin>> = vec![Arc::new(BuiltinPlugin)];
    plugins.extend(plugin_table().read().iter().cloned());
    plugins
}

/// Registers the CPU backends shipped with this crate.
///
/// Contributes a [`CpuMatrixProvider`] for each standard numeric ring and a
/// [`DenseTensorProvider`] for `f32`, `f64`, `i32` and `i64`. The sparse
/// provider is the registry's retained default and is not listed here.
#[derive(Debug, Clone, Copy, Default)]
pub struct BuiltinPlugin;

impl BuiltinPlugin {
    /// Name of the plugin.
    pub const NAME: &'static str = "builtin";

    /// Rings served by the built-in matrix providers.
    pub const MATRIX_RINGS: [&'static str; 4] = ["f32", "f64", "i32", "i64"];
}

impl ProviderPlugin for BuiltinPlugin {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn register(&self, sink: &mut PluginSink) -> Result<(), ProviderError> {
        for ring in Self::MATRIX_RINGS {
            sink.add_matrix_provider(Arc::new(CpuMatrixProvider::new(ring)));
        }
        let dense = DenseTensorProvider::new();
        sink.add_tensor_provider::<f32>(Arc::new(dense));
        sink.add_tensor_provider::<f64>(Arc::new(dense));
        sink.add_tensor_provider::<i32>(Arc::new(dense));
        sink.add_tensor_provider::<i64>(Arc::new(dense));
        Ok(())
    }
}
