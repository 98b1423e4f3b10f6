use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use once_cell::sync::OnceCell;
use parking_lot::{Mutex, RwLock};
use tessera_tensor::{Scalar, StorageKind};

use crate::{
    error::ProviderError,
    plugin::{discoverable_plugins, PluginSink, ProviderPlugin},
    provider::{
        CpuMatrixProvider, MatrixProvider, MatrixProviderRef, SparseTensorProvider,
        TensorProvider, TensorProviderRef,
    },
};

/// Description of a registered tensor provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderInfo {
    /// Provider name.
    pub name: String,
    /// Storage kind of the tensors it builds.
    pub storage: StorageKind,
    /// Selection priority.
    pub priority: i32,
    /// Element type served, or `None` for a provider serving every element type.
    pub element: Option<&'static str>,
}

#[derive(Clone)]
enum ErasedProvider {
    /// An `Arc<dyn TensorProvider<T>>` for one `T`, boxed once more as `Any`.
    Typed(Arc<dyn Any + Send + Sync>),
    Sparse(SparseTensorProvider),
}

/// A type-erased tensor provider held by the registry.
#[derive(Clone)]
pub(crate) struct TensorEntry {
    info: ProviderInfo,
    provider: ErasedProvider,
}

impl TensorEntry {
    pub(crate) fn typed<T: Scalar>(provider: TensorProviderRef<T>) -> Self {
        Self {
            info: ProviderInfo {
                name: provider.name().to_string(),
                storage: provider.storage(),
                priority: provider.priority(),
                element: Some(std::any::type_name::<T>()),
            },
            provider: ErasedProvider::Typed(Arc::new(provider)),
        }
    }

    fn sparse(provider: SparseTensorProvider) -> Self {
        Self {
            info: ProviderInfo {
                name: SparseTensorProvider::NAME.to_string(),
                storage: StorageKind::Sparse,
                priority: SparseTensorProvider::PRIORITY,
                element: None,
            },
            provider: ErasedProvider::Sparse(provider),
        }
    }

    pub(crate) fn info(&self) -> &ProviderInfo {
        &self.info
    }

    /// The provider as a `TensorProvider<T>`, if it serves `T`.
    fn get<T: Scalar>(&self) -> Option<TensorProviderRef<T>> {
        match &self.provider {
            ErasedProvider::Typed(any) => any.downcast_ref::<TensorProviderRef<T>>().cloned(),
            ErasedProvider::Sparse(sparse) => Some(Arc::new(*sparse)),
        }
    }
}

/// Outcome of a discovery run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DiscoveryReport {
    /// Plugins whose providers were registered, in discovery order.
    pub loaded: Vec<String>,
    /// Plugins skipped because they failed or panicked.
    pub skipped: Vec<ProviderError>,
    /// Number of matrix providers after discovery.
    pub matrix_providers: usize,
    /// Number of tensor providers after discovery, the retained default included.
    pub tensor_providers: usize,
    /// Whether the retained default had to be re-inserted.
    pub default_inserted: bool,
}

enum PluginSource {
    /// The built-in plugin plus the process-wide plugin table, read on every reload.
    Discoverable,
    /// A fixed plugin list.
    Fixed(Vec<Arc<dyn ProviderPlugin>>),
}

impl PluginSource {
    fn plugins(&self) -> Vec<Arc<dyn ProviderPlugin>> {
        match self {
            PluginSource::Discoverable => discoverable_plugins(),
            PluginSource::Fixed(plugins) => plugins.clone(),
        }
    }
}

/// Catalogue of matrix and tensor providers.
///
/// Lookups never fail to produce a tensor provider: a [`SparseTensorProvider`]
/// is retained for the registry's lifetime and re-inserted after every reload
/// in which no discovered provider carries its name.
///
/// All methods take `&self`; the collections are internally locked and a
/// reload swaps them atomically, so concurrent lookups see either the old or
/// the new provider set.
///
/// # Examples
///
/// ```rust
/// use tessera_registry::ProviderRegistry;
/// use tessera_tensor::{ring_of, StorageKind};
///
/// let registry = ProviderRegistry::with_plugins(Vec::new());
/// let provider = registry.tensor_provider::<f64>();
/// assert_eq!(provider.storage(), StorageKind::Sparse);
///
/// let t = provider.create(ring_of::<f64>(), vec![0.0, 1.0], &[2]).unwrap();
/// assert_eq!(t.nnz(), 1);
/// ```
pub struct ProviderRegistry {
    source: PluginSource,
    matrix: RwLock<Vec<MatrixProviderRef>>,
    tensor: RwLock<Vec<TensorEntry>>,
    default: SparseTensorProvider,
    reload_guard: Mutex<()>,
}

impl ProviderRegistry {
    /// Creates a registry fed by the built-in plugin and the process-wide
    /// plugin table, and runs discovery once.
    pub fn new() -> Self {
        Self::build(PluginSource::Discoverable, SparseTensorProvider::default())
    }

    /// Creates an isolated registry fed only by `plugins`.
    ///
    /// The built-in plugin is not implied; pass [`crate::BuiltinPlugin`]
    /// explicitly to include it.
    pub fn with_plugins(plugins: Vec<Arc<dyn ProviderPlugin>>) -> Self {
        Self::build(PluginSource::Fixed(plugins), SparseTensorProvider::default())
    }

    /// Same as [`ProviderRegistry::with_plugins`] with a custom retained default.
    pub fn with_default(
        plugins: Vec<Arc<dyn ProviderPlugin>>,
        default: SparseTensorProvider,
    ) -> Self {
        Self::build(PluginSource::Fixed(plugins), default)
    }

    fn build(source: PluginSource, default: SparseTensorProvider) -> Self {
        let registry = Self {
            source,
            matrix: RwLock::new(Vec::new()),
            tensor: RwLock::new(Vec::new()),
            default,
            reload_guard: Mutex::new(()),
        };
        registry.reload();
        registry
    }

    /// The process-wide registry. Discovery runs on first access.
    pub fn global() -> &'static ProviderRegistry {
        static GLOBAL: OnceCell<ProviderRegistry> = OnceCell::new();
        GLOBAL.get_or_init(ProviderRegistry::new)
    }

    /// Re-runs plugin discovery and replaces both provider collections.
    ///
    /// Plugins run without any collection lock held. A plugin that returns an
    /// error or panics is skipped and logged; discovery continues with the
    /// next one. Concurrent reloads are serialised.
    pub fn reload(&self) -> DiscoveryReport {
        let _guard = self.reload_guard.lock();

        let mut report = DiscoveryReport::default();
        let mut matrix = Vec::new();
        let mut tensor = Vec::new();

        for plugin in self.source.plugins() {
            let name = plugin.name().to_string();
            let mut sink = PluginSink::default();
            let outcome = catch_unwind(AssertUnwindSafe(|| plugin.register(&mut sink)));
            let error = match outcome {
                Ok(Ok(())) => None,
                Ok(Err(err)) => Some(ProviderError::plugin(&name, err.to_string())),
                Err(payload) => Some(ProviderError::plugin(&name, panic_message(payload.as_ref()))),
            };
            match error {
                None => {
                    log::debug!("plugin '{}' registered {} provider(s)", name, sink.len());
                    matrix.append(&mut sink.matrix);
                    tensor.append(&mut sink.tensor);
                    report.loaded.push(name);
                }
                Some(err) => {
                    log::warn!("skipping provider plugin: {err}");
                    report.skipped.push(err);
                }
            }
        }

        if !tensor
            .iter()
            .any(|entry: &TensorEntry| entry.info.name == SparseTensorProvider::NAME)
        {
            tensor.push(TensorEntry::sparse(self.default));
            report.default_inserted = true;
        }

        report.matrix_providers = matrix.len();
        report.tensor_providers = tensor.len();
        *self.matrix.write() = matrix;
        *self.tensor.write() = tensor;

        log::debug!(
            "provider discovery finished: {} matrix, {} tensor provider(s), {} plugin(s) skipped",
            report.matrix_providers,
            report.tensor_providers,
            report.skipped.len()
        );
        report
    }

    /// Snapshot of the registered matrix providers in discovery order.
    pub fn matrix_providers(&self) -> Vec<MatrixProviderRef> {
        self.matrix.read().clone()
    }

    /// Snapshot of the registered tensor providers in discovery order.
    pub fn tensor_providers(&self) -> Vec<ProviderInfo> {
        self.tensor.read().iter().map(|e| e.info().clone()).collect()
    }

    /// Selects a matrix provider for `ring` by declared capability.
    ///
    /// The available registered provider with the highest priority whose
    /// capabilities list `ring` wins; otherwise a [`CpuMatrixProvider`] for
    /// `ring` is built.
    pub fn matrix_provider(&self, ring: &str) -> MatrixProviderRef {
        let candidates = self.matrix.read();
        let best = highest_priority(
            candidates
                .iter()
                .filter(|p| p.is_available())
                .map(|p| (p.capabilities(), p))
                .filter(|(caps, _)| caps.supports_ring(ring))
                .map(|(caps, p)| (caps.priority, p.clone())),
        );
        best.unwrap_or_else(|| {
            log::debug!("no registered matrix provider for ring '{ring}', using the CPU fallback");
            Arc::new(CpuMatrixProvider::new(ring))
        })
    }

    /// The highest-priority tensor provider serving `T`, or the retained default.
    pub fn tensor_provider<T: Scalar>(&self) -> TensorProviderRef<T> {
        self.select::<T>(|_| true)
            .unwrap_or_else(|| Arc::new(self.default))
    }

    /// The highest-priority tensor provider serving `T` with the given storage.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError::Configuration`] if no such provider exists.
    /// Sparse requests fall back to the retained default and never fail.
    pub fn tensor_provider_for<T: Scalar>(
        &self,
        storage: StorageKind,
    ) -> Result<TensorProviderRef<T>, ProviderError> {
        match self.select::<T>(|info| info.storage == storage) {
            Some(provider) => Ok(provider),
            None if storage == StorageKind::Sparse => Ok(Arc::new(self.default)),
            None => Err(ProviderError::Configuration(format!(
                "no {storage} tensor provider registered for {}",
                std::any::type_name::<T>()
            ))),
        }
    }

    /// The first tensor provider named `name` that serves `T`.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError::NotFound`] if none matches.
    pub fn tensor_provider_by_name<T: Scalar>(
        &self,
        name: &str,
    ) -> Result<TensorProviderRef<T>, ProviderError> {
        self.tensor
            .read()
            .iter()
            .filter(|entry| entry.info.name == name)
            .find_map(TensorEntry::get::<T>)
            .ok_or_else(|| ProviderError::not_found::<T>(name))
    }

    /// Adds a tensor provider to the live collection.
    ///
    /// Runtime registrations are dropped by the next [`ProviderRegistry::reload`].
    pub fn register_tensor_provider<T: Scalar>(&self, provider: TensorProviderRef<T>) {
        log::debug!(
            "registering tensor provider '{}' for {}",
            provider.name(),
            std::any::type_name::<T>()
        );
        self.tensor.write().push(TensorEntry::typed(provider));
    }

    /// Adds a matrix provider to the live collection.
    ///
    /// Runtime registrations are dropped by the next [`ProviderRegistry::reload`].
    pub fn register_matrix_provider(&self, provider: MatrixProviderRef) {
        log::debug!("registering matrix provider '{}'", provider.name());
        self.matrix.write().push(provider);
    }

    /// The retained default provider.
    pub fn default_provider(&self) -> SparseTensorProvider {
        self.default
    }

    fn select<T: Scalar>(
        &self,
        accept: impl Fn(&ProviderInfo) -> bool,
    ) -> Option<TensorProviderRef<T>> {
        let entries = self.tensor.read();
        highest_priority(
            entries
                .iter()
                .filter(|entry| accept(&entry.info))
                .filter_map(|entry| entry.get::<T>().map(|p| (entry.info.priority, p))),
        )
    }
}

impl Default for ProviderRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ProviderRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderRegistry")
            .field("matrix", &self.matrix.read())
            .field("tensor", &self.tensor_providers())
            .field("default", &self.default)
            .finish()
    }
}

/// Picks the candidate with the highest priority; the earliest one wins ties.
fn highest_priority<P>(candidates: impl Iterator<Item = (i32, P)>) -> Option<P> {
    candidates
        .fold(None, |best: Option<(i32, P)>, (priority, candidate)| match best {
            Some((top, _)) if top >= priority => best,
            _ => Some((priority, candidate)),
        })
        .map(|(_, candidate)| candidate)
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "plugin panicked".to_string()
    }
}
