use std::sync::Arc;
use std::thread;

use tessera::registry::{
    clear_plugins, register_plugin, BuiltinPlugin, DenseTensorProvider, PluginSink, ProviderError,
    ProviderPlugin, ProviderRegistry, SparseTensorProvider, Storage, TensorFactory,
};
use tessera::tensor::{ring_of, AlgebraConfig, StorageKind};

struct DenseU16;

impl ProviderPlugin for DenseU16 {
    fn name(&self) -> &str {
        "dense-u16"
    }

    fn register(&self, sink: &mut PluginSink) -> Result<(), ProviderError> {
        sink.add_tensor_provider::<u16>(Arc::new(DenseTensorProvider::new()));
        Ok(())
    }
}

struct Broken;

impl ProviderPlugin for Broken {
    fn name(&self) -> &str {
        "broken"
    }

    fn register(&self, _sink: &mut PluginSink) -> Result<(), ProviderError> {
        Err(ProviderError::Configuration("shared library not found".into()))
    }
}

// The only test in this binary that touches the process-wide plugin table.
#[test]
fn plugin_table_feeds_reload() -> Result<(), ProviderError> {
    let _ = env_logger::builder().is_test(true).try_init();

    let registry = ProviderRegistry::new();
    assert!(registry.tensor_provider_by_name::<u16>("cpu-dense").is_err());

    register_plugin(Arc::new(DenseU16));
    register_plugin(Arc::new(Broken));
    let report = registry.reload();
    assert_eq!(report.loaded, vec!["builtin".to_string(), "dense-u16".to_string()]);
    assert_eq!(report.skipped, vec![ProviderError::plugin(
        "broken",
        "Provider registry misconfigured: shared library not found"
    )]);
    let provider = registry.tensor_provider_for::<u16>(StorageKind::Dense)?;
    assert_eq!(provider.name(), DenseTensorProvider::NAME);

    clear_plugins();
    let report = registry.reload();
    assert_eq!(report.loaded, vec!["builtin".to_string()]);
    assert!(report.skipped.is_empty());
    assert!(registry.tensor_provider_for::<u16>(StorageKind::Dense).is_err());
    Ok(())
}

#[test]
fn default_survives_every_reload() {
    let registry = ProviderRegistry::with_plugins(vec![Arc::new(Broken)]);
    for _ in 0..3 {
        let report = registry.reload();
        assert!(report.default_inserted);
        assert_eq!(report.tensor_providers, 1);
        assert_eq!(
            registry.tensor_provider::<f32>().name(),
            SparseTensorProvider::NAME
        );
    }
}

#[test]
fn custom_default_config_reaches_tensors() -> Result<(), ProviderError> {
    let config = AlgebraConfig::with_parallel_threshold(64);
    let registry =
        ProviderRegistry::with_default(Vec::new(), SparseTensorProvider::with_config(config));
    assert_eq!(registry.default_provider(), SparseTensorProvider::with_config(config));
    let factory = TensorFactory::with_registry(&registry);
    let t = factory.ones(ring_of::<i32>(), &[4, 4], Storage::Auto)?;
    assert_eq!(t.config(), config);
    assert_eq!(t.sum(), 16);
    Ok(())
}

#[test]
fn lookups_during_reload() {
    let registry = ProviderRegistry::with_plugins(vec![Arc::new(BuiltinPlugin)]);
    thread::scope(|s| {
        s.spawn(|| {
            for _ in 0..50 {
                registry.reload();
            }
        });
        for _ in 0..4 {
            s.spawn(|| {
                for _ in 0..200 {
                    // both collections are swapped whole, so a snapshot is never half-empty
                    let providers = registry.tensor_providers();
                    assert_eq!(providers.len(), 5);
                    assert_eq!(registry.matrix_providers().len(), 4);
                    let dense = registry.tensor_provider_for::<f64>(StorageKind::Dense);
                    assert!(dense.is_ok());
                    assert_eq!(
                        registry.tensor_provider::<f64>().name(),
                        SparseTensorProvider::NAME
                    );
                }
            });
        }
    });
}

#[test]
fn matrix_fallback_for_unknown_ring() {
    let registry = ProviderRegistry::with_plugins(vec![Arc::new(BuiltinPlugin)]);
    assert_eq!(registry.matrix_provider("f64").name(), "cpu-matrix-f64");
    let fallback = registry.matrix_provider("complex64");
    assert_eq!(fallback.name(), "cpu-matrix-complex64");
    assert!(fallback.is_available());
    assert!(fallback.capabilities().supports_ring("complex64"));
}
