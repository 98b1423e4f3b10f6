use tessera_tensor::TensorError;
use thiserror::Error;

/// An error type for provider lookup, discovery and construction.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProviderError {
    /// No registered provider carries the requested name for the element type.
    #[error("No tensor provider named '{name}' for element type {element}")]
    NotFound {
        /// The requested provider name.
        name: String,
        /// The requested element type.
        element: &'static str,
    },

    /// The registry cannot produce any provider for the request.
    #[error("Provider registry misconfigured: {0}")]
    Configuration(String),

    /// A plugin failed while registering its providers.
    #[error("Plugin '{plugin}' failed: {reason}")]
    Plugin {
        /// Name of the failing plugin.
        plugin: String,
        /// Error message or panic payload.
        reason: String,
    },

    /// Tensor construction failed inside a provider.
    #[error("Error with the tensor: {0}")]
    Tensor(#[from] TensorError),
}

impl ProviderError {
    /// Creates a [`ProviderError::NotFound`] for element type `T`.
    pub fn not_found<T>(name: impl Into<String>) -> Self {
        Self::NotFound {
            name: name.into(),
            element: std::any::type_name::<T>(),
        }
    }

    /// Creates a [`ProviderError::Plugin`].
    pub fn plugin(plugin: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Plugin {
            plugin: plugin.into(),
            reason: reason.into(),
        }
    }
}
