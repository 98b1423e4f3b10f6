#![doc = env!("CARGO_PKG_DESCRIPTION")]
//!
//! Re-exports the tessera crates under one roof:
//!
//! - [`tensor`]: the tensor contract, sparse and dense storage, element rings
//! - [`registry`]: providers, plugin discovery, the registry and the tensor factory

#[doc(inline)]
pub use tessera_tensor as tensor;

#[doc(inline)]
pub use tessera_registry as registry;
