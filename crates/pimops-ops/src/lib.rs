//! Custom ops offloaded to the PIM device.

use pimops_core::{OpRegistry, RegistryError};
use tracing::info;

pub mod dense;

pub use dense::{pim_dense_op, BiasMode, PIM_DENSE};

/// Registers every op in this crate. Call once while setting up the registry.
pub fn register_all(registry: &mut OpRegistry) -> Result<(), RegistryError> {
    registry.register(pim_dense_op())?;
    info!(ops = registry.len(), "registered PIM ops");
    Ok(())
}
