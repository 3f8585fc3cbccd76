//! Module system types shared by the registry and the façade
//!
//! Defines the factory calling convention, module lifecycle state and the
//! error type used across the module system.

use serde::{Deserialize, Serialize};
use std::rc::Rc;
use thiserror::Error;

use crate::module::exports::Exports;
use crate::module::handle::ModuleHandle;

/// Native factory signature
///
/// Invoked at most once, with a fresh exports record, the module-control
/// handle and the exports of every declared dependency in declared order.
pub type ModuleFactory =
    Box<dyn FnOnce(&mut Exports, &ModuleHandle, &[Rc<Exports>]) -> anyhow::Result<()>>;

/// Module lifecycle state
///
/// A module only ever moves forward: `Pending -> Instantiating -> Loaded`,
/// optionally through `Delayed`. `Failed` is reached only when the factory
/// returned an error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ModuleState {
    /// Never registered
    Unknown,
    /// Registered, waiting for its dependencies
    Pending,
    /// Factory is currently running
    Instantiating,
    /// Factory requested delayed loading and has not signalled completion
    Delayed,
    /// Exports are available to dependents
    Loaded,
    /// Factory returned an error
    Failed(String),
}

impl ModuleState {
    /// Whether the module can still become loaded
    pub fn is_resolvable(&self) -> bool {
        matches!(
            self,
            ModuleState::Pending | ModuleState::Instantiating | ModuleState::Delayed
        )
    }
}

/// Module system errors
#[derive(Debug, Error)]
pub enum ModuleError {
    #[error("Module discovery failed: {0}")]
    DiscoveryFailed(String),

    #[error("Module factory failed: {0}")]
    FactoryFailed(String),

    #[error("Module not found: {0}")]
    ModuleNotFound(String),

    #[error("Invalid module manifest: {0}")]
    InvalidManifest(String),

    #[error("Invalid loader configuration: {0}")]
    InvalidConfig(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Module operation failed: {0}")]
    OperationError(String),
}

impl From<toml::ser::Error> for ModuleError {
    fn from(e: toml::ser::Error) -> Self {
        ModuleError::SerializationError(e.to_string())
    }
}
