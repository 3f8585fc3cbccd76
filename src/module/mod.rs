//! Module system
//!
//! Named modules declare dependency names and a factory. The manager
//! instantiates each module exactly once, after everything it depends on,
//! when some entry point needs it.
//!
//! ## Architecture
//!
//! - **Registry**: [`ModuleManager`] owns loaded/pending modules, the entry-point
//!   queue and runner blockers, and runs the fixed-point resolver
//! - **Façade**: [`Loader`] translates native and foreign declarations into
//!   registry calls and exposes diagnostics
//! - **Delayed readiness**: a factory may park its module until an external
//!   event completes it through its [`ModuleHandle`]
//! - **Runner blockers**: named tokens that pause entry-point execution until
//!   all of them are removed

pub mod exports;
pub mod handle;
pub mod loader;
pub mod manager;
pub mod registry;
pub mod traits;
pub mod triggers;

pub use exports::Exports;
pub use handle::{DelayState, ModuleHandle, UnitKind};
pub use loader::{AmdFactory, Loader, Require};
pub use manager::ModuleManager;
pub use registry::{
    DependencyReport, EntryPoint, ModuleDeclaration, ModuleDefinition, ModuleInstance,
    ModuleManifest,
};
pub use traits::{ModuleError, ModuleFactory, ModuleState};
pub use triggers::TriggerScanner;
