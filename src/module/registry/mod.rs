//! Module registry data
//!
//! Definitions, instances, unresolved-dependency reports and manifests.

pub mod definition;
pub mod dependencies;
pub mod manifest;

pub use definition::{Dependency, EntryPoint, ModuleDefinition, ModuleInstance};
pub use dependencies::{DependencyReport, DependencyStatus, UnresolvedDependency, WaitingRunner};
pub use manifest::{ModuleDeclaration, ModuleManifest, RunnerDeclaration};
