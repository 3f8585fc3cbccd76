//! Module and entry-point definitions
//!
//! A definition is a deferred unit of code: a dependency list plus a factory.
//! Named definitions become module instances; entry points only run for
//! their side effects.

use std::fmt;
use std::rc::Rc;

use crate::module::exports::Exports;
use crate::module::handle::ModuleHandle;
use crate::module::registry::manifest::ModuleDeclaration;
use crate::module::traits::ModuleFactory;

/// Dependency reference embedded in a definition
///
/// `loaded` is a cache refreshed on every check; the loaded set is the
/// source of truth.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dependency {
    pub name: String,
    pub loaded: bool,
}

impl Dependency {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            loaded: false,
        }
    }
}

pub(crate) fn dependency_list<I, S>(names: I) -> Vec<Dependency>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    names.into_iter().map(Dependency::new).collect()
}

/// Named module waiting to be instantiated
pub struct ModuleDefinition {
    pub(crate) name: String,
    pub(crate) dependencies: Vec<Dependency>,
    pub(crate) origin: Option<String>,
    pub(crate) factory: ModuleFactory,
}

impl ModuleDefinition {
    pub fn new<I, S, F>(name: impl Into<String>, dependencies: I, factory: F) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
        F: FnOnce(&mut Exports, &ModuleHandle, &[Rc<Exports>]) -> anyhow::Result<()> + 'static,
    {
        Self::from_boxed(name, dependencies, Box::new(factory))
    }

    pub fn from_boxed<I, S>(name: impl Into<String>, dependencies: I, factory: ModuleFactory) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            dependencies: dependency_list(dependencies),
            origin: None,
            factory,
        }
    }

    /// Record where this definition came from (file, bundle, ...)
    pub fn with_origin(mut self, origin: impl Into<String>) -> Self {
        self.origin = Some(origin.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn dependencies(&self) -> &[Dependency] {
        &self.dependencies
    }

    pub fn origin(&self) -> Option<&str> {
        self.origin.as_deref()
    }

    pub(crate) fn declaration(&self) -> ModuleDeclaration {
        ModuleDeclaration {
            name: self.name.clone(),
            dependencies: self.dependencies.iter().map(|d| d.name.clone()).collect(),
            origin: self.origin.clone(),
        }
    }
}

impl fmt::Debug for ModuleDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModuleDefinition")
            .field("name", &self.name)
            .field("dependencies", &self.dependencies)
            .field("origin", &self.origin)
            .finish_non_exhaustive()
    }
}

/// Entry point ("runner")
///
/// Never a dependency of anything; its label only shows up in diagnostics.
pub struct EntryPoint {
    pub(crate) label: String,
    pub(crate) dependencies: Vec<Dependency>,
    pub(crate) factory: ModuleFactory,
}

impl EntryPoint {
    pub fn new<I, S, F>(label: impl Into<String>, dependencies: I, factory: F) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
        F: FnOnce(&mut Exports, &ModuleHandle, &[Rc<Exports>]) -> anyhow::Result<()> + 'static,
    {
        Self::from_boxed(label, dependencies, Box::new(factory))
    }

    pub fn from_boxed<I, S>(label: impl Into<String>, dependencies: I, factory: ModuleFactory) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            label: label.into(),
            dependencies: dependency_list(dependencies),
            factory,
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn dependencies(&self) -> &[Dependency] {
        &self.dependencies
    }
}

impl fmt::Debug for EntryPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntryPoint")
            .field("label", &self.label)
            .field("dependencies", &self.dependencies)
            .finish_non_exhaustive()
    }
}

/// Realised result of running a module factory
#[derive(Debug, Clone)]
pub struct ModuleInstance {
    pub definition: ModuleDeclaration,
    pub exports: Rc<Exports>,
    /// Whether the factory asked for delayed loading
    pub loading_delayed: bool,
}

impl ModuleInstance {
    pub fn name(&self) -> &str {
        &self.definition.name
    }
}
