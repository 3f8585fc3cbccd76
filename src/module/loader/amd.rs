//! Foreign declaration adapter
//!
//! Lets units written against an asynchronous-module-definition style
//! `define(deps, factory)` register into the loader. The foreign
//! convention differs in two ways:
//!
//! - the dependency list starts with reserved entries (`require`, `exports`)
//!   that the loader supplies itself, and paths may carry a relative marker;
//! - the factory takes `(require, exports, ...deps)` rather than
//!   `(exports, module, ...deps)`.

use std::rc::Rc;
use tracing::debug;

use crate::config::AdapterConfig;
use crate::module::exports::Exports;
use crate::module::handle::ModuleHandle;
use crate::module::traits::{ModuleError, ModuleFactory};

/// Foreign factory signature
pub type AmdFactory = Box<dyn FnOnce(&Require, &mut Exports, &[Rc<Exports>]) -> anyhow::Result<()>>;

/// Stand-in for the foreign `require` parameter
///
/// Synchronous lookups are not supported; every dependency arrives through
/// injection instead.
#[derive(Debug, Clone, Copy, Default)]
pub struct Require;

impl Require {
    pub fn require(&self, _name: &str) -> Option<Rc<Exports>> {
        None
    }
}

/// Declaration captured from a discovery callable
pub struct AmdDeclaration {
    pub dependencies: Vec<String>,
    pub factory: ModuleFactory,
}

/// Translates foreign declarations into native ones
#[derive(Debug, Clone)]
pub struct AmdAdapter {
    reserved_dependencies: usize,
    relative_prefix: String,
}

impl Default for AmdAdapter {
    fn default() -> Self {
        Self::new(&AdapterConfig::default())
    }
}

impl AmdAdapter {
    pub fn new(config: &AdapterConfig) -> Self {
        Self {
            reserved_dependencies: config.reserved_dependencies,
            relative_prefix: config.relative_prefix.clone(),
        }
    }

    /// Invoke `discover` with a capture callback and adapt what it hands over
    ///
    /// If the callback is invoked more than once the last declaration wins.
    pub fn discover<D>(&self, discover: D) -> Result<AmdDeclaration, ModuleError>
    where
        D: FnOnce(&mut dyn FnMut(Vec<String>, AmdFactory)),
    {
        let mut captured: Option<(Vec<String>, AmdFactory)> = None;
        let mut capture = |dependencies: Vec<String>, factory: AmdFactory| {
            captured = Some((dependencies, factory));
        };
        discover(&mut capture);

        let (raw, factory) = captured.ok_or_else(|| {
            ModuleError::DiscoveryFailed("discovery callable never declared a module".to_string())
        })?;
        let dependencies = self.normalize_dependencies(raw);
        debug!("Discovered foreign declaration with dependencies {:?}", dependencies);

        Ok(AmdDeclaration {
            dependencies,
            factory: wrap_factory(factory),
        })
    }

    /// Drop the reserved leading entries and strip the relative marker
    pub fn normalize_dependencies(&self, raw: Vec<String>) -> Vec<String> {
        raw.into_iter()
            .skip(self.reserved_dependencies)
            .map(|dep| match dep.strip_prefix(self.relative_prefix.as_str()) {
                Some(stripped) if !self.relative_prefix.is_empty() => stripped.to_string(),
                _ => dep,
            })
            .collect()
    }
}

/// Reorder arguments from the native convention to the foreign one
fn wrap_factory(factory: AmdFactory) -> ModuleFactory {
    Box::new(
        move |exports: &mut Exports, _module: &ModuleHandle, dependencies: &[Rc<Exports>]| {
            factory(&Require, exports, dependencies)
        },
    )
}
