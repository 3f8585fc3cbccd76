//! Loader façade
//!
//! Public entry surface over the module manager: native and foreign
//! registration, entry points, runner blockers and diagnostics.

use std::rc::Rc;
use tracing::{debug, info};

use crate::config::LoaderConfig;
use crate::module::exports::Exports;
use crate::module::handle::ModuleHandle;
use crate::module::loader::amd::{AmdAdapter, AmdFactory};
use crate::module::manager::ModuleManager;
use crate::module::registry::definition::{EntryPoint, ModuleDefinition};
use crate::module::registry::dependencies::DependencyReport;
use crate::module::registry::manifest::ModuleManifest;
use crate::module::traits::{ModuleError, ModuleState};
use crate::module::triggers::TriggerScanner;

const RUNNER_LABEL: &str = "Runner";

/// Loader for registering and running modules
///
/// Cloning yields another handle onto the same registry.
#[derive(Clone)]
pub struct Loader {
    manager: ModuleManager,
    amd: AmdAdapter,
    triggers: Rc<TriggerScanner>,
}

impl Default for Loader {
    fn default() -> Self {
        Self::new()
    }
}

impl Loader {
    /// Create a loader with default configuration
    pub fn new() -> Self {
        Self {
            manager: ModuleManager::new(),
            amd: AmdAdapter::default(),
            triggers: Rc::new(TriggerScanner::default()),
        }
    }

    /// Create a loader from configuration
    ///
    /// Configured runner blockers are installed before anything can run.
    pub fn with_config(config: &LoaderConfig) -> Result<Self, ModuleError> {
        config
            .validate()
            .map_err(|e| ModuleError::InvalidConfig(e.to_string()))?;

        let loader = Self {
            manager: ModuleManager::new(),
            amd: AmdAdapter::new(&config.adapter),
            triggers: Rc::new(TriggerScanner::from_config(&config.triggers)?),
        };
        for blocker in &config.runner_blockers {
            loader.manager.add_runner_blocker(blocker.as_str());
        }
        Ok(loader)
    }

    /// Underlying registry
    pub fn manager(&self) -> &ModuleManager {
        &self.manager
    }

    /// Define a module with a native factory
    pub fn define<I, S, F>(&self, name: &str, dependencies: I, factory: F)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
        F: FnOnce(&mut Exports, &ModuleHandle, &[Rc<Exports>]) -> anyhow::Result<()> + 'static,
    {
        self.define_module(ModuleDefinition::new(name, dependencies, factory));
    }

    /// Define a prepared module definition
    ///
    /// Returns `false` if the name was already registered.
    pub fn define_module(&self, definition: ModuleDefinition) -> bool {
        self.manager.define_module(definition)
    }

    /// Define a module through the foreign declaration convention
    ///
    /// Discovery is skipped entirely if `name` is already registered.
    pub fn amd<D>(&self, name: &str, discover: D) -> Result<(), ModuleError>
    where
        D: FnOnce(&mut dyn FnMut(Vec<String>, AmdFactory)),
    {
        if self.manager.is_known(name) {
            debug!("Module {} already defined, skipping discovery", name);
            return Ok(());
        }
        let declaration = self.amd.discover(discover)?;
        self.manager.define_module(ModuleDefinition::from_boxed(
            name,
            declaration.dependencies,
            declaration.factory,
        ));
        Ok(())
    }

    /// Queue an entry point with a native factory
    pub fn run<I, S, F>(&self, dependencies: I, factory: F)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
        F: FnOnce(&mut Exports, &ModuleHandle, &[Rc<Exports>]) -> anyhow::Result<()> + 'static,
    {
        self.manager
            .run_entry_point(EntryPoint::new(RUNNER_LABEL, dependencies, factory));
    }

    /// Queue an entry point declared through the foreign convention
    pub fn run_amd<D>(&self, discover: D) -> Result<(), ModuleError>
    where
        D: FnOnce(&mut dyn FnMut(Vec<String>, AmdFactory)),
    {
        let declaration = self.amd.discover(discover)?;
        self.manager.run_entry_point(EntryPoint::from_boxed(
            RUNNER_LABEL,
            declaration.dependencies,
            declaration.factory,
        ));
        Ok(())
    }

    /// Load `name` without using its exports
    pub fn run_named(&self, name: &str) {
        self.manager
            .run_entry_point(EntryPoint::new(name, [name], |_, _, _| Ok(())));
    }

    /// Run every entry point named by trigger attributes in `markup`
    ///
    /// Returns the names found, in document order.
    pub fn run_triggers(&self, markup: &str) -> Vec<String> {
        let names = self.triggers.scan(markup);
        info!(
            "Found {} {} triggers",
            names.len(),
            self.triggers.attribute()
        );
        for name in &names {
            self.run_named(name);
        }
        names
    }

    pub fn add_runner_blocker(&self, token: &str) {
        self.manager.add_runner_blocker(token);
    }

    /// Returns `true` if this cleared the last blocker (queued runners then run)
    pub fn remove_runner_blocker(&self, token: &str) -> bool {
        self.manager.remove_runner_blocker(token)
    }

    pub fn is_loaded(&self, name: &str) -> bool {
        self.manager.is_loaded(name)
    }

    pub fn is_pending(&self, name: &str) -> bool {
        self.manager.is_pending(name)
    }

    pub fn is_known(&self, name: &str) -> bool {
        self.manager.is_known(name)
    }

    pub fn exports(&self, name: &str) -> Option<Rc<Exports>> {
        self.manager.exports(name)
    }

    /// Exports of a loaded module, or why they are not available
    pub fn try_exports(&self, name: &str) -> Result<Rc<Exports>, ModuleError> {
        match self.manager.module_state(name) {
            ModuleState::Loaded => self
                .manager
                .exports(name)
                .ok_or_else(|| ModuleError::ModuleNotFound(name.to_string())),
            ModuleState::Failed(reason) => {
                Err(ModuleError::FactoryFailed(format!("{}: {}", name, reason)))
            }
            state if state.is_resolvable() => Err(ModuleError::OperationError(format!(
                "Module {} is not loaded yet ({:?})",
                name, state
            ))),
            _ => Err(ModuleError::ModuleNotFound(name.to_string())),
        }
    }

    pub fn loaded_modules(&self) -> Vec<String> {
        self.manager.loaded_modules()
    }

    pub fn pending_modules(&self) -> Vec<String> {
        self.manager.pending_modules()
    }

    /// Structured report of waiting runners
    pub fn debug(&self) -> DependencyReport {
        self.manager.report()
    }

    /// Human-readable report of waiting runners, also logged at debug level
    pub fn debug_dump(&self) -> String {
        let dump = self.debug().to_string();
        debug!("Loader state:\n{}", dump);
        dump
    }

    /// Freeze loaded modules into a manifest, skipping excluded origins
    pub fn freeze(&self, exclude: &[String]) -> ModuleManifest {
        self.manager.freeze(exclude)
    }
}
