//! Module manager: the registry and its fixed-point resolver
//!
//! Owns the loaded and pending module sets, the entry-point queue and the
//! runner blockers. Every registration triggers a sweep over the entry-point
//! queue; resolving an entry point recursively promotes whatever pending
//! modules it (transitively) needs.
//!
//! ## Re-entrancy
//!
//! Factories run with no registry borrow held, so they may register modules,
//! entry points and blockers. While a sweep is running, new entry points are
//! parked in a side buffer and any nested sweep request only marks the
//! running sweep for another pass. Passes repeat until one completes with
//! nothing new to look at.
//!
//! ## Failure semantics
//!
//! There is no cycle detection: members of a cycle stay pending forever. A
//! factory that returns an error leaves its module in the failed state,
//! which never satisfies dependents; the sweep carries on with everything
//! else.

use std::cell::RefCell;
use std::collections::{BTreeSet, HashMap, HashSet};
use std::rc::Rc;
use tracing::{debug, error, info, warn};

use crate::module::exports::Exports;
use crate::module::handle::{DelayState, ModuleHandle, UnitKind};
use crate::module::registry::definition::{Dependency, EntryPoint, ModuleDefinition, ModuleInstance};
use crate::module::registry::dependencies::{DependencyReport, NameLookup};
use crate::module::registry::manifest::ModuleManifest;
use crate::module::traits::{ModuleFactory, ModuleState};

/// Registry state shared between the manager and module handles
#[derive(Default)]
pub struct RegistryState {
    /// Loaded modules (name -> instance)
    loaded: HashMap<String, ModuleInstance>,
    /// Names in the order they became loaded
    load_order: Vec<String>,
    /// Pending definitions (name -> definition)
    unloaded: HashMap<String, ModuleDefinition>,
    /// Modules whose factory is currently running
    instantiating: HashSet<String>,
    /// Instances waiting on a delayed completion signal
    delayed: HashMap<String, ModuleInstance>,
    /// Modules whose factory failed (name -> reason)
    failed: HashMap<String, String>,
    /// Entry points waiting to run
    runners: Vec<EntryPoint>,
    /// Entry points registered while a sweep is running
    incoming_runners: Vec<EntryPoint>,
    /// Runner blocker tokens
    blockers: BTreeSet<String>,
    sweeping: bool,
    sweep_requested: bool,
}

impl RegistryState {
    fn is_known(&self, name: &str) -> bool {
        self.loaded.contains_key(name)
            || self.unloaded.contains_key(name)
            || self.instantiating.contains(name)
            || self.delayed.contains_key(name)
            || self.failed.contains_key(name)
    }

    /// First writer wins
    fn set_module_loaded(&mut self, instance: ModuleInstance) -> bool {
        if self.loaded.contains_key(instance.name()) {
            return false;
        }
        let name = instance.name().to_string();
        self.load_order.push(name.clone());
        self.loaded.insert(name, instance);
        true
    }

    fn origin_of(&self, name: &str) -> Option<&str> {
        if let Some(definition) = self.unloaded.get(name) {
            return definition.origin.as_deref();
        }
        self.loaded
            .get(name)
            .or_else(|| self.delayed.get(name))
            .and_then(|instance| instance.definition.origin.as_deref())
    }

    fn lookup(&self, name: &str) -> NameLookup<'_> {
        if self.loaded.contains_key(name) {
            NameLookup::Loaded
        } else if let Some(def) = self.unloaded.get(name) {
            NameLookup::Pending(&def.dependencies)
        } else if self.delayed.contains_key(name) {
            NameLookup::Delayed
        } else if self.instantiating.contains(name) {
            NameLookup::Instantiating
        } else if let Some(reason) = self.failed.get(name) {
            NameLookup::Failed(reason)
        } else {
            NameLookup::Unknown
        }
    }
}

/// Module manager coordinates module registration and resolution
///
/// Cloning yields another handle to the same registry.
#[derive(Clone, Default)]
pub struct ModuleManager {
    state: Rc<RefCell<RegistryState>>,
}

impl ModuleManager {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn from_state(state: Rc<RefCell<RegistryState>>) -> Self {
        Self { state }
    }

    /// Register a module and sweep
    ///
    /// Returns `false` (and changes nothing) if the name was already
    /// registered, whatever state that module is in.
    pub fn define_module(&self, definition: ModuleDefinition) -> bool {
        {
            let mut state = self.state.borrow_mut();
            if state.is_known(&definition.name) {
                let existing = state.origin_of(&definition.name);
                match (existing, definition.origin.as_deref()) {
                    (Some(first), Some(second)) if first != second => warn!(
                        "Module {} from {} ignored, already defined by {}",
                        definition.name, second, first
                    ),
                    _ => debug!("Module {} already defined, ignoring", definition.name),
                }
                return false;
            }
            debug!(
                "Defining module {} ({} dependencies)",
                definition.name,
                definition.dependencies.len()
            );
            state.unloaded.insert(definition.name.clone(), definition);
        }
        self.load_runners();
        true
    }

    /// Queue an entry point and sweep
    pub fn run_entry_point(&self, runner: EntryPoint) {
        {
            let mut state = self.state.borrow_mut();
            debug!("Adding runner {}", runner.label);
            if state.sweeping {
                state.incoming_runners.push(runner);
            } else {
                state.runners.push(runner);
            }
        }
        self.load_runners();
    }

    pub fn add_runner_blocker(&self, token: impl Into<String>) {
        let token = token.into();
        debug!("Adding runner blocker {}", token);
        self.state.borrow_mut().blockers.insert(token);
    }

    /// Remove a blocker token
    ///
    /// Returns `true` if this removal cleared the last blocker, in which case
    /// the queued entry points are swept immediately.
    pub fn remove_runner_blocker(&self, token: &str) -> bool {
        let cleared = {
            let mut state = self.state.borrow_mut();
            state.blockers.remove(token) && state.blockers.is_empty()
        };
        if cleared {
            debug!("Last runner blocker {} removed", token);
            self.load_runners();
        }
        cleared
    }

    pub fn is_runner_blocked(&self) -> bool {
        !self.state.borrow().blockers.is_empty()
    }

    pub fn runner_blockers(&self) -> Vec<String> {
        self.state.borrow().blockers.iter().cloned().collect()
    }

    pub fn is_loaded(&self, name: &str) -> bool {
        self.state.borrow().loaded.contains_key(name)
    }

    pub fn is_pending(&self, name: &str) -> bool {
        self.state.borrow().unloaded.contains_key(name)
    }

    pub fn is_delayed(&self, name: &str) -> bool {
        self.state.borrow().delayed.contains_key(name)
    }

    /// Whether the name was ever registered
    pub fn is_known(&self, name: &str) -> bool {
        self.state.borrow().is_known(name)
    }

    pub fn module_state(&self, name: &str) -> ModuleState {
        match self.state.borrow().lookup(name) {
            NameLookup::Loaded => ModuleState::Loaded,
            NameLookup::Pending(_) => ModuleState::Pending,
            NameLookup::Delayed => ModuleState::Delayed,
            NameLookup::Instantiating => ModuleState::Instantiating,
            NameLookup::Failed(reason) => ModuleState::Failed(reason.to_string()),
            NameLookup::Unknown => ModuleState::Unknown,
        }
    }

    /// Exports of a loaded module
    pub fn exports(&self, name: &str) -> Option<Rc<Exports>> {
        self.state
            .borrow()
            .loaded
            .get(name)
            .map(|instance| Rc::clone(&instance.exports))
    }

    pub fn instance(&self, name: &str) -> Option<ModuleInstance> {
        self.state.borrow().loaded.get(name).cloned()
    }

    /// Loaded module names in load order
    pub fn loaded_modules(&self) -> Vec<String> {
        self.state.borrow().load_order.clone()
    }

    pub fn pending_modules(&self) -> Vec<String> {
        sorted_keys(self.state.borrow().unloaded.keys())
    }

    pub fn delayed_modules(&self) -> Vec<String> {
        sorted_keys(self.state.borrow().delayed.keys())
    }

    pub fn failed_modules(&self) -> Vec<String> {
        sorted_keys(self.state.borrow().failed.keys())
    }

    /// Labels of queued entry points, including ones parked mid-sweep
    pub fn waiting_runners(&self) -> Vec<String> {
        let state = self.state.borrow();
        state
            .runners
            .iter()
            .chain(state.incoming_runners.iter())
            .map(|runner| runner.label.clone())
            .collect()
    }

    /// Snapshot of every waiting entry point and what it waits on
    ///
    /// Includes entry points parked mid-sweep, like [`Self::waiting_runners`].
    pub fn report(&self) -> DependencyReport {
        let state = self.state.borrow();
        let blockers = state.blockers.iter().cloned().collect();
        DependencyReport::build(
            state.runners.iter().chain(state.incoming_runners.iter()),
            blockers,
            |name| state.lookup(name),
        )
    }

    /// Freeze loaded modules, in load order, into a manifest
    ///
    /// Modules whose origin is listed in `exclude` are left out.
    pub fn freeze(&self, exclude: &[String]) -> ModuleManifest {
        let state = self.state.borrow();
        let modules = state
            .load_order
            .iter()
            .filter_map(|name| state.loaded.get(name))
            .map(|instance| instance.definition.clone())
            .filter(|declaration| match &declaration.origin {
                Some(origin) => !exclude.contains(origin),
                None => true,
            })
            .collect();

        ModuleManifest {
            modules,
            runners: Vec::new(),
        }
    }

    /// Sweep the entry-point queue until nothing more can run
    pub fn load_runners(&self) {
        {
            let mut state = self.state.borrow_mut();
            if state.sweeping {
                state.sweep_requested = true;
                return;
            }
            state.sweeping = true;
        }

        loop {
            let runners = {
                let mut state = self.state.borrow_mut();
                state.sweep_requested = false;
                let incoming = std::mem::take(&mut state.incoming_runners);
                state.runners.extend(incoming);
                if !state.blockers.is_empty() {
                    debug!(
                        "Runners blocked by {:?}, {} waiting",
                        state.blockers,
                        state.runners.len()
                    );
                    state.sweeping = false;
                    return;
                }
                std::mem::take(&mut state.runners)
            };

            let mut waiting = Vec::with_capacity(runners.len());
            for runner in runners {
                if self.is_runner_blocked() {
                    waiting.push(runner);
                    continue;
                }
                if let Some(runner) = self.check_runner(runner) {
                    waiting.push(runner);
                }
            }

            let again = {
                let mut state = self.state.borrow_mut();
                let added = std::mem::take(&mut state.runners);
                waiting.extend(added);
                state.runners = waiting;
                let again = state.sweep_requested || !state.incoming_runners.is_empty();
                if !again {
                    state.sweeping = false;
                }
                again
            };
            if !again {
                break;
            }
        }
    }

    /// Promote a delayed module to loaded and sweep
    pub(crate) fn complete_delayed(&self, name: &str) -> bool {
        let promoted = {
            let mut state = self.state.borrow_mut();
            match state.delayed.remove(name) {
                Some(instance) => state.set_module_loaded(instance),
                None => false,
            }
        };
        if promoted {
            info!("Delayed module {} loaded", name);
            self.load_runners();
        }
        promoted
    }

    /// Run an entry point if its dependencies resolve; hand it back otherwise
    fn check_runner(&self, mut runner: EntryPoint) -> Option<EntryPoint> {
        let mut visiting = HashSet::new();
        if !self.resolve_dependencies(&mut runner.dependencies, &mut visiting) {
            return Some(runner);
        }
        // A factory run while resolving may have added a blocker
        if self.is_runner_blocked() {
            debug!("Runner {} ready but blocked", runner.label);
            return Some(runner);
        }

        let EntryPoint {
            label,
            dependencies,
            factory,
        } = runner;
        debug!("Running runner {}", label);
        if let Err(reason) = self.invoke(&label, UnitKind::EntryPoint, &dependencies, factory) {
            error!("Runner {} failed: {}", label, reason);
        }
        None
    }

    /// Try to satisfy every dependency, loading pending ones on the way
    ///
    /// Every dependency is attempted even after one fails, so a single
    /// registration can cascade through several stalled branches.
    fn resolve_dependencies(&self, deps: &mut [Dependency], visiting: &mut HashSet<String>) -> bool {
        let mut ready = true;
        for dep in deps.iter_mut() {
            dep.loaded = self.is_loaded(&dep.name);
            if !dep.loaded && self.is_pending(&dep.name) && !visiting.contains(&dep.name) {
                dep.loaded = self.load_module(&dep.name, visiting);
            }
            ready = ready && dep.loaded;
        }
        ready
    }

    /// Instantiate a pending module if its dependencies resolve
    fn load_module(&self, name: &str, visiting: &mut HashSet<String>) -> bool {
        let mut deps = match self.state.borrow().unloaded.get(name) {
            Some(definition) => definition.dependencies.clone(),
            None => return self.is_loaded(name),
        };

        visiting.insert(name.to_string());
        let ready = self.resolve_dependencies(&mut deps, visiting);
        visiting.remove(name);

        let definition = {
            let mut state = self.state.borrow_mut();
            if !ready {
                if let Some(definition) = state.unloaded.get_mut(name) {
                    definition.dependencies = deps;
                }
                return false;
            }
            match state.unloaded.remove(name) {
                Some(mut definition) => {
                    definition.dependencies = deps;
                    state.instantiating.insert(name.to_string());
                    definition
                }
                None => return state.loaded.contains_key(name),
            }
        };

        self.instantiate(definition);
        self.is_loaded(name)
    }

    fn instantiate(&self, definition: ModuleDefinition) {
        let declaration = definition.declaration();
        let ModuleDefinition {
            name,
            dependencies,
            factory,
            ..
        } = definition;

        let handle = ModuleHandle::new(&name, UnitKind::Module, Rc::downgrade(&self.state));
        let mut exports = Exports::new();
        let outcome = self.invoke_with(&handle, &mut exports, &dependencies, factory);

        let mut state = self.state.borrow_mut();
        state.instantiating.remove(&name);
        match outcome {
            Err(reason) => {
                error!("Module {} failed to load: {}", name, reason);
                state.failed.insert(name, reason);
            }
            Ok(()) => {
                let instance = ModuleInstance {
                    definition: declaration,
                    exports: Rc::new(exports),
                    loading_delayed: handle.delay_state() != DelayState::Immediate,
                };
                if handle.delay_state() == DelayState::Delayed {
                    debug!("Module {} delayed its loading", name);
                    state.delayed.insert(name, instance);
                } else if state.set_module_loaded(instance) {
                    info!("Module {} loaded", name);
                } else {
                    warn!("Module {} was already loaded, discarding new instance", name);
                }
            }
        }
    }

    fn invoke(
        &self,
        name: &str,
        kind: UnitKind,
        dependencies: &[Dependency],
        factory: ModuleFactory,
    ) -> Result<(), String> {
        let handle = ModuleHandle::new(name, kind, Rc::downgrade(&self.state));
        let mut exports = Exports::new();
        self.invoke_with(&handle, &mut exports, dependencies, factory)
    }

    /// Call a factory with its dependencies' exports, in declared order
    ///
    /// No registry borrow is held while the factory runs.
    fn invoke_with(
        &self,
        handle: &ModuleHandle,
        exports: &mut Exports,
        dependencies: &[Dependency],
        factory: ModuleFactory,
    ) -> Result<(), String> {
        let injected = {
            let state = self.state.borrow();
            dependencies
                .iter()
                .map(|dep| state.loaded.get(&dep.name).map(|i| Rc::clone(&i.exports)))
                .collect::<Option<Vec<_>>>()
        };
        let injected = injected.ok_or_else(|| {
            format!("dependency of {} vanished before instantiation", handle.name())
        })?;

        factory(exports, handle, &injected).map_err(|e| format!("{:#}", e))
    }
}

fn sorted_keys<'a>(keys: impl Iterator<Item = &'a String>) -> Vec<String> {
    let mut names: Vec<String> = keys.cloned().collect();
    names.sort();
    names
}
