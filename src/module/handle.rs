//! Module-control handle passed to every factory

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};
use tracing::debug;

use crate::module::manager::{ModuleManager, RegistryState};

/// Delayed-loading progress of a single instantiation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DelayState {
    /// Loaded as soon as the factory returns
    Immediate,
    /// Parked until [`ModuleHandle::loaded`] is called
    Delayed,
    /// Delay requested and already completed
    Completed,
}

/// What kind of unit the handle was created for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitKind {
    Module,
    EntryPoint,
}

/// Control handle for one module instantiation
///
/// Cloning is cheap and the handle is `'static`, so a factory can stash it
/// in whatever completes the module later.
#[derive(Clone)]
pub struct ModuleHandle {
    name: Rc<str>,
    kind: UnitKind,
    delay: Rc<Cell<DelayState>>,
    registry: Weak<RefCell<RegistryState>>,
}

impl ModuleHandle {
    pub(crate) fn new(name: &str, kind: UnitKind, registry: Weak<RefCell<RegistryState>>) -> Self {
        Self {
            name: Rc::from(name),
            kind,
            delay: Rc::new(Cell::new(DelayState::Immediate)),
            registry,
        }
    }

    /// Module name, or the label of an entry point
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> UnitKind {
        self.kind
    }

    pub fn delay_state(&self) -> DelayState {
        self.delay.get()
    }

    pub fn is_loading_delayed(&self) -> bool {
        self.delay.get() == DelayState::Delayed
    }

    /// Keep the module out of the loaded set after its factory returns
    ///
    /// Has no effect on entry points, whose exports are discarded anyway.
    pub fn delay_loading(&self) {
        if self.kind == UnitKind::EntryPoint {
            debug!("Ignoring delayed loading request from entry point {}", self.name);
            return;
        }
        if self.delay.get() == DelayState::Immediate {
            self.delay.set(DelayState::Delayed);
        }
    }

    /// Signal that a delayed module is ready
    ///
    /// Promotes the instance to loaded and sweeps pending entry points. When
    /// called before the factory returns, the module loads as soon as it does.
    pub fn loaded(&self) {
        if self.delay.get() != DelayState::Delayed {
            return;
        }
        self.delay.set(DelayState::Completed);
        if let Some(manager) = self.manager() {
            manager.complete_delayed(&self.name);
        }
    }

    /// Registry this handle belongs to, if it is still alive
    ///
    /// Lets a factory register further modules or entry points while loading.
    pub fn manager(&self) -> Option<ModuleManager> {
        self.registry.upgrade().map(ModuleManager::from_state)
    }
}

impl fmt::Debug for ModuleHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModuleHandle")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("delay", &self.delay.get())
            .finish()
    }
}
