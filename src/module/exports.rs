//! Module exports record
//!
//! A string-keyed record built by a factory while it runs. Once the factory
//! returns, the registry wraps it in an `Rc` and dependents only ever see it
//! through a shared reference, so it is frozen from then on.

use std::any::Any;
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

/// Exports produced by a module factory
#[derive(Default, Clone)]
pub struct Exports {
    values: BTreeMap<String, Rc<dyn Any>>,
}

impl Exports {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a value under `key`, replacing any previous value
    pub fn set<T: Any>(&mut self, key: impl Into<String>, value: T) {
        self.values.insert(key.into(), Rc::new(value));
    }

    /// Store an already shared value under `key`
    pub fn set_shared(&mut self, key: impl Into<String>, value: Rc<dyn Any>) {
        self.values.insert(key.into(), value);
    }

    /// Borrow the value under `key` if it exists and has type `T`
    pub fn get<T: Any>(&self, key: &str) -> Option<&T> {
        self.values
            .get(key)
            .and_then(|value| (**value).downcast_ref::<T>())
    }

    /// Shared handle to the value under `key` if it exists and has type `T`
    pub fn get_shared<T: Any>(&self, key: &str) -> Option<Rc<T>> {
        self.values
            .get(key)
            .and_then(|value| Rc::clone(value).downcast::<T>().ok())
    }

    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    /// Export names in sorted order
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl fmt::Debug for Exports {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.values.keys()).finish()
    }
}
