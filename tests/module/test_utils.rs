//! Test utilities for module system testing
//!
//! Provides a fixture that records factory calls so tests can assert on
//! instantiation order and counts.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use deferred_loader::{Exports, Loader};

/// Loader plus a shared log of every factory invocation
pub struct LoaderFixture {
    pub loader: Loader,
    pub calls: Rc<RefCell<Vec<String>>>,
}

impl LoaderFixture {
    pub fn new() -> Self {
        Self {
            loader: Loader::new(),
            calls: Rc::new(RefCell::new(Vec::new())),
        }
    }

    /// Define a module exporting `value` = 1 + sum of its dependencies' values
    pub fn define_counting(&self, name: &str, deps: &[&str]) {
        let calls = Rc::clone(&self.calls);
        let label = name.to_string();
        self.loader
            .define(name, deps.iter().copied(), move |exports, _, injected| {
                calls.borrow_mut().push(label);
                exports.set("value", 1 + sum_values(injected));
                Ok(())
            });
    }

    /// Queue an entry point that records its label when it runs
    pub fn run_recording(&self, label: &str, deps: &[&str]) {
        let calls = Rc::clone(&self.calls);
        let label = label.to_string();
        self.loader.run(deps.iter().copied(), move |_, _, _| {
            calls.borrow_mut().push(label);
            Ok(())
        });
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.borrow().clone()
    }

    /// How many times each name was invoked
    pub fn call_counts(&self) -> HashMap<String, usize> {
        let mut counts = HashMap::new();
        for name in self.calls.borrow().iter() {
            *counts.entry(name.clone()).or_insert(0) += 1;
        }
        counts
    }

    pub fn value_of(&self, name: &str) -> Option<u32> {
        self.loader
            .exports(name)
            .and_then(|exports| exports.get::<u32>("value").copied())
    }
}

pub fn sum_values(injected: &[Rc<Exports>]) -> u32 {
    injected
        .iter()
        .filter_map(|exports| exports.get::<u32>("value").copied())
        .sum()
}
