//! Unresolved dependency reporting
//!
//! Walks every waiting entry point and lists, recursively, each dependency
//! that is not loaded yet together with the reason it is stuck.

use serde::Serialize;
use std::collections::HashSet;
use std::fmt;

use crate::module::registry::definition::{Dependency, EntryPoint};

/// Why a dependency has not loaded
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "reason", rename_all = "snake_case")]
pub enum DependencyStatus {
    /// Registered, waiting on its own dependencies
    Pending,
    /// Never registered
    Unknown,
    /// Factory ran and requested delayed loading
    Delayed,
    /// Factory is running right now
    Instantiating,
    /// Factory returned an error
    Failed(String),
    /// Already being reported further up this branch
    Circular,
}

/// A dependency that is not loaded, with its own unresolved dependencies
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnresolvedDependency {
    pub name: String,
    #[serde(flatten)]
    pub status: DependencyStatus,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub waiting_on: Vec<UnresolvedDependency>,
}

/// An entry point still in the queue
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WaitingRunner {
    pub label: String,
    pub unresolved: Vec<UnresolvedDependency>,
}

/// Snapshot of everything still waiting
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DependencyReport {
    pub waiting: Vec<WaitingRunner>,
    pub blockers: Vec<String>,
}

/// How the registry currently sees a name
pub(crate) enum NameLookup<'a> {
    Loaded,
    Pending(&'a [Dependency]),
    Delayed,
    Instantiating,
    Failed(&'a str),
    Unknown,
}

impl DependencyReport {
    pub(crate) fn build<'a, 'r, R, L>(runners: R, blockers: Vec<String>, lookup: L) -> Self
    where
        R: IntoIterator<Item = &'r EntryPoint>,
        L: Fn(&str) -> NameLookup<'a>,
    {
        let waiting = runners
            .into_iter()
            .map(|runner| {
                let mut path = HashSet::new();
                WaitingRunner {
                    label: runner.label.clone(),
                    unresolved: unresolved_of(&runner.dependencies, &lookup, &mut path),
                }
            })
            .collect();

        Self { waiting, blockers }
    }

    pub fn is_settled(&self) -> bool {
        self.waiting.is_empty()
    }

    /// Every distinct name reported as never registered
    pub fn unknown_names(&self) -> Vec<&str> {
        let mut names = Vec::new();
        for runner in &self.waiting {
            collect_unknown(&runner.unresolved, &mut names);
        }
        names
    }
}

fn unresolved_of<'a, L>(
    dependencies: &[Dependency],
    lookup: &L,
    path: &mut HashSet<String>,
) -> Vec<UnresolvedDependency>
where
    L: Fn(&str) -> NameLookup<'a>,
{
    dependencies
        .iter()
        .filter_map(|dep| describe(&dep.name, lookup, path))
        .collect()
}

fn describe<'a, L>(name: &str, lookup: &L, path: &mut HashSet<String>) -> Option<UnresolvedDependency>
where
    L: Fn(&str) -> NameLookup<'a>,
{
    let (status, waiting_on) = match lookup(name) {
        NameLookup::Loaded => return None,
        NameLookup::Pending(_) if path.contains(name) => (DependencyStatus::Circular, Vec::new()),
        NameLookup::Pending(deps) => {
            path.insert(name.to_string());
            let nested = unresolved_of(deps, lookup, path);
            path.remove(name);
            (DependencyStatus::Pending, nested)
        }
        NameLookup::Delayed => (DependencyStatus::Delayed, Vec::new()),
        NameLookup::Instantiating => (DependencyStatus::Instantiating, Vec::new()),
        NameLookup::Failed(reason) => (DependencyStatus::Failed(reason.to_string()), Vec::new()),
        NameLookup::Unknown => (DependencyStatus::Unknown, Vec::new()),
    };

    Some(UnresolvedDependency {
        name: name.to_string(),
        status,
        waiting_on,
    })
}

fn collect_unknown<'r>(deps: &'r [UnresolvedDependency], names: &mut Vec<&'r str>) {
    for dep in deps {
        if dep.status == DependencyStatus::Unknown && !names.contains(&dep.name.as_str()) {
            names.push(&dep.name);
        }
        collect_unknown(&dep.waiting_on, names);
    }
}

fn write_dependency(
    f: &mut fmt::Formatter<'_>,
    dep: &UnresolvedDependency,
    indent: usize,
) -> fmt::Result {
    let pad = " ".repeat(indent);
    match &dep.status {
        DependencyStatus::Pending => writeln!(f, "{}{}", pad, dep.name)?,
        DependencyStatus::Unknown => writeln!(f, "{}{} module not yet loaded.", pad, dep.name)?,
        DependencyStatus::Delayed => {
            writeln!(f, "{}{} module waiting on delayed completion.", pad, dep.name)?
        }
        DependencyStatus::Instantiating => {
            writeln!(f, "{}{} module is instantiating.", pad, dep.name)?
        }
        DependencyStatus::Failed(reason) => {
            writeln!(f, "{}{} module failed to load: {}", pad, dep.name, reason)?
        }
        DependencyStatus::Circular => writeln!(f, "{}{} circular dependency.", pad, dep.name)?,
    }
    for nested in &dep.waiting_on {
        write_dependency(f, nested, indent + 4)?;
    }
    Ok(())
}

impl fmt::Display for DependencyReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.waiting.is_empty() {
            writeln!(f, "No runners remaining.")?;
        }
        for runner in &self.waiting {
            writeln!(f, "Runner waiting {}", runner.label)?;
            for dep in &runner.unresolved {
                write_dependency(f, dep, 1)?;
            }
        }
        if !self.blockers.is_empty() {
            writeln!(f, "Runners blocked by: {}", self.blockers.join(", "))?;
        }
        Ok(())
    }
}
