//! Module manifests
//!
//! A manifest is the frozen, serialisable shape of a module graph: one
//! declaration per module in load order plus any entry points. It is what
//! packaging tools write out and what `graph-check` reads back.

use crate::module::traits::ModuleError;
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use std::path::Path;

/// Declaration of a single module (name, dependencies, origin)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleDeclaration {
    /// Module name
    pub name: String,
    /// Dependency names in injection order
    #[serde(default)]
    pub dependencies: Vec<String>,
    /// Where the module's code came from
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub origin: Option<String>,
}

/// Declaration of an entry point
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunnerDeclaration {
    /// Label shown in diagnostics
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default)]
    pub dependencies: Vec<String>,
}

/// Module manifest (TOML)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleManifest {
    #[serde(default)]
    pub modules: Vec<ModuleDeclaration>,
    #[serde(default)]
    pub runners: Vec<RunnerDeclaration>,
}

impl ModuleManifest {
    /// Load manifest from file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ModuleError> {
        let contents = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            ModuleError::InvalidManifest(format!("Failed to read manifest file: {}", e))
        })?;
        Self::from_toml_str(&contents)
    }

    pub fn from_toml_str(contents: &str) -> Result<Self, ModuleError> {
        let manifest: ModuleManifest = toml::from_str(contents).map_err(|e| {
            ModuleError::InvalidManifest(format!("Failed to parse manifest TOML: {}", e))
        })?;

        if let Some(module) = manifest.modules.iter().find(|m| m.name.is_empty()) {
            return Err(ModuleError::InvalidManifest(format!(
                "Module name cannot be empty (dependencies: {:?})",
                module.dependencies
            )));
        }

        Ok(manifest)
    }

    pub fn to_toml_string(&self) -> Result<String, ModuleError> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), ModuleError> {
        let contents = self.to_toml_string()?;
        std::fs::write(path.as_ref(), contents).map_err(|e| {
            ModuleError::OperationError(format!("Failed to write manifest file: {}", e))
        })
    }

    /// Re-serialise every module as a declaration call, one per line
    pub fn render_declarations(&self) -> String {
        let mut out = String::new();
        for module in &self.modules {
            let deps = module
                .dependencies
                .iter()
                .map(|d| format!("{:?}", d))
                .collect::<Vec<_>>()
                .join(", ");
            let _ = write!(out, "define({:?}, [{}]);", module.name, deps);
            if let Some(origin) = &module.origin {
                let _ = write!(out, " // {}", origin);
            }
            out.push('\n');
        }
        out
    }
}
