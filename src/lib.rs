//! Deferred Loader - minimal in-process module loader
//!
//! Independently compiled units register themselves by name and dependency
//! list; the loader instantiates each module exactly once, in dependency
//! order, when an entry point needs it. No build-time bundler has to
//! sequence them.
//!
//! ## Design Principles
//!
//! 1. **Explicit registry**: a [`Loader`] value is created once and passed
//!    around; there is no ambient global instance
//! 2. **At-most-once**: a module's factory runs at most once, first
//!    registration wins
//! 3. **Silent stalls**: unknown or cyclic dependencies leave units pending;
//!    [`Loader::debug_dump`] explains why
//! 4. **Single-threaded**: all state changes happen synchronously inside the
//!    call that triggered them
//!
//! ```rust
//! use deferred_loader::Loader;
//!
//! let loader = Loader::new();
//! loader.define("A", Vec::<String>::new(), |exports, _, _| {
//!     exports.set("value", 1u32);
//!     Ok(())
//! });
//! loader.define("B", ["A"], |exports, _, deps| {
//!     let a = deps[0].get::<u32>("value").copied().unwrap_or_default();
//!     exports.set("value", a + 1);
//!     Ok(())
//! });
//! loader.run(["B"], |_, _, deps| {
//!     assert_eq!(deps[0].get::<u32>("value"), Some(&2));
//!     Ok(())
//! });
//! assert_eq!(loader.loaded_modules(), vec!["A", "B"]);
//! ```

pub mod config;
pub mod module;
pub mod utils;

pub use config::{AdapterConfig, LoaderConfig, LoggingConfig, TriggerConfig};
pub use module::{
    DependencyReport, EntryPoint, Exports, Loader, ModuleDefinition, ModuleError, ModuleHandle,
    ModuleManager, ModuleManifest, ModuleState,
};
