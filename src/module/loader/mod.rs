//! Loader façade and foreign declaration adapter

pub mod amd;
pub mod loader;

pub use amd::{AmdAdapter, AmdDeclaration, AmdFactory, Require};
pub use loader::Loader;
