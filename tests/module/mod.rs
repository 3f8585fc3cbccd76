//! Module system tests
//!
//! Tests for registration, resolution order, delayed loading, runner
//! blockers, the foreign declaration adapter and freezing.

pub mod test_utils;
pub mod amd_tests;
pub mod freeze_tests;
