pub mod registry_invariants_tests;
