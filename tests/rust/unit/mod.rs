//! Unit tests - component behaviour exercised through the public API
//!
//! These tests need no database; they check the translator's building blocks in isolation.

mod constraint_extraction_tests;
mod type_lattice_tests;
