//! Integration tests - whole queries through translation and rendering
//!
//! These tests verify that pattern lowering, constraint placement and projection work together
//! on complete query documents.

mod common;

mod config_tests;
mod expansion_tests;
mod translation_tests;
mod update_tests;
