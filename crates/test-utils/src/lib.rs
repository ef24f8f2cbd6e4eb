//! Shared test utilities for the point-tiles workspace.
//!
//! Provides CSV source fixtures for builder tests and pre-built tile
//! trees for client tests.

pub mod fixtures;

pub use fixtures::*;
