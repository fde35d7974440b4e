//! Common test utilities and helpers.
//!
//! This module provides shared functionality for all tests, including:
//! - Test fixtures and builders
//! - Custom assertions

#![allow(dead_code)]

pub mod assertions;
pub mod fixtures;

pub use assertions::*;
pub use fixtures::*;
