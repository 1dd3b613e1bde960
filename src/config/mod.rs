//! # structstore Configuration Module
//!
//! This module centralizes the layout and growth constants. Constants that
//! depend on each other are co-located and their relationships are enforced
//! with compile-time assertions.
//!
//! ## Module Organization
//!
//! - [`constants`]: All numeric configuration values with dependency documentation

pub mod constants;
pub use constants::*;
