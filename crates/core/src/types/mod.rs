//! Core types for Greenmarket.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod id;
pub mod money;
pub mod status;

pub use id::*;
pub use money::format_minor_units;
pub use status::*;
