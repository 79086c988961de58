//! Foundation types for the Koma shell.
//!
//! Shared by every Koma crate: the error taxonomy, the exit-code
//! convention, and the TOML shell configuration.

pub mod config;
pub mod error;
pub mod exit;
