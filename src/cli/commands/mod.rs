//! Command implementations for the dnacomp CLI
//!
//! Each command is organized into its own module.

pub mod config;
pub mod run;
