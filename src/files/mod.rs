//! Filesystem collaborators for the coordinator
//!
//! Inputs are named, line-oriented readers; outputs are sinks named after the
//! input they complement. The coordinator only sees the two traits, so tests
//! can feed it in-memory sources.

pub mod directory;
pub mod input;
pub mod output;

pub use directory::{InputFilter, list_inputs};
pub use input::{FileInput, InputSource};
pub use output::{DEFAULT_OUTPUT_PREFIX, OutputDirectory, OutputTarget};
