//! # dnacomp - parallel DNA strand complementing
//!
//! Reads every file of a directory, treats each line as a DNA strand and
//! writes the complementary strand (A↔T, C↔G) to a matching output file.
//! Lines with any other symbol are copied with an invalid marker instead.
//!
//! ## Features
//!
//! - **One task per file**: files run concurrently on an elastic worker pool
//! - **Order preserving**: output line *i* always corresponds to input line *i*
//! - **Shared statistics**: total, valid and invalid strand counts plus the
//!   invalid line numbers, gathered without lost updates
//! - **Bounded shutdown**: graceful wait, then cooperative cancellation
//! - **Bulkheaded I/O**: one unreadable file never aborts the others
//!
//! ## Quick Start
//!
//! ```bash
//! # Complement ./arquivosDNA into ./arquivosDNAComplementary
//! dnacomp run
//!
//! # Explicit directories and a small pool
//! dnacomp run data/strands -o data/complements --max-threads 4
//! ```

pub mod cli;
pub mod config;
pub mod files;
pub mod logging;
pub mod parallel;
pub mod strand;

pub use cli::{Cli, Output};
pub use config::DnacompConfig;
