//! Strand complementing
//!
//! [`complement`] holds the base-pairing map; [`processor`] drives it over a
//! whole line-oriented input and renders the output lines.

pub mod complement;
pub mod processor;

pub use complement::{complement_of, complement_strand};
pub use processor::{DEFAULT_INVALID_MARKER, FileReport, FileStatus, StrandOutcome, StrandProcessor};
