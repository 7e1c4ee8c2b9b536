//! Concurrent task execution
//!
//! This module runs one strand-processing task per input file and collects
//! the statistics those tasks produce.
//!
//! # Architecture Responsibilities
//!
//! ## What This Module Does:
//! - **Worker Management**: An elastic pool of OS threads fed by a crossbeam channel,
//!   growing with demand and retiring idle workers
//! - **Shutdown**: Graceful wait, then cooperative cancellation, then a second bounded wait
//! - **Shared Statistics**: Atomic counters plus a mutex-guarded invalid-line list
//! - **Cancellation**: A token shared by the caller, the pool and every task
//!
//! ## What This Module Does NOT Do:
//! - **Strand Logic**: Complementing lives in [`crate::strand`]
//! - **File Discovery**: Listing and naming files lives in [`crate::files`]
//!
//! # Data Flow
//!
//! ```text
//! ┌──────────────┐  submit   ┌──────────────┐  absorb   ┌─────────────────┐
//! │ Coordinator  │──────────▶│ ElasticPool  │──────────▶│ AggregateStats  │
//! │              │           │              │           │                 │
//! │ • one task   │           │ • workers    │           │ • total/valid/  │
//! │   per input  │◀──────────│ • cancel     │           │   invalid       │
//! │ • 2-phase    │  reports  │   token      │           │ • invalid lines │
//! │   shutdown   │           │              │           │                 │
//! └──────────────┘           └──────────────┘           └─────────────────┘
//! ```
//!
//! # Example Usage
//!
//! ```rust,no_run
//! use dnacomp::files::{FileInput, OutputDirectory};
//! use dnacomp::parallel::{AggregateStats, CancellationToken, CoordinatorConfig, TaskCoordinator};
//! use dnacomp::strand::StrandProcessor;
//! use std::sync::Arc;
//!
//! let stats = Arc::new(AggregateStats::new());
//! let coordinator = TaskCoordinator::new(CoordinatorConfig::default(), StrandProcessor::default(), stats);
//! let output = Arc::new(OutputDirectory::new("out", "complementaryFitas_"));
//! let summary = coordinator
//!     .run(vec![FileInput::new("dna/sample.txt")], output, &CancellationToken::new())
//!     .unwrap();
//! println!("{} strands, {} invalid", summary.stats.total, summary.stats.invalid);
//! ```

pub mod cancel;
pub mod coordinator;
pub mod pool;
pub mod stats;

// Re-export main types for easier access
pub use cancel::CancellationToken;
pub use coordinator::{CoordinatorConfig, RunSummary, ShutdownStatus, TaskCoordinator};
pub use pool::{ElasticPool, PoolConfig, PoolState, WaitOutcome};
pub use stats::{AggregateStats, FileTally, StatsSnapshot};
