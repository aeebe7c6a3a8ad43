#![forbid(unsafe_code)]
//! sleeve-core library.
//!
//! Correlates the reads and writes that reconciling controllers make
//! against a Kubernetes-style API into a causal graph: which observed
//! object states led to which writes, cycle by cycle.
//!
//! # Pipeline
//!
//! ```text
//! event lines ─► event::parse_events ─► backfill::backfill ─► group::group_events ─┐
//! version lines ─► catalog::VersionCatalog::from_lines ──────────────────────────┴─► CausalGraph::build
//! ```
//!
//! [`pipeline::correlate`] runs all of it.
//!
//! # Conventions
//!
//! - **Errors**: typed `thiserror` enums per stage, each mapped to an
//!   [`error::ErrorCode`]. Non-fatal findings go to [`diagnostics::Diagnostics`].
//! - **Logging**: `tracing` macros (`info!`, `warn!`, `debug!`).

pub mod backfill;
pub mod catalog;
pub mod causal;
pub mod config;
pub mod diagnostics;
pub mod error;
pub mod event;
pub mod graph;
pub mod group;
pub mod pipeline;

pub use causal::{CausalId, CausalKey, CausalResolution};
pub use config::Config;
pub use diagnostics::{Diagnostic, Diagnostics, Stage};
pub use error::ErrorCode;
pub use event::{Event, OpType};
pub use graph::{CausalGraph, GraphView};
pub use group::{GroupError, ReconcileGroup};
pub use pipeline::{Correlation, correlate};
