//! # jc-pipeline
//!
//! The multi-stage correction pipeline for jet-track correlations.
//!
//! Raw same/mixed-event correlations are ingested per analysis bin, corrected
//! for pair acceptance, the seagull shape, tracking residuals and spillover,
//! split into background and signal, corrected for fragmentation bias, and
//! reduced to radial jet-shape profiles and one-dimensional projections.
//!
//! Every step is a function of a [`BinCoordinate`](jc_core::BinCoordinate)
//! and a read-only [`Store`] snapshot, so bins run in parallel.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod background;
pub mod config;
pub mod jet_shape;
pub mod jff;
pub mod mixed_event;
pub mod orchestrator;
pub mod overrides;
pub mod projection;
pub mod seagull;
pub mod spillover;
pub mod store;
pub mod tracking;

mod tables;

pub use config::{PipelineConfig, PipelineStep};
pub use orchestrator::{Corrections, PipelineOrchestrator, PipelineReport, StepReport, StepStatus};
pub use overrides::{AsymmetryRedirect, BinPattern, OverrideTable, SeagullVeto};
pub use store::{Product, Store};
