//! # jc-hist
//!
//! Binned distributions for jetcorr, plus everything that produces or stores
//! them outside the pipeline itself:
//!
//! - [`Distribution`] / [`Axis`]: values and variances over one or two axes
//! - [`BinSpace`]: analysis bin borders resolved onto source-table indices
//! - [`SourceTable`] / [`RawInput`]: N-dimensional raw tables and the ingestion provider
//! - [`CorrectionProvider`]: pre-computed correction maps
//! - [`Archive`]: hierarchical path → distribution persistence

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod archive;
pub mod bin_space;
pub mod distribution;
pub mod provider;
pub mod source;

pub use archive::{Archive, dataset_path, parse_dataset_path};
pub use bin_space::{BinAxis, BinBorders, BinSpace, DUPLICATE_REMOVER, DeltaPhiWindow};
pub use distribution::{Axis, Distribution};
pub use provider::{CorrectionEntry, CorrectionProvider, CorrectionSet, CorrectionVariant, NoCorrection};
pub use source::{IngestionProvider, RawInput, SourceTable, spectrum_key};
