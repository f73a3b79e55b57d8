//! # jc-core
//!
//! Core types for jetcorr: the error taxonomy, correlation categories,
//! processing stages and bin coordinates shared by every other crate.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod types;

pub use error::{Error, Result};
pub use types::{BinCoordinate, Category, DatasetKind, DistributionKind, JetLeg, Stage};
