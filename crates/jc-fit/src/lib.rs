//! # jc-fit
//!
//! Fitting for jetcorr: weighted linear least squares (constants, polynomials,
//! Fourier series), bounded L-BFGS χ² minimization, and the Δη shape models
//! used by the seagull correction.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod data;
pub mod least_squares;
pub mod models;
pub mod optimizer;

pub use data::{DataPoint, FitResult};
pub use least_squares::{FourierFit, abs_polynomial_fit, constant_fit, fourier_fit, linear_fit};
pub use models::ShapeModel;
pub use optimizer::{Minimum, Objective, minimize_bounded};
