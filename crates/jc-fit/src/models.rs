//! Δη shape models for the seagull background fit.
//!
//! All models are even in x (they depend on |x|). Polynomials are linear in
//! their parameters and fitted in closed form; the exponential models scan the
//! slope on a grid, solve the linear part for every slope, then refine all
//! parameters with L-BFGS.

use crate::data::{DataPoint, FitResult};
use crate::least_squares::{abs_polynomial_fit, linear_fit};
use crate::optimizer::{Objective, minimize_bounded};
use jc_core::{Error, Result};
use serde::{Deserialize, Serialize};

/// Functional form of a Δη shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ShapeModel {
    /// `Σ_{k≤order} p_k |x|^k`
    Polynomial {
        /// Polynomial order
        order: usize,
    },
    /// `a + b·exp(c|x|)`
    ExpDip,
    /// `a + b·exp(c|x|) + d·x²`
    ExpDipQuadratic,
}

const SLOPE_RANGE: (f64, f64) = (-10.0, 0.0);

impl ShapeModel {
    /// Number of free parameters.
    pub fn n_params(&self) -> usize {
        match self {
            ShapeModel::Polynomial { order } => order + 1,
            ShapeModel::ExpDip => 3,
            ShapeModel::ExpDipQuadratic => 4,
        }
    }

    /// Evaluate the model.
    pub fn eval(&self, x: f64, p: &[f64]) -> f64 {
        let ax = x.abs();
        match self {
            ShapeModel::Polynomial { .. } => p.iter().rev().fold(0.0, |acc, c| acc * ax + c),
            ShapeModel::ExpDip => p[0] + p[1] * (p[2] * ax).exp(),
            ShapeModel::ExpDipQuadratic => p[0] + p[1] * (p[2] * ax).exp() + p[3] * x * x,
        }
    }

    /// Fit the model to `points` by χ² minimization.
    pub fn fit(&self, points: &[DataPoint]) -> Result<FitResult> {
        match *self {
            ShapeModel::Polynomial { order } => abs_polynomial_fit(points, order),
            ShapeModel::ExpDip | ShapeModel::ExpDipQuadratic => self.fit_exponential(points),
        }
    }

    fn linear_part(&self, points: &[DataPoint], slope: f64) -> Result<FitResult> {
        let quadratic = matches!(self, ShapeModel::ExpDipQuadratic);
        linear_fit(points, |x| {
            let mut row = vec![1.0, (slope * x.abs()).exp()];
            if quadratic {
                row.push(x * x);
            }
            row
        })
    }

    fn fit_exponential(&self, points: &[DataPoint]) -> Result<FitResult> {
        if points.len() <= self.n_params() {
            return Err(Error::Computation(format!(
                "{} points cannot constrain {} parameters",
                points.len(),
                self.n_params()
            )));
        }

        // Coarse scan over the slope.
        let mut best: Option<(f64, FitResult)> = None;
        for i in 1..=40 {
            let slope = SLOPE_RANGE.0 * i as f64 / 40.0;
            let Ok(lin) = self.linear_part(points, slope) else { continue };
            if best.as_ref().is_none_or(|(_, b)| lin.chi2 < b.chi2) {
                best = Some((slope, lin));
            }
        }
        let (slope, lin) = best.ok_or_else(|| Error::Computation("exponential shape scan failed".to_string()))?;

        let mut init = vec![lin.parameters[0], lin.parameters[1], slope];
        if let ShapeModel::ExpDipQuadratic = self {
            init.push(lin.parameters[2]);
        }
        let mut bounds = vec![(f64::NEG_INFINITY, f64::INFINITY); init.len()];
        bounds[2] = SLOPE_RANGE;

        let objective = Chi2 { model: *self, points };
        let refined = minimize_bounded(&objective, &init, &bounds);
        let ndf = points.len() - self.n_params();
        match refined {
            Ok(m) if m.value.is_finite() && m.value <= lin.chi2 => {
                log::trace!("{self:?} refined to chi2 {}", m.value);
                Ok(FitResult::new(m.parameters, vec![f64::NAN; init.len()], m.value, ndf, m.converged))
            }
            // Keep the scan result when refinement does not improve it.
            _ => Ok(FitResult::new(init, vec![f64::NAN; self.n_params()], lin.chi2, ndf, false)),
        }
    }
}

/// χ² of a shape model against data points.
pub struct Chi2<'a> {
    /// Model
    pub model: ShapeModel,
    /// Data
    pub points: &'a [DataPoint],
}

impl Objective for Chi2<'_> {
    fn value(&self, params: &[f64]) -> Result<f64> {
        Ok(self.points.iter().map(|p| p.weight() * (p.y - self.model.eval(p.x, params)).powi(2)).sum())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn sample(model: ShapeModel, p: &[f64]) -> Vec<DataPoint> {
        (0..30).map(|i| -2.9 + 0.2 * i as f64).map(|x| DataPoint::new(x, model.eval(x, p), 0.01)).collect()
    }

    #[test]
    fn polynomial_eval_uses_abs() {
        let m = ShapeModel::Polynomial { order: 2 };
        assert_relative_eq!(m.eval(-2.0, &[1.0, 2.0, 3.0]), 1.0 + 4.0 + 12.0);
        assert_eq!(m.n_params(), 3);
    }

    #[test]
    fn exp_dip_fit_recovers_shape() {
        let truth = [10.0, -2.0, -1.5];
        let pts = sample(ShapeModel::ExpDip, &truth);
        let r = ShapeModel::ExpDip.fit(&pts).unwrap();
        for x in [0.0, 0.5, 1.5, 2.5] {
            assert_relative_eq!(ShapeModel::ExpDip.eval(x, &r.parameters), ShapeModel::ExpDip.eval(x, &truth), epsilon = 1e-3);
        }
        assert_eq!(r.ndf, 27);
    }

    #[test]
    fn exp_dip_quadratic_fits_at_least_as_well_as_scan() {
        let truth = [10.0, -2.0, -1.0, 0.1];
        let pts = sample(ShapeModel::ExpDipQuadratic, &truth);
        let r = ShapeModel::ExpDipQuadratic.fit(&pts).unwrap();
        assert!(r.chi2 / (r.ndf as f64) < 1.0, "chi2 {}", r.chi2);
    }

    #[test]
    fn too_few_points() {
        let pts = vec![DataPoint::new(0.0, 1.0, 1.0); 3];
        assert!(ShapeModel::ExpDip.fit(&pts).is_err());
    }
}
