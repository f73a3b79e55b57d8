//! Weighted linear least squares.
//!
//! Solves the normal equations `(Xᵀ W X) β = Xᵀ W y` with an LU decomposition.

use crate::{DataPoint, FitResult};
use jc_core::{Error, Result};
use nalgebra::{DMatrix, DVector};

/// Fit `y = Σ_k β_k · basis(x)_k` to `points`.
///
/// `basis` must return the same number of terms for every `x`.
pub fn linear_fit<F>(points: &[DataPoint], basis: F) -> Result<FitResult>
where
    F: Fn(f64) -> Vec<f64>,
{
    let first = points.first().ok_or_else(|| Error::Computation("no points to fit".to_string()))?;
    let d = basis(first.x).len();
    if d == 0 {
        return Err(Error::Validation("basis must have at least one term".to_string()));
    }
    if points.len() < d {
        return Err(Error::Computation(format!("{} points cannot constrain {d} parameters", points.len())));
    }

    // Accumulate XtWX and XtWy.
    let mut xtx = vec![0.0; d * d];
    let mut xty = vec![0.0; d];
    let mut rows = Vec::with_capacity(points.len());
    for p in points {
        let row = basis(p.x);
        if row.len() != d {
            return Err(Error::Validation(format!("basis returned {} terms, expected {d}", row.len())));
        }
        let w = p.weight();
        for a in 0..d {
            xty[a] += w * row[a] * p.y;
            for b in 0..d {
                xtx[a * d + b] += w * row[a] * row[b];
            }
        }
        rows.push(row);
    }

    let a = DMatrix::from_row_slice(d, d, &xtx);
    let b = DVector::from_vec(xty);
    let lu = a.clone().lu();
    let sol = lu.solve(&b).ok_or_else(|| Error::Computation("least-squares solve failed (singular XtWX)".to_string()))?;
    let parameters: Vec<f64> = sol.iter().copied().collect();
    let errors = match a.try_inverse() {
        Some(cov) => (0..d).map(|i| cov[(i, i)].max(0.0).sqrt()).collect(),
        None => vec![f64::NAN; d],
    };

    let chi2: f64 = points
        .iter()
        .zip(&rows)
        .map(|(p, row)| {
            let model: f64 = row.iter().zip(&parameters).map(|(x, b)| x * b).sum();
            p.weight() * (p.y - model).powi(2)
        })
        .sum();

    Ok(FitResult::new(parameters, errors, chi2, points.len() - d, true))
}

/// Weighted mean of the points (a zeroth-order polynomial fit).
pub fn constant_fit(points: &[DataPoint]) -> Result<FitResult> {
    linear_fit(points, |_| vec![1.0])
}

/// Polynomial `Σ_k β_k |x|^k` of the given order.
pub fn abs_polynomial_fit(points: &[DataPoint], order: usize) -> Result<FitResult> {
    linear_fit(points, |x| (0..=order).map(|k| x.abs().powi(k as i32)).collect())
}

/// Result of a Fourier fit `y = c₀ + Σ_n c_n cos(nφ)`.
#[derive(Debug, Clone)]
pub struct FourierFit {
    /// Underlying fit; `parameters[n]` is `c_n`.
    pub fit: FitResult,
}

impl FourierFit {
    /// Number of fitted harmonics.
    pub fn n_harmonics(&self) -> usize {
        self.fit.parameters.len() - 1
    }

    /// Flow coefficient `v_n = c_n / (2 c₀)` for `n ≥ 1`.
    pub fn vn(&self, n: usize) -> Option<f64> {
        let c0 = self.fit.parameters[0];
        if n == 0 || n > self.n_harmonics() || c0 == 0.0 {
            return None;
        }
        Some(self.fit.parameters[n] / (2.0 * c0))
    }

    /// Evaluate the fitted series.
    pub fn eval(&self, phi: f64) -> f64 {
        self.fit.parameters.iter().enumerate().map(|(n, c)| c * (n as f64 * phi).cos()).sum()
    }
}

/// Fit a Fourier cosine series with `n_harmonics` terms beyond the constant.
pub fn fourier_fit(points: &[DataPoint], n_harmonics: usize) -> Result<FourierFit> {
    let fit = linear_fit(points, |phi| (0..=n_harmonics).map(|n| (n as f64 * phi).cos()).collect())?;
    Ok(FourierFit { fit })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::f64::consts::PI;

    fn points(f: impl Fn(f64) -> f64, xs: impl Iterator<Item = f64>) -> Vec<DataPoint> {
        xs.map(|x| DataPoint::new(x, f(x), 0.1)).collect()
    }

    #[test]
    fn recovers_quadratic() {
        let pts = points(|x| 2.0 - 0.5 * x.abs() + 0.25 * x * x, (0..21).map(|i| -3.0 + 0.3 * i as f64));
        let r = abs_polynomial_fit(&pts, 2).unwrap();
        assert_relative_eq!(r.parameters[0], 2.0, epsilon = 1e-9);
        assert_relative_eq!(r.parameters[1], -0.5, epsilon = 1e-9);
        assert_relative_eq!(r.parameters[2], 0.25, epsilon = 1e-9);
        assert!(r.chi2 < 1e-12);
        assert_eq!(r.ndf, 18);
    }

    #[test]
    fn constant_is_weighted_mean() {
        let pts = vec![DataPoint::new(0.0, 1.0, 1.0), DataPoint::new(1.0, 4.0, 0.5)];
        let r = constant_fit(&pts).unwrap();
        // weights 1 and 4
        assert_relative_eq!(r.parameters[0], 17.0 / 5.0, epsilon = 1e-12);
        assert_relative_eq!(r.errors[0], (1.0f64 / 5.0).sqrt(), epsilon = 1e-12);
    }

    #[test]
    fn fourier_flow_coefficients() {
        let pts = points(
            |phi| 10.0 * (1.0 + 2.0 * 0.1 * (2.0 * phi).cos() + 2.0 * 0.03 * (3.0 * phi).cos()),
            (0..40).map(|i| -PI / 2.0 + (i as f64 + 0.5) * 2.0 * PI / 40.0),
        );
        let f = fourier_fit(&pts, 4).unwrap();
        assert_relative_eq!(f.vn(2).unwrap(), 0.1, epsilon = 1e-9);
        assert_relative_eq!(f.vn(3).unwrap(), 0.03, epsilon = 1e-9);
        assert_relative_eq!(f.vn(1).unwrap(), 0.0, epsilon = 1e-9);
        assert!(f.vn(5).is_none());
        assert_relative_eq!(f.eval(0.0), 10.0 * 1.26, epsilon = 1e-9);
    }

    #[test]
    fn underdetermined_fit_errors() {
        let pts = vec![DataPoint::new(0.0, 1.0, 1.0)];
        assert!(abs_polynomial_fit(&pts, 2).is_err());
        assert!(constant_fit(&[]).is_err());
    }
}
