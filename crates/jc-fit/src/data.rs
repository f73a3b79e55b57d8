//! Fit inputs and outputs.

use statrs::distribution::{ChiSquared, ContinuousCDF};

/// One measured point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DataPoint {
    /// Abscissa
    pub x: f64,
    /// Measured value
    pub y: f64,
    /// Standard error of `y`
    pub sigma: f64,
}

impl DataPoint {
    /// New point.
    pub fn new(x: f64, y: f64, sigma: f64) -> Self {
        Self { x, y, sigma }
    }

    /// χ² weight `1/σ²`; points without an error estimate get unit weight.
    #[inline]
    pub fn weight(&self) -> f64 {
        if self.sigma > 0.0 { 1.0 / (self.sigma * self.sigma) } else { 1.0 }
    }
}

/// Outcome of a fit.
#[derive(Debug, Clone, PartialEq)]
pub struct FitResult {
    /// Best-fit parameters
    pub parameters: Vec<f64>,
    /// Parameter uncertainties (NaN when unavailable)
    pub errors: Vec<f64>,
    /// χ² at the minimum
    pub chi2: f64,
    /// Degrees of freedom
    pub ndf: usize,
    /// Whether the minimizer reported convergence
    pub converged: bool,
}

impl FitResult {
    /// Assemble a result.
    pub fn new(parameters: Vec<f64>, errors: Vec<f64>, chi2: f64, ndf: usize, converged: bool) -> Self {
        Self { parameters, errors, chi2, ndf, converged }
    }

    /// χ²/ndf, `None` without degrees of freedom.
    pub fn chi2_per_ndf(&self) -> Option<f64> {
        (self.ndf > 0).then(|| self.chi2 / self.ndf as f64)
    }

    /// Upper-tail χ² probability of the fit.
    pub fn probability(&self) -> Option<f64> {
        if self.ndf == 0 || !self.chi2.is_finite() {
            return None;
        }
        ChiSquared::new(self.ndf as f64).ok().map(|d| d.sf(self.chi2))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn probability_of_typical_fit() {
        let r = FitResult::new(vec![1.0], vec![0.1], 2.0, 2, true);
        // sf of chi2(2) at 2 is exp(-1)
        assert_relative_eq!(r.probability().unwrap(), (-1.0f64).exp(), epsilon = 1e-10);
        assert_eq!(r.chi2_per_ndf(), Some(1.0));
        let none = FitResult::new(vec![1.0], vec![0.1], 0.0, 0, true);
        assert!(none.probability().is_none());
        assert!(none.chi2_per_ndf().is_none());
    }

    #[test]
    fn zero_sigma_uses_unit_weight() {
        assert_eq!(DataPoint::new(0.0, 1.0, 0.0).weight(), 1.0);
        assert_eq!(DataPoint::new(0.0, 1.0, 0.5).weight(), 4.0);
    }
}
