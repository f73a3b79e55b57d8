//! Binned distributions with per-cell variances.
//!
//! A [`Distribution`] holds values over one axis (x) or two axes (x, y). For
//! correlations x is Δφ and y is Δη; radial profiles use x = ΔR; jet spectra use
//! x = jet pT. 1-D distributions also carry underflow and overflow cells.
//!
//! Storage is row-major: cell `(ix, iy)` lives at `iy * nx + ix`.

use jc_core::{Error, Result};
use serde::{Deserialize, Serialize};

/// Relative tolerance used to snap a value onto a bin edge.
pub(crate) const EDGE_TOLERANCE: f64 = 1e-9;

/// An ordered set of bin edges.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Axis {
    /// Bin edges (length = n_bins + 1), strictly increasing.
    pub edges: Vec<f64>,
}

impl Axis {
    /// Create an axis from explicit edges.
    pub fn new(edges: Vec<f64>) -> Result<Self> {
        if edges.len() < 2 {
            return Err(Error::Validation(format!("axis needs at least 2 edges, got {}", edges.len())));
        }
        if edges.windows(2).any(|w| !(w[1] > w[0])) {
            return Err(Error::Validation("axis edges must be strictly increasing".to_string()));
        }
        Ok(Self { edges })
    }

    /// Create an axis of `n_bins` equal-width bins on `[low, high]`.
    pub fn uniform(n_bins: usize, low: f64, high: f64) -> Result<Self> {
        if n_bins == 0 {
            return Err(Error::Validation("axis needs at least one bin".to_string()));
        }
        let width = (high - low) / n_bins as f64;
        let mut edges: Vec<f64> = (0..=n_bins).map(|i| low + width * i as f64).collect();
        edges[n_bins] = high;
        Self::new(edges)
    }

    /// Number of bins.
    pub fn n_bins(&self) -> usize {
        self.edges.len() - 1
    }

    /// Lower edge of the axis.
    pub fn low(&self) -> f64 {
        self.edges[0]
    }

    /// Upper edge of the axis.
    pub fn high(&self) -> f64 {
        self.edges[self.edges.len() - 1]
    }

    /// Lower edge of bin `i`.
    pub fn bin_low(&self, i: usize) -> f64 {
        self.edges[i]
    }

    /// Upper edge of bin `i`.
    pub fn bin_high(&self, i: usize) -> f64 {
        self.edges[i + 1]
    }

    /// Centre of bin `i`.
    pub fn center(&self, i: usize) -> f64 {
        0.5 * (self.edges[i] + self.edges[i + 1])
    }

    /// Width of bin `i`.
    pub fn width(&self, i: usize) -> f64 {
        self.edges[i + 1] - self.edges[i]
    }

    /// True when all bins have the same width (to within rounding).
    pub fn is_uniform(&self) -> bool {
        let w0 = self.width(0);
        (0..self.n_bins()).all(|i| (self.width(i) - w0).abs() <= 1e-9 * w0.abs().max(1.0))
    }

    /// Find the bin containing `value`. `None` for underflow/overflow.
    pub fn find_bin(&self, value: f64) -> Option<usize> {
        if !(value >= self.low()) || value >= self.high() {
            return None;
        }
        // First edge strictly greater than `value`.
        let upper = self.edges.partition_point(|&e| e <= value);
        if upper == 0 { None } else { Some(upper - 1) }
    }

    /// Index of the edge equal to `value` (within tolerance), if any.
    pub fn edge_index(&self, value: f64) -> Option<usize> {
        let tol = EDGE_TOLERANCE * value.abs().max(1.0);
        self.edges.iter().position(|&e| (e - value).abs() <= tol)
    }

    /// Merge groups of `factor` adjacent bins.
    pub fn rebinned(&self, factor: usize) -> Result<Axis> {
        if factor == 0 || self.n_bins() % factor != 0 {
            return Err(Error::Validation(format!(
                "cannot rebin {} bins by a factor of {}",
                self.n_bins(),
                factor
            )));
        }
        Axis::new(self.edges.iter().step_by(factor).copied().collect())
    }
}

/// Binned values with variances over one or two axes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Distribution {
    /// Distribution name.
    pub name: String,
    /// x axis.
    pub x: Axis,
    /// y axis (2-D distributions only).
    pub y: Option<Axis>,
    /// Cell values, row-major.
    pub values: Vec<f64>,
    /// Cell variances, row-major.
    pub variances: Vec<f64>,
    /// Underflow value (1-D only).
    #[serde(default)]
    pub underflow: f64,
    /// Overflow value (1-D only).
    #[serde(default)]
    pub overflow: f64,
    /// Underflow variance (1-D only).
    #[serde(default)]
    pub underflow_variance: f64,
    /// Overflow variance (1-D only).
    #[serde(default)]
    pub overflow_variance: f64,
}

impl Distribution {
    /// Empty 1-D distribution.
    pub fn new_1d(name: impl Into<String>, x: Axis) -> Self {
        let n = x.n_bins();
        Self {
            name: name.into(),
            x,
            y: None,
            values: vec![0.0; n],
            variances: vec![0.0; n],
            underflow: 0.0,
            overflow: 0.0,
            underflow_variance: 0.0,
            overflow_variance: 0.0,
        }
    }

    /// Empty 2-D distribution.
    pub fn new_2d(name: impl Into<String>, x: Axis, y: Axis) -> Self {
        let n = x.n_bins() * y.n_bins();
        Self {
            name: name.into(),
            x,
            y: Some(y),
            values: vec![0.0; n],
            variances: vec![0.0; n],
            underflow: 0.0,
            overflow: 0.0,
            underflow_variance: 0.0,
            overflow_variance: 0.0,
        }
    }

    /// 1-D distribution from explicit values and variances.
    pub fn from_values(
        name: impl Into<String>,
        x: Axis,
        values: Vec<f64>,
        variances: Vec<f64>,
    ) -> Result<Self> {
        let mut d = Self::new_1d(name, x);
        if values.len() != d.values.len() || variances.len() != d.values.len() {
            return Err(Error::Validation(format!(
                "expected {} values and variances, got {} and {}",
                d.values.len(),
                values.len(),
                variances.len()
            )));
        }
        d.values = values;
        d.variances = variances;
        Ok(d)
    }

    /// 2-D distribution from explicit row-major values and variances.
    pub fn from_values_2d(
        name: impl Into<String>,
        x: Axis,
        y: Axis,
        values: Vec<f64>,
        variances: Vec<f64>,
    ) -> Result<Self> {
        let mut d = Self::new_2d(name, x, y);
        if values.len() != d.values.len() || variances.len() != d.values.len() {
            return Err(Error::Validation(format!(
                "expected {} values and variances, got {} and {}",
                d.values.len(),
                values.len(),
                variances.len()
            )));
        }
        d.values = values;
        d.variances = variances;
        Ok(d)
    }

    /// Copy with a new name.
    pub fn renamed(&self, name: impl Into<String>) -> Self {
        Self { name: name.into(), ..self.clone() }
    }

    /// Same binning, all cells zero.
    pub fn zeroed_like(&self, name: impl Into<String>) -> Self {
        match &self.y {
            Some(y) => Self::new_2d(name, self.x.clone(), y.clone()),
            None => Self::new_1d(name, self.x.clone()),
        }
    }

    /// True for 2-D distributions.
    pub fn is_2d(&self) -> bool {
        self.y.is_some()
    }

    /// Number of x bins.
    pub fn nx(&self) -> usize {
        self.x.n_bins()
    }

    /// Number of y bins (1 for 1-D distributions).
    pub fn ny(&self) -> usize {
        self.y.as_ref().map_or(1, Axis::n_bins)
    }

    /// Linear index of cell `(ix, iy)`.
    #[inline]
    pub fn index(&self, ix: usize, iy: usize) -> usize {
        iy * self.nx() + ix
    }

    /// Value of cell `(ix, iy)`.
    pub fn value(&self, ix: usize, iy: usize) -> f64 {
        self.values[self.index(ix, iy)]
    }

    /// Variance of cell `(ix, iy)`.
    pub fn variance(&self, ix: usize, iy: usize) -> f64 {
        self.variances[self.index(ix, iy)]
    }

    /// Standard error of cell `(ix, iy)`.
    pub fn error(&self, ix: usize, iy: usize) -> f64 {
        self.variance(ix, iy).max(0.0).sqrt()
    }

    /// Set value and variance of cell `(ix, iy)`.
    pub fn set(&mut self, ix: usize, iy: usize, value: f64, variance: f64) {
        let i = self.index(ix, iy);
        self.values[i] = value;
        self.variances[i] = variance;
    }

    /// Add a weighted entry at `(x, y)`; for 1-D distributions `y` is ignored.
    ///
    /// Entries outside a 1-D axis go to underflow/overflow; entries outside a
    /// 2-D distribution are dropped.
    pub fn fill(&mut self, x: f64, y: f64, weight: f64) {
        let ix = self.x.find_bin(x);
        match (&self.y, ix) {
            (None, Some(ix)) => {
                self.values[ix] += weight;
                self.variances[ix] += weight * weight;
            }
            (None, None) => {
                if x < self.x.low() {
                    self.underflow += weight;
                    self.underflow_variance += weight * weight;
                } else {
                    self.overflow += weight;
                    self.overflow_variance += weight * weight;
                }
            }
            (Some(yaxis), Some(ix)) => {
                if let Some(iy) = yaxis.find_bin(y) {
                    let i = self.index(ix, iy);
                    self.values[i] += weight;
                    self.variances[i] += weight * weight;
                }
            }
            (Some(_), None) => {}
        }
    }

    fn check_compatible(&self, other: &Distribution, op: &str) -> Result<()> {
        if self.x.edges.len() != other.x.edges.len()
            || self.ny() != other.ny()
            || self.is_2d() != other.is_2d()
        {
            return Err(Error::ConfigurationMismatch(format!(
                "cannot {op} '{}' ({}x{}) and '{}' ({}x{})",
                self.name,
                self.nx(),
                self.ny(),
                other.name,
                other.nx(),
                other.ny()
            )));
        }
        Ok(())
    }

    /// Multiply every cell (and the flows) by `factor`; variances by `factor²`.
    pub fn scale(&mut self, factor: f64) {
        let f2 = factor * factor;
        self.values.iter_mut().for_each(|v| *v *= factor);
        self.variances.iter_mut().for_each(|v| *v *= f2);
        self.underflow *= factor;
        self.overflow *= factor;
        self.underflow_variance *= f2;
        self.overflow_variance *= f2;
    }

    /// Multiply every error by `factor`; values are unchanged.
    pub fn scale_errors(&mut self, factor: f64) {
        let f2 = factor * factor;
        self.variances.iter_mut().for_each(|v| *v *= f2);
        self.underflow_variance *= f2;
        self.overflow_variance *= f2;
    }

    /// `self += c * other`, variances add with `c²`.
    pub fn add_scaled(&mut self, other: &Distribution, c: f64) -> Result<()> {
        self.check_compatible(other, "add")?;
        let c2 = c * c;
        for i in 0..self.values.len() {
            self.values[i] += c * other.values[i];
            self.variances[i] += c2 * other.variances[i];
        }
        self.underflow += c * other.underflow;
        self.overflow += c * other.overflow;
        self.underflow_variance += c2 * other.underflow_variance;
        self.overflow_variance += c2 * other.overflow_variance;
        Ok(())
    }

    /// `self += other`.
    pub fn add(&mut self, other: &Distribution) -> Result<()> {
        self.add_scaled(other, 1.0)
    }

    /// `self -= other`; variances add.
    pub fn subtract(&mut self, other: &Distribution) -> Result<()> {
        self.add_scaled(other, -1.0)
    }

    /// Cell-by-cell product with uncorrelated error propagation.
    pub fn multiply(&mut self, other: &Distribution) -> Result<()> {
        self.check_compatible(other, "multiply")?;
        for i in 0..self.values.len() {
            let (a, b) = (self.values[i], other.values[i]);
            self.variances[i] = self.variances[i] * b * b + other.variances[i] * a * a;
            self.values[i] = a * b;
        }
        Ok(())
    }

    /// Cell-by-cell quotient with uncorrelated error propagation.
    ///
    /// Cells where the denominator is zero are set to zero.
    pub fn divide(&mut self, other: &Distribution) -> Result<()> {
        self.check_compatible(other, "divide")?;
        for i in 0..self.values.len() {
            let (a, b) = (self.values[i], other.values[i]);
            if b == 0.0 {
                self.values[i] = 0.0;
                self.variances[i] = 0.0;
                continue;
            }
            let b2 = b * b;
            self.variances[i] = (self.variances[i] * b2 + other.variances[i] * a * a) / (b2 * b2);
            self.values[i] = a / b;
        }
        Ok(())
    }

    /// Set every variance to zero.
    pub fn zero_variances(&mut self) {
        self.variances.iter_mut().for_each(|v| *v = 0.0);
        self.underflow_variance = 0.0;
        self.overflow_variance = 0.0;
    }

    /// Sum of in-range cell values.
    pub fn sum(&self) -> f64 {
        self.values.iter().sum()
    }

    /// Sum of in-range cell values plus underflow and overflow.
    pub fn sum_with_flows(&self) -> f64 {
        self.sum() + self.underflow + self.overflow
    }

    /// Width-weighted integral of a 1-D distribution over bins `lo..=hi`.
    pub fn integral(&self, lo: usize, hi: usize) -> f64 {
        (lo..=hi.min(self.nx().saturating_sub(1))).map(|i| self.values[i] * self.x.width(i)).sum()
    }

    /// Divide every cell by its bin width (area for 2-D).
    pub fn divide_by_bin_width(&mut self) {
        for iy in 0..self.ny() {
            let wy = self.y.as_ref().map_or(1.0, |y| y.width(iy));
            for ix in 0..self.nx() {
                let w = self.x.width(ix) * wy;
                let i = self.index(ix, iy);
                self.values[i] /= w;
                self.variances[i] /= w * w;
            }
        }
    }

    /// Integrate a 2-D density over y rows `iy_lo..=iy_hi`, giving a density in x.
    pub fn project_x(&self, name: impl Into<String>, iy_lo: usize, iy_hi: usize) -> Result<Distribution> {
        let yaxis = self
            .y
            .as_ref()
            .ok_or_else(|| Error::Validation(format!("'{}' is not two-dimensional", self.name)))?;
        if iy_lo > iy_hi || iy_hi >= yaxis.n_bins() {
            return Err(Error::InvalidBinRange(format!(
                "y rows {iy_lo}..={iy_hi} outside '{}' ({} rows)",
                self.name,
                yaxis.n_bins()
            )));
        }
        let mut out = Distribution::new_1d(name, self.x.clone());
        for iy in iy_lo..=iy_hi {
            let w = yaxis.width(iy);
            for ix in 0..self.nx() {
                out.values[ix] += self.value(ix, iy) * w;
                out.variances[ix] += self.variance(ix, iy) * w * w;
            }
        }
        Ok(out)
    }

    /// Integrate a 2-D density over x columns `ix_lo..=ix_hi`, giving a density in y.
    pub fn project_y(&self, name: impl Into<String>, ix_lo: usize, ix_hi: usize) -> Result<Distribution> {
        let yaxis = self
            .y
            .as_ref()
            .ok_or_else(|| Error::Validation(format!("'{}' is not two-dimensional", self.name)))?;
        if ix_lo > ix_hi || ix_hi >= self.nx() {
            return Err(Error::InvalidBinRange(format!(
                "x columns {ix_lo}..={ix_hi} outside '{}' ({} columns)",
                self.name,
                self.nx()
            )));
        }
        let mut out = Distribution::new_1d(name, yaxis.clone());
        for iy in 0..yaxis.n_bins() {
            for ix in ix_lo..=ix_hi {
                let w = self.x.width(ix);
                out.values[iy] += self.value(ix, iy) * w;
                out.variances[iy] += self.variance(ix, iy) * w * w;
            }
        }
        Ok(out)
    }

    /// Merge groups of `factor` adjacent bins of a 1-D distribution, summing contents.
    pub fn rebin_x(&self, factor: usize) -> Result<Distribution> {
        if self.is_2d() {
            return Err(Error::Validation(format!("rebin_x needs a 1-D distribution, '{}' is 2-D", self.name)));
        }
        let axis = self.x.rebinned(factor)?;
        let mut out = Distribution::new_1d(self.name.clone(), axis);
        for i in 0..self.nx() {
            out.values[i / factor] += self.values[i];
            out.variances[i / factor] += self.variances[i];
        }
        out.underflow = self.underflow;
        out.overflow = self.overflow;
        out.underflow_variance = self.underflow_variance;
        out.overflow_variance = self.overflow_variance;
        Ok(out)
    }

    /// Average a 1-D distribution with its mirror image around the axis centre.
    pub fn symmetrized(&self) -> Result<Distribution> {
        if self.is_2d() {
            return Err(Error::Validation(format!("cannot symmetrize 2-D '{}'", self.name)));
        }
        let n = self.nx();
        let mut out = self.clone();
        for i in 0..n {
            let j = n - 1 - i;
            out.values[i] = 0.5 * (self.values[i] + self.values[j]);
            out.variances[i] = if i == j {
                self.variances[i]
            } else {
                0.25 * (self.variances[i] + self.variances[j])
            };
        }
        Ok(out)
    }
}
