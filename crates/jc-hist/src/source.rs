//! N-dimensional source tables and the raw ingestion provider.

use crate::distribution::{Axis, Distribution};
use jc_core::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Axis positions of a jet-track source table.
pub mod axes {
    /// Track pT
    pub const TRACK_PT: usize = 0;
    /// Δφ between track and jet
    pub const DELTA_PHI: usize = 1;
    /// Δη between track and jet
    pub const DELTA_ETA: usize = 2;
    /// Dijet momentum imbalance
    pub const ASYMMETRY: usize = 3;
    /// Centrality
    pub const CENTRALITY: usize = 4;
    /// Same event (bin 0) or mixed event (bin 1)
    pub const SAME_MIXED: usize = 5;
    /// Number of axes
    pub const COUNT: usize = 6;
}

/// Bin of the same/mixed axis holding same-event pairs.
pub const SAME_EVENT_BIN: usize = 0;
/// Bin of the same/mixed axis holding mixed-event pairs.
pub const MIXED_EVENT_BIN: usize = 1;

/// Dense N-dimensional table of sums of weights and sums of squared weights.
///
/// Axis 0 varies fastest in the linear layout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceTable {
    /// Table name.
    pub name: String,
    /// Axes, in table order.
    pub axes: Vec<Axis>,
    /// Sums of weights.
    pub values: Vec<f64>,
    /// Sums of squared weights.
    pub variances: Vec<f64>,
}

impl SourceTable {
    /// Empty table over `axes`.
    pub fn new(name: impl Into<String>, axes: Vec<Axis>) -> Self {
        let n: usize = axes.iter().map(Axis::n_bins).product();
        Self { name: name.into(), axes, values: vec![0.0; n], variances: vec![0.0; n] }
    }

    /// Check the axes and that the storage matches them.
    pub fn validate(&self) -> Result<()> {
        for axis in &self.axes {
            Axis::new(axis.edges.clone())?;
        }
        let n: usize = self.axes.iter().map(Axis::n_bins).product();
        if self.values.len() != n || self.variances.len() != n {
            return Err(Error::Validation(format!(
                "'{}' stores {} values and {} variances for {n} bins",
                self.name,
                self.values.len(),
                self.variances.len()
            )));
        }
        Ok(())
    }

    fn strides(&self) -> Vec<usize> {
        let mut strides = Vec::with_capacity(self.axes.len());
        let mut s = 1;
        for a in &self.axes {
            strides.push(s);
            s *= a.n_bins();
        }
        strides
    }

    fn linear(&self, idx: &[usize]) -> Result<usize> {
        if idx.len() != self.axes.len() {
            return Err(Error::Validation(format!(
                "'{}' has {} axes, got {} indices",
                self.name,
                self.axes.len(),
                idx.len()
            )));
        }
        let mut lin = 0;
        for ((&i, axis), stride) in idx.iter().zip(&self.axes).zip(self.strides()) {
            if i >= axis.n_bins() {
                return Err(Error::InvalidBinRange(format!("index {i} outside axis of {} bins", axis.n_bins())));
            }
            lin += i * stride;
        }
        Ok(lin)
    }

    /// Add a weighted entry at physical coordinates. Entries outside any axis are dropped.
    pub fn fill(&mut self, coords: &[f64], weight: f64) -> Result<()> {
        let idx: Option<Vec<usize>> = coords.iter().zip(&self.axes).map(|(&c, a)| a.find_bin(c)).collect();
        if let Some(idx) = idx {
            let lin = self.linear(&idx)?;
            self.values[lin] += weight;
            self.variances[lin] += weight * weight;
        }
        Ok(())
    }

    /// Set a cell by index.
    pub fn set_bin(&mut self, idx: &[usize], value: f64, variance: f64) -> Result<()> {
        let lin = self.linear(idx)?;
        self.values[lin] = value;
        self.variances[lin] = variance;
        Ok(())
    }

    /// Value and variance of a cell.
    pub fn bin(&self, idx: &[usize]) -> Result<(f64, f64)> {
        let lin = self.linear(idx)?;
        Ok((self.values[lin], self.variances[lin]))
    }

    /// Project onto one or two axes, summing every other axis within the given
    /// inclusive restriction windows (unrestricted axes are summed fully). The
    /// result is divided by the widths of the projected bins.
    pub fn project(
        &self,
        projected_axes: &[usize],
        restriction_axes: &[usize],
        low_indices: &[usize],
        high_indices: &[usize],
    ) -> Result<Distribution> {
        if projected_axes.is_empty() || projected_axes.len() > 2 {
            return Err(Error::Validation(format!("can project on 1 or 2 axes, got {}", projected_axes.len())));
        }
        if restriction_axes.len() != low_indices.len() || restriction_axes.len() != high_indices.len() {
            return Err(Error::Validation("restriction axes and index windows differ in length".to_string()));
        }
        let n_axes = self.axes.len();
        if let Some(&bad) = projected_axes.iter().chain(restriction_axes).find(|&&a| a >= n_axes) {
            return Err(Error::Validation(format!("'{}' has no axis {bad}", self.name)));
        }

        let mut lo: Vec<usize> = vec![0; n_axes];
        let mut hi: Vec<usize> = self.axes.iter().map(|a| a.n_bins() - 1).collect();
        for ((&axis, &l), &h) in restriction_axes.iter().zip(low_indices).zip(high_indices) {
            if l > h || h >= self.axes[axis].n_bins() {
                return Err(Error::InvalidBinRange(format!(
                    "window {l}..={h} on axis {axis} of '{}' ({} bins)",
                    self.name,
                    self.axes[axis].n_bins()
                )));
            }
            lo[axis] = l;
            hi[axis] = h;
        }

        let x_axis = projected_axes[0];
        let y_axis = projected_axes.get(1).copied();
        let mut out = match y_axis {
            Some(ya) => Distribution::new_2d(self.name.clone(), self.axes[x_axis].clone(), self.axes[ya].clone()),
            None => Distribution::new_1d(self.name.clone(), self.axes[x_axis].clone()),
        };

        let strides = self.strides();
        let mut idx = lo.clone();
        'cells: loop {
            let lin: usize = idx.iter().zip(&strides).map(|(i, s)| i * s).sum();
            let target = out.index(idx[x_axis], y_axis.map_or(0, |ya| idx[ya]));
            out.values[target] += self.values[lin];
            out.variances[target] += self.variances[lin];

            for axis in 0..n_axes {
                if idx[axis] < hi[axis] {
                    idx[axis] += 1;
                    continue 'cells;
                }
                idx[axis] = lo[axis];
            }
            break;
        }

        out.divide_by_bin_width();
        Ok(out)
    }
}

/// Source of raw per-bin distributions.
pub trait IngestionProvider {
    /// Project the named dataset. `Ok(None)` when the dataset does not exist.
    fn get_distribution(
        &self,
        dataset: &str,
        projected_axes: &[usize],
        restriction_axes: &[usize],
        low_indices: &[usize],
        high_indices: &[usize],
    ) -> Result<Option<Distribution>>;

    /// Reference axis `axis` of the named dataset.
    fn reference_axis(&self, dataset: &str, axis: usize) -> Option<Axis>;

    /// Jet pT spectrum for a centrality bin. Dijet spectra are additionally
    /// binned in asymmetry; inclusive spectra ignore `asymmetry`.
    fn get_jet_spectrum(&self, inclusive: bool, centrality: usize, asymmetry: usize) -> Option<Distribution>;
}

/// Raw input produced by the histogramming step: one jet-track source table per
/// category plus jet pT spectra per analysis bin.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawInput {
    /// Jet-track tables keyed by category name.
    #[serde(default)]
    pub tables: BTreeMap<String, SourceTable>,
    /// Dijet leading-jet pT spectra keyed by [`spectrum_key`].
    #[serde(default)]
    pub dijet_spectra: BTreeMap<String, Distribution>,
    /// Inclusive jet pT spectra keyed by [`spectrum_key`] with no asymmetry.
    #[serde(default)]
    pub inclusive_spectra: BTreeMap<String, Distribution>,
}

/// Key of a jet spectrum in [`RawInput`].
pub fn spectrum_key(centrality: usize, asymmetry: Option<usize>) -> String {
    match asymmetry {
        Some(a) => format!("C{centrality}A{a}"),
        None => format!("C{centrality}"),
    }
}

impl RawInput {
    /// Load from a JSON file and check every table's layout.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let bytes = std::fs::read(path.as_ref())?;
        let raw: Self = serde_json::from_slice(&bytes)?;
        for table in raw.tables.values() {
            table.validate()?;
        }
        Ok(raw)
    }

    /// Write to a JSON file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let json = serde_json::to_string(self)?;
        std::fs::write(path.as_ref(), json)?;
        Ok(())
    }
}

impl IngestionProvider for RawInput {
    fn get_distribution(
        &self,
        dataset: &str,
        projected_axes: &[usize],
        restriction_axes: &[usize],
        low_indices: &[usize],
        high_indices: &[usize],
    ) -> Result<Option<Distribution>> {
        match self.tables.get(dataset) {
            Some(table) => table.project(projected_axes, restriction_axes, low_indices, high_indices).map(Some),
            None => Ok(None),
        }
    }

    fn reference_axis(&self, dataset: &str, axis: usize) -> Option<Axis> {
        self.tables.get(dataset).and_then(|t| t.axes.get(axis).cloned())
    }

    fn get_jet_spectrum(&self, inclusive: bool, centrality: usize, asymmetry: usize) -> Option<Distribution> {
        if inclusive {
            self.inclusive_spectra.get(&spectrum_key(centrality, None)).cloned()
        } else {
            self.dijet_spectra.get(&spectrum_key(centrality, Some(asymmetry))).cloned()
        }
    }
}
