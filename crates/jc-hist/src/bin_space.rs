//! Mapping of analysis bin borders onto the fine-grained axes of the source tables.

use crate::distribution::Axis;
use jc_core::{Error, Result};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// Offset applied to the upper index of a merged window so that the bin starting
/// at the upper border is not counted twice.
pub const DUPLICATE_REMOVER: i64 = -1;

/// Reference axis on which physical borders are resolved.
#[derive(Debug, Clone, PartialEq)]
pub struct BinAxis {
    reference: Axis,
}

impl BinAxis {
    /// Wrap a reference axis.
    pub fn new(reference: Axis) -> Self {
        Self { reference }
    }

    /// The wrapped axis.
    pub fn reference(&self) -> &Axis {
        &self.reference
    }

    /// Index of the reference bin that starts at (or contains) `border`.
    ///
    /// A border equal to the upper edge maps to `n_bins`.
    pub fn resolve_index(&self, border: f64) -> Result<usize> {
        if let Some(i) = self.reference.edge_index(border) {
            return Ok(i);
        }
        self.reference.find_bin(border).ok_or_else(|| {
            Error::InvalidBinRange(format!(
                "border {border} outside reference axis [{}, {}]",
                self.reference.low(),
                self.reference.high()
            ))
        })
    }

    /// Inclusive index window for `[low, high]` with `duplicate_offset` applied to
    /// the upper index. The upper index is clamped to the last reference bin.
    pub fn window_indices(&self, low: f64, high: f64, duplicate_offset: i64) -> Result<(usize, usize)> {
        let lo = self.resolve_index(low)?;
        let hi = self.resolve_index(high)? as i64 + duplicate_offset;
        let last = self.reference.n_bins() as i64 - 1;
        let hi = hi.min(last);
        if hi < lo as i64 || lo as i64 > last {
            return Err(Error::InvalidBinRange(format!("empty window [{low}, {high}]")));
        }
        Ok((lo, hi as usize))
    }

    /// Window covering the whole reference axis.
    pub fn full_window(&self) -> (usize, usize) {
        (0, self.reference.n_bins() - 1)
    }
}

/// Named Δφ windows used for Δη projections. The index of a window is its
/// angular sub-bin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DeltaPhiWindow {
    /// −π/2 < Δφ < 3π/2
    WholePhi,
    /// −π/2 < Δφ < π/2
    NearSide,
    /// π/2 < Δφ < 3π/2
    AwaySide,
    /// 1.2 < Δφ < 1.9
    BetweenPeaks,
}

impl DeltaPhiWindow {
    /// All windows, indexed by angular sub-bin.
    pub const ALL: [DeltaPhiWindow; 4] = [
        DeltaPhiWindow::WholePhi,
        DeltaPhiWindow::NearSide,
        DeltaPhiWindow::AwaySide,
        DeltaPhiWindow::BetweenPeaks,
    ];

    /// Angular sub-bin index of this window.
    pub fn sub_bin(self) -> usize {
        self as usize
    }

    /// Window for an angular sub-bin index.
    pub fn from_sub_bin(i: usize) -> Option<DeltaPhiWindow> {
        DeltaPhiWindow::ALL.get(i).copied()
    }

    /// Physical Δφ borders.
    pub fn borders(self) -> (f64, f64) {
        match self {
            DeltaPhiWindow::WholePhi => (-PI / 2.0, 3.0 * PI / 2.0),
            DeltaPhiWindow::NearSide => (-PI / 2.0, PI / 2.0),
            DeltaPhiWindow::AwaySide => (PI / 2.0, 3.0 * PI / 2.0),
            DeltaPhiWindow::BetweenPeaks => (1.2, 1.9),
        }
    }

    /// Short name.
    pub fn name(self) -> &'static str {
        match self {
            DeltaPhiWindow::WholePhi => "WholePhi",
            DeltaPhiWindow::NearSide => "NearSide",
            DeltaPhiWindow::AwaySide => "AwaySide",
            DeltaPhiWindow::BetweenPeaks => "BetweenPeaks",
        }
    }

    /// Resolve this window on a Δφ axis.
    pub fn resolve(self, delta_phi: &Axis) -> Result<(usize, usize)> {
        let (low, high) = self.borders();
        BinAxis::new(delta_phi.clone()).window_indices(low, high, DUPLICATE_REMOVER)
    }
}

/// Physical borders of the analysis bins.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BinBorders {
    /// Centrality borders (%).
    #[serde(default = "default_centrality_borders")]
    pub centrality: Vec<f64>,
    /// Track pT borders (GeV).
    #[serde(default = "default_track_pt_borders")]
    pub track_pt: Vec<f64>,
    /// Dijet momentum-imbalance borders.
    #[serde(default = "default_asymmetry_borders")]
    pub asymmetry: Vec<f64>,
}

fn default_centrality_borders() -> Vec<f64> {
    vec![0.0, 10.0, 30.0, 50.0, 90.0]
}

fn default_track_pt_borders() -> Vec<f64> {
    vec![0.7, 1.0, 2.0, 3.0, 4.0, 8.0, 12.0, 300.0]
}

fn default_asymmetry_borders() -> Vec<f64> {
    vec![0.0, 0.11, 0.22, 0.75]
}

impl Default for BinBorders {
    fn default() -> Self {
        Self {
            centrality: default_centrality_borders(),
            track_pt: default_track_pt_borders(),
            asymmetry: default_asymmetry_borders(),
        }
    }
}

impl BinBorders {
    /// Number of centrality bins.
    pub fn n_centrality(&self) -> usize {
        self.centrality.len().saturating_sub(1)
    }

    /// Number of track pT bins.
    pub fn n_track_pt(&self) -> usize {
        self.track_pt.len().saturating_sub(1)
    }

    /// Number of asymmetry bins; also the index of the integrated bin.
    pub fn n_asymmetry(&self) -> usize {
        self.asymmetry.len().saturating_sub(1)
    }

    /// Lower border of a track pT bin.
    pub fn track_pt_low(&self, bin: usize) -> Option<f64> {
        self.track_pt.get(bin).copied().filter(|_| bin < self.n_track_pt())
    }

    /// Check that every border list has at least one bin.
    pub fn validate(&self) -> Result<()> {
        for (name, borders) in
            [("centrality", &self.centrality), ("track pT", &self.track_pt), ("asymmetry", &self.asymmetry)]
        {
            if borders.len() < 2 || borders.windows(2).any(|w| !(w[1] > w[0])) {
                return Err(Error::Validation(format!("{name} borders must be increasing with at least 2 entries")));
            }
        }
        Ok(())
    }
}

/// Resolver from analysis bins to index windows on the source-table axes.
#[derive(Debug, Clone)]
pub struct BinSpace {
    borders: BinBorders,
    centrality: BinAxis,
    track_pt: BinAxis,
    asymmetry: BinAxis,
    last_centrality: usize,
}

impl BinSpace {
    /// Build the resolver. `last_centrality` is the last loaded centrality bin; its
    /// window keeps the final border bin.
    pub fn new(
        borders: BinBorders,
        centrality: Axis,
        track_pt: Axis,
        asymmetry: Axis,
        last_centrality: usize,
    ) -> Result<Self> {
        borders.validate()?;
        Ok(Self {
            last_centrality: last_centrality.min(borders.n_centrality() - 1),
            borders,
            centrality: BinAxis::new(centrality),
            track_pt: BinAxis::new(track_pt),
            asymmetry: BinAxis::new(asymmetry),
        })
    }

    /// Analysis borders.
    pub fn borders(&self) -> &BinBorders {
        &self.borders
    }

    /// Index window of centrality bin `bin`.
    pub fn centrality_window(&self, bin: usize) -> Result<(usize, usize)> {
        let (low, high) = pair(&self.borders.centrality, bin, "centrality")?;
        let offset = if bin == self.last_centrality { 0 } else { DUPLICATE_REMOVER };
        self.centrality.window_indices(low, high, offset)
    }

    /// Index window of track pT bin `bin`.
    pub fn track_pt_window(&self, bin: usize) -> Result<(usize, usize)> {
        let (low, high) = pair(&self.borders.track_pt, bin, "track pT")?;
        self.track_pt.window_indices(low, high, DUPLICATE_REMOVER)
    }

    /// Index window of asymmetry bin `bin`; the integrated bin spans the axis.
    pub fn asymmetry_window(&self, bin: usize) -> Result<(usize, usize)> {
        if bin >= self.borders.n_asymmetry() {
            return Ok(self.asymmetry.full_window());
        }
        let (low, high) = pair(&self.borders.asymmetry, bin, "asymmetry")?;
        self.asymmetry.window_indices(low, high, DUPLICATE_REMOVER)
    }
}

fn pair(borders: &[f64], bin: usize, what: &str) -> Result<(f64, f64)> {
    match (borders.get(bin), borders.get(bin + 1)) {
        (Some(&lo), Some(&hi)) => Ok((lo, hi)),
        _ => Err(Error::InvalidBinRange(format!("{what} bin {bin} out of range"))),
    }
}
