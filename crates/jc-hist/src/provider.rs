//! External correction providers (fragmentation bias, spillover, tracking residuals).

use crate::distribution::Distribution;
use jc_core::{Category, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Which flavour of a correction to fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
pub enum CorrectionVariant {
    /// Regular correction
    #[default]
    Nominal,
    /// Correction rescaled to the momentum imbalance of the bin
    AsymmetryScaled,
}

/// Source of pre-computed per-bin correction maps.
pub trait CorrectionProvider: Send + Sync {
    /// True when corrections are loaded.
    fn is_ready(&self) -> bool;

    /// Correction map for a bin.
    fn get_correction(
        &self,
        category: Category,
        centrality: usize,
        track_pt: usize,
        asymmetry: usize,
    ) -> Option<Distribution>;

    /// Asymmetry-scaled correction map for a bin.
    fn get_scaled_correction(
        &self,
        _category: Category,
        _centrality: usize,
        _track_pt: usize,
        _asymmetry: usize,
    ) -> Option<Distribution> {
        None
    }

    /// Extra multiplicative scale for residual corrections.
    fn residual_scale(&self, _category: Category, _centrality: usize, _track_pt: usize, _asymmetry: usize) -> f64 {
        1.0
    }
}

/// One stored correction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorrectionEntry {
    /// Category the correction applies to
    pub category: Category,
    /// Centrality bin
    pub centrality: usize,
    /// Track pT bin
    pub track_pt: usize,
    /// Asymmetry bin (integrated = number of asymmetry bins)
    pub asymmetry: usize,
    /// Correction flavour
    #[serde(default)]
    pub variant: CorrectionVariant,
    /// Correction map
    pub distribution: Distribution,
    /// Optional residual scale
    #[serde(default)]
    pub residual_scale: Option<f64>,
}

type Key = (Category, usize, usize, usize, CorrectionVariant);

/// A file of correction maps. Lookups with an asymmetry bin that has no entry
/// fall back to the imbalance-integrated entry.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "CorrectionFile", into = "CorrectionFile")]
pub struct CorrectionSet {
    name: String,
    integrated_asymmetry: usize,
    entries: BTreeMap<Key, CorrectionEntry>,
}

#[derive(Serialize, Deserialize)]
struct CorrectionFile {
    name: String,
    integrated_asymmetry: usize,
    entries: Vec<CorrectionEntry>,
}

impl From<CorrectionFile> for CorrectionSet {
    fn from(f: CorrectionFile) -> Self {
        let mut set = CorrectionSet::new(f.name, f.integrated_asymmetry);
        for e in f.entries {
            set.insert(e);
        }
        set
    }
}

impl From<CorrectionSet> for CorrectionFile {
    fn from(s: CorrectionSet) -> Self {
        CorrectionFile {
            name: s.name,
            integrated_asymmetry: s.integrated_asymmetry,
            entries: s.entries.into_values().collect(),
        }
    }
}

impl CorrectionSet {
    /// Empty set. `integrated_asymmetry` is the asymmetry index used as fallback.
    pub fn new(name: impl Into<String>, integrated_asymmetry: usize) -> Self {
        Self { name: name.into(), integrated_asymmetry, entries: BTreeMap::new() }
    }

    /// Name of the set.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of stored corrections.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when no correction is stored.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Add or replace a correction.
    pub fn insert(&mut self, entry: CorrectionEntry) {
        let key = (entry.category, entry.centrality, entry.track_pt, entry.asymmetry, entry.variant);
        self.entries.insert(key, entry);
    }

    fn lookup(
        &self,
        category: Category,
        centrality: usize,
        track_pt: usize,
        asymmetry: usize,
        variant: CorrectionVariant,
    ) -> Option<&CorrectionEntry> {
        self.entries
            .get(&(category, centrality, track_pt, asymmetry, variant))
            .or_else(|| self.entries.get(&(category, centrality, track_pt, self.integrated_asymmetry, variant)))
    }

    /// Load from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let bytes = std::fs::read(path.as_ref())?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    /// Write to a JSON file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        std::fs::write(path.as_ref(), serde_json::to_string(self)?)?;
        Ok(())
    }
}

impl CorrectionProvider for CorrectionSet {
    fn is_ready(&self) -> bool {
        !self.entries.is_empty()
    }

    fn get_correction(
        &self,
        category: Category,
        centrality: usize,
        track_pt: usize,
        asymmetry: usize,
    ) -> Option<Distribution> {
        self.lookup(category, centrality, track_pt, asymmetry, CorrectionVariant::Nominal)
            .map(|e| e.distribution.clone())
    }

    fn get_scaled_correction(
        &self,
        category: Category,
        centrality: usize,
        track_pt: usize,
        asymmetry: usize,
    ) -> Option<Distribution> {
        self.lookup(category, centrality, track_pt, asymmetry, CorrectionVariant::AsymmetryScaled)
            .map(|e| e.distribution.clone())
    }

    fn residual_scale(&self, category: Category, centrality: usize, track_pt: usize, asymmetry: usize) -> f64 {
        self.lookup(category, centrality, track_pt, asymmetry, CorrectionVariant::Nominal)
            .and_then(|e| e.residual_scale)
            .unwrap_or(1.0)
    }
}

/// Provider with nothing loaded.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoCorrection;

impl CorrectionProvider for NoCorrection {
    fn is_ready(&self) -> bool {
        false
    }

    fn get_correction(&self, _: Category, _: usize, _: usize, _: usize) -> Option<Distribution> {
        None
    }
}
