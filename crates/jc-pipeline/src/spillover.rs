//! Spillover correction: subtracts the jet-peak yield that underlying-event
//! fluctuations move into low track pT bins.

use crate::config::PipelineConfig;
use crate::overrides::{OverrideTable, builtin_scaled_spillover_bins};
use crate::store::{Product, Store};
use jc_core::{BinCoordinate, Error, JetLeg, Result, Stage};
use jc_hist::CorrectionProvider;

/// Exclusive upper track pT bin corrected for subleading jets, per centrality bin.
const SUBLEADING_TRACK_PT_CUTOFF: [usize; 3] = [4, 3, 2];

/// Spillover correction of every selected bin.
pub struct SpilloverCorrector<'a> {
    config: &'a PipelineConfig,
    provider: &'a dyn CorrectionProvider,
    scaled_bins: OverrideTable<bool>,
}

impl<'a> SpilloverCorrector<'a> {
    /// Corrector using `provider`.
    pub fn new(config: &'a PipelineConfig, provider: &'a dyn CorrectionProvider) -> Self {
        Self { config, provider, scaled_bins: builtin_scaled_spillover_bins(config.n_asymmetry()) }
    }

    /// False when the step is disabled or nothing is loaded.
    pub fn is_active(&self) -> bool {
        self.config.corrections.spillover && self.provider.is_ready()
    }

    /// Whether `coord` receives a spillover correction at all.
    pub fn applies_to(&self, coord: &BinCoordinate) -> bool {
        if coord.track_pt + 1 >= self.config.bins.n_track_pt() {
            return false;
        }
        match coord.category.leg() {
            JetLeg::Subleading => {
                SUBLEADING_TRACK_PT_CUTOFF.get(coord.centrality).is_some_and(|&cut| coord.track_pt < cut)
            }
            JetLeg::Leading | JetLeg::Inclusive => true,
        }
    }

    /// Correct one bin.
    pub fn process(&self, coord: &BinCoordinate, store: &Store) -> Result<Vec<Product>> {
        if !self.applies_to(coord) {
            return Ok(Vec::new());
        }
        let corrected = store
            .correlation(Stage::Corrected, coord)
            .ok_or_else(|| Error::MissingDistribution(format!("corrected correlation for {coord}")))?;

        let (cat, c, t, a) = (coord.category, coord.centrality, coord.track_pt, coord.asymmetry);
        let scaled = self
            .scaled_bins
            .lookup(coord)
            .copied()
            .unwrap_or(false)
            .then(|| self.provider.get_scaled_correction(cat, c, t, a))
            .flatten();
        let mut map = scaled
            .or_else(|| self.provider.get_correction(cat, c, t, a))
            .ok_or_else(|| Error::MissingDistribution(format!("spillover correction for {coord}")))?;
        map.zero_variances();

        let mut out = corrected.clone();
        out.subtract(&map)?;
        Ok(vec![Product::correlation(Stage::SpilloverCorrected, *coord, out)])
    }
}
