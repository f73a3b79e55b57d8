//! Tracking residual correction: divides out the residual track-reconstruction
//! efficiency map of each bin.

use crate::config::PipelineConfig;
use crate::overrides::{AsymmetryRedirect, OverrideTable, builtin_tracking_substitutions};
use crate::store::{Product, Store};
use jc_core::{BinCoordinate, Category, Error, Result, Stage};
use jc_hist::CorrectionProvider;

/// Tracking residual correction of every selected bin.
pub struct TrackingResidualCorrector<'a> {
    config: &'a PipelineConfig,
    provider: &'a dyn CorrectionProvider,
    substitutions: OverrideTable<AsymmetryRedirect>,
}

impl<'a> TrackingResidualCorrector<'a> {
    /// Corrector using `provider`; configured substitutions follow the built-in one.
    pub fn new(config: &'a PipelineConfig, provider: &'a dyn CorrectionProvider) -> Self {
        let mut substitutions = builtin_tracking_substitutions(config.bins.n_centrality().saturating_sub(1));
        for o in &config.overrides.tracking_substitutions {
            substitutions.push(o.bins, o.use_asymmetry);
        }
        Self { config, provider, substitutions }
    }

    /// False when the step is disabled or nothing is loaded.
    pub fn is_active(&self) -> bool {
        self.config.corrections.tracking && self.provider.is_ready()
    }

    /// Asymmetry bin whose correction is used for `coord`.
    pub fn correction_asymmetry(&self, coord: &BinCoordinate) -> usize {
        self.substitutions
            .lookup(coord)
            .map_or(coord.asymmetry, |r| r.resolve(self.config.n_asymmetry()))
    }

    /// Correct one bin. Uncorrected-track categories pass through untouched.
    pub fn process(&self, coord: &BinCoordinate, store: &Store) -> Result<Vec<Product>> {
        if matches!(coord.category, Category::UncorrectedTrackLeadingJet | Category::UncorrectedTrackSubleadingJet) {
            return Ok(Vec::new());
        }
        let corrected = store
            .correlation(Stage::Corrected, coord)
            .ok_or_else(|| Error::MissingDistribution(format!("corrected correlation for {coord}")))?;
        let asymmetry = self.correction_asymmetry(coord);
        let mut map = self
            .provider
            .get_correction(coord.category, coord.centrality, coord.track_pt, asymmetry)
            .ok_or_else(|| Error::MissingDistribution(format!("tracking correction for {coord}")))?;
        map.zero_variances();

        let mut out = corrected.clone();
        out.divide(&map)?;
        if self.config.corrections.residual_scale {
            let scale = self.provider.residual_scale(coord.category, coord.centrality, coord.track_pt, asymmetry);
            out.scale(scale);
        }
        Ok(vec![Product::correlation(Stage::TrackingCorrected, *coord, out)])
    }
}
