//! Fragmentation-bias (JFF) correction of the background-subtracted yield.

use crate::config::PipelineConfig;
use crate::overrides::{AsymmetryRedirect, OverrideTable};
use crate::store::{Product, Store};
use jc_core::{BinCoordinate, Error, Result, Stage};
use jc_hist::CorrectionProvider;

/// Fragmentation-bias correction of every selected bin.
pub struct FragmentationBiasCorrector<'a> {
    config: &'a PipelineConfig,
    provider: &'a dyn CorrectionProvider,
    substitutions: OverrideTable<AsymmetryRedirect>,
}

impl<'a> FragmentationBiasCorrector<'a> {
    /// Corrector using `provider` and the configured substitutions.
    pub fn new(config: &'a PipelineConfig, provider: &'a dyn CorrectionProvider) -> Self {
        let substitutions = config.overrides.jff_substitutions.iter().map(|o| (o.bins, o.use_asymmetry)).collect();
        Self { config, provider, substitutions }
    }

    /// False when the step is disabled or nothing is loaded.
    pub fn is_active(&self) -> bool {
        self.config.corrections.jff && self.provider.is_ready()
    }

    /// Asymmetry bin whose correction is used for `coord`.
    pub fn correction_asymmetry(&self, coord: &BinCoordinate) -> usize {
        self.substitutions
            .lookup(coord)
            .map_or(coord.asymmetry, |r| r.resolve(self.config.n_asymmetry()))
    }

    /// Write `Signal` for one bin. Without an active provider, or without a
    /// correction for the bin, the background-subtracted yield is copied.
    pub fn process(&self, coord: &BinCoordinate, store: &Store) -> Result<Vec<Product>> {
        let subtracted = store
            .correlation(Stage::BackgroundSubtracted, coord)
            .ok_or_else(|| Error::MissingDistribution(format!("background-subtracted correlation for {coord}")))?;
        let mut signal = subtracted.clone();
        if self.is_active() {
            let asymmetry = self.correction_asymmetry(coord);
            match self.provider.get_correction(coord.category, coord.centrality, coord.track_pt, asymmetry) {
                Some(mut map) => {
                    map.zero_variances();
                    signal.subtract(&map)?;
                }
                None => log::debug!("no fragmentation-bias correction for {coord}"),
            }
        }
        Ok(vec![Product::correlation(Stage::Signal, *coord, signal)])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SubstitutionOverride;
    use crate::overrides::BinPattern;
    use jc_core::{Category, DistributionKind};
    use jc_hist::{Axis, CorrectionEntry, CorrectionSet, CorrectionVariant, Distribution, NoCorrection};

    fn flat(v: f64) -> Distribution {
        let x = Axis::uniform(2, 0.0, 1.0).unwrap();
        let y = Axis::uniform(2, -1.0, 1.0).unwrap();
        Distribution::from_values_2d("d", x, y, vec![v; 4], vec![0.5; 4]).unwrap()
    }

    fn store(coord: BinCoordinate) -> Store {
        let mut s = Store::new();
        s.insert(Stage::BackgroundSubtracted, DistributionKind::DeltaEtaDeltaPhi, coord, flat(3.0));
        s
    }

    fn provider() -> CorrectionSet {
        let mut set = CorrectionSet::new("jff", 3);
        for (asymmetry, v) in [(0, 1.0), (1, 2.0)] {
            set.insert(CorrectionEntry {
                category: Category::TrackLeadingJet,
                centrality: 0,
                track_pt: 0,
                asymmetry,
                variant: CorrectionVariant::Nominal,
                distribution: flat(v),
                residual_scale: None,
            });
        }
        set
    }

    #[test]
    fn copies_without_provider() {
        let cfg = PipelineConfig::default();
        let coord = BinCoordinate::new(Category::TrackLeadingJet, 0, 0, 0, 3);
        let out = FragmentationBiasCorrector::new(&cfg, &NoCorrection).process(&coord, &store(coord)).unwrap();
        assert_eq!(out[0].stage, Stage::Signal);
        assert_eq!(out[0].distribution.values, vec![3.0; 4]);
    }

    #[test]
    fn subtracts_redirected_correction() {
        let mut cfg = PipelineConfig::default();
        let coord = BinCoordinate::new(Category::TrackLeadingJet, 0, 0, 0, 3);
        let p = provider();
        let out = FragmentationBiasCorrector::new(&cfg, &p).process(&coord, &store(coord)).unwrap();
        assert_eq!(out[0].distribution.values, vec![2.0; 4]);
        assert_eq!(out[0].distribution.variances, vec![0.5; 4]);

        cfg.overrides.jff_substitutions.push(SubstitutionOverride {
            bins: BinPattern::exact(Category::TrackLeadingJet, 0, 0, 0),
            use_asymmetry: AsymmetryRedirect::Bin(1),
        });
        let out = FragmentationBiasCorrector::new(&cfg, &p).process(&coord, &store(coord)).unwrap();
        assert_eq!(out[0].distribution.values, vec![1.0; 4]);
    }
}
