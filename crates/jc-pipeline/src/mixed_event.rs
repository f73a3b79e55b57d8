//! Ingestion of same/mixed-event correlations and the mixed-event correction.
//!
//! The mixed event carries the pair-acceptance shape. It is normalized to unity
//! around Δη = 0 and divided out of the same event; the result is then
//! normalized per jet by the reference jet pT spectrum.

use crate::config::{MixedEventConfig, MixedEventNormalization, PipelineConfig};
use crate::overrides::OverrideTable;
use crate::store::{Product, Store};
use jc_core::{BinCoordinate, Category, DatasetKind, Error, Result, Stage};
use jc_fit::{DataPoint, constant_fit};
use jc_hist::source::{MIXED_EVENT_BIN, SAME_EVENT_BIN, axes};
use jc_hist::{BinSpace, Distribution, IngestionProvider};

/// Bin-space resolver for a category's source table.
///
/// Fails with [`Error::MissingDistribution`] when the table or one of its
/// reference axes is absent.
pub fn bin_space(
    config: &PipelineConfig,
    provider: &dyn IngestionProvider,
    category: Category,
) -> Result<BinSpace> {
    let axis = |a: usize| {
        provider
            .reference_axis(category.name(), a)
            .ok_or_else(|| Error::MissingDistribution(format!("no axis {a} in source table '{category}'")))
    };
    BinSpace::new(
        config.bins.clone(),
        axis(axes::CENTRALITY)?,
        axis(axes::TRACK_PT)?,
        axis(axes::ASYMMETRY)?,
        config.last_centrality(),
    )
}

/// Project the same-event and mixed-event correlations of one bin.
pub fn ingest(coord: &BinCoordinate, provider: &dyn IngestionProvider, space: &BinSpace) -> Result<Vec<Product>> {
    let (t_lo, t_hi) = space.track_pt_window(coord.track_pt)?;
    let (a_lo, a_hi) = space.asymmetry_window(coord.asymmetry)?;
    let (c_lo, c_hi) = space.centrality_window(coord.centrality)?;
    let restriction = [axes::TRACK_PT, axes::ASYMMETRY, axes::CENTRALITY, axes::SAME_MIXED];

    let mut out = Vec::with_capacity(2);
    for (stage, bin) in [(Stage::SameEvent, SAME_EVENT_BIN), (Stage::MixedEvent, MIXED_EVENT_BIN)] {
        let dist = provider
            .get_distribution(
                coord.category.name(),
                &[axes::DELTA_PHI, axes::DELTA_ETA],
                &restriction,
                &[t_lo, a_lo, c_lo, bin],
                &[t_hi, a_hi, c_hi, bin],
            )?
            .ok_or_else(|| Error::MissingDistribution(format!("{stage} for {coord}")))?;
        out.push(Product::correlation(stage, *coord, dist));
    }
    Ok(out)
}

/// Mixed-event normalization constant: a constant fitted to the Δφ-summed Δη
/// rows inside the fit region, per Δφ bin.
pub fn mixed_event_scale(mixed: &Distribution, fit_region: f64) -> Result<f64> {
    let yaxis = mixed
        .y
        .as_ref()
        .ok_or_else(|| Error::Validation(format!("mixed event '{}' is not two-dimensional", mixed.name)))?;
    let nx = mixed.nx();
    let points: Vec<DataPoint> = (0..yaxis.n_bins())
        .filter(|&iy| yaxis.center(iy).abs() < fit_region)
        .map(|iy| {
            let (sum, var) = (0..nx).fold((0.0, 0.0), |(s, v), ix| (s + mixed.value(ix, iy), v + mixed.variance(ix, iy)));
            DataPoint::new(yaxis.center(iy), sum, var.sqrt())
        })
        .collect();
    if points.is_empty() {
        return Err(Error::Computation(format!("no Δη rows within |Δη| < {fit_region} in '{}'", mixed.name)));
    }
    let scale = constant_fit(&points)?.parameters[0] / nx as f64;
    if !scale.is_finite() || scale <= 0.0 {
        return Err(Error::Computation(format!("non-positive mixed-event scale {scale} for '{}'", mixed.name)));
    }
    Ok(scale)
}

fn smooth_rows(mixed: &mut Distribution, keep_below: Option<f64>) {
    let Some(yaxis) = mixed.y.clone() else { return };
    let nx = mixed.nx();
    for iy in 0..yaxis.n_bins() {
        if keep_below.is_some_and(|limit| yaxis.center(iy).abs() < limit) {
            continue;
        }
        let sum: f64 = (0..nx).map(|ix| mixed.value(ix, iy)).sum();
        let var: f64 = (0..nx).map(|ix| mixed.variance(ix, iy)).sum();
        let n = nx as f64;
        for ix in 0..nx {
            mixed.set(ix, iy, sum / n, var / (n * n));
        }
    }
}

/// Divide the same event by the normalized mixed event.
///
/// Returns `(corrected, normalized_mixed)`. With [`MixedEventNormalization::Average`]
/// the scale is the mean of this bin's and the connected bin's; without a
/// connected mixed event the bin's own scale is used.
pub fn ratio_correct(
    same: &Distribution,
    mixed: &Distribution,
    connected_mixed: Option<&Distribution>,
    peak_visible: bool,
    params: &MixedEventConfig,
) -> Result<(Distribution, Distribution)> {
    let own = mixed_event_scale(mixed, params.fit_region)?;
    let scale = match (params.normalization, connected_mixed) {
        (MixedEventNormalization::Average, Some(other)) => 0.5 * (own + mixed_event_scale(other, params.fit_region)?),
        _ => own,
    };

    let mut normalized = mixed.clone();
    if params.smooth {
        smooth_rows(&mut normalized, peak_visible.then_some(params.fit_region));
    }
    normalized.scale(1.0 / scale);

    let mut corrected = same.clone();
    corrected.divide(&normalized)?;
    Ok((corrected, normalized))
}

/// Mixed-event correction of every selected bin.
#[derive(Debug, Clone)]
pub struct MixedEventCorrector<'a> {
    config: &'a PipelineConfig,
    dataset: DatasetKind,
    fit_regions: OverrideTable<f64>,
}

impl<'a> MixedEventCorrector<'a> {
    /// Corrector with the configured fit-region exceptions.
    pub fn new(config: &'a PipelineConfig, dataset: DatasetKind) -> Self {
        let fit_regions = config.overrides.mixed_event_fit_region.iter().map(|o| (o.bins, o.fit_region)).collect();
        Self { config, dataset, fit_regions }
    }

    /// Whether the jet peak reaches into the normalization region of the
    /// mixed event: the lowest track pT bin of central PbPb, and the two lowest
    /// track pT bins of pp.
    pub fn peak_visible(&self, coord: &BinCoordinate) -> bool {
        if self.dataset.is_pbpb() {
            coord.track_pt == 0 && coord.centrality <= 1
        } else {
            coord.track_pt <= 1
        }
    }

    /// Per-jet normalization `1 / N_jets` from the reference jet spectrum.
    pub fn scaling_factor(&self, coord: &BinCoordinate, provider: &dyn IngestionProvider) -> Result<f64> {
        let inclusive = coord.category.is_inclusive();
        let spectrum = provider
            .get_jet_spectrum(inclusive, coord.centrality, coord.asymmetry)
            .ok_or_else(|| Error::MissingDistribution(format!("jet spectrum for {coord}")))?;
        let n_jets = spectrum.sum_with_flows();
        if n_jets <= 0.0 {
            return Err(Error::MissingDistribution(format!("empty jet spectrum for {coord}")));
        }
        Ok(1.0 / n_jets)
    }

    /// Correct one bin; reads `SameEvent`/`MixedEvent` and writes
    /// `MixedEventCorrected` and `MixedEventNormalized`.
    pub fn process(
        &self,
        coord: &BinCoordinate,
        store: &Store,
        provider: &dyn IngestionProvider,
    ) -> Result<Vec<Product>> {
        let same = store
            .correlation(Stage::SameEvent, coord)
            .ok_or_else(|| Error::MissingDistribution(format!("same event for {coord}")))?;
        let scaling = self.scaling_factor(coord, provider)?;

        if !self.config.corrections.mixed_event {
            let mut corrected = same.clone();
            corrected.scale(scaling);
            return Ok(vec![Product::correlation(Stage::MixedEventCorrected, *coord, corrected)]);
        }

        let mixed = store
            .correlation(Stage::MixedEvent, coord)
            .ok_or_else(|| Error::MissingDistribution(format!("mixed event for {coord}")))?;
        let connected = store.correlation(Stage::MixedEvent, &coord.with_category(coord.category.connected()));
        let params = MixedEventConfig {
            fit_region: self.fit_regions.lookup(coord).copied().unwrap_or(self.config.mixed_event.fit_region),
            ..self.config.mixed_event.clone()
        };

        let (mut corrected, normalized) = ratio_correct(same, mixed, connected, self.peak_visible(coord), &params)?;
        corrected.scale(scaling);
        Ok(vec![
            Product::correlation(Stage::MixedEventNormalized, *coord, normalized),
            Product::correlation(Stage::MixedEventCorrected, *coord, corrected),
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FitRegionOverride;
    use crate::overrides::BinPattern;
    use approx::assert_relative_eq;
    use jc_hist::Axis;

    fn row(values: &[f64]) -> Distribution {
        let x = Axis::uniform(values.len(), -1.0, 1.0).unwrap();
        let y = Axis::uniform(1, -0.1, 0.1).unwrap();
        Distribution::from_values_2d("c", x, y, values.to_vec(), values.to_vec()).unwrap()
    }

    #[test]
    fn flat_mixed_event_normalizes_to_one() {
        let same = row(&[10.0, 20.0, 15.0]);
        let mixed = row(&[5.0, 5.0, 5.0]);
        let (corrected, normalized) =
            ratio_correct(&same, &mixed, Some(&mixed), false, &MixedEventConfig::default()).unwrap();
        for v in &normalized.values {
            assert_relative_eq!(*v, 1.0, epsilon = 1e-12);
        }
        assert_relative_eq!(corrected.values[1], 20.0, epsilon = 1e-12);
        assert!(corrected.values.iter().all(|v| *v >= 0.0));
    }

    #[test]
    fn average_uses_connected_scale() {
        let same = row(&[4.0, 4.0]);
        let mixed = row(&[2.0, 2.0]);
        let connected = row(&[6.0, 6.0]);
        let params = MixedEventConfig { normalization: MixedEventNormalization::Average, ..Default::default() };
        let (corrected, _) = ratio_correct(&same, &mixed, Some(&connected), false, &params).unwrap();
        // scale 4, normalized 0.5
        assert_relative_eq!(corrected.values[0], 8.0, epsilon = 1e-12);
        let (single, _) = ratio_correct(&same, &mixed, None, false, &params).unwrap();
        assert_relative_eq!(single.values[0], 4.0, epsilon = 1e-12);
    }

    #[test]
    fn fit_region_without_rows_fails_per_bin() {
        let x = Axis::uniform(2, -1.0, 1.0).unwrap();
        let y = Axis::new(vec![0.5, 1.0]).unwrap();
        let mixed = Distribution::from_values_2d("m", x, y, vec![1.0, 1.0], vec![1.0, 1.0]).unwrap();
        let err = mixed_event_scale(&mixed, 0.2).unwrap_err();
        assert!(err.is_per_bin());
    }

    #[test]
    fn smoothing_keeps_peak_rows() {
        let x = Axis::uniform(2, -1.0, 1.0).unwrap();
        let y = Axis::new(vec![-1.0, -0.1, 0.1, 1.0]).unwrap();
        let values = vec![1.0, 3.0, 2.0, 4.0, 5.0, 7.0];
        let mut d = Distribution::from_values_2d("m", x, y, values.clone(), values).unwrap();
        smooth_rows(&mut d, Some(0.2));
        assert_eq!(d.values, vec![2.0, 2.0, 2.0, 4.0, 6.0, 6.0]);
    }

    #[test]
    fn peak_visibility_rules() {
        let pbpb = PipelineConfig::default();
        let c = MixedEventCorrector::new(&pbpb, DatasetKind::PbPb);
        assert!(c.peak_visible(&BinCoordinate::new(Category::TrackLeadingJet, 0, 1, 0, 3)));
        assert!(!c.peak_visible(&BinCoordinate::new(Category::TrackLeadingJet, 0, 2, 0, 3)));
        let pp = MixedEventCorrector::new(&pbpb, DatasetKind::Pp);
        assert!(pp.peak_visible(&BinCoordinate::new(Category::TrackLeadingJet, 0, 0, 1, 3)));
        assert!(!pp.peak_visible(&BinCoordinate::new(Category::TrackLeadingJet, 0, 0, 2, 3)));
    }

    #[test]
    fn fit_region_override_is_per_bin() {
        let mut cfg = PipelineConfig::default();
        cfg.overrides.mixed_event_fit_region.push(FitRegionOverride {
            bins: BinPattern { centrality: Some(2), ..Default::default() },
            fit_region: 0.4,
        });
        let c = MixedEventCorrector::new(&cfg, DatasetKind::PbPb);
        assert_eq!(c.fit_regions.lookup(&BinCoordinate::new(Category::TrackLeadingJet, 0, 2, 0, 3)), Some(&0.4));
        assert_eq!(c.fit_regions.lookup(&BinCoordinate::new(Category::TrackLeadingJet, 0, 1, 0, 3)), None);
    }
}
