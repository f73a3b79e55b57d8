//! Radial jet-shape profiles.
//!
//! Every Δφ×Δη cell of the signal correlation is assigned to the ΔR ring that
//! contains its centre, ΔR = √(Δφ² + Δη²). The per-ring yield is divided by the
//! ring width (or area) to give the profile.

use crate::config::{PipelineConfig, RingNormalization};
use crate::overrides::{CleaningPoint, OverrideTable, builtin_cleaning};
use crate::store::{Product, Store};
use jc_core::{BinCoordinate, DatasetKind, DistributionKind, Error, Result, Stage};
use jc_hist::{Axis, Distribution};
use std::f64::consts::PI;

/// Measure of ring `k` under `normalization`.
fn ring_measure(r: &Axis, k: usize, normalization: RingNormalization) -> f64 {
    match normalization {
        RingNormalization::BinWidth => r.width(k),
        RingNormalization::BinArea => PI * (r.bin_high(k).powi(2) - r.bin_low(k).powi(2)),
    }
}

/// Radial profile, cell count per ring and ring-membership map (ring index + 1,
/// zero outside the last ring) of a 2-D correlation.
pub fn radial_profile(
    signal: &Distribution,
    r: &Axis,
    normalization: RingNormalization,
) -> Result<(Distribution, Distribution, Distribution)> {
    let yaxis = signal
        .y
        .as_ref()
        .ok_or_else(|| Error::Validation(format!("'{}' is not two-dimensional", signal.name)))?;
    let mut profile = Distribution::new_1d("profile", r.clone());
    let mut counts = Distribution::new_1d("counts", r.clone());
    let mut bin_map = signal.zeroed_like("bin map");

    for iy in 0..yaxis.n_bins() {
        let eta = yaxis.center(iy);
        for ix in 0..signal.nx() {
            let phi = signal.x.center(ix);
            let Some(k) = r.find_bin(phi.hypot(eta)) else { continue };
            let area = signal.x.width(ix) * yaxis.width(iy);
            profile.values[k] += signal.value(ix, iy) * area;
            profile.variances[k] += signal.variance(ix, iy) * area * area;
            counts.values[k] += 1.0;
            bin_map.set(ix, iy, (k + 1) as f64, 0.0);
        }
    }

    for k in 0..r.n_bins() {
        let m = ring_measure(r, k, normalization);
        profile.values[k] /= m;
        profile.variances[k] /= m * m;
    }
    Ok((profile, counts, bin_map))
}

/// Replace profile values by hand-tuned ones; variances are kept.
pub fn clean_profile(profile: &mut Distribution, points: &[CleaningPoint]) {
    for &(bin, value) in points {
        if let Some(i) = bin.checked_sub(1).filter(|&i| i < profile.nx()) {
            profile.values[i] = value;
        }
    }
}

/// Scale a group of profiles (one per track pT bin) so that their sum integrates
/// to one over rings ending at or below `radius`.
pub fn normalize_profiles(
    profiles: &[&Distribution],
    normalization: RingNormalization,
    radius: f64,
) -> Result<Vec<Distribution>> {
    let tolerance = 1e-9 * radius.abs().max(1.0);
    let total: f64 = profiles
        .iter()
        .map(|p| {
            (0..p.nx())
                .filter(|&k| p.x.bin_high(k) <= radius + tolerance)
                .map(|k| p.values[k] * ring_measure(&p.x, k, normalization))
                .sum::<f64>()
        })
        .sum();
    if !total.is_finite() || total == 0.0 {
        return Err(Error::Computation(format!("jet-shape integral {total} cannot be normalized")));
    }
    Ok(profiles
        .iter()
        .map(|p| {
            let mut out = (*p).clone();
            out.scale(1.0 / total);
            out
        })
        .collect())
}

/// Jet-shape extraction of every selected bin.
#[derive(Debug, Clone)]
pub struct JetShapeCalculator<'a> {
    config: &'a PipelineConfig,
    r_axis: Axis,
    cleaning: OverrideTable<Vec<CleaningPoint>>,
}

impl<'a> JetShapeCalculator<'a> {
    /// Calculator with the built-in and configured cleaning entries.
    pub fn new(config: &'a PipelineConfig, dataset: DatasetKind) -> Result<Self> {
        let mut cleaning = builtin_cleaning(dataset);
        for o in &config.overrides.cleaning {
            cleaning.push(o.bins, o.points.clone());
        }
        Ok(Self { config, r_axis: config.r_axis()?, cleaning })
    }

    /// Profile products of one bin, read from `Signal`.
    pub fn process(&self, coord: &BinCoordinate, store: &Store) -> Result<Vec<Product>> {
        let signal = store
            .correlation(Stage::Signal, coord)
            .ok_or_else(|| Error::MissingDistribution(format!("signal correlation for {coord}")))?;
        let (mut profile, counts, bin_map) =
            radial_profile(signal, &self.r_axis, self.config.jet_shape.normalization)?;
        if self.config.corrections.manual_cleaning
            && let Some(points) = self.cleaning.lookup(coord)
        {
            clean_profile(&mut profile, points);
        }
        Ok(vec![
            Product::new(Stage::JetShape, DistributionKind::RadialProfile, *coord, profile),
            Product::new(Stage::JetShape, DistributionKind::RadialProfileCounts, *coord, counts),
            Product::new(Stage::JetShape, DistributionKind::RadialBinMap, *coord, bin_map),
        ])
    }

    /// Normalize the profiles of one `(category, asymmetry, centrality)` group.
    /// `group` lists the track pT bins in order.
    pub fn normalize_group(&self, group: &[BinCoordinate], store: &Store) -> Result<Vec<Product>> {
        let present: Vec<(BinCoordinate, &Distribution)> = group
            .iter()
            .filter_map(|c| store.get(Stage::JetShape, DistributionKind::RadialProfile, c).map(|d| (*c, d)))
            .collect();
        if present.is_empty() {
            return Err(Error::MissingDistribution(format!("no radial profiles for {:?}", group.first())));
        }
        let profiles: Vec<&Distribution> = present.iter().map(|(_, d)| *d).collect();
        let normalized = normalize_profiles(
            &profiles,
            self.config.jet_shape.normalization,
            self.config.jet_shape.normalization_radius,
        )?;
        Ok(present
            .into_iter()
            .zip(normalized)
            .map(|((c, _), d)| Product::new(Stage::NormalizedJetShape, DistributionKind::RadialProfile, c, d))
            .collect())
    }
}
