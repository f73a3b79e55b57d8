//! Seagull correction.
//!
//! Imperfect mixed-event normalization leaves a Δη-dependent "seagull" shape
//! in the background region between the near- and away-side peaks. The shape
//! is fitted on the Δη profile of that region and divided out of every Δφ
//! column.

use crate::config::{PipelineConfig, SeagullConfig};
use crate::overrides::{OverrideTable, SeagullVeto, builtin_seagull_methods, builtin_seagull_vetoes};
use crate::store::{Product, Store};
use jc_core::{BinCoordinate, DatasetKind, DistributionKind, Error, Result, Stage};
use jc_fit::{DataPoint, FitResult, ShapeModel, constant_fit};
use jc_hist::{BinAxis, DUPLICATE_REMOVER, Distribution};

/// Fit method and its use for one bin.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SeagullSettings {
    /// Method 0..=6
    pub method: u8,
    /// Veto
    pub veto: SeagullVeto,
    /// |Δη| below which the correction is 1
    pub constant_region: f64,
}

impl Default for SeagullSettings {
    fn default() -> Self {
        Self { method: 0, veto: SeagullVeto::Normal, constant_region: 0.0 }
    }
}

/// Highest seagull fit method.
pub const MAX_METHOD: u8 = 6;

/// Shape model, symmetrization and fit range of a method.
fn method_model(method: u8, cfg: &SeagullConfig) -> Result<(ShapeModel, bool, f64)> {
    Ok(match method {
        0 => (ShapeModel::Polynomial { order: 2 }, true, cfg.fit_range),
        1 => (ShapeModel::ExpDip, true, cfg.fit_range),
        2 => (ShapeModel::Polynomial { order: 1 }, true, cfg.fit_range),
        3 => (ShapeModel::ExpDip, true, cfg.restricted_fit_range),
        4 => (ShapeModel::ExpDipQuadratic, true, cfg.fit_range),
        5 => (ShapeModel::ExpDip, false, cfg.fit_range),
        6 => (ShapeModel::ExpDipQuadratic, false, cfg.fit_range),
        m => return Err(Error::Validation(format!("unknown seagull method {m}"))),
    })
}

/// Δη profile of the background region: mean density over the Δφ columns in
/// `phi_region`, rebinned when the row count allows it.
pub fn background_profile(corrected: &Distribution, cfg: &SeagullConfig) -> Result<Distribution> {
    let (low, high) = cfg.phi_region;
    let (lo, hi) = BinAxis::new(corrected.x.clone()).window_indices(low, high, DUPLICATE_REMOVER)?;
    let mut profile = corrected.project_y(corrected.name.clone(), lo, hi)?;
    let width: f64 = (lo..=hi).map(|ix| corrected.x.width(ix)).sum();
    profile.scale(1.0 / width);
    if cfg.rebin > 1 && profile.nx() % cfg.rebin == 0 {
        profile = profile.rebin_x(cfg.rebin)?;
        profile.scale(1.0 / cfg.rebin as f64);
    }
    Ok(profile)
}

fn fit_points(profile: &Distribution, range: f64) -> Vec<DataPoint> {
    (0..profile.nx())
        .filter(|&i| profile.x.center(i).abs() < range)
        .filter(|&i| profile.values[i] != 0.0 || profile.variances[i] > 0.0)
        .map(|i| DataPoint::new(profile.x.center(i), profile.values[i], profile.error(i, 0)))
        .collect()
}

/// Divide the fitted shape, relative to its value at `constant_region`, out of
/// every Δη row with |Δη| beyond that region.
pub fn apply_shape(
    corrected: &Distribution,
    model: ShapeModel,
    parameters: &[f64],
    constant_region: f64,
) -> Result<Distribution> {
    let yaxis = corrected
        .y
        .as_ref()
        .ok_or_else(|| Error::Validation(format!("'{}' is not two-dimensional", corrected.name)))?;
    let reference = model.eval(constant_region, parameters);
    if !reference.is_finite() || reference == 0.0 {
        return Err(Error::Computation(format!("seagull fit vanishes at |Δη| = {constant_region}")));
    }
    let mut out = corrected.clone();
    for iy in 0..yaxis.n_bins() {
        let eta = yaxis.center(iy).abs();
        if eta <= constant_region {
            continue;
        }
        let g = model.eval(eta, parameters) / reference;
        if !g.is_finite() || g <= 0.0 {
            return Err(Error::Computation(format!("seagull correction {g} at Δη = {eta}")));
        }
        for ix in 0..out.nx() {
            let i = out.index(ix, iy);
            out.values[i] /= g;
            out.variances[i] /= g * g;
        }
    }
    Ok(out)
}

/// Seagull correction of every selected bin.
#[derive(Debug, Clone)]
pub struct SeagullCorrector<'a> {
    config: &'a PipelineConfig,
    methods: OverrideTable<u8>,
    vetoes: OverrideTable<SeagullVeto>,
    constant_regions: OverrideTable<f64>,
}

impl<'a> SeagullCorrector<'a> {
    /// Corrector with the built-in tables followed by the configured entries.
    /// pp and generator-level runs have no built-in methods, so their bins
    /// default to method 0 unless configured otherwise.
    pub fn new(config: &'a PipelineConfig, dataset: DatasetKind) -> Self {
        let mut methods = if dataset.is_pp() || config.generator_level {
            OverrideTable::new()
        } else {
            builtin_seagull_methods(dataset)
        };
        let mut vetoes = builtin_seagull_vetoes(dataset);
        let mut constant_regions = OverrideTable::new();
        for o in &config.overrides.seagull {
            if let Some(m) = o.method {
                methods.push(o.bins, m);
            }
            if let Some(v) = o.veto {
                vetoes.push(o.bins, v);
            }
            if let Some(c) = o.constant_region {
                constant_regions.push(o.bins, c);
            }
        }
        Self { config, methods, vetoes, constant_regions }
    }

    /// Settings of one bin.
    pub fn settings(&self, coord: &BinCoordinate) -> SeagullSettings {
        let defaults = SeagullSettings::default();
        SeagullSettings {
            method: self.methods.lookup(coord).copied().unwrap_or(defaults.method),
            veto: self.vetoes.lookup(coord).copied().unwrap_or(defaults.veto),
            constant_region: self.constant_regions.lookup(coord).copied().unwrap_or(defaults.constant_region),
        }
    }

    fn above_pt_limit(&self, coord: &BinCoordinate) -> bool {
        self.config.bins.track_pt_low(coord.track_pt).is_some_and(|pt| pt >= self.config.seagull.max_track_pt)
    }

    /// Correct one bin; reads `Corrected`, writes `SeagullCorrected` and the QA
    /// profile and fit curve.
    pub fn process(&self, coord: &BinCoordinate, store: &Store) -> Result<Vec<Product>> {
        let corrected = store
            .correlation(Stage::Corrected, coord)
            .ok_or_else(|| Error::MissingDistribution(format!("corrected correlation for {coord}")))?;
        let settings = self.settings(coord);
        if settings.veto == SeagullVeto::Skip || self.above_pt_limit(coord) {
            return Ok(vec![Product::correlation(Stage::SeagullCorrected, *coord, corrected.clone())]);
        }

        let cfg = &self.config.seagull;
        let (model, symmetrize, range) = method_model(settings.method, cfg)?;
        let mut profile = background_profile(corrected, cfg)?;
        if symmetrize {
            profile = profile.symmetrized()?;
        }
        let points = fit_points(&profile, range);
        let fit = model.fit(&points)?;

        let apply = match settings.veto {
            SeagullVeto::Force => true,
            _ => improves_on_flat(&fit, &points)?,
        };
        log::trace!("seagull {coord}: method {} chi2/ndf {:?} applied {apply}", settings.method, fit.chi2_per_ndf());

        let output = if apply {
            apply_shape(corrected, model, &fit.parameters, settings.constant_region)?
        } else {
            corrected.clone()
        };

        let mut curve = profile.zeroed_like("fit");
        for i in 0..curve.nx() {
            curve.values[i] = model.eval(curve.x.center(i), &fit.parameters);
        }
        Ok(vec![
            Product::new(Stage::SeagullCorrected, DistributionKind::SeagullBackgroundEta, *coord, profile),
            Product::new(Stage::SeagullCorrected, DistributionKind::SeagullFitCurve, *coord, curve),
            Product::correlation(Stage::SeagullCorrected, *coord, output),
        ])
    }
}

fn improves_on_flat(fit: &FitResult, points: &[DataPoint]) -> Result<bool> {
    let flat = constant_fit(points)?;
    Ok(match (fit.chi2_per_ndf(), flat.chi2_per_ndf()) {
        (Some(model), Some(flat)) => model < flat,
        _ => false,
    })
}
