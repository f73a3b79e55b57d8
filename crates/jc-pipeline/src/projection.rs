//! One-dimensional projections of the 2-D correlations and the flow fit of the
//! background.

use crate::config::PipelineConfig;
use crate::store::{Product, Store};
use jc_core::{BinCoordinate, DistributionKind, Error, Result, Stage};
use jc_fit::{DataPoint, fourier_fit};
use jc_hist::{Axis, BinAxis, DUPLICATE_REMOVER, Distribution};

/// Stages whose correlations are projected.
pub const PROJECTED_STAGES: [Stage; 4] =
    [Stage::Corrected, Stage::Background, Stage::BackgroundSubtracted, Stage::Signal];

fn y_axis(d: &Distribution) -> Result<&Axis> {
    d.y.as_ref().ok_or_else(|| Error::Validation(format!("'{}' is not two-dimensional", d.name)))
}

/// Δφ projection over all Δη rows.
pub fn delta_phi(d: &Distribution) -> Result<Distribution> {
    d.project_x("deltaPhi", 0, y_axis(d)?.n_bins() - 1)
}

/// Δφ projection over |Δη| < `max_delta_eta`.
pub fn delta_phi_signal_region(d: &Distribution, max_delta_eta: f64) -> Result<Distribution> {
    let (lo, hi) = BinAxis::new(y_axis(d)?.clone()).window_indices(-max_delta_eta, max_delta_eta, DUPLICATE_REMOVER)?;
    d.project_x("deltaPhiSignal", lo, hi)
}

/// Δφ projection over `min ≤ |Δη| ≤ max`, both sides summed.
pub fn delta_phi_background_region(d: &Distribution, min_delta_eta: f64, max_delta_eta: f64) -> Result<Distribution> {
    let axis = BinAxis::new(y_axis(d)?.clone());
    let (lo, hi) = axis.window_indices(-max_delta_eta, -min_delta_eta, DUPLICATE_REMOVER)?;
    let mut out = d.project_x("deltaPhiBackground", lo, hi)?;
    let (lo, hi) = axis.window_indices(min_delta_eta, max_delta_eta, DUPLICATE_REMOVER)?;
    out.add(&d.project_x("", lo, hi)?)?;
    Ok(out)
}

/// Δη projection over the Δφ window `[low, high]`.
pub fn delta_eta(d: &Distribution, low: f64, high: f64) -> Result<Distribution> {
    let (lo, hi) = BinAxis::new(d.x.clone()).window_indices(low, high, DUPLICATE_REMOVER)?;
    d.project_y("deltaEta", lo, hi)
}

/// Fourier coefficients `c_0..c_n` of a Δφ distribution, stored one per bin.
pub fn fourier_coefficients(projection: &Distribution, n_harmonics: usize) -> Result<Distribution> {
    let points: Vec<DataPoint> = (0..projection.nx())
        .map(|i| DataPoint::new(projection.x.center(i), projection.values[i], projection.error(i, 0)))
        .collect();
    let fit = fourier_fit(&points, n_harmonics)?.fit;
    let axis = Axis::uniform(n_harmonics + 1, -0.5, n_harmonics as f64 + 0.5)?;
    let variances = fit.errors.iter().map(|e| if e.is_finite() { e * e } else { 0.0 }).collect();
    Distribution::from_values("fourier", axis, fit.parameters, variances)
}

/// Projections of every selected bin.
#[derive(Debug, Clone)]
pub struct ProjectionEngine<'a> {
    config: &'a PipelineConfig,
}

impl<'a> ProjectionEngine<'a> {
    /// Engine for the configured regions and windows.
    pub fn new(config: &'a PipelineConfig) -> Self {
        Self { config }
    }

    fn project_stage(&self, stage: Stage, coord: &BinCoordinate, d: &Distribution) -> Result<Vec<Product>> {
        let bg = &self.config.background;
        let mut background_region = delta_phi_background_region(d, bg.min_delta_eta, bg.max_delta_eta)?;
        let mut out = vec![
            Product::new(stage, DistributionKind::DeltaPhi, *coord, delta_phi(d)?),
            Product::new(
                stage,
                DistributionKind::DeltaPhiSignalRegion,
                *coord,
                delta_phi_signal_region(d, bg.signal_delta_eta)?,
            ),
        ];
        if stage == Stage::Background {
            background_region.scale_errors(bg.error_scale);
            let coefficients = fourier_coefficients(&background_region, bg.fourier_harmonics)?;
            out.push(Product::new(stage, DistributionKind::FourierCoefficients, *coord, coefficients));
        }
        out.push(Product::new(stage, DistributionKind::DeltaPhiBackgroundRegion, *coord, background_region));
        for (sub_bin, window) in self.config.projections.windows.iter().enumerate() {
            let eta = delta_eta(d, window.low, window.high)?;
            out.push(Product::new(stage, DistributionKind::DeltaEta, coord.with_sub_bin(sub_bin), eta));
        }
        Ok(out)
    }

    /// Project every available stage of one bin.
    pub fn process(&self, coord: &BinCoordinate, store: &Store) -> Result<Vec<Product>> {
        let mut out = Vec::new();
        for stage in PROJECTED_STAGES {
            if let Some(d) = store.correlation(stage, coord) {
                out.extend(self.project_stage(stage, coord, d)?);
            }
        }
        if out.is_empty() {
            return Err(Error::MissingDistribution(format!("nothing to project for {coord}")));
        }
        Ok(out)
    }

    /// Final yields of one bin: the symmetrized Δη projection of `Signal` in the
    /// final window and its signal-region Δφ projection.
    pub fn final_projection(&self, coord: &BinCoordinate, store: &Store) -> Result<Vec<Product>> {
        let signal = store
            .correlation(Stage::Signal, coord)
            .ok_or_else(|| Error::MissingDistribution(format!("signal correlation for {coord}")))?;
        let index = self.config.projections.final_window;
        let window = self
            .config
            .projections
            .windows
            .get(index)
            .ok_or_else(|| Error::Validation(format!("no Δφ window {index}")))?;
        let eta = delta_eta(signal, window.low, window.high)?.symmetrized()?;
        let phi = delta_phi_signal_region(signal, self.config.background.signal_delta_eta)?;
        Ok(vec![
            Product::new(Stage::FinalProjection, DistributionKind::DeltaEta, coord.with_sub_bin(index), eta),
            Product::new(Stage::FinalProjection, DistributionKind::DeltaPhiSignalRegion, *coord, phi),
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use jc_core::Category;
    use jc_hist::DeltaPhiWindow;
    use std::f64::consts::PI;

    fn correlation(f: impl Fn(f64, f64) -> f64) -> Distribution {
        let x = Axis::uniform(32, -PI / 2.0, 3.0 * PI / 2.0).unwrap();
        let y = Axis::uniform(20, -2.5, 2.5).unwrap();
        let mut d = Distribution::new_2d("c", x.clone(), y.clone());
        for iy in 0..20 {
            for ix in 0..32 {
                d.set(ix, iy, f(x.center(ix), y.center(iy)), 0.01);
            }
        }
        d
    }

    #[test]
    fn region_projections_integrate_rows() {
        let d = correlation(|_, _| 1.0);
        // 5 units of Δη in total, 2 in the signal region, 2 in the background region
        assert_relative_eq!(delta_phi(&d).unwrap().values[0], 5.0, epsilon = 1e-12);
        assert_relative_eq!(delta_phi_signal_region(&d, 1.0).unwrap().values[0], 2.0, epsilon = 1e-12);
        assert_relative_eq!(delta_phi_background_region(&d, 1.5, 2.5).unwrap().values[5], 2.0, epsilon = 1e-12);
        let (lo, hi) = DeltaPhiWindow::NearSide.borders();
        // π wide window
        assert_relative_eq!(delta_eta(&d, lo, hi).unwrap().values[3], PI, epsilon = 1e-9);
    }

    #[test]
    fn fourier_fit_recovers_flow() {
        let d = correlation(|phi, _| 10.0 * (1.0 + 2.0 * 0.1 * (2.0 * phi).cos()));
        let projection = delta_phi(&d).unwrap();
        let c = fourier_coefficients(&projection, 3).unwrap();
        assert_eq!(c.nx(), 4);
        assert_relative_eq!(c.values[2] / (2.0 * c.values[0]), 0.1, epsilon = 1e-9);
        assert_relative_eq!(c.values[1], 0.0, epsilon = 1e-9);
    }

    #[test]
    fn background_stage_gets_flow_coefficients() {
        let cfg = PipelineConfig::default();
        let coord = BinCoordinate::new(Category::TrackLeadingJet, 0, 0, 0, 3);
        let mut store = Store::new();
        store.insert(Stage::Background, DistributionKind::DeltaEtaDeltaPhi, coord, correlation(|_, _| 1.0));
        store.insert(Stage::Signal, DistributionKind::DeltaEtaDeltaPhi, coord, correlation(|_, _| 2.0));
        let out = ProjectionEngine::new(&cfg).process(&coord, &store).unwrap();
        let fourier: Vec<_> = out.iter().filter(|p| p.kind == DistributionKind::FourierCoefficients).collect();
        assert_eq!(fourier.len(), 1);
        assert_eq!(fourier[0].stage, Stage::Background);
        let windows = out.iter().filter(|p| p.stage == Stage::Signal && p.kind == DistributionKind::DeltaEta).count();
        assert_eq!(windows, 4);
        let background = out
            .iter()
            .find(|p| p.stage == Stage::Background && p.kind == DistributionKind::DeltaPhiBackgroundRegion)
            .unwrap();
        // Two rows of width 0.25 on each side, variance 0.01 each, errors scaled by √2.5.
        assert_relative_eq!(background.distribution.variances[0], 8.0 * 0.01 * 0.0625 * 2.5, epsilon = 1e-12);
    }

    #[test]
    fn final_projection_is_symmetric() {
        let cfg = PipelineConfig::default();
        let coord = BinCoordinate::new(Category::TrackInclusiveJet, 3, 0, 0, 3);
        let mut store = Store::new();
        store.insert(Stage::Signal, DistributionKind::DeltaEtaDeltaPhi, coord, correlation(|_, eta| 1.0 + eta));
        let out = ProjectionEngine::new(&cfg).final_projection(&coord, &store).unwrap();
        let eta = &out[0].distribution;
        assert_eq!(out[0].coord.angular_sub_bin, DeltaPhiWindow::NearSide.sub_bin());
        for i in 0..eta.nx() {
            assert_relative_eq!(eta.values[i], eta.values[eta.nx() - 1 - i], epsilon = 1e-12);
        }
    }
}
