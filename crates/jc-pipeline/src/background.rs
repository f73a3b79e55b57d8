//! Background extraction by leading/subleading symmetry.
//!
//! The background is flat in Δη and estimated from the large-|Δη| region. For
//! dijet categories the away side of a jet overlaps with the near side of its
//! partner, so away-side bins take their level from the partner's near side.
//! The Δφ axis must span 2π starting at −π/2 with an even number of uniform
//! bins, so that bin `ix` and bin `ix + nx/2` are π apart.

use crate::config::BackgroundConfig;
use crate::store::{Product, Store};
use jc_core::{BinCoordinate, Error, Result, Stage};
use jc_hist::Distribution;

/// Number of Δφ bins on each side of a gluing point kept in the overlap diagnostic.
pub const OVERLAP_BINS: usize = 3;

/// Δη band `min ≤ |Δη| ≤ max` used for the background level.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BackgroundRegion {
    /// Lower |Δη| edge
    pub min_delta_eta: f64,
    /// Upper |Δη| edge
    pub max_delta_eta: f64,
}

impl From<&BackgroundConfig> for BackgroundRegion {
    fn from(cfg: &BackgroundConfig) -> Self {
        Self { min_delta_eta: cfg.min_delta_eta, max_delta_eta: cfg.max_delta_eta }
    }
}

/// Mean density of every Δφ column over the background rows: `(value, variance)`.
fn column_levels(d: &Distribution, region: &BackgroundRegion) -> Result<Vec<(f64, f64)>> {
    let yaxis = d.y.as_ref().ok_or_else(|| Error::Validation(format!("'{}' is not two-dimensional", d.name)))?;
    let rows: Vec<usize> = (0..yaxis.n_bins())
        .filter(|&iy| {
            let eta = yaxis.center(iy).abs();
            eta >= region.min_delta_eta && eta <= region.max_delta_eta
        })
        .collect();
    let total: f64 = rows.iter().map(|&iy| yaxis.width(iy)).sum();
    if rows.is_empty() || total <= 0.0 {
        return Err(Error::InvalidBinRange(format!(
            "no Δη rows in {} ≤ |Δη| ≤ {} of '{}'",
            region.min_delta_eta, region.max_delta_eta, d.name
        )));
    }
    Ok((0..d.nx())
        .map(|ix| {
            let (v, var) = rows.iter().fold((0.0, 0.0), |(v, var), &iy| {
                let w = yaxis.width(iy);
                (v + d.value(ix, iy) * w, var + d.variance(ix, iy) * w * w)
            });
            (v / total, var / (total * total))
        })
        .collect())
}

fn check_layout(signal: &Distribution, partner: &Distribution) -> Result<()> {
    let nx = signal.nx();
    if nx % 2 != 0 || !signal.x.is_uniform() {
        return Err(Error::ConfigurationMismatch(format!(
            "Δφ axis of '{}' needs an even number of uniform bins, has {nx}",
            signal.name
        )));
    }
    if partner.x != signal.x || partner.y != signal.y {
        return Err(Error::ConfigurationMismatch(format!(
            "'{}' and its partner '{}' are binned differently",
            signal.name, partner.name
        )));
    }
    Ok(())
}

fn fill_flat(target: &mut Distribution, ix: usize, (value, variance): (f64, f64)) {
    for iy in 0..target.ny() {
        target.set(ix, iy, value, variance);
    }
}

/// Split `signal` into background and background-subtracted parts.
///
/// Returns `(background_subtracted, background, background_overlap)`. Inclusive
/// categories use only their own data and get an all-zero overlap.
pub fn subtract_background(
    signal: &Distribution,
    partner: &Distribution,
    region: &BackgroundRegion,
    is_inclusive: bool,
) -> Result<(Distribution, Distribution, Distribution)> {
    let own = column_levels(signal, region)?;
    let mut background = signal.zeroed_like("background");
    let mut overlap = signal.zeroed_like("overlap");

    if is_inclusive {
        for (ix, level) in own.into_iter().enumerate() {
            fill_flat(&mut background, ix, level);
        }
    } else {
        check_layout(signal, partner)?;
        let other = column_levels(partner, region)?;
        let nx = signal.nx();
        let half = nx / 2;
        for ix in 0..nx {
            let (level, alternate) = if ix < half { (own[ix], other[ix + half]) } else { (other[ix - half], own[ix]) };
            fill_flat(&mut background, ix, level);
            let near_glue = ix % half < OVERLAP_BINS || ix % half >= half.saturating_sub(OVERLAP_BINS);
            if near_glue {
                fill_flat(&mut overlap, ix, alternate);
            }
        }
    }

    let mut subtracted = signal.clone();
    subtracted.subtract(&background)?;
    Ok((subtracted, background, overlap))
}

/// Background subtraction of every selected bin.
#[derive(Debug, Clone)]
pub struct BackgroundSubtractor {
    region: BackgroundRegion,
}

impl BackgroundSubtractor {
    /// Subtractor for the configured region.
    pub fn new(cfg: &BackgroundConfig) -> Self {
        Self { region: cfg.into() }
    }

    /// Process one bin; reads `Corrected` of the bin and its connected partner.
    pub fn process(&self, coord: &BinCoordinate, store: &Store) -> Result<Vec<Product>> {
        let corrected = store
            .correlation(Stage::Corrected, coord)
            .ok_or_else(|| Error::MissingDistribution(format!("corrected correlation for {coord}")))?;
        let partner_coord = coord.with_category(coord.category.connected());
        let partner = store
            .correlation(Stage::Corrected, &partner_coord)
            .ok_or_else(|| Error::MissingDistribution(format!("corrected partner correlation {partner_coord}")))?;

        let (subtracted, background, overlap) =
            subtract_background(corrected, partner, &self.region, coord.category.is_inclusive())?;
        Ok(vec![
            Product::correlation(Stage::Background, *coord, background),
            Product::correlation(Stage::BackgroundOverlap, *coord, overlap),
            Product::correlation(Stage::BackgroundSubtracted, *coord, subtracted),
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use jc_hist::Axis;
    use std::f64::consts::PI;

    fn correlation(level: impl Fn(usize) -> f64) -> Distribution {
        let x = Axis::uniform(16, -PI / 2.0, 3.0 * PI / 2.0).unwrap();
        let y = Axis::uniform(10, -2.5, 2.5).unwrap();
        let mut d = Distribution::new_2d("c", x, y.clone());
        for iy in 0..10 {
            // Peak near Δη = 0 on top of the flat level.
            let peak = if y.center(iy).abs() < 1.0 { 3.0 } else { 0.0 };
            for ix in 0..16 {
                d.set(ix, iy, level(ix) + peak, 0.1);
            }
        }
        d
    }

    fn region() -> BackgroundRegion {
        BackgroundRegion { min_delta_eta: 1.5, max_delta_eta: 2.5 }
    }

    #[test]
    fn near_side_from_own_away_side_from_partner() {
        let signal = correlation(|_| 1.0);
        let partner = correlation(|_| 2.0);
        let (subtracted, background, overlap) = subtract_background(&signal, &partner, &region(), false).unwrap();
        assert_relative_eq!(background.value(0, 0), 1.0);
        assert_relative_eq!(background.value(7, 9), 1.0);
        assert_relative_eq!(background.value(8, 0), 2.0);
        assert_relative_eq!(subtracted.value(2, 0), 0.0);
        assert_relative_eq!(subtracted.value(10, 0), -1.0);
        // Overlap: near-side bins near the gluing points hold the partner level.
        assert_relative_eq!(overlap.value(0, 5), 2.0);
        assert_relative_eq!(overlap.value(7, 5), 2.0);
        assert_relative_eq!(overlap.value(8, 5), 1.0);
        assert_relative_eq!(overlap.value(3, 5), 0.0);
        assert_relative_eq!(overlap.value(12, 5), 0.0);
    }

    #[test]
    fn subtraction_is_exactly_linear() {
        let signal = correlation(|ix| 1.0 + 0.1 * ix as f64);
        let partner = correlation(|ix| 0.5 + 0.05 * ix as f64);
        let (subtracted, background, _) = subtract_background(&signal, &partner, &region(), false).unwrap();
        for i in 0..signal.values.len() {
            assert_eq!(subtracted.values[i], signal.values[i] - background.values[i]);
            assert_eq!(subtracted.variances[i], signal.variances[i] + background.variances[i]);
        }
    }

    #[test]
    fn inclusive_uses_own_data_only() {
        let signal = correlation(|ix| ix as f64);
        let partner = correlation(|_| 100.0);
        let (_, background, overlap) = subtract_background(&signal, &partner, &region(), true).unwrap();
        assert_relative_eq!(background.value(12, 3), 12.0);
        assert!(overlap.values.iter().all(|v| *v == 0.0));
    }

    #[test]
    fn odd_axis_is_a_mismatch() {
        let x = Axis::uniform(15, -PI / 2.0, 3.0 * PI / 2.0).unwrap();
        let y = Axis::uniform(10, -2.5, 2.5).unwrap();
        let d = Distribution::new_2d("odd", x, y);
        let err = subtract_background(&d, &d, &region(), false).unwrap_err();
        assert!(matches!(err, Error::ConfigurationMismatch(_)));
    }
}
