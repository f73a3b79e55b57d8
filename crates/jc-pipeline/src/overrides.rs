//! Sparse per-bin override tables.
//!
//! A table is built once from an ordered list of `(pattern, value)` entries.
//! Pattern fields left empty match any bin. When several entries match, the one
//! added last wins; when none match, the caller's documented default applies.

use crate::tables;
use jc_core::{BinCoordinate, Category, DatasetKind, JetLeg};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Bin selector; `None` fields match everything.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BinPattern {
    /// Category
    #[serde(default)]
    pub category: Option<Category>,
    /// Asymmetry bin
    #[serde(default)]
    pub asymmetry: Option<usize>,
    /// Centrality bin
    #[serde(default)]
    pub centrality: Option<usize>,
    /// Track pT bin
    #[serde(default)]
    pub track_pt: Option<usize>,
}

impl BinPattern {
    /// Pattern matching exactly one bin.
    pub fn exact(category: Category, asymmetry: usize, centrality: usize, track_pt: usize) -> Self {
        Self { category: Some(category), asymmetry: Some(asymmetry), centrality: Some(centrality), track_pt: Some(track_pt) }
    }

    /// True when the pattern selects `coord`.
    pub fn matches(&self, coord: &BinCoordinate) -> bool {
        self.category.is_none_or(|c| c == coord.category)
            && self.asymmetry.is_none_or(|a| a == coord.asymmetry)
            && self.centrality.is_none_or(|c| c == coord.centrality)
            && self.track_pt.is_none_or(|t| t == coord.track_pt)
    }

    fn exact_key(&self) -> Option<ExactKey> {
        Some((self.category?, self.asymmetry?, self.centrality?, self.track_pt?))
    }
}

type ExactKey = (Category, usize, usize, usize);

/// Declarative per-bin lookup table.
#[derive(Debug, Clone)]
pub struct OverrideTable<V> {
    exact: HashMap<ExactKey, (usize, V)>,
    wildcard: Vec<(usize, BinPattern, V)>,
    next: usize,
}

impl<V> Default for OverrideTable<V> {
    fn default() -> Self {
        Self { exact: HashMap::new(), wildcard: Vec::new(), next: 0 }
    }
}

impl<V> OverrideTable<V> {
    /// Empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an entry; it takes precedence over every earlier match.
    pub fn push(&mut self, pattern: BinPattern, value: V) {
        let seq = self.next;
        self.next += 1;
        match pattern.exact_key() {
            Some(key) => {
                self.exact.insert(key, (seq, value));
            }
            None => self.wildcard.push((seq, pattern, value)),
        }
    }

    /// Value of the latest matching entry.
    pub fn lookup(&self, coord: &BinCoordinate) -> Option<&V> {
        let key = (coord.category, coord.asymmetry, coord.centrality, coord.track_pt);
        let exact = self.exact.get(&key).map(|(seq, v)| (*seq, v));
        let wildcard = self.wildcard.iter().rev().find(|(_, p, _)| p.matches(coord)).map(|(seq, _, v)| (*seq, v));
        match (exact, wildcard) {
            (Some(e), Some(w)) => Some(if e.0 > w.0 { e.1 } else { w.1 }),
            (e, w) => e.or(w).map(|(_, v)| v),
        }
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.exact.len() + self.wildcard.len()
    }

    /// True when the table has no entries.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<V> FromIterator<(BinPattern, V)> for OverrideTable<V> {
    fn from_iter<I: IntoIterator<Item = (BinPattern, V)>>(iter: I) -> Self {
        let mut table = Self::new();
        for (p, v) in iter {
            table.push(p, v);
        }
        table
    }
}

/// How the seagull fit result is used.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SeagullVeto {
    /// Apply only when the fit beats a flat line
    #[default]
    Normal,
    /// Apply regardless of fit quality
    Force,
    /// Leave the distribution untouched
    Skip,
}

impl SeagullVeto {
    fn from_code(code: usize) -> Self {
        match code {
            1 => SeagullVeto::Force,
            2 => SeagullVeto::Skip,
            _ => SeagullVeto::Normal,
        }
    }
}

/// Redirect of a correction lookup to another asymmetry bin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AsymmetryRedirect {
    /// Use the imbalance-integrated correction
    Integrated,
    /// Use the correction of the given asymmetry bin
    Bin(usize),
}

impl AsymmetryRedirect {
    /// Resolve to an asymmetry index.
    pub fn resolve(self, n_asymmetry: usize) -> usize {
        match self {
            AsymmetryRedirect::Integrated => n_asymmetry,
            AsymmetryRedirect::Bin(a) => a,
        }
    }
}

/// One radial-profile replacement: `(ΔR bin counted from 1, value)`.
pub type CleaningPoint = (usize, f64);

fn categories_of(legs: &[JetLeg]) -> impl Iterator<Item = Category> + '_ {
    Category::ALL.into_iter().filter(move |c| legs.contains(&c.leg()) && !is_uncorrected(*c))
}

fn is_uncorrected(c: Category) -> bool {
    matches!(c, Category::UncorrectedTrackLeadingJet | Category::UncorrectedTrackSubleadingJet)
}

fn rows_to_entries<'a, V: 'a>(
    rows: &'a [[usize; 4]],
    legs: &'a [JetLeg],
    value: impl Fn(usize) -> V + Copy + 'a,
) -> impl Iterator<Item = (BinPattern, V)> + 'a {
    rows.iter().flat_map(move |&[a, c, t, v]| {
        categories_of(legs).map(move |cat| (BinPattern::exact(cat, a, c, t), value(v)))
    })
}

/// Built-in seagull method table (default method 0).
pub fn builtin_seagull_methods(dataset: DatasetKind) -> OverrideTable<u8> {
    const LEADING: &[JetLeg] = &[JetLeg::Leading, JetLeg::Inclusive];
    const SUBLEADING: &[JetLeg] = &[JetLeg::Subleading];
    match dataset {
        DatasetKind::PbPb => rows_to_entries(tables::PBPB_LEADING_METHOD, LEADING, |v| v as u8)
            .chain(rows_to_entries(tables::PBPB_SUBLEADING_METHOD, SUBLEADING, |v| v as u8))
            .collect(),
        DatasetKind::PbPbMc => rows_to_entries(tables::PBPB_MC_LEADING_METHOD, LEADING, |v| v as u8).collect(),
        DatasetKind::Pp | DatasetKind::PpMc => OverrideTable::new(),
    }
}

/// Built-in seagull veto table (default [`SeagullVeto::Normal`]).
pub fn builtin_seagull_vetoes(dataset: DatasetKind) -> OverrideTable<SeagullVeto> {
    const LEADING: &[JetLeg] = &[JetLeg::Leading, JetLeg::Inclusive];
    const SUBLEADING: &[JetLeg] = &[JetLeg::Subleading];
    match dataset {
        DatasetKind::PbPb => rows_to_entries(tables::PBPB_LEADING_VETO, LEADING, SeagullVeto::from_code)
            .chain(rows_to_entries(tables::PBPB_SUBLEADING_VETO, SUBLEADING, SeagullVeto::from_code))
            .collect(),
        DatasetKind::PbPbMc => {
            rows_to_entries(tables::PBPB_MC_LEADING_VETO, LEADING, SeagullVeto::from_code).collect()
        }
        DatasetKind::Pp | DatasetKind::PpMc => OverrideTable::new(),
    }
}

/// Built-in tracking-correction substitution: leading-jet categories in the
/// most peripheral centrality bin use the imbalance-integrated correction.
pub fn builtin_tracking_substitutions(last_centrality: usize) -> OverrideTable<AsymmetryRedirect> {
    categories_of(&[JetLeg::Leading])
        .map(|category| {
            let pattern = BinPattern { category: Some(category), centrality: Some(last_centrality), ..Default::default() };
            (pattern, AsymmetryRedirect::Integrated)
        })
        .collect()
}

/// Built-in radial-profile cleaning table (PbPb data only).
pub fn builtin_cleaning(dataset: DatasetKind) -> OverrideTable<Vec<CleaningPoint>> {
    if dataset != DatasetKind::PbPb {
        return OverrideTable::new();
    }
    tables::PT_WEIGHTED_LEADING_CLEANING
        .iter()
        .map(|&(a, c, t, points)| {
            (BinPattern::exact(Category::PtWeightedTrackLeadingJet, a, c, t), points.to_vec())
        })
        .collect()
}

/// Bins that use the asymmetry-scaled spillover correction: the two lowest
/// track pT bins of the most central class, for every asymmetry bin except the
/// integrated one.
pub fn builtin_scaled_spillover_bins(n_asymmetry: usize) -> OverrideTable<bool> {
    let mut table = OverrideTable::new();
    for track_pt in [0, 1] {
        table.push(BinPattern { centrality: Some(0), track_pt: Some(track_pt), ..Default::default() }, true);
        for category in Category::ALL {
            table.push(BinPattern::exact(category, n_asymmetry, 0, track_pt), false);
        }
    }
    table
}

#[cfg(test)]
mod tests {
    use super::*;

    fn coord(category: Category, a: usize, c: usize, t: usize) -> BinCoordinate {
        BinCoordinate { category, asymmetry: a, centrality: c, track_pt: t, angular_sub_bin: 0 }
    }

    #[test]
    fn later_entries_win() {
        let mut table = OverrideTable::new();
        table.push(BinPattern { centrality: Some(0), ..Default::default() }, 1);
        table.push(BinPattern::exact(Category::TrackLeadingJet, 0, 0, 0), 2);
        table.push(BinPattern { track_pt: Some(0), ..Default::default() }, 3);
        assert_eq!(table.lookup(&coord(Category::TrackLeadingJet, 0, 0, 0)), Some(&3));
        assert_eq!(table.lookup(&coord(Category::TrackLeadingJet, 0, 0, 1)), Some(&1));
        assert_eq!(table.lookup(&coord(Category::TrackLeadingJet, 0, 1, 1)), None);
        table.push(BinPattern::exact(Category::TrackLeadingJet, 0, 0, 0), 4);
        assert_eq!(table.lookup(&coord(Category::TrackLeadingJet, 0, 0, 0)), Some(&4));
    }

    #[test]
    fn pbpb_seagull_tables() {
        let methods = builtin_seagull_methods(DatasetKind::PbPb);
        assert_eq!(methods.lookup(&coord(Category::TrackLeadingJet, 3, 0, 0)), Some(&6));
        assert_eq!(methods.lookup(&coord(Category::TrackInclusiveJet, 3, 0, 0)), Some(&6));
        assert_eq!(methods.lookup(&coord(Category::TrackSubleadingJet, 3, 0, 2)), Some(&6));
        assert_eq!(methods.lookup(&coord(Category::UncorrectedTrackLeadingJet, 3, 0, 0)), None);
        let vetoes = builtin_seagull_vetoes(DatasetKind::PbPb);
        assert_eq!(vetoes.lookup(&coord(Category::PtWeightedTrackLeadingJet, 0, 2, 0)), Some(&SeagullVeto::Force));
        assert_eq!(vetoes.lookup(&coord(Category::TrackSubleadingJet, 3, 3, 6)), Some(&SeagullVeto::Skip));
        assert!(builtin_seagull_methods(DatasetKind::Pp).is_empty());
        assert!(builtin_seagull_methods(DatasetKind::PbPbMc).lookup(&coord(Category::TrackSubleadingJet, 3, 0, 0)).is_none());
    }

    #[test]
    fn cleaning_only_for_pt_weighted_leading() {
        let table = builtin_cleaning(DatasetKind::PbPb);
        let points = table.lookup(&coord(Category::PtWeightedTrackLeadingJet, 0, 0, 1)).unwrap();
        assert_eq!(points.len(), 2);
        assert_eq!(points[0].0, 11);
        assert!(table.lookup(&coord(Category::TrackLeadingJet, 0, 0, 1)).is_none());
        assert!(builtin_cleaning(DatasetKind::Pp).is_empty());
    }

    #[test]
    fn scaled_spillover_excludes_integrated_bin() {
        let table = builtin_scaled_spillover_bins(3);
        assert_eq!(table.lookup(&coord(Category::TrackLeadingJet, 1, 0, 0)), Some(&true));
        assert_eq!(table.lookup(&coord(Category::TrackLeadingJet, 3, 0, 1)), Some(&false));
        assert_eq!(table.lookup(&coord(Category::TrackLeadingJet, 1, 1, 0)), None);
    }

    #[test]
    fn tracking_substitution_for_peripheral_leading() {
        let table = builtin_tracking_substitutions(3);
        assert_eq!(table.lookup(&coord(Category::TrackLeadingJet, 0, 3, 2)), Some(&AsymmetryRedirect::Integrated));
        assert!(table.lookup(&coord(Category::TrackSubleadingJet, 0, 3, 2)).is_none());
        assert_eq!(AsymmetryRedirect::Bin(1).resolve(3), 1);
    }
}
