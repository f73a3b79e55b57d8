//! Hierarchical named-dataset archive of distributions.
//!
//! Paths have the form `<category>/<stage>/<kind>/A{a}C{c}T{t}S{s}`. Writes
//! overwrite, reads of absent paths return `None`.

use crate::distribution::Distribution;
use jc_core::{BinCoordinate, Category, DistributionKind, Result, Stage};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Archive path of a stored distribution.
pub fn dataset_path(stage: Stage, kind: DistributionKind, coord: &BinCoordinate) -> String {
    format!("{}/{}/{}/{}", coord.category.name(), stage.name(), kind.name(), coord.label())
}

/// Inverse of [`dataset_path`].
pub fn parse_dataset_path(path: &str) -> Option<(Stage, DistributionKind, BinCoordinate)> {
    let mut parts = path.split('/');
    let category = Category::from_name(parts.next()?)?;
    let stage = Stage::from_name(parts.next()?)?;
    let kind = DistributionKind::from_name(parts.next()?)?;
    let label = parts.next()?;
    if parts.next().is_some() {
        return None;
    }
    let [asymmetry, centrality, track_pt, angular_sub_bin] = parse_label(label)?;
    Some((stage, kind, BinCoordinate { category, asymmetry, centrality, track_pt, angular_sub_bin }))
}

fn parse_label(label: &str) -> Option<[usize; 4]> {
    let mut out = [0usize; 4];
    let mut rest = label;
    for (slot, tag) in out.iter_mut().zip(['A', 'C', 'T', 'S']) {
        rest = rest.strip_prefix(tag)?;
        let end = rest.find(|c: char| !c.is_ascii_digit()).unwrap_or(rest.len());
        *slot = rest[..end].parse().ok()?;
        rest = &rest[end..];
    }
    rest.is_empty().then_some(out)
}

/// Path-keyed collection of distributions backed by a JSON file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Archive {
    entries: BTreeMap<String, Distribution>,
}

impl Archive {
    /// Empty archive.
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `dist` at `path`, replacing any previous entry.
    pub fn write(&mut self, path: impl Into<String>, dist: Distribution) {
        self.entries.insert(path.into(), dist);
    }

    /// Distribution at `path`.
    pub fn read(&self, path: &str) -> Option<&Distribution> {
        self.entries.get(path)
    }

    /// Number of stored distributions.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Paths starting with `prefix`, in sorted order.
    pub fn paths<'a>(&'a self, prefix: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.entries.range(prefix.to_string()..).map(|(k, _)| k.as_str()).take_while(move |k| k.starts_with(prefix))
    }

    /// All entries, in path order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Distribution)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Load from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let bytes = std::fs::read(path.as_ref())?;
        let archive: Archive = serde_json::from_slice(&bytes)?;
        log::debug!("loaded {} distributions from {}", archive.len(), path.as_ref().display());
        Ok(archive)
    }

    /// Write to a JSON file, replacing it.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        std::fs::write(path.as_ref(), serde_json::to_string(self)?)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::distribution::Axis;

    fn coord() -> BinCoordinate {
        BinCoordinate::new(Category::PtWeightedTrackSubleadingJet, 2, 1, 5, 3).with_sub_bin(3)
    }

    #[test]
    fn path_layout() {
        let p = dataset_path(Stage::BackgroundSubtracted, DistributionKind::DeltaEta, &coord());
        assert_eq!(p, "trackSubleadingJetPtWeighted/BackgroundSubtracted/DeltaEta/A2C1T5S3");
        assert_eq!(
            parse_dataset_path(&p),
            Some((Stage::BackgroundSubtracted, DistributionKind::DeltaEta, coord()))
        );
        assert_eq!(parse_dataset_path("trackLeadingJet/Signal/DeltaEta/A1C2"), None);
        assert_eq!(parse_dataset_path("nope/Signal/DeltaEta/A1C2T0S0"), None);
    }

    #[test]
    fn write_overwrites_and_missing_reads_none() {
        let axis = Axis::uniform(2, 0.0, 1.0).unwrap();
        let mut a = Archive::new();
        let d1 = Distribution::from_values("a", axis.clone(), vec![1.0, 2.0], vec![1.0, 2.0]).unwrap();
        let d2 = Distribution::from_values("b", axis, vec![3.0, 4.0], vec![3.0, 4.0]).unwrap();
        a.write("x/y", d1);
        a.write("x/y", d2.clone());
        assert_eq!(a.len(), 1);
        assert_eq!(a.read("x/y"), Some(&d2));
        assert_eq!(a.read("x/z"), None);
    }

    #[test]
    fn prefix_listing() {
        let axis = Axis::uniform(1, 0.0, 1.0).unwrap();
        let d = Distribution::new_1d("d", axis);
        let mut a = Archive::new();
        for p in ["a/1", "a/2", "ab/1", "b/1"] {
            a.write(p, d.clone());
        }
        let listed: Vec<&str> = a.paths("a/").collect();
        assert_eq!(listed, vec!["a/1", "a/2"]);
        assert_eq!(a.paths("").count(), 4);
    }
}
