//! In-memory distribution store keyed by stage, kind and bin coordinate.

use jc_core::{BinCoordinate, DistributionKind, Stage};
use jc_hist::{Archive, Distribution, dataset_path, parse_dataset_path};
use std::collections::BTreeMap;

type Key = (Stage, DistributionKind, BinCoordinate);

/// One output of a pipeline step.
#[derive(Debug, Clone)]
pub struct Product {
    /// Stage slot
    pub stage: Stage,
    /// Distribution kind
    pub kind: DistributionKind,
    /// Bin coordinate
    pub coord: BinCoordinate,
    /// Value
    pub distribution: Distribution,
}

impl Product {
    /// Assemble a product.
    pub fn new(stage: Stage, kind: DistributionKind, coord: BinCoordinate, distribution: Distribution) -> Self {
        Self { stage, kind, coord, distribution }
    }

    /// A 2-D correlation at `stage`.
    pub fn correlation(stage: Stage, coord: BinCoordinate, distribution: Distribution) -> Self {
        Self::new(stage, DistributionKind::DeltaEtaDeltaPhi, coord, distribution)
    }
}

/// Distributions of a run. Steps read earlier slots and write their own.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Store {
    entries: BTreeMap<Key, Distribution>,
}

impl Store {
    /// Empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert (or replace) a distribution.
    pub fn insert(&mut self, stage: Stage, kind: DistributionKind, coord: BinCoordinate, mut dist: Distribution) {
        dist.name = dataset_path(stage, kind, &coord);
        self.entries.insert((stage, kind, coord), dist);
    }

    /// Insert a step product.
    pub fn insert_product(&mut self, p: Product) {
        self.insert(p.stage, p.kind, p.coord, p.distribution);
    }

    /// Distribution of an exact slot.
    pub fn get_exact(&self, stage: Stage, kind: DistributionKind, coord: &BinCoordinate) -> Option<&Distribution> {
        self.entries.get(&(stage, kind, *coord))
    }

    /// Distribution of a slot. [`Stage::Corrected`] resolves to the most advanced
    /// correction sub-stage present.
    pub fn get(&self, stage: Stage, kind: DistributionKind, coord: &BinCoordinate) -> Option<&Distribution> {
        if stage == Stage::Corrected {
            return Stage::CORRECTION_CHAIN.iter().find_map(|s| self.get_exact(*s, kind, coord));
        }
        self.get_exact(stage, kind, coord)
    }

    /// 2-D correlation at `stage`.
    pub fn correlation(&self, stage: Stage, coord: &BinCoordinate) -> Option<&Distribution> {
        self.get(stage, DistributionKind::DeltaEtaDeltaPhi, coord)
    }

    /// Number of stored distributions.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of distributions stored at `stage`.
    pub fn count(&self, stage: Stage) -> usize {
        self.entries.keys().filter(|(s, _, _)| *s == stage).count()
    }

    /// All entries in key order.
    pub fn iter(&self) -> impl Iterator<Item = (Stage, DistributionKind, &BinCoordinate, &Distribution)> {
        self.entries.iter().map(|((s, k, c), d)| (*s, *k, c, d))
    }

    /// Drop every slot produced at `stage` or later, so a resumed run cannot
    /// read stale results. An explicitly loaded [`Stage::Corrected`] slot is kept.
    pub fn discard_from(&mut self, stage: Stage) {
        self.entries.retain(|(s, _, _), _| *s < stage || *s == Stage::Corrected);
    }

    /// Flow coefficient `v_n` fitted to the background of a bin.
    pub fn vn(&self, coord: &BinCoordinate, n: usize) -> Option<f64> {
        let d = self.get_exact(Stage::Background, DistributionKind::FourierCoefficients, coord)?;
        if n == 0 || n >= d.nx() || d.values[0] == 0.0 {
            return None;
        }
        Some(d.values[n] / (2.0 * d.values[0]))
    }

    /// Copy every distribution into an archive.
    pub fn to_archive(&self) -> Archive {
        let mut archive = Archive::new();
        for ((stage, kind, coord), d) in &self.entries {
            archive.write(dataset_path(*stage, *kind, coord), d.clone());
        }
        archive
    }

    /// Load every recognised path of an archive.
    pub fn from_archive(archive: &Archive) -> Self {
        let mut store = Store::new();
        for (path, d) in archive.iter() {
            match parse_dataset_path(path) {
                Some((stage, kind, coord)) => store.insert(stage, kind, coord, d.clone()),
                None => log::warn!("ignoring unrecognised archive path '{path}'"),
            }
        }
        store
    }
}
