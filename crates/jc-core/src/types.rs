//! Common data types for jetcorr

use serde::{Deserialize, Serialize};
use std::fmt;

/// Jet-track correlation category.
///
/// The first six variants are {leading, subleading} × {track, uncorrected track,
/// pT-weighted track}. The last two are inclusive-jet correlations, which have no
/// leading/subleading distinction and no momentum-imbalance binning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Category {
    /// Tracks around the leading jet
    TrackLeadingJet,
    /// Tracks around the leading jet, no tracking efficiency correction
    UncorrectedTrackLeadingJet,
    /// pT-weighted tracks around the leading jet
    PtWeightedTrackLeadingJet,
    /// Tracks around the subleading jet
    TrackSubleadingJet,
    /// Tracks around the subleading jet, no tracking efficiency correction
    UncorrectedTrackSubleadingJet,
    /// pT-weighted tracks around the subleading jet
    PtWeightedTrackSubleadingJet,
    /// Tracks around any jet
    TrackInclusiveJet,
    /// pT-weighted tracks around any jet
    PtWeightedTrackInclusiveJet,
}

/// Which jet of the event a category correlates tracks with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JetLeg {
    /// Leading jet of a dijet
    Leading,
    /// Subleading jet of a dijet
    Subleading,
    /// Any jet passing the inclusive selection
    Inclusive,
}

impl Category {
    /// All categories in processing order.
    pub const ALL: [Category; 8] = [
        Category::TrackLeadingJet,
        Category::UncorrectedTrackLeadingJet,
        Category::PtWeightedTrackLeadingJet,
        Category::TrackSubleadingJet,
        Category::UncorrectedTrackSubleadingJet,
        Category::PtWeightedTrackSubleadingJet,
        Category::TrackInclusiveJet,
        Category::PtWeightedTrackInclusiveJet,
    ];

    /// The symmetric partner used for background extraction.
    ///
    /// Leading ↔ subleading of the same track flavour; inclusive categories are
    /// their own partner.
    pub fn connected(self) -> Category {
        match self {
            Category::TrackLeadingJet => Category::TrackSubleadingJet,
            Category::UncorrectedTrackLeadingJet => Category::UncorrectedTrackSubleadingJet,
            Category::PtWeightedTrackLeadingJet => Category::PtWeightedTrackSubleadingJet,
            Category::TrackSubleadingJet => Category::TrackLeadingJet,
            Category::UncorrectedTrackSubleadingJet => Category::UncorrectedTrackLeadingJet,
            Category::PtWeightedTrackSubleadingJet => Category::PtWeightedTrackLeadingJet,
            Category::TrackInclusiveJet => Category::TrackInclusiveJet,
            Category::PtWeightedTrackInclusiveJet => Category::PtWeightedTrackInclusiveJet,
        }
    }

    /// Jet leg of this category.
    pub fn leg(self) -> JetLeg {
        match self {
            Category::TrackLeadingJet
            | Category::UncorrectedTrackLeadingJet
            | Category::PtWeightedTrackLeadingJet => JetLeg::Leading,
            Category::TrackSubleadingJet
            | Category::UncorrectedTrackSubleadingJet
            | Category::PtWeightedTrackSubleadingJet => JetLeg::Subleading,
            Category::TrackInclusiveJet | Category::PtWeightedTrackInclusiveJet => JetLeg::Inclusive,
        }
    }

    /// True for inclusive-jet categories.
    pub fn is_inclusive(self) -> bool {
        self.leg() == JetLeg::Inclusive
    }

    /// True for pT-weighted categories.
    pub fn is_pt_weighted(self) -> bool {
        matches!(
            self,
            Category::PtWeightedTrackLeadingJet
                | Category::PtWeightedTrackSubleadingJet
                | Category::PtWeightedTrackInclusiveJet
        )
    }

    /// Name used for the source table and archive directories.
    pub fn name(self) -> &'static str {
        match self {
            Category::TrackLeadingJet => "trackLeadingJet",
            Category::UncorrectedTrackLeadingJet => "trackLeadingJetUncorrected",
            Category::PtWeightedTrackLeadingJet => "trackLeadingJetPtWeighted",
            Category::TrackSubleadingJet => "trackSubleadingJet",
            Category::UncorrectedTrackSubleadingJet => "trackSubleadingJetUncorrected",
            Category::PtWeightedTrackSubleadingJet => "trackSubleadingJetPtWeighted",
            Category::TrackInclusiveJet => "trackJetInclusive",
            Category::PtWeightedTrackInclusiveJet => "trackJetInclusivePtWeighted",
        }
    }

    /// Inverse of [`Category::name`].
    pub fn from_name(name: &str) -> Option<Category> {
        Category::ALL.into_iter().find(|c| c.name() == name)
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Processing stage of a distribution. Declaration order is processing order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Stage {
    /// Same-event correlation (ingested)
    SameEvent,
    /// Mixed-event correlation (ingested)
    MixedEvent,
    /// Mixed event after normalization (side artifact of the mixed-event correction)
    MixedEventNormalized,
    /// Output of the mixed-event correction
    MixedEventCorrected,
    /// Output of the seagull correction
    SeagullCorrected,
    /// Output of the tracking residual correction
    TrackingCorrected,
    /// Output of the spillover correction
    SpilloverCorrected,
    /// Fully corrected correlation (loaded from a partially processed archive)
    Corrected,
    /// Background estimate
    Background,
    /// Gluing-point diagnostic of the background estimate
    BackgroundOverlap,
    /// Corrected minus background
    BackgroundSubtracted,
    /// Background subtracted and fragmentation-bias corrected
    Signal,
    /// Radial profile products
    JetShape,
    /// Radial profile after the per-category normalization
    NormalizedJetShape,
    /// Final angular yield projections
    FinalProjection,
}

impl Stage {
    /// Slots that back [`Stage::Corrected`], most advanced first.
    pub const CORRECTION_CHAIN: [Stage; 5] = [
        Stage::SpilloverCorrected,
        Stage::TrackingCorrected,
        Stage::SeagullCorrected,
        Stage::MixedEventCorrected,
        Stage::Corrected,
    ];

    /// All stages in processing order.
    pub const ALL: [Stage; 15] = [
        Stage::SameEvent,
        Stage::MixedEvent,
        Stage::MixedEventNormalized,
        Stage::MixedEventCorrected,
        Stage::SeagullCorrected,
        Stage::TrackingCorrected,
        Stage::SpilloverCorrected,
        Stage::Corrected,
        Stage::Background,
        Stage::BackgroundOverlap,
        Stage::BackgroundSubtracted,
        Stage::Signal,
        Stage::JetShape,
        Stage::NormalizedJetShape,
        Stage::FinalProjection,
    ];

    /// Archive directory name.
    pub fn name(self) -> &'static str {
        match self {
            Stage::SameEvent => "SameEvent",
            Stage::MixedEvent => "MixedEvent",
            Stage::MixedEventNormalized => "NormalizedMixedEvent",
            Stage::MixedEventCorrected => "MixedEventCorrected",
            Stage::SeagullCorrected => "SeagullCorrected",
            Stage::TrackingCorrected => "TrackingCorrected",
            Stage::SpilloverCorrected => "SpilloverCorrected",
            Stage::Corrected => "Corrected",
            Stage::Background => "Background",
            Stage::BackgroundOverlap => "BackgroundOverlap",
            Stage::BackgroundSubtracted => "BackgroundSubtracted",
            Stage::Signal => "Signal",
            Stage::JetShape => "JetShape",
            Stage::NormalizedJetShape => "NormalizedJetShape",
            Stage::FinalProjection => "FinalProjection",
        }
    }

    /// Inverse of [`Stage::name`].
    pub fn from_name(name: &str) -> Option<Stage> {
        Stage::ALL.into_iter().find(|s| s.name() == name)
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// What a stored distribution represents for its bin coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum DistributionKind {
    /// Two-dimensional Δφ × Δη correlation
    DeltaEtaDeltaPhi,
    /// Δφ projection over the whole Δη range
    DeltaPhi,
    /// Δφ projection in the signal Δη region
    DeltaPhiSignalRegion,
    /// Δφ projection in the background Δη region
    DeltaPhiBackgroundRegion,
    /// Δη projection in the Δφ window given by the angular sub-bin
    DeltaEta,
    /// Radial (ΔR) profile
    RadialProfile,
    /// Number of Δφ-Δη cells contributing to each ΔR ring
    RadialProfileCounts,
    /// Ring index (1-based, 0 = unused) for every Δφ-Δη cell
    RadialBinMap,
    /// Δη profile of the seagull fit region
    SeagullBackgroundEta,
    /// Seagull fit evaluated at the bin centres of the fit profile
    SeagullFitCurve,
    /// Fourier coefficients `c_n` of the background-region Δφ projection
    FourierCoefficients,
}

impl DistributionKind {
    /// All kinds.
    pub const ALL: [DistributionKind; 11] = [
        DistributionKind::DeltaEtaDeltaPhi,
        DistributionKind::DeltaPhi,
        DistributionKind::DeltaPhiSignalRegion,
        DistributionKind::DeltaPhiBackgroundRegion,
        DistributionKind::DeltaEta,
        DistributionKind::RadialProfile,
        DistributionKind::RadialProfileCounts,
        DistributionKind::RadialBinMap,
        DistributionKind::SeagullBackgroundEta,
        DistributionKind::SeagullFitCurve,
        DistributionKind::FourierCoefficients,
    ];

    /// Archive directory name.
    pub fn name(self) -> &'static str {
        match self {
            DistributionKind::DeltaEtaDeltaPhi => "DeltaEtaDeltaPhi",
            DistributionKind::DeltaPhi => "DeltaPhi",
            DistributionKind::DeltaPhiSignalRegion => "DeltaPhiSignalRegion",
            DistributionKind::DeltaPhiBackgroundRegion => "DeltaPhiBackgroundRegion",
            DistributionKind::DeltaEta => "DeltaEta",
            DistributionKind::RadialProfile => "JetShape",
            DistributionKind::RadialProfileCounts => "JetShapeCounts",
            DistributionKind::RadialBinMap => "JetShapeBinMap",
            DistributionKind::SeagullBackgroundEta => "SeagullDeltaEta",
            DistributionKind::SeagullFitCurve => "SeagullFit",
            DistributionKind::FourierCoefficients => "FourierFit",
        }
    }

    /// Inverse of [`DistributionKind::name`].
    pub fn from_name(name: &str) -> Option<DistributionKind> {
        DistributionKind::ALL.into_iter().find(|k| k.name() == name)
    }
}

/// Position of a distribution in the analysis bin space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct BinCoordinate {
    /// Correlation category
    pub category: Category,
    /// Momentum-imbalance bin; `n_asymmetry` means imbalance-integrated
    pub asymmetry: usize,
    /// Centrality bin
    pub centrality: usize,
    /// Track pT bin
    pub track_pt: usize,
    /// Angular window index for Δη projections, 0 otherwise
    pub angular_sub_bin: usize,
}

impl BinCoordinate {
    /// Create a coordinate. Inclusive categories collapse the asymmetry bin to the
    /// integrated value `n_asymmetry`.
    pub fn new(
        category: Category,
        asymmetry: usize,
        centrality: usize,
        track_pt: usize,
        n_asymmetry: usize,
    ) -> Self {
        let asymmetry = if category.is_inclusive() { n_asymmetry } else { asymmetry.min(n_asymmetry) };
        Self { category, asymmetry, centrality, track_pt, angular_sub_bin: 0 }
    }

    /// Same coordinate for another category (asymmetry kept as-is).
    pub fn with_category(self, category: Category) -> Self {
        Self { category, ..self }
    }

    /// Same coordinate for another track pT bin.
    pub fn with_track_pt(self, track_pt: usize) -> Self {
        Self { track_pt, ..self }
    }

    /// Same coordinate for another asymmetry bin.
    pub fn with_asymmetry(self, asymmetry: usize) -> Self {
        Self { asymmetry, ..self }
    }

    /// Same coordinate for another angular sub-bin.
    pub fn with_sub_bin(self, angular_sub_bin: usize) -> Self {
        Self { angular_sub_bin, ..self }
    }

    /// Compact label, e.g. `A3C0T2S0`.
    pub fn label(&self) -> String {
        format!("A{}C{}T{}S{}", self.asymmetry, self.centrality, self.track_pt, self.angular_sub_bin)
    }
}

impl fmt::Display for BinCoordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[{}]", self.category, self.label())
    }
}

/// Kind of dataset, decoded from the run's data-type string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DatasetKind {
    /// PbPb collision data
    PbPb,
    /// Simulated PbPb
    PbPbMc,
    /// pp collision data
    Pp,
    /// Simulated pp
    PpMc,
}

impl DatasetKind {
    /// Decode a data-type string such as `"PbPb"`, `"PbPb MC"`, `"pp"` or `"pp MC"`.
    pub fn from_data_type(data_type: &str) -> Option<DatasetKind> {
        let mc = data_type.contains("MC");
        if data_type.contains("PbPb") {
            Some(if mc { DatasetKind::PbPbMc } else { DatasetKind::PbPb })
        } else if data_type.contains("pp") {
            Some(if mc { DatasetKind::PpMc } else { DatasetKind::Pp })
        } else {
            None
        }
    }

    /// Heavy-ion dataset (data or simulation).
    pub fn is_pbpb(self) -> bool {
        matches!(self, DatasetKind::PbPb | DatasetKind::PbPbMc)
    }

    /// pp-like dataset (data or simulation).
    pub fn is_pp(self) -> bool {
        !self.is_pbpb()
    }

    /// Simulated dataset.
    pub fn is_mc(self) -> bool {
        matches!(self, DatasetKind::PbPbMc | DatasetKind::PpMc)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn connected_pairs_leading_with_subleading() {
        assert_eq!(Category::TrackLeadingJet.connected(), Category::TrackSubleadingJet);
        assert_eq!(
            Category::UncorrectedTrackLeadingJet.connected(),
            Category::UncorrectedTrackSubleadingJet
        );
        assert_eq!(
            Category::PtWeightedTrackSubleadingJet.connected(),
            Category::PtWeightedTrackLeadingJet
        );
        assert_eq!(Category::TrackInclusiveJet.connected(), Category::TrackInclusiveJet);
        assert_eq!(
            Category::PtWeightedTrackInclusiveJet.connected(),
            Category::PtWeightedTrackInclusiveJet
        );
    }

    #[test]
    fn connected_preserves_track_flavour() {
        for c in Category::ALL {
            assert_eq!(c.is_pt_weighted(), c.connected().is_pt_weighted(), "{c}");
            assert_eq!(c.is_inclusive(), c.connected().is_inclusive(), "{c}");
            if !c.is_inclusive() {
                assert_ne!(c.leg(), c.connected().leg(), "{c}");
            }
        }
    }

    #[test]
    fn names_round_trip() {
        for c in Category::ALL {
            assert_eq!(Category::from_name(c.name()), Some(c));
        }
        for s in Stage::ALL {
            assert_eq!(Stage::from_name(s.name()), Some(s));
        }
        for k in DistributionKind::ALL {
            assert_eq!(DistributionKind::from_name(k.name()), Some(k));
        }
    }

    #[test]
    fn stages_are_strictly_ordered() {
        for pair in Stage::ALL.windows(2) {
            assert!(pair[0] < pair[1]);
        }
        assert!(Stage::Corrected < Stage::Background);
        assert!(Stage::BackgroundSubtracted < Stage::Signal);
    }

    #[test]
    fn inclusive_coordinate_collapses_asymmetry() {
        let c = BinCoordinate::new(Category::TrackInclusiveJet, 1, 0, 2, 3);
        assert_eq!(c.asymmetry, 3);
        let l = BinCoordinate::new(Category::TrackLeadingJet, 1, 0, 2, 3);
        assert_eq!(l.asymmetry, 1);
        assert_eq!(l.label(), "A1C0T2S0");
    }

    #[test]
    fn dataset_kind_from_data_type() {
        assert_eq!(DatasetKind::from_data_type("PbPb"), Some(DatasetKind::PbPb));
        assert_eq!(DatasetKind::from_data_type("PbPb MC"), Some(DatasetKind::PbPbMc));
        assert_eq!(DatasetKind::from_data_type("pp"), Some(DatasetKind::Pp));
        assert_eq!(DatasetKind::from_data_type("pp MC"), Some(DatasetKind::PpMc));
        assert_eq!(DatasetKind::from_data_type("unknown"), None);
        assert!(DatasetKind::PpMc.is_pp());
        assert!(DatasetKind::PbPbMc.is_mc());
    }

    fn any_category() -> impl Strategy<Value = Category> {
        (0usize..8).prop_map(|i| Category::ALL[i])
    }

    proptest! {
        #[test]
        fn connected_is_an_involution(c in any_category()) {
            prop_assert_eq!(c.connected().connected(), c);
        }
    }
}
