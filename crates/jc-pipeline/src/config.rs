//! Run configuration of the correction pipeline.
//!
//! Every field has a serde default, so an empty document is a valid PbPb
//! configuration with the nominal binning and every correction enabled.

use crate::overrides::{AsymmetryRedirect, BinPattern, CleaningPoint, SeagullVeto};
use crate::seagull;
use jc_core::{BinCoordinate, Category, DatasetKind, Error, Result};
use jc_hist::{Axis, BinBorders, DeltaPhiWindow};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Steps of the pipeline, in execution order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum PipelineStep {
    /// Ingestion and mixed-event correction
    #[default]
    MixedEventCorrection,
    /// Seagull correction
    SeagullCorrection,
    /// Tracking residual correction
    TrackingResidualCorrection,
    /// Spillover correction
    SpilloverCorrection,
    /// Background subtraction
    BackgroundSubtraction,
    /// Fragmentation-bias (JFF) correction
    FragmentationBiasCorrection,
    /// Radial profile extraction and normalization
    JetShapeCalculation,
    /// 1-D projections and flow fits
    Projections,
    /// Final angular yield projection
    FinalAngularYieldProjection,
}

impl PipelineStep {
    /// All steps in order.
    pub const ALL: [PipelineStep; 9] = [
        PipelineStep::MixedEventCorrection,
        PipelineStep::SeagullCorrection,
        PipelineStep::TrackingResidualCorrection,
        PipelineStep::SpilloverCorrection,
        PipelineStep::BackgroundSubtraction,
        PipelineStep::FragmentationBiasCorrection,
        PipelineStep::JetShapeCalculation,
        PipelineStep::Projections,
        PipelineStep::FinalAngularYieldProjection,
    ];
}

impl fmt::Display for PipelineStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Which bins are loaded and processed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Selection {
    /// Categories to load.
    #[serde(default = "default_categories")]
    pub categories: Vec<Category>,
    /// First centrality bin.
    #[serde(default)]
    pub first_centrality: usize,
    /// Last centrality bin (default: last).
    #[serde(default)]
    pub last_centrality: Option<usize>,
    /// First track pT bin.
    #[serde(default)]
    pub first_track_pt: usize,
    /// Last track pT bin (default: last).
    #[serde(default)]
    pub last_track_pt: Option<usize>,
    /// First asymmetry bin.
    #[serde(default)]
    pub first_asymmetry: usize,
    /// Last asymmetry bin (default: the integrated bin).
    #[serde(default)]
    pub last_asymmetry: Option<usize>,
}

fn default_categories() -> Vec<Category> {
    Category::ALL.to_vec()
}

impl Default for Selection {
    fn default() -> Self {
        Self {
            categories: default_categories(),
            first_centrality: 0,
            last_centrality: None,
            first_track_pt: 0,
            last_track_pt: None,
            first_asymmetry: 0,
            last_asymmetry: None,
        }
    }
}

/// Enable flags of the individual corrections.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorrectionSwitches {
    /// Mixed-event normalization
    #[serde(default = "default_true")]
    pub mixed_event: bool,
    /// Seagull correction
    #[serde(default = "default_true")]
    pub seagull: bool,
    /// Tracking residual correction
    #[serde(default = "default_true")]
    pub tracking: bool,
    /// Multiply tracking corrections by the provider's residual scale
    #[serde(default)]
    pub residual_scale: bool,
    /// Spillover correction
    #[serde(default = "default_true")]
    pub spillover: bool,
    /// Fragmentation-bias correction
    #[serde(default = "default_true")]
    pub jff: bool,
    /// Manual radial-profile cleaning
    #[serde(default = "default_true")]
    pub manual_cleaning: bool,
}

fn default_true() -> bool {
    true
}

impl Default for CorrectionSwitches {
    fn default() -> Self {
        Self {
            mixed_event: true,
            seagull: true,
            tracking: true,
            residual_scale: false,
            spillover: true,
            jff: true,
            manual_cleaning: true,
        }
    }
}

/// How the mixed-event scale is obtained.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum MixedEventNormalization {
    /// From the bin's own mixed event
    #[default]
    Single,
    /// Mean of the bin's and the connected category's scale
    Average,
}

/// Mixed-event correction parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MixedEventConfig {
    /// |Δη| range used to fit the normalization constant.
    #[serde(default = "default_fit_region")]
    pub fit_region: f64,
    /// Normalization method.
    #[serde(default)]
    pub normalization: MixedEventNormalization,
    /// Replace each Δη row by its Δφ average before normalizing.
    #[serde(default)]
    pub smooth: bool,
}

fn default_fit_region() -> f64 {
    0.2
}

impl Default for MixedEventConfig {
    fn default() -> Self {
        Self { fit_region: default_fit_region(), normalization: MixedEventNormalization::Single, smooth: false }
    }
}

/// Seagull correction parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeagullConfig {
    /// Δφ region, between the peaks, averaged into the background profile.
    #[serde(default = "default_seagull_phi_region")]
    pub phi_region: (f64, f64),
    /// Fit range |Δη| < value.
    #[serde(default = "default_seagull_fit_range")]
    pub fit_range: f64,
    /// Fit range for the restricted method.
    #[serde(default = "default_seagull_restricted_range")]
    pub restricted_fit_range: f64,
    /// Rebin factor of the Δη profile.
    #[serde(default = "default_seagull_rebin")]
    pub rebin: usize,
    /// No correction for track pT bins starting at or above this value (GeV).
    #[serde(default = "default_seagull_pt_limit")]
    pub max_track_pt: f64,
}

fn default_seagull_phi_region() -> (f64, f64) {
    DeltaPhiWindow::BetweenPeaks.borders()
}

fn default_seagull_fit_range() -> f64 {
    3.0
}

fn default_seagull_restricted_range() -> f64 {
    2.0
}

fn default_seagull_rebin() -> usize {
    4
}

fn default_seagull_pt_limit() -> f64 {
    8.0
}

impl Default for SeagullConfig {
    fn default() -> Self {
        Self {
            phi_region: default_seagull_phi_region(),
            fit_range: default_seagull_fit_range(),
            restricted_fit_range: default_seagull_restricted_range(),
            rebin: default_seagull_rebin(),
            max_track_pt: default_seagull_pt_limit(),
        }
    }
}

/// Background extraction and projection parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackgroundConfig {
    /// Lower |Δη| edge of the background region.
    #[serde(default = "default_background_min")]
    pub min_delta_eta: f64,
    /// Upper |Δη| edge of the background region.
    #[serde(default = "default_background_max")]
    pub max_delta_eta: f64,
    /// |Δη| edge of the signal region.
    #[serde(default = "default_signal_delta_eta")]
    pub signal_delta_eta: f64,
    /// Factor applied to the errors of the background Δφ projection before the
    /// Fourier fit.
    #[serde(default = "default_error_scale")]
    pub error_scale: f64,
    /// Number of Fourier harmonics.
    #[serde(default = "default_harmonics")]
    pub fourier_harmonics: usize,
}

fn default_background_min() -> f64 {
    1.5
}

fn default_background_max() -> f64 {
    2.5
}

fn default_signal_delta_eta() -> f64 {
    1.0
}

fn default_error_scale() -> f64 {
    2.5f64.sqrt()
}

fn default_harmonics() -> usize {
    4
}

impl Default for BackgroundConfig {
    fn default() -> Self {
        Self {
            min_delta_eta: default_background_min(),
            max_delta_eta: default_background_max(),
            signal_delta_eta: default_signal_delta_eta(),
            error_scale: default_error_scale(),
            fourier_harmonics: default_harmonics(),
        }
    }
}

/// Radial profile normalization of each ring.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum RingNormalization {
    /// Divide by the ring width in ΔR
    #[default]
    BinWidth,
    /// Divide by the ring area
    BinArea,
}

/// Jet-shape parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JetShapeConfig {
    /// ΔR ring edges.
    #[serde(default = "default_r_bins")]
    pub r_bins: Vec<f64>,
    /// Per-ring normalization.
    #[serde(default)]
    pub normalization: RingNormalization,
    /// Rings with an upper edge up to this radius enter the per-category
    /// normalization integral.
    #[serde(default = "default_normalization_radius")]
    pub normalization_radius: f64,
}

fn default_r_bins() -> Vec<f64> {
    vec![0.0, 0.05, 0.1, 0.15, 0.2, 0.25, 0.3, 0.35, 0.4, 0.45, 0.5, 0.6, 0.7, 0.8, 1.0]
}

fn default_normalization_radius() -> f64 {
    1.0
}

impl Default for JetShapeConfig {
    fn default() -> Self {
        Self {
            r_bins: default_r_bins(),
            normalization: RingNormalization::BinWidth,
            normalization_radius: default_normalization_radius(),
        }
    }
}

/// A named Δφ window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhiWindow {
    /// Name
    pub name: String,
    /// Lower Δφ border
    pub low: f64,
    /// Upper Δφ border
    pub high: f64,
}

/// Projection parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectionConfig {
    /// Δφ windows for Δη projections; the position is the angular sub-bin.
    #[serde(default = "default_windows")]
    pub windows: Vec<PhiWindow>,
    /// Window used for the final Δη yield.
    #[serde(default = "default_final_window")]
    pub final_window: usize,
}

fn default_windows() -> Vec<PhiWindow> {
    DeltaPhiWindow::ALL
        .iter()
        .map(|w| {
            let (low, high) = w.borders();
            PhiWindow { name: w.name().to_string(), low, high }
        })
        .collect()
}

fn default_final_window() -> usize {
    DeltaPhiWindow::NearSide.sub_bin()
}

impl Default for ProjectionConfig {
    fn default() -> Self {
        Self { windows: default_windows(), final_window: default_final_window() }
    }
}

/// Seagull override entry; unset values keep the built-in rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeagullOverride {
    /// Bins the entry applies to
    #[serde(flatten)]
    pub bins: BinPattern,
    /// Fit method (0..=6)
    #[serde(default)]
    pub method: Option<u8>,
    /// Veto
    #[serde(default)]
    pub veto: Option<SeagullVeto>,
    /// |Δη| below which the correction is 1
    #[serde(default)]
    pub constant_region: Option<f64>,
}

/// Mixed-event fit-region override.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FitRegionOverride {
    /// Bins the entry applies to
    #[serde(flatten)]
    pub bins: BinPattern,
    /// Fit region for these bins
    pub fit_region: f64,
}

/// Correction substitution entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubstitutionOverride {
    /// Bins the entry applies to
    #[serde(flatten)]
    pub bins: BinPattern,
    /// Asymmetry bin whose correction is used instead
    pub use_asymmetry: AsymmetryRedirect,
}

/// Radial-profile cleaning entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CleaningOverride {
    /// Bins the entry applies to
    #[serde(flatten)]
    pub bins: BinPattern,
    /// `(ΔR bin counted from 1, value)` replacements
    pub points: Vec<CleaningPoint>,
}

/// Additional override-table entries, appended after the built-in ones.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OverrideConfig {
    /// Seagull entries
    #[serde(default)]
    pub seagull: Vec<SeagullOverride>,
    /// Mixed-event fit-region exceptions
    #[serde(default)]
    pub mixed_event_fit_region: Vec<FitRegionOverride>,
    /// Tracking correction substitutions
    #[serde(default)]
    pub tracking_substitutions: Vec<SubstitutionOverride>,
    /// Fragmentation-bias correction substitutions
    #[serde(default)]
    pub jff_substitutions: Vec<SubstitutionOverride>,
    /// Radial-profile cleaning
    #[serde(default)]
    pub cleaning: Vec<CleaningOverride>,
}

/// Complete pipeline configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Data-type string, e.g. `"PbPb"`, `"pp MC"`.
    #[serde(default = "default_data_type")]
    pub data_type: String,
    /// Generator-level simulation.
    #[serde(default)]
    pub generator_level: bool,
    /// Analysis bin borders.
    #[serde(default)]
    pub bins: BinBorders,
    /// Bin selection.
    #[serde(default)]
    pub selection: Selection,
    /// Enabled corrections.
    #[serde(default)]
    pub corrections: CorrectionSwitches,
    /// First step to run.
    #[serde(default)]
    pub start_level: PipelineStep,
    /// Mixed-event parameters.
    #[serde(default)]
    pub mixed_event: MixedEventConfig,
    /// Seagull parameters.
    #[serde(default)]
    pub seagull: SeagullConfig,
    /// Background parameters.
    #[serde(default)]
    pub background: BackgroundConfig,
    /// Jet-shape parameters.
    #[serde(default)]
    pub jet_shape: JetShapeConfig,
    /// Projection parameters.
    #[serde(default)]
    pub projections: ProjectionConfig,
    /// Additional override entries.
    #[serde(default)]
    pub overrides: OverrideConfig,
    /// Worker threads (0 = rayon default).
    #[serde(default)]
    pub threads: usize,
}

fn default_data_type() -> String {
    "PbPb".to_string()
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            data_type: default_data_type(),
            generator_level: false,
            bins: BinBorders::default(),
            selection: Selection::default(),
            corrections: CorrectionSwitches::default(),
            start_level: PipelineStep::default(),
            mixed_event: MixedEventConfig::default(),
            seagull: SeagullConfig::default(),
            background: BackgroundConfig::default(),
            jet_shape: JetShapeConfig::default(),
            projections: ProjectionConfig::default(),
            overrides: OverrideConfig::default(),
            threads: 0,
        }
    }
}

impl PipelineConfig {
    /// Decoded dataset kind.
    pub fn dataset(&self) -> Result<DatasetKind> {
        DatasetKind::from_data_type(&self.data_type)
            .ok_or_else(|| Error::Validation(format!("unknown data type '{}'", self.data_type)))
    }

    /// Number of asymmetry bins; also the index of the integrated bin.
    pub fn n_asymmetry(&self) -> usize {
        self.bins.n_asymmetry()
    }

    /// Last selected centrality bin.
    pub fn last_centrality(&self) -> usize {
        let last = self.bins.n_centrality().saturating_sub(1);
        self.selection.last_centrality.map_or(last, |c| c.min(last))
    }

    /// Last selected track pT bin.
    pub fn last_track_pt(&self) -> usize {
        let last = self.bins.n_track_pt().saturating_sub(1);
        self.selection.last_track_pt.map_or(last, |t| t.min(last))
    }

    /// Last selected asymmetry bin.
    pub fn last_asymmetry(&self) -> usize {
        let last = self.n_asymmetry();
        self.selection.last_asymmetry.map_or(last, |a| a.min(last))
    }

    /// ΔR axis of the radial profiles.
    pub fn r_axis(&self) -> Result<Axis> {
        Axis::new(self.jet_shape.r_bins.clone())
    }

    /// Check the configuration for internal consistency.
    pub fn validate(&self) -> Result<()> {
        self.dataset()?;
        self.bins.validate()?;
        self.r_axis()?;
        let s = &self.selection;
        if s.first_centrality > self.last_centrality()
            || s.first_track_pt > self.last_track_pt()
            || s.first_asymmetry > self.last_asymmetry()
        {
            return Err(Error::Validation("bin selection is empty".to_string()));
        }
        if !(self.mixed_event.fit_region > 0.0) {
            return Err(Error::Validation("mixed-event fit region must be positive".to_string()));
        }
        if self.seagull.rebin == 0 {
            return Err(Error::Validation("seagull rebin factor must be at least 1".to_string()));
        }
        if let Some(m) = self.overrides.seagull.iter().filter_map(|o| o.method).find(|m| *m > seagull::MAX_METHOD) {
            return Err(Error::Validation(format!("unknown seagull method {m} (expected 0..={})", seagull::MAX_METHOD)));
        }
        for o in &self.overrides.jff_substitutions {
            let AsymmetryRedirect::Bin(target) = o.use_asymmetry else {
                continue;
            };
            let adjacent = o.bins.asymmetry.is_some_and(|a| a.abs_diff(target) <= 1);
            if !adjacent || target >= self.n_asymmetry() {
                return Err(Error::Validation(format!(
                    "fragmentation-bias substitution {:?} -> asymmetry {target} is not an adjacent bin",
                    o.bins
                )));
            }
        }
        let b = &self.background;
        if !(b.min_delta_eta < b.max_delta_eta) {
            return Err(Error::Validation(format!(
                "background region [{}, {}] is empty",
                b.min_delta_eta, b.max_delta_eta
            )));
        }
        if b.fourier_harmonics == 0 {
            return Err(Error::Validation("at least one Fourier harmonic is needed".to_string()));
        }
        if self.projections.final_window >= self.projections.windows.len() {
            return Err(Error::Validation(format!(
                "final window {} not among the {} Δφ windows",
                self.projections.final_window,
                self.projections.windows.len()
            )));
        }
        Ok(())
    }

    /// Selected bins in processing order: category, asymmetry, centrality,
    /// track pT. Inclusive categories appear only at the integrated asymmetry.
    pub fn coordinates(&self) -> Vec<BinCoordinate> {
        let n_asym = self.n_asymmetry();
        let s = &self.selection;
        let mut out = Vec::new();
        for category in Category::ALL.into_iter().filter(|c| s.categories.contains(c)) {
            let asymmetries: Vec<usize> = if category.is_inclusive() {
                vec![n_asym]
            } else {
                (s.first_asymmetry..=self.last_asymmetry()).collect()
            };
            for asymmetry in asymmetries {
                for centrality in s.first_centrality..=self.last_centrality() {
                    for track_pt in s.first_track_pt..=self.last_track_pt() {
                        out.push(BinCoordinate::new(category, asymmetry, centrality, track_pt, n_asym));
                    }
                }
            }
        }
        out
    }
}
