//! Runs the pipeline steps in their fixed order over the selected bins.
//!
//! Within a step, bins are processed in parallel against a read-only view of the
//! store; the products are inserted afterwards in bin order, so the result does
//! not depend on scheduling.

use crate::background::BackgroundSubtractor;
use crate::config::{PipelineConfig, PipelineStep};
use crate::jet_shape::JetShapeCalculator;
use crate::jff::FragmentationBiasCorrector;
use crate::mixed_event::{MixedEventCorrector, bin_space, ingest};
use crate::projection::ProjectionEngine;
use crate::seagull::SeagullCorrector;
use crate::spillover::SpilloverCorrector;
use crate::store::{Product, Store};
use crate::tracking::TrackingResidualCorrector;
use jc_core::{BinCoordinate, Category, DatasetKind, Error, Result, Stage};
use jc_hist::{BinSpace, CorrectionProvider, IngestionProvider, NoCorrection};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

/// Externally computed correction maps.
pub struct Corrections {
    /// Tracking residual corrections
    pub tracking: Box<dyn CorrectionProvider>,
    /// Spillover corrections
    pub spillover: Box<dyn CorrectionProvider>,
    /// Fragmentation-bias corrections
    pub jff: Box<dyn CorrectionProvider>,
}

impl Default for Corrections {
    fn default() -> Self {
        Self { tracking: Box::new(NoCorrection), spillover: Box::new(NoCorrection), jff: Box::new(NoCorrection) }
    }
}

/// Whether a step ran.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum StepStatus {
    /// The step processed the selected bins
    Ran,
    /// The step was a no-op
    Skipped {
        /// Why
        reason: String,
    },
}

/// Outcome of one step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepReport {
    /// Step
    pub step: PipelineStep,
    /// Status
    pub status: StepStatus,
    /// Bins (or groups) that produced output
    pub produced: usize,
    /// Bins the step passes through unchanged
    pub unchanged: usize,
    /// Bins skipped because of an error
    pub skipped: usize,
}

impl StepReport {
    fn skipped(step: PipelineStep, reason: impl Into<String>) -> Self {
        Self { step, status: StepStatus::Skipped { reason: reason.into() }, produced: 0, unchanged: 0, skipped: 0 }
    }

    fn ran(step: PipelineStep, counts: BinCounts) -> Self {
        Self {
            step,
            status: StepStatus::Ran,
            produced: counts.produced,
            unchanged: counts.unchanged,
            skipped: counts.skipped,
        }
    }
}

/// Summary of a run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineReport {
    /// Bins with ingested same/mixed-event correlations
    pub ingested: usize,
    /// One entry per step, in order
    pub steps: Vec<StepReport>,
    /// Configuration mismatches met along the way
    pub mismatches: Vec<String>,
}

impl PipelineReport {
    /// Report of a step.
    pub fn step(&self, step: PipelineStep) -> Option<&StepReport> {
        self.steps.iter().find(|s| s.step == step)
    }

    /// Write as pretty JSON.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        std::fs::write(path.as_ref(), serde_json::to_string_pretty(self)?)?;
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct BinCounts {
    produced: usize,
    unchanged: usize,
    skipped: usize,
}

/// Track pT bins of one `(category, asymmetry, centrality)`.
struct ProfileGroup(Vec<BinCoordinate>);

impl fmt::Display for ProfileGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0.first() {
            Some(c) => write!(f, "{}[A{}C{}]", c.category, c.asymmetry, c.centrality),
            None => f.write_str("empty group"),
        }
    }
}

/// First stage written by `step`; earlier slots survive a resumed run.
fn first_output_stage(step: PipelineStep) -> Stage {
    match step {
        PipelineStep::MixedEventCorrection => Stage::SameEvent,
        PipelineStep::SeagullCorrection => Stage::SeagullCorrected,
        PipelineStep::TrackingResidualCorrection => Stage::TrackingCorrected,
        PipelineStep::SpilloverCorrection => Stage::SpilloverCorrected,
        PipelineStep::BackgroundSubtraction => Stage::Background,
        PipelineStep::FragmentationBiasCorrection => Stage::Signal,
        PipelineStep::JetShapeCalculation => Stage::JetShape,
        PipelineStep::Projections | PipelineStep::FinalAngularYieldProjection => Stage::FinalProjection,
    }
}

/// Pipeline runner.
pub struct PipelineOrchestrator<'a> {
    config: &'a PipelineConfig,
    dataset: DatasetKind,
    corrections: Corrections,
}

impl<'a> PipelineOrchestrator<'a> {
    /// Validate the configuration and set up the runner.
    pub fn new(config: &'a PipelineConfig, corrections: Corrections) -> Result<Self> {
        config.validate()?;
        Ok(Self { config, dataset: config.dataset()?, corrections })
    }

    /// Run every step from the configured start level on.
    ///
    /// `ingestion` is required when starting with the mixed-event correction;
    /// later start levels read their inputs from `store`.
    pub fn run(
        &self,
        ingestion: Option<&(dyn IngestionProvider + Sync)>,
        store: &mut Store,
    ) -> Result<PipelineReport> {
        let start = self.config.start_level;
        let coords = self.config.coordinates();
        let mut report = PipelineReport::default();
        store.discard_from(first_output_stage(start));
        log::info!("running {} bins of {} data from {start}", coords.len(), self.config.data_type);

        for step in PipelineStep::ALL {
            if step < start {
                report.steps.push(StepReport::skipped(step, "before start level"));
                continue;
            }
            let entry = match step {
                PipelineStep::MixedEventCorrection => {
                    let provider = ingestion.ok_or_else(|| {
                        Error::Validation("the mixed-event correction needs raw input".to_string())
                    })?;
                    self.mixed_event(provider, &coords, store, &mut report)?
                }
                PipelineStep::SeagullCorrection => {
                    if self.config.corrections.seagull {
                        let corrector = SeagullCorrector::new(self.config, self.dataset);
                        self.bins(step, &coords, store, &mut report, |c, s| corrector.process(c, s))?
                    } else {
                        StepReport::skipped(step, "disabled")
                    }
                }
                PipelineStep::TrackingResidualCorrection => {
                    let corrector = TrackingResidualCorrector::new(self.config, self.corrections.tracking.as_ref());
                    match self.inactive_reason(self.config.corrections.tracking, self.corrections.tracking.as_ref(), "tracking") {
                        Some(reason) => StepReport::skipped(step, reason),
                        None => self.bins(step, &coords, store, &mut report, |c, s| corrector.process(c, s))?,
                    }
                }
                PipelineStep::SpilloverCorrection => {
                    let corrector = SpilloverCorrector::new(self.config, self.corrections.spillover.as_ref());
                    match self.inactive_reason(self.config.corrections.spillover, self.corrections.spillover.as_ref(), "spillover") {
                        Some(reason) => StepReport::skipped(step, reason),
                        None => self.bins(step, &coords, store, &mut report, |c, s| corrector.process(c, s))?,
                    }
                }
                PipelineStep::BackgroundSubtraction => {
                    let subtractor = BackgroundSubtractor::new(&self.config.background);
                    self.bins(step, &coords, store, &mut report, |c, s| subtractor.process(c, s))?
                }
                PipelineStep::FragmentationBiasCorrection => {
                    // Signal is always written; an inactive correction copies the input.
                    if let Some(reason) =
                        self.inactive_reason(self.config.corrections.jff, self.corrections.jff.as_ref(), "fragmentation-bias")
                    {
                        log::info!("{step}: {reason}, copying background-subtracted yields");
                    }
                    let corrector = FragmentationBiasCorrector::new(self.config, self.corrections.jff.as_ref());
                    self.bins(step, &coords, store, &mut report, |c, s| corrector.process(c, s))?
                }
                PipelineStep::JetShapeCalculation => self.jet_shapes(&coords, store, &mut report)?,
                PipelineStep::Projections => {
                    let engine = ProjectionEngine::new(self.config);
                    self.bins(step, &coords, store, &mut report, |c, s| engine.process(c, s))?
                }
                PipelineStep::FinalAngularYieldProjection => {
                    let engine = ProjectionEngine::new(self.config);
                    self.bins(step, &coords, store, &mut report, |c, s| engine.final_projection(c, s))?
                }
            };
            report.steps.push(entry);
        }
        Ok(report)
    }

    fn inactive_reason(&self, enabled: bool, provider: &dyn CorrectionProvider, name: &str) -> Option<String> {
        if !enabled {
            return Some("disabled".to_string());
        }
        if !provider.is_ready() {
            let err = Error::CorrectionUnavailable(format!("no {name} corrections loaded"));
            log::warn!("{err}");
            return Some(err.to_string());
        }
        None
    }

    fn mixed_event(
        &self,
        provider: &(dyn IngestionProvider + Sync),
        coords: &[BinCoordinate],
        store: &mut Store,
        report: &mut PipelineReport,
    ) -> Result<StepReport> {
        let step = PipelineStep::MixedEventCorrection;
        let mut spaces: BTreeMap<Category, BinSpace> = BTreeMap::new();
        for category in self.config.selection.categories.iter().copied() {
            match bin_space(self.config, provider, category) {
                Ok(space) => {
                    spaces.insert(category, space);
                }
                Err(e) if e.is_per_bin() => log::warn!("category {category} not loaded: {e}"),
                Err(Error::ConfigurationMismatch(msg)) => {
                    log::warn!("category {category} not loaded: {msg}");
                    report.mismatches.push(format!("{step}: {category}: {msg}"));
                }
                Err(e) => return Err(e),
            }
        }

        let ingested = self.run_units(step, coords, store, report, |c, _| {
            let space = spaces
                .get(&c.category)
                .ok_or_else(|| Error::MissingDistribution(format!("source table for {c}")))?;
            ingest(c, provider, space)
        })?;
        report.ingested = ingested.produced;

        let corrector = MixedEventCorrector::new(self.config, self.dataset);
        self.bins(step, coords, store, report, |c, s| corrector.process(c, s, provider))
    }

    fn jet_shapes(&self, coords: &[BinCoordinate], store: &mut Store, report: &mut PipelineReport) -> Result<StepReport> {
        let step = PipelineStep::JetShapeCalculation;
        let calculator = JetShapeCalculator::new(self.config, self.dataset)?;
        let profiles = self.run_units(step, coords, store, report, |c, s| calculator.process(c, s))?;

        let mut groups: BTreeMap<(Category, usize, usize), Vec<BinCoordinate>> = BTreeMap::new();
        for c in coords {
            groups.entry((c.category, c.asymmetry, c.centrality)).or_default().push(*c);
        }
        let groups: Vec<ProfileGroup> = groups.into_values().map(ProfileGroup).collect();
        let normalized = self.run_units(step, &groups, store, report, |g, s| calculator.normalize_group(&g.0, s))?;
        log::info!("{step}: {} profiles, {} normalization groups", profiles.produced, normalized.produced);

        Ok(StepReport::ran(
            step,
            BinCounts {
                produced: profiles.produced,
                unchanged: profiles.unchanged,
                skipped: profiles.skipped + normalized.skipped,
            },
        ))
    }

    fn bins<F>(
        &self,
        step: PipelineStep,
        coords: &[BinCoordinate],
        store: &mut Store,
        report: &mut PipelineReport,
        f: F,
    ) -> Result<StepReport>
    where
        F: Fn(&BinCoordinate, &Store) -> Result<Vec<Product>> + Sync,
    {
        let counts = self.run_units(step, coords, store, report, f)?;
        log::info!("{step}: {} produced, {} unchanged, {} skipped", counts.produced, counts.unchanged, counts.skipped);
        Ok(StepReport::ran(step, counts))
    }

    fn run_units<T, F>(
        &self,
        step: PipelineStep,
        units: &[T],
        store: &mut Store,
        report: &mut PipelineReport,
        f: F,
    ) -> Result<BinCounts>
    where
        T: fmt::Display + Sync,
        F: Fn(&T, &Store) -> Result<Vec<Product>> + Sync,
    {
        let results: Vec<Result<Vec<Product>>> = {
            let snapshot: &Store = store;
            units.par_iter().map(|u| f(u, snapshot)).collect()
        };

        let mut counts = BinCounts::default();
        for (unit, result) in units.iter().zip(results) {
            match result {
                Ok(products) if products.is_empty() => counts.unchanged += 1,
                Ok(products) => {
                    counts.produced += 1;
                    products.into_iter().for_each(|p| store.insert_product(p));
                }
                Err(e) if e.is_per_bin() => {
                    log::debug!("{step}: skipping {unit}: {e}");
                    counts.skipped += 1;
                }
                Err(Error::ConfigurationMismatch(msg)) => {
                    log::warn!("{step}: {unit}: {msg}");
                    report.mismatches.push(format!("{step}: {unit}: {msg}"));
                    counts.skipped += 1;
                }
                Err(e) => return Err(e),
            }
        }
        Ok(counts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resume_discards_from_the_first_rerun_stage() {
        assert_eq!(first_output_stage(PipelineStep::BackgroundSubtraction), Stage::Background);
        assert_eq!(first_output_stage(PipelineStep::MixedEventCorrection), Stage::SameEvent);
        for pair in PipelineStep::ALL.windows(2) {
            assert!(first_output_stage(pair[0]) <= first_output_stage(pair[1]));
        }
    }

    #[test]
    fn mixed_event_step_needs_raw_input() {
        let cfg = PipelineConfig::default();
        let orchestrator = PipelineOrchestrator::new(&cfg, Corrections::default()).unwrap();
        let err = orchestrator.run(None, &mut Store::new()).unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[test]
    fn report_serializes() {
        let report = PipelineReport {
            ingested: 2,
            steps: vec![StepReport::skipped(PipelineStep::SpilloverCorrection, "disabled")],
            mismatches: vec!["m".to_string()],
        };
        let json = serde_json::to_string(&report).unwrap();
        let back: PipelineReport = serde_json::from_str(&json).unwrap();
        assert_eq!(back, report);
        assert!(back.step(PipelineStep::SpilloverCorrection).is_some());
    }
}
