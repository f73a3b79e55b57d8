use approx::assert_relative_eq;
use jc_core::{BinCoordinate, Category, DistributionKind, Stage};
use jc_hist::source::axes;
use jc_hist::{
    Archive, Axis, BinBorders, CorrectionEntry, CorrectionSet, CorrectionVariant, Distribution, RawInput,
    SourceTable, spectrum_key,
};
use jc_pipeline::config::{PipelineConfig, Selection};
use jc_pipeline::{Corrections, PipelineOrchestrator, PipelineStep, StepStatus, Store};
use proptest::prelude::*;
use std::collections::BTreeMap;
use std::f64::consts::PI;
use std::path::PathBuf;

const CATEGORIES: [Category; 3] = [Category::TrackLeadingJet, Category::TrackSubleadingJet, Category::TrackInclusiveJet];

fn tmp_file(tag: &str) -> PathBuf {
    let nanos = std::time::SystemTime::now().duration_since(std::time::UNIX_EPOCH).unwrap().as_nanos();
    std::env::temp_dir().join(format!("jc_pipeline_{tag}_{}_{nanos}.json", std::process::id()))
}

fn table_axes() -> Vec<Axis> {
    vec![
        Axis::new(vec![1.0, 2.0, 3.0]).unwrap(),
        Axis::uniform(16, -PI / 2.0, 3.0 * PI / 2.0).unwrap(),
        Axis::uniform(20, -2.5, 2.5).unwrap(),
        Axis::new(vec![0.0, 0.5, 1.0]).unwrap(),
        Axis::new(vec![0.0, 10.0, 30.0]).unwrap(),
        Axis::uniform(2, -0.5, 1.5).unwrap(),
    ]
}

/// Near-side peak and away-side ridge on a flat pedestal, times a triangular
/// pair acceptance in Δη. Mixed events carry the acceptance only.
fn source_table(category: Category, same_scale: f64) -> SourceTable {
    let table_axes = table_axes();
    let peak = match category.leg() {
        jc_core::JetLeg::Leading => 6.0,
        jc_core::JetLeg::Subleading => 3.0,
        jc_core::JetLeg::Inclusive => 4.5,
    };
    let mut table = SourceTable::new(category.name(), table_axes.clone());
    for t in 0..2 {
        for ip in 0..16 {
            let phi = table_axes[axes::DELTA_PHI].center(ip);
            for ie in 0..20 {
                let eta = table_axes[axes::DELTA_ETA].center(ie);
                let acceptance = 1.0 - eta.abs() / 5.0;
                for a in 0..2 {
                    for c in 0..2 {
                        let pedestal = 20.0 + 5.0 * c as f64 + a as f64;
                        let near = peak / (1.0 + t as f64) * (-(phi * phi + eta * eta) / 0.18).exp();
                        let away = 2.0 * (-(phi - PI).powi(2) / 0.5).exp();
                        let same = same_scale * acceptance * (pedestal + near + away);
                        let mixed = 50.0 * acceptance;
                        table.set_bin(&[t, ip, ie, a, c, 0], same, same_scale * same).unwrap();
                        table.set_bin(&[t, ip, ie, a, c, 1], mixed, mixed).unwrap();
                    }
                }
            }
        }
    }
    table
}

fn raw_input(same_scale: f64) -> RawInput {
    let pt = Axis::uniform(4, 100.0, 300.0).unwrap();
    let spectrum = |n: f64| Distribution::from_values("jetPt", pt.clone(), vec![n, n / 2.0, n / 4.0, n / 8.0], vec![n; 4]).unwrap();
    let mut raw = RawInput::default();
    for category in CATEGORIES {
        raw.tables.insert(category.name().to_string(), source_table(category, same_scale));
    }
    for c in 0..2 {
        for a in 0..3 {
            raw.dijet_spectra.insert(spectrum_key(c, Some(a)), spectrum(400.0 + 10.0 * a as f64));
        }
        raw.inclusive_spectra.insert(spectrum_key(c, None), spectrum(900.0));
    }
    raw
}

fn config() -> PipelineConfig {
    PipelineConfig {
        bins: BinBorders {
            centrality: vec![0.0, 10.0, 30.0],
            track_pt: vec![1.0, 2.0, 3.0],
            asymmetry: vec![0.0, 0.5, 1.0],
        },
        selection: Selection { categories: CATEGORIES.to_vec(), ..Selection::default() },
        ..PipelineConfig::default()
    }
}

fn run(config: &PipelineConfig, raw: &RawInput, corrections: Corrections) -> (Store, jc_pipeline::PipelineReport) {
    let mut store = Store::new();
    let report = PipelineOrchestrator::new(config, corrections).unwrap().run(Some(raw), &mut store).unwrap();
    (store, report)
}

#[test]
fn full_run_fills_every_stage() {
    let cfg = config();
    let coords = cfg.coordinates();
    // 2 dijet categories × 3 asymmetries × 2 × 2, inclusive at the integrated bin only
    assert_eq!(coords.len(), 2 * 3 * 4 + 4);
    let (store, report) = run(&cfg, &raw_input(1.0), Corrections::default());

    assert_eq!(report.ingested, coords.len());
    assert!(report.mismatches.is_empty());
    for coord in &coords {
        assert!(store.correlation(Stage::MixedEventCorrected, coord).is_some(), "{coord}");
        assert!(store.correlation(Stage::Signal, coord).is_some(), "{coord}");
        assert!(store.get_exact(Stage::FinalProjection, DistributionKind::DeltaPhiSignalRegion, coord).is_some());
        assert!(store.vn(coord, 2).is_some());
    }
    assert!(matches!(
        report.step(PipelineStep::TrackingResidualCorrection).unwrap().status,
        StepStatus::Skipped { .. }
    ));
    let jff = report.step(PipelineStep::FragmentationBiasCorrection).unwrap();
    assert_eq!(jff.status, StepStatus::Ran);
    assert_eq!(jff.produced, coords.len());
}

#[test]
fn mixed_event_correction_removes_acceptance() {
    let cfg = config();
    let (store, _) = run(&cfg, &raw_input(1.0), Corrections::default());
    let coord = BinCoordinate::new(Category::TrackLeadingJet, 0, 0, 0, 2);
    let corrected = store.correlation(Stage::MixedEventCorrected, &coord).unwrap();
    // The away-side tail at large |Δη| has no acceptance slope left.
    let (edge, inner) = (corrected.value(0, 0), corrected.value(0, 3));
    assert_relative_eq!(edge, inner, max_relative = 1e-9);
    assert!(corrected.values.iter().all(|v| *v >= 0.0));
}

#[test]
fn background_subtraction_is_exactly_linear() {
    let cfg = config();
    let (store, _) = run(&cfg, &raw_input(1.0), Corrections::default());
    for coord in cfg.coordinates() {
        let corrected = store.correlation(Stage::Corrected, &coord).unwrap();
        let background = store.correlation(Stage::Background, &coord).unwrap();
        let subtracted = store.correlation(Stage::BackgroundSubtracted, &coord).unwrap();
        for i in 0..corrected.values.len() {
            assert_eq!(subtracted.values[i], corrected.values[i] - background.values[i]);
        }
    }
}

#[test]
fn resume_from_background_subtraction_is_bit_identical() {
    let cfg = config();
    let (first, _) = run(&cfg, &raw_input(1.0), Corrections::default());

    let file = tmp_file("resume");
    first.to_archive().save(&file).unwrap();
    let archive = Archive::load(&file).unwrap();
    let _ = std::fs::remove_file(&file);

    let resumed_cfg = PipelineConfig { start_level: PipelineStep::BackgroundSubtraction, ..cfg };
    let mut second = Store::from_archive(&archive);
    let report = PipelineOrchestrator::new(&resumed_cfg, Corrections::default())
        .unwrap()
        .run(None, &mut second)
        .unwrap();

    assert_eq!(
        report.step(PipelineStep::SeagullCorrection).unwrap().status,
        StepStatus::Skipped { reason: "before start level".to_string() }
    );
    assert_eq!(second.len(), first.len());
    for (stage, kind, coord, d) in first.iter().filter(|(s, ..)| *s >= Stage::BackgroundSubtracted) {
        assert_eq!(second.get_exact(stage, kind, coord), Some(d), "{stage} {kind:?} {coord}");
    }
}

#[test]
fn normalized_jet_shapes_integrate_to_one() {
    let cfg = config();
    let (store, _) = run(&cfg, &raw_input(1.0), Corrections::default());
    let mut groups: BTreeMap<(Category, usize, usize), f64> = BTreeMap::new();
    let mut profiles = 0;
    for (stage, kind, coord, d) in store.iter() {
        if stage != Stage::NormalizedJetShape || kind != DistributionKind::RadialProfile {
            continue;
        }
        profiles += 1;
        let integral: f64 = (0..d.nx()).filter(|&k| d.x.bin_high(k) <= 1.0 + 1e-9).map(|k| d.values[k] * d.x.width(k)).sum();
        *groups.entry((coord.category, coord.asymmetry, coord.centrality)).or_default() += integral;
    }
    assert_eq!(profiles, cfg.coordinates().len());
    for total in groups.values() {
        assert_relative_eq!(*total, 1.0, epsilon = 1e-9);
    }
}

#[test]
fn spillover_leaves_highest_track_pt_untouched() {
    let cfg = config();
    let x = Axis::uniform(16, -PI / 2.0, 3.0 * PI / 2.0).unwrap();
    let y = Axis::uniform(20, -2.5, 2.5).unwrap();
    let map = Distribution::from_values_2d("spill", x, y, vec![0.01; 320], vec![1e-6; 320]).unwrap();
    let mut set = CorrectionSet::new("spillover", 2);
    for category in CATEGORIES {
        for c in 0..2 {
            for t in 0..2 {
                set.insert(CorrectionEntry {
                    category,
                    centrality: c,
                    track_pt: t,
                    asymmetry: 2,
                    variant: CorrectionVariant::Nominal,
                    distribution: map.clone(),
                    residual_scale: None,
                });
            }
        }
    }
    let corrections = Corrections { spillover: Box::new(set), ..Corrections::default() };
    let (store, report) = run(&cfg, &raw_input(1.0), corrections);

    let step = report.step(PipelineStep::SpilloverCorrection).unwrap();
    assert_eq!(step.status, StepStatus::Ran);
    for coord in cfg.coordinates() {
        let spilled = store.get_exact(Stage::SpilloverCorrected, DistributionKind::DeltaEtaDeltaPhi, &coord);
        if coord.track_pt == 1 {
            assert!(spilled.is_none(), "{coord}");
        } else {
            let before = store
                .get_exact(Stage::SeagullCorrected, DistributionKind::DeltaEtaDeltaPhi, &coord)
                .or_else(|| store.get_exact(Stage::MixedEventCorrected, DistributionKind::DeltaEtaDeltaPhi, &coord))
                .unwrap();
            let spilled = spilled.unwrap();
            for i in 0..before.values.len() {
                assert_relative_eq!(spilled.values[i], before.values[i] - 0.01, epsilon = 1e-12);
                assert_eq!(spilled.variances[i], before.variances[i]);
            }
        }
    }
    assert_eq!(step.unchanged, cfg.coordinates().iter().filter(|c| c.track_pt == 1).count());
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(6))]

    #[test]
    fn background_subtracted_yield_scales_with_same_event(k in 0.5f64..4.0) {
        let mut cfg = config();
        cfg.corrections.seagull = false;
        cfg.selection.last_centrality = Some(0);
        let (base, _) = run(&cfg, &raw_input(1.0), Corrections::default());
        let (scaled, _) = run(&cfg, &raw_input(k), Corrections::default());
        for coord in cfg.coordinates() {
            let a = base.correlation(Stage::BackgroundSubtracted, &coord).unwrap();
            let b = scaled.correlation(Stage::BackgroundSubtracted, &coord).unwrap();
            for i in 0..a.values.len() {
                prop_assert!((b.values[i] - k * a.values[i]).abs() <= 1e-9 * (1.0 + (k * a.values[i]).abs()));
            }
        }
    }
}
