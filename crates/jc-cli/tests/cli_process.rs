use jc_core::Category;
use jc_hist::{Archive, Axis, Distribution, RawInput, SourceTable, spectrum_key};
use std::f64::consts::PI;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use std::time::{SystemTime, UNIX_EPOCH};

fn bin_path() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_jetcorr"))
}

fn tmp_dir(name: &str) -> PathBuf {
    let nanos = SystemTime::now().duration_since(UNIX_EPOCH).unwrap().as_nanos();
    let mut p = std::env::temp_dir();
    p.push(format!("jetcorr_cli_{}_{}_{}", std::process::id(), nanos, name));
    std::fs::create_dir_all(&p).unwrap();
    p
}

fn run(args: &[&str]) -> Output {
    Command::new(bin_path())
        .args(args)
        .output()
        .unwrap_or_else(|e| panic!("failed to run {:?} {:?}: {}", bin_path(), args, e))
}

const CONFIG: &str = r#"data_type: PbPb
bins:
  centrality: [0.0, 10.0]
  track_pt: [1.0, 2.0, 3.0]
  asymmetry: [0.0, 1.0]
selection:
  categories: [TrackLeadingJet, TrackSubleadingJet]
corrections:
  seagull: false
"#;

fn write_raw_input(path: &Path) {
    let table_axes = vec![
        Axis::new(vec![1.0, 2.0, 3.0]).unwrap(),
        Axis::uniform(8, -PI / 2.0, 3.0 * PI / 2.0).unwrap(),
        Axis::uniform(16, -2.5, 2.5).unwrap(),
        Axis::new(vec![0.0, 1.0]).unwrap(),
        Axis::new(vec![0.0, 10.0]).unwrap(),
        Axis::uniform(2, -0.5, 1.5).unwrap(),
    ];
    let mut raw = RawInput::default();
    for category in [Category::TrackLeadingJet, Category::TrackSubleadingJet] {
        let mut table = SourceTable::new(category.name(), table_axes.clone());
        for t in 0..2 {
            for ip in 0..8 {
                let phi = table_axes[1].center(ip);
                for ie in 0..16 {
                    let eta = table_axes[2].center(ie);
                    let acceptance = 1.0 - eta.abs() / 5.0;
                    let same = acceptance * (10.0 + 4.0 * (-(phi * phi + eta * eta) / 0.2).exp());
                    table.set_bin(&[t, ip, ie, 0, 0, 0], same, same).unwrap();
                    table.set_bin(&[t, ip, ie, 0, 0, 1], 30.0 * acceptance, 30.0 * acceptance).unwrap();
                }
            }
        }
        raw.tables.insert(category.name().to_string(), table);
    }
    let pt = Axis::uniform(2, 100.0, 300.0).unwrap();
    for a in 0..2 {
        let spectrum = Distribution::from_values("jetPt", pt.clone(), vec![200.0, 50.0], vec![200.0, 50.0]).unwrap();
        raw.dijet_spectra.insert(spectrum_key(0, Some(a)), spectrum);
    }
    raw.save(path).unwrap();
}

#[test]
fn process_writes_archive_and_report() {
    let dir = tmp_dir("process");
    let config = dir.join("run.yaml");
    let input = dir.join("raw.json");
    let output = dir.join("out.json");
    std::fs::write(&config, CONFIG).unwrap();
    write_raw_input(&input);

    let out = run(&[
        "process",
        "--config",
        config.to_str().unwrap(),
        "--input",
        input.to_str().unwrap(),
        "--output",
        output.to_str().unwrap(),
        "--threads",
        "2",
    ]);
    assert!(out.status.success(), "stderr: {}", String::from_utf8_lossy(&out.stderr));

    let archive = Archive::load(&output).unwrap();
    assert_eq!(archive.paths("trackLeadingJet/Signal/DeltaEtaDeltaPhi/").count(), 4);
    assert!(archive.paths("trackSubleadingJet/FinalProjection/").count() > 0);

    let report: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(dir.join("out.report.json")).unwrap()).unwrap();
    assert_eq!(report["ingested"], 8);
    assert_eq!(report["steps"].as_array().unwrap().len(), 9);
    assert_eq!(report["steps"][1]["status"]["Skipped"]["reason"], "disabled");

    let listed = run(&["list", "--input", output.to_str().unwrap(), "--prefix", "trackLeadingJet/JetShape/"]);
    assert!(listed.status.success());
    let stdout = String::from_utf8(listed.stdout).unwrap();
    assert_eq!(stdout.lines().count(), 12);
    assert!(stdout.lines().all(|l| l.starts_with("trackLeadingJet/JetShape/")));

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn resumed_run_reads_the_previous_archive() {
    let dir = tmp_dir("resume");
    let config = dir.join("run.yaml");
    let input = dir.join("raw.json");
    let first = dir.join("first.json");
    std::fs::write(&config, CONFIG).unwrap();
    write_raw_input(&input);
    let out = run(&[
        "process",
        "--config",
        config.to_str().unwrap(),
        "--input",
        input.to_str().unwrap(),
        "--output",
        first.to_str().unwrap(),
    ]);
    assert!(out.status.success(), "stderr: {}", String::from_utf8_lossy(&out.stderr));

    let resume = dir.join("resume.yaml");
    std::fs::write(&resume, format!("{CONFIG}start_level: BackgroundSubtraction\n")).unwrap();
    let second = dir.join("second.json");
    let out = run(&[
        "process",
        "--config",
        resume.to_str().unwrap(),
        "--input",
        first.to_str().unwrap(),
        "--output",
        second.to_str().unwrap(),
    ]);
    assert!(out.status.success(), "stderr: {}", String::from_utf8_lossy(&out.stderr));
    assert_eq!(Archive::load(&first).unwrap(), Archive::load(&second).unwrap());

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn invalid_config_fails() {
    let dir = tmp_dir("invalid");
    let config = dir.join("run.yaml");
    std::fs::write(&config, "data_type: LHC\n").unwrap();
    let out = run(&[
        "process",
        "--config",
        config.to_str().unwrap(),
        "--input",
        dir.join("missing.json").to_str().unwrap(),
        "--output",
        dir.join("out.json").to_str().unwrap(),
    ]);
    assert!(!out.status.success());
    assert!(String::from_utf8_lossy(&out.stderr).contains("unknown data type"));
    let _ = std::fs::remove_dir_all(&dir);
}
