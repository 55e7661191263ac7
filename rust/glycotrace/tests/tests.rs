use glycoquery::models::AdductTarget;
use glycoquery::serde::{
    RecordFormat,
    read_library,
    read_sample,
    write_records,
};
use glycoquery::{
    LibraryEntry,
    Spectrum,
};
use glycotrace::output::{
    result_rows,
    write_outputs,
};
use glycotrace::partition::{
    PartialStore,
    WorkerContext,
    merge_partials,
};
use glycotrace::{
    AnalysisParameters,
    MergedRun,
    prepare_samples,
};
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

const ISOTOPE_STEP: f64 = 1.003355;
const BACKGROUND: f64 = 50.0;

fn entry(formula: &str, mz: f64) -> LibraryEntry {
    let neutral = mz - 1.007276;
    LibraryEntry {
        formula: formula.to_string(),
        composition: BTreeMap::new(),
        neutral_mass: neutral,
        tag_mass: 0.0,
        envelope_mass: vec![neutral, neutral + ISOTOPE_STEP, neutral + 2.0 * ISOTOPE_STEP],
        envelope_abundance: vec![1.0, 0.5, 0.2],
        adducts: vec![AdductTarget {
            label: "H1".to_string(),
            mz,
        }],
        internal_standard: false,
    }
}

/// Five entries; the last one shares every mass with the first.
fn library_entries() -> Vec<LibraryEntry> {
    vec![
        entry("H3N2", 700.0),
        entry("H4N3", 900.0),
        entry("H5N4", 1100.0),
        entry("H6N5", 1300.0),
        entry("H3N2-isomer", 700.0),
    ]
}

/// Each target elutes once, at `first_apex + i` minutes, over a flat
/// background. Most scans hold background only, so the sample noise is the
/// background level.
fn spectra(first_apex: f64) -> Vec<Spectrum> {
    let targets = [700.0, 900.0, 1100.0, 1300.0];
    (0..1200u32)
        .map(|i| {
            let rt = i as f64 * 0.01;
            let mut peaks: Vec<(f64, f64)> = (0..15)
                .map(|k| (300.0 + 37.0 * k as f64, BACKGROUND))
                .collect();
            for (t, mz) in targets.iter().enumerate() {
                let apex = first_apex + t as f64;
                let amp = 1e5 * (-0.5 * ((rt - apex) / 0.1).powi(2)).exp();
                if amp > 200.0 {
                    peaks.push((*mz, amp));
                    peaks.push((mz + ISOTOPE_STEP, amp * 0.5));
                    peaks.push((mz + 2.0 * ISOTOPE_STEP, amp * 0.2));
                }
            }
            peaks.sort_by(|a, b| a.0.total_cmp(&b.0));
            Spectrum {
                id: i,
                rt_minutes: rt,
                ms_level: 1,
                mz: peaks.iter().map(|p| p.0).collect(),
                intensity: peaks.iter().map(|p| p.1).collect(),
            }
        })
        .collect()
}

fn write_inputs(dir: &Path) {
    write_records(
        &library_entries(),
        &dir.join("library.ndjson"),
        RecordFormat::NdJson,
    )
    .unwrap();
    write_records(&spectra(1.0), &dir.join("s1.ndjson"), RecordFormat::NdJson).unwrap();
    write_records(
        &spectra(1.05),
        &dir.join("s2.msgpack.zst"),
        RecordFormat::MessagePackZstd,
    )
    .unwrap();
}

fn run(dir: &Path, n_workers: usize, partials: &str) -> MergedRun {
    let params = AnalysisParameters::default();
    let library = read_library(&dir.join("library.ndjson")).unwrap();
    let runs = vec![
        read_sample(&dir.join("s1.ndjson")).unwrap(),
        read_sample(&dir.join("s2.msgpack.zst")).unwrap(),
    ];
    let samples = prepare_samples(runs, &params.rt_window, None).unwrap();
    let store = PartialStore::new(dir.join(partials)).unwrap();

    let ctx = WorkerContext {
        library: &library,
        samples: &samples,
        params: &params,
        store: &store,
        n_workers,
        stagger: Duration::ZERO,
    };
    let acc = ctx.run_workers(None);
    assert_eq!(acc.failed, 0);
    assert_eq!(acc.reports.len(), n_workers);
    merge_partials(&store, n_workers).unwrap()
}

fn rows_per_sample(merged: &MergedRun) -> BTreeMap<String, usize> {
    let mut counts = BTreeMap::new();
    for row in result_rows(merged) {
        *counts.entry(row.sample).or_insert(0) += 1;
    }
    counts
}

#[test]
fn test_partitioned_run_matches_single_worker() {
    let dir = tempfile::tempdir().unwrap();
    write_inputs(dir.path());

    let single = run(dir.path(), 1, "partials_1");
    let split = run(dir.path(), 3, "partials_3");

    assert_eq!(single.glycans.len(), 5);
    assert_eq!(split.glycans.len(), 5);
    assert_eq!(single.total_peaks(), split.total_peaks());
    assert_eq!(rows_per_sample(&single), rows_per_sample(&split));
    // The isomer lands in a different chunk than its twin when split.
    assert_eq!(result_rows(&single), result_rows(&split));
    assert_eq!(split.glycans[4].ambiguous_with.as_deref(), Some("H3N2"));

    let order: Vec<&str> = split
        .glycans
        .iter()
        .map(|g| g.entry.formula.as_str())
        .collect();
    let expected: Vec<String> = library_entries().into_iter().map(|e| e.formula).collect();
    assert_eq!(order, expected);
}

#[test]
fn test_end_to_end_outputs() {
    let dir = tempfile::tempdir().unwrap();
    write_inputs(dir.path());
    let merged = run(dir.path(), 2, "partials");

    // One elution per glycan per sample.
    assert_eq!(merged.total_peaks(), 10);
    assert_eq!(merged.samples[0].sample, "s1");
    assert_eq!(merged.samples[1].sample, "s2");
    assert!((merged.samples[0].noise - BACKGROUND).abs() < 1e-9);

    let twin = &merged.glycans[4];
    let first = &merged.glycans[0];
    assert_eq!(twin.peaks(0, 0), first.peaks(0, 0));

    for (t, glycan) in merged.glycans[..4].iter().enumerate() {
        let peaks = glycan.peaks(0, 0);
        assert_eq!(peaks.len(), 1, "{}", glycan.entry.formula);
        assert!((peaks[0].apex_rt - (1.0 + t as f64)).abs() <= 0.011);
        let peaks = glycan.peaks(0, 1);
        assert_eq!(peaks.len(), 1, "{}", glycan.entry.formula);
        assert!((peaks[0].apex_rt - (1.05 + t as f64)).abs() <= 0.011);
    }

    let paths = write_outputs(&merged, &dir.path().join("out")).unwrap();
    let mut reader = csv::Reader::from_path(&paths.results).unwrap();
    assert_eq!(reader.records().count(), 10);
}

#[test]
fn test_missing_worker_leaves_gap() {
    let dir = tempfile::tempdir().unwrap();
    write_inputs(dir.path());
    let full = run(dir.path(), 3, "partials");

    let store = PartialStore::new(dir.path().join("partials")).unwrap();
    std::fs::remove_file(store.path_for(1)).unwrap();
    let merged = merge_partials(&store, 3).unwrap();

    assert_eq!(merged.missing_workers, vec![1]);
    // Worker 1 held glycans 2 and 3 of 5.
    assert_eq!(merged.glycans.len(), 3);
    assert!(merged.total_peaks() < full.total_peaks());
}
