//! Result tables written at the end of a run.
//!
//! - `results.csv`: one row per (glycan, adduct, sample, peak), in merge
//!   order.
//! - `noise.csv`: the noise level used for each sample.
//! - `run_summary.json`: counts, absent workers and stage timings.

use crate::errors::{
    GlycoTraceError,
    Result,
};
use crate::partition::{
    MergedRun,
    SampleNoise,
};
use crate::scoring::AnalysisTimings;
use serde::Serialize;
use std::path::{
    Path,
    PathBuf,
};
use tracing::info;

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ResultRow {
    pub glycan: String,
    pub adduct: String,
    pub adduct_mz: f64,
    pub sample: String,
    pub internal_standard: bool,
    pub apex_rt: f64,
    pub start_rt: f64,
    pub end_rt: f64,
    pub width_minutes: f64,
    pub apex_intensity: f64,
    pub auc: f64,
    pub ppm_error: f64,
    pub missing_ppm_points: usize,
    pub isotope_fit: f64,
    pub curve_fit: f64,
    pub signal_to_noise: f64,
    pub ambiguous_with: Option<String>,
}

/// Flattens merged glycans into rows, glycan by glycan, adduct-major.
pub fn result_rows(merged: &MergedRun) -> Vec<ResultRow> {
    merged
        .glycans
        .iter()
        .flat_map(|glycan| {
            glycan.iter_peaks().map(move |(adduct_idx, sample_idx, peak)| {
                let adduct = &glycan.entry.adducts[adduct_idx];
                let sample = merged
                    .samples
                    .get(sample_idx)
                    .map(|s| s.sample.clone())
                    .unwrap_or_else(|| format!("sample_{}", sample_idx));
                ResultRow {
                    glycan: glycan.entry.formula.clone(),
                    adduct: adduct.label.clone(),
                    adduct_mz: adduct.mz,
                    sample,
                    internal_standard: glycan.entry.internal_standard,
                    apex_rt: peak.apex_rt,
                    start_rt: peak.start_rt,
                    end_rt: peak.end_rt,
                    width_minutes: peak.width_minutes,
                    apex_intensity: peak.apex_intensity,
                    auc: peak.auc,
                    ppm_error: peak.ppm_error,
                    missing_ppm_points: peak.missing_ppm_points,
                    isotope_fit: peak.isotope_fit,
                    curve_fit: peak.curve_fit.score,
                    signal_to_noise: peak.signal_to_noise,
                    ambiguous_with: glycan.ambiguous_with.clone(),
                }
            })
        })
        .collect()
}

fn write_csv<T: Serialize>(rows: &[T], path: &Path) -> Result<()> {
    let mut writer =
        csv::Writer::from_path(path).map_err(|e| GlycoTraceError::serialization(e, path))?;
    for row in rows {
        writer
            .serialize(row)
            .map_err(|e| GlycoTraceError::serialization(e, path))?;
    }
    writer.flush().map_err(|e| GlycoTraceError::io(e, path))?;
    Ok(())
}

#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub n_workers: usize,
    pub missing_workers: Vec<usize>,
    pub num_glycans: usize,
    pub num_rows: usize,
    pub samples: Vec<SampleNoise>,
    pub timings: AnalysisTimings,
}

#[derive(Debug, Clone)]
pub struct OutputPaths {
    pub results: PathBuf,
    pub noise: PathBuf,
    pub summary: PathBuf,
}

/// Writes every result file of `merged` into `directory`.
pub fn write_outputs(merged: &MergedRun, directory: &Path) -> Result<OutputPaths> {
    std::fs::create_dir_all(directory).map_err(|e| GlycoTraceError::io(e, directory))?;
    let paths = OutputPaths {
        results: directory.join("results.csv"),
        noise: directory.join("noise.csv"),
        summary: directory.join("run_summary.json"),
    };

    let rows = result_rows(merged);
    write_csv(&rows, &paths.results)?;
    info!("Wrote {} peaks to {}", rows.len(), paths.results.display());

    write_csv(&merged.samples, &paths.noise)?;
    info!("Wrote noise levels to {}", paths.noise.display());

    let summary = RunSummary {
        n_workers: merged.n_workers,
        missing_workers: merged.missing_workers.clone(),
        num_glycans: merged.glycans.len(),
        num_rows: rows.len(),
        samples: merged.samples.clone(),
        timings: merged.timings,
    };
    let file = std::fs::File::create(&paths.summary)
        .map_err(|e| GlycoTraceError::io(e, &paths.summary))?;
    serde_json::to_writer_pretty(file, &summary)
        .map_err(|e| GlycoTraceError::serialization(e, &paths.summary))?;
    info!("Wrote run summary to {}", paths.summary.display());

    Ok(paths)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        AnalyzedGlycan,
        CurveFit,
        Peak,
    };
    use glycoquery::LibraryEntry;
    use glycoquery::models::AdductTarget;
    use std::collections::BTreeMap;

    fn peak(apex_rt: f64) -> Peak {
        Peak {
            apex_index: 10,
            apex_rt,
            apex_intensity: 1000.0,
            start_index: 5,
            end_index: 15,
            start_rt: apex_rt - 0.05,
            end_rt: apex_rt + 0.05,
            width_minutes: 0.1,
            auc: 5000.0,
            ppm_error: 1.5,
            missing_ppm_points: 0,
            isotope_fit: 0.9,
            curve_fit: CurveFit {
                score: 0.95,
                ..Default::default()
            },
            signal_to_noise: f64::NAN,
        }
    }

    fn merged() -> MergedRun {
        let entry = LibraryEntry {
            formula: "H5N4".to_string(),
            composition: BTreeMap::new(),
            neutral_mass: 1000.0,
            tag_mass: 0.0,
            envelope_mass: vec![1000.0, 1001.0],
            envelope_abundance: vec![1.0, 0.5],
            adducts: vec![
                AdductTarget {
                    label: "H1".to_string(),
                    mz: 1001.007,
                },
                AdductTarget {
                    label: "H2".to_string(),
                    mz: 501.007,
                },
            ],
            internal_standard: false,
        };
        let mut glycan = AnalyzedGlycan::new(entry, 2);
        glycan.set_peaks(0, 1, vec![peak(3.0), peak(4.0)]);
        glycan.set_peaks(1, 0, vec![peak(5.0)]);
        MergedRun {
            n_workers: 1,
            samples: vec![
                SampleNoise {
                    sample: "s1".to_string(),
                    noise: 10.0,
                    user_supplied: false,
                },
                SampleNoise {
                    sample: "s2".to_string(),
                    noise: f64::NAN,
                    user_supplied: false,
                },
            ],
            glycans: vec![glycan],
            missing_workers: Vec::new(),
            timings: AnalysisTimings::default(),
        }
    }

    #[test]
    fn test_rows_are_adduct_major() {
        let rows = result_rows(&merged());
        let keys: Vec<(&str, &str, f64)> = rows
            .iter()
            .map(|r| (r.adduct.as_str(), r.sample.as_str(), r.apex_rt))
            .collect();
        assert_eq!(
            keys,
            vec![("H1", "s2", 3.0), ("H1", "s2", 4.0), ("H2", "s1", 5.0)]
        );
    }

    #[test]
    fn test_write_outputs() {
        let dir = tempfile::tempdir().unwrap();
        let paths = write_outputs(&merged(), &dir.path().join("out")).unwrap();

        let mut reader = csv::Reader::from_path(&paths.results).unwrap();
        let headers = reader.headers().unwrap().clone();
        assert_eq!(&headers[0], "glycan");
        assert_eq!(reader.records().count(), 3);

        let noise = std::fs::read_to_string(&paths.noise).unwrap();
        assert!(noise.starts_with("sample,noise,user_supplied"));
        assert!(noise.contains("s1,10.0,false"));

        let summary: serde_json::Value =
            serde_json::from_reader(std::fs::File::open(&paths.summary).unwrap()).unwrap();
        assert_eq!(summary["num_rows"], 3);
        assert!(summary["samples"][1]["noise"].is_null());
    }
}
