//! Per-glycan analysis: EIC extraction, smoothing, peak picking and scoring.
//!
//! Stages, per (adduct, sample) pair:
//!
//! 1. **Extraction**: validate every MS1 scan against the ion target.
//! 2. **Peak picking**: smooth the validated trace and run the detector over
//!    the retention time window.
//! 3. **Scoring**: mass accuracy, isotope fit, curve fit, signal-to-noise and
//!    area; peaks at or below the area threshold are dropped.
//!
//! Glycans are processed one after the other in library order. Entries that
//! cannot be told apart by m/z are marked ambiguous with the first one in
//! the library and reuse its peaks when both are analyzed together.

use crate::errors::Result;
use crate::models::{
    AnalyzedGlycan,
    Peak,
};
use glycoquery::eic::{
    EicSeries,
    ValidationParams,
    build_eic,
};
use glycoquery::{
    DataProcessingError,
    IonTarget,
    LibraryEntry,
    NoiseProfile,
    RtWindow,
    SampleRun,
    TargetLibrary,
    estimate_noise,
    fixed_noise,
};
use indicatif::ProgressBar;
use serde::{
    Deserialize,
    Serialize,
};
use std::ops::Range;
use std::time::Instant;
use tracing::{
    debug,
    info,
    warn,
};

use super::auc::peak_auc;
use super::peak_detection::{
    PeakCandidate,
    PeakDetectionParams,
    detect_peaks,
};
use super::quality::{
    curve_fit,
    isotope_fit_score,
    mass_accuracy,
    signal_to_noise,
};
use super::smoothing::smooth_intensity;
use super::timings::AnalysisTimings;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AnalysisParameters {
    pub validation: ValidationParams,
    pub rt_window: RtWindow,
    /// `None` picks a width worth [`super::peak_detection::AUTO_MIN_PEAK_MINUTES`].
    pub min_points_per_peak: Option<usize>,
    pub limit_peaks: Option<usize>,
    /// `None` uses each sample's noise level as the area threshold.
    pub auc_threshold: Option<f64>,
}

impl Default for AnalysisParameters {
    fn default() -> Self {
        Self {
            validation: ValidationParams::default(),
            rt_window: RtWindow::default(),
            min_points_per_peak: None,
            limit_peaks: None,
            auc_threshold: None,
        }
    }
}

impl AnalysisParameters {
    pub fn validate(&self) -> std::result::Result<(), DataProcessingError> {
        self.validation.tolerance.validate()?;
        if self.validation.min_isotope_peaks == 0 {
            return Err(DataProcessingError::InvalidParameter {
                name: "min_isotope_peaks",
                value: "0".to_string(),
            });
        }
        if self.validation.max_charges == 0 {
            return Err(DataProcessingError::InvalidParameter {
                name: "max_charges",
                value: "0".to_string(),
            });
        }
        if let Some(0) = self.limit_peaks {
            return Err(DataProcessingError::InvalidParameter {
                name: "limit_peaks",
                value: "0".to_string(),
            });
        }
        if let Some(0) = self.min_points_per_peak {
            return Err(DataProcessingError::InvalidParameter {
                name: "min_points_per_peak",
                value: "0".to_string(),
            });
        }
        Ok(())
    }
}

/// A sample with its noise level and scan spacing computed once.
#[derive(Debug, Clone)]
pub struct PreparedSample {
    pub run: SampleRun,
    pub noise: NoiseProfile,
    /// Median MS1 spacing in minutes; `NaN` with fewer than two scans.
    pub spacing: f64,
}

impl PreparedSample {
    pub fn name(&self) -> &str {
        self.run.name()
    }
}

/// Computes noise for every sample, or applies the user supplied levels.
pub fn prepare_samples(
    runs: Vec<SampleRun>,
    rt_window: &RtWindow,
    custom_noise: Option<&[f64]>,
) -> Result<Vec<PreparedSample>> {
    if let Some(levels) = custom_noise {
        if levels.len() != runs.len() {
            return Err(DataProcessingError::ExpectedSlicesSameLength {
                expected: runs.len(),
                other: levels.len(),
                context: "custom noise levels vs samples".to_string(),
            }
            .into());
        }
    }

    let prepared = runs
        .into_iter()
        .enumerate()
        .map(|(i, run)| {
            let noise = match custom_noise {
                Some(levels) => fixed_noise(&run, levels[i]),
                None => estimate_noise(&run, rt_window),
            };
            if noise.is_defined() {
                info!(
                    "Noise level for {}: {:.2} ({} MS1 scans{})",
                    run.name(),
                    noise.baseline,
                    run.num_ms1(),
                    if noise.user_supplied { ", user supplied" } else { "" }
                );
            } else {
                warn!(
                    "No usable MS1 scans in the retention time window for {}, it will be skipped",
                    run.name()
                );
            }
            let spacing = run.ms1_spacing().unwrap_or(f64::NAN);
            PreparedSample {
                run,
                noise,
                spacing,
            }
        })
        .collect();
    Ok(prepared)
}

pub struct GlycanAnalyzer<'a> {
    pub samples: &'a [PreparedSample],
    pub params: &'a AnalysisParameters,
}

impl<'a> GlycanAnalyzer<'a> {
    pub fn new(samples: &'a [PreparedSample], params: &'a AnalysisParameters) -> Self {
        Self { samples, params }
    }

    /// Traces every adduct of `entry` through every sample.
    #[cfg_attr(
        feature = "instrumentation",
        tracing::instrument(skip_all, level = "trace")
    )]
    pub fn analyze_entry(&self, entry: &LibraryEntry) -> Result<(AnalyzedGlycan, AnalysisTimings)> {
        let targets = entry.ion_targets()?;
        let mut out = AnalyzedGlycan::new(entry.clone(), self.samples.len());
        let mut timings = AnalysisTimings::default();

        for (adduct_idx, target) in targets.iter().enumerate() {
            for (sample_idx, sample) in self.samples.iter().enumerate() {
                let peaks = self.trace_target(entry, target, sample, &mut timings)?;
                out.set_peaks(adduct_idx, sample_idx, peaks);
            }
        }
        Ok((out, timings))
    }

    fn trace_target(
        &self,
        entry: &LibraryEntry,
        target: &IonTarget,
        sample: &PreparedSample,
        timings: &mut AnalysisTimings,
    ) -> Result<Vec<Peak>> {
        if !sample.noise.is_defined() {
            return Ok(Vec::new());
        }

        let st = Instant::now();
        let mut eic = build_eic(
            &sample.run,
            &sample.noise,
            target,
            &self.params.validation,
            &self.params.rt_window,
        );
        timings.extraction += st.elapsed();

        if eic.max_intensity() < sample.noise.baseline && !entry.internal_standard {
            debug!(
                "{} {} in {}: chromatogram below noise, skipping",
                entry.formula,
                target.label,
                sample.name()
            );
            return Ok(Vec::new());
        }
        let Some(bounds) = eic.window_bounds() else {
            return Ok(Vec::new());
        };

        let st = Instant::now();
        eic.set_smoothed(smooth_intensity(&eic.intensity))?;
        let detection = PeakDetectionParams::for_spacing(
            sample.spacing,
            self.params.min_points_per_peak,
            self.params.limit_peaks,
            entry.internal_standard,
        );
        let candidates =
            detect_peaks(&eic.rt, &eic.smoothed, &eic.intensity, bounds, &detection);
        timings.peak_picking += st.elapsed();

        let st = Instant::now();
        let threshold = self.params.auc_threshold.unwrap_or(sample.noise.baseline);
        let peaks = candidates
            .iter()
            .map(|cand| self.score_peak(&eic, cand, target, sample))
            .filter(|peak| peak.auc > threshold)
            .collect();
        timings.scoring += st.elapsed();
        Ok(peaks)
    }

    fn score_peak(
        &self,
        eic: &EicSeries,
        cand: &PeakCandidate,
        target: &IonTarget,
        sample: &PreparedSample,
    ) -> Peak {
        let range = cand.start..=cand.end;
        let fallback = self.params.validation.tolerance.fallback_ppm(target.mz);
        let (ppm_error, missing_ppm_points) = mass_accuracy(&eic.ppm_error[range.clone()], fallback);
        let isotope_fit = isotope_fit_score(&eic.isotope_fit[range.clone()]);
        let curve = curve_fit(&eic.rt[range.clone()], &eic.smoothed[range], sample.spacing);

        Peak {
            apex_index: cand.apex,
            apex_rt: cand.apex_rt,
            apex_intensity: cand.apex_intensity,
            start_index: cand.start,
            end_index: cand.end,
            start_rt: eic.rt[cand.start],
            end_rt: eic.rt[cand.end],
            width_minutes: eic.rt[cand.end] - eic.rt[cand.start],
            auc: peak_auc(&eic.raw_trace, &eic.intensity, cand.start, cand.end),
            ppm_error,
            missing_ppm_points,
            isotope_fit,
            curve_fit: curve,
            signal_to_noise: signal_to_noise(cand.apex_intensity, sample.noise.baseline),
        }
    }

    /// Analyzes entries `range` of the library in order.
    ///
    /// An entry with an earlier twin in the library (same neutral mass and
    /// adduct m/z) is marked ambiguous with it. When the twin falls inside
    /// the same range its peaks are reused instead of traced again.
    pub fn analyze_chunk(
        &self,
        library: &TargetLibrary,
        range: Range<usize>,
        progress: Option<&ProgressBar>,
    ) -> Result<(Vec<AnalyzedGlycan>, AnalysisTimings)> {
        let entries = library.entries().get(range.clone()).ok_or_else(|| {
            DataProcessingError::InvalidParameter {
                name: "range",
                value: format!("{:?} (of {} entries)", range, library.len()),
            }
        })?;
        let mut out: Vec<AnalyzedGlycan> = Vec::with_capacity(entries.len());
        let mut timings = AnalysisTimings::default();

        for (idx, entry) in range.clone().zip(entries) {
            let twin_idx = library.twin_of(idx);
            let glycan = match twin_idx.filter(|i| range.contains(i)) {
                Some(i) => {
                    let twin = &out[i - range.start];
                    debug!(
                        "{} is indistinguishable from {}, reusing its peaks",
                        entry.formula, twin.entry.formula
                    );
                    AnalyzedGlycan::reuse_from(entry.clone(), twin)
                }
                None => {
                    let (mut glycan, t) = self.analyze_entry(entry)?;
                    timings += t;
                    glycan.ambiguous_with =
                        twin_idx.map(|i| library.entries()[i].formula.clone());
                    glycan
                }
            };
            out.push(glycan);
            if let Some(pb) = progress {
                pb.inc(1);
            }
        }
        Ok((out, timings))
    }
}
