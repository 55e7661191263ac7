//! Hysteresis peak picking over a smoothed chromatogram.
//!
//! The detector is a three-state machine (idle, rising, falling) walked once
//! over the in-window part of the trace. Short plateaus or dips shorter than
//! the hysteresis length do not flip the state, so a single noisy elution
//! profile is not split into several peaks.

use serde::{
    Deserialize,
    Serialize,
};

/// Minutes of signal the hysteresis counter tolerates.
pub const HYSTERESIS_MINUTES: f64 = 0.1;
/// Minutes of signal a peak needs when no explicit minimum is configured.
pub const AUTO_MIN_PEAK_MINUTES: f64 = 0.2;

/// Number of scans spanning `minutes` at the given scan spacing (at least 1).
pub fn points_in(minutes: f64, spacing: f64) -> usize {
    if spacing.is_finite() && spacing > 0.0 {
        ((minutes / spacing).round() as usize).max(1)
    } else {
        1
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PeakDetectionParams {
    pub min_points: usize,
    pub hysteresis: usize,
    pub limit_peaks: Option<usize>,
    pub internal_standard: bool,
}

impl PeakDetectionParams {
    pub fn for_spacing(
        spacing: f64,
        min_points: Option<usize>,
        limit_peaks: Option<usize>,
        internal_standard: bool,
    ) -> Self {
        Self {
            min_points: min_points.unwrap_or_else(|| points_in(AUTO_MIN_PEAK_MINUTES, spacing)),
            hysteresis: points_in(HYSTERESIS_MINUTES, spacing),
            limit_peaks,
            internal_standard,
        }
    }
}

/// Peak boundaries as found by the detector, before scoring.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PeakCandidate {
    pub start: usize,
    pub end: usize,
    pub apex: usize,
    pub apex_rt: f64,
    pub apex_intensity: f64,
}

#[derive(Debug, Clone, Copy)]
struct Run {
    start: usize,
    stall: usize,
}

#[derive(Debug, Clone, Copy)]
enum DetectorState {
    Idle,
    Rising(Run),
    Falling(Run),
}

struct PeakDetector<'a> {
    rt: &'a [f64],
    smoothed: &'a [f64],
    apex_source: &'a [f64],
    params: &'a PeakDetectionParams,
    found: Vec<PeakCandidate>,
}

impl PeakDetector<'_> {
    fn emit(&mut self, start: usize, end: usize) {
        let (apex, apex_intensity) = (start..=end).fold((start, f64::MIN), |acc, i| {
            if self.apex_source[i] > acc.1 {
                (i, self.apex_source[i])
            } else {
                acc
            }
        });
        if apex_intensity <= 0.0 {
            return;
        }
        let npoints = end - start + 1;
        if npoints < self.params.min_points && !self.params.internal_standard {
            return;
        }
        self.found.push(PeakCandidate {
            start,
            end,
            apex,
            apex_rt: self.rt[apex],
            apex_intensity,
        });
    }

    fn step(&mut self, state: DetectorState, i: usize) -> DetectorState {
        let prev = self.smoothed[i - 1];
        let cur = self.smoothed[i];
        let hysteresis = self.params.hysteresis;
        match state {
            DetectorState::Idle => {
                if cur > prev {
                    DetectorState::Rising(Run {
                        start: i - 1,
                        stall: 0,
                    })
                } else {
                    DetectorState::Idle
                }
            }
            DetectorState::Rising(mut run) => {
                if cur > prev {
                    run.stall = 0;
                    return DetectorState::Rising(run);
                }
                if cur <= 0.0 {
                    self.emit(run.start, i);
                    return DetectorState::Idle;
                }
                run.stall += 1;
                if run.stall >= hysteresis {
                    run.stall = 0;
                    DetectorState::Falling(run)
                } else {
                    DetectorState::Rising(run)
                }
            }
            DetectorState::Falling(mut run) => {
                if cur <= 0.0 {
                    self.emit(run.start, i);
                    return DetectorState::Idle;
                }
                if cur < prev {
                    run.stall = 0;
                    return DetectorState::Falling(run);
                }
                run.stall += 1;
                if run.stall < hysteresis {
                    return DetectorState::Falling(run);
                }
                let valley = i - run.stall;
                self.emit(run.start, valley);
                if cur > prev {
                    DetectorState::Rising(Run {
                        start: valley,
                        stall: 0,
                    })
                } else {
                    DetectorState::Idle
                }
            }
        }
    }
}

/// Finds peaks in `smoothed[first..=last]`.
///
/// `rt` holds the retention time of every scan of `smoothed`. Apexes are placed on `apex_source` (the validated, unsmoothed trace).
/// A peak still falling when the window ends is closed at `last`; one still
/// rising is dropped. Output is sorted by scan index.
#[cfg_attr(
    feature = "instrumentation",
    tracing::instrument(skip_all, level = "trace")
)]
pub fn detect_peaks(
    rt: &[f64],
    smoothed: &[f64],
    apex_source: &[f64],
    bounds: (usize, usize),
    params: &PeakDetectionParams,
) -> Vec<PeakCandidate> {
    let (first, last) = bounds;
    if smoothed.is_empty()
        || last >= smoothed.len()
        || rt.len() != smoothed.len()
        || apex_source.len() != smoothed.len()
        || first >= last
    {
        return Vec::new();
    }
    let mut detector = PeakDetector {
        rt,
        smoothed,
        apex_source,
        params,
        found: Vec::new(),
    };

    let mut state = DetectorState::Idle;
    for i in (first + 1)..=last {
        state = detector.step(state, i);
    }
    if let DetectorState::Falling(run) = state {
        detector.emit(run.start, last);
    }

    let found = detector.found;
    let limit = if params.internal_standard {
        Some(1)
    } else {
        params.limit_peaks
    };
    match limit {
        Some(n) => limit_peaks(found, n),
        None => found,
    }
}

/// Keeps the most intense peak plus the `n - 1` peaks whose apex retention
/// time is closest to it. The result is sorted by retention time.
pub fn limit_peaks(peaks: Vec<PeakCandidate>, n: usize) -> Vec<PeakCandidate> {
    if peaks.len() <= n {
        return peaks;
    }
    let best = peaks
        .iter()
        .enumerate()
        .max_by(|a, b| a.1.apex_intensity.total_cmp(&b.1.apex_intensity))
        .map(|(i, _)| i);
    let Some(best) = best else {
        return peaks;
    };
    let best_rt = peaks[best].apex_rt;

    let mut ranked: Vec<PeakCandidate> = peaks;
    ranked.sort_by(|a, b| {
        (a.apex_rt - best_rt)
            .abs()
            .total_cmp(&(b.apex_rt - best_rt).abs())
    });
    ranked.truncate(n);
    ranked.sort_by(|a, b| a.apex_rt.total_cmp(&b.apex_rt));
    ranked
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gaussian(n: usize, center: f64, sigma: f64, amp: f64) -> Vec<f64> {
        (0..n)
            .map(|i| amp * (-0.5 * ((i as f64 - center) / sigma).powi(2)).exp())
            .collect()
    }

    fn rts(n: usize) -> Vec<f64> {
        (0..n).map(|i| i as f64 * 0.01).collect()
    }

    fn detect(
        trace: &[f64],
        bounds: (usize, usize),
        params: &PeakDetectionParams,
    ) -> Vec<PeakCandidate> {
        detect_peaks(&rts(trace.len()), trace, trace, bounds, params)
    }

    fn params(min_points: usize, hysteresis: usize) -> PeakDetectionParams {
        PeakDetectionParams {
            min_points,
            hysteresis,
            limit_peaks: None,
            internal_standard: false,
        }
    }

    #[test]
    fn test_points_in() {
        assert_eq!(points_in(0.1, 0.01), 10);
        assert_eq!(points_in(0.2, 0.01), 20);
        assert_eq!(points_in(0.1, 1.0), 1);
        assert_eq!(points_in(0.1, f64::NAN), 1);
        let p = PeakDetectionParams::for_spacing(0.01, None, None, false);
        assert_eq!(p.min_points, 20);
        assert_eq!(p.hysteresis, 10);
    }

    #[test]
    fn test_single_bump_yields_one_peak_at_center() {
        let trace = gaussian(200, 100.0, 8.0, 1e6);
        let peaks = detect(&trace, (0, 199), &params(20, 10));
        assert_eq!(peaks.len(), 1);
        assert_eq!(peaks[0].apex, 100);
        assert!(peaks[0].start < 100 && peaks[0].end > 100);
    }

    #[test]
    fn test_two_separated_bumps() {
        let a = gaussian(300, 80.0, 6.0, 1e6);
        let b = gaussian(300, 220.0, 6.0, 5e5);
        let trace: Vec<f64> = a.iter().zip(b.iter()).map(|(x, y)| x + y).collect();
        let peaks = detect(&trace, (0, 299), &params(10, 5));
        assert_eq!(peaks.len(), 2);
        assert_eq!(peaks[0].apex, 80);
        assert_eq!(peaks[1].apex, 220);
        assert!(peaks[0].end <= peaks[1].start);
    }

    #[test]
    fn test_narrow_peak_is_rejected_unless_internal_standard() {
        let mut trace = vec![0.0; 50];
        trace[20] = 10.0;
        trace[21] = 20.0;
        trace[22] = 10.0;
        assert!(detect(&trace, (0, 49), &params(10, 1)).is_empty());

        let mut p = params(10, 1);
        p.internal_standard = true;
        let peaks = detect(&trace, (0, 49), &p);
        assert_eq!(peaks.len(), 1);
        assert_eq!(peaks[0].apex, 21);
    }

    #[test]
    fn test_rising_at_window_end_is_dropped() {
        let trace: Vec<f64> = (0..30).map(|i| i as f64).collect();
        assert!(detect(&trace, (0, 29), &params(2, 2)).is_empty());
    }

    #[test]
    fn test_falling_at_window_end_is_closed() {
        let trace = gaussian(60, 30.0, 5.0, 100.0);
        let peaks = detect(&trace, (0, 40), &params(5, 2));
        assert_eq!(peaks.len(), 1);
        assert_eq!(peaks[0].end, 40);
    }

    #[test]
    fn test_short_dip_does_not_split_peak() {
        let mut trace = gaussian(100, 50.0, 10.0, 1000.0);
        // One-point dip on the rising edge.
        trace[40] = trace[39] - 1.0;
        let peaks = detect(&trace, (0, 99), &params(10, 3));
        assert_eq!(peaks.len(), 1);
        let split = detect(&trace, (0, 99), &params(2, 1));
        assert_eq!(split.len(), 2);
    }

    #[test]
    fn test_limit_peaks_keeps_closest_to_max() {
        let cand = |start: usize, apex: usize, h: f64| PeakCandidate {
            start,
            end: start + 10,
            apex,
            apex_rt: apex as f64 * 0.01,
            apex_intensity: h,
        };
        let peaks = vec![
            cand(0, 5, 10.0),
            cand(20, 25, 50.0),
            cand(40, 45, 100.0),
            cand(60, 65, 20.0),
            cand(100, 105, 90.0),
        ];
        let kept = limit_peaks(peaks.clone(), 3);
        let apexes: Vec<usize> = kept.iter().map(|p| p.apex).collect();
        assert_eq!(apexes, vec![25, 45, 65]);

        let kept = limit_peaks(peaks, 1);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].apex, 45);
    }

    #[test]
    fn test_limit_peaks_uses_retention_time() {
        // Scan 1 is closer to the max by index, scan 20 by retention time.
        let cand = |apex: usize, apex_rt: f64, h: f64| PeakCandidate {
            start: apex.saturating_sub(1),
            end: apex + 1,
            apex,
            apex_rt,
            apex_intensity: h,
        };
        let peaks = vec![
            cand(1, 0.0, 10.0),
            cand(10, 1.0, 100.0),
            cand(20, 1.1, 10.0),
        ];
        let kept = limit_peaks(peaks, 2);
        let apexes: Vec<usize> = kept.iter().map(|p| p.apex).collect();
        assert_eq!(apexes, vec![10, 20]);
    }

    #[test]
    fn test_internal_standard_keeps_only_the_most_intense() {
        let a = gaussian(400, 60.0, 6.0, 2e5);
        let b = gaussian(400, 200.0, 6.0, 1e6);
        let c = gaussian(400, 330.0, 6.0, 5e5);
        let trace: Vec<f64> = (0..400).map(|i| a[i] + b[i] + c[i]).collect();
        let rt = rts(trace.len());

        let all = detect_peaks(&rt, &trace, &trace, (0, 399), &params(10, 5));
        assert_eq!(all.len(), 3);

        let mut p = params(10, 5);
        p.internal_standard = true;
        p.limit_peaks = Some(3);
        let kept = detect_peaks(&rt, &trace, &trace, (0, 399), &p);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].apex, 200);
        assert!((kept[0].apex_rt - 2.0).abs() < 1e-9);
    }
}
