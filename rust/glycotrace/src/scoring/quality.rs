//! Per-peak quality scores.
//!
//! All scorers look at the inclusive scan interval of a peak.
//!
//! - Mass accuracy: mean ppm error, with a fixed fallback for scans that
//!   have no validated match.
//! - Isotope fit: mean per-scan isotope agreement, discounted for gaps.
//! - Curve fit: agreement with an ideal Gaussian centered on the apex.
//! - Signal-to-noise: apex over sample noise.

use crate::models::CurveFit;
use crate::utils::correlation::pearson_correlation;

/// Minutes of zero padding tried on each side when fitting the ideal curve.
pub const CURVE_FIT_PADDING_MINUTES: f64 = 0.2;

/// Mean ppm error over `ppm` and the number of scans that needed `fallback`.
pub fn mass_accuracy(ppm: &[Option<f64>], fallback: f64) -> (f64, usize) {
    if ppm.is_empty() {
        return (fallback, 0);
    }
    let (sum, missing) = ppm.iter().fold((0.0, 0usize), |(sum, missing), x| match x {
        Some(v) => (sum + v, missing),
        None => (sum + fallback, missing + 1),
    });
    (sum / ppm.len() as f64, missing)
}

/// Gap-tolerant mean of per-scan isotope-fit values.
///
/// Zero entries count as missing. The mean of the present values is scaled
/// by the fraction present; more than half missing scores 0.
pub fn isotope_fit_score(fits: &[f64]) -> f64 {
    let n = fits.len();
    if n == 0 {
        return 0.0;
    }
    let present: Vec<f64> = fits.iter().copied().filter(|&x| x > 0.0).collect();
    let missing = n - present.len();
    if missing * 2 > n || present.is_empty() {
        return 0.0;
    }
    let mean = present.iter().sum::<f64>() / present.len() as f64;
    mean * (1.0 - missing as f64 / n as f64)
}

pub fn signal_to_noise(apex_intensity: f64, noise: f64) -> f64 {
    if noise.is_finite() && noise > 0.0 {
        apex_intensity / noise
    } else {
        f64::NAN
    }
}

/// Apex used to center the ideal curve: the middle of the maximum plateau.
fn widened_apex(values: &[f64]) -> usize {
    let max = values.iter().copied().fold(f64::MIN, f64::max);
    let first = values.iter().position(|&x| x == max).unwrap_or(0);
    let count = values.iter().filter(|&&x| x == max).count();
    (first + count / 2).min(values.len().saturating_sub(1))
}

fn symmetric_ratio_score(actual: &[f64], ideal: &[f64]) -> f64 {
    let total: f64 = actual
        .iter()
        .zip(ideal.iter())
        .map(|(&a, &b)| {
            let (lo, hi) = if a < b { (a, b) } else { (b, a) };
            if hi <= 0.0 { 1.0 } else { lo / hi }
        })
        .sum();
    total / actual.len() as f64
}

/// Fits an ideal Gaussian to `values` over `rt`.
///
/// Candidate widths come from zero-padding the window by `0..floor(0.2 /
/// spacing)` scans per side (at least one candidate). The first padded scan
/// of each side sits on the window edge, so `pad` scans widen the span by
/// `2 * (pad - 1) * spacing`. The Gaussian standard deviation is a sixth of
/// the padded span. The score (squared Pearson correlation, or a min/max
/// ratio mean for two points or fewer) is computed over the unpadded region
/// and the best padding wins.
#[cfg_attr(
    feature = "instrumentation",
    tracing::instrument(skip_all, level = "trace")
)]
pub fn curve_fit(rt: &[f64], values: &[f64], spacing: f64) -> CurveFit {
    if rt.is_empty() || rt.len() != values.len() {
        return CurveFit::default();
    }
    let apex = widened_apex(values);
    let apex_rt = rt[apex];
    let apex_value = values[apex];
    let base_span = rt[rt.len() - 1] - rt[0];

    let mut best = CurveFit {
        score: f64::MIN,
        ..Default::default()
    };
    for pad in 0..padding_steps(spacing) {
        let sd = padded_span(base_span, pad, spacing) / 6.0;
        let ideal: Vec<f64> = rt
            .iter()
            .enumerate()
            .map(|(i, &t)| {
                if sd > 0.0 {
                    apex_value * (-0.5 * ((t - apex_rt) / sd).powi(2)).exp()
                } else if i == apex {
                    apex_value
                } else {
                    0.0
                }
            })
            .collect();
        let score = if values.len() > 2 {
            match pearson_correlation(values, &ideal) {
                Ok(r) if r.is_finite() => r * r,
                _ => 0.0,
            }
        } else {
            symmetric_ratio_score(values, &ideal)
        };
        if score > best.score {
            best = CurveFit {
                score,
                rt: rt.to_vec(),
                actual: values.to_vec(),
                ideal,
            };
        }
    }
    best
}

fn padding_steps(spacing: f64) -> usize {
    let steps = if spacing.is_finite() && spacing > 0.0 {
        (CURVE_FIT_PADDING_MINUTES / spacing).floor() as usize
    } else {
        0
    };
    steps.max(1)
}

fn padded_span(base_span: f64, pad: usize, spacing: f64) -> f64 {
    base_span + 2.0 * pad.saturating_sub(1) as f64 * spacing.max(0.0)
}
