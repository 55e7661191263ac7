//! Scan-level isotope and charge validation.
//!
//! A scan is walked once in ascending m/z order, starting one isotope
//! spacing (plus tolerance) below the target. The walk is a left fold of a
//! [`ScanValidationState`] over the peaks that either runs to the end of the
//! scan or short-circuits with a [`ScanResult`].
//!
//! Rules, in the order they can fire:
//! - peaks far below the local noise (`< 0.5 * local`) are invisible;
//! - peaks at `target - spacing / k` are remembered as potential satellites;
//! - the monoisotopic peak must be at or above the local noise;
//! - once past the monoisotopic window the target is rejected when one of
//!   the satellites can explain it as its own second isotope;
//! - a peak at `target + spacing / k` (`k` not the target charge) with the
//!   abundance expected for a second isotope rejects the scan;
//! - isotopologues are matched position by position, each contributing
//!   `min(observed, theoretical)` to the scan intensity;
//! - a peak past the next expected isotope ends the walk, accepted only if
//!   enough isotopologues were seen.

use crate::models::IonTarget;
use crate::models::tolerance::{
    MzTolerance,
    ppm_diff,
};
use serde::{
    Deserialize,
    Serialize,
};
use std::ops::ControlFlow;

/// 13C - 12C mass difference.
pub const ISOTOPE_SPACING: f64 = 1.0033548;

/// Fraction of the local noise below which peaks are not considered at all.
pub const NOISE_FLOOR_FRACTION: f64 = 0.5;

/// Relative abundance band around the expected second-isotope intensity
/// used by the satellite and wrong-charge checks.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct AbundanceBand {
    pub low: f64,
    pub high: f64,
}

impl Default for AbundanceBand {
    fn default() -> Self {
        Self {
            low: 0.8,
            high: 1.2,
        }
    }
}

impl AbundanceBand {
    pub fn contains(&self, observed: f64, expected: f64) -> bool {
        observed >= expected * self.low && observed <= expected * self.high
    }
}

/// Expected intensity of the second isotopologue relative to the first, for an
/// ion observed at `mz` with charge `charge`.
///
/// Linear fit over the average composition of organic macromolecules.
pub fn expected_second_isotope(mz: f64, charge: u32) -> f64 {
    (mz * charge as f64 * 0.0006) + 0.1401
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct ValidationParams {
    pub tolerance: MzTolerance,
    pub min_isotope_peaks: usize,
    pub max_charges: u32,
    pub band: AbundanceBand,
}

impl Default for ValidationParams {
    fn default() -> Self {
        Self {
            tolerance: MzTolerance::default(),
            min_isotope_peaks: 2,
            max_charges: 3,
            band: AbundanceBand::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RejectionReason {
    TargetOutOfRange,
    BelowSampleNoise,
    NoMonoisotopic,
    Satellite,
    WrongCharge,
    IncompleteEnvelope,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ScanResult {
    Accepted {
        intensity: f64,
        ppm_error: f64,
        isotope_ratios: Vec<f64>,
    },
    Rejected(RejectionReason),
    OutOfWindow,
}

impl ScanResult {
    pub fn is_accepted(&self) -> bool {
        matches!(self, ScanResult::Accepted { .. })
    }

    pub fn intensity(&self) -> f64 {
        match self {
            ScanResult::Accepted { intensity, .. } => *intensity,
            _ => 0.0,
        }
    }

    /// Mean closeness of the observed isotope ratios to 1.0.
    ///
    /// `min(r, 1/r)` keeps over- and under-abundance symmetric.
    pub fn isotope_fit(&self) -> f64 {
        match self {
            ScanResult::Accepted { isotope_ratios, .. } if !isotope_ratios.is_empty() => {
                let total: f64 = isotope_ratios
                    .iter()
                    .map(|&r| if r > 0.0 { r.min(1.0 / r) } else { 0.0 })
                    .sum();
                total / isotope_ratios.len() as f64
            }
            _ => 0.0,
        }
    }
}

struct ScanContext<'a> {
    target: &'a IonTarget,
    params: &'a ValidationParams,
    tol: f64,
    local_noise: f64,
}

impl ScanContext<'_> {
    fn satellite_charge(&self, mz: f64) -> Option<u32> {
        (1..=self.params.max_charges)
            .find(|&k| (mz - (self.target.mz - ISOTOPE_SPACING / k as f64)).abs() <= self.tol)
    }

    fn is_wrong_charge(&self, mz: f64, intensity: f64, mono: f64) -> bool {
        (2..=self.params.max_charges)
            .filter(|&k| k != self.target.charge)
            .any(|k| {
                let expected = mono * expected_second_isotope(self.target.mz, k);
                (mz - (self.target.mz + ISOTOPE_SPACING / k as f64)).abs() <= self.tol
                    && self.params.band.contains(intensity, expected)
            })
    }
}

#[derive(Debug, Clone, Default)]
struct ScanValidationState {
    mono_intensity: f64,
    ppm_sum: f64,
    ppm_count: usize,
    total_intensity: f64,
    next_isotope: usize,
    isotope_open: bool,
    current_isotope_sum: f64,
    matched_isotopes: usize,
    ratios: Vec<f64>,
    satellites: Vec<(f64, u32)>,
    satellites_checked: bool,
}

impl ScanValidationState {
    fn mono_found(&self) -> bool {
        self.ppm_count > 0
    }

    fn close_isotope(mut self, ctx: &ScanContext) -> Self {
        let theoretical = ctx.target.isotope_abundances[self.next_isotope];
        if self.ratios.len() < ctx.params.min_isotope_peaks {
            self.ratios
                .push((self.current_isotope_sum / self.mono_intensity) / theoretical);
        }
        self.matched_isotopes += 1;
        self.next_isotope += 1;
        self.current_isotope_sum = 0.0;
        self.isotope_open = false;
        self
    }

    /// The target is the second isotope of a satellite ion if its intensity
    /// is no larger than what the satellite predicts for it.
    fn explained_by_satellite(&self, ctx: &ScanContext) -> bool {
        self.satellites.iter().any(|&(sat_intensity, k)| {
            let expected = sat_intensity * expected_second_isotope(ctx.target.mz, k);
            self.mono_intensity <= expected * ctx.params.band.high
        })
    }

    fn step(mut self, ctx: &ScanContext, mz: f64, intensity: f64) -> ControlFlow<ScanResult, Self> {
        let target = ctx.target.mz;
        let n_iso = ctx.target.num_isotopes();

        if self.isotope_open && mz > ctx.target.isotope_mz(self.next_isotope) + ctx.tol {
            self = self.close_isotope(ctx);
            if self.next_isotope == n_iso {
                return ControlFlow::Break(self.finish(ctx));
            }
        }

        if intensity <= 0.0 || intensity < ctx.local_noise * NOISE_FLOOR_FRACTION {
            return ControlFlow::Continue(self);
        }

        if mz > target + ctx.tol {
            if !self.mono_found() {
                return ControlFlow::Break(ScanResult::Rejected(RejectionReason::NoMonoisotopic));
            }
            if !self.satellites_checked {
                self.satellites_checked = true;
                if self.explained_by_satellite(ctx) {
                    return ControlFlow::Break(ScanResult::Rejected(RejectionReason::Satellite));
                }
            }
            if self.next_isotope >= n_iso {
                return ControlFlow::Break(self.finish(ctx));
            }
            let next_mz = ctx.target.isotope_mz(self.next_isotope);
            if !self.isotope_open && mz > next_mz + ctx.tol {
                return ControlFlow::Break(self.finish(ctx));
            }
            if mz < target + ISOTOPE_SPACING
                && ctx.is_wrong_charge(mz, intensity, self.mono_intensity)
            {
                return ControlFlow::Break(ScanResult::Rejected(RejectionReason::WrongCharge));
            }
            if (mz - next_mz).abs() <= ctx.tol {
                let theoretical =
                    self.mono_intensity * ctx.target.isotope_abundances[self.next_isotope];
                self.total_intensity += intensity.min(theoretical);
                self.current_isotope_sum += intensity;
                self.isotope_open = true;
            }
            return ControlFlow::Continue(self);
        }

        if mz < target - ctx.tol {
            if let Some(k) = ctx.satellite_charge(mz) {
                self.satellites.push((intensity, k));
            }
            return ControlFlow::Continue(self);
        }

        if intensity >= ctx.local_noise {
            self.mono_intensity += intensity;
            self.total_intensity += intensity;
            self.ppm_sum += ppm_diff(mz, target);
            self.ppm_count += 1;
        }
        ControlFlow::Continue(self)
    }

    fn finish(mut self, ctx: &ScanContext) -> ScanResult {
        if self.isotope_open {
            self = self.close_isotope(ctx);
        }
        if !self.mono_found() {
            return ScanResult::Rejected(RejectionReason::NoMonoisotopic);
        }
        if !self.satellites_checked && self.explained_by_satellite(ctx) {
            return ScanResult::Rejected(RejectionReason::Satellite);
        }
        if 1 + self.matched_isotopes < ctx.params.min_isotope_peaks {
            return ScanResult::Rejected(RejectionReason::IncompleteEnvelope);
        }
        ScanResult::Accepted {
            intensity: self.total_intensity,
            ppm_error: self.ppm_sum / self.ppm_count as f64,
            isotope_ratios: self.ratios,
        }
    }
}

/// Validates one in-window scan against an ion target.
///
/// `local_noise` is the scan's own noise level, `sample_noise` the sample
/// baseline; a scan whose most intense peak is below half the baseline is
/// rejected without looking at its peaks.
pub fn validate_scan(
    mz: &[f64],
    intensity: &[f64],
    target: &IonTarget,
    params: &ValidationParams,
    local_noise: f64,
    sample_noise: f64,
) -> ScanResult {
    match mz.last() {
        Some(&max_mz) if max_mz >= target.mz => {}
        _ => return ScanResult::Rejected(RejectionReason::TargetOutOfRange),
    }
    let max_intensity = intensity.iter().copied().fold(0.0, f64::max);
    if max_intensity < sample_noise * NOISE_FLOOR_FRACTION {
        return ScanResult::Rejected(RejectionReason::BelowSampleNoise);
    }

    let tol = params.tolerance.width_at(target.mz);
    let ctx = ScanContext {
        target,
        params,
        tol,
        local_noise,
    };
    let start = mz.partition_point(|&x| x < target.mz - ISOTOPE_SPACING - tol);
    let flow = mz[start..]
        .iter()
        .zip(intensity[start..].iter())
        .try_fold(ScanValidationState::default(), |state, (&m, &i)| {
            state.step(&ctx, m, i)
        });
    match flow {
        ControlFlow::Break(result) => result,
        ControlFlow::Continue(state) => state.finish(&ctx),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TARGET: f64 = 1000.0;

    fn target(charge: u32) -> IonTarget {
        let spacing = ISOTOPE_SPACING / charge as f64;
        IonTarget {
            label: format!("H{}", charge),
            mz: TARGET,
            charge,
            isotope_offsets: vec![spacing, 2.0 * spacing],
            isotope_abundances: vec![0.6, 0.25],
        }
    }

    /// Flat background at `.25` positions: local noise 100.
    fn scan_with(peaks: &[(f64, f64)]) -> (Vec<f64>, Vec<f64>) {
        let mut all: Vec<(f64, f64)> = (0..100).map(|i| (950.25 + i as f64, 100.0)).collect();
        all.extend_from_slice(peaks);
        all.sort_by(|a, b| a.0.total_cmp(&b.0));
        all.into_iter().unzip()
    }

    fn params() -> ValidationParams {
        ValidationParams::default()
    }

    #[test]
    fn test_clean_envelope_is_accepted() {
        let t = target(1);
        let (mz, int) = scan_with(&[
            (TARGET, 1e6),
            (TARGET + ISOTOPE_SPACING, 6e5),
            (TARGET + 2.0 * ISOTOPE_SPACING, 2.5e5),
        ]);
        let res = validate_scan(&mz, &int, &t, &params(), 100.0, 100.0);
        match res.clone() {
            ScanResult::Accepted {
                intensity,
                ppm_error,
                isotope_ratios,
            } => {
                assert!((intensity - 1.85e6).abs() < 1e-3);
                assert!(ppm_error.abs() < 1e-9);
                assert_eq!(isotope_ratios.len(), 2);
                for r in isotope_ratios {
                    assert!((r - 1.0).abs() < 1e-9);
                }
            }
            other => panic!("Expected acceptance, got {:?}", other),
        }
        assert!((res.isotope_fit() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_overabundant_isotope_is_capped() {
        let t = target(1);
        let (mz, int) = scan_with(&[
            (TARGET, 1e6),
            (TARGET + ISOTOPE_SPACING, 1.2e6),
            (TARGET + 2.0 * ISOTOPE_SPACING, 2.5e5),
        ]);
        let res = validate_scan(&mz, &int, &t, &params(), 100.0, 100.0);
        // Second isotope contributes at most 0.6 * mono.
        assert!((res.intensity() - 1.85e6).abs() < 1e-3);
        assert!((res.isotope_fit() - 0.75).abs() < 1e-9);
    }

    #[test]
    fn test_wrong_spacing_is_rejected() {
        let t = target(1);
        let (mz, int) = scan_with(&[(TARGET, 1e6), (TARGET + ISOTOPE_SPACING / 2.0, 6e5)]);
        let res = validate_scan(&mz, &int, &t, &params(), 100.0, 100.0);
        assert_eq!(res, ScanResult::Rejected(RejectionReason::IncompleteEnvelope));
        assert_eq!(res.intensity(), 0.0);
    }

    #[test]
    fn test_wrong_charge_peak_in_band_is_rejected() {
        let t = target(1);
        // Expected relative abundance for a 2+ ion at 1000 m/z: 1.3401.
        let (mz, int) = scan_with(&[
            (TARGET, 1e6),
            (TARGET + ISOTOPE_SPACING / 2.0, 1.3401e6),
            (TARGET + ISOTOPE_SPACING, 6e5),
            (TARGET + 2.0 * ISOTOPE_SPACING, 2.5e5),
        ]);
        let res = validate_scan(&mz, &int, &t, &params(), 100.0, 100.0);
        assert_eq!(res, ScanResult::Rejected(RejectionReason::WrongCharge));
    }

    #[test]
    fn test_satellite_explaining_target_is_rejected() {
        let t = target(1);
        // A 1+ ion one spacing below, with the target as its second isotope.
        let (mz, int) = scan_with(&[
            (TARGET - ISOTOPE_SPACING, 1e6),
            (TARGET, 7e5),
            (TARGET + ISOTOPE_SPACING, 4.2e5),
            (TARGET + 2.0 * ISOTOPE_SPACING, 1.75e5),
        ]);
        let res = validate_scan(&mz, &int, &t, &params(), 100.0, 100.0);
        assert_eq!(res, ScanResult::Rejected(RejectionReason::Satellite));
    }

    #[test]
    fn test_mono_below_local_noise_is_ignored() {
        let t = target(1);
        let (mz, int) = scan_with(&[
            (TARGET, 90.0),
            (TARGET + ISOTOPE_SPACING, 60.0),
            (TARGET + 2.0 * ISOTOPE_SPACING, 55.0),
        ]);
        let res = validate_scan(&mz, &int, &t, &params(), 100.0, 100.0);
        assert_eq!(res, ScanResult::Rejected(RejectionReason::NoMonoisotopic));
    }

    #[test]
    fn test_target_beyond_scan_range() {
        let t = target(1);
        let mz = vec![500.0, 600.0];
        let int = vec![1e6, 1e6];
        let res = validate_scan(&mz, &int, &t, &params(), 100.0, 100.0);
        assert_eq!(res, ScanResult::Rejected(RejectionReason::TargetOutOfRange));
        let res = validate_scan(&[], &[], &t, &params(), 100.0, 100.0);
        assert_eq!(res, ScanResult::Rejected(RejectionReason::TargetOutOfRange));
    }

    #[test]
    fn test_doubly_charged_envelope() {
        let t = target(2);
        let (mz, int) = scan_with(&[
            (TARGET, 1e6),
            (TARGET + ISOTOPE_SPACING / 2.0, 6e5),
            (TARGET + ISOTOPE_SPACING, 2.5e5),
        ]);
        let res = validate_scan(&mz, &int, &t, &params(), 100.0, 100.0);
        assert!(res.is_accepted(), "{:?}", res);
    }

    #[test]
    fn test_single_isotope_allowed_when_minimum_is_one() {
        let t = target(1);
        let (mz, int) = scan_with(&[(TARGET, 1e6)]);
        let mut p = params();
        assert!(!validate_scan(&mz, &int, &t, &p, 100.0, 100.0).is_accepted());
        p.min_isotope_peaks = 1;
        let res = validate_scan(&mz, &int, &t, &p, 100.0, 100.0);
        assert!(res.is_accepted());
        assert_eq!(res.isotope_fit(), 0.0);
    }

    #[test]
    fn test_zero_points_never_match_when_noise_is_zero() {
        let t = target(1);
        // Profile-like scan: zero-filled around the target, signal elsewhere.
        let mz = vec![
            TARGET - 0.01,
            TARGET,
            TARGET + 0.01,
            TARGET + ISOTOPE_SPACING,
            TARGET + 2.0 * ISOTOPE_SPACING,
            1200.0,
        ];
        let int = vec![0.0, 0.0, 0.0, 0.0, 0.0, 5e4];
        let res = validate_scan(&mz, &int, &t, &params(), 0.0, 0.0);
        assert_eq!(res, ScanResult::Rejected(RejectionReason::NoMonoisotopic));
        assert!(res.intensity().is_finite());
    }
}
