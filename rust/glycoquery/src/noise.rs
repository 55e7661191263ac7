//! Per-sample noise estimation.
//!
//! Each in-window MS1 scan gets a local noise level (the 95th percentile of
//! its intensities). The sample baseline is the 66.8th percentile of those
//! local levels. A sample without any usable in-window scan has a `NaN`
//! baseline, which downstream code reads as "no usable spectra".

use crate::models::SampleRun;
use crate::utils::{
    RtWindow,
    percentile,
};
use serde::{
    Deserialize,
    Serialize,
};

pub const SCAN_NOISE_PERCENTILE: f64 = 95.0;
pub const SAMPLE_NOISE_PERCENTILE: f64 = 66.8;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NoiseProfile {
    /// Local noise per MS1 scan, aligned with the sample's MS1 index.
    /// Out-of-window and empty scans hold 0.0.
    pub local: Vec<f64>,
    pub baseline: f64,
    pub user_supplied: bool,
}

impl NoiseProfile {
    pub fn is_defined(&self) -> bool {
        self.baseline.is_finite()
    }

    pub fn local_at(&self, ms1_index: usize) -> f64 {
        self.local.get(ms1_index).copied().unwrap_or(self.baseline)
    }
}

/// Computes the noise profile of a sample restricted to `rt_window`.
pub fn estimate_noise(run: &SampleRun, rt_window: &RtWindow) -> NoiseProfile {
    let local: Vec<f64> = run
        .ms1_scans()
        .map(|scan| {
            if !rt_window.contains(scan.rt_minutes) {
                return None;
            }
            percentile(&scan.intensity, SCAN_NOISE_PERCENTILE)
        })
        .map(|x| x.unwrap_or(f64::NAN))
        .collect();

    let baseline = percentile(&local, SAMPLE_NOISE_PERCENTILE).unwrap_or(f64::NAN);
    let local = local
        .into_iter()
        .map(|x| if x.is_finite() { x } else { 0.0 })
        .collect();

    NoiseProfile {
        local,
        baseline,
        user_supplied: false,
    }
}

/// Noise profile for a user supplied level; the estimator is not consulted.
pub fn fixed_noise(run: &SampleRun, level: f64) -> NoiseProfile {
    NoiseProfile {
        local: vec![level; run.num_ms1()],
        baseline: level,
        user_supplied: true,
    }
}
