use super::validator::{
    ScanResult,
    ValidationParams,
    validate_scan,
};
use crate::errors::DataProcessingError;
use crate::models::{
    IonTarget,
    SampleRun,
};
use crate::noise::NoiseProfile;
use crate::utils::{
    RtWindow,
    nearest_within,
};
use serde::{
    Deserialize,
    Serialize,
};
use tracing::trace;

/// Extracted-ion chromatogram of one (glycan, adduct, sample) combination.
///
/// Every vector is aligned to the sample's MS1 scans. `smoothed` stays
/// empty until a smoother fills it in.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct EicSeries {
    pub rt: Vec<f64>,
    /// Isotope-validated intensity; zero for rejected scans.
    pub intensity: Vec<f64>,
    /// Nearest raw intensity within tolerance, without any validation.
    pub raw_trace: Vec<f64>,
    pub smoothed: Vec<f64>,
    pub ppm_error: Vec<Option<f64>>,
    pub isotope_fit: Vec<f64>,
    pub isotope_ratios: Vec<Vec<f64>>,
    pub in_window: Vec<bool>,
}

impl EicSeries {
    pub fn len(&self) -> usize {
        self.rt.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rt.is_empty()
    }

    pub fn max_intensity(&self) -> f64 {
        self.intensity.iter().copied().fold(0.0, f64::max)
    }

    pub fn num_accepted(&self) -> usize {
        self.intensity.iter().filter(|&&x| x > 0.0).count()
    }

    /// First and last in-window scan indices, if any.
    pub fn window_bounds(&self) -> Option<(usize, usize)> {
        let first = self.in_window.iter().position(|&x| x)?;
        let last = self.in_window.iter().rposition(|&x| x)?;
        Some((first, last))
    }

    pub fn set_smoothed(&mut self, smoothed: Vec<f64>) -> Result<(), DataProcessingError> {
        if smoothed.len() != self.len() {
            return Err(DataProcessingError::ExpectedSlicesSameLength {
                expected: self.len(),
                other: smoothed.len(),
                context: "smoothed intensity vs EIC length".to_string(),
            });
        }
        self.smoothed = smoothed;
        Ok(())
    }
}

/// Walks every MS1 scan of `run` and validates it against `target`.
pub fn build_eic(
    run: &SampleRun,
    noise: &NoiseProfile,
    target: &IonTarget,
    params: &ValidationParams,
    rt_window: &RtWindow,
) -> EicSeries {
    let n = run.num_ms1();
    let mut eic = EicSeries {
        rt: Vec::with_capacity(n),
        intensity: Vec::with_capacity(n),
        raw_trace: Vec::with_capacity(n),
        smoothed: Vec::new(),
        ppm_error: Vec::with_capacity(n),
        isotope_fit: Vec::with_capacity(n),
        isotope_ratios: Vec::with_capacity(n),
        in_window: Vec::with_capacity(n),
    };
    let tol = params.tolerance.width_at(target.mz);

    for (i, scan) in run.ms1_scans().enumerate() {
        let in_window = rt_window.contains(scan.rt_minutes);
        let result = if in_window {
            validate_scan(
                &scan.mz,
                &scan.intensity,
                target,
                params,
                noise.local_at(i),
                noise.baseline,
            )
        } else {
            ScanResult::OutOfWindow
        };
        let raw = if in_window {
            nearest_within(&scan.mz, target.mz, tol)
                .map(|j| scan.intensity[j])
                .unwrap_or(0.0)
        } else {
            0.0
        };

        eic.rt.push(scan.rt_minutes);
        eic.raw_trace.push(raw);
        eic.in_window.push(in_window);
        eic.isotope_fit.push(result.isotope_fit());
        match result {
            ScanResult::Accepted {
                intensity,
                ppm_error,
                isotope_ratios,
            } => {
                eic.intensity.push(intensity);
                eic.ppm_error.push(Some(ppm_error));
                eic.isotope_ratios.push(isotope_ratios);
            }
            ScanResult::Rejected(reason) => {
                trace!("Scan {} rejected for {}: {:?}", scan.id, target.label, reason);
                eic.intensity.push(0.0);
                eic.ppm_error.push(None);
                eic.isotope_ratios.push(Vec::new());
            }
            ScanResult::OutOfWindow => {
                eic.intensity.push(0.0);
                eic.ppm_error.push(None);
                eic.isotope_ratios.push(Vec::new());
            }
        }
    }
    eic
}
