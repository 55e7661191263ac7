use glycoquery::LibraryEntry;
use serde::{
    Deserialize,
    Serialize,
};

/// Ideal-vs-observed series kept alongside the curve-fit score.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct CurveFit {
    pub score: f64,
    pub rt: Vec<f64>,
    pub actual: Vec<f64>,
    pub ideal: Vec<f64>,
}

/// A scored chromatographic peak.
///
/// Indices refer to the sample's MS1 scan sequence; the interval is
/// inclusive on both ends.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Peak {
    pub apex_index: usize,
    pub apex_rt: f64,
    pub apex_intensity: f64,
    pub start_index: usize,
    pub end_index: usize,
    pub start_rt: f64,
    pub end_rt: f64,
    pub width_minutes: f64,
    pub auc: f64,
    pub ppm_error: f64,
    pub missing_ppm_points: usize,
    pub isotope_fit: f64,
    pub curve_fit: CurveFit,
    pub signal_to_noise: f64,
}

impl Peak {
    pub fn num_points(&self) -> usize {
        self.end_index - self.start_index + 1
    }
}

/// Peaks found for one library entry across every adduct and sample.
///
/// Peaks are stored flat, indexed by `adduct * n_samples + sample`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AnalyzedGlycan {
    pub entry: LibraryEntry,
    pub n_samples: usize,
    peaks: Vec<Vec<Peak>>,
    /// Earlier entry with identical masses whose peaks were reused.
    #[serde(default)]
    pub ambiguous_with: Option<String>,
}

impl AnalyzedGlycan {
    pub fn new(entry: LibraryEntry, n_samples: usize) -> Self {
        let slots = entry.adducts.len() * n_samples;
        Self {
            entry,
            n_samples,
            peaks: vec![Vec::new(); slots],
            ambiguous_with: None,
        }
    }

    fn slot(&self, adduct: usize, sample: usize) -> usize {
        debug_assert!(sample < self.n_samples);
        adduct * self.n_samples + sample
    }

    pub fn peaks(&self, adduct: usize, sample: usize) -> &[Peak] {
        &self.peaks[self.slot(adduct, sample)]
    }

    pub fn set_peaks(&mut self, adduct: usize, sample: usize, peaks: Vec<Peak>) {
        let slot = self.slot(adduct, sample);
        self.peaks[slot] = peaks;
    }

    pub fn total_peaks(&self) -> usize {
        self.peaks.iter().map(|x| x.len()).sum()
    }

    /// Copies the traced peaks of an indistinguishable entry.
    pub fn reuse_from(entry: LibraryEntry, twin: &AnalyzedGlycan) -> Self {
        Self {
            entry,
            n_samples: twin.n_samples,
            peaks: twin.peaks.clone(),
            ambiguous_with: Some(twin.entry.formula.clone()),
        }
    }

    /// Iterates `(adduct_index, sample_index, peak)` in adduct-major order.
    pub fn iter_peaks(&self) -> impl Iterator<Item = (usize, usize, &Peak)> + '_ {
        self.peaks.iter().enumerate().flat_map(move |(slot, peaks)| {
            let adduct = slot / self.n_samples.max(1);
            let sample = slot % self.n_samples.max(1);
            peaks.iter().map(move |p| (adduct, sample, p))
        })
    }
}
