use crate::errors::DataReadingError;
use crate::utils::median_spacing;
use serde::{
    Deserialize,
    Serialize,
};

/// A single centroided scan as handed over by the raw-file decoder.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Spectrum {
    pub id: u32,
    /// Retention time in minutes.
    #[serde(alias = "rt")]
    pub rt_minutes: f64,
    pub ms_level: u8,
    pub mz: Vec<f64>,
    pub intensity: Vec<f64>,
}

impl Spectrum {
    pub fn validate(&self) -> Result<(), DataReadingError> {
        if self.mz.len() != self.intensity.len() {
            return Err(DataReadingError::MalformedSpectrum {
                scan_id: self.id,
                reason: format!(
                    "m/z array has {} elements but intensity array has {}",
                    self.mz.len(),
                    self.intensity.len()
                ),
            });
        }
        if self.mz.windows(2).any(|w| w[0] > w[1]) {
            return Err(DataReadingError::MalformedSpectrum {
                scan_id: self.id,
                reason: "m/z array is not ascending".to_string(),
            });
        }
        if !self.rt_minutes.is_finite() {
            return Err(DataReadingError::MalformedSpectrum {
                scan_id: self.id,
                reason: "retention time is not finite".to_string(),
            });
        }
        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        self.mz.is_empty()
    }

    pub fn max_mz(&self) -> Option<f64> {
        self.mz.last().copied()
    }

    pub fn max_intensity(&self) -> f64 {
        self.intensity.iter().copied().fold(0.0, f64::max)
    }
}

/// All spectra of one sample plus the position of every MS1 scan in it.
///
/// Every per-scan series produced downstream is aligned to `ms1_positions`.
#[derive(Debug, Clone)]
pub struct SampleRun {
    name: String,
    spectra: Vec<Spectrum>,
    ms1_positions: Vec<usize>,
}

impl SampleRun {
    pub fn new(name: impl Into<String>, spectra: Vec<Spectrum>) -> Result<Self, DataReadingError> {
        for spec in spectra.iter() {
            spec.validate()?;
        }
        let ms1_positions: Vec<usize> = spectra
            .iter()
            .enumerate()
            .filter_map(|(i, s)| (s.ms_level == 1).then_some(i))
            .collect();
        if ms1_positions
            .windows(2)
            .any(|w| spectra[w[0]].rt_minutes > spectra[w[1]].rt_minutes)
        {
            return Err(DataReadingError::MalformedSpectrum {
                scan_id: 0,
                reason: "MS1 scans are not sorted by retention time".to_string(),
            });
        }
        Ok(Self {
            name: name.into(),
            spectra,
            ms1_positions,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn num_spectra(&self) -> usize {
        self.spectra.len()
    }

    pub fn num_ms1(&self) -> usize {
        self.ms1_positions.len()
    }

    pub fn ms1_positions(&self) -> &[usize] {
        &self.ms1_positions
    }

    pub fn ms1(&self, i: usize) -> &Spectrum {
        &self.spectra[self.ms1_positions[i]]
    }

    pub fn ms1_scans(&self) -> impl ExactSizeIterator<Item = &Spectrum> + '_ {
        self.ms1_positions.iter().map(move |&i| &self.spectra[i])
    }

    pub fn ms1_rts(&self) -> Vec<f64> {
        self.ms1_scans().map(|s| s.rt_minutes).collect()
    }

    /// Median spacing between consecutive MS1 scans, in minutes.
    pub fn ms1_spacing(&self) -> Option<f64> {
        median_spacing(&self.ms1_rts())
    }
}
