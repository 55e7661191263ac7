use glycoquery::eic::{
    AbundanceBand,
    ValidationParams,
};
use glycoquery::{
    MzTolerance,
    RtWindow,
};
use glycotrace::AnalysisParameters;
use serde::{
    Deserialize,
    Serialize,
};
use std::path::{
    Path,
    PathBuf,
};

use crate::cli::InputArgs;
use crate::errors::CliError;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Config {
    pub input: Option<InputConfig>,
    #[serde(default)]
    pub analysis: AnalysisConfig,
    pub output: Option<OutputConfig>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct InputConfig {
    pub library: PathBuf,
    pub samples: Vec<PathBuf>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct OutputConfig {
    pub directory: PathBuf,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct AnalysisConfig {
    pub tolerance: MzTolerance,
    pub rt_window: (f64, f64),
    pub min_isotope_peaks: usize,
    pub max_charges: u32,
    /// `None` derives the minimum from the scan spacing.
    pub min_points_per_peak: Option<usize>,
    pub limit_peaks: Option<usize>,
    /// One noise level per sample, in sample order.
    pub custom_noise: Option<Vec<f64>>,
    pub auc_threshold: Option<f64>,
    pub isotope_band: (f64, f64),
    pub workers: usize,
    pub stagger_ms: u64,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        let band = AbundanceBand::default();
        let window = RtWindow::default();
        Self {
            tolerance: MzTolerance::default(),
            rt_window: window.as_tuple(),
            min_isotope_peaks: 2,
            max_charges: 3,
            min_points_per_peak: None,
            limit_peaks: None,
            custom_noise: None,
            auc_threshold: None,
            isotope_band: (band.low, band.high),
            workers: 1,
            stagger_ms: 50,
        }
    }
}

impl AnalysisConfig {
    pub fn to_parameters(&self) -> Result<AnalysisParameters, CliError> {
        let (low, high) = self.isotope_band;
        if !(low > 0.0 && low <= high) {
            return Err(CliError::Config {
                source: format!("isotope_band must satisfy 0 < low <= high, got {:?}", self.isotope_band),
            });
        }
        if self.workers == 0 {
            return Err(CliError::Config {
                source: "workers must be at least 1".to_string(),
            });
        }
        let params = AnalysisParameters {
            validation: ValidationParams {
                tolerance: self.tolerance,
                min_isotope_peaks: self.min_isotope_peaks,
                max_charges: self.max_charges,
                band: AbundanceBand { low, high },
            },
            rt_window: RtWindow::try_new(self.rt_window.0, self.rt_window.1)?,
            min_points_per_peak: self.min_points_per_peak,
            limit_peaks: self.limit_peaks,
            auc_threshold: self.auc_threshold,
        };
        params.validate()?;
        Ok(params)
    }
}

impl Config {
    pub fn from_file(path: &Path) -> Result<Self, CliError> {
        let file = std::fs::File::open(path).map_err(|e| CliError::io(e, path))?;
        serde_json::from_reader(std::io::BufReader::new(file))
            .map_err(|e| CliError::ParseError { msg: e.to_string() })
    }

    /// Command line values take precedence over the file.
    pub fn apply_overrides(&mut self, args: &InputArgs) {
        match (&args.library_file, self.input.as_mut()) {
            (Some(lib), Some(input)) => input.library = lib.clone(),
            (Some(lib), None) => {
                self.input = Some(InputConfig {
                    library: lib.clone(),
                    samples: Vec::new(),
                })
            }
            _ => {}
        }
        if !args.sample_files.is_empty() {
            if let Some(input) = self.input.as_mut() {
                input.samples = args.sample_files.clone();
            }
        }
        self.apply_output_overrides(args.output_dir.as_ref(), args.workers);
    }

    pub fn apply_output_overrides(&mut self, output_dir: Option<&PathBuf>, workers: Option<usize>) {
        if let Some(dir) = output_dir {
            self.output = Some(OutputConfig {
                directory: dir.clone(),
            });
        }
        if let Some(w) = workers {
            self.analysis.workers = w;
        }
    }

    pub fn input(&self) -> Result<&InputConfig, CliError> {
        match &self.input {
            Some(x) if !x.samples.is_empty() => Ok(x),
            Some(_) => Err(CliError::Config {
                source: "No sample files provided, please provide them in either the config file or with the --sample-files flag".to_string(),
            }),
            None => Err(CliError::Config {
                source: "No input provided, please provide one in either the config file or with the --library-file flag".to_string(),
            }),
        }
    }

    pub fn output(&self) -> Result<&OutputConfig, CliError> {
        self.output.as_ref().ok_or_else(|| CliError::Config {
            source: "No output directory provided, please provide one in either the config file or with the --output-dir flag".to_string(),
        })
    }

    pub fn partials_dir(&self) -> Result<PathBuf, CliError> {
        Ok(self.output()?.directory.join("partials"))
    }

    pub fn template() -> Self {
        Self {
            input: Some(InputConfig {
                library: PathBuf::from("library.ndjson"),
                samples: vec![
                    PathBuf::from("sample_1.msgpack.zst"),
                    PathBuf::from("sample_2.msgpack.zst"),
                ],
            }),
            analysis: AnalysisConfig::default(),
            output: Some(OutputConfig {
                directory: PathBuf::from("glycotrace_results"),
            }),
        }
    }
}
