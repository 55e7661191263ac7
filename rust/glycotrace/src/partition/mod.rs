//! Splitting the library across independent workers.
//!
//! Each worker analyzes one contiguous chunk of the library (in insertion
//! order) against every sample and persists a single partial result. The
//! merger later concatenates partials in worker index order. Workers share
//! nothing mutable; the library and samples are read-only.

pub mod merge;
pub mod store;

pub use merge::{
    MergedRun,
    merge_partials,
    wait_for_partials,
};
pub use store::{
    PartialResult,
    PartialStore,
};

use crate::errors::Result;
use crate::models::AnalyzedGlycan;
use crate::scoring::{
    AnalysisParameters,
    AnalysisTimings,
    GlycanAnalyzer,
    PreparedSample,
    WorkerAccumulator,
};
use glycoquery::{
    DataProcessingError,
    TargetLibrary,
};
use indicatif::ProgressBar;
use rayon::prelude::*;
use serde::{
    Deserialize,
    Serialize,
};
use std::ops::Range;
use std::path::PathBuf;
use std::time::{
    Duration,
    Instant,
};
use tracing::{
    error,
    info,
};

/// Noise level a worker used for one sample.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SampleNoise {
    pub sample: String,
    /// `NaN` when the sample had no usable scans.
    pub noise: f64,
    pub user_supplied: bool,
}

impl SampleNoise {
    pub fn from_prepared(samples: &[PreparedSample]) -> Vec<Self> {
        samples
            .iter()
            .map(|s| SampleNoise {
                sample: s.name().to_string(),
                noise: s.noise.baseline,
                user_supplied: s.noise.user_supplied,
            })
            .collect()
    }
}

/// Everything one worker produced, as persisted in its partial blob.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WorkerPartial {
    pub worker_index: usize,
    pub n_workers: usize,
    pub samples: Vec<SampleNoise>,
    pub glycans: Vec<AnalyzedGlycan>,
    pub timings: AnalysisTimings,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WorkerReport {
    pub worker_index: usize,
    pub num_glycans: usize,
    pub num_peaks: usize,
    pub path: PathBuf,
}

/// `n_workers` contiguous ranges of `ceil(len / n_workers)` items each.
///
/// Trailing ranges may be short or empty; there is always exactly one
/// range per worker.
pub fn partition_ranges(len: usize, n_workers: usize) -> Result<Vec<Range<usize>>> {
    if n_workers == 0 {
        return Err(DataProcessingError::InvalidParameter {
            name: "workers",
            value: "0".to_string(),
        }
        .into());
    }
    let chunk = len.div_ceil(n_workers);
    Ok((0..n_workers)
        .map(|i| {
            let start = (i * chunk).min(len);
            let end = ((i + 1) * chunk).min(len);
            start..end
        })
        .collect())
}

/// Shared inputs of every worker of a run.
pub struct WorkerContext<'a> {
    pub library: &'a TargetLibrary,
    pub samples: &'a [PreparedSample],
    pub params: &'a AnalysisParameters,
    pub store: &'a PartialStore,
    pub n_workers: usize,
    /// Delay before worker `i` starts is `i * stagger`.
    pub stagger: Duration,
}

impl WorkerContext<'_> {
    /// Runs worker `worker_index` on its chunk and persists its partial.
    /// A partial left over from an earlier run is deleted first.
    pub fn run_worker(
        &self,
        worker_index: usize,
        progress: Option<&ProgressBar>,
    ) -> Result<(WorkerReport, AnalysisTimings)> {
        let ranges = partition_ranges(self.library.len(), self.n_workers)?;
        let range = ranges.get(worker_index).cloned().ok_or_else(|| {
            DataProcessingError::InvalidParameter {
                name: "worker_index",
                value: format!("{} (of {} workers)", worker_index, self.n_workers),
            }
        })?;

        self.store.remove(worker_index)?;
        std::thread::sleep(self.stagger * worker_index as u32);
        let st = Instant::now();
        info!(
            "Worker {}/{} starting on glycans {}..{}",
            worker_index + 1,
            self.n_workers,
            range.start,
            range.end
        );

        let analyzer = GlycanAnalyzer::new(self.samples, self.params);
        let (glycans, timings) = analyzer.analyze_chunk(self.library, range, progress)?;
        let num_glycans = glycans.len();
        let num_peaks = glycans.iter().map(|g| g.total_peaks()).sum();

        let partial = WorkerPartial {
            worker_index,
            n_workers: self.n_workers,
            samples: SampleNoise::from_prepared(self.samples),
            glycans,
            timings,
        };
        let path = self.store.write(&partial)?;
        info!(
            "Worker {}/{} finished {} glycans ({} peaks) in {:?}",
            worker_index + 1,
            self.n_workers,
            num_glycans,
            num_peaks,
            st.elapsed()
        );

        Ok((
            WorkerReport {
                worker_index,
                num_glycans,
                num_peaks,
                path,
            },
            timings,
        ))
    }

    /// Runs every worker on the rayon pool.
    ///
    /// A failing worker is logged and leaves no partial behind; the merge
    /// step then reports it as missing.
    pub fn run_workers(&self, progress: Option<&ProgressBar>) -> WorkerAccumulator {
        (0..self.n_workers)
            .into_par_iter()
            .map(|i| match self.run_worker(i, progress) {
                Ok((report, timings)) => (Some(report), timings),
                Err(e) => {
                    error!("Worker {} failed: {}", i, e);
                    (None, AnalysisTimings::default())
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ranges_cover_library_in_order() {
        let ranges = partition_ranges(10, 3).unwrap();
        assert_eq!(ranges, vec![0..4, 4..8, 8..10]);
        let ranges = partition_ranges(2, 4).unwrap();
        assert_eq!(ranges, vec![0..1, 1..2, 2..2, 2..2]);
        let ranges = partition_ranges(0, 2).unwrap();
        assert!(ranges.iter().all(|r| r.is_empty()));
        assert!(partition_ranges(5, 0).is_err());
    }
}
