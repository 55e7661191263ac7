//! Barrier-then-concatenate merge of worker partial results.
//!
//! Absent or unreadable partials are logged and skipped: the glycans of
//! that worker are missing from the merged run, but the merge itself
//! succeeds and reports which workers were absent.

use super::store::{
    PartialResult,
    PartialStore,
};
use super::SampleNoise;
use crate::errors::Result;
use crate::models::AnalyzedGlycan;
use crate::scoring::AnalysisTimings;
use glycoquery::DataProcessingError;
use std::time::{
    Duration,
    Instant,
};
use tracing::{
    info,
    warn,
};

#[derive(Debug, Clone, PartialEq)]
pub struct MergedRun {
    pub n_workers: usize,
    pub samples: Vec<SampleNoise>,
    /// Concatenated in worker index order.
    pub glycans: Vec<AnalyzedGlycan>,
    pub missing_workers: Vec<usize>,
    pub timings: AnalysisTimings,
}

impl MergedRun {
    pub fn total_peaks(&self) -> usize {
        self.glycans.iter().map(|g| g.total_peaks()).sum()
    }
}

/// Polls until every partial exists or `timeout` elapses.
///
/// Returns the workers still absent when it gave up (empty on success).
pub fn wait_for_partials(
    store: &PartialStore,
    n_workers: usize,
    timeout: Duration,
    poll: Duration,
) -> Vec<usize> {
    let start = Instant::now();
    loop {
        let missing: Vec<usize> = (0..n_workers).filter(|&i| !store.is_present(i)).collect();
        if missing.is_empty() || start.elapsed() >= timeout {
            return missing;
        }
        std::thread::sleep(poll.min(timeout.saturating_sub(start.elapsed())));
    }
}

pub fn merge_partials(store: &PartialStore, n_workers: usize) -> Result<MergedRun> {
    if n_workers == 0 {
        return Err(DataProcessingError::InvalidParameter {
            name: "workers",
            value: "0".to_string(),
        }
        .into());
    }

    let mut merged = MergedRun {
        n_workers,
        samples: Vec::new(),
        glycans: Vec::new(),
        missing_workers: Vec::new(),
        timings: AnalysisTimings::default(),
    };
    let mut samples_known = false;

    for worker in 0..n_workers {
        let partial = match store.read(worker) {
            PartialResult::Present(p) => p,
            PartialResult::Missing { worker } => {
                warn!(
                    "Partial result of worker {} not found, its glycans are absent from the output",
                    worker
                );
                merged.missing_workers.push(worker);
                continue;
            }
            PartialResult::Unreadable { worker, reason } => {
                warn!(
                    "Partial result of worker {} could not be read ({}), its glycans are absent from the output",
                    worker, reason
                );
                merged.missing_workers.push(worker);
                continue;
            }
        };

        let names_match = merged.samples.len() == partial.samples.len()
            && merged
                .samples
                .iter()
                .zip(partial.samples.iter())
                .all(|(a, b)| a.sample == b.sample);
        if samples_known && !names_match {
            warn!(
                "Worker {} was run on a different sample list, skipping it",
                worker
            );
            merged.missing_workers.push(worker);
            continue;
        }
        if partial.n_workers != n_workers {
            warn!(
                "Worker {} was run with {} workers instead of {}, skipping it",
                worker, partial.n_workers, n_workers
            );
            merged.missing_workers.push(worker);
            continue;
        }

        let partial = *partial;
        if !samples_known {
            merged.samples = partial.samples;
            samples_known = true;
        }
        merged.glycans.extend(partial.glycans);
        merged.timings += partial.timings;
    }

    info!(
        "Merged {} of {} partial results: {} glycans, {} peaks",
        n_workers - merged.missing_workers.len(),
        n_workers,
        merged.glycans.len(),
        merged.total_peaks()
    );
    Ok(merged)
}
