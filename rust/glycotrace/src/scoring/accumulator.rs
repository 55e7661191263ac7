//! Collects per-worker reports and timings, sequentially or from a rayon
//! parallel iterator (fold per thread, then pairwise reduce).

use super::timings::AnalysisTimings;
use crate::partition::WorkerReport;
use rayon::iter::{
    FromParallelIterator,
    IntoParallelIterator,
    ParallelIterator,
};

#[derive(Debug, Default)]
pub struct WorkerAccumulator {
    pub reports: Vec<WorkerReport>,
    pub failed: usize,
    pub timings: AnalysisTimings,
}

impl WorkerAccumulator {
    fn reduce(mut self, other: Self) -> Self {
        self.reports.extend(other.reports);
        self.failed += other.failed;
        self.timings += other.timings;
        self
    }

    /// `None` marks a worker that produced no partial result.
    fn fold(mut self, item: (Option<WorkerReport>, AnalysisTimings)) -> Self {
        match item.0 {
            Some(report) => self.reports.push(report),
            None => self.failed += 1,
        }
        self.timings += item.1;
        self
    }
}

impl FromIterator<(Option<WorkerReport>, AnalysisTimings)> for WorkerAccumulator {
    fn from_iter<I>(iter: I) -> Self
    where
        I: IntoIterator<Item = (Option<WorkerReport>, AnalysisTimings)>,
    {
        iter.into_iter()
            .fold(WorkerAccumulator::default(), WorkerAccumulator::fold)
    }
}

impl FromParallelIterator<(Option<WorkerReport>, AnalysisTimings)> for WorkerAccumulator {
    fn from_par_iter<I>(par_iter: I) -> Self
    where
        I: IntoParallelIterator<Item = (Option<WorkerReport>, AnalysisTimings)>,
    {
        let mut acc = par_iter
            .into_par_iter()
            .fold(WorkerAccumulator::default, WorkerAccumulator::fold)
            .reduce(WorkerAccumulator::default, WorkerAccumulator::reduce);
        acc.reports.sort_by_key(|r| r.worker_index);
        acc
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rayon::prelude::*;
    use std::time::Duration;

    fn item(i: usize, ok: bool) -> (Option<WorkerReport>, AnalysisTimings) {
        let report = ok.then(|| WorkerReport {
            worker_index: i,
            num_glycans: 2,
            num_peaks: i,
            path: format!("partial_{}.msgpack.zst", i).into(),
        });
        let timings = AnalysisTimings {
            extraction: Duration::from_millis(1),
            ..Default::default()
        };
        (report, timings)
    }

    #[test]
    fn test_parallel_and_sequential_agree() {
        let items: Vec<_> = (0..16).map(|i| item(i, i % 5 != 0)).collect();
        let seq: WorkerAccumulator = items.clone().into_iter().collect();
        let par: WorkerAccumulator = items.into_par_iter().collect();
        assert_eq!(seq.failed, 4);
        assert_eq!(par.failed, 4);
        assert_eq!(seq.reports, par.reports);
        assert_eq!(par.timings.extraction, Duration::from_millis(16));
    }
}
