//! Wall-clock time spent in each analysis stage.
//!
//! Timings are summed over glycans within a worker and over workers at
//! merge time.

use serde::{
    Deserialize,
    Serialize,
};
use std::time::Duration;

#[derive(Debug, Default, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "TimingsMillis", into = "TimingsMillis")]
pub struct AnalysisTimings {
    /// EIC extraction and scan validation.
    pub extraction: Duration,
    /// Smoothing plus peak detection.
    pub peak_picking: Duration,
    /// Quality scores and AUC.
    pub scoring: Duration,
}

impl AnalysisTimings {
    pub fn total(&self) -> Duration {
        self.extraction + self.peak_picking + self.scoring
    }
}

#[derive(Serialize, Deserialize)]
struct TimingsMillis {
    extraction_ms: f64,
    peak_picking_ms: f64,
    scoring_ms: f64,
}

fn millis(d: Duration) -> f64 {
    d.as_secs_f64() * 1e3
}

fn from_millis(ms: f64) -> Duration {
    if ms.is_finite() && ms > 0.0 {
        Duration::from_secs_f64(ms / 1e3)
    } else {
        Duration::ZERO
    }
}

impl From<AnalysisTimings> for TimingsMillis {
    fn from(x: AnalysisTimings) -> Self {
        Self {
            extraction_ms: millis(x.extraction),
            peak_picking_ms: millis(x.peak_picking),
            scoring_ms: millis(x.scoring),
        }
    }
}

impl From<TimingsMillis> for AnalysisTimings {
    fn from(x: TimingsMillis) -> Self {
        Self {
            extraction: from_millis(x.extraction_ms),
            peak_picking: from_millis(x.peak_picking_ms),
            scoring: from_millis(x.scoring_ms),
        }
    }
}

impl std::ops::AddAssign for AnalysisTimings {
    fn add_assign(&mut self, rhs: Self) {
        self.extraction += rhs.extraction;
        self.peak_picking += rhs.peak_picking;
        self.scoring += rhs.scoring;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_and_serialize_as_millis() {
        let mut t = AnalysisTimings {
            extraction: Duration::from_millis(10),
            peak_picking: Duration::from_millis(5),
            scoring: Duration::from_millis(1),
        };
        t += t;
        assert_eq!(t.total(), Duration::from_millis(32));

        let json = serde_json::to_value(t).unwrap();
        let ms = json["extraction_ms"].as_f64().unwrap();
        assert!((ms - 20.0).abs() < 1e-9);
        let back: AnalysisTimings = serde_json::from_value(json).unwrap();
        assert!((back.peak_picking.as_secs_f64() - 0.01).abs() < 1e-9);
    }
}
