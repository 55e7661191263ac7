use crate::errors::DataProcessingError;
use serde::{
    Deserialize,
    Serialize,
};

/// TupleRange represents a range defined by a tuple of two elements (T, T).
///
/// It represents a range as closed-closed [a, b], meaning both endpoints are inclusive.
/// The first element is always less than or equal to the second.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TupleRange<T: Copy + PartialOrd>(T, T);

impl<T: Copy + PartialOrd + std::fmt::Debug> TupleRange<T> {
    pub fn try_new(left: T, right: T) -> Result<Self, DataProcessingError> {
        if left > right {
            Err(DataProcessingError::InvalidParameter {
                name: "range",
                value: format!("({:?}, {:?})", left, right),
            })
        } else {
            Ok(Self(left, right))
        }
    }

    pub fn as_tuple(&self) -> (T, T) {
        (self.0, self.1)
    }

    pub fn contains(&self, x: T) -> bool {
        self.0 <= x && x <= self.1
    }

    pub fn start(&self) -> T {
        self.0
    }

    pub fn end(&self) -> T {
        self.1
    }
}

/// Retention time window in minutes, both ends inclusive.
pub type RtWindow = TupleRange<f64>;

impl Default for TupleRange<f64> {
    /// Wide enough to cover any LC gradient.
    fn default() -> Self {
        Self(0.0, 999.0)
    }
}

/// Percentile with linear interpolation between the closest ranks.
///
/// `q` is expressed in percent (0..=100). Non-finite values are dropped
/// before ranking. Returns `None` when nothing is left to rank.
///
/// ```
/// use glycoquery::utils::percentile;
///
/// let vals = [1.0, 2.0, 3.0, 4.0, 5.0];
/// assert_eq!(percentile(&vals, 50.0), Some(3.0));
/// assert!((percentile(&vals, 95.0).unwrap() - 4.8).abs() < 1e-9);
/// assert_eq!(percentile(&[], 95.0), None);
/// ```
pub fn percentile(values: &[f64], q: f64) -> Option<f64> {
    let mut sorted: Vec<f64> = values.iter().copied().filter(|x| x.is_finite()).collect();
    if sorted.is_empty() {
        return None;
    }
    sorted.sort_unstable_by(|a, b| a.total_cmp(b));
    let rank = (q.clamp(0.0, 100.0) / 100.0) * (sorted.len() - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    let frac = rank - lo as f64;
    Some(sorted[lo] + (sorted[hi] - sorted[lo]) * frac)
}

/// Median of the successive differences of a sorted series.
///
/// Used as the nominal sampling interval of a chromatogram.
pub fn median_spacing(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let diffs: Vec<f64> = values.windows(2).map(|w| w[1] - w[0]).collect();
    percentile(&diffs, 50.0)
}

/// Index of the element closest to `target` in an ascending slice,
/// if it lies within `tolerance`.
pub fn nearest_within(sorted: &[f64], target: f64, tolerance: f64) -> Option<usize> {
    let pos = sorted.partition_point(|&x| x < target);
    let candidates = [pos.checked_sub(1), Some(pos)];
    candidates
        .into_iter()
        .flatten()
        .filter(|&i| i < sorted.len())
        .filter(|&i| (sorted[i] - target).abs() <= tolerance)
        .min_by(|&a, &b| {
            (sorted[a] - target)
                .abs()
                .total_cmp(&(sorted[b] - target).abs())
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tuple_range_rejects_inverted() {
        assert!(TupleRange::try_new(2.0, 1.0).is_err());
        let r = TupleRange::try_new(1.0, 2.0).unwrap();
        assert!(r.contains(1.0));
        assert!(r.contains(2.0));
        assert!(!r.contains(2.0001));
    }

    #[test]
    fn test_percentile_interpolates() {
        let vals = [20.0, 40.0, 60.0, 80.0, 100.0];
        let p = percentile(&vals, 66.8).unwrap();
        assert!((p - 73.44).abs() < 1e-9);
        assert_eq!(percentile(&[7.0], 12.0), Some(7.0));
    }

    #[test]
    fn test_percentile_ignores_nan() {
        let vals = [f64::NAN, 1.0, 3.0];
        assert_eq!(percentile(&vals, 50.0), Some(2.0));
    }

    #[test]
    fn test_nearest_within() {
        let mzs = [100.0, 100.5, 101.0, 102.0];
        assert_eq!(nearest_within(&mzs, 100.49, 0.02), Some(1));
        assert_eq!(nearest_within(&mzs, 101.9999, 0.01), Some(3));
        assert_eq!(nearest_within(&mzs, 101.5, 0.1), None);
        assert_eq!(nearest_within(&[], 101.5, 0.1), None);
    }

    #[test]
    fn test_median_spacing() {
        let rts = [0.0, 0.01, 0.02, 0.05, 0.06];
        let sp = median_spacing(&rts).unwrap();
        assert!((sp - 0.01).abs() < 1e-12);
        assert_eq!(median_spacing(&[1.0]), None);
    }
}
