/// Area of a peak over `[start, end)` on the raw trace.
///
/// Only scans that passed isotope validation contribute; each contributes
/// its raw intensity once (rectangle rule with unit width).
pub fn peak_auc(raw_trace: &[f64], validated: &[f64], start: usize, end: usize) -> f64 {
    let end = end.min(raw_trace.len()).min(validated.len());
    if start >= end {
        return 0.0;
    }
    raw_trace[start..end]
        .iter()
        .zip(validated[start..end].iter())
        .filter(|(_, v)| **v > 0.0)
        .map(|(r, _)| *r)
        .sum()
}
