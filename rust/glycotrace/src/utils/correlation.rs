use crate::errors::Result;
use glycoquery::DataProcessingError;

/// Pearson correlation coefficient between two series of the same size.
///
/// Returns `NaN` when either series has zero variance.
///
/// # Example
///
/// ```
/// use glycotrace::utils::correlation::pearson_correlation;
///
/// let a = [1.0, 2.0, 3.0, 4.0];
/// let b = [2.0, 4.0, 6.0, 8.0];
/// let r = pearson_correlation(&a, &b).unwrap();
/// assert!((r - 1.0).abs() < 1e-12);
/// ```
pub fn pearson_correlation(a: &[f64], b: &[f64]) -> Result<f64> {
    if a.len() != b.len() || a.is_empty() {
        return Err(DataProcessingError::ExpectedSlicesSameLength {
            expected: a.len(),
            other: b.len(),
            context: "pearson_correlation".to_string(),
        }
        .into());
    }

    let n = a.len() as f64;
    let mean_a = a.iter().sum::<f64>() / n;
    let mean_b = b.iter().sum::<f64>() / n;

    let (cov, var_a, var_b) = a.iter().zip(b.iter()).fold(
        (0.0, 0.0, 0.0),
        |(cov, va, vb), (&x, &y)| {
            let dx = x - mean_a;
            let dy = y - mean_b;
            (cov + dx * dy, va + dx * dx, vb + dy * dy)
        },
    );

    if var_a == 0.0 || var_b == 0.0 {
        return Ok(f64::NAN);
    }
    Ok(cov / (var_a.sqrt() * var_b.sqrt()))
}
