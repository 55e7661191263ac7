//! Savitzky-Golay smoothing of chromatogram intensities.
//!
//! The smoothed trace only drives peak-shape decisions (peak detection and
//! curve fitting). Areas are always integrated on the raw trace.

pub const SG_POLYNOMIAL_DEGREE: usize = 3;
pub const MIN_SG_WINDOW: usize = 21;

/// Window used for a series of `len` points.
///
/// At least [`MIN_SG_WINDOW`], widened for long series, always odd and never
/// longer than the series itself.
pub fn savgol_window(len: usize) -> usize {
    let mut window = MIN_SG_WINDOW.max(len / 50);
    if window % 2 == 0 {
        window += 1;
    }
    if window > len {
        window = if len % 2 == 1 { len } else { len.saturating_sub(1) };
    }
    window
}

/// Smooths `data` with the default window and degree, clamping negatives to 0.
#[cfg_attr(
    feature = "instrumentation",
    tracing::instrument(skip_all, level = "trace")
)]
pub fn smooth_intensity(data: &[f64]) -> Vec<f64> {
    let mut out = savitzky_golay(data, savgol_window(data.len()), SG_POLYNOMIAL_DEGREE);
    out.iter_mut().for_each(|x| {
        if *x < 0.0 || !x.is_finite() {
            *x = 0.0
        }
    });
    out
}

/// Least-squares Savitzky-Golay filter.
///
/// Points closer than half a window to either end are evaluated on the
/// polynomial fitted to the first (or last) full window, so the output has
/// the same length as the input. Inputs that cannot support the fit are
/// returned unchanged.
pub fn savitzky_golay(data: &[f64], window: usize, degree: usize) -> Vec<f64> {
    if window < 3 || window % 2 == 0 || window <= degree || data.len() < window {
        return data.to_vec();
    }
    let coefs = match fit_coefficients(window, degree) {
        Some(c) => c,
        None => return data.to_vec(),
    };

    let half = window / 2;
    let n = data.len();
    (0..n)
        .map(|i| {
            let (start, offset) = if i < half {
                (0, i as f64 - half as f64)
            } else if i + half >= n {
                let start = n - window;
                (start, (i - start) as f64 - half as f64)
            } else {
                (i - half, 0.0)
            };
            let u = offset / half as f64;
            let slice = &data[start..start + window];
            coefs
                .iter()
                .enumerate()
                .map(|(k, row)| {
                    let term: f64 = row.iter().zip(slice.iter()).map(|(c, y)| c * y).sum();
                    term * u.powi(k as i32)
                })
                .sum()
        })
        .collect()
}

/// Rows of `(A^T A)^-1 A^T` for a window of `window` points, with positions
/// scaled to [-1, 1] for conditioning.
fn fit_coefficients(window: usize, degree: usize) -> Option<Vec<Vec<f64>>> {
    let half = (window / 2) as f64;
    let ncoef = degree + 1;
    let positions: Vec<f64> = (0..window).map(|j| (j as f64 - half) / half).collect();

    let mut ata = vec![vec![0.0; ncoef]; ncoef];
    for (r, row) in ata.iter_mut().enumerate() {
        for (c, cell) in row.iter_mut().enumerate() {
            *cell = positions.iter().map(|u| u.powi((r + c) as i32)).sum();
        }
    }
    let inv = invert(ata)?;

    let coefs = (0..ncoef)
        .map(|k| {
            positions
                .iter()
                .map(|u| (0..ncoef).map(|c| inv[k][c] * u.powi(c as i32)).sum())
                .collect()
        })
        .collect();
    Some(coefs)
}

/// Gauss-Jordan inversion with partial pivoting.
fn invert(mut m: Vec<Vec<f64>>) -> Option<Vec<Vec<f64>>> {
    let n = m.len();
    let mut inv: Vec<Vec<f64>> = (0..n)
        .map(|i| (0..n).map(|j| if i == j { 1.0 } else { 0.0 }).collect())
        .collect();

    for col in 0..n {
        let pivot = (col..n).max_by(|&a, &b| m[a][col].abs().total_cmp(&m[b][col].abs()))?;
        if m[pivot][col].abs() < 1e-12 {
            return None;
        }
        m.swap(col, pivot);
        inv.swap(col, pivot);

        let p = m[col][col];
        for j in 0..n {
            m[col][j] /= p;
            inv[col][j] /= p;
        }
        for row in 0..n {
            if row == col {
                continue;
            }
            let factor = m[row][col];
            if factor == 0.0 {
                continue;
            }
            for j in 0..n {
                m[row][j] -= factor * m[col][j];
                inv[row][j] -= factor * inv[col][j];
            }
        }
    }
    Some(inv)
}
