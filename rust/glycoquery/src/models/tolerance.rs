use serde::{
    Deserialize,
    Serialize,
};

/// Reference m/z used when a tolerance has to be expressed without a query point.
pub const REFERENCE_MZ: f64 = 1000.0;

/// Mass accuracy used to match observed peaks against a target m/z.
///
/// Serialized as `{"ppm": 10.0}` or `{"mz": 0.01}`.
///
/// Example:
/// ```
/// use glycoquery::MzTolerance;
///
/// let tol = MzTolerance::Ppm(10.0);
/// assert!((tol.nominal_width() - 0.01).abs() < 1e-12);
/// assert_eq!(MzTolerance::Absolute(0.02).width_at(500.0), 0.02);
/// ```
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub enum MzTolerance {
    #[serde(rename = "ppm")]
    Ppm(f64),
    #[serde(rename = "mz")]
    Absolute(f64),
}

impl Default for MzTolerance {
    fn default() -> Self {
        MzTolerance::Ppm(10.0)
    }
}

impl MzTolerance {
    /// Half-width of the matching window (in m/z units) around `mz`.
    ///
    /// The ppm branch is evaluated as `mz - (mz - ppm * mz / 1e6)`.
    pub fn width_at(&self, mz: f64) -> f64 {
        match self {
            MzTolerance::Ppm(ppm) => mz - (-((ppm * mz) / 1e6) + mz),
            MzTolerance::Absolute(width) => *width,
        }
    }

    /// Width at [`REFERENCE_MZ`].
    pub fn nominal_width(&self) -> f64 {
        self.width_at(REFERENCE_MZ)
    }

    pub fn mz_range(&self, mz: f64) -> (f64, f64) {
        let w = self.width_at(mz);
        (mz - w, mz + w)
    }

    pub fn matches(&self, target: f64, observed: f64) -> bool {
        (observed - target).abs() <= self.width_at(target)
    }

    /// Ppm error assigned to a scan with no usable monoisotopic match:
    /// the error of a peak sitting exactly one tolerance width below `target`.
    pub fn fallback_ppm(&self, target: f64) -> f64 {
        ppm_diff(target - self.width_at(target), target)
    }

    pub fn validate(&self) -> Result<(), crate::errors::DataProcessingError> {
        let value = match self {
            MzTolerance::Ppm(x) | MzTolerance::Absolute(x) => *x,
        };
        if !(value.is_finite() && value > 0.0) {
            return Err(crate::errors::DataProcessingError::InvalidParameter {
                name: "tolerance",
                value: format!("{:?}", self),
            });
        }
        Ok(())
    }
}

/// Signed ppm deviation of `observed` relative to `target`.
///
/// Positive when the observed peak sits below the target.
pub fn ppm_diff(observed: f64, target: f64) -> f64 {
    ((target - observed) / target) * 1e6
}
