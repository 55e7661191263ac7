pub mod series;
pub mod validator;

pub use series::{
    EicSeries,
    build_eic,
};
pub use validator::{
    AbundanceBand,
    ISOTOPE_SPACING,
    RejectionReason,
    ScanResult,
    ValidationParams,
    validate_scan,
};
