//! Extraction primitives for glycan LC-MS data.
//!
//! This crate owns the query side of the pipeline: the target library and
//! spectrum models with their readers, the m/z tolerance model, the
//! per-sample noise estimator and the isotope-validated EIC builder.

// Re-export main structures
pub use crate::eic::{
    EicSeries,
    ValidationParams,
    build_eic,
};
pub use crate::models::{
    IonTarget,
    LibraryEntry,
    MzTolerance,
    SampleRun,
    Spectrum,
    TargetLibrary,
};
pub use crate::noise::{
    NoiseProfile,
    estimate_noise,
    fixed_noise,
};
pub use crate::utils::{
    RtWindow,
    TupleRange,
};

// Declare modules
pub mod eic;
pub mod errors;
pub mod models;
pub mod noise;
pub mod serde;
pub mod utils;

// Re-export errors
pub use crate::errors::{
    DataProcessingError,
    DataReadingError,
    GlycoqueryError,
    LibraryReadingError,
};
