pub mod errors;
pub mod models;
pub mod output;
pub mod partition;
pub mod scoring;
pub mod utils;

pub use models::{
    AnalyzedGlycan,
    CurveFit,
    Peak,
};
pub use partition::{
    MergedRun,
    PartialStore,
    WorkerContext,
    merge_partials,
};
pub use scoring::{
    AnalysisParameters,
    AnalysisTimings,
    GlycanAnalyzer,
    prepare_samples,
};
