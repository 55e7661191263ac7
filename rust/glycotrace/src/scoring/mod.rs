mod accumulator;
pub mod auc;
pub mod peak_detection;
pub mod pipeline;
pub mod quality;
pub mod smoothing;
pub mod timings;

pub use accumulator::WorkerAccumulator;
pub use pipeline::{
    AnalysisParameters,
    GlycanAnalyzer,
    PreparedSample,
    prepare_samples,
};
pub use timings::AnalysisTimings;
