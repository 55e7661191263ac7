pub mod library;
pub mod spectrum;
pub mod tolerance;

pub use library::{
    AdductTarget,
    IonTarget,
    LibraryEntry,
    TargetLibrary,
};
pub use spectrum::{
    SampleRun,
    Spectrum,
};
pub use tolerance::MzTolerance;
