use super::{
    RecordError,
    RecordFormat,
    RecordReader,
};
use crate::errors::LibraryReadingError;
use crate::models::{
    LibraryEntry,
    TargetLibrary,
};
use std::path::{
    Path,
    PathBuf,
};
use tracing::info;

/// Reads and validates a target library file.
///
/// Any malformed entry aborts the whole load.
pub fn read_library(path: &Path) -> Result<TargetLibrary, LibraryReadingError> {
    let format = RecordFormat::detect_from_path(path).map_err(|e| {
        LibraryReadingError::FileReadingError {
            source: e,
            context: "Error opening library file for format detection",
            path: PathBuf::from(path),
        }
    })?;
    let file = std::fs::File::open(path).map_err(|e| LibraryReadingError::FileReadingError {
        source: e,
        context: "Error opening library file",
        path: PathBuf::from(path),
    })?;

    let to_lib_err = |e: RecordError| match e {
        RecordError::Io(source) => LibraryReadingError::FileReadingError {
            source,
            context: "Error reading library file",
            path: PathBuf::from(path),
        },
        RecordError::Parse(source) => LibraryReadingError::ParsingError {
            source,
            context: "Error parsing library entry",
        },
    };

    let entries: Vec<LibraryEntry> = RecordReader::new(file, format)
        .map_err(to_lib_err)?
        .map(|x| x.map_err(to_lib_err))
        .collect::<Result<_, _>>()?;

    let library = TargetLibrary::from_entries(entries)?;
    info!(
        "Loaded {} library entries from {}",
        library.len(),
        path.display()
    );
    Ok(library)
}
