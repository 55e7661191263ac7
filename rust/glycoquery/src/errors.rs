use std::fmt::Display;
use std::path::PathBuf;

#[derive(Debug)]
pub enum GlycoqueryError {
    DataReadingError(DataReadingError),
    LibraryReadingError(LibraryReadingError),
    DataProcessingError(DataProcessingError),
    Other(String),
}

impl Display for GlycoqueryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self)
    }
}

impl GlycoqueryError {
    pub fn custom(msg: impl Display) -> Self {
        Self::Other(msg.to_string())
    }
}

pub type Result<T> = std::result::Result<T, GlycoqueryError>;

/// Failures while reading spectra from a sample file.
#[derive(Debug)]
pub enum DataReadingError {
    FileReadingError {
        source: std::io::Error,
        context: &'static str,
        path: PathBuf,
    },
    ParsingError {
        source: String,
        context: &'static str,
        path: PathBuf,
    },
    MalformedSpectrum {
        scan_id: u32,
        reason: String,
    },
}

impl Display for DataReadingError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::FileReadingError {
                source,
                context,
                path,
            } => write!(f, "{} ({}): {}", context, path.display(), source),
            Self::ParsingError {
                source,
                context,
                path,
            } => write!(f, "{} ({}): {}", context, path.display(), source),
            Self::MalformedSpectrum { scan_id, reason } => {
                write!(f, "Malformed spectrum (scan {}): {}", scan_id, reason)
            }
        }
    }
}

/// Failures while reading or validating the target library.
#[derive(Debug)]
pub enum LibraryReadingError {
    FileReadingError {
        source: std::io::Error,
        context: &'static str,
        path: PathBuf,
    },
    ParsingError {
        source: String,
        context: &'static str,
    },
    MalformedEntry {
        glycan: String,
        reason: String,
    },
}

impl Display for LibraryReadingError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::FileReadingError {
                source,
                context,
                path,
            } => write!(f, "{} ({}): {}", context, path.display(), source),
            Self::ParsingError { source, context } => write!(f, "{}: {}", context, source),
            Self::MalformedEntry { glycan, reason } => {
                write!(f, "Malformed library entry '{}': {}", glycan, reason)
            }
        }
    }
}

#[derive(Debug)]
pub enum DataProcessingError {
    ExpectedSlicesSameLength {
        expected: usize,
        other: usize,
        context: String,
    },
    ExpectedNonEmptyData {
        context: Option<String>,
    },
    InvalidParameter {
        name: &'static str,
        value: String,
    },
}

impl DataProcessingError {
    pub fn append_to_context(mut self, context: &str) -> Self {
        match &mut self {
            DataProcessingError::ExpectedSlicesSameLength {
                context: owned_context,
                ..
            } => {
                owned_context.push_str(context);
            }
            DataProcessingError::ExpectedNonEmptyData {
                context: owned_context,
            } => match owned_context {
                Some(x) => x.push_str(context),
                None => *owned_context = Some(context.to_string()),
            },
            DataProcessingError::InvalidParameter { .. } => {}
        }
        self
    }
}

impl From<DataReadingError> for GlycoqueryError {
    fn from(e: DataReadingError) -> Self {
        GlycoqueryError::DataReadingError(e)
    }
}

impl From<LibraryReadingError> for GlycoqueryError {
    fn from(e: LibraryReadingError) -> Self {
        GlycoqueryError::LibraryReadingError(e)
    }
}

impl From<DataProcessingError> for GlycoqueryError {
    fn from(e: DataProcessingError) -> Self {
        GlycoqueryError::DataProcessingError(e)
    }
}
