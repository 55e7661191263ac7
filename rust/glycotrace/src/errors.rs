use glycoquery::{
    DataProcessingError,
    DataReadingError,
    GlycoqueryError,
    LibraryReadingError,
};
use std::path::PathBuf;

#[derive(Debug)]
pub enum GlycoTraceError {
    Glycoquery(GlycoqueryError),
    Io {
        source: std::io::Error,
        path: Option<PathBuf>,
    },
    SerializationError {
        msg: String,
        path: Option<PathBuf>,
    },
    DataProcessingError(DataProcessingError),
    LibraryReadingError(LibraryReadingError),
    DataReadingError(DataReadingError),
}

impl std::fmt::Display for GlycoTraceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self)
    }
}

pub type Result<T> = std::result::Result<T, GlycoTraceError>;

impl GlycoTraceError {
    pub fn io(source: std::io::Error, path: impl Into<PathBuf>) -> Self {
        Self::Io {
            source,
            path: Some(path.into()),
        }
    }

    pub fn serialization(msg: impl std::fmt::Display, path: impl Into<PathBuf>) -> Self {
        Self::SerializationError {
            msg: msg.to_string(),
            path: Some(path.into()),
        }
    }
}

impl From<GlycoqueryError> for GlycoTraceError {
    fn from(x: GlycoqueryError) -> Self {
        Self::Glycoquery(x)
    }
}

impl From<DataProcessingError> for GlycoTraceError {
    fn from(x: DataProcessingError) -> Self {
        Self::DataProcessingError(x)
    }
}

impl From<LibraryReadingError> for GlycoTraceError {
    fn from(x: LibraryReadingError) -> Self {
        Self::LibraryReadingError(x)
    }
}

impl From<DataReadingError> for GlycoTraceError {
    fn from(x: DataReadingError) -> Self {
        Self::DataReadingError(x)
    }
}

impl From<std::io::Error> for GlycoTraceError {
    fn from(x: std::io::Error) -> Self {
        Self::Io {
            source: x,
            path: None,
        }
    }
}

impl From<csv::Error> for GlycoTraceError {
    fn from(x: csv::Error) -> Self {
        Self::SerializationError {
            msg: x.to_string(),
            path: None,
        }
    }
}

impl From<serde_json::Error> for GlycoTraceError {
    fn from(val: serde_json::Error) -> Self {
        GlycoTraceError::SerializationError {
            msg: val.to_string(),
            path: None,
        }
    }
}
