use glycoquery::{
    DataProcessingError,
    DataReadingError,
    LibraryReadingError,
};
use glycotrace::errors::GlycoTraceError;

#[derive(Debug)]
pub enum CliError {
    Config {
        source: String,
    },
    ParseError {
        msg: String,
    },
    Io {
        source: String,
        path: Option<String>,
    },
    DataReading {
        source: String,
    },
    Processing {
        source: String,
    },
}

impl std::fmt::Display for CliError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CliError::Config { source } => write!(f, "Error interpreting the config: {}", source),
            CliError::ParseError { msg } => write!(f, "Error parsing config: {}", msg),
            CliError::Io { source, path } => {
                if let Some(path) = path {
                    write!(f, "Error accessing file {}: {}", path, source)
                } else {
                    write!(f, "Error accessing file: {}", source)
                }
            }
            CliError::DataReading { source } => write!(f, "Error reading data: {}", source),
            CliError::Processing { source } => write!(f, "Error during analysis: {}", source),
        }
    }
}

impl CliError {
    pub fn io(source: impl std::fmt::Display, path: &std::path::Path) -> Self {
        CliError::Io {
            source: source.to_string(),
            path: Some(path.to_string_lossy().to_string()),
        }
    }
}

impl From<DataReadingError> for CliError {
    fn from(e: DataReadingError) -> Self {
        CliError::DataReading {
            source: format!("{}", e),
        }
    }
}

impl From<LibraryReadingError> for CliError {
    fn from(e: LibraryReadingError) -> Self {
        CliError::DataReading {
            source: format!("{}", e),
        }
    }
}

impl From<DataProcessingError> for CliError {
    fn from(e: DataProcessingError) -> Self {
        CliError::Config {
            source: format!("{:?}", e),
        }
    }
}

impl From<GlycoTraceError> for CliError {
    fn from(e: GlycoTraceError) -> Self {
        match e {
            GlycoTraceError::DataReadingError(e) => e.into(),
            GlycoTraceError::LibraryReadingError(e) => e.into(),
            GlycoTraceError::Io { source, path } => CliError::Io {
                source: source.to_string(),
                path: path.map(|p| p.to_string_lossy().to_string()),
            },
            other => CliError::Processing {
                source: other.to_string(),
            },
        }
    }
}
