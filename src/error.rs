use polars::error::PolarsError;
use std::error::Error;
use std::fmt::Display;
use std::path::PathBuf;

#[derive(Debug)]
pub enum EdxError {
    MalformedSpectrumFile { path: PathBuf, reason: String },
    InvalidMetadata { path: PathBuf, total_counts: Option<f64> },
    EmptyResultSet,
    ReferenceFileError { path: PathBuf, reason: String },
    InvalidGrid { min: f64, max: f64, points: usize },
    SeriesLengthMismatch { expected: usize, found: usize },
    Config(String),
    File(std::io::Error),
    DataFrame(PolarsError),
    Yaml(serde_yaml::Error),
    Json(serde_json::Error),
}

impl EdxError {
    pub fn malformed(path: &std::path::Path, reason: impl Into<String>) -> Self {
        EdxError::MalformedSpectrumFile {
            path: path.to_path_buf(),
            reason: reason.into(),
        }
    }

    pub fn reference(path: &std::path::Path, reason: impl Into<String>) -> Self {
        EdxError::ReferenceFileError {
            path: path.to_path_buf(),
            reason: reason.into(),
        }
    }

    /// Errors that only cost the run one input file.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            EdxError::MalformedSpectrumFile { .. }
                | EdxError::InvalidMetadata { .. }
                | EdxError::SeriesLengthMismatch { .. }
        )
    }
}

impl From<std::io::Error> for EdxError {
    fn from(err: std::io::Error) -> EdxError {
        EdxError::File(err)
    }
}

impl From<PolarsError> for EdxError {
    fn from(err: PolarsError) -> EdxError {
        EdxError::DataFrame(err)
    }
}

impl From<serde_yaml::Error> for EdxError {
    fn from(err: serde_yaml::Error) -> EdxError {
        EdxError::Yaml(err)
    }
}

impl From<serde_json::Error> for EdxError {
    fn from(err: serde_json::Error) -> EdxError {
        EdxError::Json(err)
    }
}

impl Display for EdxError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EdxError::MalformedSpectrumFile { path, reason } => write!(
                f,
                "File {} could not be read or contains no valid spectrum data: {}",
                path.display(),
                reason
            ),
            EdxError::InvalidMetadata { path, total_counts } => match total_counts {
                Some(total) => write!(
                    f,
                    "File {} has an unusable total count of {} in its header",
                    path.display(),
                    total
                ),
                None => write!(
                    f,
                    "File {} has a non-numeric total count in its header",
                    path.display()
                ),
            },
            EdxError::EmptyResultSet => write!(f, "No valid spectrum data found"),
            EdxError::ReferenceFileError { path, reason } => write!(
                f,
                "Reference file {} could not be read: {}",
                path.display(),
                reason
            ),
            EdxError::InvalidGrid { min, max, points } => write!(
                f,
                "Cannot build a common energy grid of {} points over [{}, {}] keV",
                points, min, max
            ),
            EdxError::SeriesLengthMismatch { expected, found } => write!(
                f,
                "Series has {} points but the common grid has {}",
                found, expected
            ),
            EdxError::Config(x) => write!(f, "Invalid analysis configuration: {}", x),
            EdxError::File(x) => write!(f, "File I/O error: {}", x),
            EdxError::DataFrame(x) => write!(f, "Error using polars: {}", x),
            EdxError::Yaml(x) => write!(f, "Could not parse configuration file: {}", x),
            EdxError::Json(x) => write!(f, "Could not serialize plot series: {}", x),
        }
    }
}

impl Error for EdxError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            EdxError::File(x) => Some(x),
            EdxError::DataFrame(x) => Some(x),
            EdxError::Yaml(x) => Some(x),
            EdxError::Json(x) => Some(x),
            _ => None,
        }
    }
}
