use std::path::PathBuf;

use thiserror::Error;

// ---------------------------------------------------------------------------
// Domain errors
// ---------------------------------------------------------------------------

/// Errors raised while opening, registering or looking up resources.
///
/// `UnknownFileType` and `DuplicateResource` are the two user-facing kinds:
/// the UI shows them in a dialog and never retries.
#[derive(Debug, Error)]
pub enum ResourceError {
    #[error("Unknown file type: {}", .0.display())]
    UnknownFileType(PathBuf),

    #[error("Resource already open: {}", .0.display())]
    DuplicateResource(PathBuf),

    #[error("Invalid path for file resource: {}", .0.display())]
    NotFound(PathBuf),

    #[error("No resource named '{0}'")]
    UnknownResource(String),

    #[error("Resource '{0}' has no numeric data")]
    NotNumeric(String),

    #[error("Resource '{alias}' holds {len} values, expected {rows} × {cols}")]
    BadShape {
        alias: String,
        rows: usize,
        cols: usize,
        len: usize,
    },

    #[error("Failed to read WAV file: {0}")]
    Wav(#[from] hound::Error),

    #[error("Failed to read CSV file: {0}")]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl ResourceError {
    /// Whether the error should be surfaced as a modal dialog rather than
    /// a status-bar message.
    pub fn is_user_facing(&self) -> bool {
        matches!(
            self,
            ResourceError::UnknownFileType(_) | ResourceError::DuplicateResource(_)
        )
    }

    /// Dialog title for user-facing errors.
    pub fn title(&self) -> &'static str {
        match self {
            ResourceError::UnknownFileType(_) => "Unknown file type",
            ResourceError::DuplicateResource(_) => "Duplicate resource",
            _ => "Error",
        }
    }
}

/// Errors from short-term feature extraction.
#[derive(Debug, Error, PartialEq)]
pub enum AnalysisError {
    #[error("Window and step must be positive (got window {window}s, step {step}s)")]
    InvalidParameters { window: f64, step: f64 },

    #[error("Sample rate must be positive")]
    InvalidSampleRate,

    #[error("Signal of {samples} samples is shorter than one window of {window} samples")]
    SignalTooShort { samples: usize, window: usize },
}

/// Failure of a resource action (features, transform) shown to the user.
#[derive(Debug, Error)]
pub enum ActionError {
    #[error(transparent)]
    Resource(#[from] ResourceError),

    #[error(transparent)]
    Analysis(#[from] AnalysisError),

    #[error(transparent)]
    Console(#[from] ConsoleError),
}

/// Errors from the embedded console.
#[derive(Debug, Error, PartialEq)]
pub enum ConsoleError {
    #[error("Syntax error at {pos}: {msg}")]
    Parse { pos: usize, msg: String },

    #[error("Name '{0}' is not defined")]
    UnknownName(String),

    #[error("Unknown function '{0}'")]
    UnknownFunction(String),

    #[error("{name}() takes {expected} argument(s), got {got}")]
    Arity {
        name: String,
        expected: usize,
        got: usize,
    },

    #[error("Shape mismatch: {left:?} vs {right:?}")]
    Shape {
        left: (usize, usize),
        right: (usize, usize),
    },

    #[error("Index {index} out of range for length {len}")]
    Index { index: usize, len: usize },

    #[error("Expected {0}")]
    Type(&'static str),
}
