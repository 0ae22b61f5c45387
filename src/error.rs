//! Crate-wide error type.
//!
//! Every failure the engine can report is a variant here, so callers can match
//! on the kind (unknown method, bad parameter, too few points, ...) instead of
//! parsing messages. The binary maps each kind to a process exit code.

use thiserror::Error;

use crate::domain::GroupKey;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, FermError>;

#[derive(Error, Debug)]
pub enum FermError {
    /// Method name not present in the registry.
    #[error("Unknown method `{name}`. Valid choices: {}", .valid.join(", "))]
    UnknownMethod { name: String, valid: Vec<String> },

    /// A parameter violates the method's preconditions.
    #[error("Invalid parameter: {message}")]
    InvalidParameter { message: String },

    /// The curve has fewer points than the method needs.
    #[error("Insufficient data for `{method}`: need at least {required} points, got {available}")]
    InsufficientData {
        method: &'static str,
        required: usize,
        available: usize,
    },

    /// A required column is absent from the input table.
    #[error("Missing column: `{column}`")]
    MissingColumn { column: String },

    /// Two sequences that must align have different lengths.
    #[error("Length mismatch: expected {expected}, got {actual}")]
    LengthMismatch { expected: usize, actual: usize },

    /// A column exists but holds the wrong kind of values.
    #[error("Column `{column}` must be {expected}")]
    ColumnType { column: String, expected: &'static str },

    /// A grid value falls outside the fitted domain and extrapolation is disabled.
    #[error("Value {value} is outside the interpolation domain [{min}, {max}]")]
    OutOfBounds { value: f64, min: f64, max: f64 },

    /// A numerical solve did not produce a finite answer.
    #[error("Computation failed: {message}")]
    Computation { message: String },

    /// A failure inside one group of a grouped operation.
    #[error("Group `{key}`: {source}")]
    Group {
        key: GroupKey,
        #[source]
        source: Box<FermError>,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl FermError {
    pub fn invalid_parameter(message: impl Into<String>) -> Self {
        Self::InvalidParameter {
            message: message.into(),
        }
    }

    pub fn insufficient_data(method: &'static str, required: usize, available: usize) -> Self {
        Self::InsufficientData {
            method,
            required,
            available,
        }
    }

    pub fn computation(message: impl Into<String>) -> Self {
        Self::Computation {
            message: message.into(),
        }
    }

    pub fn missing_column(column: impl Into<String>) -> Self {
        Self::MissingColumn {
            column: column.into(),
        }
    }

    pub fn length_mismatch(expected: usize, actual: usize) -> Self {
        Self::LengthMismatch { expected, actual }
    }

    /// Attach a group key to an error raised while processing that group.
    pub fn in_group(self, key: GroupKey) -> Self {
        Self::Group {
            key,
            source: Box::new(self),
        }
    }

    /// Innermost error, looking through any `Group` wrapper.
    pub fn root(&self) -> &FermError {
        match self {
            FermError::Group { source, .. } => source.root(),
            other => other,
        }
    }

    /// Process exit code for the `ferm` binary.
    ///
    /// - 2: bad invocation or unreadable input
    /// - 3: data does not satisfy a method's requirements
    /// - 4: computation failure
    pub fn exit_code(&self) -> u8 {
        match self {
            FermError::UnknownMethod { .. }
            | FermError::InvalidParameter { .. }
            | FermError::MissingColumn { .. }
            | FermError::ColumnType { .. }
            | FermError::Io(_)
            | FermError::Csv(_)
            | FermError::Json(_) => 2,
            FermError::InsufficientData { .. } | FermError::OutOfBounds { .. } => 3,
            FermError::LengthMismatch { .. } | FermError::Computation { .. } => 4,
            FermError::Group { source, .. } => source.exit_code(),
        }
    }
}
