//! Error types for the zentrack_core library.

use std::io;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for zentrack_core operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Interval series too short for feature extraction
    #[error("Insufficient RR interval data: need at least {required} samples, got {actual}")]
    InsufficientData { required: usize, actual: usize },

    /// Interval sample that is not a positive finite number
    #[error("Invalid RR interval at index {index}: {value}")]
    InvalidInterval { index: usize, value: f64 },

    /// Questionnaire answer outside the 0-3 ordinal scale
    #[error("Invalid anxiety answer at index {index}: {value} (expected 0-3)")]
    InvalidAnswer { index: usize, value: u8 },

    /// Neither answers, intervals, features nor a score were supplied
    #[error("Anxiety answers, RR intervals, HRV features or an anxiety score must be provided")]
    MissingInput,

    /// Prediction requested before the classifier reached the ready state
    #[error("Model not trained")]
    ModelNotTrained,

    /// Unsupported classifier kind
    #[error("Invalid model kind '{0}': expected 'random_forest' or 'svm'")]
    InvalidModelKind(String),

    /// Model fitting failed
    #[error("Training error: {0}")]
    Training(String),

    /// Stored artifact that decodes but is structurally unusable
    #[error("Invalid artifact: {0}")]
    InvalidArtifact(String),

    /// Calibration dataset validation error
    #[error("Calibration error: {0}")]
    Calibration(String),

    /// IO error occurred
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// CSV error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// TOML parsing error
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Configuration validation error
    #[error("Configuration error: {0}")]
    Config(String),
}
