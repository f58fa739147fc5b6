#![forbid(unsafe_code)]

//! Core stress classification engine for ZenTrack.
//!
//! This crate provides:
//! - Domain types (requests, HRV features, stress levels, recommendations)
//! - HRV feature extraction and HAM-A style anxiety scoring
//! - Random forest and RBF SVM classifiers with load-or-train persistence
//! - Therapy recommendations
//! - Assessment journal and stress analytics

pub mod types;
pub mod error;
pub mod features;
pub mod calibration;
pub mod scaler;
pub mod model;
pub mod classifier;
pub mod store;
pub mod persistence;
pub mod recommendation;
pub mod config;
pub mod logging;
pub mod journal;
pub mod analytics;
pub mod engine;

// Re-export commonly used types
pub use error::{Error, Result};
pub use types::*;
pub use calibration::{CalibrationRow, CalibrationSet};
pub use scaler::StandardScaler;
pub use classifier::{Classifier, TrainedModel};
pub use config::Config;
pub use store::{ArtifactStore, FsArtifactStore, MemoryArtifactStore};
pub use recommendation::{recommend_for_label, recommend_therapy};
pub use journal::{read_records, AssessmentRecord, AssessmentSink, JsonlJournal};
pub use analytics::{load_recent_analytics, summarize, StressAnalytics};
pub use engine::{EngineOptions, EngineState, ModelOrigin, StressEngine};
