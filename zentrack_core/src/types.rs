//! Core domain types for the ZenTrack stress engine.
//!
//! This module defines the fundamental types used throughout the system:
//! - Stress levels and model kinds
//! - HRV features and the classifier feature vector
//! - Assessment requests and classification results
//! - Therapy recommendations

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::Error;

// ============================================================================
// Stress Levels
// ============================================================================

/// Discrete stress classification, ordered from least to most stressed
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum StressLevel {
    Low,
    Moderate,
    High,
}

impl StressLevel {
    /// All levels in label order (class index 0, 1, 2)
    pub const ALL: [StressLevel; 3] = [StressLevel::Low, StressLevel::Moderate, StressLevel::High];

    /// Class index used by the classifier
    pub fn index(self) -> usize {
        match self {
            StressLevel::Low => 0,
            StressLevel::Moderate => 1,
            StressLevel::High => 2,
        }
    }

    /// Level for a classifier class index
    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    pub fn as_str(self) -> &'static str {
        match self {
            StressLevel::Low => "Low",
            StressLevel::Moderate => "Moderate",
            StressLevel::High => "High",
        }
    }

    /// Parse a label case-insensitively; returns None for unknown labels
    pub fn parse(label: &str) -> Option<Self> {
        match label.trim().to_lowercase().as_str() {
            "low" => Some(StressLevel::Low),
            "moderate" => Some(StressLevel::Moderate),
            "high" => Some(StressLevel::High),
            _ => None,
        }
    }
}

impl fmt::Display for StressLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Model Kind
// ============================================================================

/// Classifier family selected once at engine construction
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ModelKind {
    RandomForest,
    Svm,
}

impl ModelKind {
    /// Identifier used in configuration and artifact keys
    pub fn as_str(self) -> &'static str {
        match self {
            ModelKind::RandomForest => "random_forest",
            ModelKind::Svm => "svm",
        }
    }
}

impl FromStr for ModelKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "random_forest" | "randomforest" | "rf" => Ok(ModelKind::RandomForest),
            "svm" => Ok(ModelKind::Svm),
            other => Err(Error::InvalidModelKind(other.to_string())),
        }
    }
}

impl fmt::Display for ModelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Features
// ============================================================================

/// Number of inputs the classifier consumes
pub const FEATURE_COUNT: usize = 5;

/// Time-domain HRV features derived from an interval series
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq)]
pub struct HrvFeatures {
    pub mean_hr: f64,
    pub sdnn: f64,
    pub rmssd: f64,
    pub lf_hf_ratio: f64,
}

/// Complete classifier input: HRV features plus anxiety score
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FeatureVector {
    pub hrv: HrvFeatures,
    pub anxiety_score: u32,
}

impl FeatureVector {
    pub fn new(hrv: HrvFeatures, anxiety_score: u32) -> Self {
        Self { hrv, anxiety_score }
    }

    /// Column order: mean_hr, sdnn, rmssd, lf_hf_ratio, anxiety_score
    pub fn to_array(&self) -> [f64; FEATURE_COUNT] {
        [
            self.hrv.mean_hr,
            self.hrv.sdnn,
            self.hrv.rmssd,
            self.hrv.lf_hf_ratio,
            f64::from(self.anxiety_score),
        ]
    }
}

// ============================================================================
// Requests and Results
// ============================================================================

/// Caller-supplied assessment input
///
/// At least one field must be present. Precomputed `hrv_features` take
/// precedence over `rr_intervals`; `answers` take precedence over
/// `anxiety_score`.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct AssessmentRequest {
    #[serde(default)]
    pub answers: Option<Vec<u8>>,
    #[serde(default)]
    pub rr_intervals: Option<Vec<f64>>,
    #[serde(default)]
    pub anxiety_score: Option<u32>,
    #[serde(default)]
    pub hrv_features: Option<HrvFeatures>,
}

impl AssessmentRequest {
    pub fn from_answers(answers: Vec<u8>) -> Self {
        Self {
            answers: Some(answers),
            ..Self::default()
        }
    }

    pub fn from_intervals(rr_intervals: Vec<f64>) -> Self {
        Self {
            rr_intervals: Some(rr_intervals),
            ..Self::default()
        }
    }
}

/// Class probabilities in percent
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq)]
pub struct Probabilities {
    pub low: f64,
    pub moderate: f64,
    pub high: f64,
}

impl Probabilities {
    pub fn get(&self, level: StressLevel) -> f64 {
        match level {
            StressLevel::Low => self.low,
            StressLevel::Moderate => self.moderate,
            StressLevel::High => self.high,
        }
    }

    pub fn total(&self) -> f64 {
        self.low + self.moderate + self.high
    }

    /// Most probable level; ties resolve toward the lower level
    pub fn argmax(&self) -> StressLevel {
        let mut best = StressLevel::Low;
        for level in StressLevel::ALL {
            if self.get(level) > self.get(best) {
                best = level;
            }
        }
        best
    }
}

/// Output of a single classifier call
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Prediction {
    pub stress_level: StressLevel,
    pub confidence: f64,
    pub probabilities: Probabilities,
}

/// Per-request classification returned to the caller
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ClassificationResult {
    pub stress_level: StressLevel,
    pub confidence: f64,
    pub probabilities: Probabilities,
    pub hrv_features: HrvFeatures,
    pub anxiety_score: Option<u32>,
    pub timestamp: DateTime<Utc>,
}

// ============================================================================
// Recommendations
// ============================================================================

/// Primary therapy modality
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TherapyModality {
    Music,
    Yoga,
    Chatbot,
}

/// Therapy recommendation attached to a stress level
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct TherapyRecommendation {
    pub primary: TherapyModality,
    pub message: String,
    pub therapies: Vec<String>,
}

/// Classification plus the recommendation derived from it
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Assessment {
    #[serde(flatten)]
    pub result: ClassificationResult,
    pub therapy_recommendation: TherapyRecommendation,
    pub model_kind: ModelKind,
}
