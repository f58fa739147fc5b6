//! Stress assessment engine.
//!
//! The engine owns the one long-lived piece of state, the trained
//! classifier. It is built once by [`StressEngine::initialize`]:
//!
//! ```text
//! Untrained -> Loading  -> Ready      (artifacts found in the store)
//! Untrained -> Training -> Ready      (no usable artifacts)
//!              Training -> Failed     (returned as an error)
//! ```
//!
//! After that it is immutable and can be shared across threads.

use crate::features::{anxiety_score, default_features_for_score, extract_hrv_features};
use crate::persistence;
use crate::recommendation::recommend_therapy;
use crate::store::ArtifactStore;
use crate::{
    Assessment, AssessmentRequest, CalibrationSet, Classifier, ClassificationResult, Config,
    Error, FeatureVector, HrvFeatures, ModelKind, Result, TherapyRecommendation, TrainedModel,
};
use chrono::{DateTime, Utc};
use std::fmt;

/// Initialization phase of the engine
///
/// Phases are reported in initialization logs only; a constructed
/// [`StressEngine`] is always ready.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EngineState {
    Untrained,
    Loading,
    Training,
    Ready,
    Failed,
}

impl fmt::Display for EngineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EngineState::Untrained => "untrained",
            EngineState::Loading => "loading",
            EngineState::Training => "training",
            EngineState::Ready => "ready",
            EngineState::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Where the ready model came from
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ModelOrigin {
    Loaded,
    Trained,
}

/// Engine construction parameters
#[derive(Clone, Debug, PartialEq)]
pub struct EngineOptions {
    pub kind: ModelKind,
    pub default_anxiety_score: u32,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            kind: ModelKind::RandomForest,
            default_anxiety_score: 10,
        }
    }
}

impl EngineOptions {
    pub fn new(kind: ModelKind) -> Self {
        Self {
            kind,
            ..Self::default()
        }
    }

    /// Options from configuration; fails on an unsupported model kind
    pub fn from_config(config: &Config) -> Result<Self> {
        Ok(Self {
            kind: config.model_kind()?,
            default_anxiety_score: config.assessment.default_anxiety_score,
        })
    }
}

/// Ready-to-use stress classification engine
#[derive(Clone, Debug)]
pub struct StressEngine {
    classifier: Classifier,
    default_anxiety_score: u32,
    origin: ModelOrigin,
}

impl StressEngine {
    /// Load stored artifacts or train and store new ones
    pub fn initialize<S: ArtifactStore + ?Sized>(
        options: &EngineOptions,
        store: &mut S,
        calibration: &CalibrationSet,
    ) -> Result<Self> {
        let kind = options.kind;
        transition(kind, EngineState::Untrained, EngineState::Loading);

        if let Some(trained) = persistence::try_load(store, kind) {
            transition(kind, EngineState::Loading, EngineState::Ready);
            return Ok(Self::from_trained(trained, options, ModelOrigin::Loaded));
        }

        transition(kind, EngineState::Loading, EngineState::Training);
        match persistence::train_and_store(store, kind, calibration) {
            Ok(trained) => {
                transition(kind, EngineState::Training, EngineState::Ready);
                Ok(Self::from_trained(trained, options, ModelOrigin::Trained))
            }
            Err(e) => {
                transition(kind, EngineState::Training, EngineState::Failed);
                tracing::error!("Stress model training failed: {}", e);
                Err(e)
            }
        }
    }

    /// Discard stored artifacts and train from scratch
    pub fn retrain<S: ArtifactStore + ?Sized>(
        options: &EngineOptions,
        store: &mut S,
        calibration: &CalibrationSet,
    ) -> Result<Self> {
        persistence::clear(store, options.kind)?;
        Self::initialize(options, store, calibration)
    }

    /// Engine around artifacts obtained elsewhere
    pub fn from_trained(
        trained: TrainedModel,
        options: &EngineOptions,
        origin: ModelOrigin,
    ) -> Self {
        Self {
            classifier: Classifier::from_trained(trained),
            default_anxiety_score: options.default_anxiety_score,
            origin,
        }
    }

    pub fn kind(&self) -> ModelKind {
        self.classifier.kind()
    }

    pub fn origin(&self) -> ModelOrigin {
        self.origin
    }

    /// Classify a request, stamping the result with the current time
    pub fn classify(&self, request: &AssessmentRequest) -> Result<ClassificationResult> {
        self.classify_at(request, Utc::now())
    }

    /// Classify a request with an explicit timestamp
    pub fn classify_at(
        &self,
        request: &AssessmentRequest,
        timestamp: DateTime<Utc>,
    ) -> Result<ClassificationResult> {
        let supplied_score = match request.answers.as_deref() {
            Some(answers) if !answers.is_empty() => Some(anxiety_score(answers)?),
            _ => request.anxiety_score,
        };

        let hrv_features = resolve_hrv_features(request, supplied_score)?;
        let features = FeatureVector::new(
            hrv_features,
            supplied_score.unwrap_or(self.default_anxiety_score),
        );

        let prediction = self.classifier.predict(&features)?;
        crate::logging::log_prediction(
            prediction.stress_level.as_str(),
            prediction.confidence,
            supplied_score,
        );

        Ok(ClassificationResult {
            stress_level: prediction.stress_level,
            confidence: prediction.confidence,
            probabilities: prediction.probabilities,
            hrv_features,
            anxiety_score: supplied_score,
            timestamp,
        })
    }

    /// Classify and attach the therapy recommendation
    pub fn assess(&self, request: &AssessmentRequest) -> Result<Assessment> {
        let result = self.classify(request)?;
        let therapy_recommendation = recommend_therapy(result.stress_level).clone();
        Ok(Assessment {
            result,
            therapy_recommendation,
            model_kind: self.kind(),
        })
    }

    /// Recommendation for a stress level
    pub fn recommend(&self, level: crate::StressLevel) -> &'static TherapyRecommendation {
        recommend_therapy(level)
    }
}

/// Pick the HRV source: supplied features, then intervals, then score bucket
fn resolve_hrv_features(
    request: &AssessmentRequest,
    supplied_score: Option<u32>,
) -> Result<HrvFeatures> {
    if let Some(features) = request.hrv_features {
        return Ok(features);
    }

    if let Some(rr) = request.rr_intervals.as_deref().filter(|rr| !rr.is_empty()) {
        return extract_hrv_features(rr);
    }

    match supplied_score {
        Some(score) => Ok(default_features_for_score(score)),
        None => Err(Error::MissingInput),
    }
}

fn transition(kind: ModelKind, from: EngineState, to: EngineState) {
    tracing::debug!("{} engine: {} -> {}", kind, from, to);
}
