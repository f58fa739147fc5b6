//! Stress classifier: a fitted scaler plus a fitted probabilistic model.

use crate::features::round2;
use crate::model::{Estimator, Model};
use crate::{
    CalibrationSet, Error, FeatureVector, ModelKind, Prediction, Probabilities, Result,
    StandardScaler, StressLevel,
};

/// Fitted model and scaler; immutable once built
#[derive(Clone, Debug)]
pub struct TrainedModel {
    pub model: Model,
    pub scaler: StandardScaler,
}

impl TrainedModel {
    /// Fit scaler and model of the given kind on a calibration set
    pub fn fit(kind: ModelKind, calibration: &CalibrationSet) -> Result<Self> {
        calibration.validate()?;

        let raw = calibration.features();
        let scaler = StandardScaler::fit(&raw)?;
        let scaled = scaler.transform_all(&raw);

        let mut model = Model::new(kind);
        model.fit(&scaled, &calibration.labels())?;

        tracing::info!(
            "Trained {} model on calibration set '{}' ({} rows)",
            kind,
            calibration.name,
            calibration.len()
        );

        Ok(Self { model, scaler })
    }

    pub fn kind(&self) -> ModelKind {
        self.model.kind()
    }

    /// Classify one feature vector
    ///
    /// Percentages are rounded to two decimals; the reported level is the
    /// model's argmax, so it always carries the largest probability.
    pub fn predict(&self, features: &FeatureVector) -> Prediction {
        let scaled = self.scaler.transform(&features.to_array());
        let proba = self.model.predict_proba(&scaled);
        let label = crate::model::argmax(&proba);

        let probabilities = Probabilities {
            low: round2(proba[0] * 100.0),
            moderate: round2(proba[1] * 100.0),
            high: round2(proba[2] * 100.0),
        };

        // argmax over CLASS_COUNT entries always maps to a level
        let stress_level = StressLevel::from_index(label).unwrap_or(StressLevel::Moderate);

        Prediction {
            stress_level,
            confidence: probabilities.get(stress_level),
            probabilities,
        }
    }
}

/// Classifier of a fixed kind that may or may not be trained yet
#[derive(Clone, Debug)]
pub struct Classifier {
    kind: ModelKind,
    trained: Option<TrainedModel>,
}

impl Classifier {
    /// Untrained classifier of the given kind
    pub fn new(kind: ModelKind) -> Self {
        Self {
            kind,
            trained: None,
        }
    }

    /// Ready classifier wrapping already-fitted artifacts
    pub fn from_trained(trained: TrainedModel) -> Self {
        Self {
            kind: trained.kind(),
            trained: Some(trained),
        }
    }

    pub fn kind(&self) -> ModelKind {
        self.kind
    }

    pub fn is_trained(&self) -> bool {
        self.trained.is_some()
    }

    pub fn trained(&self) -> Option<&TrainedModel> {
        self.trained.as_ref()
    }

    /// Fit on a calibration set, replacing nothing if fitting fails
    pub fn train(&mut self, calibration: &CalibrationSet) -> Result<()> {
        let trained = TrainedModel::fit(self.kind, calibration)?;
        self.trained = Some(trained);
        Ok(())
    }

    pub fn predict(&self, features: &FeatureVector) -> Result<Prediction> {
        let trained = self.trained.as_ref().ok_or(Error::ModelNotTrained)?;
        Ok(trained.predict(features))
    }
}
