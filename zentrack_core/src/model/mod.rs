//! Probabilistic classifiers behind a single estimator interface.
//!
//! Two families are supported:
//! - [`RandomForest`]: bagged CART trees with Gini splits
//! - [`KernelSvm`]: RBF-kernel one-vs-rest SVM with Platt-calibrated outputs
//!
//! Both operate on already-scaled feature rows and return a probability per
//! stress class. The predicted label is always the argmax of those
//! probabilities.

pub mod forest;
pub mod svm;

pub use forest::{ForestParams, RandomForest};
pub use svm::{KernelSvm, SvmParams};

use crate::{ModelKind, Result, FEATURE_COUNT};
use serde::{Deserialize, Serialize};

/// Number of stress classes (Low, Moderate, High)
pub const CLASS_COUNT: usize = 3;

/// Feature row after scaling
pub type Row = [f64; FEATURE_COUNT];

/// Common capability set of every classifier family
pub trait Estimator {
    /// Fit on scaled rows with class indices in `0..CLASS_COUNT`
    fn fit(&mut self, x: &[Row], y: &[usize]) -> Result<()>;

    /// Class probabilities summing to 1
    fn predict_proba(&self, x: &Row) -> [f64; CLASS_COUNT];

    /// Most probable class index
    fn predict(&self, x: &Row) -> usize {
        argmax(&self.predict_proba(x))
    }
}

/// Tagged union of the supported classifier families
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Model {
    RandomForest(RandomForest),
    Svm(KernelSvm),
}

impl Model {
    /// Unfitted model with default hyperparameters for `kind`
    pub fn new(kind: ModelKind) -> Self {
        match kind {
            ModelKind::RandomForest => {
                Model::RandomForest(RandomForest::new(ForestParams::default()))
            }
            ModelKind::Svm => Model::Svm(KernelSvm::new(SvmParams::default())),
        }
    }

    pub fn kind(&self) -> ModelKind {
        match self {
            Model::RandomForest(_) => ModelKind::RandomForest,
            Model::Svm(_) => ModelKind::Svm,
        }
    }

    /// Check that a fitted (or deserialized) model can predict safely
    pub fn validate(&self) -> Result<()> {
        match self {
            Model::RandomForest(m) => m.validate(),
            Model::Svm(m) => m.validate(),
        }
    }
}

impl Estimator for Model {
    fn fit(&mut self, x: &[Row], y: &[usize]) -> Result<()> {
        match self {
            Model::RandomForest(m) => m.fit(x, y),
            Model::Svm(m) => m.fit(x, y),
        }
    }

    fn predict_proba(&self, x: &Row) -> [f64; CLASS_COUNT] {
        match self {
            Model::RandomForest(m) => m.predict_proba(x),
            Model::Svm(m) => m.predict_proba(x),
        }
    }
}

/// Index of the largest value; ties resolve to the lowest index
pub fn argmax(values: &[f64; CLASS_COUNT]) -> usize {
    let mut best = 0;
    for (i, v) in values.iter().enumerate().skip(1) {
        if *v > values[best] {
            best = i;
        }
    }
    best
}

/// Validate a training matrix against its labels
pub(crate) fn check_training_data(x: &[Row], y: &[usize]) -> Result<()> {
    if x.is_empty() {
        return Err(crate::Error::Training("No training rows".into()));
    }
    if x.len() != y.len() {
        return Err(crate::Error::Training(format!(
            "Feature rows ({}) and labels ({}) differ in length",
            x.len(),
            y.len()
        )));
    }
    if let Some(bad) = y.iter().find(|&&label| label >= CLASS_COUNT) {
        return Err(crate::Error::Training(format!("Label {} out of range", bad)));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{CalibrationSet, StandardScaler};

    fn scaled_calibration() -> (Vec<Row>, Vec<usize>) {
        let set = CalibrationSet::synthetic();
        let scaler = StandardScaler::fit(&set.features()).unwrap();
        (scaler.transform_all(&set.features()), set.labels())
    }

    #[test]
    fn test_argmax_prefers_first_on_tie() {
        assert_eq!(argmax(&[0.4, 0.4, 0.2]), 0);
        assert_eq!(argmax(&[0.1, 0.2, 0.7]), 2);
    }

    #[test]
    fn test_both_kinds_fit_training_data() {
        let (x, y) = scaled_calibration();
        for kind in [ModelKind::RandomForest, ModelKind::Svm] {
            let mut model = Model::new(kind);
            model.fit(&x, &y).unwrap();
            assert_eq!(model.kind(), kind);

            for (row, label) in x.iter().zip(&y) {
                let proba = model.predict_proba(row);
                assert!((proba.iter().sum::<f64>() - 1.0).abs() < 1e-9);
                assert_eq!(model.predict(row), *label, "{:?} misfit row {:?}", kind, row);
            }
        }
    }

    #[test]
    fn test_tagged_serialization() {
        let (x, y) = scaled_calibration();
        let mut model = Model::new(ModelKind::Svm);
        model.fit(&x, &y).unwrap();

        let json = serde_json::to_value(&model).unwrap();
        assert_eq!(json["kind"], "svm");

        let restored: Model = serde_json::from_value(json).unwrap();
        assert_eq!(restored.kind(), ModelKind::Svm);
    }

    #[test]
    fn test_fitted_models_validate() {
        let (x, y) = scaled_calibration();
        for kind in [ModelKind::RandomForest, ModelKind::Svm] {
            let mut model = Model::new(kind);
            model.fit(&x, &y).unwrap();
            assert!(model.validate().is_ok(), "{:?}", kind);
            assert!(Model::new(kind).validate().is_err(), "unfitted {:?}", kind);
        }
    }

    #[test]
    fn test_mismatched_lengths_rejected() {
        let (x, _) = scaled_calibration();
        let mut model = Model::new(ModelKind::RandomForest);
        assert!(model.fit(&x, &[0, 1]).is_err());
    }
}
