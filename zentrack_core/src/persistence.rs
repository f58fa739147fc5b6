//! Load-or-train caching of classifier artifacts.
//!
//! Model and scaler are stored as two JSON blobs keyed by model kind. There
//! is no version key: changing the calibration data requires clearing the
//! store (see [`clear`]).

use crate::model::Model;
use crate::store::ArtifactStore;
use crate::{CalibrationSet, Error, ModelKind, Result, StandardScaler, TrainedModel};

/// Store key of the serialized model for `kind`
pub fn model_key(kind: ModelKind) -> String {
    format!("stress_model_{}", kind.as_str())
}

/// Store key of the serialized scaler for `kind`
pub fn scaler_key(kind: ModelKind) -> String {
    format!("stress_scaler_{}", kind.as_str())
}

/// Load previously stored artifacts for `kind`
///
/// Any missing blob, read failure, decode failure or structurally invalid
/// artifact yields `None`.
pub fn try_load<S: ArtifactStore + ?Sized>(store: &S, kind: ModelKind) -> Option<TrainedModel> {
    match load(store, kind) {
        Ok(Some(trained)) => {
            tracing::info!("Loaded pre-trained {} model", kind);
            Some(trained)
        }
        Ok(None) => {
            tracing::info!("No stored {} model found", kind);
            None
        }
        Err(e) => {
            tracing::warn!("Could not load stored {} model: {}. Retraining.", kind, e);
            None
        }
    }
}

fn load<S: ArtifactStore + ?Sized>(store: &S, kind: ModelKind) -> Result<Option<TrainedModel>> {
    let (Some(model_blob), Some(scaler_blob)) =
        (store.get(&model_key(kind))?, store.get(&scaler_key(kind))?)
    else {
        return Ok(None);
    };

    let model: Model = serde_json::from_slice(&model_blob)?;
    let scaler: StandardScaler = serde_json::from_slice(&scaler_blob)?;
    model.validate()?;
    scaler.validate()?;

    if model.kind() != kind {
        return Err(Error::InvalidModelKind(format!(
            "stored artifact holds {} under the {} key",
            model.kind(),
            kind
        )));
    }

    Ok(Some(TrainedModel { model, scaler }))
}

/// Serialize and write both artifacts
pub fn store_trained<S: ArtifactStore + ?Sized>(
    store: &mut S,
    trained: &TrainedModel,
) -> Result<()> {
    let kind = trained.kind();
    let model_blob = serde_json::to_vec(&trained.model)?;
    let scaler_blob = serde_json::to_vec(&trained.scaler)?;
    store.put(&model_key(kind), &model_blob)?;
    store.put(&scaler_key(kind), &scaler_blob)?;
    Ok(())
}

/// Train on `calibration` and persist the result
///
/// A failed write is logged and does not fail training; the model is
/// simply retrained next time.
pub fn train_and_store<S: ArtifactStore + ?Sized>(
    store: &mut S,
    kind: ModelKind,
    calibration: &CalibrationSet,
) -> Result<TrainedModel> {
    let trained = TrainedModel::fit(kind, calibration)?;

    match store_trained(store, &trained) {
        Ok(()) => tracing::info!("Saved {} model artifacts", kind),
        Err(e) => tracing::warn!("Could not save {} model: {}", kind, e),
    }

    Ok(trained)
}

/// Remove stored artifacts for `kind`, forcing retraining on next start
pub fn clear<S: ArtifactStore + ?Sized>(store: &mut S, kind: ModelKind) -> Result<()> {
    store.remove(&model_key(kind))?;
    store.remove(&scaler_key(kind))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::default_features_for_score;
    use crate::store::{FsArtifactStore, MemoryArtifactStore};
    use crate::FeatureVector;

    /// Store whose writes always fail
    struct ReadOnlyStore;

    impl ArtifactStore for ReadOnlyStore {
        fn get(&self, _key: &str) -> Result<Option<Vec<u8>>> {
            Ok(None)
        }

        fn put(&mut self, _key: &str, _blob: &[u8]) -> Result<()> {
            Err(Error::Io(std::io::Error::new(
                std::io::ErrorKind::PermissionDenied,
                "read-only",
            )))
        }

        fn remove(&mut self, _key: &str) -> Result<()> {
            Ok(())
        }
    }

    fn samples() -> Vec<FeatureVector> {
        vec![
            FeatureVector::new(default_features_for_score(3), 3),
            FeatureVector::new(default_features_for_score(20), 20),
            FeatureVector::new(default_features_for_score(30), 30),
            FeatureVector::new(
                crate::HrvFeatures {
                    mean_hr: 74.91,
                    sdnn: 7.0,
                    rmssd: 12.69,
                    lf_hf_ratio: 0.51,
                },
                10,
            ),
        ]
    }

    #[test]
    fn test_keys_are_per_kind() {
        assert_eq!(model_key(ModelKind::RandomForest), "stress_model_random_forest");
        assert_eq!(scaler_key(ModelKind::Svm), "stress_scaler_svm");
    }

    #[test]
    fn test_empty_store_loads_nothing() {
        let store = MemoryArtifactStore::new();
        assert!(try_load(&store, ModelKind::Svm).is_none());
    }

    #[test]
    fn test_roundtrip_preserves_predictions() {
        for kind in [ModelKind::RandomForest, ModelKind::Svm] {
            let temp_dir = tempfile::tempdir().unwrap();
            let mut store = FsArtifactStore::new(temp_dir.path());

            let trained = train_and_store(&mut store, kind, CalibrationSet::synthetic()).unwrap();
            let reloaded = try_load(&store, kind).expect("artifacts should reload");

            assert_eq!(reloaded.scaler, trained.scaler);
            for sample in samples() {
                assert_eq!(trained.predict(&sample), reloaded.predict(&sample));
            }
        }
    }

    #[test]
    fn test_corrupt_artifact_falls_back_to_none() {
        let mut store = MemoryArtifactStore::new();
        train_and_store(&mut store, ModelKind::RandomForest, CalibrationSet::synthetic()).unwrap();
        store
            .put(&model_key(ModelKind::RandomForest), b"{ not json")
            .unwrap();

        assert!(try_load(&store, ModelKind::RandomForest).is_none());
    }

    /// Rewrite every value stored under `key` anywhere in the document
    fn rewrite_field(value: &mut serde_json::Value, key: &str, replacement: &serde_json::Value) {
        match value {
            serde_json::Value::Object(map) => {
                for (k, v) in map.iter_mut() {
                    if k == key {
                        *v = replacement.clone();
                    } else {
                        rewrite_field(v, key, replacement);
                    }
                }
            }
            serde_json::Value::Array(items) => {
                for item in items {
                    rewrite_field(item, key, replacement);
                }
            }
            _ => {}
        }
    }

    fn tamper(
        store: &mut MemoryArtifactStore,
        key: &str,
        field: &str,
        replacement: serde_json::Value,
    ) {
        let blob = store.get(key).unwrap().unwrap();
        let mut doc: serde_json::Value = serde_json::from_slice(&blob).unwrap();
        rewrite_field(&mut doc, field, &replacement);
        store.put(key, &serde_json::to_vec(&doc).unwrap()).unwrap();
    }

    #[test]
    fn test_out_of_range_split_feature_falls_back_to_none() {
        let kind = ModelKind::RandomForest;
        let mut store = MemoryArtifactStore::new();
        train_and_store(&mut store, kind, CalibrationSet::synthetic()).unwrap();
        tamper(&mut store, &model_key(kind), "feature", serde_json::json!(9));

        assert!(try_load(&store, kind).is_none());
    }

    #[test]
    fn test_cyclic_tree_falls_back_to_none() {
        let kind = ModelKind::RandomForest;
        let mut store = MemoryArtifactStore::new();
        train_and_store(&mut store, kind, CalibrationSet::synthetic()).unwrap();
        tamper(&mut store, &model_key(kind), "left", serde_json::json!(0));

        assert!(try_load(&store, kind).is_none());
    }

    #[test]
    fn test_truncated_svm_falls_back_to_none() {
        let kind = ModelKind::Svm;
        let mut store = MemoryArtifactStore::new();
        train_and_store(&mut store, kind, CalibrationSet::synthetic()).unwrap();
        tamper(&mut store, &model_key(kind), "machines", serde_json::json!([]));

        assert!(try_load(&store, kind).is_none());
    }

    #[test]
    fn test_zero_scale_falls_back_to_none() {
        let kind = ModelKind::Svm;
        let mut store = MemoryArtifactStore::new();
        train_and_store(&mut store, kind, CalibrationSet::synthetic()).unwrap();
        let zero_scale = serde_json::json!([0.0, 1.0, 1.0, 1.0, 1.0]);
        tamper(&mut store, &scaler_key(kind), "scale", zero_scale);

        assert!(try_load(&store, kind).is_none());
    }

    #[test]
    fn test_missing_scaler_falls_back_to_none() {
        let mut store = MemoryArtifactStore::new();
        train_and_store(&mut store, ModelKind::Svm, CalibrationSet::synthetic()).unwrap();
        store.remove(&scaler_key(ModelKind::Svm)).unwrap();

        assert!(try_load(&store, ModelKind::Svm).is_none());
    }

    #[test]
    fn test_kind_mismatch_is_rejected() {
        let mut store = MemoryArtifactStore::new();
        let trained = TrainedModel::fit(ModelKind::Svm, CalibrationSet::synthetic()).unwrap();
        let blob = serde_json::to_vec(&trained.model).unwrap();
        store.put(&model_key(ModelKind::RandomForest), &blob).unwrap();
        store
            .put(
                &scaler_key(ModelKind::RandomForest),
                &serde_json::to_vec(&trained.scaler).unwrap(),
            )
            .unwrap();

        assert!(try_load(&store, ModelKind::RandomForest).is_none());
    }

    #[test]
    fn test_failed_save_is_not_fatal() {
        let mut store = ReadOnlyStore;
        let trained = train_and_store(&mut store, ModelKind::Svm, CalibrationSet::synthetic());
        assert!(trained.is_ok());
    }

    #[test]
    fn test_clear_forces_retrain() {
        let mut store = MemoryArtifactStore::new();
        train_and_store(&mut store, ModelKind::Svm, CalibrationSet::synthetic()).unwrap();
        assert_eq!(store.len(), 2);

        clear(&mut store, ModelKind::Svm).unwrap();
        assert!(store.is_empty());
        assert!(try_load(&store, ModelKind::Svm).is_none());
    }
}
