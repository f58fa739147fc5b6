//! Z-score feature scaling.

use crate::{Error, Result, FEATURE_COUNT};
use serde::{Deserialize, Serialize};

/// Per-feature standardization fitted once on the calibration set
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct StandardScaler {
    pub mean: [f64; FEATURE_COUNT],
    pub scale: [f64; FEATURE_COUNT],
}

impl StandardScaler {
    /// Fit mean and population standard deviation per column
    ///
    /// Constant columns get a scale of 1.0 so they map to zero.
    pub fn fit(rows: &[[f64; FEATURE_COUNT]]) -> Result<Self> {
        if rows.is_empty() {
            return Err(Error::Training("Cannot fit scaler on empty data".into()));
        }

        let n = rows.len() as f64;
        let mut mean = [0.0; FEATURE_COUNT];
        let mut scale = [0.0; FEATURE_COUNT];

        for col in 0..FEATURE_COUNT {
            let m = rows.iter().map(|r| r[col]).sum::<f64>() / n;
            let var = rows.iter().map(|r| (r[col] - m).powi(2)).sum::<f64>() / n;
            let std = var.sqrt();
            mean[col] = m;
            scale[col] = if std > f64::EPSILON { std } else { 1.0 };
        }

        Ok(Self { mean, scale })
    }

    /// Check that every column can be transformed
    pub fn validate(&self) -> Result<()> {
        let usable = self.mean.iter().all(|m| m.is_finite())
            && self.scale.iter().all(|s| s.is_finite() && *s > 0.0);
        if usable {
            Ok(())
        } else {
            Err(Error::InvalidArtifact(
                "scaler has a non-finite mean or non-positive scale".into(),
            ))
        }
    }

    pub fn transform(&self, row: &[f64; FEATURE_COUNT]) -> [f64; FEATURE_COUNT] {
        let mut out = [0.0; FEATURE_COUNT];
        for (col, value) in out.iter_mut().enumerate() {
            *value = (row[col] - self.mean[col]) / self.scale[col];
        }
        out
    }

    pub fn transform_all(&self, rows: &[[f64; FEATURE_COUNT]]) -> Vec<[f64; FEATURE_COUNT]> {
        rows.iter().map(|r| self.transform(r)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fit_transform_standardizes() {
        let rows = vec![
            [1.0, 10.0, 5.0, 0.0, 2.0],
            [2.0, 20.0, 5.0, 1.0, 4.0],
            [3.0, 30.0, 5.0, 2.0, 6.0],
        ];
        let scaler = StandardScaler::fit(&rows).unwrap();
        let scaled = scaler.transform_all(&rows);

        for col in 0..FEATURE_COUNT {
            let mean: f64 = scaled.iter().map(|r| r[col]).sum::<f64>() / 3.0;
            assert!(mean.abs() < 1e-12);
        }
        // constant column stays finite and centred
        assert_eq!(scaler.scale[2], 1.0);
        assert!(scaled.iter().all(|r| r[2] == 0.0));
        // non-constant columns have unit population variance
        let var: f64 = scaled.iter().map(|r| r[0] * r[0]).sum::<f64>() / 3.0;
        assert!((var - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_fit_empty_fails() {
        assert!(matches!(StandardScaler::fit(&[]), Err(Error::Training(_))));
    }

    #[test]
    fn test_validate_rejects_degenerate_scale() {
        let rows = [[1.0; FEATURE_COUNT], [2.0; FEATURE_COUNT]];
        let mut scaler = StandardScaler::fit(&rows).unwrap();
        assert!(scaler.validate().is_ok());

        scaler.scale[3] = 0.0;
        assert!(matches!(scaler.validate(), Err(Error::InvalidArtifact(_))));

        scaler.scale[3] = 1.0;
        scaler.mean[0] = f64::NAN;
        assert!(scaler.validate().is_err());
    }
}
